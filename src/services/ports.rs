//! Ephemeral port allocation for the backend's loopback HTTP listener.

use std::net::{Ipv4Addr, TcpListener};

use crate::error::ShellError;

/// Ask the OS for a currently unused TCP port on the loopback interface.
///
/// Binds a transient listener solely to learn the port number, then releases
/// it. Called exactly once per run; the result is cached in `AppState` and
/// shared read-only from there, including across backend restarts.
pub fn allocate_port() -> Result<u16, ShellError> {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(ShellError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(ShellError::PortAllocation)?
        .port();
    log::debug!("Allocated ephemeral port {port}");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_a_bindable_port() {
        let port = allocate_port().expect("allocation");
        assert_ne!(port, 0);
        // The transient listener was released, so the port is free again.
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).expect("rebind released port");
    }

    #[test]
    fn repeated_allocations_stay_valid() {
        for _ in 0..4 {
            assert_ne!(allocate_port().expect("allocation"), 0);
        }
    }
}
