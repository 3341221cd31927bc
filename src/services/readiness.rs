//! Backend readiness detection.
//!
//! The shell never assumes the backend is up after a fixed delay: it probes
//! the HTTP listener with bounded retry and exponential backoff, and treats
//! an exhausted budget as a terminal failure to start.

use std::time::Duration;

use tauri::Manager;

use crate::error::ShellError;
use crate::state::AppState;

/// Probe attempts before giving up.
const MAX_ATTEMPTS: u32 = 30;
/// Delay before the first retry; doubled per attempt up to [`MAX_BACKOFF`].
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Wait until the backend's listener on `port` answers HTTP.
///
/// Any HTTP response, success or not, proves the listener is bound, which is
/// all window loading needs.
pub async fn wait_until_ready(port: u16) -> Result<(), ShellError> {
    wait_with_budget(port, MAX_ATTEMPTS, INITIAL_BACKOFF).await
}

async fn wait_with_budget(
    port: u16,
    attempts: u32,
    initial_backoff: Duration,
) -> Result<(), ShellError> {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{port}/");
    let mut backoff = initial_backoff;
    for attempt in 1..=attempts {
        match client.get(&url).send().await {
            Ok(_) => {
                log::debug!("Backend answered readiness probe on attempt {attempt}");
                return Ok(());
            }
            Err(e) => log::trace!("Readiness probe {attempt}/{attempts} failed: {e}"),
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
    Err(ShellError::BackendUnready { port, attempts })
}

/// Probe `port` and settle the supervisor: `Starting` becomes `Running` on
/// success; an exhausted budget requests termination of the unready process
/// and leaves the failure queryable via `get_backend_status`.
pub async fn settle_backend(app: &tauri::AppHandle, port: u16) {
    let state = app.state::<AppState>();
    match wait_until_ready(port).await {
        Ok(()) => state.supervisor.lock().unwrap().mark_running(),
        Err(e) => {
            log::error!("Backend failed to start: {e}");
            state.supervisor.lock().unwrap().stop();
        }
    }
}

/// Fire-and-forget [`settle_backend`], used after data-source restarts.
pub fn spawn_readiness_watch(app: &tauri::AppHandle, port: u16) {
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        settle_backend(&app, port).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn probe_succeeds_once_the_listener_answers() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                    .await;
            }
        });

        wait_with_budget(port, 5, Duration::from_millis(10))
            .await
            .expect("ready");
    }

    #[tokio::test]
    async fn probe_gives_up_after_its_budget() {
        // A transiently bound and released port: nothing listens on it.
        let port = crate::services::ports::allocate_port().expect("port");
        let err = wait_with_budget(port, 3, Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShellError::BackendUnready { attempts: 3, .. }
        ));
    }
}
