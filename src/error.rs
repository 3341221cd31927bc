//! Typed errors for the shell's supervisor core.
//!
//! Commands surface failures to the webview as strings; the services below
//! them keep the causal chain intact for diagnostic logging. Soft failures
//! (settings I/O, extension validation) never reach this enum: the former is
//! logged inside the settings store, the latter is an ordinary `None` result.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors produced by the shell's own services.
#[derive(Debug)]
pub enum ShellError {
    /// The OS refused to bind any ephemeral port. Fatal at startup.
    PortAllocation(io::Error),

    /// The backend executable exists neither in the bundled resource
    /// location nor on PATH.
    BackendNotFound {
        /// Bundled candidate checked first, when a resource dir was known.
        bundled: Option<PathBuf>,
    },

    /// The backend executable was found but could not be spawned.
    Spawn {
        program: PathBuf,
        source: io::Error,
    },

    /// The backend never answered the readiness probe.
    BackendUnready { port: u16, attempts: u32 },

    /// The export request to the backend failed in transit or with an error
    /// status.
    ExportRequest(reqwest::Error),

    /// The export payload could not be written to disk.
    ExportWrite { path: PathBuf, source: io::Error },
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortAllocation(source) => {
                write!(f, "Could not allocate an ephemeral port: {source}")
            }
            Self::BackendNotFound { bundled: Some(p) } => write!(
                f,
                "Backend executable not found: checked '{}' and PATH",
                p.display()
            ),
            Self::BackendNotFound { bundled: None } => {
                write!(f, "Backend executable not found on PATH")
            }
            Self::Spawn { program, source } => {
                write!(f, "Failed to spawn backend '{}': {source}", program.display())
            }
            Self::BackendUnready { port, attempts } => write!(
                f,
                "Backend on port {port} did not answer after {attempts} readiness probes"
            ),
            Self::ExportRequest(source) => write!(f, "Export request failed: {source}"),
            Self::ExportWrite { path, source } => {
                write!(f, "Could not write export '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PortAllocation(source) => Some(source),
            Self::Spawn { source, .. } => Some(source),
            Self::ExportRequest(source) => Some(source),
            Self::ExportWrite { source, .. } => Some(source),
            Self::BackendNotFound { .. } | Self::BackendUnready { .. } => None,
        }
    }
}
