//! Port and status discovery commands for the frontend.

use serde::{Deserialize, Serialize};
use specta::Type;
use tauri::State;

use crate::services::backend::ProcessStatus;
use crate::state::AppState;

/// Snapshot of the supervised backend, as exposed to the webview.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct BackendStatus {
    /// Whether the backend is running and has answered the readiness probe.
    pub running: bool,
    /// The port the backend's HTTP API is bound to.
    pub port: u16,
    /// OS process id of the current backend, if one was spawned.
    pub pid: Option<u32>,
    /// Data source of the current backend, if one was ever started.
    pub data_source: Option<String>,
}

/// Get the allocated backend API port. The rendered page builds every HTTP
/// request against this.
#[tauri::command]
#[specta::specta]
pub fn get_api_port(state: State<'_, AppState>) -> u16 {
    state.api_port
}

/// Get the current status of the supervised backend. The frontend uses this
/// to tell an unready or failed backend apart from a slow page load.
#[tauri::command]
#[specta::specta]
pub fn get_backend_status(state: State<'_, AppState>) -> BackendStatus {
    let supervisor = state.supervisor.lock().unwrap();
    let current = supervisor.current();
    BackendStatus {
        running: current
            .map(|handle| handle.status() == ProcessStatus::Running)
            .unwrap_or(false),
        port: current
            .map(|handle| handle.port())
            .unwrap_or(state.api_port),
        pid: current.and_then(|handle| handle.pid()),
        data_source: current.map(|handle| handle.data_source().to_string_lossy().into_owned()),
    }
}
