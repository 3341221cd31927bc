//! Shared application state for the backend supervision infrastructure.
//!
//! Holds the port assignment, the supervisor and the settings store.
//! Managed via `tauri::Manager::manage()` and accessed in commands via
//! `tauri::State`.

use std::sync::Mutex;

use crate::services::backend::BackendSupervisor;
use crate::services::settings::SettingsStore;

/// Application state shared across Tauri commands and services.
pub struct AppState {
    /// Port the backend's HTTP API is bound to (localhost only). Allocated
    /// once per run, immutable thereafter and reused across restarts.
    pub api_port: u16,
    /// Supervisor owning the current backend process handle.
    pub supervisor: Mutex<BackendSupervisor>,
    /// Persisted shell settings (last selected data source).
    pub settings: SettingsStore,
}
