//! Data-source selection commands.
//!
//! Both entry points (native picker and drag-drop) funnel into the same
//! activation path: restart the backend on the shared port, then persist the
//! selection. The accepted path is reported back even if the spawn
//! subsequently fails; that failure is logged and visible through
//! `get_backend_status` only.

use std::path::{Path, PathBuf};

use tauri::{AppHandle, Manager};

use crate::services::readiness;
use crate::state::AppState;

/// File extensions accepted as SQLite data sources.
const SUPPORTED_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

/// Whether `path` names a supported database file.
fn is_supported_database(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Last data source recorded in the persisted settings, if any.
#[tauri::command]
#[specta::specta]
pub fn get_last_database(state: tauri::State<'_, AppState>) -> Option<String> {
    state
        .settings
        .last_database()
        .map(|path| path.to_string_lossy().into_owned())
}

/// Open the native picker for a database file. Cancellation returns `None`;
/// a selection restarts the backend on it and persists it.
#[tauri::command]
#[specta::specta]
pub async fn select_database(app: AppHandle) -> Result<Option<String>, String> {
    let picked = tauri::async_runtime::spawn_blocking(|| {
        rfd::FileDialog::new()
            .set_title("Select SQLite Database")
            .add_filter("SQLite Database", SUPPORTED_EXTENSIONS)
            .add_filter("All Files", &["*"])
            .pick_file()
    })
    .await
    .map_err(|e| format!("File dialog task failed: {e}"))?;

    match picked {
        Some(path) => Ok(Some(activate_database(app, path).await)),
        None => Ok(None),
    }
}

/// Accept a file dropped onto the page. An unsupported extension returns
/// `None` without touching the running backend.
#[tauri::command]
#[specta::specta]
pub async fn load_database(app: AppHandle, path: String) -> Result<Option<String>, String> {
    let path = PathBuf::from(path);
    if !is_supported_database(&path) {
        log::warn!(
            "Rejected dropped file without a database extension: {}",
            path.display()
        );
        return Ok(None);
    }
    Ok(Some(activate_database(app, path).await))
}

/// Restart the backend on `path` and persist the selection.
async fn activate_database(app: AppHandle, path: PathBuf) -> String {
    let accepted = path.to_string_lossy().into_owned();
    let worker_app = app.clone();
    let data_source = path.clone();
    let started = tauri::async_runtime::spawn_blocking(move || {
        let state = worker_app.state::<AppState>();
        let restarted = {
            let mut supervisor = state.supervisor.lock().unwrap();
            supervisor
                .restart_with(&data_source, state.api_port)
                .is_ok()
        };
        state.settings.save(&data_source);
        restarted
    })
    .await
    .unwrap_or_else(|e| {
        log::error!("Data source activation task failed: {e}");
        false
    });

    if started {
        let port = app.state::<AppState>().api_port;
        readiness::spawn_readiness_watch(&app, port);
    }
    accepted
}
