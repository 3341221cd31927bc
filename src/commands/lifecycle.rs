//! Application lifecycle commands.

use tauri::{AppHandle, Manager};

use crate::state::AppState;

/// Quit requested by the frontend: fire-and-forget. The backend is asked to
/// terminate before the host exits.
#[tauri::command]
#[specta::specta]
pub fn quit_app(app: AppHandle) {
    log::info!("Quit requested from frontend");
    let state = app.state::<AppState>();
    state.supervisor.lock().unwrap().stop();
    app.exit(0);
}
