//! Window controller for the single main UI surface.
//!
//! The rendered content is served by the backend itself; the window points
//! at the backend's loopback URL and has no privileged access beyond the
//! command surface. Creation timing relative to backend readiness is decided
//! in `lib.rs`.

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};

/// Label of the single main window.
pub const MAIN_WINDOW: &str = "main";

/// Create the main window pointing at the backend's root URL. A no-op when
/// the window already exists: one surface per app lifetime in the primary
/// flow, recreated only on activation with no window.
pub fn create_main_window(
    app: &AppHandle,
    api_port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if app.get_webview_window(MAIN_WINDOW).is_some() {
        return Ok(());
    }
    let url: tauri::Url = format!("http://127.0.0.1:{api_port}/").parse()?;
    WebviewWindowBuilder::new(app, MAIN_WINDOW, WebviewUrl::External(url))
        .title("SCOUT")
        .inner_size(1200.0, 800.0)
        .build()?;
    log::info!("Main window created for http://127.0.0.1:{api_port}/");
    Ok(())
}
