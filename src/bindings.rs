//! Typed command bindings.
//!
//! Every privileged channel is registered here and nowhere else; the webview
//! cannot reach anything outside this list. Adding a channel means adding a
//! command to `collect_commands!`, which the compiler checks.

use tauri_specta::{collect_commands, Builder};

use crate::commands;

/// Build the command router for the complete channel set.
pub fn generate_bindings() -> Builder {
    Builder::<tauri::Wry>::new().commands(collect_commands![
        commands::server_status::get_api_port,
        commands::server_status::get_backend_status,
        commands::database::get_last_database,
        commands::database::select_database,
        commands::database::load_database,
        commands::export::export_kml,
        commands::lifecycle::quit_app,
    ])
}

/// Export TypeScript bindings for the frontend build (debug builds only).
#[cfg(debug_assertions)]
pub fn export_ts_bindings() {
    use specta_typescript::Typescript;

    if let Err(e) = generate_bindings().export(Typescript::default(), "./bindings.ts") {
        log::warn!("Failed to export TypeScript bindings: {e}");
    }
}
