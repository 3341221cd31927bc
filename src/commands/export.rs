//! KMZ export command: the one channel that surfaces failure synchronously.

use tauri::State;

use crate::services::export::{self, ExportRequest};
use crate::state::AppState;

/// Export the current result set as KMZ.
///
/// Prompts for a destination first; cancellation returns `None` before any
/// network traffic. Transport and filesystem failures reject the call.
#[tauri::command]
#[specta::specta]
pub async fn export_kml(
    state: State<'_, AppState>,
    table: String,
    query: String,
    filter_column: String,
    limit: u32,
) -> Result<Option<String>, String> {
    let default_name = export::default_file_name(&table);
    let destination = tauri::async_runtime::spawn_blocking(move || {
        rfd::FileDialog::new()
            .set_title("Save KMZ Export")
            .set_file_name(&default_name)
            .add_filter("KMZ", &["kmz"])
            .save_file()
    })
    .await
    .map_err(|e| format!("Save dialog task failed: {e}"))?;

    let Some(destination) = destination else {
        log::info!("KMZ export cancelled");
        return Ok(None);
    };

    let request = ExportRequest {
        table,
        query,
        filter_column,
        limit,
    };
    let bytes = export::fetch_export(state.api_port, &request)
        .await
        .map_err(|e| e.to_string())?;
    export::write_export(&destination, &bytes).map_err(|e| e.to_string())?;

    log::info!("Exported {} bytes to {}", bytes.len(), destination.display());
    Ok(Some(destination.to_string_lossy().into_owned()))
}
