//! Export proxying between the webview and the backend's KMZ endpoint.
//!
//! The shell performs the HTTP fetch and the file write so the rendered page
//! never touches the network address space or the filesystem itself.

use std::path::Path;

use crate::error::ShellError;

/// Path of the backend's export endpoint.
const EXPORT_ENDPOINT: &str = "/api/export_kmz";

/// Parameters of one export request, as received from the webview.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub table: String,
    pub query: String,
    pub filter_column: String,
    pub limit: u32,
}

/// Default save-dialog filename for an export of `table`.
pub fn default_file_name(table: &str) -> String {
    format!("{table}.kmz")
}

/// Fetch the export payload from the backend on `port`.
///
/// Exactly one GET; the four parameters are percent-encoded into the query
/// string. A non-success status is an error like any transport failure.
pub async fn fetch_export(port: u16, request: &ExportRequest) -> Result<Vec<u8>, ShellError> {
    let url = format!("http://127.0.0.1:{port}{EXPORT_ENDPOINT}");
    let limit = request.limit.to_string();
    let response = reqwest::Client::new()
        .get(&url)
        .query(&[
            ("table", request.table.as_str()),
            ("query", request.query.as_str()),
            ("filter_column", request.filter_column.as_str()),
            ("limit", limit.as_str()),
        ])
        .send()
        .await
        .map_err(ShellError::ExportRequest)?
        .error_for_status()
        .map_err(ShellError::ExportRequest)?;
    let body = response.bytes().await.map_err(ShellError::ExportRequest)?;
    Ok(body.to_vec())
}

/// Write the export payload verbatim, overwriting any existing file.
pub fn write_export(path: &Path, bytes: &[u8]) -> Result<(), ShellError> {
    std::fs::write(path, bytes).map_err(|source| ShellError::ExportWrite {
        path: path.to_path_buf(),
        source,
    })
}
