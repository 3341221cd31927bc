//! The privileged command surface reachable from the webview.
//!
//! This set is closed: every channel is a typed command collected by
//! `bindings::generate_bindings`, so adding one is a compile-checked change,
//! not a free-form key registration.

pub mod database;
pub mod export;
pub mod lifecycle;
pub mod server_status;
