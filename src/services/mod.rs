//! Internal services (not exposed as Tauri commands).
//!
//! These modules implement port allocation, persisted settings, backend
//! process supervision, readiness probing and export proxying.

pub mod backend;
pub mod export;
pub mod ports;
pub mod readiness;
pub mod settings;
