//! Tauri application library entry point.
//!
//! The shell supervises the SCOUT backend process: it allocates the port the
//! backend binds, restores the last data source, brokers the privileged
//! command surface and owns the main window. Command implementations live in
//! the `commands` module, port/process/export machinery in `services`.

mod bindings;
mod commands;
mod error;
mod services;
mod state;
mod window;

use std::sync::Mutex;

use tauri::Manager;

use crate::services::backend::BackendSupervisor;
use crate::services::settings::SettingsStore;
use crate::state::AppState;

/// Application entry point. Sets up all plugins and initializes the app.
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let builder = bindings::generate_bindings();

    // Export TypeScript bindings in debug builds
    #[cfg(debug_assertions)]
    bindings::export_ts_bindings();

    let mut app_builder = tauri::Builder::default();

    // Single instance plugin must be registered FIRST
    // When the user opens a second instance, focus the existing window instead
    #[cfg(desktop)]
    {
        app_builder = app_builder.plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            if let Some(win) = app.get_webview_window(window::MAIN_WINDOW) {
                let _ = win.set_focus();
                let _ = win.unminimize();
            }
        }));
    }

    app_builder = app_builder.plugin(
        tauri_plugin_log::Builder::new()
            // Use Debug level in development, Info in production
            .level(if cfg!(debug_assertions) {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            })
            .targets([
                // Always log to stdout for development
                tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Stdout),
                // Log to webview console for development
                tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::Webview),
                // Log to system logs on macOS (appears in Console.app)
                #[cfg(target_os = "macos")]
                tauri_plugin_log::Target::new(tauri_plugin_log::TargetKind::LogDir {
                    file_name: None,
                }),
            ])
            .build(),
    );

    app_builder
        .setup(|app| {
            log::info!("SCOUT shell starting up");

            // One port per run; every other component observes this value.
            let api_port = services::ports::allocate_port()?;
            log::info!("Backend API port allocated: {api_port}");

            let settings = SettingsStore::open(app.path().app_config_dir()?);
            let mut supervisor = BackendSupervisor::new(app.path().resource_dir().ok());

            let backend_starting = match settings.last_database() {
                Some(data_source) => supervisor.start(&data_source, api_port).is_ok(),
                None => {
                    log::info!("No data source configured; backend not started");
                    false
                }
            };

            app.manage(AppState {
                api_port,
                supervisor: Mutex::new(supervisor),
                settings,
            });

            // The window opens once the backend answers its readiness probe,
            // or immediately when there is nothing to wait for.
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                if backend_starting {
                    services::readiness::settle_backend(&handle, api_port).await;
                }
                if let Err(e) = window::create_main_window(&handle, api_port) {
                    log::error!("Failed to create main window: {e}");
                }
            });

            Ok(())
        })
        .invoke_handler(builder.invoke_handler())
        .on_window_event(|win, event| {
            // Kill the backend when the main window is destroyed
            if let tauri::WindowEvent::Destroyed = event {
                if win.label() == window::MAIN_WINDOW {
                    log::info!("Main window destroyed, stopping backend");
                    let state = win.app_handle().state::<AppState>();
                    state.supervisor.lock().unwrap().stop();
                }
            }
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| match event {
            // macOS dock activation with no window left: recreate the surface.
            #[cfg(target_os = "macos")]
            tauri::RunEvent::Reopen { .. } => {
                let api_port = app.state::<AppState>().api_port;
                if let Err(e) = window::create_main_window(app, api_port) {
                    log::error!("Failed to recreate main window: {e}");
                }
            }
            // Termination always reaches the backend first.
            tauri::RunEvent::Exit => {
                let state = app.state::<AppState>();
                state.supervisor.lock().unwrap().stop();
            }
            _ => {}
        });
}
