// Push notification delivery, foreground mirroring and deep-link routing
pub mod push;

use push::tauri_bridge;

fn init_tracing() {
    // try_init: the mobile shell may call run() more than once per process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotepad_mobile_lib=info".into()),
        )
        .try_init();
}

/// Create the base Tauri builder with all standard plugins
fn create_base_builder() -> tauri::Builder<tauri::Wry> {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_deep_link::init())
        .plugin(tauri_plugin_notification::init())
}

/// Standard app setup
fn setup_app(app: &tauri::App) -> Result<(), Box<dyn std::error::Error>> {
    tauri_bridge::setup_push(app).map_err(|e| {
        tracing::error!(error = %e, "failed to set up push notifications");
        e
    })?;

    // Desktop dev builds only see the scheme when it is registered at runtime
    #[cfg(all(any(windows, target_os = "linux"), debug_assertions))]
    {
        use tauri_plugin_deep_link::DeepLinkExt;
        if let Err(e) = app.deep_link().register_all() {
            tracing::warn!(error = %e, "failed to register deep link schemes");
        }
    }

    Ok(())
}

fn handle_window_event(window: &tauri::Window, event: &tauri::WindowEvent) {
    use tauri::Manager;

    if let tauri::WindowEvent::Focused(true) = event {
        tauri_bridge::on_app_focused(window.app_handle());
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();
    tracing::info!("Starting Quotepad");

    create_base_builder()
        .setup(|app| setup_app(app))
        .on_window_event(handle_window_event)
        .invoke_handler(tauri::generate_handler![
            tauri_bridge::push_notification_received,
            tauri_bridge::push_notification_tapped,
            tauri_bridge::push_native_token,
            tauri_bridge::push_auth_changed,
            tauri_bridge::push_diagnostics
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| {
            if let tauri::RunEvent::Exit = event {
                tauri_bridge::on_app_exit(app);
            }
        });
}
