// Tauri-backed implementations of the push seams, plus the commands the
// webview and native shell use to feed events in.

use crate::push::backend::{HttpPushService, NativeDeviceToken, NativeTokenSlot, RestProfileStore};
use crate::push::channel::ChannelConfig;
use crate::push::config::PushConfig;
use crate::push::diagnostics::DiagnosticSnapshot;
use crate::push::error::{PushError, PushResult};
use crate::push::events::{map_deep_link, RawNotification, RawResponse, RawTap};
use crate::push::mirror::LocalBanner;
use crate::push::payload::NotificationResponse;
use crate::push::platform::{
    AlertPresenter, CenterSnapshot, LaunchSource, Navigator, NotificationCenter, PermissionState,
    PlatformTag, UserId,
};
use crate::push::route::RouteTarget;
use crate::push::subsystem::{Listeners, PushDeps, PushSubsystem};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_deep_link::DeepLinkExt;
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_plugin_notification::NotificationExt;

/// Event the webview router listens on.
pub const NAVIGATE_EVENT: &str = "push://navigate";

fn platform_err(e: impl std::fmt::Display) -> PushError {
    PushError::Platform(e.to_string())
}

fn map_permission(state: tauri::plugin::PermissionState) -> PermissionState {
    match state {
        tauri::plugin::PermissionState::Granted => PermissionState::Granted,
        tauri::plugin::PermissionState::Denied => PermissionState::Denied,
        _ => PermissionState::Undetermined,
    }
}

/// Notification centre backed by `tauri-plugin-notification`.
pub struct TauriNotificationCenter {
    app: AppHandle,
}

impl TauriNotificationCenter {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl NotificationCenter for TauriNotificationCenter {
    async fn permission_state(&self) -> PushResult<PermissionState> {
        let state = self
            .app
            .notification()
            .permission_state()
            .map_err(platform_err)?;
        Ok(map_permission(state))
    }

    async fn request_permission(&self) -> PushResult<PermissionState> {
        let state = self
            .app
            .notification()
            .request_permission()
            .map_err(platform_err)?;
        Ok(map_permission(state))
    }

    #[cfg(target_os = "android")]
    async fn upsert_channel(&self, config: &ChannelConfig) -> PushResult<()> {
        use crate::push::channel::{ChannelImportance, LockScreenVisibility};
        use tauri_plugin_notification::{Channel, Importance, Visibility};

        // The plugin tops out at High, which is heads-up on Android.
        let importance = match config.importance {
            ChannelImportance::Default => Importance::Default,
            ChannelImportance::High | ChannelImportance::Max => Importance::High,
        };
        let visibility = match config.lock_screen {
            LockScreenVisibility::Private => Visibility::Private,
            LockScreenVisibility::Public => Visibility::Public,
        };

        let mut builder = Channel::builder(config.id.clone(), config.name.clone())
            .importance(importance)
            .visibility(visibility)
            .vibration(!config.vibration_pattern.is_empty())
            .lights(true);
        if let Some(sound) = &config.sound {
            builder = builder.sound(sound.clone());
        }

        // create_channel is an upsert on Android; nothing here ever deletes.
        self.app
            .notification()
            .create_channel(builder.build())
            .map_err(platform_err)
    }

    #[cfg(not(target_os = "android"))]
    async fn upsert_channel(&self, config: &ChannelConfig) -> PushResult<()> {
        tracing::debug!(
            channel = %config.id,
            importance = ?config.importance,
            lock_screen = ?config.lock_screen,
            "platform has no notification channels"
        );
        Ok(())
    }

    async fn schedule_banner(&self, banner: &LocalBanner) -> PushResult<()> {
        let mut builder = self
            .app
            .notification()
            .builder()
            .id(banner.id)
            .title(banner.title.clone())
            .body(banner.body.clone());
        if let Some(channel_id) = &banner.channel_id {
            builder = builder.channel_id(channel_id.clone());
        }
        for (key, value) in banner.payload.as_map() {
            builder = builder.extra(key.clone(), value.clone());
        }
        builder.show().map_err(platform_err)
    }

    #[cfg(target_os = "android")]
    async fn snapshot(&self) -> PushResult<CenterSnapshot> {
        let notification = self.app.notification();
        let channels = notification
            .list_channels()
            .map_err(platform_err)?
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        let pending = notification.pending().map_err(platform_err)?.len();
        let presented = notification.active().map_err(platform_err)?.len();
        Ok(CenterSnapshot {
            channels,
            pending,
            presented,
        })
    }

    #[cfg(all(mobile, not(target_os = "android")))]
    async fn snapshot(&self) -> PushResult<CenterSnapshot> {
        let notification = self.app.notification();
        let pending = notification.pending().map_err(platform_err)?.len();
        let presented = notification.active().map_err(platform_err)?.len();
        Ok(CenterSnapshot {
            channels: Vec::new(),
            pending,
            presented,
        })
    }

    #[cfg(desktop)]
    async fn snapshot(&self) -> PushResult<CenterSnapshot> {
        Ok(CenterSnapshot::default())
    }
}

#[derive(Debug, Clone, Serialize)]
struct NavigatePayload<'a> {
    path: &'a str,
    params: &'a BTreeMap<String, String>,
    mode: &'static str,
}

/// Drives the webview router through `push://navigate` events.
pub struct WebviewNavigator {
    app: AppHandle,
}

impl WebviewNavigator {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl Navigator for WebviewNavigator {
    fn replace(&self, target: &RouteTarget) -> PushResult<()> {
        let payload = NavigatePayload {
            path: &target.path,
            params: &target.params,
            mode: "replace",
        };
        self.app
            .emit(NAVIGATE_EVENT, payload)
            .map_err(|e| PushError::Navigation(e.to_string()))
    }
}

/// Native modal dialog.
pub struct DialogAlert {
    app: AppHandle,
}

impl DialogAlert {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl AlertPresenter for DialogAlert {
    fn show_alert(&self, title: &str, body: &str) {
        self.app
            .dialog()
            .message(body)
            .title(title)
            .kind(MessageDialogKind::Info)
            .show(|_| {});
    }
}

/// The URL the process was launched with, if it encodes a notification tap.
pub struct DeepLinkLaunchSource {
    app: AppHandle,
}

impl DeepLinkLaunchSource {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl LaunchSource for DeepLinkLaunchSource {
    async fn launch_response(&self) -> PushResult<Option<NotificationResponse>> {
        let urls = self.app.deep_link().get_current().map_err(platform_err)?;
        Ok(urls.unwrap_or_default().iter().find_map(map_deep_link))
    }
}

/// Keeps the listeners alive for the life of the app.
#[derive(Default)]
pub struct ListenerHolder(Mutex<Option<Listeners>>);

impl ListenerHolder {
    fn store(&self, listeners: Listeners) {
        let mut slot = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(listeners);
    }
}

/// Builds the subsystem, registers it as managed state and kicks off boot.
pub fn setup_push(app: &tauri::App) -> Result<(), Box<dyn std::error::Error>> {
    let handle = app.handle().clone();
    let config = PushConfig::from_env();
    let platform = PlatformTag::detect();

    if !config.backend_configured() {
        tracing::warn!("backend URL or key missing; push tokens will not be synced");
    }
    if config.project_id.is_empty() {
        tracing::warn!("QUOTEPAD_PUSH_PROJECT_ID is not set; token exchange will be rejected");
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("quotepad-mobile/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let native = Arc::new(NativeTokenSlot::new());
    let profiles = Arc::new(RestProfileStore::new(
        client.clone(),
        &config.backend_url,
        config.backend_anon_key.clone(),
    ));

    let deps = PushDeps {
        center: Arc::new(TauriNotificationCenter::new(handle.clone())),
        push_service: Arc::new(HttpPushService::new(
            client,
            config.push_service_url.clone(),
            config.app_id.clone(),
            Arc::clone(&native),
        )),
        profiles: profiles.clone(),
        navigator: Arc::new(WebviewNavigator::new(handle.clone())),
        alerts: Arc::new(DialogAlert::new(handle.clone())),
        launch: Arc::new(DeepLinkLaunchSource::new(handle.clone())),
    };

    let push = PushSubsystem::new(config, platform, deps);
    app.manage(Arc::clone(&push));
    app.manage(native);
    app.manage(profiles);
    app.manage(ListenerHolder::default());

    // Taps forwarded by the shell as deep links. Queued until listeners run.
    let for_links = Arc::clone(&push);
    app.deep_link().on_open_url(move |event| {
        for url in event.urls() {
            for_links.deliver_tap(RawTap::DeepLink(url));
        }
    });

    tauri::async_runtime::spawn(async move {
        if let Some(listeners) = push.boot().await {
            handle.state::<ListenerHolder>().store(listeners);
        }
    });

    Ok(())
}

/// Foreground resume hook.
pub fn on_app_focused(app: &AppHandle) {
    let Some(push) = app.try_state::<Arc<PushSubsystem>>() else {
        return;
    };
    let push = Arc::clone(push.inner());
    tauri::async_runtime::spawn(async move {
        push.on_foreground().await;
    });
}

/// Writes diagnostics on shutdown, if a directory is configured.
pub fn on_app_exit(app: &AppHandle) {
    if let Some(push) = app.try_state::<Arc<PushSubsystem>>() {
        if let Err(e) = push.dump_diagnostics() {
            tracing::warn!(error = %e, "failed to write push diagnostics");
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

#[tauri::command]
pub fn push_notification_received(
    push: State<'_, Arc<PushSubsystem>>,
    notification: RawNotification,
) -> Result<(), String> {
    if push.deliver_received(notification) {
        Ok(())
    } else {
        Err("Push listener is not running".to_string())
    }
}

#[tauri::command]
pub fn push_notification_tapped(
    push: State<'_, Arc<PushSubsystem>>,
    response: RawResponse,
) -> Result<(), String> {
    if push.deliver_tap(RawTap::Response(response)) {
        Ok(())
    } else {
        Err("Push listener is not running".to_string())
    }
}

#[tauri::command]
pub fn push_native_token(native: State<'_, Arc<NativeTokenSlot>>, token: String) -> Result<(), String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("Native device token is empty".to_string());
    }
    native.set(NativeDeviceToken {
        token: token.to_string(),
        platform: PlatformTag::detect(),
    });
    Ok(())
}

#[tauri::command]
pub async fn push_auth_changed(
    push: State<'_, Arc<PushSubsystem>>,
    profiles: State<'_, Arc<RestProfileStore>>,
    user_id: Option<String>,
    access_token: Option<String>,
) -> Result<Option<String>, String> {
    let user = user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(UserId::new);
    profiles.set_access_token(if user.is_some() { access_token } else { None });

    let push = Arc::clone(push.inner());
    Ok(push
        .on_auth_changed(user)
        .await
        .map(|token| token.as_str().to_string()))
}

#[tauri::command]
pub fn push_diagnostics(push: State<'_, Arc<PushSubsystem>>) -> Vec<DiagnosticSnapshot> {
    push.diagnostics()
}
