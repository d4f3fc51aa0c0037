// Seams between the push core and the outside world.
//
// Everything behind these traits is either the OS (permission, channels,
// local scheduling), a remote service (push token exchange, backend profile),
// or the webview (navigation, alerts). The Tauri-backed implementations live
// in `tauri_bridge`; tests use in-memory fakes.

use crate::push::channel::ChannelConfig;
use crate::push::error::PushResult;
use crate::push::mirror::LocalBanner;
use crate::push::payload::NotificationResponse;
use crate::push::route::RouteTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// OS notification permission as far as this subsystem cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Undetermined,
    Granted,
    Denied,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Undetermined => write!(f, "undetermined"),
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
        }
    }
}

/// Which foreground-presentation family the device belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformTag {
    /// Needs an explicit high-importance channel for heads-up banners and
    /// does not show a banner for pushes received in the foreground.
    UrgencyChannel,
    /// Presents foreground banners natively when the push has visible text.
    NativeForeground,
}

impl PlatformTag {
    pub fn detect() -> Self {
        if cfg!(target_os = "android") {
            PlatformTag::UrgencyChannel
        } else {
            PlatformTag::NativeForeground
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            PlatformTag::UrgencyChannel => "fcm",
            PlatformTag::NativeForeground => "apns",
        }
    }
}

/// Counts observed on the notification centre, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterSnapshot {
    pub channels: Vec<String>,
    pub pending: usize,
    pub presented: usize,
}

/// OS notification layer.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn permission_state(&self) -> PushResult<PermissionState>;

    async fn request_permission(&self) -> PushResult<PermissionState>;

    /// Creates or updates a channel. Must never delete one.
    async fn upsert_channel(&self, channel: &ChannelConfig) -> PushResult<()>;

    /// Shows a local banner immediately.
    async fn schedule_banner(&self, banner: &LocalBanner) -> PushResult<()>;

    async fn snapshot(&self) -> PushResult<CenterSnapshot>;
}

/// Remote push service that issues delivery tokens.
#[async_trait]
pub trait PushService: Send + Sync {
    async fn fetch_token(&self, project_id: &str) -> PushResult<DeviceToken>;
}

/// Backend profile record holding the cached `push_token`.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn cached_token(&self, user: &UserId) -> PushResult<Option<DeviceToken>>;

    async fn write_token(&self, user: &UserId, token: &DeviceToken) -> PushResult<()>;
}

/// The in-app router.
pub trait Navigator: Send + Sync {
    /// Replaces the whole navigation stack with `target`.
    fn replace(&self, target: &RouteTarget) -> PushResult<()>;
}

/// In-process modal alert, used when channel delivery may be hidden.
pub trait AlertPresenter: Send + Sync {
    fn show_alert(&self, title: &str, body: &str);
}

/// Source of the notification response that launched the process, if any.
#[async_trait]
pub trait LaunchSource: Send + Sync {
    async fn launch_response(&self) -> PushResult<Option<NotificationResponse>>;
}

/// Delivery token issued by the push service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceToken(String);

impl DeviceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated backend user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
