//! Foreground interception: decides whether a notification that arrived while
//! the app is alive needs a locally synthesized banner, and schedules it.
//!
//! Mirroring never navigates. A mirrored banner that the user taps comes back
//! through the tap router like any other delivery.

use crate::push::diagnostics::DiagnosticsRecorder;
use crate::push::payload::{NotificationContent, NotificationPayload, ReceivedNotification};
use crate::push::platform::{AlertPresenter, NotificationCenter, PlatformTag};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

pub const GENERIC_TITLE: &str = "New notification";
pub const GENERIC_BODY: &str = "You have a new update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerPriority {
    Default,
    Max,
}

/// A locally scheduled notification. Always fires immediately and is never
/// persisted across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalBanner {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub title: String,
    pub body: String,
    /// Always carries the mirror marker.
    pub payload: NotificationPayload,
    pub priority: BannerPriority,
}

/// One thing the interceptor should do for a received notification.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorAction {
    Banner {
        channel_id: Option<String>,
        title: String,
        body: String,
        priority: BannerPriority,
        payload: NotificationPayload,
    },
    ModalAlert {
        title: String,
        body: String,
    },
}

/// Per-platform mirroring rules, chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorPolicy {
    /// Always mirror onto the alerts channel; add a modal when alerts are
    /// suppressed, since the channel banner may be hidden.
    UrgencyChannel { channel_id: String },
    /// Trust native foreground presentation unless the push is silent.
    NativeForeground,
}

impl MirrorPolicy {
    pub fn for_platform(platform: PlatformTag, channel_id: impl Into<String>) -> Self {
        match platform {
            PlatformTag::UrgencyChannel => MirrorPolicy::UrgencyChannel {
                channel_id: channel_id.into(),
            },
            PlatformTag::NativeForeground => MirrorPolicy::NativeForeground,
        }
    }

    /// Pure decision for one received notification.
    pub fn plan(&self, notification: &ReceivedNotification) -> Vec<MirrorAction> {
        let content = &notification.content;
        if content.payload.is_mirrored() {
            return Vec::new();
        }

        match self {
            MirrorPolicy::UrgencyChannel { channel_id } => {
                let (title, body) = banner_text(content);
                let mut actions = vec![MirrorAction::Banner {
                    channel_id: Some(channel_id.clone()),
                    title: title.clone(),
                    body: body.clone(),
                    priority: BannerPriority::Max,
                    payload: content.payload.mirrored(),
                }];
                if notification.alert_suppressed {
                    actions.push(MirrorAction::ModalAlert { title, body });
                }
                actions
            }
            MirrorPolicy::NativeForeground => {
                if content.has_visible_text() {
                    return Vec::new();
                }
                vec![MirrorAction::Banner {
                    channel_id: None,
                    title: GENERIC_TITLE.to_string(),
                    body: humanized_type(&content.payload),
                    priority: BannerPriority::Default,
                    payload: content.payload.mirrored(),
                }]
            }
        }
    }
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn banner_text(content: &NotificationContent) -> (String, String) {
    let title = non_blank(&content.title).unwrap_or_else(|| GENERIC_TITLE.to_string());
    let body = non_blank(&content.body).unwrap_or_else(|| humanized_type(&content.payload));
    (title, body)
}

/// `support_message` → `support message`; no type → generic body.
pub fn humanized_type(payload: &NotificationPayload) -> String {
    match payload.type_tag() {
        Some(tag) => tag.replace('_', " "),
        None => GENERIC_BODY.to_string(),
    }
}

/// Passive listener body for received notifications.
pub struct ForegroundInterceptor {
    policy: MirrorPolicy,
    center: Arc<dyn NotificationCenter>,
    alerts: Arc<dyn AlertPresenter>,
    diagnostics: Arc<DiagnosticsRecorder>,
    next_banner_id: AtomicI32,
}

impl ForegroundInterceptor {
    pub fn new(
        policy: MirrorPolicy,
        center: Arc<dyn NotificationCenter>,
        alerts: Arc<dyn AlertPresenter>,
        diagnostics: Arc<DiagnosticsRecorder>,
    ) -> Self {
        Self {
            policy,
            center,
            alerts,
            diagnostics,
            next_banner_id: AtomicI32::new(1),
        }
    }

    /// Carries out the policy's plan. Returns the number of banners
    /// successfully scheduled.
    pub async fn on_notification_received(&self, notification: &ReceivedNotification) -> usize {
        let actions = self.policy.plan(notification);
        if actions.is_empty() {
            tracing::debug!(
                identity = %notification.identity,
                mirrored = notification.content.payload.is_mirrored(),
                "no mirroring needed"
            );
            return 0;
        }

        let mut scheduled = 0;
        for action in actions {
            match action {
                MirrorAction::Banner {
                    channel_id,
                    title,
                    body,
                    priority,
                    payload,
                } => {
                    let banner = LocalBanner {
                        id: self.next_banner_id.fetch_add(1, Ordering::SeqCst),
                        channel_id,
                        title,
                        body,
                        payload,
                        priority,
                    };
                    match self.center.schedule_banner(&banner).await {
                        Ok(()) => {
                            scheduled += 1;
                            tracing::info!(
                                identity = %notification.identity,
                                banner_id = banner.id,
                                "mirrored foreground notification"
                            );
                        }
                        Err(e) => tracing::warn!(
                            identity = %notification.identity,
                            error = %e,
                            "failed to schedule mirrored banner"
                        ),
                    }
                }
                MirrorAction::ModalAlert { title, body } => {
                    tracing::info!(
                        identity = %notification.identity,
                        "alerts suppressed; showing in-app fallback"
                    );
                    self.alerts.show_alert(&title, &body);
                }
            }
        }

        self.diagnostics
            .record("mirrored", Some(notification.identity.to_string()))
            .await;
        scheduled
    }
}
