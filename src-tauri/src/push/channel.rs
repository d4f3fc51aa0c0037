//! Delivery channel declaration for platforms that gate banner prominence on
//! a per-channel importance.

use crate::push::platform::{NotificationCenter, PlatformTag};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DEFAULT_CHANNEL_ID: &str = "quotepad-alerts";
pub const DEFAULT_CHANNEL_NAME: &str = "Quotepad alerts";

/// Vibration pattern in milliseconds: wait, buzz, pause, buzz.
pub const VIBRATION_PATTERN: [u64; 4] = [0, 250, 250, 250];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelImportance {
    Default,
    High,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScreenVisibility {
    Private,
    Public,
}

/// Fixed channel configuration. Reapplying it is always safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: String,
    pub name: String,
    pub importance: ChannelImportance,
    pub vibration_pattern: Vec<u64>,
    /// `None` means the platform default sound.
    pub sound: Option<String>,
    pub show_badge: bool,
    pub lock_screen: LockScreenVisibility,
}

impl ChannelConfig {
    pub fn alerts(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: DEFAULT_CHANNEL_NAME.to_string(),
            importance: ChannelImportance::Max,
            vibration_pattern: VIBRATION_PATTERN.to_vec(),
            sound: None,
            show_badge: true,
            lock_screen: LockScreenVisibility::Public,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::alerts(DEFAULT_CHANNEL_ID)
    }
}

/// Creates or refreshes the one alerts channel.
pub struct ChannelConfigurator {
    center: Arc<dyn NotificationCenter>,
    platform: PlatformTag,
    config: ChannelConfig,
    ready: AtomicBool,
}

impl ChannelConfigurator {
    pub fn new(
        center: Arc<dyn NotificationCenter>,
        platform: PlatformTag,
        config: ChannelConfig,
    ) -> Self {
        Self {
            center,
            platform,
            config,
            ready: AtomicBool::new(false),
        }
    }

    /// Whether the last `ensure_channel` call left a usable channel behind.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Upserts the channel. Never deletes: removing and recreating a channel
    /// resets whatever the user changed in system settings. Failures are
    /// logged and swallowed.
    pub async fn ensure_channel(&self) {
        if self.platform != PlatformTag::UrgencyChannel {
            self.ready.store(true, Ordering::SeqCst);
            return;
        }

        match self.center.upsert_channel(&self.config).await {
            Ok(()) => {
                tracing::debug!(channel = %self.config.id, "notification channel ensured");
                self.ready.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                tracing::warn!(
                    channel = %self.config.id,
                    error = %e,
                    "failed to configure notification channel; banners may be less prominent"
                );
                self.ready.store(false, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_channel_is_maximally_prominent() {
        let config = ChannelConfig::default();
        assert_eq!(config.id, DEFAULT_CHANNEL_ID);
        assert_eq!(config.importance, ChannelImportance::Max);
        assert_eq!(config.lock_screen, LockScreenVisibility::Public);
        assert!(config.show_badge);
        assert!(config.sound.is_none());
        assert_eq!(config.vibration_pattern, vec![0, 250, 250, 250]);
    }
}
