//! Point-in-time snapshots of notification state, kept for post-hoc
//! debugging. Nothing here feeds back into delivery or routing.

use crate::push::platform::{NotificationCenter, PermissionState};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Snapshots kept in memory before the oldest is dropped.
const SNAPSHOT_CAPACITY: usize = 64;

pub const DIAGNOSTICS_FILE: &str = "push-diagnostics.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSnapshot {
    pub at: DateTime<Utc>,
    pub stage: String,
    /// `None` when the platform could not be queried.
    pub permission: Option<PermissionState>,
    pub channels: Vec<String>,
    pub pending: usize,
    pub presented: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Bounded ring of snapshots.
struct SnapshotRing {
    entries: VecDeque<DiagnosticSnapshot>,
    capacity: usize,
}

impl SnapshotRing {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, snapshot: DiagnosticSnapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }
}

pub struct DiagnosticsRecorder {
    center: Arc<dyn NotificationCenter>,
    ring: Mutex<SnapshotRing>,
}

impl DiagnosticsRecorder {
    pub fn new(center: Arc<dyn NotificationCenter>) -> Self {
        Self::with_capacity(center, SNAPSHOT_CAPACITY)
    }

    pub fn with_capacity(center: Arc<dyn NotificationCenter>, capacity: usize) -> Self {
        Self {
            center,
            ring: Mutex::new(SnapshotRing::new(capacity.max(1))),
        }
    }

    /// Queries the notification centre and stores a snapshot tagged `stage`.
    /// Query failures are folded into the snapshot rather than returned.
    pub async fn record(&self, stage: &str, detail: Option<String>) {
        let permission = match self.center.permission_state().await {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::debug!(stage, error = %e, "diagnostics: permission query failed");
                None
            }
        };
        let counts = match self.center.snapshot().await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::debug!(stage, error = %e, "diagnostics: centre snapshot failed");
                Default::default()
            }
        };

        let snapshot = DiagnosticSnapshot {
            at: Utc::now(),
            stage: stage.to_string(),
            permission,
            channels: counts.channels,
            pending: counts.pending,
            presented: counts.presented,
            detail,
        };

        tracing::debug!(
            stage,
            permission = ?snapshot.permission,
            channels = snapshot.channels.len(),
            pending = snapshot.pending,
            presented = snapshot.presented,
            "push diagnostics"
        );

        self.lock_ring().push(snapshot);
    }

    pub fn snapshots(&self) -> Vec<DiagnosticSnapshot> {
        self.lock_ring().entries.iter().cloned().collect()
    }

    /// Writes all snapshots as pretty JSON into `dir`.
    pub fn dump_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create diagnostics dir: {}", dir.display()))?;
        let contents = serde_json::to_string_pretty(&self.snapshots())
            .context("Failed to serialize diagnostics")?;
        atomic_write(&dir.join(DIAGNOSTICS_FILE), &contents)
    }

    fn lock_ring(&self) -> std::sync::MutexGuard<'_, SnapshotRing> {
        match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Write-to-temp then rename, so readers never see a half-written file.
fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Invalid path: {}", path.display()))?;

    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
        std::process::id()
    ));

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::channel::ChannelConfig;
    use crate::push::error::{PushError, PushResult};
    use crate::push::mirror::LocalBanner;
    use crate::push::platform::CenterSnapshot;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct StaticCenter {
        fail: bool,
    }

    #[async_trait]
    impl NotificationCenter for StaticCenter {
        async fn permission_state(&self) -> PushResult<PermissionState> {
            if self.fail {
                return Err(PushError::Platform("unavailable".into()));
            }
            Ok(PermissionState::Granted)
        }

        async fn request_permission(&self) -> PushResult<PermissionState> {
            Ok(PermissionState::Granted)
        }

        async fn upsert_channel(&self, _channel: &ChannelConfig) -> PushResult<()> {
            Ok(())
        }

        async fn schedule_banner(&self, _banner: &LocalBanner) -> PushResult<()> {
            Ok(())
        }

        async fn snapshot(&self) -> PushResult<CenterSnapshot> {
            if self.fail {
                return Err(PushError::Platform("unavailable".into()));
            }
            Ok(CenterSnapshot {
                channels: vec!["quotepad-alerts".into()],
                pending: 1,
                presented: 2,
            })
        }
    }

    #[tokio::test]
    async fn records_centre_state() {
        let recorder = DiagnosticsRecorder::new(Arc::new(StaticCenter { fail: false }));
        recorder.record("boot", None).await;

        let snaps = recorder.snapshots();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].stage, "boot");
        assert_eq!(snaps[0].permission, Some(PermissionState::Granted));
        assert_eq!(snaps[0].pending, 1);
        assert_eq!(snaps[0].presented, 2);
    }

    #[tokio::test]
    async fn query_failures_still_produce_a_snapshot() {
        let recorder = DiagnosticsRecorder::new(Arc::new(StaticCenter { fail: true }));
        recorder.record("tap", Some("n-1".into())).await;

        let snaps = recorder.snapshots();
        assert_eq!(snaps.len(), 1);
        assert!(snaps[0].permission.is_none());
        assert!(snaps[0].channels.is_empty());
        assert_eq!(snaps[0].detail.as_deref(), Some("n-1"));
    }

    #[tokio::test]
    async fn ring_drops_oldest_entries() {
        let recorder =
            DiagnosticsRecorder::with_capacity(Arc::new(StaticCenter { fail: false }), 2);
        recorder.record("one", None).await;
        recorder.record("two", None).await;
        recorder.record("three", None).await;

        let stages: Vec<_> = recorder.snapshots().into_iter().map(|s| s.stage).collect();
        assert_eq!(stages, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn dump_writes_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = DiagnosticsRecorder::new(Arc::new(StaticCenter { fail: false }));
        recorder.record("boot", None).await;

        let dir = temp_dir.path().join("diag");
        recorder.dump_to(&dir).unwrap();

        let contents = fs::read_to_string(dir.join(DIAGNOSTICS_FILE)).unwrap();
        let parsed: Vec<DiagnosticSnapshot> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].stage, "boot");
    }
}
