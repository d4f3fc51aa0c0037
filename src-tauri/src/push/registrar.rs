//! Permission escalation, push token retrieval and backend reconciliation.

use crate::push::error::{PushError, PushResult};
use crate::push::platform::{
    DeviceToken, NotificationCenter, PermissionState, ProfileStore, PushService, UserId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What happened to the backend copy of the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSync {
    /// Backend already had this token.
    Unchanged,
    /// Backend held a different (or no) token and was updated.
    Written,
    /// No signed-in user; nothing to associate the token with yet.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Simulator, desktop, or push explicitly disabled.
    Unsupported,
    PermissionDenied,
    Registered { token: DeviceToken, sync: TokenSync },
}

pub struct TokenRegistrar {
    center: Arc<dyn NotificationCenter>,
    push_service: Arc<dyn PushService>,
    profiles: Arc<dyn ProfileStore>,
    project_id: String,
    push_capable: bool,
    retry_on_foreground: AtomicBool,
}

impl TokenRegistrar {
    pub fn new(
        center: Arc<dyn NotificationCenter>,
        push_service: Arc<dyn PushService>,
        profiles: Arc<dyn ProfileStore>,
        project_id: impl Into<String>,
        push_capable: bool,
    ) -> Self {
        Self {
            center,
            push_service,
            profiles,
            project_id: project_id.into(),
            push_capable,
            retry_on_foreground: AtomicBool::new(false),
        }
    }

    /// Best-effort registration. Never fails: errors are logged and turn
    /// into `None`.
    pub async fn register_for_push(&self, user: Option<&UserId>) -> Option<DeviceToken> {
        match self.try_register(user).await {
            Ok(Registration::Registered { token, sync }) => {
                self.retry_on_foreground.store(false, Ordering::SeqCst);
                tracing::info!(?sync, user = ?user.map(UserId::as_str), "push registration complete");
                Some(token)
            }
            Ok(Registration::Unsupported) => {
                tracing::debug!("push not available in this environment; skipping registration");
                None
            }
            Ok(Registration::PermissionDenied) => {
                self.retry_on_foreground.store(false, Ordering::SeqCst);
                tracing::info!("notification permission not granted; push disabled");
                None
            }
            Err(e) => {
                let transient = e.is_transient();
                self.retry_on_foreground.store(transient, Ordering::SeqCst);
                tracing::warn!(error = %e, transient, "push registration failed");
                None
            }
        }
    }

    /// Whether the last attempt failed in a way the next foreground resume
    /// should retry.
    pub fn wants_retry(&self) -> bool {
        self.retry_on_foreground.load(Ordering::SeqCst)
    }

    pub async fn try_register(&self, user: Option<&UserId>) -> PushResult<Registration> {
        if !self.push_capable {
            return Ok(Registration::Unsupported);
        }

        if !self.ensure_permission().await? {
            return Ok(Registration::PermissionDenied);
        }

        let token = self.push_service.fetch_token(&self.project_id).await?;
        if token.as_str().trim().is_empty() {
            return Err(PushError::PushService("push service issued an empty token".into()));
        }

        let Some(user) = user else {
            return Ok(Registration::Registered {
                token,
                sync: TokenSync::Deferred,
            });
        };

        let sync = self.reconcile(user, &token).await?;
        Ok(Registration::Registered { token, sync })
    }

    /// One request at most. Granted state is never downgraded here.
    async fn ensure_permission(&self) -> PushResult<bool> {
        let current = self.center.permission_state().await?;
        if current == PermissionState::Granted {
            return Ok(true);
        }
        let requested = self.center.request_permission().await?;
        Ok(requested == PermissionState::Granted)
    }

    /// Write-on-diff against the backend profile.
    async fn reconcile(&self, user: &UserId, token: &DeviceToken) -> PushResult<TokenSync> {
        let cached = self.profiles.cached_token(user).await?;
        if cached.as_ref() == Some(token) {
            return Ok(TokenSync::Unchanged);
        }
        self.profiles.write_token(user, token).await?;
        Ok(TokenSync::Written)
    }
}
