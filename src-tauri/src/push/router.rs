//! Tap routing and cold-start resolution. Both entry points share one
//! [`DedupCell`] and one routing sequence, so a delivery is routed at most
//! once regardless of which path observes it first.

use crate::push::dedup::DedupCell;
use crate::push::diagnostics::DiagnosticsRecorder;
use crate::push::payload::NotificationResponse;
use crate::push::platform::{LaunchSource, Navigator};
use crate::push::route::{resolve_route, RouteTarget};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which trigger delivered a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOrigin {
    Live,
    ColdStart,
}

impl TapOrigin {
    fn stage(&self) -> &'static str {
        match self {
            TapOrigin::Live => "tap",
            TapOrigin::ColdStart => "cold_start",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    Navigated(RouteTarget),
    /// Same identity as the last routed delivery; nothing happened.
    Duplicate,
    /// Routed, but the navigator refused the target.
    NavigationFailed(RouteTarget),
}

pub struct TapRouter {
    dedup: Arc<DedupCell>,
    navigator: Arc<dyn Navigator>,
    diagnostics: Arc<DiagnosticsRecorder>,
}

impl TapRouter {
    pub fn new(
        dedup: Arc<DedupCell>,
        navigator: Arc<dyn Navigator>,
        diagnostics: Arc<DiagnosticsRecorder>,
    ) -> Self {
        Self {
            dedup,
            navigator,
            diagnostics,
        }
    }

    pub async fn on_notification_tapped(&self, response: &NotificationResponse) -> TapOutcome {
        self.route(response, TapOrigin::Live).await
    }

    /// check → set → resolve → replace.
    ///
    /// The claim must happen before the first `.await` in this function;
    /// otherwise two interleaved calls for one identity could both pass.
    pub async fn route(&self, response: &NotificationResponse, origin: TapOrigin) -> TapOutcome {
        if !self.dedup.claim(&response.identity) {
            tracing::debug!(
                identity = %response.identity,
                origin = origin.stage(),
                "duplicate notification response ignored"
            );
            return TapOutcome::Duplicate;
        }

        let target = resolve_route(&response.payload);

        self.diagnostics
            .record(origin.stage(), Some(response.identity.to_string()))
            .await;

        match self.navigator.replace(&target) {
            Ok(()) => {
                tracing::info!(
                    identity = %response.identity,
                    origin = origin.stage(),
                    path = %target.path,
                    "routed notification"
                );
                TapOutcome::Navigated(target)
            }
            Err(e) => {
                tracing::error!(
                    identity = %response.identity,
                    path = %target.path,
                    error = %e,
                    "failed to navigate for notification"
                );
                TapOutcome::NavigationFailed(target)
            }
        }
    }
}

/// Routes the launching notification, once per process.
pub struct ColdStartResolver {
    launch: Arc<dyn LaunchSource>,
    router: Arc<TapRouter>,
    ran: AtomicBool,
}

impl ColdStartResolver {
    pub fn new(launch: Arc<dyn LaunchSource>, router: Arc<TapRouter>) -> Self {
        Self {
            launch,
            router,
            ran: AtomicBool::new(false),
        }
    }

    /// Must run after the tap listener is registered. Returns `None` when
    /// there was nothing to route or this already ran.
    pub async fn resolve_cold_start(&self) -> Option<TapOutcome> {
        if self.ran.swap(true, Ordering::SeqCst) {
            return None;
        }

        let response = match self.launch.launch_response().await {
            Ok(Some(response)) => response,
            Ok(None) => {
                tracing::debug!("process was not launched from a notification");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read launch notification");
                return None;
            }
        };

        Some(self.router.route(&response, TapOrigin::ColdStart).await)
    }
}
