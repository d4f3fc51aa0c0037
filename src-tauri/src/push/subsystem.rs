// Wiring for the push subsystem and its boot sequence.
//
// Boot order is a precondition for exactly-once routing:
//   1. configure the channel
//   2. start the received/tapped listeners
//   3. resolve the cold-start response
//   4. register for push
// Some runtimes report the launching tap to the live listener, some only to
// the cold-start query; the shared dedup cell makes either order safe, but
// only if the listener exists before step 3 runs.

use crate::push::channel::{ChannelConfig, ChannelConfigurator};
use crate::push::config::PushConfig;
use crate::push::dedup::DedupCell;
use crate::push::diagnostics::{DiagnosticSnapshot, DiagnosticsRecorder};
use crate::push::events::{
    event_channel, map_received, map_tap, EventInbox, EventSender, RawNotification, RawTap,
    Subscription,
};
use crate::push::mirror::{ForegroundInterceptor, MirrorPolicy};
use crate::push::platform::{
    AlertPresenter, DeviceToken, LaunchSource, Navigator, NotificationCenter, PlatformTag,
    ProfileStore, PushService, UserId,
};
use crate::push::registrar::TokenRegistrar;
use crate::push::router::{ColdStartResolver, TapOutcome, TapRouter};
use std::sync::{Arc, Mutex};

/// External collaborators the subsystem talks to.
pub struct PushDeps {
    pub center: Arc<dyn NotificationCenter>,
    pub push_service: Arc<dyn PushService>,
    pub profiles: Arc<dyn ProfileStore>,
    pub navigator: Arc<dyn Navigator>,
    pub alerts: Arc<dyn AlertPresenter>,
    pub launch: Arc<dyn LaunchSource>,
}

/// Running listeners. Dropping this stops them.
pub struct Listeners {
    pub received: Subscription,
    pub tapped: Subscription,
}

struct Inboxes {
    received: EventInbox<RawNotification>,
    tapped: EventInbox<RawTap>,
}

pub struct PushSubsystem {
    config: PushConfig,
    channel: ChannelConfigurator,
    registrar: TokenRegistrar,
    interceptor: ForegroundInterceptor,
    router: Arc<TapRouter>,
    cold_start: ColdStartResolver,
    diagnostics: Arc<DiagnosticsRecorder>,
    dedup: Arc<DedupCell>,
    user: Mutex<Option<UserId>>,
    received_tx: EventSender<RawNotification>,
    tapped_tx: EventSender<RawTap>,
    inboxes: Mutex<Option<Inboxes>>,
}

impl PushSubsystem {
    pub fn new(config: PushConfig, platform: PlatformTag, deps: PushDeps) -> Arc<Self> {
        let diagnostics = Arc::new(DiagnosticsRecorder::new(Arc::clone(&deps.center)));
        let dedup = Arc::new(DedupCell::new());

        let channel = ChannelConfigurator::new(
            Arc::clone(&deps.center),
            platform,
            ChannelConfig::alerts(config.channel_id.clone()),
        );
        let registrar = TokenRegistrar::new(
            Arc::clone(&deps.center),
            deps.push_service,
            deps.profiles,
            config.project_id.clone(),
            config.push_capable,
        );
        let interceptor = ForegroundInterceptor::new(
            MirrorPolicy::for_platform(platform, config.channel_id.clone()),
            Arc::clone(&deps.center),
            deps.alerts,
            Arc::clone(&diagnostics),
        );
        let router = Arc::new(TapRouter::new(
            Arc::clone(&dedup),
            deps.navigator,
            Arc::clone(&diagnostics),
        ));
        let cold_start = ColdStartResolver::new(deps.launch, Arc::clone(&router));

        let (received_tx, received_rx) = event_channel("notification-received");
        let (tapped_tx, tapped_rx) = event_channel("notification-tapped");

        Arc::new(Self {
            config,
            channel,
            registrar,
            interceptor,
            router,
            cold_start,
            diagnostics,
            dedup,
            user: Mutex::new(None),
            received_tx,
            tapped_tx,
            inboxes: Mutex::new(Some(Inboxes {
                received: received_rx,
                tapped: tapped_rx,
            })),
        })
    }

    pub fn dedup(&self) -> &DedupCell {
        &self.dedup
    }

    pub fn channel_ready(&self) -> bool {
        self.channel.is_ready()
    }

    /// Runs the full boot sequence. Returns the listener handles, or `None`
    /// if listeners were already started by an earlier call.
    pub async fn boot(self: &Arc<Self>) -> Option<Listeners> {
        self.channel.ensure_channel().await;
        self.diagnostics.record("boot", None).await;

        let listeners = self.start_listeners();
        if listeners.is_none() {
            tracing::warn!("push subsystem booted twice; listeners already running");
        }

        self.cold_start.resolve_cold_start().await;

        let user = self.current_user();
        self.registrar.register_for_push(user.as_ref()).await;

        listeners
    }

    /// Starts draining the received and tapped queues.
    pub fn start_listeners(self: &Arc<Self>) -> Option<Listeners> {
        let inboxes = self.lock_inboxes().take()?;

        let this = Arc::clone(self);
        let received = inboxes.received.listen(move |raw| {
            let this = Arc::clone(&this);
            async move {
                this.handle_received(&raw).await;
            }
        });

        let this = Arc::clone(self);
        let tapped = inboxes.tapped.listen(move |raw| {
            let this = Arc::clone(&this);
            async move {
                this.handle_tap(&raw).await;
            }
        });

        Some(Listeners { received, tapped })
    }

    /// Queues a received notification for the interceptor.
    pub fn deliver_received(&self, raw: RawNotification) -> bool {
        self.received_tx.deliver(raw)
    }

    /// Queues a tap (native response or deep link) for the router.
    pub fn deliver_tap(&self, raw: RawTap) -> bool {
        self.tapped_tx.deliver(raw)
    }

    /// Listener body for received notifications.
    pub async fn handle_received(&self, raw: &RawNotification) -> usize {
        let notification = map_received(raw);
        self.interceptor.on_notification_received(&notification).await
    }

    /// Listener body for taps. `None` when the event was not a notification.
    pub async fn handle_tap(&self, raw: &RawTap) -> Option<TapOutcome> {
        let Some(response) = map_tap(raw) else {
            tracing::debug!("ignoring tap event that is not a notification");
            return None;
        };
        Some(self.router.on_notification_tapped(&response).await)
    }

    /// Sign-in (or sign-out with `None`). Re-registers on sign-in so the new
    /// user's profile gets the token.
    pub async fn on_auth_changed(&self, user: Option<UserId>) -> Option<DeviceToken> {
        *self.lock_user() = user.clone();
        let Some(user) = user else {
            tracing::debug!("signed out; keeping backend token untouched");
            return None;
        };
        self.channel.ensure_channel().await;
        self.registrar.register_for_push(Some(&user)).await
    }

    /// Foreground resume: re-validate the channel and permission snapshot.
    /// Registration only re-runs if the last attempt failed transiently.
    pub async fn on_foreground(&self) {
        self.channel.ensure_channel().await;
        self.diagnostics.record("foreground", None).await;

        if self.registrar.wants_retry() {
            tracing::info!("retrying push registration after earlier failure");
            let user = self.current_user();
            self.registrar.register_for_push(user.as_ref()).await;
        }
    }

    pub fn diagnostics(&self) -> Vec<DiagnosticSnapshot> {
        self.diagnostics.snapshots()
    }

    pub fn dump_diagnostics(&self) -> anyhow::Result<()> {
        match &self.config.diagnostics_dir {
            Some(dir) => self.diagnostics.dump_to(dir),
            None => Ok(()),
        }
    }

    fn current_user(&self) -> Option<UserId> {
        self.lock_user().clone()
    }

    fn lock_user(&self) -> std::sync::MutexGuard<'_, Option<UserId>> {
        match self.user.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_inboxes(&self) -> std::sync::MutexGuard<'_, Option<Inboxes>> {
        match self.inboxes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
