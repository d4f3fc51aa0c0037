//! In-memory stand-ins for every platform seam, plus a shared journal so
//! tests can assert the order in which the subsystem touched them.

use async_trait::async_trait;
use quotepad_mobile_lib::push::channel::ChannelConfig;
use quotepad_mobile_lib::push::config::PushConfig;
use quotepad_mobile_lib::push::events::{RawContent, RawDeviceState, RawNotification, RawRequest, RawResponse};
use quotepad_mobile_lib::push::mirror::LocalBanner;
use quotepad_mobile_lib::push::payload::{DeliveryIdentity, NotificationPayload, NotificationResponse};
use quotepad_mobile_lib::push::platform::{
    AlertPresenter, CenterSnapshot, DeviceToken, LaunchSource, Navigator, NotificationCenter,
    PermissionState, PlatformTag, ProfileStore, PushService, UserId,
};
use quotepad_mobile_lib::push::{PushDeps, PushError, PushResult, PushSubsystem, RouteTarget};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type Journal = Arc<Mutex<Vec<&'static str>>>;

fn note(journal: &Journal, entry: &'static str) {
    journal.lock().unwrap().push(entry);
}

pub struct FakeCenter {
    journal: Journal,
    permission: Mutex<PermissionState>,
    grant_on_request: AtomicBool,
    pub permission_requests: AtomicUsize,
    pub upserts: Mutex<Vec<ChannelConfig>>,
    pub banners: Mutex<Vec<LocalBanner>>,
    pub fail_upsert: AtomicBool,
    /// Yield inside snapshot() so callers awaiting it interleave.
    pub yield_in_snapshot: AtomicBool,
}

impl FakeCenter {
    pub fn new(journal: Journal, permission: PermissionState) -> Self {
        Self {
            journal,
            permission: Mutex::new(permission),
            grant_on_request: AtomicBool::new(true),
            permission_requests: AtomicUsize::new(0),
            upserts: Mutex::new(Vec::new()),
            banners: Mutex::new(Vec::new()),
            fail_upsert: AtomicBool::new(false),
            yield_in_snapshot: AtomicBool::new(false),
        }
    }

    pub fn deny_requests(&self) {
        self.grant_on_request.store(false, Ordering::SeqCst);
    }

    pub fn banners(&self) -> Vec<LocalBanner> {
        self.banners.lock().unwrap().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationCenter for FakeCenter {
    async fn permission_state(&self) -> PushResult<PermissionState> {
        Ok(*self.permission.lock().unwrap())
    }

    async fn request_permission(&self) -> PushResult<PermissionState> {
        note(&self.journal, "permission_request");
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let mut permission = self.permission.lock().unwrap();
        if *permission == PermissionState::Undetermined {
            *permission = if self.grant_on_request.load(Ordering::SeqCst) {
                PermissionState::Granted
            } else {
                PermissionState::Denied
            };
        }
        Ok(*permission)
    }

    async fn upsert_channel(&self, channel: &ChannelConfig) -> PushResult<()> {
        note(&self.journal, "channel");
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(PushError::Platform("channel service unavailable".into()));
        }
        self.upserts.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn schedule_banner(&self, banner: &LocalBanner) -> PushResult<()> {
        note(&self.journal, "banner");
        self.banners.lock().unwrap().push(banner.clone());
        Ok(())
    }

    async fn snapshot(&self) -> PushResult<CenterSnapshot> {
        if self.yield_in_snapshot.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let channels = self
            .upserts
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        Ok(CenterSnapshot {
            channels,
            pending: 0,
            presented: self.banners.lock().unwrap().len(),
        })
    }
}

pub struct FakePushService {
    journal: Journal,
    token: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl FakePushService {
    pub fn new(journal: Journal, token: Option<&str>) -> Self {
        Self {
            journal,
            token: Mutex::new(token.map(str::to_string)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_token(&self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(str::to_string);
    }
}

#[async_trait]
impl PushService for FakePushService {
    async fn fetch_token(&self, project_id: &str) -> PushResult<DeviceToken> {
        note(&self.journal, "fetch");
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!project_id.is_empty(), "project id must be forwarded");
        match self.token.lock().unwrap().clone() {
            Some(token) => Ok(DeviceToken::new(token)),
            None => Err(PushError::PushService("service unavailable".into())),
        }
    }
}

#[derive(Default)]
pub struct FakeProfileStore {
    cached: Mutex<HashMap<UserId, DeviceToken>>,
    pub writes: Mutex<Vec<(UserId, DeviceToken)>>,
    fail_status: Mutex<Option<u16>>,
}

impl FakeProfileStore {
    pub fn with_cached(user: &str, token: &str) -> Self {
        let store = Self::default();
        store
            .cached
            .lock()
            .unwrap()
            .insert(UserId::new(user), DeviceToken::new(token));
        store
    }

    pub fn fail_with(&self, status: Option<u16>) {
        *self.fail_status.lock().unwrap() = status;
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn cached(&self, user: &str) -> Option<DeviceToken> {
        self.cached.lock().unwrap().get(&UserId::new(user)).cloned()
    }

    fn check(&self) -> PushResult<()> {
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(PushError::Backend {
                status,
                message: "rejected".into(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn cached_token(&self, user: &UserId) -> PushResult<Option<DeviceToken>> {
        self.check()?;
        Ok(self.cached.lock().unwrap().get(user).cloned())
    }

    async fn write_token(&self, user: &UserId, token: &DeviceToken) -> PushResult<()> {
        self.check()?;
        self.writes
            .lock()
            .unwrap()
            .push((user.clone(), token.clone()));
        self.cached
            .lock()
            .unwrap()
            .insert(user.clone(), token.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub replaced: Mutex<Vec<RouteTarget>>,
    pub fail: AtomicBool,
}

impl RecordingNavigator {
    pub fn replaced(&self) -> Vec<RouteTarget> {
        self.replaced.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, target: &RouteTarget) -> PushResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PushError::Navigation("router not mounted".into()));
        }
        self.replaced.lock().unwrap().push(target.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    pub shown: Mutex<Vec<(String, String)>>,
}

impl RecordingAlerts {
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

impl AlertPresenter for RecordingAlerts {
    fn show_alert(&self, title: &str, body: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

type LaunchHook = Box<dyn Fn() + Send + Sync>;

/// Launch response source. An optional hook runs inside the query, which
/// lets a test race a live tap against cold-start resolution.
pub struct FakeLaunchSource {
    journal: Journal,
    response: Mutex<Option<NotificationResponse>>,
    hook: Mutex<Option<LaunchHook>>,
    pub queries: AtomicUsize,
}

impl FakeLaunchSource {
    pub fn new(journal: Journal, response: Option<NotificationResponse>) -> Self {
        Self {
            journal,
            response: Mutex::new(response),
            hook: Mutex::new(None),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn on_query(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }
}

#[async_trait]
impl LaunchSource for FakeLaunchSource {
    async fn launch_response(&self) -> PushResult<Option<NotificationResponse>> {
        note(&self.journal, "launch");
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook();
        }
        tokio::task::yield_now().await;
        Ok(self.response.lock().unwrap().clone())
    }
}

/// Every fake wired into one subsystem, with handles kept for assertions.
pub struct Harness {
    pub journal: Journal,
    pub center: Arc<FakeCenter>,
    pub push_service: Arc<FakePushService>,
    pub profiles: Arc<FakeProfileStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub alerts: Arc<RecordingAlerts>,
    pub launch: Arc<FakeLaunchSource>,
}

impl Harness {
    pub fn new() -> Self {
        let journal: Journal = Arc::default();
        Self {
            center: Arc::new(FakeCenter::new(journal.clone(), PermissionState::Granted)),
            push_service: Arc::new(FakePushService::new(journal.clone(), Some("tok-1"))),
            profiles: Arc::new(FakeProfileStore::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            alerts: Arc::new(RecordingAlerts::default()),
            launch: Arc::new(FakeLaunchSource::new(journal.clone(), None)),
            journal,
        }
    }

    pub fn with_launch(mut self, response: NotificationResponse) -> Self {
        self.launch = Arc::new(FakeLaunchSource::new(self.journal.clone(), Some(response)));
        self
    }

    pub fn with_profiles(mut self, profiles: FakeProfileStore) -> Self {
        self.profiles = Arc::new(profiles);
        self
    }

    pub fn deps(&self) -> PushDeps {
        PushDeps {
            center: self.center.clone(),
            push_service: self.push_service.clone(),
            profiles: self.profiles.clone(),
            navigator: self.navigator.clone(),
            alerts: self.alerts.clone(),
            launch: self.launch.clone(),
        }
    }

    pub fn subsystem(&self, platform: PlatformTag) -> Arc<PushSubsystem> {
        PushSubsystem::new(test_config(), platform, self.deps())
    }

    pub fn journal(&self) -> Vec<&'static str> {
        self.journal.lock().unwrap().clone()
    }
}

pub fn test_config() -> PushConfig {
    let mut config = PushConfig::from_lookup(|key: &str| match key {
        "QUOTEPAD_PUSH_PROJECT_ID" => Some("proj-test".to_string()),
        _ => None,
    });
    config.push_capable = true;
    config
}

pub fn raw_notification(identifier: &str, title: Option<&str>, body: Option<&str>, data: Value) -> RawNotification {
    RawNotification {
        request: RawRequest {
            identifier: identifier.to_string(),
            content: RawContent {
                title: title.map(str::to_string),
                body: body.map(str::to_string),
                data,
            },
        },
        device: RawDeviceState::default(),
    }
}

pub fn raw_response(identifier: &str, data: Value) -> RawResponse {
    RawResponse {
        notification: raw_notification(identifier, None, None, data),
        action_identifier: None,
    }
}

pub fn response(identifier: &str, payload: NotificationPayload) -> NotificationResponse {
    NotificationResponse {
        identity: DeliveryIdentity::new(identifier),
        payload,
        action: None,
    }
}
