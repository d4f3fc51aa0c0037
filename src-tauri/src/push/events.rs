//! Platform event shapes and the listener plumbing that carries them in.
//!
//! The native shell and the webview hand us notifications in their own JSON
//! shapes, and taps may also arrive as deep links. This module is the only
//! place those shapes are known; everything downstream sees
//! [`ReceivedNotification`] and [`NotificationResponse`].

use crate::push::payload::{
    DeliveryIdentity, NotificationContent, NotificationPayload, NotificationResponse,
    ReceivedNotification,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use percent_encoding::percent_decode_str;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

pub const DEEP_LINK_SCHEME: &str = "quotepad";
pub const DEEP_LINK_HOST: &str = "notification";

/// Android `NotificationManager.INTERRUPTION_FILTER_ALL`; anything above it
/// means some alerts are being withheld.
const INTERRUPTION_FILTER_ALL: i32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Usually an object; some senders deliver it as a JSON string.
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub identifier: String,
    #[serde(default)]
    pub content: RawContent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceState {
    /// Android interruption filter (1 = all alerts allowed).
    #[serde(default)]
    pub interruption_filter: Option<i32>,
    /// iOS Focus / Do Not Disturb.
    #[serde(default)]
    pub focus_active: Option<bool>,
}

/// A notification as reported by the native shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    pub request: RawRequest,
    #[serde(default)]
    pub device: RawDeviceState,
}

/// A tap as reported by the native shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    pub notification: RawNotification,
    #[serde(default)]
    pub action_identifier: Option<String>,
}

/// Anything on the tap channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTap {
    Response(RawResponse),
    DeepLink(Url),
}

fn payload_from_data(data: &Value) -> NotificationPayload {
    match data {
        Value::String(s) => serde_json::from_str::<Value>(s)
            .map(NotificationPayload::from_value)
            .unwrap_or_default(),
        other => NotificationPayload::from_value(other.clone()),
    }
}

impl RawDeviceState {
    fn alerts_suppressed(&self) -> bool {
        let filtered = self
            .interruption_filter
            .is_some_and(|f| f > INTERRUPTION_FILTER_ALL);
        filtered || self.focus_active.unwrap_or(false)
    }
}

pub fn map_received(raw: &RawNotification) -> ReceivedNotification {
    let content = &raw.request.content;
    ReceivedNotification {
        identity: DeliveryIdentity::new(raw.request.identifier.clone()),
        content: NotificationContent {
            title: content.title.clone(),
            body: content.body.clone(),
            payload: payload_from_data(&content.data),
        },
        alert_suppressed: raw.device.alerts_suppressed(),
    }
}

pub fn map_response(raw: &RawResponse) -> NotificationResponse {
    let request = &raw.notification.request;
    NotificationResponse {
        identity: DeliveryIdentity::new(request.identifier.clone()),
        payload: payload_from_data(&request.content.data),
        action: raw.action_identifier.clone(),
    }
}

/// `quotepad://notification/<identity>?type=...&ticket_id=...`
///
/// Also accepts `https://<any host>/notification/<identity>?...` for
/// universal links. Returns `None` for unrelated URLs.
pub fn map_deep_link(url: &Url) -> Option<NotificationResponse> {
    let mut segments: Vec<String> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    let is_ours = match url.scheme() {
        DEEP_LINK_SCHEME => url.host_str() == Some(DEEP_LINK_HOST),
        "https" => {
            if segments.first().map(String::as_str) == Some(DEEP_LINK_HOST) {
                segments.remove(0);
                true
            } else {
                false
            }
        }
        _ => false,
    };
    if !is_ours {
        return None;
    }

    let identity = segments.into_iter().next()?;
    let identity = percent_decode(&identity);

    let payload = url
        .query_pairs()
        .fold(NotificationPayload::new(), |p, (k, v)| {
            p.with(k.into_owned(), v.into_owned())
        });

    Some(NotificationResponse {
        identity: DeliveryIdentity::new(identity),
        payload,
        action: None,
    })
}

// Path segments are not form data: '&', '=' and '+' are literal here.
fn percent_decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

pub fn map_tap(raw: &RawTap) -> Option<NotificationResponse> {
    match raw {
        RawTap::Response(r) => Some(map_response(r)),
        RawTap::DeepLink(url) => map_deep_link(url),
    }
}

/// Producer side of a listener queue. Cheap to clone; events delivered
/// before the listener starts are held until it does.
pub struct EventSender<E> {
    name: &'static str,
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<E> EventSender<E> {
    /// Queues an event. Returns false if the listener is gone.
    pub fn deliver(&self, event: E) -> bool {
        let delivered = self.tx.send(event).is_ok();
        if !delivered {
            tracing::warn!(listener = self.name, "event dropped: listener is gone");
        }
        delivered
    }
}

/// Consumer side, waiting for [`EventInbox::listen`].
pub struct EventInbox<E> {
    name: &'static str,
    rx: mpsc::UnboundedReceiver<E>,
}

pub fn event_channel<E>(name: &'static str) -> (EventSender<E>, EventInbox<E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { name, tx }, EventInbox { name, rx })
}

impl<E: Send + 'static> EventInbox<E> {
    /// Starts draining the queue, one event at a time, in arrival order.
    /// Must be called from within a tokio runtime.
    pub fn listen<F, Fut>(self, handler: F) -> Subscription
    where
        F: Fn(E) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let EventInbox { name, mut rx } = self;
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler(event).await;
            }
            tracing::debug!(listener = name, "listener closed");
        });
        tracing::debug!(listener = name, "listener registered");
        Subscription {
            name,
            task: Some(task),
        }
    }
}

/// Handle for a running listener. Dropping it stops the listener.
pub struct Subscription {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for the listener to finish, which happens once every
    /// [`EventSender`] for it has been dropped and the queue is empty.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(listener = self.name, error = %e, "listener task ended abnormally");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
