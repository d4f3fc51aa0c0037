// HTTP implementations of the remote seams: the push service token exchange
// and the backend profile record.

use crate::push::error::{PushError, PushResult};
use crate::push::platform::{DeviceToken, PlatformTag, ProfileStore, PushService, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::watch;

/// APNs/FCM token as handed over by the native shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeDeviceToken {
    pub token: String,
    pub platform: PlatformTag,
}

/// Holds the native token once the shell reports it. Fetches wait for it.
pub struct NativeTokenSlot {
    tx: watch::Sender<Option<NativeDeviceToken>>,
}

impl Default for NativeTokenSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeTokenSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn set(&self, token: NativeDeviceToken) {
        self.tx.send_replace(Some(token));
    }

    pub fn current(&self) -> Option<NativeDeviceToken> {
        self.tx.borrow().clone()
    }

    /// Resolves once a token is present. No timeout: if the shell never
    /// reports one, registration simply never completes.
    pub async fn wait(&self) -> PushResult<NativeDeviceToken> {
        let mut rx = self.tx.subscribe();
        let guard = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| PushError::NoNativeToken)?;
        guard.clone().ok_or(PushError::NoNativeToken)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenExchangeRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    device_token: &'a str,
    project_id: &'a str,
    app_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenExchangeData {
    expo_push_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    data: Option<TokenExchangeData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

fn parse_exchange_response(body: &str) -> PushResult<DeviceToken> {
    let parsed: TokenExchangeResponse = serde_json::from_str(body)?;
    if !parsed.errors.is_empty() {
        return Err(PushError::PushService(format!(
            "token exchange rejected: {}",
            serde_json::Value::Array(parsed.errors)
        )));
    }
    parsed
        .data
        .and_then(|d| d.expo_push_token)
        .filter(|t| !t.trim().is_empty())
        .map(DeviceToken::new)
        .ok_or_else(|| PushError::PushService("response carried no token".into()))
}

/// Exchanges the native device token for a push-service delivery token.
pub struct HttpPushService {
    client: reqwest::Client,
    url: String,
    app_id: String,
    native: std::sync::Arc<NativeTokenSlot>,
}

impl HttpPushService {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        app_id: impl Into<String>,
        native: std::sync::Arc<NativeTokenSlot>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            app_id: app_id.into(),
            native,
        }
    }
}

#[async_trait]
impl PushService for HttpPushService {
    async fn fetch_token(&self, project_id: &str) -> PushResult<DeviceToken> {
        if project_id.is_empty() {
            return Err(PushError::NotConfigured("push project id"));
        }
        let native = self.native.wait().await?;
        let request = TokenExchangeRequest {
            kind: native.platform.wire_name(),
            device_token: &native.token,
            project_id,
            app_id: &self.app_id,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PushError::PushService(format!(
                "token exchange failed with {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        parse_exchange_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ProfileTokenRow {
    push_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProfileTokenUpdate<'a> {
    push_token: &'a str,
}

/// `profiles` table behind a PostgREST-style API.
pub struct RestProfileStore {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Mutex<Option<String>>,
}

impl RestProfileStore {
    pub fn new(client: reqwest::Client, base_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            access_token: Mutex::new(None),
        }
    }

    /// Session token for row-level security; `None` falls back to the anon key.
    pub fn set_access_token(&self, token: Option<String>) {
        let mut slot = match self.access_token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = token;
    }

    fn profile_url(&self, user: &UserId) -> PushResult<String> {
        if self.base_url.is_empty() {
            return Err(PushError::NotConfigured("backend URL"));
        }
        Ok(profile_url(&self.base_url, user))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = match self.access_token.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
        .unwrap_or_else(|| self.anon_key.clone());
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

fn profile_url(base_url: &str, user: &UserId) -> String {
    let id: String = url::form_urlencoded::byte_serialize(user.as_str().as_bytes()).collect();
    format!("{}/rest/v1/profiles?id=eq.{}", base_url, id)
}

fn parse_profile_rows(body: &str) -> PushResult<Option<DeviceToken>> {
    let rows: Vec<ProfileTokenRow> = serde_json::from_str(body)?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.push_token)
        .filter(|t| !t.is_empty())
        .map(DeviceToken::new))
}

async fn check_status(response: reqwest::Response) -> PushResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(PushError::Backend {
            status: status.as_u16(),
            message: body.trim().to_string(),
        })
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    async fn cached_token(&self, user: &UserId) -> PushResult<Option<DeviceToken>> {
        let url = format!("{}&select=push_token", self.profile_url(user)?);
        let response = self.authorized(self.client.get(url)).send().await?;
        let body = check_status(response).await?;
        parse_profile_rows(&body)
    }

    async fn write_token(&self, user: &UserId, token: &DeviceToken) -> PushResult<()> {
        let update = ProfileTokenUpdate {
            push_token: token.as_str(),
        };
        let response = self
            .authorized(self.client.patch(self.profile_url(user)?))
            .header("Prefer", "return=minimal")
            .json(&update)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
