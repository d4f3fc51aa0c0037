// Environment configuration for the push subsystem.
// Everything has a default so a missing variable never blocks startup.

use crate::push::channel::DEFAULT_CHANNEL_ID;
use std::path::PathBuf;

pub const DEFAULT_PUSH_SERVICE_URL: &str = "https://exp.host/--/api/v2/push/getExpoPushToken";
pub const DEFAULT_APP_ID: &str = "app.quotepad.mobile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// Project identity the push service scopes tokens to.
    pub project_id: String,
    /// Application bundle / package id sent with token exchanges.
    pub app_id: String,
    pub push_service_url: String,
    /// Base URL of the backend (PostgREST-compatible) data store.
    pub backend_url: String,
    pub backend_anon_key: String,
    pub channel_id: String,
    /// False on simulators, desktop builds, or when disabled by env.
    pub push_capable: bool,
    /// Where diagnostic snapshots are dumped, if anywhere.
    pub diagnostics_dir: Option<PathBuf>,
}

impl PushConfig {
    /// Process environment first, then values baked in at build time.
    /// Installed mobile apps launch without an environment, so release
    /// builds rely on the latter.
    pub fn from_env() -> Self {
        Self::from_lookup(with_fallback(
            |key: &str| std::env::var(key).ok(),
            build_time_value,
        ))
    }

    /// Same as `from_env`, reading through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let disabled = get("QUOTEPAD_PUSH_DISABLED")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            project_id: get("QUOTEPAD_PUSH_PROJECT_ID").unwrap_or_default(),
            app_id: get("QUOTEPAD_APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            push_service_url: get("QUOTEPAD_PUSH_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_PUSH_SERVICE_URL.to_string()),
            backend_url: get("QUOTEPAD_BACKEND_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            backend_anon_key: get("QUOTEPAD_BACKEND_ANON_KEY").unwrap_or_default(),
            channel_id: get("QUOTEPAD_PUSH_CHANNEL_ID")
                .unwrap_or_else(|| DEFAULT_CHANNEL_ID.to_string()),
            push_capable: !disabled && Self::device_has_push(),
            diagnostics_dir: get("QUOTEPAD_DIAGNOSTICS_DIR").map(PathBuf::from),
        }
    }

    /// Real devices only. Simulators build for the `sim` ABI (or x86_64 on
    /// older iOS toolchains) and cannot receive remote pushes.
    fn device_has_push() -> bool {
        #[cfg(target_os = "ios")]
        {
            !(cfg!(target_abi = "sim") || cfg!(target_arch = "x86_64"))
        }

        #[cfg(target_os = "android")]
        {
            true
        }

        #[cfg(not(any(target_os = "ios", target_os = "android")))]
        {
            false
        }
    }

    pub fn backend_configured(&self) -> bool {
        !self.backend_url.is_empty() && !self.backend_anon_key.is_empty()
    }
}

/// `QUOTEPAD_*` values captured by `option_env!` when the crate was built.
pub fn build_time_value(key: &str) -> Option<String> {
    let value = match key {
        "QUOTEPAD_PUSH_PROJECT_ID" => option_env!("QUOTEPAD_PUSH_PROJECT_ID"),
        "QUOTEPAD_APP_ID" => option_env!("QUOTEPAD_APP_ID"),
        "QUOTEPAD_PUSH_SERVICE_URL" => option_env!("QUOTEPAD_PUSH_SERVICE_URL"),
        "QUOTEPAD_BACKEND_URL" => option_env!("QUOTEPAD_BACKEND_URL"),
        "QUOTEPAD_BACKEND_ANON_KEY" => option_env!("QUOTEPAD_BACKEND_ANON_KEY"),
        "QUOTEPAD_PUSH_CHANNEL_ID" => option_env!("QUOTEPAD_PUSH_CHANNEL_ID"),
        "QUOTEPAD_PUSH_DISABLED" => option_env!("QUOTEPAD_PUSH_DISABLED"),
        _ => None,
    };
    value.map(str::to_string)
}

/// Chains two lookups. A blank primary value counts as missing.
pub fn with_fallback<P, F>(primary: P, fallback: F) -> impl Fn(&str) -> Option<String>
where
    P: Fn(&str) -> Option<String>,
    F: Fn(&str) -> Option<String>,
{
    move |key: &str| {
        primary(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| fallback(key))
    }
}
