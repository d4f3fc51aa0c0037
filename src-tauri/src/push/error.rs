// Error type shared by every push seam.
//
// Nothing in this subsystem is allowed to take the host down, so callers at
// the top of each flow log these and degrade instead of propagating.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    /// The OS notification layer (permission, channel, scheduling) failed.
    #[error("notification platform error: {0}")]
    Platform(String),

    /// The push service refused or mangled the token exchange.
    #[error("push service error: {0}")]
    PushService(String),

    /// The native shell never handed over an APNs/FCM device token.
    #[error("no native device token available")]
    NoNativeToken,

    /// The backend profile store answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required setting was never provided.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The in-app router could not be driven.
    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl PushError {
    /// Transient failures are worth another attempt on the next foreground.
    pub fn is_transient(&self) -> bool {
        match self {
            PushError::Http(_) | PushError::PushService(_) | PushError::NoNativeToken => true,
            PushError::Backend { status, .. } => *status >= 500 || *status == 429,
            PushError::Platform(_)
            | PushError::Json(_)
            | PushError::NotConfigured(_)
            | PushError::Navigation(_) => false,
        }
    }
}

pub type PushResult<T> = std::result::Result<T, PushError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_side_backend_errors_are_transient() {
        let err = PushError::Backend {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());

        let err = PushError::Backend {
            status: 403,
            message: "forbidden".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn platform_errors_are_not_transient() {
        assert!(!PushError::Platform("no channel support".into()).is_transient());
        assert!(PushError::NoNativeToken.is_transient());
        assert!(!PushError::NotConfigured("backend URL").is_transient());
    }
}
