// ── Core error types ──
//
// User-facing errors from damwatch-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<damwatch_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- sign in again")]
    SessionExpired,

    #[error("Request timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Operation rejected: {message}")]
    Rejected { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this failure means the session is gone and the user should
    /// land back on the login screen.
    pub fn is_session_loss(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<damwatch_api::Error> for CoreError {
    fn from(err: damwatch_api::Error) -> Self {
        match err {
            damwatch_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            damwatch_api::Error::SessionExpired => CoreError::SessionExpired,
            damwatch_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            damwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            // The backend answers validation rejections with 400 and a
            // human-readable message ("Value too long", bad slot, ...).
            damwatch_api::Error::Api { message, status: 400 } => CoreError::Rejected { message },
            damwatch_api::Error::Api { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            damwatch_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_400_maps_to_rejected() {
        let err: CoreError = damwatch_api::Error::Api {
            message: "Value too long".into(),
            status: 400,
        }
        .into();
        assert!(matches!(err, CoreError::Rejected { ref message } if message == "Value too long"));
    }

    #[test]
    fn other_statuses_stay_api_errors() {
        let err: CoreError = damwatch_api::Error::Api {
            message: "boom".into(),
            status: 500,
        }
        .into();
        assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
    }
}
