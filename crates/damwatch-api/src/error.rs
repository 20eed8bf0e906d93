use thiserror::Error;

/// Top-level error type for the `damwatch-api` crate.
///
/// Covers every failure mode of the screen-data backend: authentication,
/// transport, API-level rejections, and malformed payloads.
/// `damwatch-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account disabled, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Session has expired (cookie expired or revoked).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── API ─────────────────────────────────────────────────────────
    /// Error reported by the backend (parsed from the `{"error": ...}` body).
    #[error("API error (HTTP {status}): {message}")]
    Api { message: String, status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth surfacing
    /// as a soft failure (stale data retained).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
