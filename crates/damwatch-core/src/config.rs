// ── Runtime connection configuration ──
//
// These types describe *how* to reach the screen-data backend.
// They carry credential data and connection tuning, but never touch disk.
// The TUI constructs a `ControllerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::overrides::HourlyOverrides;

/// Username/password pair for cookie-session auth.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Configuration for connecting to a single backend.
///
/// Built by the TUI, passed to `ScreenController` -- core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Backend root URL (e.g., `http://treatment-plant:5100`).
    pub url: Url,
    /// Stored credentials for auto-login. `None` means the user signs in
    /// interactively.
    pub credentials: Option<SessionCredentials>,
    /// Request timeout.
    pub timeout: Duration,
    /// Live snapshot poll period.
    pub poll_interval: Duration,
    /// Display-only turbidity substitutions keyed by 12-hour labels.
    pub turbidity_overrides: HourlyOverrides,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5100".parse().expect("static URL"),
            credentials: None,
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(15 * 60),
            turbidity_overrides: HourlyOverrides::default(),
        }
    }
}
