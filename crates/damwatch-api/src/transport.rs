// Shared transport configuration for building reqwest::Client instances.
//
// Session auth rides on a cookie jar shared between the login request and
// every subsequent call, so the jar lives here rather than in any one client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("damwatch/0.1.0");

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder.build().map_err(crate::error::Error::Transport)
    }

    /// Create a config with a fresh cookie jar (session auth requires one).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}
