//! Shared configuration for the damwatch dashboard.
//!
//! TOML profiles, credential resolution (keyring + env + plaintext),
//! and translation to `damwatch_core::ControllerConfig`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use damwatch_core::{ControllerConfig, HourlyOverrides, SessionCredentials};

/// The backend's fixed default port.
pub const DEFAULT_PORT: u16 = 5100;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    ProfileNotFound { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, or the default profile when `None`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::ProfileNotFound {
                profile: name.into(),
            })
    }
}

/// A named backend profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Full backend URL (e.g., "http://treatment-plant:5100").
    /// Takes precedence over `host`/`port`.
    pub server: Option<String>,

    /// Backend hostname; combined with `port` when `server` is absent.
    pub host: Option<String>,

    /// Backend port (defaults to 5100).
    pub port: Option<u16>,

    /// Username for auto-login. Absent means interactive sign-in.
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env).
    pub password: Option<String>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Override snapshot poll period (seconds).
    pub poll_interval: Option<u64>,

    /// Display-only turbidity substitutions keyed by 12-hour labels
    /// (e.g. `"1 PM" = 0.45`).
    #[serde(default)]
    pub turbidity_overrides: HashMap<String, f64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "damwatch", "damwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("damwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("DAMWATCH_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve stored credentials for auto-login, if any.
///
/// Password chain: `DAMWATCH_PASSWORD` env var, system keyring
/// (`damwatch` / `{profile}/password`), then plaintext in the config
/// file. Missing credentials are not an error -- the login screen shows.
pub fn resolve_session_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Option<SessionCredentials> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("DAMWATCH_USERNAME").ok())?;

    // 1. Env var
    if let Ok(pw) = std::env::var("DAMWATCH_PASSWORD") {
        return Some(SessionCredentials {
            username,
            password: SecretString::from(pw),
        });
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new("damwatch", &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Some(SessionCredentials {
                username,
                password: SecretString::from(pw),
            });
        }
    }

    // 3. Plaintext in config
    profile.password.as_ref().map(|pw| SessionCredentials {
        username,
        password: SecretString::from(pw.clone()),
    })
}

/// Store a password in the system keyring for a profile.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new("damwatch", &format!("{profile_name}/password"))
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Controller config construction ──────────────────────────────────

/// Build a `ControllerConfig` from a profile.
///
/// `server` wins when present; otherwise `http://{host}:{port}` with the
/// backend's fixed default port.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ControllerConfig, ConfigError> {
    let url_str = match (&profile.server, &profile.host) {
        (Some(server), _) => server.clone(),
        (None, Some(host)) => {
            format!("http://{host}:{}", profile.port.unwrap_or(DEFAULT_PORT))
        }
        (None, None) => {
            return Err(ConfigError::Validation {
                field: "server".into(),
                reason: format!("profile '{profile_name}' has neither 'server' nor 'host'"),
            });
        }
    };
    let url: url::Url = url_str.parse().map_err(|_| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    let turbidity_overrides = HourlyOverrides::try_from(profile.turbidity_overrides.clone())
        .map_err(|reason| ConfigError::Validation {
            field: "turbidity_overrides".into(),
            reason,
        })?;

    let defaults = ControllerConfig::default();

    Ok(ControllerConfig {
        url,
        credentials: resolve_session_credentials(profile, profile_name),
        timeout: profile
            .timeout
            .map_or(defaults.timeout, Duration::from_secs),
        poll_interval: profile
            .poll_interval
            .map_or(defaults.poll_interval, Duration::from_secs),
        turbidity_overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn server_url_wins_over_host() {
        let profile = Profile {
            server: Some("http://plant.example:8080".into()),
            host: Some("ignored".into()),
            ..Profile::default()
        };
        let cfg = profile_to_controller_config(&profile, "default").expect("valid");
        assert_eq!(cfg.url.as_str(), "http://plant.example:8080/");
    }

    #[test]
    fn host_gets_default_port() {
        let profile = Profile {
            host: Some("plant.example".into()),
            ..Profile::default()
        };
        let cfg = profile_to_controller_config(&profile, "default").expect("valid");
        assert_eq!(cfg.url.as_str(), "http://plant.example:5100/");
    }

    #[test]
    fn missing_server_and_host_rejected() {
        let profile = Profile::default();
        let result = profile_to_controller_config(&profile, "default");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn bad_override_label_rejected() {
        let mut profile = Profile {
            host: Some("plant".into()),
            ..Profile::default()
        };
        profile
            .turbidity_overrides
            .insert("25 o'clock".into(), 0.5);
        let result = profile_to_controller_config(&profile, "default");
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field == "turbidity_overrides"
        ));
    }

    #[test]
    fn poll_interval_defaults_to_fifteen_minutes() {
        let profile = Profile {
            host: Some("plant".into()),
            ..Profile::default()
        };
        let cfg = profile_to_controller_config(&profile, "default").expect("valid");
        assert_eq!(cfg.poll_interval, Duration::from_secs(900));
    }
}
