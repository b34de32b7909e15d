//! Settings domain types and validation.
//!
//! These are pure domain types with no infrastructure dependencies. The
//! on-disk location is resolved by [`crate::paths`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default executable launched in serve mode.
pub const DEFAULT_SERVER_PATH: &str = "opencode";

/// Default port the supervised server listens on.
pub const DEFAULT_PORT: u16 = 14096;

/// Default hostname the supervised server binds to.
pub const DEFAULT_HOSTNAME: &str = "127.0.0.1";

/// Default startup timeout in milliseconds.
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 30_000;

/// Default CORS allowlist entry: the origin of the embedding host.
pub const DEFAULT_CORS_ORIGIN: &str = "app://obsidian.md";

/// Path of the health endpoint, relative to the server URL.
pub const HEALTH_PATH: &str = "/global/health";

const MIN_STARTUP_TIMEOUT_MS: u64 = 1_000;
const MAX_STARTUP_TIMEOUT_MS: u64 = 600_000;

/// Supervisor settings.
///
/// Every field has a default so partially written settings files still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Path (or bare name resolved through `PATH`) of the server executable.
    pub server_path: String,

    /// Port passed to the server and probed for health.
    pub port: u16,

    /// Hostname passed to the server and used in the server URL.
    pub hostname: String,

    /// Start the server as soon as the host comes up.
    pub auto_start: bool,

    /// Maximum time a start attempt may take to reach `Running`.
    pub startup_timeout_ms: u64,

    /// Project directory served by the host. Falls back to the host's own
    /// working directory when unset.
    pub project_directory: Option<String>,

    /// Origin allowed through the server's CORS policy.
    pub cors_origin: String,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            server_path: DEFAULT_SERVER_PATH.to_string(),
            port: DEFAULT_PORT,
            hostname: DEFAULT_HOSTNAME.to_string(),
            auto_start: false,
            startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT_MS,
            project_directory: None,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
        }
    }

    /// Startup timeout as a [`Duration`].
    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Root URL of the server, e.g. `http://127.0.0.1:14096`.
    #[must_use]
    pub fn server_url(&self) -> String {
        if self.hostname.contains(':') && !self.hostname.starts_with('[') {
            format!("http://[{}]:{}", self.hostname, self.port)
        } else {
            format!("http://{}:{}", self.hostname, self.port)
        }
    }

    /// URL of the health endpoint.
    #[must_use]
    pub fn health_url(&self) -> String {
        format!("{}{HEALTH_PATH}", self.server_url())
    }

    /// Merge a partial update, only touching fields that are `Some`.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref path) = other.server_path {
            self.server_path.clone_from(path);
        }
        if let Some(port) = other.port {
            self.port = port;
        }
        if let Some(ref hostname) = other.hostname {
            self.hostname.clone_from(hostname);
        }
        if let Some(auto_start) = other.auto_start {
            self.auto_start = auto_start;
        }
        if let Some(timeout) = other.startup_timeout_ms {
            self.startup_timeout_ms = timeout;
        }
        if let Some(ref dir) = other.project_directory {
            self.project_directory.clone_from(dir);
        }
        if let Some(ref origin) = other.cors_origin {
            self.cors_origin.clone_from(origin);
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Partial settings update.
///
/// `project_directory` is `Option<Option<String>>`:
/// - `None` = don't change this field
/// - `Some(None)` = clear it
/// - `Some(Some(value))` = set it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub server_path: Option<String>,
    pub port: Option<u16>,
    pub hostname: Option<String>,
    pub auto_start: Option<bool>,
    pub startup_timeout_ms: Option<u64>,
    pub project_directory: Option<Option<String>>,
    pub cors_origin: Option<String>,
}

impl SettingsUpdate {
    /// Build a single-field update from a `key`/`value` pair as typed on a
    /// command line.
    ///
    /// Keys match the settings file names (`startupTimeoutMs`); `snake_case`
    /// and `kebab-case` spellings are accepted too. An empty `projectDirectory`
    /// value clears it.
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let normalized: String = key
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        let mut update = Self::default();
        match normalized.as_str() {
            "serverpath" => update.server_path = Some(value.to_string()),
            "port" => update.port = Some(value.parse().map_err(|_| invalid())?),
            "hostname" => update.hostname = Some(value.to_string()),
            "autostart" => update.auto_start = Some(value.parse().map_err(|_| invalid())?),
            "startuptimeoutms" => {
                update.startup_timeout_ms = Some(value.parse().map_err(|_| invalid())?);
            }
            "projectdirectory" => {
                let value = value.trim();
                update.project_directory =
                    Some((!value.is_empty()).then(|| value.to_string()));
            }
            "corsorigin" => update.cors_origin = Some(value.to_string()),
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(update)
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Server executable path cannot be empty")]
    EmptyServerPath,

    #[error("Hostname cannot be empty")]
    EmptyHostname,

    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Startup timeout must be between 1000 and 600000 ms, got {0}")]
    InvalidStartupTimeout(u64),

    #[error("CORS origin cannot be empty")]
    EmptyCorsOrigin,

    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.server_path.trim().is_empty() {
        return Err(SettingsError::EmptyServerPath);
    }

    if settings.hostname.trim().is_empty() {
        return Err(SettingsError::EmptyHostname);
    }

    if settings.port < 1024 {
        return Err(SettingsError::InvalidPort(settings.port));
    }

    if !(MIN_STARTUP_TIMEOUT_MS..=MAX_STARTUP_TIMEOUT_MS).contains(&settings.startup_timeout_ms) {
        return Err(SettingsError::InvalidStartupTimeout(
            settings.startup_timeout_ms,
        ));
    }

    if settings.cors_origin.trim().is_empty() {
        return Err(SettingsError::EmptyCorsOrigin);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.server_path, "opencode");
        assert_eq!(settings.port, 14096);
        assert_eq!(settings.hostname, "127.0.0.1");
        assert!(!settings.auto_start);
        assert_eq!(settings.startup_timeout(), Duration::from_secs(30));
        assert_eq!(settings.project_directory, None);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_urls() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.server_url(), "http://127.0.0.1:14096");
        assert_eq!(
            settings.health_url(),
            "http://127.0.0.1:14096/global/health"
        );
    }

    #[test]
    fn test_ipv6_hostname_is_bracketed() {
        let settings = Settings {
            hostname: "::1".to_string(),
            ..Settings::with_defaults()
        };
        assert_eq!(settings.server_url(), "http://[::1]:14096");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::with_defaults();
        settings.port = 80;
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::InvalidPort(80))
        );

        let mut settings = Settings::with_defaults();
        settings.startup_timeout_ms = 10;
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::InvalidStartupTimeout(10))
        );

        let mut settings = Settings::with_defaults();
        settings.server_path = "  ".to_string();
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::EmptyServerPath)
        );

        let mut settings = Settings::with_defaults();
        settings.hostname = String::new();
        assert_eq!(
            validate_settings(&settings),
            Err(SettingsError::EmptyHostname)
        );
    }

    #[test]
    fn test_merge_only_touches_set_fields() {
        let mut settings = Settings::with_defaults();
        let update = SettingsUpdate {
            port: Some(15000),
            project_directory: Some(Some("/tmp/vault".to_string())),
            ..Default::default()
        };
        settings.merge(&update);

        assert_eq!(settings.port, 15000);
        assert_eq!(settings.project_directory.as_deref(), Some("/tmp/vault"));
        assert_eq!(settings.hostname, DEFAULT_HOSTNAME);

        let clear = SettingsUpdate {
            project_directory: Some(None),
            ..Default::default()
        };
        settings.merge(&clear);
        assert_eq!(settings.project_directory, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"port": 15001}"#).unwrap();
        assert_eq!(settings.port, 15001);
        assert_eq!(settings.server_path, DEFAULT_SERVER_PATH);
        assert_eq!(settings.startup_timeout_ms, DEFAULT_STARTUP_TIMEOUT_MS);
    }

    #[test]
    fn test_update_from_key_value() {
        let update = SettingsUpdate::from_key_value("port", "15002").unwrap();
        assert_eq!(update.port, Some(15002));

        let update = SettingsUpdate::from_key_value("startup_timeout_ms", "5000").unwrap();
        assert_eq!(update.startup_timeout_ms, Some(5000));

        let update = SettingsUpdate::from_key_value("autoStart", "true").unwrap();
        assert_eq!(update.auto_start, Some(true));

        let update = SettingsUpdate::from_key_value("project-directory", "").unwrap();
        assert_eq!(update.project_directory, Some(None));

        let update = SettingsUpdate::from_key_value("corsOrigin", "http://localhost:3000").unwrap();
        assert_eq!(update.cors_origin.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_update_from_bad_key_value() {
        assert_eq!(
            SettingsUpdate::from_key_value("colour", "blue").unwrap_err(),
            SettingsError::UnknownKey("colour".to_string())
        );
        assert_eq!(
            SettingsUpdate::from_key_value("port", "lots").unwrap_err(),
            SettingsError::InvalidValue {
                key: "port".to_string(),
                value: "lots".to_string()
            }
        );
    }
}
