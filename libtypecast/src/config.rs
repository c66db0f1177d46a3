//! Configuration management for Typecast
//!
//! Settings are loaded once at startup and treated as immutable for the rest
//! of the process. Components receive them through their constructors.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::types::{DraftOptions, Platform};

pub const DEFAULT_BASE_URL: &str = "https://api.typefully.com/v2";
pub const DEFAULT_APP_URL: &str = "https://typefully.com";
pub const DEFAULT_CREDENTIAL_PREFIX: &str = "TYPEFULLY_API_KEY_";
pub const MAX_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Safety switch: when false every draft is created unscheduled
    pub scheduling_enabled: bool,
    pub default_platforms: Vec<Platform>,
    pub default_share: bool,
    /// Let the service split over-long posts
    pub default_threadify: bool,
    /// X only
    pub auto_retweet: bool,
    /// X only
    pub auto_plug: bool,
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub app_url: String,
    pub timeout_secs: u64,
    /// 1 keeps cross-posting sequential
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub env_file: String,
    pub prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheduling_enabled: false,
            default_platforms: vec![Platform::X],
            default_share: true,
            default_threadify: true,
            auto_retweet: false,
            auto_plug: false,
            api: ApiConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            timeout_secs: 30,
            max_concurrency: 1,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_file: "~/.config/typecast/.env".to_string(),
            prefix: DEFAULT_CREDENTIAL_PREFIX.to_string(),
        }
    }
}

impl Settings {
    /// Draft options configured as defaults for new drafts
    pub fn draft_options(&self) -> DraftOptions {
        DraftOptions {
            threadify: self.default_threadify,
            auto_retweet: self.auto_retweet,
            auto_plug: self.auto_plug,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CredentialsConfig {
    /// Credentials file path with `~` expanded
    pub fn env_file_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.env_file).to_string())
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_or_default(&config_path)
    }

    /// Load settings from a path, falling back to defaults if it doesn't exist
    ///
    /// Defaults keep scheduling disabled.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    /// Load settings from a specific path
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let settings = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        tracing::debug!(
            "Loaded config from {} (scheduling_enabled = {})",
            path.display(),
            settings.scheduling_enabled
        );
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).map_err(ConfigError::ParseError)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(content).map_err(ConfigError::JsonParseError)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.default_platforms.is_empty() {
            return Err(invalid("default_platforms", "must list at least one platform"));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("api.base_url".to_string()).into());
        }
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be greater than zero"));
        }
        if self.api.max_concurrency == 0 || self.api.max_concurrency > MAX_CONCURRENCY {
            return Err(invalid(
                "api.max_concurrency",
                &format!("must be between 1 and {}", MAX_CONCURRENCY),
            ));
        }
        if self.credentials.prefix.trim().is_empty() {
            return Err(ConfigError::MissingField("credentials.prefix".to_string()).into());
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> crate::error::TypecastError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TYPECAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("typecast").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TypecastError;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_draft_only() {
        let settings = Settings::default();
        assert!(!settings.scheduling_enabled);
        assert_eq!(settings.default_platforms, vec![Platform::X]);
        assert_eq!(settings.api.max_concurrency, 1);
        assert_eq!(settings.api.timeout(), Duration::from_secs(30));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let settings = Settings::from_toml_str(
            r#"
scheduling_enabled = true
default_platforms = ["x", "linkedin"]

[api]
base_url = "http://localhost:9999/v2"
timeout_secs = 5
max_concurrency = 4
"#,
        )
        .unwrap();

        assert!(settings.scheduling_enabled);
        assert_eq!(settings.default_platforms, vec![Platform::X, Platform::Linkedin]);
        assert_eq!(settings.api.base_url, "http://localhost:9999/v2");
        assert_eq!(settings.api.app_url, DEFAULT_APP_URL);
        assert_eq!(settings.api.max_concurrency, 4);
        assert_eq!(settings.credentials.prefix, DEFAULT_CREDENTIAL_PREFIX);
    }

    #[test]
    fn test_draft_option_defaults_and_overrides() {
        assert_eq!(Settings::default().draft_options(), DraftOptions::default());

        let settings = Settings::from_toml_str(
            r#"
default_threadify = false
auto_retweet = true
"#,
        )
        .unwrap();
        let options = settings.draft_options();
        assert!(!options.threadify);
        assert!(options.auto_retweet);
        assert!(!options.auto_plug);
    }

    #[test]
    fn test_parse_json() {
        let settings =
            Settings::from_json_str(r#"{"scheduling_enabled": false, "default_platforms": ["bluesky"]}"#)
                .unwrap();
        assert_eq!(settings.default_platforms, vec![Platform::Bluesky]);
    }

    #[test]
    fn test_empty_default_platforms_is_fatal() {
        let err = Settings::from_toml_str("default_platforms = []").unwrap_err();
        assert!(matches!(err, TypecastError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_unknown_platform_is_fatal() {
        let err = Settings::from_toml_str(r#"default_platforms = ["myspace"]"#).unwrap_err();
        assert!(matches!(err, TypecastError::Config(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_wrong_type_is_fatal() {
        let err = Settings::from_toml_str(r#"scheduling_enabled = "yes""#).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_zero_timeout_is_fatal() {
        assert!(Settings::from_toml_str("[api]\ntimeout_secs = 0").is_err());
    }

    #[test]
    fn test_concurrency_bounds() {
        assert!(Settings::from_toml_str("[api]\nmax_concurrency = 0").is_err());
        assert!(Settings::from_toml_str("[api]\nmax_concurrency = 9").is_err());
        assert!(Settings::from_toml_str("[api]\nmax_concurrency = 8").is_ok());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_or_default(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_from_path_picks_format_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("config.json");
        std::fs::write(&json_path, r#"{"scheduling_enabled": true}"#).unwrap();

        let settings = Settings::load_from_path(&json_path).unwrap();
        assert!(settings.scheduling_enabled);
    }

    #[test]
    fn test_env_file_path_keeps_absolute_paths() {
        let config = CredentialsConfig {
            env_file: "/etc/typecast/.env".to_string(),
            prefix: DEFAULT_CREDENTIAL_PREFIX.to_string(),
        };
        assert_eq!(config.env_file_path(), PathBuf::from("/etc/typecast/.env"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_from_env() {
        std::env::set_var("TYPECAST_CONFIG", "/tmp/typecast-test/config.toml");
        let path = resolve_config_path().unwrap();
        std::env::remove_var("TYPECAST_CONFIG");
        assert_eq!(path, PathBuf::from("/tmp/typecast-test/config.toml"));
    }
}
