//! Addressable configuration keys.
//!
//! Each key is named `section.key`, matching its place in `config.ini`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ServerDev,
    ServerApiUrl,
    ServerAuthUrl,
    ServerOverpassUrl,
    AuthClientId,
    AuthClientSecret,
    AuthRedirectUri,
    PresetsPath,
    PresetsChunksPath,
    StorageDataDir,
    DownloadHalfExtent,
    DownloadMaxShrinkAttempts,
    ChangesetComment,
    LoggingLevel,
    LoggingDirectory,
}

const ALL: [ConfigKey; 15] = [
    ConfigKey::ServerDev,
    ConfigKey::ServerApiUrl,
    ConfigKey::ServerAuthUrl,
    ConfigKey::ServerOverpassUrl,
    ConfigKey::AuthClientId,
    ConfigKey::AuthClientSecret,
    ConfigKey::AuthRedirectUri,
    ConfigKey::PresetsPath,
    ConfigKey::PresetsChunksPath,
    ConfigKey::StorageDataDir,
    ConfigKey::DownloadHalfExtent,
    ConfigKey::DownloadMaxShrinkAttempts,
    ConfigKey::ChangesetComment,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingDirectory,
];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ServerDev => "server.dev",
            Self::ServerApiUrl => "server.api_url",
            Self::ServerAuthUrl => "server.auth_url",
            Self::ServerOverpassUrl => "server.overpass_url",
            Self::AuthClientId => "auth.client_id",
            Self::AuthClientSecret => "auth.client_secret",
            Self::AuthRedirectUri => "auth.redirect_uri",
            Self::PresetsPath => "presets.path",
            Self::PresetsChunksPath => "presets.chunks_path",
            Self::StorageDataDir => "storage.data_dir",
            Self::DownloadHalfExtent => "download.half_extent",
            Self::DownloadMaxShrinkAttempts => "download.max_shrink_attempts",
            Self::ChangesetComment => "changeset.comment",
            Self::LoggingLevel => "logging.level",
            Self::LoggingDirectory => "logging.directory",
        }
    }

    pub fn section(&self) -> &'static str {
        self.split().0
    }

    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or((name, ""))
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        self.stored_value(config).unwrap_or_default()
    }

    /// Value as written to the file; `None` for unset optional keys.
    pub(crate) fn stored_value(&self, config: &ConfigFile) -> Option<String> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
        match self {
            Self::ServerDev => Some(config.server.dev.to_string()),
            Self::ServerApiUrl => config.server.api_url.clone(),
            Self::ServerAuthUrl => config.server.auth_url.clone(),
            Self::ServerOverpassUrl => config.server.overpass_url.clone(),
            Self::AuthClientId => non_empty(&config.auth.client_id),
            Self::AuthClientSecret => non_empty(&config.auth.client_secret),
            Self::AuthRedirectUri => Some(config.auth.redirect_uri.clone()),
            Self::PresetsPath => path(&config.presets.path),
            Self::PresetsChunksPath => path(&config.presets.chunks_path),
            Self::StorageDataDir => Some(config.storage.data_dir.display().to_string()),
            Self::DownloadHalfExtent => Some(config.download.half_extent.to_string()),
            Self::DownloadMaxShrinkAttempts => {
                Some(config.download.max_shrink_attempts.to_string())
            }
            Self::ChangesetComment => config.changeset.comment.clone(),
            Self::LoggingLevel => Some(config.logging.level.clone()),
            Self::LoggingDirectory => path(&config.logging.directory),
        }
    }

    /// Validates `value` and stores it. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let optional = || (!value.is_empty()).then(|| value.to_string());
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match self {
            Self::ServerDev => {
                config.server.dev = parse_bool(value).ok_or_else(|| invalid("expected true or false"))?;
            }
            Self::ServerApiUrl | Self::ServerAuthUrl | Self::ServerOverpassUrl => {
                if !value.is_empty() && !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid("expected an http(s) URL"));
                }
                match self {
                    Self::ServerApiUrl => config.server.api_url = optional(),
                    Self::ServerAuthUrl => config.server.auth_url = optional(),
                    _ => config.server.overpass_url = optional(),
                }
            }
            Self::AuthClientId => config.auth.client_id = value.to_string(),
            Self::AuthClientSecret => config.auth.client_secret = value.to_string(),
            Self::AuthRedirectUri => {
                if !value.contains(':') {
                    return Err(invalid("expected a URI with a scheme"));
                }
                config.auth.redirect_uri = value.to_string();
            }
            Self::PresetsPath => config.presets.path = optional().map(PathBuf::from),
            Self::PresetsChunksPath => config.presets.chunks_path = optional().map(PathBuf::from),
            Self::StorageDataDir => {
                if value.is_empty() {
                    return Err(invalid("data directory cannot be empty"));
                }
                config.storage.data_dir = PathBuf::from(value);
            }
            Self::DownloadHalfExtent => {
                let extent: f64 = value.parse().map_err(|_| invalid("expected a number"))?;
                if !extent.is_finite() || extent <= 0.0 || extent > 1.0 {
                    return Err(invalid("expected a value in (0, 1] degrees"));
                }
                config.download.half_extent = extent;
            }
            Self::DownloadMaxShrinkAttempts => {
                config.download.max_shrink_attempts =
                    value.parse().map_err(|_| invalid("expected a whole number"))?;
            }
            Self::ChangesetComment => config.changeset.comment = optional(),
            Self::LoggingLevel => {
                let level = value.to_ascii_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(invalid("expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
            Self::LoggingDirectory => config.logging.directory = optional().map(PathBuf::from),
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
        assert!(matches!(
            "server.nope".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_section_and_key_name() {
        let key = ConfigKey::DownloadMaxShrinkAttempts;
        assert_eq!(key.section(), "download");
        assert_eq!(key.key_name(), "max_shrink_attempts");
    }

    #[test]
    fn test_set_then_get() {
        let mut config = ConfigFile::default();
        ConfigKey::ServerDev.set(&mut config, "yes").unwrap();
        assert_eq!(ConfigKey::ServerDev.get(&config), "true");

        ConfigKey::LoggingLevel.set(&mut config, "DEBUG").unwrap();
        assert_eq!(config.logging.level, "debug");

        ConfigKey::ChangesetComment.set(&mut config, "Survey").unwrap();
        ConfigKey::ChangesetComment.set(&mut config, "").unwrap();
        assert_eq!(config.changeset.comment, None);
        assert_eq!(ConfigKey::ChangesetComment.get(&config), "");
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::DownloadHalfExtent.set(&mut config, "-1").is_err());
        assert!(ConfigKey::DownloadHalfExtent.set(&mut config, "wide").is_err());
        assert!(ConfigKey::ServerApiUrl.set(&mut config, "ftp://x").is_err());
        assert!(ConfigKey::ServerOverpassUrl.set(&mut config, "overpass").is_err());
        assert!(ConfigKey::LoggingLevel.set(&mut config, "loud").is_err());
        assert!(ConfigKey::StorageDataDir.set(&mut config, " ").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
