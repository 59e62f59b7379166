//! INI configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use super::ConfigError;
use crate::osm::{ServerConfig, DEFAULT_REDIRECT_URI};
use crate::remote::{DEFAULT_HALF_EXTENT, DEFAULT_MAX_SHRINK_ATTEMPTS};

/// Name of the per-user configuration directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".osmtagger";
/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";
/// Default preset file name inside the data directory.
pub const DEFAULT_PRESETS_FILE: &str = "defaultPresets.xml";
/// Default log level filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `~/.osmtagger`, or `./.osmtagger` when no home directory is known.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// `~/.osmtagger/config.ini`
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// `~/.osmtagger/data`
pub fn default_data_dir() -> PathBuf {
    config_dir().join("data")
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerSettings {
    /// Use the development server instead of production.
    pub dev: bool,
    pub api_url: Option<String>,
    pub auth_url: Option<String>,
    /// Overpass interpreter; the public instance when unset.
    pub overpass_url: Option<String>,
}

impl ServerSettings {
    /// Endpoints after applying the `dev` switch and explicit overrides.
    pub fn resolved(&self) -> ServerConfig {
        let base = if self.dev {
            ServerConfig::development()
        } else {
            ServerConfig::production()
        };
        ServerConfig {
            api_url: self.api_url.clone().unwrap_or(base.api_url),
            auth_url: self.auth_url.clone().unwrap_or(base.auth_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresetSettings {
    /// Preset document; defaults to `defaultPresets.xml` in the data directory.
    pub path: Option<PathBuf>,
    /// Separate chunk document, if chunks are not inside the preset file.
    pub chunks_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub half_extent: f64,
    pub max_shrink_attempts: u32,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            half_extent: DEFAULT_HALF_EXTENT,
            max_shrink_attempts: DEFAULT_MAX_SHRINK_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangesetSettings {
    /// Fixed comment; generated from the edit counts when unset.
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    /// Directory for daily log files; console only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// Parsed `config.ini`.
///
/// Missing sections and keys take their defaults, so an absent file is the
/// same as an empty one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub presets: PresetSettings,
    pub storage: StorageSettings,
    pub download: DownloadSettings,
    pub changeset: ChangesetSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Loads from [`config_file_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Saves to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Saves to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        debug!(path = %path.display(), "Saved config file");
        Ok(())
    }

    /// Preset document path with the data directory default applied.
    pub fn presets_path(&self) -> PathBuf {
        self.presets
            .path
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join(DEFAULT_PRESETS_FILE))
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in super::ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in super::ConfigKey::all() {
            let value = key.stored_value(self);
            if let Some(value) = value {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.auth.redirect_uri, "osmtagger:/");
        assert_eq!(config.download.half_extent, 0.0045);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.server.dev = true;
        config.auth.client_id = "abc".to_string();
        config.download.max_shrink_attempts = 3;
        config.changeset.comment = Some("Survey".to_string());
        config.logging.directory = Some(dir.path().join("logs"));
        config.save_to(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_reads_handwritten_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(
            &path,
            "[server]\napi_url = http://localhost:3000\n\n[download]\nhalf_extent = 0.002\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        let server = config.server.resolved();
        assert_eq!(server.api_url, "http://localhost:3000");
        assert_eq!(server.auth_url, ServerConfig::production().auth_url);
        assert_eq!(config.download.half_extent, 0.002);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "[download]\nmax_shrink_attempts = many\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_dev_server_switch() {
        let settings = ServerSettings {
            dev: true,
            ..Default::default()
        };
        assert_eq!(settings.resolved(), ServerConfig::development());
    }

    #[test]
    fn test_presets_path_defaults_to_data_dir() {
        let mut config = ConfigFile::default();
        config.storage.data_dir = PathBuf::from("/data");
        assert_eq!(config.presets_path(), PathBuf::from("/data/defaultPresets.xml"));
    }
}
