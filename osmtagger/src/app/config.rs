//! Application configuration for `AppContext`.
//!
//! `AppConfig` collects the per-component settings in one place so the
//! translation from `config.ini` happens once, not in each command.

use std::path::PathBuf;

use crate::config::ConfigFile;
use crate::osm::{OAuthConfig, ServerConfig, DEFAULT_TIMEOUT_SECS};
use crate::preset::PresetPaths;
use crate::remote::{DownloadConfig, OVERPASS_URL};

/// Where local edit state lives.
#[derive(Clone, Debug, PartialEq)]
pub struct StagingConfig {
    /// Holds pending edits, the local id counter, the viewport and tokens.
    pub data_dir: PathBuf,
}

impl StagingConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

/// Configuration combining all component configs.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub staging: StagingConfig,
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub download: DownloadConfig,
    /// Overpass interpreter used for tag searches.
    pub overpass_url: String,
    pub presets: PresetPaths,
    /// Fixed changeset comment; generated when `None`.
    pub changeset_comment: Option<String>,
    pub timeout_secs: u64,
}

impl AppConfig {
    /// Production servers and default settings around `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, presets: PresetPaths) -> Self {
        let server = ServerConfig::production();
        Self {
            staging: StagingConfig::new(data_dir),
            oauth: OAuthConfig::new(server.auth_url.clone(), ""),
            server,
            download: DownloadConfig::default(),
            overpass_url: OVERPASS_URL.to_string(),
            presets,
            changeset_comment: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create application config from the configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let server = config.server.resolved();
        let oauth = OAuthConfig::new(server.auth_url.clone(), config.auth.client_id.clone())
            .with_secret(config.auth.client_secret.clone())
            .with_redirect_uri(config.auth.redirect_uri.clone());

        let mut presets = PresetPaths::new(config.presets_path());
        if let Some(chunks) = &config.presets.chunks_path {
            presets = presets.with_chunks(chunks.clone());
        }

        Self {
            staging: StagingConfig::new(config.storage.data_dir.clone()),
            server,
            oauth,
            download: DownloadConfig {
                half_extent: config.download.half_extent,
                max_shrink_attempts: config.download.max_shrink_attempts,
                ..DownloadConfig::default()
            },
            overpass_url: config
                .server
                .overpass_url
                .clone()
                .unwrap_or_else(|| OVERPASS_URL.to_string()),
            presets,
            changeset_comment: config.changeset.comment.clone(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Point both endpoints at `server`, e.g. a local test instance.
    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.oauth.auth_url = server.auth_url.clone();
        self.server = server;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.oauth.client_id = client_id.into();
        self
    }

    pub fn with_download(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    pub fn with_overpass_url(mut self, url: impl Into<String>) -> Self {
        self.overpass_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigKey;

    #[test]
    fn test_from_config_file_defaults() {
        let mut file = ConfigFile::default();
        file.storage.data_dir = PathBuf::from("/data");
        let config = AppConfig::from_config_file(&file);

        assert_eq!(config.staging.data_dir, PathBuf::from("/data"));
        assert_eq!(config.server, ServerConfig::production());
        assert_eq!(config.presets.presets, PathBuf::from("/data/defaultPresets.xml"));
        assert_eq!(config.presets.chunks, None);
        assert_eq!(config.download, DownloadConfig::default());
        assert_eq!(config.oauth.redirect_uri, "osmtagger:/");
        assert_eq!(config.overpass_url, OVERPASS_URL);
    }

    #[test]
    fn test_from_config_file_overrides() {
        let mut file = ConfigFile::default();
        for (key, value) in [
            ("server.dev", "true"),
            ("auth.client_id", "client"),
            ("presets.chunks_path", "/p/chunks.xml"),
            ("download.half_extent", "0.002"),
            ("changeset.comment", "Survey"),
            ("server.overpass_url", "http://localhost:12345/api/interpreter"),
        ] {
            key.parse::<ConfigKey>().unwrap().set(&mut file, value).unwrap();
        }
        let config = AppConfig::from_config_file(&file);

        assert_eq!(config.server, ServerConfig::development());
        assert_eq!(config.oauth.auth_url, ServerConfig::development().auth_url);
        assert_eq!(config.oauth.client_id, "client");
        assert_eq!(config.presets.chunks, Some(PathBuf::from("/p/chunks.xml")));
        assert_eq!(config.download.half_extent, 0.002);
        assert_eq!(config.changeset_comment.as_deref(), Some("Survey"));
        assert_eq!(config.overpass_url, "http://localhost:12345/api/interpreter");
    }

    #[test]
    fn test_with_server_moves_auth_url() {
        let server = ServerConfig {
            api_url: "http://localhost:3000".to_string(),
            auth_url: "http://localhost:3001".to_string(),
        };
        let config = AppConfig::new("/data", PresetPaths::new("/p.xml")).with_server(server);
        assert_eq!(config.oauth.auth_url, "http://localhost:3001");
    }
}
