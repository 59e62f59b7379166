//! User configuration stored in `~/.osmtagger/config.ini`.

mod file;
mod keys;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use file::{
    config_dir, config_file_path, default_data_dir, AuthSettings, ChangesetSettings, ConfigFile,
    DownloadSettings, LoggingSettings, PresetSettings, ServerSettings, StorageSettings,
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_LOG_LEVEL, DEFAULT_PRESETS_FILE,
};
pub use keys::ConfigKey;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
