//! Application assembly.
//!
//! There is no global editor state. An [`AppContext`] owns the preset
//! catalog, the staging store, the remote index, the area downloader and the
//! sync client; each of them can also be built and tested on its own.
//!
//! # Example
//!
//! ```ignore
//! use osmtagger::app::{AppConfig, AppContext};
//! use osmtagger::config::ConfigFile;
//!
//! let config = AppConfig::from_config_file(&ConfigFile::load()?);
//! let app = AppContext::start(config, None).await?;
//!
//! let catalog = app.catalog().wait().await;
//! let report = app.sync().submit(app.store(), None).await?;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::AppContext;
pub use config::{AppConfig, StagingConfig};
pub use error::AppError;
