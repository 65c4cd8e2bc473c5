use std::net::SocketAddr;
use std::path::PathBuf;

use crate::state::{AppConfig, StateError};

/// Everything the service needs to start, resolved from the config file
///  plus command line overrides.
#[derive(Debug, Clone)]
pub struct Config {
    /// The validated configuration file
    pub app: AppConfig,

    // http server configuration
    /// address for the http server to listen on
    pub listen_addr: SocketAddr,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_app_config(app: AppConfig) -> Result<Self, StateError> {
        let log_level = app.log_level()?;
        Ok(Self {
            listen_addr: app.http.bind,
            sqlite_path: app.database.path.clone(),
            log_dir: app.log_dir.clone(),
            log_level,
            app,
        })
    }
}
