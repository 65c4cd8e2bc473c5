use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common::auth::ApiKeyConfig;
use common::volume::{RegistryError, RoleConfig, VolumeConfig, VolumeRegistry};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SHARE_URL_PLACEHOLDER: &str = "%s";

/// The on-disk configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default, rename = "role")]
    pub roles: Vec<RoleConfig>,
    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeConfig>,
    #[serde(default, rename = "api_key")]
    pub api_keys: Vec<ApiKeyConfig>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// External base URL, used to build absolute links
    #[serde(default = "default_url")]
    pub url: String,
    /// Template for share links; `%s` is replaced by the code
    #[serde(default)]
    pub share_url: Option<String>,
    /// Keys token signing and session cookies
    pub secret: String,
}

impl std::fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfig")
            .field("bind", &self.bind)
            .field("url", &self.url)
            .field("share_url", &self.share_url)
            .finish_non_exhaustive()
    }
}

impl HttpConfig {
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// The public link for a share code
    pub fn share_link(&self, code: &str) -> String {
        match self.share_url.as_deref().filter(|u| !u.is_empty()) {
            Some(template) => template.replace(SHARE_URL_PLACEHOLDER, code),
            None => format!("{}/s/{}?raw", self.base_url(), code),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; in-memory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Read and validate the config file
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Err(StateError::MissingFile(path.to_path_buf()));
        }
        let config_toml = fs::read_to_string(path)?;
        let config = Self::from_toml(&config_toml)?;
        tracing::debug!(path = %path.display(), volumes = config.volumes.len(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(config_toml: &str) -> Result<Self, StateError> {
        let config: AppConfig = toml::from_str(config_toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StateError> {
        if self.http.secret.is_empty() {
            return Err(StateError::EmptySecret);
        }
        self.log_level()?;
        self.registry()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level, StateError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn registry(&self) -> Result<VolumeRegistry, StateError> {
        Ok(VolumeRegistry::from_config(&self.volumes, &self.roles)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("http.secret must not be empty")]
    EmptySecret,

    #[error("invalid log level: {0:?}")]
    InvalidLogLevel(String),

    #[error("invalid volume configuration: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
