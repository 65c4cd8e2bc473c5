use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The volumes an API key may reach. An empty scope reaches every volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyScope {
    name: String,
    volumes: Vec<String>,
}

impl ApiKeyScope {
    pub fn new(
        name: impl Into<String>,
        volumes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            volumes: volumes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volumes(&self) -> &[String] {
        &self.volumes
    }

    pub fn allows(&self, volume: &str) -> bool {
        self.volumes.is_empty() || self.volumes.iter().any(|v| v == volume)
    }
}

/// Static configuration for an API key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub name: String,
    pub key: String,
    /// Volume names this key is scoped to; empty means every volume
    #[serde(default)]
    pub volumes: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error("api key not found")]
    NotFound,
    #[error("api key provider error: {0}")]
    Provider(String),
}

/// Read contract for API key records: given a presented key, return its
///  scope or fail.
#[async_trait]
pub trait ApiKeyProvider: Send + Sync + std::fmt::Debug {
    async fn lookup(&self, key: &str) -> Result<ApiKeyScope, ApiKeyError>;
}

/// API keys loaded from configuration. Only digests of the keys are held.
#[derive(Debug, Default, Clone)]
pub struct StaticApiKeys {
    by_digest: HashMap<String, ApiKeyScope>,
}

fn digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

impl StaticApiKeys {
    pub fn from_config(keys: &[ApiKeyConfig]) -> Self {
        let by_digest = keys
            .iter()
            .filter(|k| !k.key.is_empty())
            .map(|k| {
                (
                    digest(&k.key),
                    ApiKeyScope::new(k.name.clone(), k.volumes.iter().cloned()),
                )
            })
            .collect();
        Self { by_digest }
    }

    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }
}

#[async_trait]
impl ApiKeyProvider for StaticApiKeys {
    async fn lookup(&self, key: &str) -> Result<ApiKeyScope, ApiKeyError> {
        if key.is_empty() {
            return Err(ApiKeyError::NotFound);
        }
        self.by_digest
            .get(&digest(key))
            .cloned()
            .ok_or(ApiKeyError::NotFound)
    }
}
