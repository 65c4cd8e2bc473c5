//! Volumes and the registry that holds them.
//!
//! A [`Volume`] is a named filesystem subtree with a privacy tier, a set of
//! feature flags and the flattened set of user ids granted access through
//! role membership. The [`VolumeRegistry`] is built once from static
//! configuration and is read-only afterwards, so lookups need no locking.

mod fs;
mod path;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use fs::{SearchMode, VolumeEntry, MAX_LISTING_ENTRIES, MAX_WALK_DEPTH};
pub use path::PathError;
pub(crate) use path::normalize;

use crate::auth::Capability;

/// Feature flags understood by the service. The vocabulary is open:
///  volumes may carry flags this list does not name.
pub mod features {
    pub const UPLOAD: &str = "upload";
    pub const SEARCH: &str = "search";
    pub const COMPRESS: &str = "compress";
}

/// Who may reach a volume without a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    /// Anyone may read and list
    Public,
    /// Readable by direct link, hidden from listings
    Unlisted,
    /// Membership required
    #[default]
    Private,
}

impl Privacy {
    /// Read-only access to the volume needs no credential
    pub fn is_open(&self) -> bool {
        matches!(self, Privacy::Public | Privacy::Unlisted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privacy {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "private" => Ok(Privacy::Private),
            "public" => Ok(Privacy::Public),
            "unlisted" => Ok(Privacy::Unlisted),
            other => Err(RegistryError::UnknownPrivacy(other.to_string())),
        }
    }
}

/// Static configuration for a single volume
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// `public`, `unlisted` or `private`; empty or absent means private
    #[serde(default)]
    pub privacy: Option<String>,
}

/// Static configuration for a role: a named group of user ids
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown privacy value: {0:?}")]
    UnknownPrivacy(String),
    #[error("volume {0:?} is configured more than once")]
    DuplicateVolume(String),
    #[error("volume name must not be empty")]
    EmptyName,
    #[error("volume {0:?} references unknown role {1:?}")]
    UnknownRole(String, String),
    #[error("volume {0:?} root must be an absolute path, got {1:?}")]
    RelativeRoot(String, PathBuf),
}

/// A configured volume. Immutable once built.
#[derive(Debug, Clone)]
pub struct Volume {
    name: String,
    root: PathBuf,
    privacy: Privacy,
    features: HashSet<String>,
    user_ids: HashSet<String>,
}

impl Volume {
    pub fn new(
        name: impl Into<String>,
        root: impl AsRef<Path>,
        privacy: Privacy,
        features: impl IntoIterator<Item = impl Into<String>>,
        user_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let root = root.as_ref();
        // A root that does not exist yet keeps its configured spelling
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            name: name.into(),
            root,
            privacy,
            features: features.into_iter().map(Into::into).collect(),
            user_ids: user_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn privacy(&self) -> Privacy {
        self.privacy
    }

    pub fn has_user_id(&self, user_id: &str) -> bool {
        self.user_ids.contains(user_id)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(String::as_str)
    }

    /// Feature gate for write-capable or expensive operations.
    ///
    /// Independent of identity: a caller allowed to reach the path still
    ///  gets rejected when the volume does not offer the feature.
    pub fn require_feature(&self, feature: &str) -> Result<(), crate::auth::AccessError> {
        if self.has_feature(feature) {
            return Ok(());
        }
        tracing::info!(volume = %self.name, feature, "feature not enabled for volume");
        Err(crate::auth::AccessError::FeatureDisabled(feature.to_string()))
    }
}

/// Every configured volume plus the role data needed for admin checks.
#[derive(Debug, Default)]
pub struct VolumeRegistry {
    volumes: BTreeMap<String, Arc<Volume>>,
    admins: HashSet<String>,
}

impl VolumeRegistry {
    /// Build the registry, flattening each volume's roles into its
    ///  allowed user ids.
    pub fn from_config(
        volumes: &[VolumeConfig],
        roles: &[RoleConfig],
    ) -> Result<Self, RegistryError> {
        let roles_by_name: HashMap<&str, &RoleConfig> =
            roles.iter().map(|r| (r.name.as_str(), r)).collect();

        let mut built = BTreeMap::new();
        for config in volumes {
            if config.name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if built.contains_key(&config.name) {
                return Err(RegistryError::DuplicateVolume(config.name.clone()));
            }
            if !config.path.is_absolute() {
                return Err(RegistryError::RelativeRoot(
                    config.name.clone(),
                    config.path.clone(),
                ));
            }

            let privacy = config
                .privacy
                .as_deref()
                .map(Privacy::from_str)
                .transpose()?
                .unwrap_or_default();

            let mut user_ids = HashSet::new();
            for role_name in &config.roles {
                let role = roles_by_name.get(role_name.as_str()).ok_or_else(|| {
                    RegistryError::UnknownRole(config.name.clone(), role_name.clone())
                })?;
                user_ids.extend(role.user_ids.iter().cloned());
            }

            let volume = Volume::new(
                config.name.clone(),
                &config.path,
                privacy,
                config.features.iter().cloned(),
                user_ids,
            );
            if !volume.root().is_dir() {
                tracing::warn!(
                    volume = %volume.name(),
                    root = %volume.root().display(),
                    "volume root is not a directory yet; requests fail until it is"
                );
            }
            tracing::debug!(
                volume = %volume.name(),
                root = %volume.root().display(),
                privacy = %privacy,
                "registered volume"
            );
            built.insert(config.name.clone(), Arc::new(volume));
        }

        let admins = roles
            .iter()
            .filter(|r| r.admin)
            .flat_map(|r| r.user_ids.iter().cloned())
            .collect();

        Ok(Self {
            volumes: built,
            admins,
        })
    }

    /// Build a registry directly from volumes; used by tests and tools
    pub fn from_volumes(
        volumes: impl IntoIterator<Item = Volume>,
        admins: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            volumes: volumes
                .into_iter()
                .map(|v| (v.name.clone(), Arc::new(v)))
                .collect(),
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Volume>> {
        self.volumes.get(name).cloned()
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Volume>> {
        self.volumes.values()
    }

    /// Volumes the caller may see in an index, sorted by name.
    pub fn visible_to(&self, capability: Option<&Capability>) -> Vec<Arc<Volume>> {
        self.volumes
            .values()
            .filter(|volume| match (volume.privacy(), capability) {
                (Privacy::Public, _) => true,
                (_, None) => false,
                (_, Some(Capability::ShareCode(_))) => false,
                (Privacy::Unlisted, Some(Capability::User { is_admin, .. })) => *is_admin,
                (_, Some(cap)) => cap.can_access(volume, "", false),
            })
            .cloned()
            .collect()
    }
}
