use std::path::PathBuf;
use std::sync::Arc;

use crate::share::ShareCodeProvider;
use crate::volume::{PathError, Volume, VolumeRegistry};

use super::{AccessError, Capability, Credential, CredentialVerifier};

/// A volume the caller has been cleared to reach, plus the capability that
///  cleared it. The capability is `None` for anonymous reads of open
///  volumes.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub volume: Arc<Volume>,
    pub capability: Option<Capability>,
}

impl Authorized {
    /// Resolve `path` on disk for a read.
    ///
    /// A share code must also stay below its own resolved base once
    ///  symlinks are followed, not just below the volume root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathError> {
        let resolved = self.volume.resolve(path)?;
        if let Some(share) = self.capability.as_ref().and_then(Capability::share_code) {
            let base = self.volume.resolve(&share.path)?;
            if !resolved.starts_with(&base) {
                tracing::warn!(
                    volume = %self.volume.name(),
                    path,
                    share = %share.path,
                    "path resolves outside of shared subtree"
                );
                return Err(PathError::Escape(path.to_string()));
            }
        }
        Ok(resolved)
    }
}

/// The single decision point for volume access.
///
/// Holds only read-only state, so one gate serves every request.
#[derive(Debug, Clone)]
pub struct Gate<S> {
    registry: Arc<VolumeRegistry>,
    verifier: CredentialVerifier<S>,
}

impl<S: ShareCodeProvider> Gate<S> {
    pub fn new(registry: Arc<VolumeRegistry>, verifier: CredentialVerifier<S>) -> Self {
        Self { registry, verifier }
    }

    pub fn registry(&self) -> &Arc<VolumeRegistry> {
        &self.registry
    }

    pub fn verifier(&self) -> &CredentialVerifier<S> {
        &self.verifier
    }

    /// Resolve the caller's capability without consulting any volume
    pub async fn capability(&self, credential: &Credential) -> Option<Capability> {
        self.verifier.resolve(credential, &self.registry).await
    }

    /// Decide whether `credential` may reach `path` in `volume_name`.
    ///
    /// `full` marks writes and other operations that are never open to
    ///  anonymous callers. A missing volume is indistinguishable from one
    ///  the caller may not reach.
    pub async fn authorize(
        &self,
        credential: &Credential,
        volume_name: &str,
        path: &str,
        full: bool,
    ) -> Result<Authorized, AccessError> {
        let volume = self.registry.get(volume_name);
        let capability = self.capability(credential).await;

        if let Some(volume) = &volume {
            if !full && volume.privacy().is_open() {
                return Ok(Authorized {
                    volume: volume.clone(),
                    capability,
                });
            }
        }

        let Some(capability) = capability else {
            let err = if credential.is_none() {
                AccessError::NoCredential
            } else {
                AccessError::InvalidCredential
            };
            tracing::debug!(volume = volume_name, path, scheme = credential.scheme(), error = %err, "access denied");
            // A credential that fails verification counts as no credential
            return Err(AccessError::NoCredential);
        };

        match volume {
            Some(volume) if capability.can_access(&volume, path, full) => Ok(Authorized {
                volume,
                capability: Some(capability),
            }),
            Some(_) => {
                tracing::info!(volume = volume_name, path, full, "capability does not grant access");
                Err(AccessError::NotPermitted)
            }
            None => {
                tracing::debug!(volume = volume_name, "unknown volume");
                Err(AccessError::NotPermitted)
            }
        }
    }
}
