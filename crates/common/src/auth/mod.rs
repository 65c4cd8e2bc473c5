//! Authorization for volume access.
//!
//! A request carries at most one [`Credential`]. The [`CredentialVerifier`]
//! turns it into at most one [`Capability`], and the [`Gate`] combines the
//! capability with the volume's privacy tier to allow or reject the access.
//!
//! Rejections collapse to two outward signals ([`Rejection`]): unauthorized
//! when nothing verifiable was presented for a resource that needs it, and
//! not-found for everything else. The richer [`AccessError`] stays internal
//! and is only logged.

mod api_key;
mod capability;
mod credential;
mod gate;
mod token;

pub use api_key::{ApiKeyConfig, ApiKeyError, ApiKeyProvider, ApiKeyScope, StaticApiKeys};
pub use capability::Capability;
pub use credential::{Credential, CredentialVerifier, SHARE_CODE_QUERY_PARAM, SESSION_USER_KEY};
pub use gate::{Authorized, Gate};
pub use token::{TokenError, TokenSigner};

/// The two outcomes a caller can observe when access is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthorized,
    NotFound,
}

/// Why an access was refused. Only [`AccessError::rejection`] may leave
///  the process.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("no credential presented")]
    NoCredential,
    #[error("credential failed verification")]
    InvalidCredential,
    #[error("path escapes volume root")]
    PathEscape,
    #[error("volume does not offer feature {0:?}")]
    FeatureDisabled(String),
    #[error("capability does not grant access")]
    NotPermitted,
}

impl AccessError {
    pub fn rejection(&self) -> Rejection {
        match self {
            AccessError::NoCredential => Rejection::Unauthorized,
            AccessError::InvalidCredential
            | AccessError::PathEscape
            | AccessError::FeatureDisabled(_)
            | AccessError::NotPermitted => Rejection::NotFound,
        }
    }
}

impl From<crate::volume::PathError> for AccessError {
    fn from(_: crate::volume::PathError) -> Self {
        AccessError::PathEscape
    }
}
