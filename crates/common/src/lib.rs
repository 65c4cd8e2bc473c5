/**
 * Authorization capabilities, credential parsing and
 *  verification, and the request gate that composes
 *  them into a single allow / reject decision.
 */
pub mod auth;
/**
 * Share codes: the persistent (volume, path) ledger
 *  contract, the reversible short-code encoding and
 *  an in-memory provider.
 */
pub mod share;
/**
 * Helper for reporting build version information.
 */
pub mod version;
/**
 * Volumes exposed by the service: the registry built
 *  from static configuration, the secure path resolver
 *  every filesystem access goes through, and the
 *  filesystem operations layered on top of it.
 */
pub mod volume;

pub mod prelude {
    pub use crate::auth::{
        AccessError, ApiKeyProvider, ApiKeyScope, Authorized, Capability, Credential,
        CredentialVerifier, Gate, Rejection, StaticApiKeys, TokenSigner,
    };
    pub use crate::share::{
        MemoryShareCodeProvider, ShareCode, ShareCodeProvider, ShareCodec, ShareError,
        ShareLedger, ShareRecord,
    };
    pub use crate::version::build_info;
    pub use crate::volume::{
        features, PathError, Privacy, RegistryError, RoleConfig, Volume, VolumeConfig,
        VolumeEntry, VolumeRegistry,
    };
}
