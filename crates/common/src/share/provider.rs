use std::fmt::{Debug, Display};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::ShareRecord;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError<T> {
    #[error("unhandled share code provider error: {0}")]
    Provider(#[from] T),
    /// Undecodable code, unknown id or expired record. Deliberately
    ///  a single variant.
    #[error("share code not found")]
    NotFound,
    /// The path to share is not a normalized volume-relative path
    #[error("invalid share path: {0}")]
    InvalidPath(String),
    #[error("share code could not be encoded for id {0}")]
    Encoding(u64),
}

/// Storage for share records.
///
/// Implementations must keep at most one record per (volume, path) pair,
///  including when `get_or_create` races with itself.
#[async_trait]
pub trait ShareCodeProvider: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send;

    /// Return the record for (`volume`, `path`), inserting one that
    ///  expires at `expires_at` if none exists. An existing record is
    ///  returned as stored.
    async fn get_or_create(
        &self,
        volume: &str,
        path: &str,
        expires_at: OffsetDateTime,
    ) -> Result<ShareRecord, ShareError<Self::Error>>;

    async fn get(&self, id: u64) -> Result<Option<ShareRecord>, ShareError<Self::Error>>;

    /// Move a record's expiry. Unknown ids are [`ShareError::NotFound`].
    async fn set_expiry(
        &self,
        id: u64,
        expires_at: OffsetDateTime,
    ) -> Result<(), ShareError<Self::Error>>;
}
