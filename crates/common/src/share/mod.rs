//! Share codes.
//!
//! A share grants read-only access to one (volume, path) pair without an
//! identity. Records live behind a [`ShareCodeProvider`]; the externally
//! visible code is the record id run through a reversible [`ShareCodec`].
//! The [`ShareLedger`] ties the two together and owns the expiry policy.

mod codec;
mod ledger;
mod memory;
mod provider;

use serde::Serialize;
use time::OffsetDateTime;

pub use codec::ShareCodec;
pub use ledger::{ShareLedger, DEFAULT_SHARE_TTL};
pub use memory::{MemoryShareCodeProvider, MemoryShareCodeProviderError};
pub use provider::{ShareCodeProvider, ShareError};

/// A persisted share record as stored by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    pub id: u64,
    pub volume: String,
    /// Volume-relative, normalized
    pub path: String,
    pub expires_at: OffsetDateTime,
}

impl ShareRecord {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// A share record together with its external code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareCode {
    pub id: u64,
    pub volume: String,
    pub path: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub code: String,
}

impl ShareCode {
    pub fn new(record: ShareRecord, code: String) -> Self {
        Self {
            id: record.id,
            volume: record.volume,
            path: record.path,
            expires_at: record.expires_at,
            code,
        }
    }
}
