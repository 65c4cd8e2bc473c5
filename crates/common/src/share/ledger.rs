use std::path::Component;

use time::{Duration, OffsetDateTime};

use super::provider::{ShareCodeProvider, ShareError};
use super::{ShareCode, ShareCodec};
use crate::volume::normalize;

/// How long a freshly minted share stays redeemable
pub const DEFAULT_SHARE_TTL: Duration = Duration::days(365 * 100);

/// Mints and redeems share codes on top of a provider.
#[derive(Debug, Clone)]
pub struct ShareLedger<P> {
    provider: P,
    codec: ShareCodec,
    ttl: Duration,
}

/// Render a path as the canonical `a/b/c` form shares are stored under
fn canonical_path(path: &str) -> Option<String> {
    let normalized = normalize(path).ok()?;
    let segments: Option<Vec<&str>> = normalized
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    segments.map(|s| s.join("/"))
}

impl<P: ShareCodeProvider> ShareLedger<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            codec: ShareCodec::default(),
            ttl: DEFAULT_SHARE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn codec(&self) -> &ShareCodec {
        &self.codec
    }

    /// Return the share for (`volume`, `path`), creating it on first use.
    ///
    /// Equivalent spellings of a path share one record. An expired record
    ///  is re-armed for another full lifetime and keeps its id, so codes
    ///  handed out earlier come back to life with it.
    pub async fn get_or_create(
        &self,
        volume: &str,
        path: &str,
    ) -> Result<ShareCode, ShareError<P::Error>> {
        let path = canonical_path(path).ok_or_else(|| ShareError::InvalidPath(path.to_string()))?;
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.ttl;

        let mut record = self.provider.get_or_create(volume, &path, expires_at).await?;
        if record.is_expired_at(now) {
            tracing::info!(id = record.id, volume, path = %path, "re-arming expired share");
            self.provider.set_expiry(record.id, expires_at).await?;
            record.expires_at = expires_at;
        }

        let code = self
            .codec
            .encode(record.id)
            .ok_or(ShareError::Encoding(record.id))?;
        Ok(ShareCode::new(record, code))
    }

    /// Redeem a presented code
    pub async fn resolve(&self, code: &str) -> Result<ShareCode, ShareError<P::Error>> {
        let id = self.codec.decode(code).ok_or_else(|| {
            tracing::debug!("undecodable share code");
            ShareError::NotFound
        })?;

        let record = self.provider.get(id).await?.ok_or_else(|| {
            tracing::debug!(id, "unknown share code");
            ShareError::NotFound
        })?;

        if record.is_expired_at(OffsetDateTime::now_utc()) {
            tracing::debug!(id, "expired share code");
            return Err(ShareError::NotFound);
        }

        Ok(ShareCode::new(record, code.to_string()))
    }
}
