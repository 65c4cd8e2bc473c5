use crate::share::ShareCode;
use crate::volume::{normalize, Volume};

use super::ApiKeyScope;

/// A resolved authorization decision object. Exactly one is resolved per
///  request and it is never upgraded or merged with another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// A verified user, from a signed token or a session
    User { user_id: String, is_admin: bool },
    /// A configured API key and the volumes it is scoped to
    ApiKey(ApiKeyScope),
    /// A redeemed share code: read-only access below one path
    ShareCode(ShareCode),
}

impl Capability {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Capability::User { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    pub fn share_code(&self) -> Option<&ShareCode> {
        match self {
            Capability::ShareCode(share) => Some(share),
            _ => None,
        }
    }

    /// Whether this capability may reach `path` inside `volume`.
    ///
    /// `full` marks write or otherwise non-read-only requests.
    pub fn can_access(&self, volume: &Volume, path: &str, full: bool) -> bool {
        match self {
            Capability::User { user_id, is_admin } => *is_admin || volume.has_user_id(user_id),
            Capability::ApiKey(scope) => scope.allows(volume.name()),
            Capability::ShareCode(share) => {
                !full && share.volume == volume.name() && share_covers(&share.path, path)
            }
        }
    }
}

/// A share for `base` covers `base` itself and anything below it, on
///  segment boundaries only: a share for `foo` does not cover `foo2`.
///  Both sides are normalized first so `foo/../bar` is judged as `bar`.
fn share_covers(base: &str, path: &str) -> bool {
    match (normalize(base), normalize(path)) {
        (Ok(base), Ok(path)) => path.starts_with(base),
        _ => false,
    }
}
