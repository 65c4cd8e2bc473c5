//! Login session stored in a signed cookie.

use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "session";

/// The session payload. Field names are the cookie's wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(
        rename = "discord-user-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    #[serde(
        rename = "discord-state",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<String>,
}

impl Session {
    /// Read the session from the jar. A missing, tampered or unreadable
    ///  cookie is an empty session.
    pub fn from_jar(jar: &SignedCookieJar) -> Self {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| URL_SAFE_NO_PAD.decode(cookie.value()).ok())
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, jar: SignedCookieJar) -> SignedCookieJar {
        let value = match serde_json::to_vec(self) {
            Ok(raw) => URL_SAFE_NO_PAD.encode(raw),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize session");
                return jar;
            }
        };
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        jar.add(cookie)
    }

    pub fn clear(jar: SignedCookieJar) -> SignedCookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}
