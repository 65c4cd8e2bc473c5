//! Stateless signed user tokens.
//!
//! Wire format: `base64url(<json user id> "." base64url(HMAC-SHA256(json)))`,
//! both encodings without padding. Verification is fail-closed: any decode,
//! signature or deserialization problem is a [`TokenError`], which callers
//! treat as "no identity".

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: u8 = b'.';

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is not valid base64url")]
    Encoding(#[from] base64::DecodeError),
    #[error("token is missing its signature")]
    MissingSignature,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token payload is not a serialized user id: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("token payload is empty")]
    EmptyUserId,
    #[error("signing key rejected")]
    Key,
}

/// Signs and verifies user tokens with a key derived from the service secret
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.key).map_err(|_| TokenError::Key)
    }

    pub fn sign(&self, user_id: &str) -> Result<String, TokenError> {
        let payload = serde_json::to_vec(user_id)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let mut signed = payload;
        signed.push(SEPARATOR);
        signed.extend_from_slice(signature.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(signed))
    }

    /// Return the user id carried by a valid token
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let signed = URL_SAFE_NO_PAD.decode(token.trim())?;

        let split = signed
            .iter()
            .rposition(|b| *b == SEPARATOR)
            .ok_or(TokenError::MissingSignature)?;
        let (payload, signature) = (&signed[..split], &signed[split + 1..]);
        let signature = URL_SAFE_NO_PAD.decode(signature)?;

        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let user_id: String = serde_json::from_slice(payload)?;
        if user_id.is_empty() {
            return Err(TokenError::EmptyUserId);
        }
        Ok(user_id)
    }
}
