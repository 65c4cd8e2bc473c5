use std::sync::Arc;

use crate::share::{ShareCodeProvider, ShareLedger};
use crate::volume::VolumeRegistry;

use super::{ApiKeyProvider, Capability, TokenSigner};

/// Query parameter carrying a share code
pub const SHARE_CODE_QUERY_PARAM: &str = "sc";
/// Session field holding the logged-in user id
pub const SESSION_USER_KEY: &str = "discord-user-id";

/// Sentinel some session writers use for "logged out"
const ANONYMOUS_SESSION_USER: &str = "0";

/// The one credential a request presents, picked by fixed precedence.
///
/// Nothing here is verified yet; see [`CredentialVerifier::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credential {
    #[default]
    None,
    /// `Authorization: Token <value>`
    Token(String),
    /// `Authorization: ApiKey <value>`
    ApiKey(String),
    /// `?sc=<code>`
    ShareCode(String),
    /// User id stored in the login session
    Session(String),
}

impl Credential {
    /// Pick the credential from the raw request parts.
    ///
    /// Precedence: a `Token` or `ApiKey` authorization header, then a
    ///  non-empty share code, then a session user id. The first scheme
    ///  present wins even if it later fails to verify.
    pub fn from_parts(
        authorization: Option<&str>,
        share_code: Option<&str>,
        session_user: Option<&str>,
    ) -> Self {
        if let Some(header) = authorization {
            let mut parts = header.split(' ');
            if let (Some(scheme), Some(value)) = (parts.next(), parts.next()) {
                match scheme.to_ascii_lowercase().as_str() {
                    "token" => return Credential::Token(value.to_string()),
                    "apikey" => return Credential::ApiKey(value.to_string()),
                    _ => {}
                }
            }
        }

        if let Some(code) = share_code.filter(|c| !c.is_empty()) {
            return Credential::ShareCode(code.to_string());
        }

        match session_user {
            Some(user_id) if !user_id.is_empty() && user_id != ANONYMOUS_SESSION_USER => {
                Credential::Session(user_id.to_string())
            }
            _ => Credential::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Credential::None)
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Credential::None => "none",
            Credential::Token(_) => "token",
            Credential::ApiKey(_) => "api_key",
            Credential::ShareCode(_) => "share_code",
            Credential::Session(_) => "session",
        }
    }
}

/// Turns a presented [`Credential`] into at most one [`Capability`].
///
/// Verification has no side effects, so one verifier is shared by every
///  request.
#[derive(Debug, Clone)]
pub struct CredentialVerifier<S> {
    signer: TokenSigner,
    api_keys: Arc<dyn ApiKeyProvider>,
    shares: ShareLedger<S>,
}

impl<S: ShareCodeProvider> CredentialVerifier<S> {
    pub fn new(
        signer: TokenSigner,
        api_keys: Arc<dyn ApiKeyProvider>,
        shares: ShareLedger<S>,
    ) -> Self {
        Self {
            signer,
            api_keys,
            shares,
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn shares(&self) -> &ShareLedger<S> {
        &self.shares
    }

    /// Resolve the capability for a credential. Any verification failure
    ///  yields `None`, exactly as if nothing had been presented.
    pub async fn resolve(
        &self,
        credential: &Credential,
        registry: &VolumeRegistry,
    ) -> Option<Capability> {
        let user = |user_id: String| Capability::User {
            is_admin: registry.is_admin(&user_id),
            user_id,
        };

        match credential {
            Credential::None => None,
            Credential::Token(token) => match self.signer.verify(token) {
                Ok(user_id) => Some(user(user_id)),
                Err(e) => {
                    tracing::debug!(error = %e, "rejected user token");
                    None
                }
            },
            Credential::ApiKey(key) => match self.api_keys.lookup(key).await {
                Ok(scope) => Some(Capability::ApiKey(scope)),
                Err(e) => {
                    tracing::debug!(error = %e, "rejected api key");
                    None
                }
            },
            Credential::ShareCode(code) => match self.shares.resolve(code).await {
                Ok(share) => Some(Capability::ShareCode(share)),
                Err(e) => {
                    tracing::debug!(error = %e, "rejected share code");
                    None
                }
            },
            Credential::Session(user_id) => Some(user(user_id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ApiKeyConfig, StaticApiKeys};
    use crate::share::MemoryShareCodeProvider;
    use crate::volume::{RoleConfig, VolumeConfig};

    #[test]
    fn test_precedence() {
        assert_eq!(
            Credential::from_parts(Some("Token abc"), Some("sc"), Some("42")),
            Credential::Token("abc".into())
        );
        assert_eq!(
            Credential::from_parts(Some("APIKEY k"), Some("sc"), Some("42")),
            Credential::ApiKey("k".into())
        );
        assert_eq!(
            Credential::from_parts(Some("Bearer x"), Some("sc"), Some("42")),
            Credential::ShareCode("sc".into())
        );
        assert_eq!(
            Credential::from_parts(Some("Token"), Some(""), Some("42")),
            Credential::Session("42".into())
        );
        assert_eq!(Credential::from_parts(None, None, Some("0")), Credential::None);
        assert_eq!(Credential::from_parts(None, None, Some("")), Credential::None);
        assert_eq!(Credential::from_parts(None, None, None), Credential::None);
    }

    fn fixture() -> (CredentialVerifier<MemoryShareCodeProvider>, VolumeRegistry) {
        let signer = TokenSigner::new("secret");
        let keys = StaticApiKeys::from_config(&[ApiKeyConfig {
            name: "ci".into(),
            key: "k".into(),
            volumes: vec![],
        }]);
        let verifier = CredentialVerifier::new(
            signer,
            Arc::new(keys),
            ShareLedger::new(MemoryShareCodeProvider::new()),
        );
        let registry = VolumeRegistry::from_config(
            &[VolumeConfig {
                name: "docs".into(),
                path: "/srv/docs".into(),
                ..Default::default()
            }],
            &[RoleConfig {
                name: "ops".into(),
                user_ids: vec!["1".into()],
                admin: true,
            }],
        )
        .unwrap();
        (verifier, registry)
    }

    #[tokio::test]
    async fn test_token_resolves_admin_flag_from_registry() {
        let (verifier, registry) = fixture();
        let token = verifier.signer().sign("1").unwrap();
        assert_eq!(
            verifier.resolve(&Credential::Token(token), &registry).await,
            Some(Capability::User {
                user_id: "1".into(),
                is_admin: true
            })
        );
    }

    #[tokio::test]
    async fn test_failed_verification_is_absence() {
        let (verifier, registry) = fixture();
        for credential in [
            Credential::Token("garbage".into()),
            Credential::ApiKey("wrong".into()),
            Credential::ShareCode("zzzz".into()),
            Credential::None,
        ] {
            assert_eq!(verifier.resolve(&credential, &registry).await, None);
        }
    }

    #[tokio::test]
    async fn test_share_code_and_api_key() {
        let (verifier, registry) = fixture();
        let share = verifier.shares().get_or_create("docs", "a.txt").await.unwrap();

        let cap = verifier
            .resolve(&Credential::ShareCode(share.code.clone()), &registry)
            .await;
        assert_eq!(cap.as_ref().and_then(Capability::share_code), Some(&share));

        let cap = verifier.resolve(&Credential::ApiKey("k".into()), &registry).await;
        assert!(matches!(cap, Some(Capability::ApiKey(scope)) if scope.name() == "ci"));
    }
}
