//! External identity providers.
//!
//! The service only needs two things from an OAuth provider: a URL to send
//! the browser to, and a way to turn the returned authorization code into a
//! verified user id.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::state::DiscordConfig;

const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";
const DISCORD_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
const DISCORD_USER_URL: &str = "https://discord.com/api/v10/users/@me";
const DISCORD_SCOPE: &str = "identify";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Path the provider redirects back to after login
pub const CALLBACK_PATH: &str = "/discord/login/callback";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned no user id")]
    MissingUserId,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Where to send the browser to start a login carrying `state`
    fn authorize_url(&self, state: &str) -> Result<Url, IdentityError>;

    /// Exchange an authorization code for the external user id
    async fn exchange(&self, code: &str) -> Result<String, IdentityError>;
}

#[derive(Clone)]
pub struct DiscordIdentity {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for DiscordIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordIdentity")
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[derive(Deserialize)]
struct DiscordUser {
    id: String,
}

impl DiscordIdentity {
    pub fn new(config: &DiscordConfig, base_url: &str) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: format!("{}{}", base_url.trim_end_matches('/'), CALLBACK_PATH),
            http,
        })
    }
}

#[async_trait]
impl IdentityProvider for DiscordIdentity {
    fn authorize_url(&self, state: &str) -> Result<Url, IdentityError> {
        Ok(Url::parse_with_params(
            DISCORD_AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", DISCORD_SCOPE),
                ("state", state),
            ],
        )?)
    }

    async fn exchange(&self, code: &str) -> Result<String, IdentityError> {
        let token: TokenResponse = self
            .http
            .post(DISCORD_TOKEN_URL)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let user: DiscordUser = self
            .http
            .get(DISCORD_USER_URL)
            .header(
                http::header::AUTHORIZATION,
                format!("{} {}", token.token_type, token.access_token),
            )
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if user.id.is_empty() {
            return Err(IdentityError::MissingUserId);
        }
        tracing::info!(user_id = %user.id, "discord login verified");
        Ok(user.id)
    }
}
