use clap::Args;

use common::auth::{TokenError, TokenSigner};
use files_daemon::state::StateError;

/// Mint a user token with the configured secret
#[derive(Args, Debug, Clone)]
pub struct Token {
    /// User id to embed in the token
    pub user_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenOpError {
    #[error("config error: {0}")]
    Config(#[from] StateError),
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Token {
    type Error = TokenOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        if self.user_id.is_empty() {
            return Err(TokenOpError::EmptyUserId);
        }
        let config = ctx.config()?;
        let signer = TokenSigner::new(&config.http.secret);
        Ok(signer.sign(&self.user_id)?)
    }
}
