use clap::Args;

use common::share::{ShareError, ShareLedger};
use common::volume::PathError;
use files_daemon::database::{Database, DatabaseSetupError};
use files_daemon::state::StateError;

/// Create (or look up) the share code for a path, without a running server
#[derive(Args, Debug, Clone)]
pub struct Share {
    /// Volume name
    pub volume: String,
    /// Volume-relative path to share
    #[arg(default_value = "")]
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareOpError {
    #[error("config error: {0}")]
    Config(#[from] StateError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseSetupError),
    #[error("no volume named {0:?}")]
    UnknownVolume(String),
    #[error("cannot share path: {0}")]
    Path(#[from] PathError),
    #[error("share error: {0}")]
    Share(#[from] ShareError<sqlx::Error>),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Share {
    type Error = ShareOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ctx.config()?;
        let registry = config.registry()?;
        let volume = registry
            .get(&self.volume)
            .ok_or_else(|| ShareOpError::UnknownVolume(self.volume.clone()))?;
        volume.entry(&self.path)?;

        let database = Database::connect(config.database.path.as_deref()).await?;
        let share = ShareLedger::new(database)
            .get_or_create(volume.name(), &self.path)
            .await?;
        Ok(config.http.share_link(&share.code))
    }
}
