use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use files_daemon::state::StateError;
use files_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override the HTTP listen address (default from config)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Override the SQLite database path (default from config)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = ServiceConfig::from_app_config(ctx.config()?)?;

        // Flags win over the config file
        if let Some(bind) = self.bind {
            config.listen_addr = bind;
        }
        if let Some(database) = &self.database {
            config.sqlite_path = Some(database.clone());
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
