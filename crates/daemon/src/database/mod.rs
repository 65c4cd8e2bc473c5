mod share_codes;
mod sqlite;

use std::ops::Deref;
use std::path::Path;

use sqlx::SqlitePool;

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    /// Open (creating if missing) the database at `path`, or an in-memory
    ///  database when no path is given, and bring the schema up to date.
    pub async fn connect(path: Option<&Path>) -> Result<Self, DatabaseSetupError> {
        let pool = match path {
            Some(path) => sqlite::connect_sqlite_file(path).await?,
            None => sqlite::connect_sqlite_memory().await?,
        };
        sqlite::migrate_sqlite(&pool).await?;
        Ok(Database::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }

    /// Cheap liveness probe used by readiness checks
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.0).await?;
        Ok(())
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("unable to create database directory: {0}")]
    Directory(#[from] std::io::Error),
}
