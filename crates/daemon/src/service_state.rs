use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use common::auth::{CredentialVerifier, Gate, StaticApiKeys, TokenSigner};
use common::share::ShareLedger;
use common::volume::VolumeRegistry;

use crate::database::{Database, DatabaseSetupError};
use crate::identity::{DiscordIdentity, IdentityError, IdentityProvider};
use crate::state::{HttpConfig, StateError};
use crate::ServiceConfig;

/// Main service state, shared by every request handler
#[derive(Clone)]
pub struct State {
    gate: Arc<Gate<Database>>,
    database: Database,
    http: Arc<HttpConfig>,
    cookie_key: Key,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("volumes", &self.registry().len())
            .field("http", &self.http)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl State {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let database = Database::connect(config.sqlite_path.as_deref()).await?;

        // 2. Build the volume registry
        let registry = config.app.registry()?;
        tracing::info!(volumes = registry.len(), "volume registry loaded");

        // 3. Identity provider, only when configured
        let identity: Option<Arc<dyn IdentityProvider>> = match &config.app.discord {
            Some(discord) => Some(Arc::new(DiscordIdentity::new(
                discord,
                config.app.http.base_url(),
            )?)),
            None => None,
        };

        Ok(Self::new(
            registry,
            StaticApiKeys::from_config(&config.app.api_keys),
            database,
            config.app.http.clone(),
            identity,
        ))
    }

    /// Assemble state from already-built parts
    pub fn new(
        registry: VolumeRegistry,
        api_keys: StaticApiKeys,
        database: Database,
        http: HttpConfig,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        let verifier = CredentialVerifier::new(
            TokenSigner::new(&http.secret),
            Arc::new(api_keys),
            ShareLedger::new(database.clone()),
        );
        let gate = Gate::new(Arc::new(registry), verifier);
        // Cookie keys need 64 bytes; derive them from the configured secret
        let cookie_key = Key::from(Sha512::digest(http.secret.as_bytes()).as_slice());

        Self {
            gate: Arc::new(gate),
            database,
            http: Arc::new(http),
            cookie_key,
            identity,
        }
    }

    pub fn gate(&self) -> &Gate<Database> {
        &self.gate
    }

    pub fn registry(&self) -> &VolumeRegistry {
        self.gate.registry()
    }

    pub fn signer(&self) -> &TokenSigner {
        self.gate.verifier().signer()
    }

    pub fn shares(&self) -> &ShareLedger<Database> {
        self.gate.verifier().shares()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn http(&self) -> &HttpConfig {
        &self.http
    }

    pub fn identity(&self) -> Option<&Arc<dyn IdentityProvider>> {
        self.identity.as_ref()
    }
}

impl FromRef<State> for Key {
    fn from_ref(state: &State) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<State> for Database {
    fn from_ref(state: &State) -> Self {
        state.database.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Configuration error: {0}")]
    Config(#[from] StateError),
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),
}
