//! Shared fixtures for authorization integration tests
#![allow(dead_code)]

use std::sync::Arc;

use ::common::prelude::*;
use tempfile::TempDir;

pub const SECRET: &str = "integration-secret";
pub const API_KEY: &str = "ci-key";

/// A volume tree on disk:
///
/// ```text
/// docs/readme.txt
/// docs/foo/bar.txt
/// docs/foo2/baz.txt
/// public/index.txt
/// ```
///
/// with `docs` private to role `team` (user `42`), `public` public, and an
/// `ops` role holding admin `1`.
pub struct Fixture {
    pub dir: TempDir,
    pub gate: Gate<MemoryShareCodeProvider>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for (path, contents) in [
            ("docs/readme.txt", "hello"),
            ("docs/foo/bar.txt", "bar"),
            ("docs/foo2/baz.txt", "baz"),
            ("public/index.txt", "index"),
        ] {
            let path = dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }

        let volumes = [
            VolumeConfig {
                name: "docs".into(),
                path: dir.path().join("docs"),
                features: vec![features::UPLOAD.into()],
                roles: vec!["team".into()],
                privacy: Some("private".into()),
            },
            VolumeConfig {
                name: "public".into(),
                path: dir.path().join("public"),
                privacy: Some("public".into()),
                ..Default::default()
            },
        ];
        let roles = [
            RoleConfig {
                name: "team".into(),
                user_ids: vec!["42".into()],
                admin: false,
            },
            RoleConfig {
                name: "ops".into(),
                user_ids: vec!["1".into()],
                admin: true,
            },
        ];
        let registry = VolumeRegistry::from_config(&volumes, &roles).unwrap();

        let api_keys = StaticApiKeys::from_config(&[::common::auth::ApiKeyConfig {
            name: "ci".into(),
            key: API_KEY.into(),
            volumes: vec!["public".into()],
        }]);
        let verifier = CredentialVerifier::new(
            TokenSigner::new(SECRET),
            Arc::new(api_keys),
            ShareLedger::new(MemoryShareCodeProvider::new()),
        );

        Self {
            dir,
            gate: Gate::new(Arc::new(registry), verifier),
        }
    }

    pub fn token_for(&self, user_id: &str) -> Credential {
        let token = self.gate.verifier().signer().sign(user_id).unwrap();
        Credential::from_parts(Some(&format!("Token {}", token)), None, None)
    }

    pub async fn share_for(&self, volume: &str, path: &str) -> (ShareCode, Credential) {
        let share = self
            .gate
            .verifier()
            .shares()
            .get_or_create(volume, path)
            .await
            .unwrap();
        let credential = Credential::from_parts(None, Some(&share.code), None);
        (share, credential)
    }

    pub fn volume(&self, name: &str) -> std::sync::Arc<Volume> {
        self.gate.registry().get(name).unwrap()
    }
}
