//! In-process server fixture for HTTP tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use ::common::auth::StaticApiKeys;
use files_daemon::database::Database;
use files_daemon::http_server;
use files_daemon::identity::{IdentityError, IdentityProvider};
use files_daemon::{AppConfig, ServiceState};

pub const SECRET: &str = "http-test-secret";
pub const PUBLIC_KEY: &str = "public-key";
pub const DOCS_KEY: &str = "docs-key";
pub const BOUNDARY: &str = "files-test-boundary";
/// Authorization code the mock identity provider accepts
pub const GOOD_CODE: &str = "good-code";

/// Identity provider that knows a single user, `42`
#[derive(Debug)]
pub struct MockIdentity;

#[async_trait]
impl IdentityProvider for MockIdentity {
    fn authorize_url(&self, state: &str) -> Result<Url, IdentityError> {
        let mut url = Url::parse("https://id.example/authorize")?;
        url.query_pairs_mut().append_pair("state", state);
        Ok(url)
    }

    async fn exchange(&self, code: &str) -> Result<String, IdentityError> {
        if code == GOOD_CODE {
            Ok("42".to_string())
        } else {
            Err(IdentityError::MissingUserId)
        }
    }
}

/// Volumes on disk:
///
/// ```text
/// docs/readme.txt      private, role team (42), upload+search+compress
/// docs/foo/bar.txt
/// docs/foo2/baz.txt
/// public/index.txt     public
/// hidden/secret.txt    unlisted
/// ```
///
/// User `1` is an admin.
pub struct TestServer {
    pub dir: TempDir,
    pub state: ServiceState,
    router: Router,
}

impl TestServer {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for (path, contents) in [
            ("docs/readme.txt", "hello docs"),
            ("docs/foo/bar.txt", "bar"),
            ("docs/foo2/baz.txt", "baz"),
            ("public/index.txt", "public index"),
            ("hidden/secret.txt", "unlisted secret"),
        ] {
            let path = dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }

        let root = dir.path().display();
        let config = AppConfig::from_toml(&format!(
            r#"
            [http]
            url = "http://files.test"
            secret = "{SECRET}"

            [[role]]
            name = "team"
            user_ids = ["42"]

            [[role]]
            name = "ops"
            user_ids = ["1"]
            admin = true

            [[volume]]
            name = "docs"
            path = '{root}/docs'
            roles = ["team"]
            features = ["upload", "search", "compress"]

            [[volume]]
            name = "public"
            path = '{root}/public'
            privacy = "public"

            [[volume]]
            name = "hidden"
            path = '{root}/hidden'
            privacy = "unlisted"

            [[api_key]]
            name = "public-only"
            key = "{PUBLIC_KEY}"
            volumes = ["public"]

            [[api_key]]
            name = "docs-only"
            key = "{DOCS_KEY}"
            volumes = ["docs"]
            "#
        ))
        .unwrap();

        let database = Database::connect(None).await.unwrap();
        let state = ServiceState::new(
            config.registry().unwrap(),
            StaticApiKeys::from_config(&config.api_keys),
            database,
            config.http.clone(),
            Some(Arc::new(MockIdentity)),
        );
        let router = http_server::router(state.clone());

        Self { dir, state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_as(&self, uri: &str, authorization: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, authorization)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub fn token(&self, user_id: &str) -> String {
        format!("Token {}", self.state.signer().sign(user_id).unwrap())
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// A multipart body from `(field, file name, contents)` triples
pub fn multipart(fields: &[(&str, Option<&str>, &[u8])]) -> (String, Body) {
    let mut body = Vec::new();
    for (name, file_name, contents) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (
        format!("multipart/form-data; boundary={BOUNDARY}"),
        Body::from(body),
    )
}

/// The `name=value` part of a `Set-Cookie` header, ready for a `Cookie` header
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}
