mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use sha2::{Digest, Sha256};

use crate::common::*;

fn names(listing: &serde_json::Value, key: &str) -> Vec<String> {
    listing[key]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_index_depends_on_caller() {
    let server = TestServer::new().await;

    let anonymous = json(server.get("/").await).await;
    assert_eq!(names(&anonymous, "volumes"), vec!["public"]);
    assert!(anonymous["user_id"].is_null());

    let member = json(server.get_as("/", &server.token("42")).await).await;
    assert_eq!(names(&member, "volumes"), vec!["docs", "public"]);
    assert_eq!(member["user_id"], "42");

    let admin = json(server.get_as("/", &server.token("1")).await).await;
    assert_eq!(names(&admin, "volumes"), vec!["docs", "hidden", "public"]);
}

#[tokio::test]
async fn test_private_volume_access() {
    let server = TestServer::new().await;

    let response = server.get("/volume/docs/browse/readme.txt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .get_as("/volume/docs/browse/readme.txt", &server.token("42"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["content"], "hello docs");
    assert_eq!(body["path"], "readme.txt");

    let response = server
        .get_as("/volume/docs/browse/readme.txt", &server.token("7"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A forged token is no credential at all
    let response = server
        .get_as("/volume/docs/browse/readme.txt", "Token not-a-token")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejections_do_not_leak_detail() {
    let server = TestServer::new().await;
    let token = server.token("7");

    let missing_volume = server.get_as("/volume/nope/browse", &token).await;
    let forbidden_volume = server.get_as("/volume/docs/browse", &token).await;
    assert_eq!(missing_volume.status(), StatusCode::NOT_FOUND);
    assert_eq!(forbidden_volume.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(missing_volume).await, json(forbidden_volume).await);

    let response = server.get("/volume/nope/browse").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_directory_listing() {
    let server = TestServer::new().await;

    let response = server.get_as("/volume/docs/browse", &server.token("42")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = json(response).await;
    assert_eq!(listing["is_dir"], true);
    assert_eq!(names(&listing, "entries"), vec!["foo", "foo2", "readme.txt"]);
    assert_eq!(listing["entries"][0]["path"], "foo");

    let response = server
        .get_as("/volume/docs/browse/foo", &server.token("42"))
        .await;
    let listing = json(response).await;
    assert_eq!(listing["entries"][0]["path"], "foo/bar.txt");
}

#[tokio::test]
async fn test_path_escape_is_not_found() {
    let server = TestServer::new().await;

    let response = server
        .get_as(
            "/volume/docs/browse/..%2F..%2Fetc%2Fpasswd",
            &server.token("42"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .get("/volume/public/browse/..%2Fdocs%2Freadme.txt?raw")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_raw_download_and_hash() {
    let server = TestServer::new().await;

    let response = server.get("/volume/public/browse/index.txt?raw").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    assert_eq!(body_bytes(response).await, b"public index");

    let response = server.get("/volume/public/browse/index.txt?download").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"index.txt\""
    );

    let response = server.get("/volume/public/browse/index.txt?hash").await;
    let body = json(response).await;
    assert_eq!(body["hash"], hex::encode(Sha256::digest(b"public index")));

    let response = server.get("/volume/public/browse?raw").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.get("/volume/public/browse/missing.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unlisted_volume_reads_but_does_not_list() {
    let server = TestServer::new().await;

    let response = server.get("/volume/hidden/browse/secret.txt?raw").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = server.get("/volume/hidden/browse").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.get_as("/volume/hidden/browse", &server.token("1")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_share_and_redeem() {
    let server = TestServer::new().await;
    let token = server.token("42");

    let share = |path: &'static str, auth: String| {
        Request::post(format!("/volume/docs/share/{path}"))
            .header(header::AUTHORIZATION, auth)
            .body(Body::empty())
            .unwrap()
    };

    let response = server.send(share("foo", token.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = json(response).await;
    let code = first["code"].as_str().unwrap().to_string();
    assert_eq!(first["url"], format!("http://files.test/s/{code}?raw"));

    // Idempotent
    let second = json(server.send(share("foo", token.clone())).await).await;
    assert_eq!(second["code"], first["code"]);

    // Missing paths cannot be shared
    let response = server.send(share("nope", token.clone())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.get(&format!("/s/{code}?raw")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("/volume/docs/browse/foo?raw=&sc={code}").as_str()
    );

    let response = server
        .get(&format!("/volume/docs/browse/foo/bar.txt?raw&sc={code}"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"bar");

    let listing = json(server.get(&format!("/volume/docs/browse/foo?sc={code}")).await).await;
    assert_eq!(listing["sc"], code.as_str());

    // Segment boundary and read-only
    let response = server
        .get(&format!("/volume/docs/browse/foo2/baz.txt?sc={code}"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .send(
            Request::post(format!("/volume/docs/share/foo?sc={code}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.get("/s/not-a-code").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn test_share_code_does_not_follow_symlinks_out_of_share() {
    let server = TestServer::new().await;
    let docs = server.dir.path().join("docs");
    std::os::unix::fs::symlink(docs.join("foo2"), docs.join("foo/peek")).unwrap();
    let code = server
        .state
        .shares()
        .get_or_create("docs", "foo")
        .await
        .unwrap()
        .code;

    for query in ["raw", "download", "hash", "compress=zip"] {
        let response = server
            .get(&format!("/volume/docs/browse/foo/peek/baz.txt?{query}&sc={code}"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{query}");
    }
    let response = server
        .get(&format!("/volume/docs/browse/foo/peek?sc={code}"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A member reaches the same file through the link
    let response = server
        .get_as("/volume/docs/browse/foo/peek/baz.txt?raw", &server.token("42"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"baz");
}

#[tokio::test]
async fn test_header_credential_wins_over_share_code() {
    let server = TestServer::new().await;
    let share = server
        .state
        .shares()
        .get_or_create("docs", "readme.txt")
        .await
        .unwrap();

    let response = server
        .get_as(
            &format!("/volume/docs/browse/readme.txt?sc={}", share.code),
            "Token forged",
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_key_scope() {
    let server = TestServer::new().await;

    let response = server
        .get_as("/volume/docs/browse/readme.txt", &format!("ApiKey {DOCS_KEY}"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .get_as("/volume/docs/browse/readme.txt", &format!("ApiKey {PUBLIC_KEY}"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server
        .get_as("/volume/docs/browse/readme.txt", "ApiKey wrong")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload() {
    let server = TestServer::new().await;

    let upload = |auth: Option<String>, volume: &str| {
        let (content_type, body) = multipart(&[
            ("path", None, "notes/2024".as_bytes()),
            ("file", Some("../../evil/report.txt"), "quarterly".as_bytes()),
        ]);
        let mut request = Request::post(format!("/volume/{volume}/upload"))
            .header(header::CONTENT_TYPE, content_type);
        if let Some(auth) = auth {
            request = request.header(header::AUTHORIZATION, auth);
        }
        request.body(body).unwrap()
    };

    let response = server.send(upload(None, "docs")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // public has no upload feature, even for an admin
    let response = server.send(upload(Some(server.token("1")), "public")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.send(upload(Some(server.token("42")), "docs")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(
        body["url"],
        "http://files.test/volume/docs/browse/notes/2024/report.txt"
    );

    let stored = server.dir.path().join("docs/notes/2024/report.txt");
    assert_eq!(std::fs::read(stored).unwrap(), b"quarterly");
    assert!(!server.dir.path().join("evil").exists());
}

#[tokio::test]
async fn test_sharex_upload_returns_share_link() {
    let server = TestServer::new().await;

    let (content_type, body) = multipart(&[("image", Some("shot.png"), "png bytes".as_bytes())]);
    let response = server
        .send(
            Request::post("/volume/docs/sharex")
                .header(header::CONTENT_TYPE, content_type)
                .header(header::AUTHORIZATION, server.token("42"))
                .body(body)
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let link = json(response).await["link"].as_str().unwrap().to_string();
    let code = link
        .strip_prefix("http://files.test/s/")
        .and_then(|rest| rest.strip_suffix("?raw"))
        .unwrap();
    let share = server.state.shares().resolve(code).await.unwrap();
    assert_eq!(share.path, "42/shot.png");
    assert!(server.dir.path().join("docs/42/shot.png").exists());

    // API keys carry no user id to store under
    let (content_type, body) = multipart(&[("image", Some("shot.png"), "png bytes".as_bytes())]);
    let response = server
        .send(
            Request::post("/volume/docs/sharex")
                .header(header::CONTENT_TYPE, content_type)
                .header(header::AUTHORIZATION, format!("ApiKey {DOCS_KEY}"))
                .body(body)
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search() {
    let server = TestServer::new().await;

    let search = |uri: &str, term: &str, auth: String| {
        Request::post(uri)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("search={term}")))
            .unwrap()
    };

    let response = server
        .send(search("/volume/docs/search", "BAR", server.token("42")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    let paths: Vec<_> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["foo/bar.txt"]);

    let response = server
        .send(search("/volume/docs/search?fuzzy", "rdt", server.token("42")))
        .await;
    let body = json(response).await;
    assert_eq!(body["results"][0]["path"], "readme.txt");

    let response = server
        .send(search("/volume/docs/search?path=foo2", "bar", server.token("42")))
        .await;
    assert!(json(response).await["results"].as_array().unwrap().is_empty());

    // public has no search feature
    let response = server
        .send(search("/volume/public/search", "index", server.token("1")))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_zip_download() {
    let server = TestServer::new().await;

    let response = server
        .get_as("/volume/docs/browse/foo?compress=zip", &server.token("42"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["bar.txt"]);

    let response = server
        .get_as("/volume/docs/browse/foo?compress=rar", &server.token("42"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // public has no compress feature
    let response = server.get("/volume/public/browse?compress=zip").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_token_and_user() {
    let server = TestServer::new().await;

    let response = server.get("/token").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server.get_as("/token", &server.token("42")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = json(response).await["token"].as_str().unwrap().to_string();
    assert_eq!(server.state.signer().verify(&token).unwrap(), "42");

    let user = json(server.get_as("/user", &format!("Token {token}")).await).await;
    assert_eq!(user["user_id"], "42");

    let user = json(server.get("/user").await).await;
    assert!(user["user_id"].is_null());
}

#[tokio::test]
async fn test_discord_login_sets_session() {
    let server = TestServer::new().await;

    let response = server.get("/discord/login").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let cookie = session_cookie(&response).unwrap();
    let location = url::Url::parse(response.headers()[header::LOCATION].to_str().unwrap()).unwrap();
    let state = location
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    // Wrong state: back to the index, no session
    let response = server
        .send(
            Request::get(format!("/discord/login/callback?code={GOOD_CODE}&state=other"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(session_cookie(&response).is_none());

    let response = server
        .send(
            Request::get(format!("/discord/login/callback?code={GOOD_CODE}&state={state}"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let session = session_cookie(&response).unwrap();

    let response = server
        .send(
            Request::get("/volume/docs/browse/readme.txt")
                .header(header::COOKIE, &session)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A hand-written cookie is not signed and is ignored
    let response = server
        .send(
            Request::get("/user")
                .header(header::COOKIE, "session=eyJkaXNjb3JkLXVzZXItaWQiOiI0MiJ9")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert!(json(response).await["user_id"].is_null());

    let response = server
        .send(
            Request::get("/discord/logout")
                .header(header::COOKIE, &session)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_status_and_fallback() {
    let server = TestServer::new().await;

    assert_eq!(server.get("/_status/livez").await.status(), StatusCode::OK);
    assert_eq!(server.get("/_status/readyz").await.status(), StatusCode::OK);
    let version = json(server.get("/_status/version").await).await;
    assert_eq!(version["name"], "files-daemon");

    let response = server
        .send(
            Request::get("/nowhere")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response).await["msg"], "not found");
}
