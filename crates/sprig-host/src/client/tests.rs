//! Unit tests for the repository client

use super::*;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn client_for(server: &MockServer) -> RepoClient {
    RepoClient::with_config(Endpoints::single(&server.uri()), AuthConfig::default(), fast_retry())
        .unwrap()
}

fn lights_repo() -> RepoRef {
    RepoRef::parse("acme/lights#v1.0.0").unwrap()
}

const LIGHTS_MANIFEST: &str = r#"{
    "name": "lights",
    "dependencies": {"core": "*"},
    "files": ["lights.ts", "README.md"],
    "testFiles": ["test.ts"]
}"#;

#[test]
fn test_retry_config_default() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.initial_delay, Duration::from_millis(100));
    assert_eq!(config.max_delay, Duration::from_secs(10));
    assert_eq!(config.multiplier, 2.0);
}

#[test]
fn test_endpoints_are_validated() {
    let err = RepoClient::with_config(
        Endpoints::single("not a url"),
        AuthConfig::default(),
        RetryConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SprigError::ConfigValidation { .. }));

    let client = RepoClient::with_config(
        Endpoints {
            repo_api: "http://localhost:9000/".to_string(),
            raw_content: "http://localhost:9000/raw/".to_string(),
            script_api: "http://localhost:9000/scripts".to_string(),
        },
        AuthConfig::default(),
        RetryConfig::default(),
    )
    .unwrap();
    assert_eq!(client.endpoints().repo_api, "http://localhost:9000");
    assert_eq!(client.endpoints().raw_content, "http://localhost:9000/raw");
}

#[test]
fn test_from_settings_uses_defaults() {
    let client = RepoClient::from_settings(&UserSettings::default()).unwrap();
    assert_eq!(client.endpoints().repo_api, "https://api.github.com");
}

#[tokio::test]
async fn test_repo_exists() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "full_name": "acme/lights",
            "default_branch": "main"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.repo_exists("acme/lights").await.unwrap());
    assert!(!client.repo_exists("acme/missing").await.unwrap());
}

#[tokio::test]
async fn test_fetch_manifest_is_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw/acme/lights/v1.0.0/sprig.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LIGHTS_MANIFEST))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let config = client.fetch_manifest(&lights_repo()).await.unwrap();
    assert_eq!(config.name, "lights");

    // second lookup is served from the cache
    let again = client.fetch_manifest(&lights_repo()).await.unwrap();
    assert_eq!(again, config);
    assert_eq!(client.cache().stats().fresh_entries, 1);
}

#[tokio::test]
async fn test_fetch_manifest_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw/acme/lights/v1.0.0/sprig.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.fetch_manifest(&lights_repo()).await.unwrap_err() {
        SprigError::PackageNotFound { name } => assert_eq!(name, "acme/lights#v1.0.0"),
        other => panic!("Expected PackageNotFound error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_download_repo_fetches_listed_files() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw/acme/lights/v1.0.0/sprig.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LIGHTS_MANIFEST))
        .mount(&server)
        .await;
    for (file, body) in [
        ("lights.ts", "namespace lights {}"),
        ("README.md", "# lights"),
        ("test.ts", "lights.on()"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/raw/acme/lights/v1.0.0/{}", file)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let files = client.download_repo(&lights_repo()).await.unwrap();

    let names: Vec<&str> = files.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["sprig.json", "lights.ts", "README.md", "test.ts"]);
    assert_eq!(files.get("test.ts").map(String::as_str), Some("lights.on()"));
}

#[tokio::test]
async fn test_download_repo_missing_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/raw/acme/lights/HEAD/sprig.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"name": "lights", "dependencies": {}, "files": ["gone.ts"]}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/acme/lights/HEAD/gone.ts"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let repo = RepoRef::parse("acme/lights").unwrap();
    let err = client.download_repo(&repo).await.unwrap_err();
    assert!(matches!(err, SprigError::MissingFile { .. }));
}

#[tokio::test]
async fn test_download_published() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/scripts/12345-67890/text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "12345-67890",
            "files": {"sprig.json": "{}", "main.ts": "basic.show(1)"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let files = client.download_published("12345-67890").await.unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.contains_key("main.ts"));

    let err = client.download_published("unknown").await.unwrap_err();
    assert!(matches!(err, SprigError::PackageNotFound { .. }));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.repo_exists("acme/flaky").await.unwrap_err();
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/private"))
        .and(header("Authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "full_name": "acme/private",
            "private": true
        })))
        .mount(&server)
        .await;

    let client = RepoClient::with_config(
        Endpoints::single(&server.uri()),
        AuthConfig {
            token: Some("secret".to_string()),
        },
        fast_retry(),
    )
    .unwrap();

    let info = client.repo_info("acme/private").await.unwrap().unwrap();
    assert!(info.private);
}
