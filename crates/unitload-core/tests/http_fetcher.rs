//! Integration tests for HttpFetcher.
//!
//! Uses wiremock for HTTP mocking. Tests cover unit fetches, status mapping
//! (404/500/empty body), manifest loading and a full load over HTTP.

use std::sync::Arc;

use unitload_core::{
    load, CompletionNotifier, HttpFetcher, LoadSession, LoaderConfig, LoaderError, PathRewrite,
    RecordingEnvironment, UnitFetcher, LOADER_USER_AGENT,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_fetcher(mock_server: &MockServer) -> HttpFetcher {
    let config = LoaderConfig::default().with_base_url(mock_server.uri());
    HttpFetcher::new(&config).expect("failed to create fetcher")
}

async fn serve(mock_server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_fetch_unit_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/src/os/ui/app.js"))
        .and(header("user-agent", LOADER_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("var app = {};"))
        .mount(&mock_server)
        .await;

    let fetcher = create_test_fetcher(&mock_server);
    let content = fetcher.fetch("src/os/ui/app.js").await.expect("fetch failed");

    assert_eq!(content, "var app = {};");
}

#[tokio::test]
async fn test_fetch_unit_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let fetcher = create_test_fetcher(&mock_server);
    let err = fetcher.fetch("missing.js").await.unwrap_err();

    match err {
        LoaderError::Fetch {
            identifier,
            status,
            cause,
        } => {
            assert_eq!(identifier, "missing.js");
            assert_eq!(status, Some(404));
            assert_eq!(cause, "HTTP 404");
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_unit_server_error_keeps_body_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/x.js"))
        .respond_with(ResponseTemplate::new(500).set_body_string("compiler crashed"))
        .mount(&mock_server)
        .await;

    let fetcher = create_test_fetcher(&mock_server);
    let err = fetcher.fetch("x.js").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("compiler crashed"), "got: {err}");
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_fetch_unit_empty_body_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty.js"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let fetcher = create_test_fetcher(&mock_server);
    let err = fetcher.fetch("empty.js").await.unwrap_err();

    match err {
        LoaderError::Fetch { status, cause, .. } => {
            assert_eq!(status, Some(200));
            assert_eq!(cause, "empty/unexpected response");
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_manifest_failure_is_manifest_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/.build/gcc-manifest.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let fetcher = Arc::new(create_test_fetcher(&mock_server));
    let mut config = LoaderConfig::default()
        .with_base_url(mock_server.uri())
        .with_manifest(".build/gcc-manifest.json");
    let err = LoadSession::open(&mut config, fetcher).await.unwrap_err();

    assert!(matches!(err, LoaderError::Manifest { status: Some(503), .. }));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_manifest_not_an_array_is_rejected() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/manifest.json", r#"["a.js", 7]"#).await;

    let fetcher = Arc::new(create_test_fetcher(&mock_server));
    let mut config = LoaderConfig::default().with_manifest("manifest.json");
    let err = LoadSession::open(&mut config, fetcher).await.unwrap_err();

    assert!(err.to_string().contains("entry 1"), "got: {err}");
}

#[tokio::test]
async fn test_end_to_end_load_over_http() {
    let mock_server = MockServer::start().await;

    serve(
        &mock_server,
        "/.build/gcc-manifest.json",
        r#"["/work/opensphere/src/a.js", "/work/opensphere/src/mod.js", "/work/opensphere/src/b.js"]"#,
    )
    .await;
    serve(&mock_server, "/base/src/a.js", "var a = 1;").await;
    serve(
        &mock_server,
        "/base/src/mod.js",
        "goog.module('os.mod');\ngoog.module.declareLegacyNamespace();\n",
    )
    .await;
    serve(&mock_server, "/base/src/b.js", "var b = 2;").await;

    let mut config = LoaderConfig::default()
        .with_base_url(mock_server.uri())
        .with_manifest(".build/gcc-manifest.json")
        .with_concurrency_limit(2)
        .with_path_rewrite(PathRewrite::rebase("/work/opensphere").with_prepend("base/"));
    let fetcher = Arc::new(HttpFetcher::new(&config).expect("failed to create fetcher"));
    let mut env = RecordingEnvironment::new();

    let report = load(&mut config, fetcher, &mut env, CompletionNotifier::detached())
        .await
        .expect("load failed");

    let expected = vec!["base/src/a.js", "base/src/mod.js", "base/src/b.js"];
    assert_eq!(report.insertion_order, expected);
    assert_eq!(env.inserted(), expected);
    assert!(env.modules().contains("os.mod"));
    assert!(env.namespace_table().get("os.mod").is_some());
    assert!(report.peak_in_flight <= 2);
}

#[tokio::test]
async fn test_failed_unit_stops_further_requests() {
    let mock_server = MockServer::start().await;

    serve(&mock_server, "/manifest.json", r#"["x.js", "y.mod.js"]"#).await;
    Mock::given(method("GET"))
        .and(path("/x.js"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y.mod.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("export const y = 1;"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = LoaderConfig::default()
        .with_base_url(mock_server.uri())
        .with_manifest("manifest.json")
        .with_concurrency_limit(1);
    let fetcher = Arc::new(create_test_fetcher(&mock_server));
    let mut env = RecordingEnvironment::new();

    let err = load(&mut config, fetcher, &mut env, CompletionNotifier::detached())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(env.events().is_empty());
    mock_server.verify().await;
}
