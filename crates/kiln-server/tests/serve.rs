//! Integration tests for the dev server: in-memory serving, CORS on every
//! response, hot layer wiring, and bind failure reporting.

use kiln_core::hot::HOT_CLIENT_PATH;
use kiln_core::{
    Binding, BuildConfig, BundleProvider, Error, HotChannel, MemoryBundler, UpdateNotifier,
};
use kiln_server::{serve, ServerConfig, ServerHandle};
use std::path::PathBuf;
use std::sync::Arc;

struct TestServer {
    handle: ServerHandle,
    // Held so the project files outlive the server.
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.handle.port(), path)
    }
}

async fn start(hot: bool) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("index.js"), "console.log('Hello, world!');").unwrap();

    let config = BuildConfig::new(dir.path().to_path_buf(), PathBuf::from("src/index.js"))
        .with_hot(hot);
    let provider: Arc<dyn BundleProvider> = Arc::new(MemoryBundler::new(config));
    provider.build().unwrap();

    let notifier: Arc<dyn UpdateNotifier> = Arc::new(HotChannel::default());

    let binding = Binding {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let handle = serve(ServerConfig::new(binding).with_hot(hot), provider, notifier)
        .await
        .unwrap();

    TestServer { handle, _dir: dir }
}

#[tokio::test]
async fn test_serves_bundle_from_memory() {
    let server = start(false).await;

    let response = reqwest::get(server.url("/static/bundle.js")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/javascript"
    );
    assert!(response.headers().contains_key("etag"));
    assert_eq!(
        response.text().await.unwrap(),
        "console.log('Hello, world!');\n"
    );
}

#[tokio::test]
async fn test_every_response_carries_cors_header() {
    let server = start(true).await;

    for path in ["/static/bundle.js", "/static/missing.js", "/", HOT_CLIENT_PATH] {
        let response = reqwest::get(server.url(path)).await.unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"]
                .to_str()
                .unwrap(),
            "*",
            "missing CORS header on {path}"
        );
    }
}

#[tokio::test]
async fn test_unknown_asset_is_404() {
    let server = start(false).await;

    let response = reqwest::get(server.url("/static/missing.js")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_no_routes_outside_the_two_layers() {
    let server = start(true).await;

    let response = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hot_entry_chunk_imports_client() {
    let server = start(true).await;

    let body = reqwest::get(server.url("/static/bundle.js"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.starts_with(&format!("import \"{HOT_CLIENT_PATH}\";")));
}

#[tokio::test]
async fn test_hot_client_runtime_served() {
    let server = start(true).await;

    let response = reqwest::get(server.url(HOT_CLIENT_PATH)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/javascript"
    );

    let body = response.text().await.unwrap();
    assert!(body.contains(&server.handle.port().to_string()));
}

#[tokio::test]
async fn test_hot_disabled_unmounts_hot_layer() {
    let server = start(false).await;

    let response = reqwest::get(server.url(HOT_CLIENT_PATH)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_occupied_port_is_bind_error() {
    let server = start(false).await;
    let port = server.handle.port();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.js"), "1;").unwrap();
    let provider: Arc<dyn BundleProvider> = Arc::new(MemoryBundler::new(BuildConfig::new(
        dir.path().to_path_buf(),
        PathBuf::from("a.js"),
    )));
    provider.build().unwrap();
    let notifier: Arc<dyn UpdateNotifier> = Arc::new(HotChannel::default());

    let binding = Binding {
        host: "127.0.0.1".to_string(),
        port,
    };
    let err = serve(ServerConfig::new(binding), provider, notifier)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Bind { .. }));
}
