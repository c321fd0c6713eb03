use axum::Router;
use tokio::net::TcpListener;

use crate::routes::{build_router, InnerAppState};

/// Build a test router with empty stores and no anon key.
pub fn test_router() -> Router {
    build_router(InnerAppState::new(None))
}

/// Build a test router that requires an anon key, returning (router, anon_key).
pub fn test_router_with_anon_key() -> (Router, String) {
    let anon_key = crate::auth::generate_token("anon_");
    let router = build_router(InnerAppState::new(Some(anon_key.clone())));
    (router, anon_key)
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    pub anon_key: Option<String>,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn an axum test server on a random port. Returns the TestServer
/// with the `base_url` (e.g. "http://127.0.0.1:12345").
pub async fn spawn_test_server() -> TestServer {
    spawn(None).await
}

/// Like [`spawn_test_server`], but the server demands a freshly generated anon key.
pub async fn spawn_test_server_with_anon_key() -> TestServer {
    spawn(Some(crate::auth::generate_token("anon_"))).await
}

async fn spawn(anon_key: Option<String>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let app = build_router(InnerAppState::new(anon_key.clone()));
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url,
        anon_key,
        _handle: handle,
    }
}
