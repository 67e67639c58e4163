//! Route handlers for the bundle and hot-update layers.

use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path as AxumPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kiln_core::hot::{client_runtime, UpdateEvent};
use kiln_core::{BundleProvider, UpdateNotifier};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

/// State for the hot-update layer.
#[derive(Clone)]
pub(crate) struct HotState {
    pub notifier: Arc<dyn UpdateNotifier>,
    /// Port embedded into the client runtime.
    pub port: u16,
}

/// Unrestricted cross-origin access on every response.
pub(crate) fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Per-request logging, mounted only when the server is not quiet.
pub(crate) async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    debug!(%method, %uri, status = %response.status(), "request");
    response
}

/// Serve an asset of the in-memory artifact.
pub(crate) async fn serve_asset(
    State(provider): State<Arc<dyn BundleProvider>>,
    AxumPath(path): AxumPath<String>,
) -> Response {
    match provider.asset(&path) {
        Some(asset) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", asset.content_type)
            .header("Cache-Control", "no-cache")
            .header("ETag", format!("\"{}\"", asset.hash))
            .body(Body::from(asset.body))
            .unwrap(),
        None => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from(format!("Not found: {path}")))
            .unwrap(),
    }
}

/// Serve the hot client runtime.
pub(crate) async fn hot_client(State(state): State<HotState>) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/javascript")
        .header("Cache-Control", "no-cache")
        .body(Body::from(client_runtime(state.port)))
        .unwrap()
}

/// Upgrade to the hot-update WebSocket.
pub(crate) async fn hot_socket(
    ws: WebSocketUpgrade,
    State(state): State<HotState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_hot_socket(socket, state))
}

/// Relay broadcast events to one client until either side goes away.
async fn handle_hot_socket(mut socket: WebSocket, state: HotState) {
    let mut rx = state.notifier.subscribe();

    let _ = socket
        .send(Message::Text(UpdateEvent::Connected.to_json()))
        .await;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if socket.send(Message::Text(event.to_json())).await.is_err() {
                        break;
                    }
                }
                // A lagged client just misses events; the next one reloads it.
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                // Clients send nothing the server acts on.
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}
