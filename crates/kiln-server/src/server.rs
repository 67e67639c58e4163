//! Application assembly, bind, and readiness reporting.

use crate::routes::{self, HotState};
use axum::routing::get;
use axum::Router;
use kiln_core::hot::{HOT_CLIENT_PATH, HOT_SOCKET_PATH};
use kiln_core::{Binding, BundleProvider, Error, UpdateNotifier};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Server configuration, derived from the resolved binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub binding: Binding,
    /// Logical URL root under which the in-memory output is addressed.
    pub content_base: String,
    /// Suppress per-request logging.
    pub quiet: bool,
    /// Mount the hot-update layer.
    pub hot: bool,
}

impl ServerConfig {
    #[must_use]
    pub fn new(binding: Binding) -> Self {
        Self {
            content_base: binding.content_base(),
            binding,
            quiet: true,
            hot: true,
        }
    }

    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    #[must_use]
    pub fn with_hot(mut self, hot: bool) -> Self {
        self.hot = hot;
        self
    }
}

/// Handle to a running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    join: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// The address the listener actually bound.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Block until the accept loop ends.
    pub async fn wait(self) {
        let _ = self.join.await;
    }

    /// Abort the accept loop.
    pub fn stop(&self) {
        self.join.abort();
    }
}

/// Assemble the application. Layer order is fixed: the bundle layer is
/// mounted before the hot-update layer, and the CORS layer wraps the
/// whole application so every response carries it.
pub fn router(
    config: &ServerConfig,
    provider: Arc<dyn BundleProvider>,
    notifier: Arc<dyn UpdateNotifier>,
) -> Router {
    let public_path = config_nest_path(provider.public_path());

    let bundle = Router::new()
        .route("/*path", get(routes::serve_asset))
        .with_state(provider);

    // axum does not support nesting at the root.
    let mut app = if public_path == "/" {
        bundle
    } else {
        Router::new().nest(&public_path, bundle)
    };

    if config.hot {
        let hot_state = HotState {
            notifier,
            port: config.binding.port,
        };
        let hot = Router::new()
            .route(HOT_SOCKET_PATH, get(routes::hot_socket))
            .route(HOT_CLIENT_PATH, get(routes::hot_client))
            .with_state(hot_state);
        app = app.merge(hot);
    }

    if !config.quiet {
        app = app.layer(axum::middleware::from_fn(routes::log_request));
    }

    app.layer(routes::cors_layer())
}

/// Bind the resolved address, log readiness, and spawn the accept loop.
///
/// A bind failure surfaces as [`Error::Bind`]; the caller decides process
/// fate — the server never keeps a non-listening process alive.
pub async fn serve(
    config: ServerConfig,
    provider: Arc<dyn BundleProvider>,
    notifier: Arc<dyn UpdateNotifier>,
) -> Result<ServerHandle, Error> {
    let addr = config.binding.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;

    // The hot client runtime embeds the port, so assemble the router from
    // the port the listener actually bound.
    let mut config = config;
    config.binding.port = local_addr.port();
    let app = router(&config, provider, notifier);

    info!("dev server listening on port {}", local_addr.port());

    let join = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "dev server terminated");
        }
    });

    Ok(ServerHandle { local_addr, join })
}

/// axum nest paths must not end with `/`.
fn config_nest_path(public_path: &str) -> String {
    let trimmed = public_path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
