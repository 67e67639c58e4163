//! `kiln serve` command implementation.
//!
//! The bootstrap sequence: capture environment, resolve the binding,
//! build the artifact eagerly, start the watcher, then listen. Order
//! matters on the HTTP side — the bundle layer is mounted before the
//! hot-update layer.

use kiln_core::watch::{self, WatchOptions};
use kiln_core::{
    Binding, BuildConfig, BundleProvider, Env, HotChannel, MemoryBundler, UpdateNotifier,
};
use kiln_server::{serve, ServerConfig};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Serve action.
#[derive(Debug, Clone)]
pub struct ServeAction {
    /// Project root.
    pub cwd: PathBuf,
    /// Entry chunk, relative to the root.
    pub entry: PathBuf,
    /// URL prefix for bundled assets.
    pub public_path: String,
    /// Output name of the main chunk.
    pub output_name: String,
    /// Static assets directory, relative to the root.
    pub assets_dir: Option<PathBuf>,
    /// Enable hot reload.
    pub hot: bool,
    /// Suppress per-request logging.
    pub quiet: bool,
    /// Resolve and print the binding without starting the server.
    pub dry_run: bool,
    /// Machine-readable output.
    pub json: bool,
}

/// Run the dev server.
pub async fn run(action: ServeAction) -> Result<()> {
    // The one place the process environment is read.
    let env = Env::capture();
    let binding = Binding::resolve(&env).into_diagnostic()?;

    if action.dry_run {
        if action.json {
            println!(
                "{}",
                serde_json::json!({ "host": binding.host, "port": binding.port })
            );
        } else {
            println!("  Would listen on {}:{}", binding.host, binding.port);
        }
        return Ok(());
    }

    let config = BuildConfig::new(action.cwd.clone(), action.entry)
        .with_public_path(action.public_path)
        .with_output_name(action.output_name)
        .with_assets_dir(action.assets_dir.clone())
        .with_hot(action.hot);

    let provider: Arc<dyn BundleProvider> = Arc::new(MemoryBundler::new(config));

    // Eager build: the artifact exists before the first request.
    let summary = provider.build().into_diagnostic()?;
    info!(
        assets = summary.assets,
        bytes = summary.total_bytes,
        elapsed_ms = summary.elapsed_ms,
        "initial build complete"
    );

    let notifier: Arc<dyn UpdateNotifier> = Arc::new(HotChannel::default());

    if action.hot {
        let options = WatchOptions::new(action.cwd).with_assets_dir(action.assets_dir);
        watch::spawn(options, provider.clone(), notifier.clone());
    }

    let server_config = ServerConfig::new(binding)
        .with_hot(action.hot)
        .with_quiet(action.quiet);

    let handle = serve(server_config, provider, notifier)
        .await
        .into_diagnostic()?;
    handle.wait().await;

    Ok(())
}
