//! In-memory bundle building.
//!
//! [`BundleProvider`] is the capability the server consumes: it knows its
//! public path, hands out assets from the current in-memory artifact, and
//! can rebuild that artifact. [`MemoryBundler`] is the default provider —
//! a deliberately thin whole-artifact builder that merges the configured
//! entry chunks into one output and keeps everything in memory. Module
//! resolution and incremental rebuilds are out of scope.

use crate::error::Error;
use crate::hot::HOT_CLIENT_PATH;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Instant;
use tracing::debug;
use walkdir::WalkDir;

/// Static build configuration. Supplied once, read-only after construction.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root all relative paths resolve against.
    pub root: PathBuf,
    /// Entry chunks, relative to the root, merged in order into the output.
    pub entries: Vec<PathBuf>,
    /// Output name of the main chunk.
    pub output_name: String,
    /// URL prefix clients use to request bundled assets.
    pub public_path: String,
    /// Optional directory of static assets loaded into the artifact.
    pub assets_dir: Option<PathBuf>,
    /// Inject the hot client import at the top of the main chunk.
    pub hot: bool,
}

impl BuildConfig {
    /// Create a config with the given root and a single entry chunk.
    #[must_use]
    pub fn new(root: PathBuf, entry: PathBuf) -> Self {
        Self {
            root,
            entries: vec![entry],
            output_name: "bundle.js".to_string(),
            public_path: "/static/".to_string(),
            assets_dir: None,
            hot: true,
        }
    }

    /// Set the output name of the main chunk.
    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Set the URL prefix for bundled assets. Normalized to `/prefix/` form.
    #[must_use]
    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        let mut p = public_path.into();
        if !p.starts_with('/') {
            p.insert(0, '/');
        }
        if !p.ends_with('/') {
            p.push('/');
        }
        self.public_path = p;
        self
    }

    /// Set the static assets directory.
    #[must_use]
    pub fn with_assets_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.assets_dir = dir;
        self
    }

    /// Enable or disable hot client injection.
    #[must_use]
    pub fn with_hot(mut self, hot: bool) -> Self {
        self.hot = hot;
        self
    }
}

/// One asset of the in-memory artifact.
#[derive(Debug, Clone)]
pub struct BundleAsset {
    pub body: Bytes,
    pub content_type: &'static str,
    /// Content hash, served as `ETag`.
    pub hash: String,
}

/// Result of one build pass.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub assets: usize,
    pub total_bytes: usize,
    pub elapsed_ms: u128,
}

/// Capability: serves the current build output and knows its public path.
pub trait BundleProvider: Send + Sync {
    /// URL prefix clients use to request bundled assets.
    fn public_path(&self) -> &str;

    /// Look up an asset by its path relative to the public path
    /// (no leading slash, e.g. `bundle.js`).
    fn asset(&self, path: &str) -> Option<BundleAsset>;

    /// (Re)build the in-memory artifact.
    fn build(&self) -> Result<BuildSummary, Error>;
}

/// Default provider: merges entry chunks into one in-memory output.
pub struct MemoryBundler {
    config: BuildConfig,
    artifact: RwLock<HashMap<String, BundleAsset>>,
}

impl MemoryBundler {
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            artifact: RwLock::new(HashMap::new()),
        }
    }

    /// The build configuration this bundler was constructed from.
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    fn build_main_chunk(&self) -> Result<BundleAsset, Error> {
        let mut code = String::new();

        if self.config.hot {
            // Inline client injection: the served chunk pulls in the hot
            // runtime before any application code runs.
            code.push_str(&format!("import \"{HOT_CLIENT_PATH}\";\n"));
        }

        for entry in &self.config.entries {
            let path = self.config.root.join(entry);
            let source = std::fs::read_to_string(&path).map_err(|e| Error::Build {
                path: path.clone(),
                message: e.to_string(),
            })?;
            code.push_str(&source);
            if !source.ends_with('\n') {
                code.push('\n');
            }
        }

        Ok(make_asset(Bytes::from(code), "application/javascript"))
    }

    fn collect_static_assets(&self, artifact: &mut HashMap<String, BundleAsset>) {
        let Some(assets_dir) = &self.config.assets_dir else {
            return;
        };

        let base = self.config.root.join(assets_dir);
        for dir_entry in WalkDir::new(&base).into_iter().filter_map(Result::ok) {
            if !dir_entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = dir_entry.path().strip_prefix(&base) else {
                continue;
            };
            let Ok(body) = std::fs::read(dir_entry.path()) else {
                debug!(path = %dir_entry.path().display(), "skipping unreadable asset");
                continue;
            };

            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let content_type = content_type_for(&key);
            artifact.insert(key, make_asset(Bytes::from(body), content_type));
        }
    }
}

impl BundleProvider for MemoryBundler {
    fn public_path(&self) -> &str {
        &self.config.public_path
    }

    fn asset(&self, path: &str) -> Option<BundleAsset> {
        self.artifact
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    fn build(&self) -> Result<BuildSummary, Error> {
        let started = Instant::now();

        let mut next = HashMap::new();
        next.insert(self.config.output_name.clone(), self.build_main_chunk()?);
        self.collect_static_assets(&mut next);

        let assets = next.len();
        let total_bytes = next.values().map(|a| a.body.len()).sum();

        // Swap wholesale: readers see the old artifact or the new one,
        // never a partial build.
        *self
            .artifact
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = next;

        let summary = BuildSummary {
            assets,
            total_bytes,
            elapsed_ms: started.elapsed().as_millis(),
        };
        debug!(
            assets = summary.assets,
            bytes = summary.total_bytes,
            elapsed_ms = summary.elapsed_ms,
            "built in-memory artifact"
        );
        Ok(summary)
    }
}

fn make_asset(body: Bytes, content_type: &'static str) -> BundleAsset {
    let hash = blake3::hash(&body).to_hex().to_string();
    BundleAsset {
        body,
        content_type,
        hash,
    }
}

/// Content type by file extension.
fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "js" | "mjs" | "cjs" => "application/javascript",
        "css" => "text/css",
        "html" => "text/html",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
