//! Source watching.
//!
//! A dedicated thread runs the notify watcher and batches changes through
//! a debounce window; an async task rebuilds the artifact and pushes the
//! matching event through the notifier. Watcher errors are logged, never
//! fatal to the server.

use crate::bundle::BundleProvider;
use crate::error::Error;
use crate::hot::{ModuleUpdate, UpdateEvent, UpdateNotifier};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory watched recursively.
    pub root: PathBuf,
    /// Static assets directory (relative to the root), when configured.
    /// Changes confined to it are pushed as per-asset updates instead of a
    /// full reload.
    pub assets_dir: Option<PathBuf>,
    /// Debounce window for coalescing bursts of change events.
    pub debounce: Duration,
}

impl WatchOptions {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            assets_dir: None,
            debounce: Duration::from_millis(50),
        }
    }

    #[must_use]
    pub fn with_assets_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.assets_dir = dir;
        self
    }
}

/// Check if a path should be ignored by the watcher.
#[must_use]
pub fn should_ignore(path: &Path) -> bool {
    let path_str = path.to_string_lossy();

    if path_str.contains("/node_modules/")
        || path_str.contains("/target/")
        || path_str.contains("/.git/")
        || path_str.contains("/dist/")
        || path_str.contains("/build/")
    {
        return true;
    }

    if let Some(name) = path.file_name() {
        if name.to_string_lossy().starts_with('.') {
            return true;
        }
    }

    false
}

/// Start watching. Spawns the watcher thread and the rebuild task; both
/// run until the process exits. Must be called from within a tokio
/// runtime.
pub fn spawn(
    options: WatchOptions,
    provider: Arc<dyn BundleProvider>,
    notifier: Arc<dyn UpdateNotifier>,
) {
    let (change_tx, mut change_rx) = mpsc::channel::<Vec<PathBuf>>(16);

    let root = options.root.clone();
    let debounce = options.debounce;
    std::thread::spawn(move || {
        if let Err(e) = watch_files(root, change_tx, debounce) {
            warn!(error = %e, "file watcher stopped");
        }
    });

    let assets_base = options.assets_dir.map(|d| options.root.join(d));
    tokio::spawn(async move {
        while let Some(changed) = change_rx.recv().await {
            handle_changes(&changed, assets_base.as_deref(), &*provider, &*notifier);
        }
    });
}

/// Watch files, sending debounced change batches until the receiver goes
/// away.
fn watch_files(
    root: PathBuf,
    change_tx: mpsc::Sender<Vec<PathBuf>>,
    debounce: Duration,
) -> Result<(), Error> {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    let mut debounce_set: HashSet<PathBuf> = HashSet::new();
    let mut last_change = Instant::now();

    loop {
        match rx.recv() {
            Ok(Ok(event)) => {
                for path in event.paths {
                    if !should_ignore(&path) {
                        debounce_set.insert(path);
                    }
                }

                let now = Instant::now();
                if now.duration_since(last_change) < debounce {
                    continue;
                }

                if debounce_set.is_empty() {
                    continue;
                }

                let changed: Vec<PathBuf> = debounce_set.drain().collect();
                last_change = now;

                if change_tx.blocking_send(changed).is_err() {
                    break;
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "watch error");
            }
            Err(_) => break,
        }
    }

    Ok(())
}

/// Rebuild after a change batch and push the matching event.
fn handle_changes(
    changed: &[PathBuf],
    assets_base: Option<&Path>,
    provider: &dyn BundleProvider,
    notifier: &dyn UpdateNotifier,
) {
    for path in changed {
        debug!(path = %path.display(), "source changed");
    }

    match provider.build() {
        Ok(summary) => {
            debug!(assets = summary.assets, "rebuilt after change");
            notifier.notify(change_event(changed, assets_base, provider.public_path()));
        }
        Err(e) => {
            warn!(error = %e, "rebuild failed");
            notifier.notify(UpdateEvent::BuildError {
                message: e.to_string(),
            });
        }
    }
}

/// Per-asset updates when the batch is confined to the static assets
/// directory, full reload otherwise. The main chunk has no update
/// granularity: any source change means reload.
fn change_event(
    changed: &[PathBuf],
    assets_base: Option<&Path>,
    public_path: &str,
) -> UpdateEvent {
    let Some(base) = assets_base else {
        return UpdateEvent::Reload;
    };

    let timestamp = now_ms();
    let mut updates = Vec::new();
    for path in changed {
        let Ok(rel) = path.strip_prefix(base) else {
            return UpdateEvent::Reload;
        };
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        updates.push(ModuleUpdate {
            module: format!("{public_path}{key}"),
            timestamp,
        });
    }

    if updates.is_empty() {
        UpdateEvent::Reload
    } else {
        UpdateEvent::Update { updates }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_vendored_and_output_dirs() {
        assert!(should_ignore(Path::new("/p/node_modules/react/index.js")));
        assert!(should_ignore(Path::new("/p/target/debug/kiln")));
        assert!(should_ignore(Path::new("/p/.git/HEAD")));
        assert!(should_ignore(Path::new("/p/dist/bundle.js")));
        assert!(should_ignore(Path::new("/p/build/out.js")));
    }

    #[test]
    fn test_ignores_dotfiles() {
        assert!(should_ignore(Path::new("/p/src/.index.js.swp")));
        assert!(!should_ignore(Path::new("/p/src/index.js")));
    }

    #[test]
    fn test_asset_only_batch_is_update() {
        let base = Path::new("/p/assets");
        let changed = vec![PathBuf::from("/p/assets/img/logo.svg")];

        let event = change_event(&changed, Some(base), "/static/");
        match event {
            UpdateEvent::Update { updates } => {
                assert_eq!(updates.len(), 1);
                assert_eq!(updates[0].module, "/static/img/logo.svg");
            }
            _ => panic!("expected per-asset update"),
        }
    }

    #[test]
    fn test_source_change_is_reload() {
        let base = Path::new("/p/assets");
        let changed = vec![
            PathBuf::from("/p/assets/site.css"),
            PathBuf::from("/p/src/index.js"),
        ];

        let event = change_event(&changed, Some(base), "/static/");
        assert!(matches!(event, UpdateEvent::Reload));
    }

    #[test]
    fn test_no_assets_dir_is_reload() {
        let changed = vec![PathBuf::from("/p/src/index.js")];
        let event = change_event(&changed, None, "/static/");
        assert!(matches!(event, UpdateEvent::Reload));
    }
}
