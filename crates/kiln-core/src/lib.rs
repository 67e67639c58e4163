#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::uninlined_format_args)]

//! Core types for kiln.
//!
//! Everything the dev server needs that is not HTTP wiring lives here:
//! binding resolution from environment inputs, the error taxonomy, the
//! `BundleProvider` and `UpdateNotifier` capabilities with their default
//! implementations, and the source watcher.
//!
//! Library crates stay quiet: no logging initialization, no process exit.
//! The CLI owns both.

pub mod bundle;
pub mod config;
pub mod error;
pub mod hot;
pub mod watch;

pub use bundle::{BuildConfig, BuildSummary, BundleAsset, BundleProvider, MemoryBundler};
pub use config::{Binding, Env, DEFAULT_HOST, DEFAULT_PORT};
pub use error::Error;
pub use hot::{HotChannel, ModuleUpdate, UpdateEvent, UpdateNotifier};
pub use watch::WatchOptions;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
