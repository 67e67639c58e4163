#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

//! Development HTTP server for kiln.
//!
//! Assembles two layers onto an axum application, in fixed order: the
//! bundle layer (in-memory assets under the provider's public path) and
//! the hot-update layer (WebSocket relay plus the client runtime). Every
//! response carries the unrestricted CORS header.
//!
//! The server owns no policy: the binding, the provider, and the notifier
//! are all passed in by the caller.

mod routes;
mod server;

pub use server::{router, serve, ServerConfig, ServerHandle};
