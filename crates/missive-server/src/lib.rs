//! Local template preview server with hot reload.
//!
//! Serves the registry over HTTP: an index of templates, rendered previews
//! with sample props, and raw template source. A file watcher on the
//! template directory rebuilds the registry and reloads connected browsers
//! over WebSocket.

pub mod reload;
pub mod server;
pub mod watcher;

pub use reload::{ReloadHub, ReloadMessage};
pub use server::{PreviewConfig, PreviewServer, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
