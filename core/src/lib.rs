//! Blocking client for a file-sync daemon's local HTTP control API.
//!
//! # Overview
//! The daemon exposes every operation as `GET /api?method=<name>&...` and
//! answers with JSON whose shape depends on the method. `SyncControlClient`
//! builds those query strings, sends them, and decodes each answer into the
//! shape that method normally returns.
//!
//! # Design
//! - `SyncControlClient` is stateless apart from its `ClientConfig`.
//! - Each operation has a pure `build_*` (produces an `HttpRequest`) next to
//!   the method that executes it, so query construction is testable without
//!   a daemon.
//! - I/O goes through the `Transport` trait; `UreqTransport` is the default.
//! - Daemon-reported errors are data (`Reply::Raw`, `Status`), not `ApiError`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod types;

pub use client::SyncControlClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use query::{PrefValue, Query};
pub use types::{FileEntry, Folder, Hosts, Os, Peer, Prefs, Reply, Secrets, Speed, Status, Version};
