//! HTTP transport types and the blocking transport used by default.
//!
//! # Design
//! `HttpRequest` and `HttpResponse` describe a round-trip as plain data. The
//! client builds requests without touching the network and hands them to a
//! `Transport`, so tests can swap the network for a canned reply while
//! production code uses `UreqTransport`.
//!
//! Every daemon call is a GET with all arguments in the query string, so a
//! request is just a path and a `Query`.

use std::time::Duration;

use crate::error::ApiError;
use crate::query::Query;

/// The daemon is local; a connect that takes longer than this has failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A GET request described as plain data.
///
/// Built by `SyncControlClient::build_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub path: String,
    pub query: Query,
}

impl HttpRequest {
    pub fn url(&self) -> String {
        format!("{}?{}", self.path, self.query)
    }
}

/// An HTTP response described as plain data.
///
/// The status is informational: any response that carries a body is handed
/// to the decoder regardless of its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes a single GET and returns whatever came back.
///
/// Implementations must not retry; a failure is reported once as
/// `ApiError::Transport`.
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport over `ureq` with a bounded connect phase and no
/// overall deadline.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        // Daemon error codes arrive with non-2xx statuses on some builds; keep
        // them as data.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(connect_timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(CONNECT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, ApiError> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
