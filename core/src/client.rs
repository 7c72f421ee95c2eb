//! Typed client for the sync daemon's HTTP control API.
//!
//! # Design
//! `SyncControlClient` holds its config, the derived base URL and a
//! `Transport`; nothing changes between calls. Each daemon method is split
//! into a `build_*` method that produces an `HttpRequest` without I/O and an
//! executing method that sends it through `request` and decodes the body into
//! that method's `Reply` shape.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::query::{PrefValue, Query};
use crate::types::{FileEntry, Folder, Hosts, Os, Peer, Prefs, Reply, Secrets, Speed, Status, Version};

/// Blocking, stateless client for one daemon.
#[derive(Debug, Clone)]
pub struct SyncControlClient<T = UreqTransport> {
    config: ClientConfig,
    base_url: String,
    transport: T,
}

impl SyncControlClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::default())
    }

    /// Client for the daemon's stock address, `127.0.0.1:8888`.
    pub fn local() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl<T: Transport> SyncControlClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let base_url = config.base_url();
        Self {
            config,
            base_url,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends one GET with `query` and returns the raw body.
    ///
    /// Any HTTP status counts as an answer; only a failed round-trip is an
    /// error.
    pub fn request(&self, query: Query) -> Result<String, ApiError> {
        self.execute(&self.build(query)).map(|r| r.body)
    }

    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        // The query carries folder secrets; log only the method name.
        let method = req.query.get("method").unwrap_or_default();
        match self.transport.get(&req.url()) {
            Ok(response) => {
                debug!(method, status = response.status, "daemon replied");
                Ok(response)
            }
            Err(e) => {
                warn!(method, error = %e, "daemon request failed");
                Err(e)
            }
        }
    }

    fn build(&self, query: Query) -> HttpRequest {
        HttpRequest {
            path: self.base_url.clone(),
            query,
        }
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_list_folders(&self, secret: Option<&str>) -> HttpRequest {
        self.build(Query::method("get_folders").optional("secret", secret))
    }

    pub fn build_add_folder(&self, dir: &str, secret: Option<&str>, selective: bool) -> HttpRequest {
        self.build(
            Query::method("add_folder")
                .param("dir", dir)
                .optional("secret", secret)
                .flag("selective_sync", selective),
        )
    }

    pub fn build_remove_folder(&self, secret: &str) -> HttpRequest {
        self.build(Query::method("remove_folder").param("secret", secret))
    }

    pub fn build_list_files(&self, secret: &str, path: Option<&str>) -> HttpRequest {
        self.build(
            Query::method("get_files")
                .param("secret", secret)
                .optional("path", path),
        )
    }

    pub fn build_set_file_prefs(&self, secret: &str, path: &str, download: bool) -> HttpRequest {
        self.build(
            Query::method("set_file_prefs")
                .param("secret", secret)
                .param("path", path)
                .flag("download", download),
        )
    }

    pub fn build_list_folder_peers(&self, secret: &str) -> HttpRequest {
        self.build(Query::method("get_folder_peers").param("secret", secret))
    }

    pub fn build_get_secrets(&self, secret: &str, encrypted: bool) -> HttpRequest {
        let query = Query::method("get_secrets").param("secret", secret);
        let query = if encrypted {
            query.param("type", "encrypted")
        } else {
            query
        };
        self.build(query)
    }

    pub fn build_get_folder_prefs(&self, secret: &str) -> HttpRequest {
        self.build(Query::method("get_folder_prefs").param("secret", secret))
    }

    pub fn build_set_folder_prefs<I, K, V>(&self, secret: &str, prefs: I) -> HttpRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PrefValue>,
    {
        self.build(
            Query::method("set_folder_prefs")
                .param("secret", secret)
                .prefs(prefs),
        )
    }

    pub fn build_get_folder_hosts(&self, secret: &str) -> HttpRequest {
        self.build(Query::method("get_folder_hosts").param("secret", secret))
    }

    pub fn build_set_folder_hosts<I, S>(&self, secret: &str, hosts: I) -> HttpRequest
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.build(
            Query::method("set_folder_hosts")
                .param("secret", secret)
                .param("hosts", hosts),
        )
    }

    pub fn build_get_prefs(&self) -> HttpRequest {
        self.build(Query::method("get_prefs"))
    }

    pub fn build_set_prefs<I, K, V>(&self, prefs: I) -> HttpRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PrefValue>,
    {
        self.build(Query::method("set_prefs").prefs(prefs))
    }

    pub fn build_get_os(&self) -> HttpRequest {
        self.build(Query::method("get_os"))
    }

    pub fn build_get_version(&self) -> HttpRequest {
        self.build(Query::method("get_version"))
    }

    pub fn build_get_speed(&self) -> HttpRequest {
        self.build(Query::method("get_speed"))
    }

    pub fn build_shutdown(&self) -> HttpRequest {
        self.build(Query::method("shutdown"))
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// All folders, or the one matching `secret`.
    ///
    /// `None` means the daemon answered with nothing usable (not JSON, or an
    /// empty scalar such as `null` or `false`), which is distinct from an
    /// empty list.
    pub fn list_folders(&self, secret: Option<&str>) -> Result<Option<Reply<Vec<Folder>>>, ApiError> {
        let response = self.execute(&self.build_list_folders(secret))?;
        Ok(decode_listing(&response.body))
    }

    /// Adds an existing directory to sync. The daemon generates a secret when
    /// none is given.
    pub fn add_folder(&self, dir: &str, secret: Option<&str>, selective: bool) -> Result<Reply<Status>, ApiError> {
        self.call(&self.build_add_folder(dir, secret, selective))
    }

    /// Stops syncing a folder. Files on disk are left alone.
    pub fn remove_folder(&self, secret: &str) -> Result<Reply<Status>, ApiError> {
        self.call(&self.build_remove_folder(secret))
    }

    pub fn list_files(&self, secret: &str, path: Option<&str>) -> Result<Reply<Vec<FileEntry>>, ApiError> {
        self.call(&self.build_list_files(secret, path))
    }

    /// Marks a file for download in a selective-sync folder.
    pub fn set_file_prefs(&self, secret: &str, path: &str, download: bool) -> Result<Reply<Vec<FileEntry>>, ApiError> {
        self.call(&self.build_set_file_prefs(secret, path, download))
    }

    pub fn list_folder_peers(&self, secret: &str) -> Result<Reply<Vec<Peer>>, ApiError> {
        self.call(&self.build_list_folder_peers(secret))
    }

    pub fn get_secrets(&self, secret: &str, encrypted: bool) -> Result<Reply<Secrets>, ApiError> {
        self.call(&self.build_get_secrets(secret, encrypted))
    }

    pub fn get_folder_prefs(&self, secret: &str) -> Result<Reply<Prefs>, ApiError> {
        self.call(&self.build_get_folder_prefs(secret))
    }

    pub fn set_folder_prefs<I, K, V>(&self, secret: &str, prefs: I) -> Result<Reply<Prefs>, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PrefValue>,
    {
        self.call(&self.build_set_folder_prefs(secret, prefs))
    }

    pub fn get_folder_hosts(&self, secret: &str) -> Result<Reply<Hosts>, ApiError> {
        self.call(&self.build_get_folder_hosts(secret))
    }

    /// Replaces the folder's predefined hosts.
    pub fn set_folder_hosts<I, S>(&self, secret: &str, hosts: I) -> Result<Reply<Hosts>, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.call(&self.build_set_folder_hosts(secret, hosts))
    }

    pub fn get_prefs(&self) -> Result<Reply<Prefs>, ApiError> {
        self.call(&self.build_get_prefs())
    }

    /// Applies global preferences and returns the daemon's current settings.
    pub fn set_prefs<I, K, V>(&self, prefs: I) -> Result<Reply<Prefs>, ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PrefValue>,
    {
        self.call(&self.build_set_prefs(prefs))
    }

    pub fn get_os(&self) -> Result<Reply<Os>, ApiError> {
        self.call(&self.build_get_os())
    }

    pub fn get_version(&self) -> Result<Reply<Version>, ApiError> {
        self.call(&self.build_get_version())
    }

    pub fn get_speed(&self) -> Result<Reply<Speed>, ApiError> {
        self.call(&self.build_get_speed())
    }

    /// Asks the daemon to stop gracefully.
    pub fn shutdown(&self) -> Result<Reply<Status>, ApiError> {
        self.call(&self.build_shutdown())
    }

    fn call<R: DeserializeOwned>(&self, req: &HttpRequest) -> Result<Reply<R>, ApiError> {
        let response = self.execute(req)?;
        decode(&response.body)
    }
}

/// Decodes a body into `R`'s shape, falling back to the raw JSON.
pub fn decode<R: DeserializeOwned>(body: &str) -> Result<Reply<R>, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(Reply::from_value(value))
}

/// Like `decode`, but a body that is not JSON or decodes to an empty scalar
/// (`null`, `false`, `0`, `""`, `"0"`) is `None`. `[]` stays an empty list.
pub fn decode_listing<R: DeserializeOwned>(body: &str) -> Option<Reply<R>> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    if is_empty_scalar(&value) {
        return None;
    }
    Some(Reply::from_value(value))
}

fn is_empty_scalar(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(_) | Value::Object(_) => false,
    }
}
