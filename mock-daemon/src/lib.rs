use std::sync::Arc;

use axum::{
    extract::{Query, RawQuery, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const VERSION: &str = "1.4.111";

pub const ERR_UNKNOWN_METHOD: i64 = 1;
pub const ERR_MISSING_PARAM: i64 = 100;
pub const ERR_DUPLICATE_FOLDER: i64 = 105;
pub const ERR_NOT_SELECTIVE: i64 = 106;
pub const ERR_BAD_VALUE: i64 = 107;
pub const ERR_INVALID_SECRET: i64 = 201;

#[derive(Clone, Debug, Serialize)]
pub struct Folder {
    pub dir: String,
    pub secret: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub files: u64,
    pub error: i64,
    pub indexing: i64,
    #[serde(skip)]
    pub selective: bool,
    #[serde(skip)]
    pub prefs: Map<String, Value>,
    #[serde(skip)]
    pub hosts: Vec<String>,
    #[serde(skip)]
    pub entries: Vec<FileEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub state: String,
    pub download: u8,
}

#[derive(Debug)]
pub struct DaemonState {
    folders: Vec<Folder>,
    prefs: Map<String, Value>,
    queries: Vec<String>,
}

impl Default for DaemonState {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            prefs: default_prefs(),
            queries: Vec::new(),
        }
    }
}

/// Shared handle to one in-memory daemon. Clones see the same state.
#[derive(Clone, Default)]
pub struct Daemon {
    state: Arc<RwLock<DaemonState>>,
}

impl Daemon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(&self) -> Router {
        Router::new().route("/api", get(api)).with_state(self.clone())
    }

    /// Raw query strings received so far, oldest first.
    pub async fn queries(&self) -> Vec<String> {
        self.state.read().await.queries.clone()
    }

    /// `queries` for callers outside the runtime, e.g. a blocking test thread.
    pub fn queries_blocking(&self) -> Vec<String> {
        self.state.blocking_read().queries.clone()
    }
}

pub fn app() -> Router {
    Daemon::new().router()
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, Daemon::new()).await
}

pub async fn serve(listener: TcpListener, daemon: Daemon) -> Result<(), std::io::Error> {
    axum::serve(listener, daemon.router()).await
}

async fn api(
    State(daemon): State<Daemon>,
    RawQuery(raw): RawQuery,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<Value> {
    let params = Params(pairs);
    let method = params.get("method").unwrap_or_default();
    tracing::info!(method, "handling request");

    let mut state = daemon.state.write().await;
    state.queries.push(raw.unwrap_or_default());
    Json(state.dispatch(method, &params))
}

struct Params(Vec<(String, String)>);

impl Params {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn require(&self, key: &str) -> Result<&str, Value> {
        self.get(key).ok_or_else(|| {
            error_reply(ERR_MISSING_PARAM, &format!("Specify the '{key}' parameter"))
        })
    }

    /// Pairs other than the listed keys, in request order.
    fn rest<'a>(&'a self, skip: &'a [&'a str]) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.0
            .iter()
            .filter(move |(k, _)| !skip.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn error_reply(code: i64, message: &str) -> Value {
    json!({ "error": code, "message": message })
}

fn ok_reply() -> Value {
    json!({ "error": 0 })
}

fn default_prefs() -> Map<String, Value> {
    Map::from_iter([
        ("device_name".to_string(), json!("mock-daemon")),
        ("disk_low_priority".to_string(), json!(1)),
        ("download_limit".to_string(), json!(0)),
        ("folder_rescan_interval".to_string(), json!(600)),
        ("lang".to_string(), json!(-1)),
        ("listening_port".to_string(), json!(44444)),
        ("upload_limit".to_string(), json!(0)),
        ("use_upnp".to_string(), json!(1)),
    ])
}

fn default_folder_prefs() -> Map<String, Value> {
    ["search_lan", "use_dht", "use_hosts", "use_relay_server", "use_sync_trash", "use_tracker"]
        .into_iter()
        .zip([1, 0, 0, 1, 1, 1])
        .map(|(key, on)| (key.to_string(), json!(on)))
        .collect()
}

impl DaemonState {
    fn dispatch(&mut self, method: &str, p: &Params) -> Value {
        let result = match method {
            "get_folders" => Ok(self.get_folders(p.get("secret"))),
            "add_folder" => self.add_folder(p),
            "remove_folder" => self.remove_folder(p),
            "get_files" => self.get_files(p),
            "set_file_prefs" => self.set_file_prefs(p),
            "get_folder_peers" => self.folder_mut(p).map(|_| json!([])),
            "get_secrets" => self.get_secrets(p),
            "get_folder_prefs" => self.folder_mut(p).map(|f| Value::Object(f.prefs.clone())),
            "set_folder_prefs" => self.set_folder_prefs(p),
            "get_folder_hosts" => self.folder_mut(p).map(|f| json!({ "hosts": f.hosts })),
            "set_folder_hosts" => self.set_folder_hosts(p),
            "get_prefs" => Ok(Value::Object(self.prefs.clone())),
            "set_prefs" => Ok(self.set_prefs(p)),
            "get_os" => Ok(json!({ "os": std::env::consts::OS })),
            "get_version" => Ok(json!({ "version": VERSION })),
            "get_speed" => Ok(json!({ "download": 0, "upload": 0 })),
            "shutdown" => Ok(ok_reply()),
            _ => Err(error_reply(ERR_UNKNOWN_METHOD, "Unknown method")),
        };
        result.unwrap_or_else(|err| err)
    }

    fn folder_mut(&mut self, p: &Params) -> Result<&mut Folder, Value> {
        let secret = p.require("secret")?;
        self.folders
            .iter_mut()
            .find(|f| f.secret == secret)
            .ok_or_else(|| error_reply(ERR_INVALID_SECRET, "Invalid secret"))
    }

    fn get_folders(&self, secret: Option<&str>) -> Value {
        let folders: Vec<&Folder> = self
            .folders
            .iter()
            .filter(|f| secret.map_or(true, |s| f.secret == s))
            .collect();
        json!(folders)
    }

    fn add_folder(&mut self, p: &Params) -> Result<Value, Value> {
        let dir = p.require("dir")?;
        let secret = match p.get("secret") {
            Some(s) => s.to_string(),
            None => Uuid::new_v4().simple().to_string().to_uppercase(),
        };
        if self.folders.iter().any(|f| f.secret == secret) {
            return Err(error_reply(ERR_DUPLICATE_FOLDER, "Folder is already added"));
        }
        self.folders.push(Folder {
            dir: dir.to_string(),
            secret,
            kind: "read_write".to_string(),
            size: 0,
            files: 0,
            error: 0,
            indexing: 0,
            selective: p.get("selective_sync") == Some("1"),
            prefs: default_folder_prefs(),
            hosts: Vec::new(),
            entries: Vec::new(),
        });
        Ok(ok_reply())
    }

    fn remove_folder(&mut self, p: &Params) -> Result<Value, Value> {
        let secret = self.folder_mut(p)?.secret.clone();
        self.folders.retain(|f| f.secret != secret);
        Ok(ok_reply())
    }

    fn get_files(&mut self, p: &Params) -> Result<Value, Value> {
        let path = p.get("path");
        let folder = self.folder_mut(p)?;
        let entries: Vec<&FileEntry> = folder
            .entries
            .iter()
            .filter(|e| path.map_or(true, |prefix| e.name.starts_with(prefix)))
            .collect();
        Ok(json!(entries))
    }

    fn set_file_prefs(&mut self, p: &Params) -> Result<Value, Value> {
        let path = p.require("path")?;
        let download = match p.require("download")? {
            "1" => 1,
            "0" => 0,
            _ => return Err(error_reply(ERR_BAD_VALUE, "download must be 0 or 1")),
        };
        let folder = self.folder_mut(p)?;
        if !folder.selective {
            return Err(error_reply(ERR_NOT_SELECTIVE, "Folder is not in selective sync mode"));
        }

        match folder.entries.iter_mut().find(|e| e.name == path) {
            Some(entry) => entry.download = download,
            None => folder.entries.push(FileEntry {
                name: path.to_string(),
                kind: "file".to_string(),
                size: 0,
                state: "created".to_string(),
                download,
            }),
        }
        folder.files = folder.entries.len() as u64;

        let entry: Vec<&FileEntry> = folder.entries.iter().filter(|e| e.name == path).collect();
        Ok(json!(entry))
    }

    fn get_secrets(&mut self, p: &Params) -> Result<Value, Value> {
        let encrypted = p.get("type") == Some("encrypted");
        let folder = self.folder_mut(p)?;
        let mut secrets = json!({
            "read_only": format!("RO{}", folder.secret),
            "read_write": folder.secret,
        });
        if encrypted {
            secrets["encryption"] = json!(format!("EN{}", folder.secret));
        }
        Ok(secrets)
    }

    fn set_folder_prefs(&mut self, p: &Params) -> Result<Value, Value> {
        let mut updates = Vec::new();
        for (key, value) in p.rest(&["method", "secret"]) {
            let n: i64 = value
                .parse()
                .map_err(|_| error_reply(ERR_BAD_VALUE, &format!("'{key}' must be an integer")))?;
            updates.push((key.to_string(), json!(n)));
        }
        let folder = self.folder_mut(p)?;
        folder.prefs.extend(updates);
        Ok(Value::Object(folder.prefs.clone()))
    }

    fn set_folder_hosts(&mut self, p: &Params) -> Result<Value, Value> {
        let hosts: Vec<String> = p
            .require("hosts")?
            .split(',')
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        let folder = self.folder_mut(p)?;
        folder.hosts = hosts;
        Ok(json!({ "hosts": folder.hosts }))
    }

    fn set_prefs(&mut self, p: &Params) -> Value {
        for (key, value) in p.rest(&["method"]) {
            let value = match value.parse::<i64>() {
                Ok(n) => json!(n),
                Err(_) => json!(value),
            };
            self.prefs.insert(key.to_string(), value);
        }
        Value::Object(self.prefs.clone())
    }
}
