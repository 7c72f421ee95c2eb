//! Reply shapes for the daemon API.
//!
//! # Design
//! Each operation knows what the daemon normally answers with, and decodes
//! into that shape when it fits. When it doesn't (the daemon answered with an
//! error object, or a build changed the format) the decoded JSON is returned
//! as-is in `Reply::Raw`; the client never rewrites daemon errors.
//!
//! Shapes only require the fields that identify them. Everything else the
//! daemon sends is kept in `extra`.

use std::ops::Deref;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// A decoded daemon reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// The JSON matched the operation's expected shape.
    Shaped(T),
    /// Valid JSON of some other shape, passed through untouched.
    Raw(Value),
}

impl<T: DeserializeOwned> Reply<T> {
    pub fn from_value(value: Value) -> Self {
        match T::deserialize(&value) {
            Ok(shaped) => Reply::Shaped(shaped),
            Err(_) => Reply::Raw(value),
        }
    }
}

impl<T> Reply<T> {
    pub fn shaped(self) -> Option<T> {
        match self {
            Reply::Shaped(t) => Some(t),
            Reply::Raw(_) => None,
        }
    }

    pub fn as_shaped(&self) -> Option<&T> {
        match self {
            Reply::Shaped(t) => Some(t),
            Reply::Raw(_) => None,
        }
    }

    pub fn raw(&self) -> Option<&Value> {
        match self {
            Reply::Shaped(_) => None,
            Reply::Raw(v) => Some(v),
        }
    }
}

/// Preference dictionary (global or per folder) keyed by preference name.
///
/// Any object is a valid dictionary except one that reads as a daemon error:
/// an `error` key with a `message`, or a non-zero `error` code.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prefs(pub Map<String, Value>);

impl Prefs {
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Prefs {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Prefs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        if let Some(code) = map.get("error") {
            let nonzero = code.as_i64().map_or(true, |n| n != 0);
            if nonzero || map.contains_key("message") {
                return Err(de::Error::custom("daemon error reply"));
            }
        }
        Ok(Prefs(map))
    }
}

/// One synced folder from `get_folders`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Folder {
    pub dir: String,
    pub secret: String,
    /// `type`, `size`, `files`, `indexing`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A file or subfolder inside a synced folder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A peer connected to a folder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Peer {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Secrets shareable under a folder. A read-only secret yields no
/// read-write one; `encryption` only appears when asked for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Secrets {
    pub read_only: String,
    pub read_write: Option<String>,
    pub encryption: Option<String>,
}

/// Predefined hosts of a folder, each `address:port`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Hosts {
    pub hosts: Vec<String>,
}

/// `{"error": code}` acknowledgement used by mutating calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Status {
    pub error: i64,
    pub message: Option<String>,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.error == 0
    }
}

/// Name of the OS the daemon runs on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Os {
    pub os: String,
}

/// Daemon build version string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    pub version: String,
}

/// Current throughput in bytes per second.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Speed {
    pub download: u64,
    pub upload: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matching_shape_is_shaped() {
        let reply: Reply<Speed> = Reply::from_value(json!({"download": 10, "upload": 20}));
        assert_eq!(
            reply.shaped(),
            Some(Speed {
                download: 10,
                upload: 20
            })
        );
    }

    #[test]
    fn error_code_in_place_of_object_is_raw() {
        let value = json!({"error": 201, "message": "Invalid secret"});
        let reply: Reply<Secrets> = Reply::from_value(value.clone());
        assert_eq!(reply.raw(), Some(&value));
        assert!(reply.as_shaped().is_none());
    }

    #[test]
    fn error_object_is_not_prefs() {
        for value in [
            json!({"error": 201, "message": "Invalid secret"}),
            json!({"error": 100}),
            json!({"error": 0, "message": "Specify the 'secret' parameter"}),
        ] {
            let reply: Reply<Prefs> = Reply::from_value(value.clone());
            assert_eq!(reply.raw(), Some(&value));
        }
    }

    #[test]
    fn prefs_accept_any_plain_object() {
        let reply: Reply<Prefs> = Reply::from_value(json!({"use_dht": 1, "device_name": "nas"}));
        let prefs = reply.shaped().unwrap();
        assert_eq!(prefs["use_dht"], 1);
        assert_eq!(prefs.len(), 2);

        let reply: Reply<Prefs> = Reply::from_value(json!({}));
        assert_eq!(reply.shaped(), Some(Prefs::default()));
    }

    #[test]
    fn status_keeps_daemon_error_code() {
        let reply: Reply<Status> =
            Reply::from_value(json!({"error": 105, "message": "Folder already added"}));
        let status = reply.shaped().unwrap();
        assert!(!status.is_ok());
        assert_eq!(status.message.as_deref(), Some("Folder already added"));
    }

    #[test]
    fn folder_keeps_unknown_fields() {
        let reply: Reply<Vec<Folder>> = Reply::from_value(json!([{
            "dir": "/srv/photos",
            "secret": "ABC",
            "type": "read_write",
            "files": 3
        }]));
        let folders = reply.shaped().unwrap();
        assert_eq!(folders[0].dir, "/srv/photos");
        assert_eq!(folders[0].extra["type"], "read_write");
        assert_eq!(folders[0].extra["files"], 3);
    }

    #[test]
    fn read_only_secrets_have_no_read_write() {
        let reply: Reply<Secrets> = Reply::from_value(json!({"read_only": "RO"}));
        let secrets = reply.shaped().unwrap();
        assert_eq!(secrets.read_only, "RO");
        assert!(secrets.read_write.is_none());
        assert!(secrets.encryption.is_none());
    }

    #[test]
    fn scalar_reply_is_raw() {
        let reply: Reply<Hosts> = Reply::from_value(json!(false));
        assert_eq!(reply.raw(), Some(&json!(false)));
    }
}
