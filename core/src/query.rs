//! Ordered query-string builder shared by every daemon operation.
//!
//! # Design
//! The daemon takes all arguments as GET query parameters. `Query` keeps the
//! pairs in insertion order (some daemon methods are sensitive to it) and never
//! merges or drops duplicates. Lists of preferences become one pair each, and
//! the final string is a plain join over the pairs, so an empty preference set
//! cannot leave a dangling separator behind.

use std::fmt;

/// A single preference value as the daemon expects it on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    /// Sent as `1` or `0`.
    Bool(bool),
    Int(i64),
    /// Sent verbatim, e.g. `device_name`.
    Text(String),
}

impl PrefValue {
    pub fn to_param(&self) -> String {
        match self {
            PrefValue::Bool(b) => u8::from(*b).to_string(),
            PrefValue::Int(n) => n.to_string(),
            PrefValue::Text(s) => s.clone(),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        PrefValue::Bool(value)
    }
}

impl From<i64> for PrefValue {
    fn from(value: i64) -> Self {
        PrefValue::Int(value)
    }
}

impl From<i32> for PrefValue {
    fn from(value: i32) -> Self {
        PrefValue::Int(value.into())
    }
}

impl From<u32> for PrefValue {
    fn from(value: u32) -> Self {
        PrefValue::Int(value.into())
    }
}

impl From<u16> for PrefValue {
    fn from(value: u16) -> Self {
        PrefValue::Int(value.into())
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        PrefValue::Text(value.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        PrefValue::Text(value)
    }
}

/// Ordered `key=value` pairs for one API call, starting with `method`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn method(name: &str) -> Self {
        Self::default().param("method", name)
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.pairs.push((key.to_string(), value.into()));
        self
    }

    /// Appends the pair only when `value` is present.
    pub fn optional(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn flag(self, key: &str, value: bool) -> Self {
        self.param(key, PrefValue::Bool(value).to_param())
    }

    /// Appends one pair per preference, in iteration order.
    pub fn prefs<I, K, V>(mut self, prefs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PrefValue>,
    {
        for (key, value) in prefs {
            self.pairs.push((key.into(), value.into().to_param()));
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
