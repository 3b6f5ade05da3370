//! CGI-style variable mappings.
//!
//! The flat, uppercase, `_`-separated variable set is the lingua franca of
//! gateway protocols; [`Vars`] is this crate's typed rendition of it. Values
//! are strings except for the `*_PORT` fields, which are integers, so the
//! value type is a two-variant enum rather than a bare string.

use std::fmt;

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

/// Well-known variable names this crate reads or produces.
pub mod names {
    // Request line and entity.
    pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
    pub const REQUEST_URI: &str = "REQUEST_URI";
    pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";
    pub const HTTP_HOST: &str = "HTTP_HOST";
    pub const HTTPS: &str = "HTTPS";
    pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
    pub const CONTENT_TYPE: &str = "CONTENT_TYPE";

    // Path set filled by inference.
    pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
    pub const PATH_INFO: &str = "PATH_INFO";
    pub const QUERY_STRING: &str = "QUERY_STRING";
    pub const DOCUMENT_URI: &str = "DOCUMENT_URI";
    pub const DOCUMENT_ROOT: &str = "DOCUMENT_ROOT";
    pub const SCRIPT_FILENAME: &str = "SCRIPT_FILENAME";
    pub const PATH_TRANSLATED: &str = "PATH_TRANSLATED";

    // Classic CGI odds and ends recognized for compatibility.
    pub const AUTH_TYPE: &str = "AUTH_TYPE";
    pub const GATEWAY_INTERFACE: &str = "GATEWAY_INTERFACE";

    // Endpoint fields, remote side.
    pub const REMOTE_ADDR: &str = "REMOTE_ADDR";
    pub const REMOTE_PORT: &str = "REMOTE_PORT";
    pub const REMOTE_HOST: &str = "REMOTE_HOST";
    pub const REMOTE_IDENT: &str = "REMOTE_IDENT";
    pub const REMOTE_USER: &str = "REMOTE_USER";

    // Endpoint fields, server side.
    pub const SERVER_ADDR: &str = "SERVER_ADDR";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const SERVER_HOST: &str = "SERVER_HOST";
    pub const SERVER_NAME: &str = "SERVER_NAME";
    pub const SERVER_SOFTWARE: &str = "SERVER_SOFTWARE";
}

/// Accepted truthy spellings for flag-valued variables such as `HTTPS`.
pub(crate) fn truthy(value: &str) -> bool {
    matches!(value, "yes" | "on" | "1")
}

/// A single variable value: a string, or an integer for `*_PORT` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Int(u16),
    Str(String),
}

impl VarValue {
    /// The string value, for string-typed variables.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VarValue::Str(s) => Some(s.as_str()),
            VarValue::Int(_) => None,
        }
    }

    /// The value read as an integer. String values that parse as one are
    /// accepted, since gateways differ on how strictly they type ports.
    pub fn as_int(&self) -> Option<u16> {
        match self {
            VarValue::Int(n) => Some(*n),
            VarValue::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Int(n) => n.fmt(f),
            VarValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Str(s.to_owned())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::Str(s)
    }
}

impl From<u16> for VarValue {
    fn from(n: u16) -> Self {
        VarValue::Int(n)
    }
}

/// An ordered mapping of CGI-style variables.
///
/// Names are unique; insertion order is preserved, which keeps conversions
/// deterministic and diffs readable. Serializes as a plain map, so a gateway
/// can ship it in whatever envelope it uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vars {
    fields: IndexMap<String, VarValue>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a variable, replacing any existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<VarValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Inserts a variable only when the name is not yet present.
    pub fn set_default(&mut self, name: impl Into<String>, value: impl Into<VarValue>) {
        self.fields.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&VarValue> {
        self.fields.get(name)
    }

    /// The string value of a variable, when present and string-typed.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(VarValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VarValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<N: Into<String>, V: Into<VarValue>> FromIterator<(N, V)> for Vars {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut vars = Vars::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}

impl<'a> IntoIterator for &'a Vars {
    type Item = (&'a str, &'a VarValue);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a VarValue)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.fields.iter().map(|(n, v)| (n.as_str(), v)))
    }
}
