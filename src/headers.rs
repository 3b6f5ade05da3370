//! Request header sets.
//!
//! [`Headers`] stands in for the wire-level header block of a request. It
//! accepts the reserved `:`-prefixed pseudo-header names that proxy-style
//! front ends produce, which rules out stricter header containers that
//! reject `:` in a field name.

use indexmap::IndexMap;

/// Reserved pseudo-header names carrying request-line-level data.
pub mod pseudo {
    pub const METHOD: &str = ":method";
    pub const PATH: &str = ":path";
    pub const VERSION: &str = ":version";
    pub const HOST: &str = ":host";
    pub const SCHEME: &str = ":scheme";
}

/// An ordered set of request headers.
///
/// Names are ASCII-case-insensitive and kept in canonical lowercase;
/// insertion order is preserved. Each name holds at most one value, and
/// inserting an existing name replaces its value in place. Merging synonym
/// headers, where a front end wants that, happens before this type is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: IndexMap<String, String>,
}

fn canonical(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, replacing the value in place when the name is
    /// already present.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.fields.insert(canonical(name.as_ref()), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&canonical(name)).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&canonical(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Fills the pseudo-headers from an already-parsed request line and the
    /// transport scheme, copying `host` into `:host` when one is present.
    ///
    /// Meant for adapters that sit on a textual request line and want the
    /// same shape a pseudo-header-speaking front end would deliver.
    pub fn set_request_line(
        &mut self,
        method: impl Into<String>,
        target: impl Into<String>,
        version: impl Into<String>,
        scheme: impl Into<String>,
    ) {
        self.insert(pseudo::METHOD, method);
        self.insert(pseudo::PATH, target);
        self.insert(pseudo::VERSION, version);
        if let Some(host) = self.get("host") {
            let host = host.to_owned();
            self.insert(pseudo::HOST, host);
        }
        self.insert(pseudo::SCHEME, scheme);
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }
}
