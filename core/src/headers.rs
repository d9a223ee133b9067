//! Header storage and composition.
//!
//! # Design
//! `HeaderMap` keeps insertion order in an owned pair list (header names are
//! matched case-insensitively, last write wins). `compose` layers the three
//! header sources for one send: endpoint defaults, then an inferred
//! `Content-Type` from the body kind, then the per-request overlay, which
//! wins over both. No legality validation is performed; the transport is
//! trusted to reject malformed values.

use crate::request::Body;

/// Insertion-ordered header mapping with case-insensitive unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing value under the same name
    /// (compared case-insensitively).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

impl From<Vec<(String, String)>> for HeaderMap {
    fn from(entries: Vec<(String, String)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeaderMap {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

/// Compose the headers for one send.
///
/// Defaults are copied first, a `Content-Type` is inferred from the body
/// kind (structured values declare JSON, text declares `text/html` with the
/// configured charset), and the per-request headers overlay last so an
/// explicit `Content-Type` always wins.
pub fn compose(defaults: &HeaderMap, request: &HeaderMap, body: Option<&Body>, charset: &str) -> HeaderMap {
    let mut composed = defaults.clone();
    match body {
        Some(Body::Json(_)) => composed.insert("Content-Type", "application/json"),
        Some(Body::Text(_)) => composed.insert("Content-Type", format!("text/html; charset={charset}")),
        None => {}
    }
    for (name, value) in request.iter() {
        composed.insert(name, value);
    }
    composed
}
