//! Response normalization: raw status/header/body triples into typed values.
//!
//! # Design
//! Both parse functions are total. Header text that does not look like
//! `Name: value` lines, or a JSON-declared body that fails to decode, is
//! handed back unparsed with a logged warning — a malformed response is the
//! caller's data, not this crate's error.

use crate::headers::HeaderMap;
use crate::request::Body;

/// Response headers, parsed into a mapping when `auto_parse` allows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseHeaders {
    /// Header text exactly as the transport delivered it.
    Raw(String),
    Parsed(HeaderMap),
}

impl ResponseHeaders {
    /// Look up a header by name. Only available on the parsed representation.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Self::Raw(_) => None,
            Self::Parsed(map) => map.get(name),
        }
    }

    /// Whether either representation declares a JSON content type.
    fn indicates_json(&self) -> bool {
        match self {
            Self::Parsed(map) => map
                .get("Content-Type")
                .is_some_and(|value| value.contains("application/json")),
            Self::Raw(text) => text.lines().any(|line| {
                line.split_once(':').is_some_and(|(name, value)| {
                    name.trim().eq_ignore_ascii_case("content-type") && value.contains("application/json")
                })
            }),
        }
    }
}

/// One normalized response as delivered to a completion handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Body,
    pub headers: ResponseHeaders,
}

/// Parse raw header text into a mapping.
///
/// CRLF is normalized to LF, blank lines are skipped, and each remaining
/// line is split on its first `:` with both sides trimmed. A line without a
/// `:` makes the whole text unparseable and the raw text is returned.
pub fn parse_headers(raw: &str, auto_parse: bool) -> ResponseHeaders {
    if !auto_parse {
        return ResponseHeaders::Raw(raw.to_string());
    }
    let normalized = raw.replace("\r\n", "\n");
    let mut map = HeaderMap::new();
    for line in normalized.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            tracing::warn!("unable to parse response headers");
            return ResponseHeaders::Raw(raw.to_string());
        };
        map.insert(name.trim(), value.trim());
    }
    ResponseHeaders::Parsed(map)
}

/// Decode the body when the headers declare JSON; otherwise keep the text.
pub fn parse_body(raw: String, headers: &ResponseHeaders, auto_parse: bool) -> Body {
    if auto_parse && headers.indicates_json() {
        match serde_json::from_str(&raw) {
            Ok(value) => return Body::Json(value),
            Err(error) => tracing::warn!("unable to parse response body: {error}"),
        }
    }
    Body::Text(raw)
}
