//! URL assembly: path joining and query-string encoding.
//!
//! # Design
//! Both halves are tolerant by contract. `join` accepts segments with
//! embedded query strings, redundant slashes, or scheme prefixes and always
//! produces one normalized path. `encode` accepts either a preformatted
//! query string (validated, never repaired) or an ordered pair list
//! (percent-encoded); anything else collapses to "no query".

/// A request query: either a preformatted query string or ordered key/value
/// pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Raw(String),
    Pairs(Vec<(String, String)>),
}

impl Query {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raw(raw) => raw.is_empty(),
            Self::Pairs(pairs) => pairs.is_empty(),
        }
    }
}

impl From<&str> for Query {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for Query {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<Vec<(String, String)>> for Query {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::Pairs(pairs)
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Query {
    fn from(pairs: [(K, V); N]) -> Self {
        Self::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Join path segments into one normalized path.
///
/// Each segment loses anything after its first `?`, then decomposes into
/// tokens (runs of non-slash characters, a `scheme://` marker glued to the
/// run that follows it). Tokens are joined with single slashes. The result
/// gets a leading `/` unless some token carries a scheme.
pub fn join(segments: &[&str]) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    let mut has_scheme = false;

    for segment in segments {
        let segment = segment.split('?').next().unwrap_or_default();
        let bytes = segment.as_bytes();
        let mut i = 0;
        while i < segment.len() {
            if bytes[i] == b'/' {
                i += 1;
                continue;
            }
            let mut end = i + scheme_len(&segment[i..]).unwrap_or(0);
            if end > i {
                has_scheme = true;
            }
            while end < segment.len() && bytes[end] != b'/' {
                end += 1;
            }
            tokens.push(&segment[i..end]);
            i = end;
        }
    }

    if tokens.is_empty() {
        return "/".to_string();
    }
    let joined = tokens.join("/");
    if has_scheme {
        joined
    } else {
        format!("/{joined}")
    }
}

/// Length of a `scheme://` marker at the start of `s`, if present.
fn scheme_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if !bytes.first().is_some_and(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'+' | b'-' | b'.')) {
        i += 1;
    }
    s[i..].starts_with("://").then(|| i + 3)
}

/// Encode a query into a leading-`?` query string, or `""` for no query.
///
/// A raw string matching the `("&" | key "=" value)*` grammar is kept as-is
/// (gaining a leading `?` when missing); a non-matching string is treated as
/// no query rather than repaired. Pair lists are percent-encoded in
/// insertion order.
pub fn encode(query: &Query) -> String {
    match query {
        Query::Raw(raw) => {
            let plain = raw.strip_prefix('?').unwrap_or(raw);
            if is_plain_query(plain) {
                format!("?{plain}")
            } else {
                String::new()
            }
        }
        Query::Pairs(pairs) => {
            if pairs.is_empty() {
                return String::new();
            }
            let encoded: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
                .collect();
            format!("?{}", encoded.join("&"))
        }
    }
}

/// `("&" | key "=" value)*` with non-empty keys and values drawn from any
/// characters except `?`, `&`, and `=`.
fn is_plain_query(s: &str) -> bool {
    s.split('&').all(|pair| {
        pair.is_empty()
            || pair
                .split_once('=')
                .is_some_and(|(key, value)| {
                    !key.is_empty() && !value.is_empty() && !key.contains('?') && !value.contains(['?', '='])
                })
    })
}
