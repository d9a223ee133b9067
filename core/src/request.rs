//! Method variants and the per-request builder.
//!
//! # Design
//! The five supported methods form a closed set; each maps through a fixed
//! lookup to a `MethodSpec` whose capability flags gate the builder. A
//! `.query()` on a body-only method (or `.body()` on a query-only method)
//! is silently ignored rather than rejected, so chains stay infallible and
//! validation happens once, at send time.

use std::fmt;

use serde_json::Value;

use crate::completion::{ErrorFn, Promise, SuccessFn};
use crate::endpoint::Endpoint;
use crate::error::{Failure, SendError};
use crate::headers::HeaderMap;
use crate::response::Response;
use crate::url::Query;

/// The closed set of supported HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

/// Capability flags for one method variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: &'static str,
    /// Query strings are honored (GET, DELETE, HEAD).
    pub allows_query: bool,
    /// Request bodies are honored (POST, PUT).
    pub allows_body: bool,
}

impl Method {
    /// The fixed per-variant capability table.
    pub fn spec(self) -> MethodSpec {
        match self {
            Self::Get => MethodSpec { name: "GET", allows_query: true, allows_body: false },
            Self::Post => MethodSpec { name: "POST", allows_query: false, allows_body: true },
            Self::Put => MethodSpec { name: "PUT", allows_query: false, allows_body: true },
            Self::Delete => MethodSpec { name: "DELETE", allows_query: true, allows_body: false },
            Self::Head => MethodSpec { name: "HEAD", allows_query: true, allows_body: false },
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A request body: raw text or a structured JSON value. Also the shape of a
/// normalized response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
}

impl Body {
    /// Wire form: structured values are JSON-stringified, text is sent as-is.
    pub fn serialize(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Text(_) => None,
            Self::Json(value) => Some(value),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// One in-progress request being assembled. Consumed by `send`.
pub struct PendingRequest<'a> {
    pub(crate) endpoint: &'a Endpoint,
    pub(crate) method: Method,
    pub(crate) path: Option<String>,
    pub(crate) query: Option<Query>,
    pub(crate) body: Option<Body>,
    pub(crate) headers: HeaderMap,
    pub(crate) on_success: Option<SuccessFn>,
    pub(crate) on_error: Option<ErrorFn>,
}

impl<'a> PendingRequest<'a> {
    pub(crate) fn new(endpoint: &'a Endpoint, method: Method) -> Self {
        Self {
            endpoint,
            method,
            path: None,
            query: None,
            body: None,
            headers: HeaderMap::new(),
            on_success: None,
            on_error: None,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Path suffix appended to the endpoint's base path. Accepts anything
    /// displayable, so numeric segments work.
    pub fn path(mut self, path: impl fmt::Display) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Per-request headers, overlaid over the endpoint defaults at send
    /// time. Replaces any previously declared per-request headers.
    pub fn header(mut self, headers: impl Into<HeaderMap>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Query for the request URL. Ignored unless the method supports a
    /// query (GET, DELETE, HEAD).
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        if self.method.spec().allows_query {
            self.query = Some(query.into());
        }
        self
    }

    /// Request body. Ignored unless the method supports one (POST, PUT).
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        if self.method.spec().allows_body {
            self.body = Some(body.into());
        }
        self
    }

    /// Callback for the success completion path.
    pub fn success(mut self, on_success: impl FnOnce(Response) + 'static) -> Self {
        self.on_success = Some(Box::new(on_success));
        self
    }

    /// Callback for the failure completion path.
    pub fn error(mut self, on_error: impl FnOnce(Failure) + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Dispatch through the owning endpoint. Returns a promise in deferred
    /// completion mode, `None` in callback mode.
    pub fn send(self) -> Result<Option<Promise>, SendError> {
        let endpoint = self.endpoint;
        endpoint.dispatch(self)
    }
}
