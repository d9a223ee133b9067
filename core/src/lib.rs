//! Declarative, transport-agnostic HTTP request builder.
//!
//! # Overview
//! An [`Endpoint`] owns the shared configuration for one HTTP resource: a
//! base path, default headers, and options. Each send starts from a fluent
//! [`PendingRequest`] accumulating method, path suffix, query, body, headers,
//! and completion callbacks, dispatches through an injected [`Transport`],
//! and delivers a normalized [`Response`] via callbacks or a [`Promise`].
//!
//! # Design
//! - The core performs no network I/O of its own. Transports are injected
//!   through a [`TransportFactory`], keeping the pipeline deterministic and
//!   testable (scripted transports in unit tests, a ureq-backed transport in
//!   the integration tests).
//! - Exactly one of completion, transport failure, or timeout settles a
//!   send; anything arriving later is dropped by a single-fire guard.
//! - Response normalization is total: malformed header text or a
//!   JSON-declared body that fails to decode degrades to the raw text with a
//!   logged warning, never an error.
//! - Completion is a capability resolved once at construction: callback
//!   pairs by default, promise-style when a [`DeferFactory`] is injected.

pub mod completion;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod transport;
pub mod url;

pub use completion::{CellDefer, CompletionStrategy, DeferFactory, Deferred, Promise, Resolver, Settled};
pub use endpoint::{ConfigPatch, Endpoint, Options};
pub use error::{CapabilityError, Failure, SendError};
pub use headers::HeaderMap;
pub use request::{Body, Method, MethodSpec, PendingRequest};
pub use response::{Response, ResponseHeaders};
pub use transport::{Transport, TransportEvent, TransportFactory, TransportPoll};
pub use url::Query;
