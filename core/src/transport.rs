//! The transport capability and its factory.
//!
//! # Design
//! The core never performs network I/O. A `Transport` is an opaque
//! collaborator driven through open/set_header/send, delivering its outcome
//! asynchronously through `poll`. `TransportFactory` owns the constructors
//! injected by the host: a standard transport plus an optional legacy type
//! that only speaks cross-origin, preferred whenever cross-origin is
//! requested. Requesting cross-origin from an environment that cannot honor
//! it fails fast instead of silently downgrading.

use std::fmt;
use std::time::Duration;

use crate::error::CapabilityError;
use crate::request::Method;

/// An asynchronous outcome delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The exchange failed below the HTTP layer (refused, reset, DNS, ...).
    Failed(String),
    /// The exchange completed with a status, raw header text, and raw body.
    Completed {
        status: u16,
        header_text: String,
        body: String,
    },
}

/// Result of advancing an in-flight exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportPoll {
    /// Nothing was delivered within the budget; poll again.
    Pending,
    Event(TransportEvent),
}

/// The HTTP transport capability.
pub trait Transport {
    /// Prepare an exchange for the given method and absolute URL.
    fn open(&mut self, method: Method, url: &str);

    /// Attach an outgoing header. Called between `open` and `send`.
    fn set_header(&mut self, name: &str, value: &str);

    /// Begin transmitting. An `Err` is a synchronous initiation failure;
    /// asynchronous outcomes are delivered through `poll`.
    fn send(&mut self, body: Option<String>) -> Result<(), String>;

    /// Advance the exchange, blocking at most `budget`.
    fn poll(&mut self, budget: Duration) -> TransportPoll;

    /// Cancel the in-flight exchange.
    fn abort(&mut self);

    /// Whether this transport can attach credentials to cross-origin
    /// exchanges.
    fn supports_credentialed_cors(&self) -> bool {
        true
    }

    /// Switch the transport into credentialed cross-origin mode.
    fn enable_credentialed_cors(&mut self) {}
}

type TransportCtor = Box<dyn Fn() -> Box<dyn Transport>>;

/// Builds one transport per send, honoring the cross-origin options.
pub struct TransportFactory {
    standard: TransportCtor,
    legacy_cross_origin: Option<TransportCtor>,
}

impl TransportFactory {
    pub fn new<F>(standard: F) -> Self
    where
        F: Fn() -> Box<dyn Transport> + 'static,
    {
        Self {
            standard: Box::new(standard),
            legacy_cross_origin: None,
        }
    }

    /// Register a transport type that only performs cross-origin exchanges.
    /// When present it is preferred over the standard transport for any
    /// cross-origin send.
    pub fn with_legacy_cross_origin<F>(mut self, ctor: F) -> Self
    where
        F: Fn() -> Box<dyn Transport> + 'static,
    {
        self.legacy_cross_origin = Some(Box::new(ctor));
        self
    }

    /// Construct a transport for one send.
    ///
    /// Cross-origin prefers the legacy type when registered; otherwise the
    /// standard transport must report credentialed-cross-origin support or
    /// the request fails with a `CapabilityError`. Credentialed mode is
    /// enabled when both requested and supported.
    pub fn create(
        &self,
        cors: bool,
        cors_with_credentials: bool,
    ) -> Result<Box<dyn Transport>, CapabilityError> {
        if cors {
            if let Some(legacy) = &self.legacy_cross_origin {
                return Ok(legacy());
            }
        }
        let mut transport = (self.standard)();
        if cors && !transport.supports_credentialed_cors() {
            return Err(CapabilityError::CrossOriginUnsupported);
        }
        if cors && cors_with_credentials {
            transport.enable_credentialed_cors();
        }
        Ok(transport)
    }
}

impl fmt::Debug for TransportFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportFactory")
            .field("legacy_cross_origin", &self.legacy_cross_origin.is_some())
            .finish_non_exhaustive()
    }
}
