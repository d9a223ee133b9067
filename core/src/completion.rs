//! Completion protocols: callback pairs and deferred promises.
//!
//! # Design
//! The strategy is injected at endpoint construction and cached; there is no
//! ambient detection of a promise implementation. Both protocols converge on
//! `Settlement`, the single-fire guard: exactly one of completion, transport
//! failure, or timeout may deliver an outcome, and anything arriving after
//! the first is dropped.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Failure;
use crate::response::Response;

/// The outcome delivered through either completion protocol.
pub type Settled = Result<Response, Failure>;

type Slot = Rc<RefCell<Option<Settled>>>;

/// Future-value half of a deferred pair.
#[derive(Debug)]
pub struct Promise {
    slot: Slot,
}

impl Promise {
    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Take the settled outcome. `None` while the request is in flight.
    pub fn take(&self) -> Option<Settled> {
        self.slot.borrow_mut().take()
    }
}

/// Resolution half of a deferred pair. Consumed on first use.
#[derive(Debug)]
pub struct Resolver {
    slot: Slot,
}

impl Resolver {
    pub fn resolve(self, response: Response) {
        *self.slot.borrow_mut() = Some(Ok(response));
    }

    pub fn reject(self, failure: Failure) {
        *self.slot.borrow_mut() = Some(Err(failure));
    }
}

/// A deferred pair: settle through `resolver`, observe through `promise`.
#[derive(Debug)]
pub struct Deferred {
    pub resolver: Resolver,
    pub promise: Promise,
}

/// Capability producing deferred pairs, injected at endpoint construction.
pub trait DeferFactory {
    fn deferred(&self) -> Deferred;
}

/// Single-threaded deferred implementation backed by a shared slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellDefer;

impl DeferFactory for CellDefer {
    fn deferred(&self) -> Deferred {
        let slot: Slot = Rc::new(RefCell::new(None));
        Deferred {
            resolver: Resolver { slot: Rc::clone(&slot) },
            promise: Promise { slot },
        }
    }
}

/// Completion protocol for an endpoint, resolved once at construction.
#[derive(Clone)]
pub enum CompletionStrategy {
    /// Deliver through the builder's registered success/error callbacks.
    Callbacks,
    /// Produce a promise per send and settle it.
    Deferred(Rc<dyn DeferFactory>),
}

pub(crate) type SuccessFn = Box<dyn FnOnce(Response)>;
pub(crate) type ErrorFn = Box<dyn FnOnce(Failure)>;

/// Where one send's outcome goes.
pub(crate) enum CompletionSink {
    Callbacks {
        on_success: SuccessFn,
        on_error: Option<ErrorFn>,
    },
    Deferred(Resolver),
}

/// Single-fire delivery guard for one send.
pub(crate) struct Settlement {
    sink: Option<CompletionSink>,
}

impl Settlement {
    pub(crate) fn new(sink: CompletionSink) -> Self {
        Self { sink: Some(sink) }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.sink.is_none()
    }

    /// Deliver the outcome. Late calls after the first are dropped.
    pub(crate) fn settle(&mut self, outcome: Settled) {
        let Some(sink) = self.sink.take() else {
            tracing::debug!("request already settled, dropping late completion");
            return;
        };
        match sink {
            CompletionSink::Callbacks { on_success, on_error } => match outcome {
                Ok(response) => on_success(response),
                Err(failure) => match on_error {
                    Some(on_error) => on_error(failure),
                    None => tracing::warn!("request failed with no error handler registered: {failure}"),
                },
            },
            CompletionSink::Deferred(resolver) => match outcome {
                Ok(response) => resolver.resolve(response),
                Err(failure) => resolver.reject(failure),
            },
        }
    }
}
