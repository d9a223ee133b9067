//! Endpoint configuration and send orchestration.
//!
//! # Design
//! An `Endpoint` owns everything shared between sends: the base path, the
//! default headers, the recognized options, the injected transport factory,
//! and the completion strategy (resolved once at construction). `dispatch`
//! runs one send end to end: compose the URL, build a transport, apply the
//! composed headers, transmit, then drive the transport until exactly one of
//! completion, transport failure, or deadline expiry settles the request.

use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::completion::{CompletionSink, CompletionStrategy, DeferFactory, Promise, Settlement};
use crate::error::{Failure, SendError};
use crate::headers::{self, HeaderMap};
use crate::request::{Body, Method, PendingRequest};
use crate::response::{self, Response};
use crate::transport::{TransportEvent, TransportFactory, TransportPoll};
use crate::url;

/// Recognized endpoint options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Charset declared for text bodies.
    pub charset: String,
    /// Automatically parse response headers and JSON bodies.
    pub auto_parse: bool,
    /// Per-send deadline. An expired exchange is aborted and fails with
    /// status 0.
    pub timeout: Duration,
    /// Route sends through a cross-origin-capable transport.
    pub cors: bool,
    /// Attach credentials to cross-origin exchanges.
    pub cors_with_credentials: bool,
    /// Force callback completion even when a deferred capability is
    /// injected.
    pub no_promises: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            charset: "utf-8".to_string(),
            auto_parse: true,
            timeout: Duration::from_millis(30_000),
            cors: false,
            cors_with_credentials: false,
            no_promises: false,
        }
    }
}

/// Partial options for `Endpoint::configure`; `None` fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub charset: Option<String>,
    pub auto_parse: Option<bool>,
    pub timeout: Option<Duration>,
    pub cors: Option<bool>,
    pub cors_with_credentials: Option<bool>,
    pub no_promises: Option<bool>,
}

/// A configured HTTP resource: one base path plus the defaults shared by
/// every request sent through it.
pub struct Endpoint {
    basepath: String,
    default_headers: HeaderMap,
    options: Options,
    transports: TransportFactory,
    completion: CompletionStrategy,
}

impl Endpoint {
    /// Declare an HTTP resource with callback-style completion.
    pub fn new(basepath: impl Into<String>, transports: TransportFactory) -> Self {
        Self {
            basepath: basepath.into(),
            default_headers: HeaderMap::new(),
            options: Options::default(),
            transports,
            completion: CompletionStrategy::Callbacks,
        }
    }

    /// Declare an HTTP resource with promise-style completion through the
    /// given deferred capability.
    pub fn with_deferred(
        basepath: impl Into<String>,
        transports: TransportFactory,
        defer: Rc<dyn DeferFactory>,
    ) -> Self {
        Self {
            completion: CompletionStrategy::Deferred(defer),
            ..Self::new(basepath, transports)
        }
    }

    /// Replace the default headers applied to every request from this
    /// endpoint.
    pub fn header(&mut self, headers: impl Into<HeaderMap>) -> &mut Self {
        self.default_headers = headers.into();
        self
    }

    /// Merge the present fields of `patch` into the endpoint options.
    pub fn configure(&mut self, patch: ConfigPatch) -> &mut Self {
        if let Some(charset) = patch.charset {
            self.options.charset = charset;
        }
        if let Some(auto_parse) = patch.auto_parse {
            self.options.auto_parse = auto_parse;
        }
        if let Some(timeout) = patch.timeout {
            self.options.timeout = timeout;
        }
        if let Some(cors) = patch.cors {
            self.options.cors = cors;
        }
        if let Some(with_credentials) = patch.cors_with_credentials {
            self.options.cors_with_credentials = with_credentials;
        }
        if let Some(no_promises) = patch.no_promises {
            self.options.no_promises = no_promises;
        }
        self
    }

    pub fn basepath(&self) -> &str {
        &self.basepath
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn request(&self, method: Method) -> PendingRequest<'_> {
        PendingRequest::new(self, method)
    }

    pub fn get(&self) -> PendingRequest<'_> {
        self.request(Method::Get)
    }

    pub fn post(&self) -> PendingRequest<'_> {
        self.request(Method::Post)
    }

    pub fn put(&self) -> PendingRequest<'_> {
        self.request(Method::Put)
    }

    pub fn delete(&self) -> PendingRequest<'_> {
        self.request(Method::Delete)
    }

    pub fn head(&self) -> PendingRequest<'_> {
        self.request(Method::Head)
    }

    /// Run one send to completion.
    pub(crate) fn dispatch(&self, request: PendingRequest<'_>) -> Result<Option<Promise>, SendError> {
        let PendingRequest {
            endpoint: _,
            method,
            path,
            query,
            body,
            headers: request_headers,
            on_success,
            on_error,
        } = request;

        let (sink, promise) = match (&self.completion, self.options.no_promises) {
            (CompletionStrategy::Deferred(defer), false) => {
                let deferred = defer.deferred();
                (CompletionSink::Deferred(deferred.resolver), Some(deferred.promise))
            }
            _ => {
                let Some(on_success) = on_success else {
                    return Err(SendError::MissingCompletion);
                };
                (CompletionSink::Callbacks { on_success, on_error }, None)
            }
        };

        let mut final_url = url::join(&[self.basepath.as_str(), path.as_deref().unwrap_or("")]);
        if let Some(query) = &query {
            if !query.is_empty() {
                final_url.push_str(&url::encode(query));
            }
        }

        let mut transport = self
            .transports
            .create(self.options.cors, self.options.cors_with_credentials)
            .map_err(SendError::Capability)?;

        transport.open(method, &final_url);

        let composed = headers::compose(
            &self.default_headers,
            &request_headers,
            body.as_ref(),
            &self.options.charset,
        );
        for (name, value) in composed.iter() {
            transport.set_header(name, value);
        }

        let mut settlement = Settlement::new(sink);

        let payload = body.as_ref().map(Body::serialize);
        if let Err(reason) = transport.send(payload) {
            settlement.settle(Err(Failure::Network { reason }));
            return Ok(promise);
        }

        let deadline = Instant::now() + self.options.timeout;
        while !settlement.is_settled() {
            let now = Instant::now();
            if now >= deadline {
                transport.abort();
                settlement.settle(Err(Failure::Network {
                    reason: "a network timeout has occurred".to_string(),
                }));
                break;
            }
            match transport.poll(deadline - now) {
                TransportPoll::Pending => {}
                TransportPoll::Event(TransportEvent::Failed(reason)) => {
                    settlement.settle(Err(Failure::Network { reason }));
                }
                TransportPoll::Event(TransportEvent::Completed { status: 0, .. }) => {
                    // An aborted or torn-down exchange surfaces as status 0
                    // and must never reach the success path.
                    settlement.settle(Err(Failure::Network {
                        reason: "a network-level exception has occurred".to_string(),
                    }));
                }
                TransportPoll::Event(TransportEvent::Completed { status, header_text, body: raw_body }) => {
                    let headers = response::parse_headers(&header_text, self.options.auto_parse);
                    let parsed = response::parse_body(raw_body, &headers, self.options.auto_parse);
                    let response = Response { status, body: parsed, headers };
                    let outcome = if is_success(status) {
                        Ok(response)
                    } else {
                        Err(Failure::Http(response))
                    };
                    settlement.settle(outcome);
                }
            }
        }

        Ok(promise)
    }
}

/// Success statuses: the informational and success classes, plus 304 Not
/// Modified.
fn is_success(status: u16) -> bool {
    (100..300).contains(&status) || status == 304
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CellDefer;
    use crate::transport::Transport;
    use serde_json::json;
    use std::cell::RefCell;

    /// What a scripted transport saw, shared with the test body.
    #[derive(Default)]
    struct Recorded {
        opened: Option<(Method, String)>,
        headers: Vec<(String, String)>,
        sent: Option<Option<String>>,
        aborted: bool,
    }

    struct ScriptedTransport {
        script: Vec<TransportPoll>,
        send_error: Option<String>,
        recorded: Rc<RefCell<Recorded>>,
    }

    impl Transport for ScriptedTransport {
        fn open(&mut self, method: Method, url: &str) {
            self.recorded.borrow_mut().opened = Some((method, url.to_string()));
        }

        fn set_header(&mut self, name: &str, value: &str) {
            self.recorded.borrow_mut().headers.push((name.to_string(), value.to_string()));
        }

        fn send(&mut self, body: Option<String>) -> Result<(), String> {
            self.recorded.borrow_mut().sent = Some(body);
            match self.send_error.take() {
                Some(reason) => Err(reason),
                None => Ok(()),
            }
        }

        fn poll(&mut self, _budget: Duration) -> TransportPoll {
            if self.script.is_empty() {
                TransportPoll::Pending
            } else {
                self.script.remove(0)
            }
        }

        fn abort(&mut self) {
            self.recorded.borrow_mut().aborted = true;
        }
    }

    fn scripted(script: Vec<TransportPoll>, recorded: &Rc<RefCell<Recorded>>) -> TransportFactory {
        scripted_with_send_error(script, None, recorded)
    }

    fn scripted_with_send_error(
        script: Vec<TransportPoll>,
        send_error: Option<String>,
        recorded: &Rc<RefCell<Recorded>>,
    ) -> TransportFactory {
        let recorded = Rc::clone(recorded);
        TransportFactory::new(move || {
            Box::new(ScriptedTransport {
                script: script.clone(),
                send_error: send_error.clone(),
                recorded: Rc::clone(&recorded),
            })
        })
    }

    fn completed(status: u16, header_text: &str, body: &str) -> TransportPoll {
        TransportPoll::Event(TransportEvent::Completed {
            status,
            header_text: header_text.to_string(),
            body: body.to_string(),
        })
    }

    fn json_ok(body: &str) -> TransportPoll {
        completed(200, "Content-Type: application/json\r\n", body)
    }

    type Captured<T> = Rc<RefCell<Option<T>>>;

    fn capture<T>() -> Captured<T> {
        Rc::new(RefCell::new(None))
    }

    #[test]
    fn success_completion_delivers_a_parsed_response() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![json_ok(r#"{"a":1}"#)], &recorded));

        let got: Captured<Response> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .path("users")
            .success(move |response| *slot.borrow_mut() = Some(response))
            .error(|_| panic!("error path must not fire"))
            .send()
            .unwrap();

        let response = got.borrow_mut().take().expect("settled");
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_json(), Some(&json!({"a": 1})));
        assert_eq!(response.headers.get("Content-Type"), Some("application/json"));
        assert_eq!(
            recorded.borrow().opened,
            Some((Method::Get, "/api/users".to_string()))
        );
    }

    #[test]
    fn http_error_status_routes_to_the_failure_path() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new(
            "/api",
            scripted(vec![completed(404, "Content-Type: application/json\n", r#"{"missing":true}"#)], &recorded),
        );

        let got: Captured<Failure> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .success(|_| panic!("success path must not fire"))
            .error(move |failure| *slot.borrow_mut() = Some(failure))
            .send()
            .unwrap();

        let failure = got.borrow_mut().take().expect("settled");
        assert_eq!(failure.status(), 404);
        match failure {
            Failure::Http(response) => {
                assert_eq!(response.body.as_json(), Some(&json!({"missing": true})));
            }
            Failure::Network { .. } => panic!("expected an HTTP failure"),
        }
    }

    #[test]
    fn not_modified_is_a_success() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![completed(304, "", "")], &recorded));

        let got: Captured<u16> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .success(move |response| *slot.borrow_mut() = Some(response.status))
            .error(|_| panic!("error path must not fire"))
            .send()
            .unwrap();
        assert_eq!(got.borrow_mut().take(), Some(304));
    }

    #[test]
    fn transport_failure_settles_with_status_zero() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new(
            "/api",
            scripted(
                vec![TransportPoll::Event(TransportEvent::Failed("connection refused".to_string()))],
                &recorded,
            ),
        );

        let got: Captured<Failure> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .success(|_| panic!("success path must not fire"))
            .error(move |failure| *slot.borrow_mut() = Some(failure))
            .send()
            .unwrap();

        let failure = got.borrow_mut().take().expect("settled");
        assert_eq!(failure.status(), 0);
        assert_eq!(
            failure,
            Failure::Network { reason: "connection refused".to_string() }
        );
    }

    #[test]
    fn deadline_expiry_aborts_and_settles_as_timeout() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut endpoint = Endpoint::new("/api", scripted(Vec::new(), &recorded));
        endpoint.configure(ConfigPatch {
            timeout: Some(Duration::from_millis(10)),
            ..ConfigPatch::default()
        });

        let got: Captured<Failure> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .success(|_| panic!("success path must not fire"))
            .error(move |failure| *slot.borrow_mut() = Some(failure))
            .send()
            .unwrap();

        let failure = got.borrow_mut().take().expect("settled");
        assert_eq!(failure.status(), 0);
        match failure {
            Failure::Network { reason } => assert!(reason.contains("timeout")),
            Failure::Http(_) => panic!("expected a network failure"),
        }
        assert!(recorded.borrow().aborted);
    }

    #[test]
    fn zero_status_completion_never_fires_success() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![completed(0, "", "")], &recorded));

        let got: Captured<u16> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .success(|_| panic!("success path must not fire"))
            .error(move |failure| *slot.borrow_mut() = Some(failure.status()))
            .send()
            .unwrap();
        assert_eq!(got.borrow_mut().take(), Some(0));
    }

    #[test]
    fn synchronous_transmit_error_becomes_a_network_failure() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new(
            "/api",
            scripted_with_send_error(Vec::new(), Some("invalid transport state".to_string()), &recorded),
        );

        let got: Captured<Failure> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .success(|_| panic!("success path must not fire"))
            .error(move |failure| *slot.borrow_mut() = Some(failure))
            .send()
            .unwrap();

        assert_eq!(
            got.borrow_mut().take(),
            Some(Failure::Network { reason: "invalid transport state".to_string() })
        );
    }

    #[test]
    fn callback_mode_requires_a_success_handler() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![json_ok("{}")], &recorded));
        assert_eq!(endpoint.get().send().unwrap_err(), SendError::MissingCompletion);
    }

    #[test]
    fn deferred_mode_returns_a_settled_promise() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::with_deferred(
            "/api",
            scripted(vec![json_ok(r#"{"ok":true}"#)], &recorded),
            Rc::new(CellDefer),
        );

        let promise = endpoint.get().send().unwrap().expect("promise mode");
        let response = promise.take().expect("settled").expect("success");
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_json(), Some(&json!({"ok": true})));
    }

    #[test]
    fn deferred_mode_rejects_on_http_error() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::with_deferred(
            "/api",
            scripted(vec![completed(500, "", "boom")], &recorded),
            Rc::new(CellDefer),
        );

        let promise = endpoint.get().send().unwrap().expect("promise mode");
        let failure = promise.take().expect("settled").expect_err("failure");
        assert_eq!(failure.status(), 500);
    }

    #[test]
    fn no_promises_option_forces_callback_completion() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut endpoint = Endpoint::with_deferred(
            "/api",
            scripted(vec![json_ok("{}")], &recorded),
            Rc::new(CellDefer),
        );
        endpoint.configure(ConfigPatch {
            no_promises: Some(true),
            ..ConfigPatch::default()
        });

        let got: Captured<u16> = capture();
        let slot = Rc::clone(&got);
        let promise = endpoint
            .get()
            .success(move |response| *slot.borrow_mut() = Some(response.status))
            .send()
            .unwrap();
        assert!(promise.is_none());
        assert_eq!(got.borrow_mut().take(), Some(200));
    }

    #[test]
    fn query_is_appended_for_query_methods_only() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![completed(200, "", "")], &recorded));

        endpoint
            .delete()
            .path("logs")
            .query([("zip", "90210"), ("haircolor", "brown")])
            .success(|_| {})
            .send()
            .unwrap();
        assert_eq!(
            recorded.borrow().opened.as_ref().map(|(_, url)| url.as_str()),
            Some("/api/logs?zip=90210&haircolor=brown")
        );

        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![completed(200, "", "")], &recorded));
        endpoint
            .post()
            .path("logs")
            .query([("zip", "90210")])
            .body("x")
            .success(|_| {})
            .send()
            .unwrap();
        assert_eq!(
            recorded.borrow().opened.as_ref().map(|(_, url)| url.as_str()),
            Some("/api/logs")
        );
    }

    #[test]
    fn structured_body_is_serialized_with_inferred_content_type() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![completed(201, "", "")], &recorded));

        endpoint
            .post()
            .body(json!({"username": "testuser"}))
            .success(|_| {})
            .send()
            .unwrap();

        let recorded = recorded.borrow();
        assert_eq!(
            recorded.sent,
            Some(Some(r#"{"username":"testuser"}"#.to_string()))
        );
        assert!(recorded
            .headers
            .iter()
            .any(|(name, value)| name == "Content-Type" && value == "application/json"));
    }

    #[test]
    fn request_level_content_type_overrides_inference() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let endpoint = Endpoint::new("/api", scripted(vec![completed(200, "", "")], &recorded));

        endpoint
            .put()
            .body("csv,data")
            .header([("Content-Type", "text/csv")])
            .success(|_| {})
            .send()
            .unwrap();

        let recorded = recorded.borrow();
        let content_types: Vec<&str> = recorded
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(content_types, ["text/csv"]);
    }

    #[test]
    fn default_headers_apply_to_every_send() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut endpoint = Endpoint::new("/api", scripted(vec![completed(200, "", "")], &recorded));
        endpoint.header([("X-Token", "abc")]);

        endpoint.get().success(|_| {}).send().unwrap();
        assert!(recorded
            .borrow()
            .headers
            .iter()
            .any(|(name, value)| name == "X-Token" && value == "abc"));
    }

    #[test]
    fn header_replaces_defaults_wholesale() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut endpoint = Endpoint::new("/api", scripted(Vec::new(), &recorded));
        endpoint.header([("X-A", "1")]);
        endpoint.header([("X-B", "2")]);
        assert!(!endpoint.default_headers().contains("X-A"));
        assert_eq!(endpoint.default_headers().get("X-B"), Some("2"));
    }

    #[test]
    fn configure_merges_only_present_fields() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut endpoint = Endpoint::new("/api", scripted(Vec::new(), &recorded));
        endpoint.configure(ConfigPatch {
            timeout: Some(Duration::from_secs(5)),
            cors: Some(true),
            ..ConfigPatch::default()
        });
        assert_eq!(endpoint.options().timeout, Duration::from_secs(5));
        assert!(endpoint.options().cors);
        assert_eq!(endpoint.options().charset, "utf-8");
        assert!(endpoint.options().auto_parse);
    }

    #[test]
    fn empty_configure_and_header_are_idempotent() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut endpoint = Endpoint::new("/api", scripted(Vec::new(), &recorded));
        endpoint.header([("X-Token", "abc")]);
        endpoint.configure(ConfigPatch {
            timeout: Some(Duration::from_secs(5)),
            ..ConfigPatch::default()
        });

        let options_before = endpoint.options().clone();
        let headers_before = endpoint.default_headers().clone();
        endpoint.configure(ConfigPatch::default());
        endpoint.configure(ConfigPatch::default());
        endpoint.header(headers_before.clone());
        assert_eq!(endpoint.options(), &options_before);
        assert_eq!(endpoint.default_headers(), &headers_before);
    }

    #[test]
    fn cross_origin_capability_error_is_synchronous() {
        struct NoCorsTransport;
        impl Transport for NoCorsTransport {
            fn open(&mut self, _method: Method, _url: &str) {}
            fn set_header(&mut self, _name: &str, _value: &str) {}
            fn send(&mut self, _body: Option<String>) -> Result<(), String> {
                Ok(())
            }
            fn poll(&mut self, _budget: Duration) -> TransportPoll {
                TransportPoll::Pending
            }
            fn abort(&mut self) {}
            fn supports_credentialed_cors(&self) -> bool {
                false
            }
        }

        let mut endpoint = Endpoint::new("/api", TransportFactory::new(|| Box::new(NoCorsTransport)));
        endpoint.configure(ConfigPatch {
            cors: Some(true),
            ..ConfigPatch::default()
        });
        assert_eq!(
            endpoint.get().success(|_| {}).send().unwrap_err(),
            SendError::Capability(crate::error::CapabilityError::CrossOriginUnsupported)
        );
    }

    #[test]
    fn auto_parse_off_delivers_raw_text() {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let mut endpoint = Endpoint::new("/api", scripted(vec![json_ok(r#"{"a":1}"#)], &recorded));
        endpoint.configure(ConfigPatch {
            auto_parse: Some(false),
            ..ConfigPatch::default()
        });

        let got: Captured<Response> = capture();
        let slot = Rc::clone(&got);
        endpoint
            .get()
            .success(move |response| *slot.borrow_mut() = Some(response))
            .send()
            .unwrap();

        let response = got.borrow_mut().take().expect("settled");
        assert_eq!(response.body.as_text(), Some(r#"{"a":1}"#));
        assert!(matches!(response.headers, crate::response::ResponseHeaders::Raw(_)));
    }
}
