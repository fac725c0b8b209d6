//! Request/response access logging.
//!
//! [`RequestResponseLogger`] emits one line immediately before a request is
//! handed to the rest of the pipeline and one line immediately after the
//! response comes back. Which fields appear is controlled by [`LogOptions`];
//! where the lines go is controlled by the [`Sink`] (by default, `tracing`).
//!
//! The logger never interferes with request handling:
//!
//! - the body it logs is a truncated *copy*; handlers receive every byte the
//!   client sent
//! - a body that failed to buffer is logged as `<unreadable>` and the request
//!   still proceeds
//! - a sink that fails to accept a line is reported on the `tracing` debug
//!   channel and otherwise ignored
//!
//! Header values are logged verbatim when `include_headers` is on. Whether to
//! redact sensitive headers (authorization, cookies) is a deployment policy —
//! keep the flag off, or strip them in a custom [`Sink`], if that matters in
//! your environment.

use std::fmt::Write as _;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::HeaderMap;
use tracing::{debug, info};

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Destination for formatted log lines.
///
/// Implementations must be cheap and non-blocking; `write` runs on the
/// request path. Errors are swallowed by the logger — a broken sink must
/// never fail a request.
pub trait Sink: Send + Sync + 'static {
    fn write(&self, line: &str) -> io::Result<()>;
}

/// The default sink: each line becomes a `tracing` INFO event with target
/// `scribe::access`. Routing, formatting, and filtering stay in the hands of
/// whatever subscriber the deployment installs.
pub struct TracingSink;

impl Sink for TracingSink {
    fn write(&self, line: &str) -> io::Result<()> {
        info!(target: "scribe::access", "{line}");
        Ok(())
    }
}

// ── LogOptions ────────────────────────────────────────────────────────────────

/// Field selection for the before/after lines.
///
/// Immutable once built — construct via [`LogOptions::builder`] (or
/// [`LogOptions::from_env`]) at startup and move it into
/// [`RequestResponseLogger::new`]. Concurrent requests share it read-only.
///
/// Defaults: every flag off, `max_payload_len` 50, lines delimited by
/// `"Before request ["`/`"]"` and `"After request ["`/`"]"`.
#[derive(Clone, Debug)]
pub struct LogOptions {
    pub(crate) include_client_info: bool,
    pub(crate) include_query_string: bool,
    pub(crate) include_headers: bool,
    pub(crate) include_payload: bool,
    pub(crate) max_payload_len: usize,
    pub(crate) before_prefix: String,
    pub(crate) before_suffix: String,
    pub(crate) after_prefix: String,
    pub(crate) after_suffix: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            include_client_info: false,
            include_query_string: false,
            include_headers: false,
            include_payload: false,
            max_payload_len: 50,
            before_prefix: "Before request [".to_owned(),
            before_suffix: "]".to_owned(),
            after_prefix: "After request [".to_owned(),
            after_suffix: "]".to_owned(),
        }
    }
}

impl LogOptions {
    pub fn builder() -> LogOptionsBuilder {
        LogOptionsBuilder { options: Self::default() }
    }

    /// Builds options from `SCRIBE_LOG_*` environment variables, falling back
    /// to the defaults for anything unset or unparsable:
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `SCRIBE_LOG_CLIENT_INFO` | `1`/`true`/`yes` enables client address + session id |
    /// | `SCRIBE_LOG_QUERY_STRING` | include the raw query string |
    /// | `SCRIBE_LOG_HEADERS` | include header names and values |
    /// | `SCRIBE_LOG_PAYLOAD` | include the (truncated) body |
    /// | `SCRIBE_LOG_MAX_PAYLOAD_LEN` | truncation limit in bytes |
    /// | `SCRIBE_LOG_BEFORE_PREFIX` / `_SUFFIX` | before-line delimiters |
    /// | `SCRIBE_LOG_AFTER_PREFIX` / `_SUFFIX` | after-line delimiters |
    pub fn from_env() -> Self {
        fn flag(name: &str) -> Option<bool> {
            std::env::var(name)
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        }

        let mut options = Self::default();
        if let Some(v) = flag("SCRIBE_LOG_CLIENT_INFO") {
            options.include_client_info = v;
        }
        if let Some(v) = flag("SCRIBE_LOG_QUERY_STRING") {
            options.include_query_string = v;
        }
        if let Some(v) = flag("SCRIBE_LOG_HEADERS") {
            options.include_headers = v;
        }
        if let Some(v) = flag("SCRIBE_LOG_PAYLOAD") {
            options.include_payload = v;
        }
        if let Some(v) = std::env::var("SCRIBE_LOG_MAX_PAYLOAD_LEN")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            options.max_payload_len = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LOG_BEFORE_PREFIX") {
            options.before_prefix = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LOG_BEFORE_SUFFIX") {
            options.before_suffix = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LOG_AFTER_PREFIX") {
            options.after_prefix = v;
        }
        if let Ok(v) = std::env::var("SCRIBE_LOG_AFTER_SUFFIX") {
            options.after_suffix = v;
        }
        options
    }

    pub fn include_client_info(&self) -> bool { self.include_client_info }
    pub fn include_query_string(&self) -> bool { self.include_query_string }
    pub fn include_headers(&self) -> bool { self.include_headers }
    pub fn include_payload(&self) -> bool { self.include_payload }
    pub fn max_payload_len(&self) -> usize { self.max_payload_len }
    pub fn before_prefix(&self) -> &str { &self.before_prefix }
    pub fn before_suffix(&self) -> &str { &self.before_suffix }
    pub fn after_prefix(&self) -> &str { &self.after_prefix }
    pub fn after_suffix(&self) -> &str { &self.after_suffix }
}

/// Fluent builder for [`LogOptions`]. Obtain via [`LogOptions::builder`].
pub struct LogOptionsBuilder {
    options: LogOptions,
}

impl LogOptionsBuilder {
    /// Include the peer address and, when present, the session/correlation id
    /// from the `x-session-id` (or `x-request-id`) header.
    pub fn include_client_info(mut self, on: bool) -> Self {
        self.options.include_client_info = on;
        self
    }

    /// Include the raw query string (`?foo=bar`) in the before line.
    pub fn include_query_string(mut self, on: bool) -> Self {
        self.options.include_query_string = on;
        self
    }

    /// Include header names and values. Off by default; header values are
    /// not redacted.
    pub fn include_headers(mut self, on: bool) -> Self {
        self.options.include_headers = on;
        self
    }

    /// Include the body, truncated to `max_payload_len` bytes.
    pub fn include_payload(mut self, on: bool) -> Self {
        self.options.include_payload = on;
        self
    }

    /// Truncation limit in bytes for logged payloads. The cut never splits a
    /// UTF-8 sequence; only the logged copy is affected.
    pub fn max_payload_len(mut self, max: usize) -> Self {
        self.options.max_payload_len = max;
        self
    }

    pub fn before_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.before_prefix = prefix.into();
        self
    }

    pub fn before_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.options.before_suffix = suffix.into();
        self
    }

    pub fn after_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.after_prefix = prefix.into();
        self
    }

    pub fn after_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.options.after_suffix = suffix.into();
        self
    }

    pub fn build(self) -> LogOptions {
        self.options
    }
}

// ── RequestResponseLogger ─────────────────────────────────────────────────────

/// Middleware that logs one line before and one line after each request.
///
/// The before line describes the request (method, path, then the fields
/// enabled in [`LogOptions`]); the after line carries the response status,
/// optional headers/body, and elapsed time. Register it first so it times the
/// whole pipeline:
///
/// ```rust,no_run
/// use scribe::{LogOptions, RequestResponseLogger, Router};
///
/// let app = Router::new()
///     .wrap(RequestResponseLogger::new(LogOptions::from_env()));
/// ```
#[derive(Clone)]
pub struct RequestResponseLogger {
    options: LogOptions,
    sink: Arc<dyn Sink>,
}

impl RequestResponseLogger {
    /// Logger writing through the default [`TracingSink`].
    pub fn new(options: LogOptions) -> Self {
        Self::with_sink(options, TracingSink)
    }

    /// Logger writing through a custom sink (file, aggregator, test capture).
    pub fn with_sink(options: LogOptions, sink: impl Sink) -> Self {
        Self { options, sink: Arc::new(sink) }
    }

    fn emit(&self, line: &str) {
        if let Err(e) = self.sink.write(line) {
            debug!("access log sink rejected a line: {e}");
        }
    }

    fn before_line(&self, req: &Request) -> String {
        let o = &self.options;
        let mut line = String::new();
        line.push_str(&o.before_prefix);
        let _ = write!(line, "{} {}", req.method(), req.path());
        if o.include_query_string
            && let Some(query) = req.query()
        {
            let _ = write!(line, "?{query}");
        }
        if o.include_client_info {
            let _ = write!(line, ", client={}", req.remote_addr());
            if let Some(session) = session_id(req) {
                let _ = write!(line, ", session={session}");
            }
        }
        if o.include_headers {
            let _ = write!(line, ", headers={}", format_header_map(req.headers()));
        }
        if o.include_payload {
            let payload = if req.body_unreadable() {
                "<unreadable>".to_owned()
            } else {
                truncated_payload(req.body(), o.max_payload_len)
            };
            let _ = write!(line, ", payload={payload}");
        }
        line.push_str(&o.before_suffix);
        line
    }

    fn after_line(&self, resp: &Response, elapsed: Duration) -> String {
        let o = &self.options;
        let mut line = String::new();
        line.push_str(&o.after_prefix);
        let _ = write!(line, "status={}", resp.status_code().as_u16());
        if o.include_headers {
            let _ = write!(line, ", headers={}", format_header_list(resp.headers()));
        }
        if o.include_payload && !resp.body().is_empty() {
            let _ = write!(
                line,
                ", payload={}",
                truncated_payload(resp.body(), o.max_payload_len)
            );
        }
        let _ = write!(line, ", elapsed={}ms", elapsed.as_millis());
        line.push_str(&o.after_suffix);
        line
    }
}

impl Middleware for RequestResponseLogger {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let logger = self.clone();
        Box::pin(async move {
            // Describe the request before moving it downstream; no body copy
            // is needed beyond the truncated text in the line itself.
            logger.emit(&logger.before_line(&req));
            let start = Instant::now();
            let resp = next.run(req).await;
            logger.emit(&logger.after_line(&resp, start.elapsed()));
            resp
        })
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────────

/// Session/correlation identifier, as forwarded by the proxy or client.
fn session_id(req: &Request) -> Option<&str> {
    req.header("x-session-id").or_else(|| req.header("x-request-id"))
}

fn format_header_map(headers: &HeaderMap) -> String {
    let mut out = String::from("{");
    for (i, (name, value)) in headers.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{name}: {}", value.to_str().unwrap_or("<opaque>"));
    }
    out.push('}');
    out
}

fn format_header_list(headers: &[(String, String)]) -> String {
    let mut out = String::from("{");
    for (i, (name, value)) in headers.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{name}: {value}");
    }
    out.push('}');
    out
}

/// At most `max` bytes of `bytes`, rendered as text.
///
/// When the cut lands inside a multibyte UTF-8 sequence the partial tail is
/// dropped rather than emitted as garbage. Payloads that were never valid
/// UTF-8 are rendered lossily (U+FFFD for invalid sequences).
fn truncated_payload(bytes: &[u8], max: usize) -> String {
    let cut = &bytes[..bytes.len().min(max)];
    match std::str::from_utf8(cut) {
        Ok(s) => s.to_owned(),
        // error_len() is None only for a sequence clipped at the end of input.
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&cut[..e.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(cut).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use http::{HeaderMap, Method, StatusCode};

    use crate::request::Body;
    use crate::router::Router;

    // ── Test sinks ────────────────────────────────────────────────────────────

    #[derive(Clone, Default)]
    struct CaptureSink(Arc<Mutex<Vec<String>>>);

    impl CaptureSink {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Sink for CaptureSink {
        fn write(&self, line: &str) -> io::Result<()> {
            self.0.lock().unwrap().push(line.to_owned());
            Ok(())
        }
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn write(&self, _line: &str) -> io::Result<()> {
            Err(io::Error::other("sink down"))
        }
    }

    // ── Fixtures ──────────────────────────────────────────────────────────────

    fn request(method: Method, uri: &str, body: &[u8]) -> Request {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", "abc123".parse().unwrap());
        Request::new(
            method,
            uri.parse().unwrap(),
            headers,
            Body::Buffered(bytes::Bytes::copy_from_slice(body)),
            "10.0.0.7:55555".parse().unwrap(),
        )
    }

    async fn ok_handler(_req: Request) -> crate::Response {
        crate::Response::text("done")
    }

    fn app(logger: RequestResponseLogger) -> Arc<Router> {
        Arc::new(
            Router::new()
                .on(Method::POST, "/submit", ok_handler)
                .on(Method::GET, "/ping", ok_handler)
                .wrap(logger),
        )
    }

    // ── Truncation ────────────────────────────────────────────────────────────

    #[test]
    fn truncation_keeps_first_n_bytes_of_ascii() {
        assert_eq!(truncated_payload(b"1234567890ABCDE", 10), "1234567890");
    }

    #[test]
    fn truncation_is_a_noop_for_short_payloads() {
        assert_eq!(truncated_payload(b"hi", 10), "hi");
    }

    #[test]
    fn truncation_never_splits_a_multibyte_char() {
        // "héllo": h=1 byte, é=2 bytes. A 2-byte cut lands inside é.
        assert_eq!(truncated_payload("héllo".as_bytes(), 2), "h");
        assert_eq!(truncated_payload("héllo".as_bytes(), 3), "hé");
    }

    #[test]
    fn truncation_of_binary_payload_is_lossy_not_panicky() {
        let rendered = truncated_payload(&[0xff, 0xfe, b'a'], 3);
        assert!(rendered.ends_with('a'));
    }

    #[test]
    fn zero_limit_logs_nothing() {
        assert_eq!(truncated_payload(b"anything", 0), "");
    }

    // ── Options ───────────────────────────────────────────────────────────────

    #[test]
    fn default_options_match_the_conservative_baseline() {
        let o = LogOptions::default();
        assert!(!o.include_client_info);
        assert!(!o.include_query_string);
        assert!(!o.include_headers);
        assert!(!o.include_payload);
        assert_eq!(o.max_payload_len, 50);
        assert_eq!(o.before_prefix, "Before request [");
        assert_eq!(o.after_prefix, "After request [");
    }

    #[test]
    fn builder_overrides_stick() {
        let o = LogOptions::builder()
            .include_payload(true)
            .max_payload_len(2048)
            .before_prefix(">>> REQUEST >>> ")
            .before_suffix("")
            .build();
        assert!(o.include_payload);
        assert_eq!(o.max_payload_len, 2048);
        assert_eq!(o.before_prefix, ">>> REQUEST >>> ");
        assert_eq!(o.before_suffix, "");
    }

    // ── End-to-end through the pipeline ───────────────────────────────────────

    #[tokio::test]
    async fn spec_scenario_truncated_log_full_body_downstream() {
        let options = LogOptions::builder()
            .include_client_info(true)
            .include_query_string(true)
            .include_headers(false)
            .include_payload(true)
            .max_payload_len(10)
            .build();
        let sink = CaptureSink::default();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_handler = Arc::clone(&seen);
        let handler = move |req: Request| {
            let seen = Arc::clone(&seen_in_handler);
            async move {
                seen.lock().unwrap().extend_from_slice(req.body());
                crate::Response::text("done")
            }
        };

        let router = Arc::new(
            Router::new()
                .on(Method::POST, "/submit", handler)
                .wrap(RequestResponseLogger::with_sink(options, sink.clone())),
        );
        let resp = router
            .dispatch(request(Method::POST, "/submit?debug=1", b"1234567890ABCDE"))
            .await;

        assert_eq!(resp.status_code(), StatusCode::OK);
        // The handler received every byte the client sent.
        assert_eq!(seen.lock().unwrap().as_slice(), b"1234567890ABCDE");

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("POST /submit?debug=1"));
        assert!(lines[0].contains("client=10.0.0.7:55555"));
        assert!(lines[0].contains("session=abc123"));
        assert!(lines[0].contains("payload=1234567890"));
        assert!(!lines[0].contains("ABCDE"));
        assert!(lines[1].contains("status=200"));
        assert!(lines[1].contains("elapsed="));
    }

    #[tokio::test]
    async fn payload_disabled_never_logs_body_content() {
        let sink = CaptureSink::default();
        let logger =
            RequestResponseLogger::with_sink(LogOptions::builder().build(), sink.clone());
        let router = app(logger);
        router
            .dispatch(request(Method::POST, "/submit", b"super-secret-body"))
            .await;

        for line in sink.lines() {
            assert!(!line.contains("super-secret-body"));
            assert!(!line.contains("payload="));
        }
    }

    #[tokio::test]
    async fn headers_only_appear_when_enabled() {
        let sink = CaptureSink::default();
        let logger = RequestResponseLogger::with_sink(
            LogOptions::builder().include_headers(true).build(),
            sink.clone(),
        );
        let router = app(logger);
        router.dispatch(request(Method::GET, "/ping", b"")).await;

        let lines = sink.lines();
        assert!(lines[0].contains("headers={x-session-id: abc123}"));
        assert!(lines[1].contains("headers={content-type: text/plain; charset=utf-8}"));
    }

    #[tokio::test]
    async fn before_and_after_lines_in_order_with_delimiters() {
        let sink = CaptureSink::default();
        let logger =
            RequestResponseLogger::with_sink(LogOptions::builder().build(), sink.clone());
        let router = app(logger);
        router.dispatch(request(Method::GET, "/ping", b"")).await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Before request ["));
        assert!(lines[0].ends_with(']'));
        assert!(lines[1].starts_with("After request ["));
        assert!(lines[1].ends_with(']'));
    }

    #[tokio::test]
    async fn query_string_is_omitted_unless_enabled() {
        let sink = CaptureSink::default();
        let logger =
            RequestResponseLogger::with_sink(LogOptions::builder().build(), sink.clone());
        let router = app(logger);
        router
            .dispatch(request(Method::GET, "/ping?token=hunter2", b""))
            .await;

        assert!(sink.lines()[0].contains("GET /ping"));
        assert!(!sink.lines()[0].contains("token=hunter2"));
    }

    #[tokio::test]
    async fn failing_sink_does_not_fail_the_request() {
        let logger =
            RequestResponseLogger::with_sink(LogOptions::builder().build(), FailingSink);
        let router = app(logger);
        let resp = router.dispatch(request(Method::GET, "/ping", b"")).await;

        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(resp.body(), b"done");
    }

    #[tokio::test]
    async fn error_response_propagates_and_is_logged() {
        async fn broken(_req: Request) -> crate::Response {
            crate::Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
        let sink = CaptureSink::default();
        let logger =
            RequestResponseLogger::with_sink(LogOptions::builder().build(), sink.clone());
        let router = Arc::new(
            Router::new().on(Method::GET, "/boom", broken).wrap(logger),
        );
        let resp = router.dispatch(request(Method::GET, "/boom", b"")).await;

        assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(sink.lines()[1].contains("status=500"));
    }

    #[tokio::test]
    async fn unreadable_body_logs_placeholder_and_still_runs_handler() {
        let sink = CaptureSink::default();
        let logger = RequestResponseLogger::with_sink(
            LogOptions::builder().include_payload(true).build(),
            sink.clone(),
        );
        let router = app(logger);
        let req = Request::new(
            Method::POST,
            "/submit".parse().unwrap(),
            HeaderMap::new(),
            Body::Unreadable,
            "10.0.0.7:55555".parse().unwrap(),
        );
        let resp = router.dispatch(req).await;

        assert_eq!(resp.status_code(), StatusCode::OK);
        assert!(sink.lines()[0].contains("payload=<unreadable>"));
    }
}
