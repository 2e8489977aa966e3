//! Single-shot HTTP(S) document fetcher with a hard deadline.
//!
//! - One request, one connection, no retries and no redirect following
//! - Body is streamed and accumulated in arrival order, then classified by status
//! - Deadline enforced through a [`CancellationToken`]; the first of
//!   completion, deadline or caller cancellation decides the outcome
//! - Optional *raw* request/response logging via `GLEANER_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), gleaner_http::FetchError> {
//! let html = gleaner_http::fetch("https://example.com", Default::default()).await?;
//! println!("{} bytes", html.len());
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, completion, timeout and failure, plus raw curl-style
//! request lines and body snippets (target `http.raw`) when
//! `GLEANER_HTTP_RAW=1`. `Authorization` and cookie values never reach the logs.

use futures::StreamExt;
use gleaner_common::preview;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use std::env;
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// User-Agent sent when the caller supplies no headers of its own.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; AI-Assistant/1.0)";

/// Deadline applied when the caller supplies none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "GLEANER_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_CHARS: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_sensitive_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization")
        || name.eq_ignore_ascii_case("proxy-authorization")
        || name.eq_ignore_ascii_case("cookie")
        || name.eq_ignore_ascii_case("set-cookie")
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, value) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, value.replace('\'', r"'\''")));
    }
    let (host_path, query) = redact_query(url);
    let mut target = format!("{}://{}", url.scheme(), host_path);
    if !query.is_empty() {
        let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        target.push('?');
        target.push_str(&pairs.join("&"));
    }
    parts.push(format!("'{}'", target.replace('\'', r"'\''")));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_sensitive_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("<binary>").to_string()
            };
            (key, val)
        })
        .collect()
}

/// Split a URL into "host + path" and a redacted query list for logging.
fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host = url.host_str().unwrap_or("-");
    let host_path = match url.port() {
        Some(port) => format!("{host}:{port}{}", url.path()),
        None => format!("{host}{}", url.path()),
    };
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

/// Flatten an error and its `source()` chain into one line.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ==============================
// Errors
// ==============================

/// Terminal outcomes of a failed fetch. None of them is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Malformed URL or a scheme other than `http`/`https`; raised before any I/O.
    #[error("invalid URL: {0}")]
    Url(String),
    /// Request options could not be turned into a valid request.
    #[error("request build failed: {0}")]
    Build(String),
    /// Connection-level failure (DNS, refused connection, reset mid-stream).
    #[error("network error: {0}")]
    Network(String),
    /// No completion within the configured window.
    #[error("request timed out after {ms}ms", ms = .0.as_millis())]
    Timeout(Duration),
    /// The caller's cancellation token fired first.
    #[error("request cancelled")]
    Cancelled,
    /// Status outside `[200, 300)`.
    #[error("HTTP {code}: {text}", code = .status.as_u16())]
    Status { status: StatusCode, text: String },
    #[error("response body exceeded {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl FetchError {
    /// The HTTP status carried by [`FetchError::Status`], if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Build(_) => "build",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Status { .. } => "status",
            Self::BodyTooLarge { .. } => "body_too_large",
        }
    }
}

// ==============================
// Request options
// ==============================

/// Optional per-call overrides, merged over the defaults by
/// [`FetchRequest::with_options`].
///
/// ```
/// use gleaner_http::FetchOptions;
/// use std::time::Duration;
///
/// let opts = FetchOptions::default()
///     .with_method("HEAD")?
///     .with_header("accept", "text/html")?
///     .with_timeout(Duration::from_secs(3));
///
/// assert_eq!(opts.method.as_ref().map(|m| m.as_str()), Some("HEAD"));
/// assert_eq!(opts.timeout, Some(Duration::from_secs(3)));
/// # Ok::<(), gleaner_http::FetchError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct FetchOptions {
    pub method: Option<Method>,
    /// Replaces the default header set entirely when present.
    pub headers: Option<HeaderMap>,
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn with_method(mut self, method: &str) -> Result<Self, FetchError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| FetchError::Build(format!("invalid method {method:?}: {e}")))?;
        self.method = Some(method);
        Ok(self)
    }

    /// Add a header, switching this request off the default header set.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, FetchError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::Build(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::Build(format!("invalid value for header {name}: {e}")))?;
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        Ok(self)
    }

    pub fn with_user_agent(self, user_agent: &str) -> Result<Self, FetchError> {
        self.with_header(USER_AGENT.as_str(), user_agent)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully resolved, validated request.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl FetchRequest {
    /// `GET` with the default headers and deadline.
    pub fn new(url: &str) -> Result<Self, FetchError> {
        Self::with_options(url, FetchOptions::default())
    }

    /// Validate `url` and merge `opts` over the defaults.
    ///
    /// ```
    /// use gleaner_http::{FetchError, FetchRequest, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
    ///
    /// let req = FetchRequest::new("https://example.com/a?b=c")?;
    /// assert_eq!(req.method, reqwest::Method::GET);
    /// assert_eq!(req.timeout, DEFAULT_TIMEOUT);
    /// assert_eq!(req.headers["user-agent"], DEFAULT_USER_AGENT);
    ///
    /// assert!(matches!(FetchRequest::new("ftp://example.com"), Err(FetchError::Url(_))));
    /// # Ok::<(), FetchError>(())
    /// ```
    pub fn with_options(url: &str, opts: FetchOptions) -> Result<Self, FetchError> {
        let url = parse_url(url)?;
        let timeout = opts.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(FetchError::Build("timeout must be positive".into()));
        }
        Ok(Self {
            url,
            method: opts.method.unwrap_or(Method::GET),
            headers: opts.headers.unwrap_or_else(default_headers),
            timeout,
        })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::Url(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::Url(format!(
            "{raw}: unsupported scheme `{other}`"
        ))),
    }
}

// ==============================
// Fetcher
// ==============================

/// Reusable fetch client. Cloning is cheap; concurrent fetches share nothing
/// but the connection pool settings.
#[derive(Clone, Debug)]
pub struct Fetcher {
    inner: Client,
    /// Upper bound on the accumulated body, `None` for unbounded.
    pub max_body_bytes: Option<usize>,
}

impl Fetcher {
    /// Build a client that never follows redirects.
    pub fn new() -> Result<Self, FetchError> {
        let inner = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::Build(describe(&e)))?;
        Ok(Self {
            inner,
            max_body_bytes: None,
        })
    }

    /// Cap the response body size.
    ///
    /// ```no_run
    /// use gleaner_http::{FetchError, Fetcher};
    ///
    /// let fetcher = Fetcher::new()?.with_max_body_bytes(1 << 20);
    /// assert_eq!(fetcher.max_body_bytes, Some(1 << 20));
    /// # Ok::<(), FetchError>(())
    /// ```
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    pub async fn fetch(&self, req: FetchRequest) -> Result<String, FetchError> {
        self.fetch_with_cancel(req, &CancellationToken::new()).await
    }

    /// Fetch `req`, giving up when `cancel` fires or the request deadline passes.
    ///
    /// The deadline cancels a child of `cancel`, so the outcome tells the two
    /// apart: [`FetchError::Cancelled`] when the caller pulled the plug,
    /// [`FetchError::Timeout`] when the timer did.
    pub async fn fetch_with_cancel(
        &self,
        req: FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<String, FetchError> {
        let fetch_id = Uuid::new_v4().simple().to_string();
        let (host_path, query) = redact_query(&req.url);
        let header_names: Vec<&str> = req.headers.keys().map(|k| k.as_str()).collect();

        tracing::debug!(
            fetch_id=%fetch_id,
            method=%req.method,
            host_path=%host_path,
            query=?query,
            timeout_ms=req.timeout.as_millis() as u64,
            headers=?header_names,
            "http.fetch.start"
        );
        if raw_enabled() {
            let curl = make_curl(&req.method, &req.url, &req.headers);
            tracing::debug!(target: "http.raw", %fetch_id, %curl, "request");
        }

        let token = cancel.child_token();
        let disarm = CancellationToken::new();
        tokio::spawn(arm_deadline(token.clone(), disarm.clone(), req.timeout));
        let _disarm_on_exit = disarm.drop_guard();

        let t0 = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                if cancel.is_cancelled() {
                    Err(FetchError::Cancelled)
                } else {
                    Err(FetchError::Timeout(req.timeout))
                }
            }
            res = self.transfer(&req, &fetch_id) => res,
        };
        let duration_ms = t0.elapsed().as_millis() as u64;

        match &outcome {
            Ok(body) => tracing::debug!(
                fetch_id=%fetch_id,
                duration_ms,
                body_len=body.len(),
                "http.fetch.complete"
            ),
            Err(FetchError::Timeout(_)) => tracing::warn!(
                fetch_id=%fetch_id,
                duration_ms,
                host_path=%host_path,
                "http.fetch.timeout"
            ),
            Err(err) => tracing::warn!(
                fetch_id=%fetch_id,
                duration_ms,
                host_path=%host_path,
                kind=err.kind(),
                message=%err,
                "http.fetch.error"
            ),
        }
        outcome
    }

    async fn transfer(&self, req: &FetchRequest, fetch_id: &str) -> Result<String, FetchError> {
        let resp = self
            .inner
            .request(req.method.clone(), req.url.clone())
            .headers(req.headers.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network(describe(&e)))?;

        let status = resp.status();
        let reason = reason_phrase(&resp);
        let content_length = resp.content_length();
        tracing::debug!(
            fetch_id=%fetch_id,
            %status,
            content_length=?content_length,
            "http.fetch.headers"
        );
        if raw_enabled() {
            let hdrs = redact_headers(resp.headers());
            tracing::debug!(target: "http.raw", %fetch_id, %status, headers=?hdrs, "response");
        }

        let limit = self.max_body_bytes;
        if let Some(limit) = limit {
            if content_length.is_some_and(|len| len > limit as u64) {
                return Err(FetchError::BodyTooLarge { limit });
            }
        }

        let mut body: Vec<u8> = Vec::new();
        let mut chunks = 0usize;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Network(describe(&e)))?;
            chunks += 1;
            if let Some(limit) = limit {
                if body.len() + chunk.len() > limit {
                    return Err(FetchError::BodyTooLarge { limit });
                }
            }
            body.extend_from_slice(&chunk);
        }

        let text = String::from_utf8_lossy(&body).into_owned();
        tracing::trace!(
            fetch_id=%fetch_id,
            chunks,
            body_snippet=%preview(&text, SNIPPET_CHARS),
            "http.fetch.body_snippet"
        );
        if raw_enabled() {
            let cut = body.len().min(RAW_MAX_BODY);
            let raw = String::from_utf8_lossy(&body[..cut]);
            tracing::info!(
                target: "http.raw",
                %fetch_id,
                %status,
                body=%raw,
                truncated=body.len() > RAW_MAX_BODY
            );
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                text: reason,
            });
        }
        Ok(text)
    }
}

/// The reason phrase the server sent, falling back to the canonical one.
/// hyper only records the phrase when it differs from the canonical text.
fn reason_phrase(resp: &reqwest::Response) -> String {
    resp.extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
        .or_else(|| resp.status().canonical_reason())
        .unwrap_or("")
        .to_string()
}

/// Cancel `token` once `timeout` elapses, unless `disarm` fires first.
async fn arm_deadline(token: CancellationToken, disarm: CancellationToken, timeout: Duration) {
    tokio::select! {
        _ = disarm.cancelled() => {}
        _ = tokio::time::sleep(timeout) => token.cancel(),
    }
}

/// Fetch `url` with a fresh [`Fetcher`], resolving to the response body.
///
/// URL validation happens before any network activity.
pub async fn fetch(url: &str, opts: FetchOptions) -> Result<String, FetchError> {
    let req = FetchRequest::with_options(url, opts)?;
    Fetcher::new()?.fetch(req).await
}
