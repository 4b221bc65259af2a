// Per-request log trace identifiers

use crate::middleware::{Middleware, Next};
use crate::{HttpRequest, HttpResponse, Result};
use async_trait::async_trait;
use tracing::Instrument;

/// Header carrying the log trace in both directions.
pub const LOG_TRACE_HEADER: &str = "X-Log-Trace";

/// Correlation id tying a request's log lines to the response a client saw.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogTrace(String);

impl LogTrace {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh UUID v4 trace.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Trace of `request`: the attached one, else a non-empty incoming
    /// header, else a fresh id.
    pub fn of(request: &HttpRequest) -> Self {
        request
            .attributes
            .get::<LogTrace>()
            .cloned()
            .or_else(|| Self::from_header(request))
            .unwrap_or_else(Self::generate)
    }

    /// Make sure `request` carries a trace and return both.
    pub fn ensure(request: HttpRequest) -> (HttpRequest, Self) {
        if let Some(trace) = request.attributes.get::<LogTrace>() {
            let trace = trace.clone();
            return (request, trace);
        }
        let trace = Self::of(&request);
        (request.with_attribute(trace.clone()), trace)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_header(request: &HttpRequest) -> Option<Self> {
        request
            .header(LOG_TRACE_HEADER)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }
}

impl std::fmt::Display for LogTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attaches a [`LogTrace`] to every request, runs the rest of the chain in a
/// span carrying it, and echoes it in the `X-Log-Trace` response header.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceMiddleware;

impl LogTraceMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for LogTraceMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        let (req, trace) = LogTrace::ensure(req);
        let span = tracing::info_span!(
            "request",
            log_trace = %trace,
            method = %req.method,
            path = %req.route_path()
        );

        let response = next(req).instrument(span).await?;
        Ok(response.with_header(LOG_TRACE_HEADER, trace.as_str()))
    }
}
