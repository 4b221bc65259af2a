//! Turning exceptional responses into wire responses.
//!
//! Every failure that leaves the request pipeline becomes an
//! [`HttpExceptionResponse`] and is rendered by exactly one
//! [`TransformerStrategy`], chosen once per deployment:
//!
//! | `http.error_format` | strategy | body |
//! |---------------------|----------|------|
//! | `json` (default) | [`JsonProblemDetailsStrategy`] | `application/problem+json` |
//! | `text` | [`PlainTextStrategy`] | `HTTP 503: Service Unavailable` |
//! | `negotiate` | [`NegotiatedStrategy`] | picked from the request's `Accept` |
//!
//! The [`ErrorBoundary`] sits at the top of the pipeline, converts errors and
//! falls back to a bare `500` when the strategy itself fails.

use crate::content_negotiation::{Accept, MediaType};
use crate::exception::{ExceptionParts, HttpExceptionResponse};
use crate::log_trace::{LOG_TRACE_HEADER, LogTrace};
use crate::logging::{debug, error, warn};
use crate::status::reason_phrase;
use crate::{Error, HttpRequest, HttpResponse, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

pub const PROBLEM_JSON: &str = "application/problem+json";
pub const PLAIN_TEXT: &str = "text/plain; charset=utf-8";
pub const DEFAULT_PROBLEM_TYPE_BASE: &str = "https://httpstatuses.io/";

/// What a strategy knows about the failed request.
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    pub request: &'a HttpRequest,
    pub log_trace: &'a LogTrace,
}

/// Renders an exceptional response. The exception is consumed, so it is
/// transformed at most once.
pub trait TransformerStrategy: Send + Sync {
    fn transform(
        &self,
        exception: HttpExceptionResponse,
        context: &ErrorContext<'_>,
    ) -> Result<HttpResponse>;
}

/// Problem-details body (RFC 7807 shape plus `log_trace`).
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub detail: Option<String>,
    pub log_trace: String,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

const RESERVED_MEMBERS: [&str; 5] = ["type", "title", "status", "detail", "log_trace"];

impl ProblemDetails {
    fn from_parts(parts: &mut ExceptionParts, type_base: &str, log_trace: &LogTrace) -> Self {
        let mut extensions = std::mem::take(&mut parts.additional);
        extensions.retain(|key, _| !RESERVED_MEMBERS.contains(&key.as_str()));

        Self {
            type_uri: format!("{}{}", type_base, parts.status_code),
            title: std::mem::take(&mut parts.title),
            status: parts.status_code,
            detail: parts.detail.take(),
            log_trace: log_trace.to_string(),
            extensions,
        }
    }
}

/// Renders `application/problem+json`.
#[derive(Debug, Clone)]
pub struct JsonProblemDetailsStrategy {
    type_base: String,
}

impl JsonProblemDetailsStrategy {
    pub fn new() -> Self {
        Self {
            type_base: DEFAULT_PROBLEM_TYPE_BASE.to_string(),
        }
    }

    /// Base URI the status code is appended to for the `type` member.
    pub fn with_type_base(mut self, base: impl Into<String>) -> Self {
        self.type_base = base.into();
        self
    }
}

impl Default for JsonProblemDetailsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformerStrategy for JsonProblemDetailsStrategy {
    fn transform(
        &self,
        exception: HttpExceptionResponse,
        context: &ErrorContext<'_>,
    ) -> Result<HttpResponse> {
        let mut parts = exception.into_parts();
        let problem = ProblemDetails::from_parts(&mut parts, &self.type_base, context.log_trace);
        let body = serde_json::to_vec(&problem).map_err(|e| Error::Serialization(e.to_string()))?;

        Ok(with_headers(HttpResponse::new(parts.status_code), parts.headers)
            .content_type(PROBLEM_JSON)
            .with_body(body))
    }
}

/// Renders `HTTP <status>: <reason>` as plain text, or emits a prepared
/// response unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextStrategy;

impl TransformerStrategy for PlainTextStrategy {
    fn transform(
        &self,
        exception: HttpExceptionResponse,
        _context: &ErrorContext<'_>,
    ) -> Result<HttpResponse> {
        let parts = exception.into_parts();
        if let Some(prepared) = parts.prepared {
            return Ok(prepared);
        }

        let body = format!("HTTP {}: {}", parts.status_code, reason_phrase(parts.status_code));
        Ok(with_headers(HttpResponse::new(parts.status_code), parts.headers)
            .content_type(PLAIN_TEXT)
            .with_body(body))
    }
}

/// Chooses JSON or plain text per request from its `Accept` header.
///
/// JSON wins ties, including requests without an `Accept` header.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedStrategy {
    json: JsonProblemDetailsStrategy,
    text: PlainTextStrategy,
}

impl NegotiatedStrategy {
    pub fn new(json: JsonProblemDetailsStrategy) -> Self {
        Self {
            json,
            text: PlainTextStrategy,
        }
    }

    fn prefers_json(request: &HttpRequest) -> bool {
        let accept = Accept::from_request(request);
        let json = accept.best_quality(&[MediaType::problem_json(), MediaType::json()]);
        let text = accept.quality_for(&MediaType::plain_text());
        json >= text
    }
}

impl TransformerStrategy for NegotiatedStrategy {
    fn transform(
        &self,
        exception: HttpExceptionResponse,
        context: &ErrorContext<'_>,
    ) -> Result<HttpResponse> {
        if Self::prefers_json(context.request) {
            self.json.transform(exception, context)
        } else {
            self.text.transform(exception, context)
        }
    }
}

fn with_headers(
    mut response: HttpResponse,
    headers: impl IntoIterator<Item = (String, String)>,
) -> HttpResponse {
    response.headers.extend(headers);
    response
}

/// Error body format, from `http.error_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorFormat {
    #[default]
    Json,
    Text,
    Negotiate,
}

impl ErrorFormat {
    pub fn strategy(self) -> Arc<dyn TransformerStrategy> {
        match self {
            ErrorFormat::Json => Arc::new(JsonProblemDetailsStrategy::new()),
            ErrorFormat::Text => Arc::new(PlainTextStrategy),
            ErrorFormat::Negotiate => Arc::new(NegotiatedStrategy::default()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorFormat::Json => "json",
            ErrorFormat::Text => "text",
            ErrorFormat::Negotiate => "negotiate",
        }
    }
}

impl FromStr for ErrorFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "problem+json" => Ok(ErrorFormat::Json),
            "text" | "plain" => Ok(ErrorFormat::Text),
            "negotiate" => Ok(ErrorFormat::Negotiate),
            other => Err(Error::Configuration(format!(
                "unknown error format '{}', expected json, text or negotiate",
                other
            ))),
        }
    }
}

/// Top of the pipeline: every error becomes a response here.
#[derive(Clone)]
pub struct ErrorBoundary {
    strategy: Arc<dyn TransformerStrategy>,
}

impl ErrorBoundary {
    pub fn new(strategy: Arc<dyn TransformerStrategy>) -> Self {
        Self { strategy }
    }

    /// Render `error` for `request`. Never fails.
    pub fn render(&self, error: Error, request: &HttpRequest) -> HttpResponse {
        let log_trace = LogTrace::of(request);
        if error.is_server_error() {
            error!(
                log_trace = %log_trace,
                status = error.status_code(),
                error = %error,
                "Request failed"
            );
        } else {
            debug!(
                log_trace = %log_trace,
                status = error.status_code(),
                error = %error,
                "Request rejected"
            );
        }

        let exception = HttpExceptionResponse::from_error(error);
        let context = ErrorContext {
            request,
            log_trace: &log_trace,
        };

        let response = match self.strategy.transform(exception, &context) {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    log_trace = %log_trace,
                    error = %e,
                    "Error transformer failed, emitting generic 500"
                );
                generic_internal_error()
            }
        };

        if response.header(LOG_TRACE_HEADER).is_some() {
            response
        } else {
            response.with_header(LOG_TRACE_HEADER, log_trace.as_str())
        }
    }
}

impl Default for ErrorBoundary {
    fn default() -> Self {
        Self::new(ErrorFormat::default().strategy())
    }
}

impl std::fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorBoundary").finish_non_exhaustive()
    }
}

fn generic_internal_error() -> HttpResponse {
    HttpResponse::internal_server_error()
        .content_type(PLAIN_TEXT)
        .with_body("HTTP 500: Internal Server Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest::new("GET".into(), "/widgets".into())
    }

    fn render(strategy: &dyn TransformerStrategy, exception: HttpExceptionResponse) -> HttpResponse {
        let request = request();
        let log_trace = LogTrace::new("trace-1");
        strategy
            .transform(
                exception,
                &ErrorContext {
                    request: &request,
                    log_trace: &log_trace,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_problem_details_body() {
        let response = render(
            &JsonProblemDetailsStrategy::new(),
            HttpExceptionResponse::service_unavailable()
                .with_detail("maintenance")
                .with_additional("retry_in", 120)
                .with_additional("status", 999)
                .with_header("Retry-After", "120"),
        );

        assert_eq!(response.status, 503);
        assert_eq!(response.header("Content-Type"), Some(PROBLEM_JSON));
        assert_eq!(response.header("Retry-After"), Some("120"));

        let body: Value = serde_json::from_slice(response.body_bytes().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "type": "https://httpstatuses.io/503",
                "title": "Service Unavailable",
                "status": 503,
                "detail": "maintenance",
                "log_trace": "trace-1",
                "retry_in": 120
            })
        );
    }

    #[test]
    fn test_plain_text_body() {
        let response = render(&PlainTextStrategy, HttpExceptionResponse::service_unavailable());
        assert_eq!(response.body_string().as_deref(), Some("HTTP 503: Service Unavailable"));
        assert_eq!(response.header("Content-Type"), Some(PLAIN_TEXT));
    }

    #[test]
    fn test_plain_text_passes_prepared_through() {
        let prepared = HttpResponse::new(418).with_body("short and stout");
        let response = render(&PlainTextStrategy, HttpExceptionResponse::from_response(prepared));
        assert_eq!(response.status, 418);
        assert_eq!(response.body_string().as_deref(), Some("short and stout"));
    }

    #[test]
    fn test_negotiation() {
        let strategy = NegotiatedStrategy::default();
        let log_trace = LogTrace::new("t");

        let text_request = request().with_header("Accept", "text/plain, application/json;q=0.5");
        let response = strategy
            .transform(
                HttpExceptionResponse::not_found(),
                &ErrorContext {
                    request: &text_request,
                    log_trace: &log_trace,
                },
            )
            .unwrap();
        assert_eq!(response.header("Content-Type"), Some(PLAIN_TEXT));

        let any_request = request();
        let response = strategy
            .transform(
                HttpExceptionResponse::not_found(),
                &ErrorContext {
                    request: &any_request,
                    log_trace: &log_trace,
                },
            )
            .unwrap();
        assert_eq!(response.header("Content-Type"), Some(PROBLEM_JSON));
    }

    #[test]
    fn test_error_format_parsing() {
        assert_eq!("JSON".parse::<ErrorFormat>().unwrap(), ErrorFormat::Json);
        assert_eq!("text".parse::<ErrorFormat>().unwrap(), ErrorFormat::Text);
        assert_eq!(" negotiate ".parse::<ErrorFormat>().unwrap(), ErrorFormat::Negotiate);
        assert!(matches!(
            "yaml".parse::<ErrorFormat>(),
            Err(Error::Configuration(_))
        ));
    }

    struct Broken;

    impl TransformerStrategy for Broken {
        fn transform(
            &self,
            _exception: HttpExceptionResponse,
            _context: &ErrorContext<'_>,
        ) -> Result<HttpResponse> {
            Err(Error::Serialization("boom".into()))
        }
    }

    #[test]
    fn test_boundary_falls_back_when_strategy_fails() {
        let boundary = ErrorBoundary::new(Arc::new(Broken));
        let response = boundary.render(Error::Conflict("stale".into()), &request());

        assert_eq!(response.status, 500);
        assert_eq!(
            response.body_string().as_deref(),
            Some("HTTP 500: Internal Server Error")
        );
        assert!(response.header(LOG_TRACE_HEADER).is_some());
    }

    #[test]
    fn test_boundary_uses_request_trace() {
        let boundary = ErrorBoundary::default();
        let request = request().with_attribute(LogTrace::new("abc"));
        let response = boundary.render(Error::Forbidden("nope".into()), &request);

        assert_eq!(response.status, 403);
        assert_eq!(response.header(LOG_TRACE_HEADER), Some("abc"));
        let body: Value = serde_json::from_slice(response.body_bytes().unwrap()).unwrap();
        assert_eq!(body["log_trace"], "abc");
        assert_eq!(body["detail"], "nope");
    }
}
