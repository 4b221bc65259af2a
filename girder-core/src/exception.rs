//! Typed exceptional responses.
//!
//! An [`HttpExceptionResponse`] describes an HTTP failure (status, title,
//! optional detail, extra headers and extra problem fields) without deciding
//! how it is rendered. Handlers return one through
//! [`Error::Exception`](crate::Error::Exception); the
//! [`ErrorBoundary`](crate::error_transform::ErrorBoundary) hands it to the
//! configured [`TransformerStrategy`](crate::error_transform::TransformerStrategy)
//! exactly once.
//!
//! ```ignore
//! return Err(HttpExceptionResponse::service_unavailable()
//!     .with_detail("maintenance window")
//!     .with_header("Retry-After", "120")
//!     .into());
//! ```

use crate::logging::warn;
use crate::status::reason_phrase;
use crate::{Error, HttpMethod, HttpResponse, HttpStatus, join_methods};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
pub struct HttpExceptionResponse {
    status_code: u16,
    title: String,
    detail: Option<String>,
    headers: HashMap<String, String>,
    additional: BTreeMap<String, Value>,
    prepared: Option<HttpResponse>,
}

impl HttpExceptionResponse {
    /// Exception for an arbitrary status; the title is its reason phrase.
    pub fn from_status(status_code: u16) -> Self {
        Self {
            status_code,
            title: reason_phrase(status_code).to_string(),
            detail: None,
            headers: HashMap::new(),
            additional: BTreeMap::new(),
            prepared: None,
        }
    }

    pub fn new(status: HttpStatus) -> Self {
        Self::from_status(status.code())
    }

    /// Convert any framework error.
    ///
    /// An `Error::Exception` is unwrapped as-is; every other variant maps to
    /// its status with the error's public detail.
    pub fn from_error(error: Error) -> Self {
        match error {
            Error::Exception(exception) => *exception,
            other => {
                let exception = Self::from_status(other.status_code());
                match other.public_detail() {
                    Some(detail) => exception.with_detail(detail),
                    None => exception,
                }
            }
        }
    }

    /// Wrap an already rendered response. Transformers that honor prepared
    /// responses emit it unchanged.
    pub fn from_response(response: HttpResponse) -> Self {
        let mut exception = Self::from_status(response.status);
        exception.prepared = Some(response);
        exception
    }

    pub fn bad_request() -> Self {
        Self::new(HttpStatus::BadRequest)
    }

    pub fn unauthorized() -> Self {
        Self::new(HttpStatus::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(HttpStatus::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::new(HttpStatus::NotFound)
    }

    /// 405 carrying an `Allow` header.
    pub fn method_not_allowed(allowed: &[HttpMethod]) -> Self {
        Self::new(HttpStatus::MethodNotAllowed).with_header("Allow", join_methods(allowed))
    }

    pub fn conflict() -> Self {
        Self::new(HttpStatus::Conflict)
    }

    pub fn gone() -> Self {
        Self::new(HttpStatus::Gone)
    }

    pub fn too_many_requests() -> Self {
        Self::new(HttpStatus::TooManyRequests)
    }

    pub fn unavailable_for_legal_reasons() -> Self {
        Self::new(HttpStatus::UnavailableForLegalReasons)
    }

    pub fn internal_server_error() -> Self {
        Self::new(HttpStatus::InternalServerError)
    }

    pub fn not_implemented() -> Self {
        Self::new(HttpStatus::NotImplemented)
    }

    pub fn bad_gateway() -> Self {
        Self::new(HttpStatus::BadGateway)
    }

    pub fn service_unavailable() -> Self {
        Self::new(HttpStatus::ServiceUnavailable)
    }

    pub fn gateway_timeout() -> Self {
        Self::new(HttpStatus::GatewayTimeout)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Extra problem field. Values that cannot be represented as JSON are
    /// stored as null, with a warning.
    pub fn with_additional(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let key = key.into();
        let value = json_or_null(&key, value);
        self.additional.insert(key, value);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn additional(&self) -> &BTreeMap<String, Value> {
        &self.additional
    }

    pub fn prepared(&self) -> Option<&HttpResponse> {
        self.prepared.as_ref()
    }

    /// Split into parts for rendering.
    pub fn into_parts(self) -> ExceptionParts {
        ExceptionParts {
            status_code: self.status_code,
            title: self.title,
            detail: self.detail,
            headers: self.headers,
            additional: self.additional,
            prepared: self.prepared,
        }
    }
}

/// Owned fields of a consumed [`HttpExceptionResponse`].
#[derive(Debug)]
pub struct ExceptionParts {
    pub status_code: u16,
    pub title: String,
    pub detail: Option<String>,
    pub headers: HashMap<String, String>,
    pub additional: BTreeMap<String, Value>,
    pub prepared: Option<HttpResponse>,
}

impl From<HttpStatus> for HttpExceptionResponse {
    fn from(status: HttpStatus) -> Self {
        Self::new(status)
    }
}

/// `value` as JSON; null (logged) when it has no JSON form.
pub(crate) fn json_or_null(key: &str, value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(key, error = %e, "Value has no JSON form, storing null");
        Value::Null
    })
}
