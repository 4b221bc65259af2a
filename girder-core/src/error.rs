// Error types for the Girder framework

use crate::exception::HttpExceptionResponse;
use crate::HttpStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Routing
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("No route registered under the name '{0}'")]
    RouteNotFoundByName(String),

    #[error("Route name '{0}' is registered more than once")]
    DuplicateRouteName(String),

    #[error("Route conflict for {method} {path}: {reason}")]
    RouteConflict {
        method: String,
        path: String,
        reason: String,
    },

    #[error("Route provider failed: {0}")]
    RouteProvider(String),

    // Configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A fully specified exceptional response raised by a handler.
    #[error("HTTP {}: {}", .0.status_code(), .0.title())]
    Exception(Box<HttpExceptionResponse>),

    // 4xx Client Errors
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Unavailable For Legal Reasons: {0}")]
    UnavailableForLegalReasons(String),

    // 5xx Server Errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not Implemented: {0}")]
    NotImplemented(String),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Gateway Timeout: {0}")]
    GatewayTimeout(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) | Error::RouteNotFoundByName(_) => HttpStatus::NotFound.code(),
            Error::Exception(exception) => exception.status_code(),

            Error::BadRequest(_) => HttpStatus::BadRequest.code(),
            Error::Unauthorized(_) => HttpStatus::Unauthorized.code(),
            Error::Forbidden(_) => HttpStatus::Forbidden.code(),
            Error::NotFound(_) => HttpStatus::NotFound.code(),
            Error::Conflict(_) => HttpStatus::Conflict.code(),
            Error::Gone(_) => HttpStatus::Gone.code(),
            Error::TooManyRequests(_) => HttpStatus::TooManyRequests.code(),
            Error::UnavailableForLegalReasons(_) => HttpStatus::UnavailableForLegalReasons.code(),

            Error::NotImplemented(_) => HttpStatus::NotImplemented.code(),
            Error::BadGateway(_) => HttpStatus::BadGateway.code(),
            Error::ServiceUnavailable(_) => HttpStatus::ServiceUnavailable.code(),
            Error::GatewayTimeout(_) => HttpStatus::GatewayTimeout.code(),

            // Configuration defects, I/O and everything internal
            _ => HttpStatus::InternalServerError.code(),
        }
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        HttpStatus::from_code(self.status_code()).unwrap_or(HttpStatus::InternalServerError)
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// Message safe to show to a client.
    ///
    /// Server-side failures collapse to `None` so internals never leak into
    /// a response body.
    pub fn public_detail(&self) -> Option<String> {
        match self {
            Error::RouteNotFound(msg)
            | Error::BadRequest(msg)
            | Error::Unauthorized(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::Gone(msg)
            | Error::TooManyRequests(msg)
            | Error::UnavailableForLegalReasons(msg)
            | Error::NotImplemented(msg)
            | Error::ServiceUnavailable(msg) => Some(msg.clone()),
            Error::RouteNotFoundByName(name) => Some(format!("No route named '{}'", name)),
            Error::Exception(exception) => exception.detail().map(str::to_string),
            _ => None,
        }
    }
}

impl From<HttpExceptionResponse> for Error {
    fn from(exception: HttpExceptionResponse) -> Self {
        Error::Exception(Box::new(exception))
    }
}
