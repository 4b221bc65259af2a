// Core traits for the Girder framework

use crate::routing::RouteDefinition;
use crate::{HttpRequest, HttpResponse, Result};
use async_trait::async_trait;
use std::future::Future;

/// Trait for request handlers (route targets and terminal handlers)
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle an HTTP request and return a response
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<F, Fut> RequestHandler for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse> {
        (self)(request).await
    }
}

/// Supplies route definitions to a [`DefinitionList`](crate::routing::DefinitionList).
///
/// Providers are consulted once, when the list is first built.
pub trait RouteProvider: Send + Sync {
    fn routes(&self) -> Result<Vec<RouteDefinition>>;
}

impl<F> RouteProvider for F
where
    F: Fn() -> Result<Vec<RouteDefinition>> + Send + Sync,
{
    fn routes(&self) -> Result<Vec<RouteDefinition>> {
        (self)()
    }
}

/// HTTP methods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::DELETE,
        HttpMethod::PATCH,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join methods into a header value (`GET, POST`).
pub fn join_methods<'a>(methods: impl IntoIterator<Item = &'a HttpMethod>) -> String {
    methods
        .into_iter()
        .map(HttpMethod::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!(HttpMethod::from_str("get"), Some(HttpMethod::GET));
        assert_eq!(HttpMethod::from_str("Options"), Some(HttpMethod::OPTIONS));
        assert_eq!(HttpMethod::from_str("PURGE"), None);
    }

    #[test]
    fn test_join_methods() {
        let methods = [HttpMethod::OPTIONS, HttpMethod::GET, HttpMethod::POST];
        assert_eq!(join_methods(&methods), "OPTIONS, GET, POST");
        assert_eq!(join_methods(&Vec::<HttpMethod>::new()), "");
    }

    #[tokio::test]
    async fn test_closure_is_a_request_handler() {
        let handler = |_req: HttpRequest| async { Ok::<_, crate::Error>(HttpResponse::no_content()) };
        let response = handler
            .handle(HttpRequest::new("GET".into(), "/".into()))
            .await
            .unwrap();
        assert_eq!(response.status, 204);
    }
}
