// Route resolution middleware: attaches matches, answers preflight and 405

use super::{RouteMatch, Router, RouterResult};
use crate::logging::debug;
use crate::exception::HttpExceptionResponse;
use crate::middleware::{Middleware, Next};
use crate::{HttpMethod, HttpRequest, HttpResponse, Result, join_methods};
use async_trait::async_trait;
use std::sync::Arc;

/// Headers every preflight allows, before the ones the client asks for.
const BASE_ALLOWED_HEADERS: [&str; 2] = ["authorization", "cookie"];

pub const DEFAULT_PREFLIGHT_MAX_AGE: u64 = 86400;

/// Resolves each request against the [`Router`].
///
/// * `Found`: the [`RouteMatch`] is attached to the request (typed attribute)
///   and its parameters copied to `path_params`, then the chain continues.
/// * `MethodNotAllowed`: `OPTIONS` requests get a CORS preflight answer,
///   anything else fails with a `405` exceptional response carrying `Allow`,
///   rendered by the error boundary like any other exception.
/// * `NotFound`: the request continues untouched.
pub struct AttachRouteToRequest {
    router: Arc<Router>,
    cors_on_method_not_allowed: bool,
    preflight_max_age: u64,
}

impl AttachRouteToRequest {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            cors_on_method_not_allowed: false,
            preflight_max_age: DEFAULT_PREFLIGHT_MAX_AGE,
        }
    }

    /// Also send CORS headers on `405` responses to cross-origin requests.
    pub fn cors_on_method_not_allowed(mut self, enabled: bool) -> Self {
        self.cors_on_method_not_allowed = enabled;
        self
    }

    pub fn preflight_max_age(mut self, seconds: u64) -> Self {
        self.preflight_max_age = seconds;
        self
    }

    fn method_not_allowed(&self, req: &HttpRequest, allowed: &[HttpMethod]) -> HttpExceptionResponse {
        let exception = HttpExceptionResponse::method_not_allowed(allowed).with_detail(format!(
            "{} is not allowed on {}",
            req.method,
            req.route_path()
        ));

        match req.header("Origin") {
            Some(origin) if self.cors_on_method_not_allowed => exception
                .with_header("Access-Control-Allow-Origin", origin)
                .with_header("Access-Control-Allow-Methods", join_methods(allowed))
                .with_header("Vary", "Origin"),
            _ => exception,
        }
    }
}

#[async_trait]
impl Middleware for AttachRouteToRequest {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        match self.router.resolve_for_request(&req.method, &req.path)? {
            RouterResult::Found(route_match) => next(attach_route(req, route_match)).await,
            RouterResult::MethodNotAllowed { allowed_methods } => {
                if HttpMethod::from_str(&req.method) == Some(HttpMethod::OPTIONS) {
                    debug!(path = %req.route_path(), "Answering CORS preflight");
                    Ok(preflight_response(&req, &allowed_methods, self.preflight_max_age))
                } else {
                    debug!(
                        method = %req.method,
                        path = %req.route_path(),
                        allowed = %join_methods(&allowed_methods),
                        "Method not allowed"
                    );
                    Err(self.method_not_allowed(&req, &allowed_methods).into())
                }
            }
            RouterResult::NotFound => next(req).await,
        }
    }
}

/// Hand `route_match` downstream with the request.
pub fn attach_route(mut req: HttpRequest, route_match: RouteMatch) -> HttpRequest {
    req.path_params.extend(
        route_match
            .path_parameters()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    req.with_attribute(route_match)
}

/// `204` answer to a CORS preflight for a path accepting `allowed`.
pub fn preflight_response(req: &HttpRequest, allowed: &[HttpMethod], max_age: u64) -> HttpResponse {
    let mut methods = vec![HttpMethod::OPTIONS];
    for method in allowed {
        if !methods.contains(method) {
            methods.push(*method);
        }
    }
    let methods = join_methods(&methods);

    let mut headers: Vec<String> = BASE_ALLOWED_HEADERS.iter().map(|h| h.to_string()).collect();
    let requested = req
        .header("Access-Control-Request-Headers")
        .unwrap_or_default()
        .split(',')
        .map(|header| header.trim().to_ascii_lowercase())
        .filter(|header| !header.is_empty());
    for header in requested {
        if !headers.contains(&header) {
            headers.push(header);
        }
    }

    let response = HttpResponse::no_content()
        .with_header("Allow", methods.clone())
        .with_header("Access-Control-Allow-Methods", methods)
        .with_header("Access-Control-Allow-Headers", headers.join(", "))
        .with_header("Access-Control-Max-Age", max_age.to_string());

    match req.header("Origin") {
        Some(origin) => response
            .with_header("Access-Control-Allow-Origin", origin)
            .with_header("Vary", "Origin"),
        None => response,
    }
}
