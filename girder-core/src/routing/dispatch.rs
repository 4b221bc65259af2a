// Running matched routes

use super::RouteMatch;
use crate::logging::{debug, trace};
use crate::middleware::{Middleware, Next};
use crate::{Error, HttpRequest, HttpResponse, RequestHandler, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs the route attached by [`AttachRouteToRequest`](super::AttachRouteToRequest):
/// the route's own middleware, then its handler. Requests without a match
/// continue down the chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchRoute;

impl DispatchRoute {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for DispatchRoute {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        let Some(route_match) = req.attributes.get_arc::<RouteMatch>() else {
            trace!("No route attached, passing on");
            return next(req).await;
        };

        let definition = Arc::clone(route_match.definition());
        debug!(
            route = definition.route_name().unwrap_or(definition.path()),
            middleware = definition.middleware_chain().len(),
            "Dispatching route"
        );
        definition
            .middleware_chain()
            .apply(req, Arc::clone(definition.handler()))
            .await
    }
}

/// Terminal handler for requests no route matched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundHandler;

#[async_trait]
impl RequestHandler for NotFoundHandler {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse> {
        Err(Error::RouteNotFound(format!(
            "{} {}",
            request.method,
            request.route_path()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareChain;
    use crate::routing::{RouteDefinition, attach_route};
    use std::collections::HashMap;

    struct Tag(&'static str);

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
            Ok(next(req).await?.with_header("X-Tag", self.0))
        }
    }

    async fn show(req: HttpRequest) -> Result<HttpResponse> {
        let id = req.param("id").cloned().unwrap_or_default();
        Ok(HttpResponse::text(format!("widget {}", id)))
    }

    fn chain() -> MiddlewareChain {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(DispatchRoute);
        chain
    }

    #[tokio::test]
    async fn test_dispatches_attached_route_with_its_middleware() {
        let definition = Arc::new(RouteDefinition::get("/widgets/{id}", show).middleware(Tag("route")));
        let params = HashMap::from([("id".to_string(), "42".to_string())]);
        let req = attach_route(
            HttpRequest::new("GET".into(), "/widgets/42".into()),
            RouteMatch::new(definition, params),
        );

        let response = chain().apply(req, Arc::new(NotFoundHandler)).await.unwrap();
        assert_eq!(response.body_string().as_deref(), Some("widget 42"));
        assert_eq!(response.header("X-Tag"), Some("route"));
    }

    #[tokio::test]
    async fn test_unrouted_request_reaches_not_found() {
        let err = chain()
            .apply(
                HttpRequest::new("GET".into(), "/nowhere?x=1".into()),
                Arc::new(NotFoundHandler),
            )
            .await
            .unwrap_err();

        match err {
            Error::RouteNotFound(what) => assert_eq!(what, "GET /nowhere"),
            other => panic!("expected RouteNotFound, got {:?}", other),
        }
    }
}
