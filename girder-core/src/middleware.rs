// Middleware system for request/response processing

use crate::logging::{debug, trace};
use crate::{HttpRequest, HttpResponse, RequestHandler, Result};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every stage of a chain.
pub type ChainFuture = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send>>;

/// Type alias for the next handler in the middleware chain
pub type Next = Box<dyn FnOnce(HttpRequest) -> ChainFuture + Send>;

/// Middleware trait for processing requests before they reach the handler
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and optionally pass to next middleware
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse>;
}

/// Middleware chain executor
///
/// Middleware runs in registration order; the terminal handler runs last.
/// Cloning a chain is cheap: the middleware list is shared.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.use_middleware_arc(Arc::new(middleware));
    }

    pub fn use_middleware_arc(&mut self, middleware: Arc<dyn Middleware>) {
        let mut middlewares = (*self.middlewares).clone();
        middlewares.push(middleware);
        self.middlewares = Arc::new(middlewares);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a terminal handler
    pub async fn apply(
        &self,
        req: HttpRequest,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<HttpResponse> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(
        &self,
        index: usize,
        req: HttpRequest,
        handler: Arc<dyn RequestHandler>,
    ) -> ChainFuture {
        if index >= self.middlewares.len() {
            trace!("Middleware chain complete, calling handler");
            Box::pin(async move { handler.handle(req).await })
        } else {
            let middleware = Arc::clone(&self.middlewares[index]);
            let chain = self.clone();

            trace!(middleware_index = index, "Executing middleware");
            Box::pin(async move {
                middleware
                    .handle(
                        req,
                        Box::new(move |req| chain.execute_from(index + 1, req, handler)),
                    )
                    .await
            })
        }
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}
