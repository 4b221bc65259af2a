//! Request pipeline.
//!
//! [`HttpPipeline`] wires the pieces of the HTTP layer together:
//!
//! ```text
//! ErrorBoundary(
//!     LogTraceMiddleware
//!     -> AttachRouteToRequest
//!     -> application middleware
//!     -> DispatchRoute
//!     -> NotFoundHandler
//! )
//! ```
//!
//! and writes the result through an [`EmitterStack`].
//!
//! ```no_run
//! use girder_core::*;
//!
//! # async fn run() -> Result<()> {
//! let router = Router::new().with_provider(
//!     RouteCollection::new().route(RouteDefinition::get("/health", |_req: HttpRequest| async {
//!         Ok::<_, Error>(HttpResponse::text("ok"))
//!     })),
//! );
//!
//! let pipeline = HttpPipeline::builder(router).warm_up(true).build()?;
//! let response = pipeline.handle(HttpRequest::new("GET".into(), "/health".into())).await;
//!
//! let mut stdout = tokio::io::stdout();
//! pipeline.emit(response, &mut stdout).await?;
//! # Ok(())
//! # }
//! ```

use crate::emitter::{DEFAULT_CHUNK_SIZE, EmitterStack};
use crate::error_transform::{ErrorBoundary, TransformerStrategy};
use crate::log_trace::{LogTrace, LogTraceMiddleware};
use crate::logging::debug;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::routing::{AttachRouteToRequest, DEFAULT_PREFLIGHT_MAX_AGE, DispatchRoute, NotFoundHandler, Router};
use crate::settings::HttpSettings;
use crate::{HttpMethod, HttpRequest, HttpResponse, RequestHandler, Result};
use std::sync::Arc;
use tokio::io::AsyncWrite;

/// Assembled request pipeline. Cheap to clone and share across tasks.
#[derive(Clone)]
pub struct HttpPipeline {
    router: Arc<Router>,
    chain: MiddlewareChain,
    fallback: Arc<dyn RequestHandler>,
    boundary: ErrorBoundary,
    emitters: EmitterStack,
}

impl HttpPipeline {
    pub fn builder(router: impl Into<Arc<Router>>) -> HttpPipelineBuilder {
        HttpPipelineBuilder::new(router)
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Run `request` through the chain. Errors are rendered by the error
    /// boundary, so this always produces a response.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let (request, _) = LogTrace::ensure(request);
        let snapshot = without_body(&request);

        match self.chain.apply(request, Arc::clone(&self.fallback)).await {
            Ok(response) => response,
            Err(error) => self.boundary.render(error, &snapshot),
        }
    }

    /// Write `response` with the emitter its body calls for.
    ///
    /// The body is always written; answers to `HEAD` go through
    /// [`serve`](Self::serve) or [`EmitterStack::emit_head`].
    pub async fn emit(
        &self,
        response: HttpResponse,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        self.emitters.emit(response, writer).await
    }

    /// [`handle`](Self::handle) followed by [`emit`](Self::emit). A `HEAD`
    /// request gets the head only.
    pub async fn serve(
        &self,
        request: HttpRequest,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        let head_only = HttpMethod::from_str(&request.method) == Some(HttpMethod::HEAD);
        let response = self.handle(request).await;
        if head_only {
            self.emitters.emit_head(response, writer).await
        } else {
            self.emit(response, writer).await
        }
    }
}

impl std::fmt::Debug for HttpPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPipeline")
            .field("router", &self.router)
            .field("chain", &self.chain)
            .field("emitters", &self.emitters)
            .finish_non_exhaustive()
    }
}

/// The boundary only needs the request's head and attributes.
fn without_body(request: &HttpRequest) -> HttpRequest {
    HttpRequest {
        method: request.method.clone(),
        path: request.path.clone(),
        headers: request.headers.clone(),
        body: Vec::new(),
        path_params: request.path_params.clone(),
        query_params: request.query_params.clone(),
        attributes: request.attributes.clone(),
    }
}

pub struct HttpPipelineBuilder {
    router: Arc<Router>,
    middleware: Vec<Arc<dyn Middleware>>,
    strategy: Option<Arc<dyn TransformerStrategy>>,
    cors_on_method_not_allowed: bool,
    preflight_max_age: u64,
    chunk_size: usize,
    warm_up: bool,
}

impl HttpPipelineBuilder {
    pub fn new(router: impl Into<Arc<Router>>) -> Self {
        Self {
            router: router.into(),
            middleware: Vec::new(),
            strategy: None,
            cors_on_method_not_allowed: false,
            preflight_max_age: DEFAULT_PREFLIGHT_MAX_AGE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            warm_up: false,
        }
    }

    /// Builder preloaded from `settings`.
    pub fn from_settings(router: impl Into<Arc<Router>>, settings: &HttpSettings) -> Self {
        Self::new(router)
            .strategy(settings.error_format.strategy())
            .cors_on_method_not_allowed(settings.cors_on_method_not_allowed)
            .preflight_max_age(settings.preflight_max_age)
            .chunk_size(settings.stream_chunk_size)
    }

    /// Application middleware; runs after routing, before the route's own
    /// middleware, in the order added.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Defaults to JSON problem details.
    pub fn strategy(mut self, strategy: Arc<dyn TransformerStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn cors_on_method_not_allowed(mut self, enabled: bool) -> Self {
        self.cors_on_method_not_allowed = enabled;
        self
    }

    pub fn preflight_max_age(mut self, seconds: u64) -> Self {
        self.preflight_max_age = seconds;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Build the route table in [`build`](Self::build) instead of on the
    /// first request, so a broken table fails at startup.
    pub fn warm_up(mut self, enabled: bool) -> Self {
        self.warm_up = enabled;
        self
    }

    pub fn build(self) -> Result<HttpPipeline> {
        if self.warm_up {
            self.router.warm_up()?;
        }

        let mut chain = MiddlewareChain::new();
        chain.use_middleware(LogTraceMiddleware);
        chain.use_middleware(
            AttachRouteToRequest::new(Arc::clone(&self.router))
                .cors_on_method_not_allowed(self.cors_on_method_not_allowed)
                .preflight_max_age(self.preflight_max_age),
        );
        for middleware in self.middleware {
            chain.use_middleware_arc(middleware);
        }
        chain.use_middleware(DispatchRoute);

        debug!(middleware = chain.len(), "Request pipeline assembled");

        Ok(HttpPipeline {
            router: self.router,
            chain,
            fallback: Arc::new(NotFoundHandler),
            boundary: self.strategy.map(ErrorBoundary::new).unwrap_or_default(),
            emitters: EmitterStack::new().with_chunk_size(self.chunk_size),
        })
    }
}
