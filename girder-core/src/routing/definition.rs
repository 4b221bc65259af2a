// Route definitions and the in-memory route provider

use crate::exception::json_or_null;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::{HttpMethod, RequestHandler, Result, RouteProvider};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A declarative mapping from HTTP method(s) + path pattern to a handler.
///
/// Path patterns use `{name}` for a single segment and `{*name}` for the
/// rest of the path, e.g. `/widgets/{id}` or `/assets/{*file}`.
///
/// Attributes are kept as two layers: defaults and explicit values. The
/// effective map is the defaults overlaid by the explicit values, so the
/// result does not depend on the order the builder methods were called in.
#[derive(Clone)]
pub struct RouteDefinition {
    methods: Vec<HttpMethod>,
    path: String,
    name: Option<String>,
    handler: Arc<dyn RequestHandler>,
    middleware: MiddlewareChain,
    defaults: BTreeMap<String, Value>,
    explicit: BTreeMap<String, Value>,
}

impl RouteDefinition {
    /// Create a definition; duplicate methods are collapsed, order is kept.
    pub fn new<H>(methods: impl IntoIterator<Item = HttpMethod>, path: impl Into<String>, handler: H) -> Self
    where
        H: RequestHandler + 'static,
    {
        let mut unique = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }

        Self {
            methods: unique,
            path: path.into(),
            name: None,
            handler: Arc::new(handler),
            middleware: MiddlewareChain::new(),
            defaults: BTreeMap::new(),
            explicit: BTreeMap::new(),
        }
    }

    pub fn get<H: RequestHandler + 'static>(path: impl Into<String>, handler: H) -> Self {
        Self::new([HttpMethod::GET], path, handler)
    }

    pub fn post<H: RequestHandler + 'static>(path: impl Into<String>, handler: H) -> Self {
        Self::new([HttpMethod::POST], path, handler)
    }

    pub fn put<H: RequestHandler + 'static>(path: impl Into<String>, handler: H) -> Self {
        Self::new([HttpMethod::PUT], path, handler)
    }

    pub fn patch<H: RequestHandler + 'static>(path: impl Into<String>, handler: H) -> Self {
        Self::new([HttpMethod::PATCH], path, handler)
    }

    pub fn delete<H: RequestHandler + 'static>(path: impl Into<String>, handler: H) -> Self {
        Self::new([HttpMethod::DELETE], path, handler)
    }

    /// Route answering every supported method.
    pub fn any<H: RequestHandler + 'static>(path: impl Into<String>, handler: H) -> Self {
        Self::new(HttpMethod::ALL, path, handler)
    }

    /// Register the route under a unique name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a route-level middleware; runs after global middleware.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.use_middleware(middleware);
        self
    }

    /// Set an explicit attribute; wins over a default of the same key.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let key = key.into();
        let value = json_or_null(&key, value);
        self.explicit.insert(key, value);
        self
    }

    /// Merge default attributes.
    pub fn defaults<K, V>(mut self, defaults: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        for (key, value) in defaults {
            let key = key.into();
            let value = json_or_null(&key, value);
            self.defaults.insert(key, value);
        }
        self
    }

    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    pub fn allows(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn handler(&self) -> &Arc<dyn RequestHandler> {
        &self.handler
    }

    pub fn middleware_chain(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Effective attributes: defaults overlaid by explicit values.
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        let mut merged = self.defaults.clone();
        merged.extend(
            self.explicit
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        merged
    }
}

impl std::fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("methods", &self.methods)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("middleware", &self.middleware.len())
            .field("attributes", &self.attributes())
            .finish()
    }
}

/// An in-memory [`RouteProvider`].
///
/// ```ignore
/// let routes = RouteCollection::new()
///     .route(RouteDefinition::get("/widgets/{id}", show_widget).name("widgets.show"))
///     .route(RouteDefinition::post("/widgets", create_widget));
/// let router = Router::new().with_provider(routes);
/// ```
#[derive(Clone, Default)]
pub struct RouteCollection {
    definitions: Vec<RouteDefinition>,
}

impl RouteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, definition: RouteDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn push(&mut self, definition: RouteDefinition) {
        self.definitions.push(definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl From<Vec<RouteDefinition>> for RouteCollection {
    fn from(definitions: Vec<RouteDefinition>) -> Self {
        Self { definitions }
    }
}

impl RouteProvider for RouteCollection {
    fn routes(&self) -> Result<Vec<RouteDefinition>> {
        Ok(self.definitions.clone())
    }
}
