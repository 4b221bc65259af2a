// Router: lazily compiled route resolution

use super::dispatcher::{Dispatch, Dispatcher};
use super::{DefinitionList, RouteDefinition, RouteMatch, RouterResult};
use crate::{Error, HttpMethod, Result, RouteProvider};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

struct CompiledRoutes {
    list: DefinitionList,
    dispatcher: Dispatcher,
}

/// Resolves requests and route names against the registered definitions.
///
/// Providers are consulted once. The definition list and the per-method
/// dispatcher are built on first use (or by [`warm_up`](Self::warm_up)) and
/// memoized for the router's lifetime; afterwards resolution takes no locks.
///
/// # Examples
///
/// ```ignore
/// let router = Router::new().with_provider(
///     RouteCollection::new()
///         .route(RouteDefinition::get("/widgets/{id}", show).name("widgets.show"))
///         .route(RouteDefinition::post("/widgets", create)),
/// );
///
/// let result = router.resolve_for_request("GET", "/widgets/42")?;
/// assert_eq!(result.route_match().param("id"), Some("42"));
/// ```
#[derive(Default)]
pub struct Router {
    providers: Vec<Arc<dyn RouteProvider>>,
    compiled: OnceCell<CompiledRoutes>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router over a fixed set of definitions.
    pub fn from_definitions(definitions: Vec<RouteDefinition>) -> Self {
        Self::new().with_provider(super::RouteCollection::from(definitions))
    }

    /// Append a provider. Providers added after the first resolution are
    /// not consulted.
    pub fn with_provider<P: RouteProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn with_provider_arc(mut self, provider: Arc<dyn RouteProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    fn compiled(&self) -> Result<&CompiledRoutes> {
        self.compiled.get_or_try_init(|| {
            let list = DefinitionList::from_providers(&self.providers)?;
            let dispatcher = Dispatcher::compile(&list)?;
            info!(
                routes = list.len(),
                methods = dispatcher.methods().count(),
                "Compiled route dispatcher"
            );
            Ok(CompiledRoutes { list, dispatcher })
        })
    }

    /// Build the definition list and dispatcher now instead of on the
    /// first request.
    pub fn warm_up(&self) -> Result<()> {
        self.compiled().map(|_| ())
    }

    /// The definition list, building it if needed.
    pub fn definitions(&self) -> Result<&DefinitionList> {
        self.compiled().map(|compiled| &compiled.list)
    }

    /// Resolve a request method and path. A query string in `path` is
    /// ignored.
    pub fn resolve_for_request(&self, method: &str, path: &str) -> Result<RouterResult> {
        let compiled = self.compiled()?;
        let path = path.split_once('?').map_or(path, |(path, _)| path);

        let result = match compiled.dispatcher.dispatch(HttpMethod::from_str(method), path) {
            Dispatch::Found { index, params } => {
                let definition = compiled.list.get(index).cloned().ok_or_else(|| {
                    Error::Internal(format!("dispatcher returned unknown route index {}", index))
                })?;
                RouterResult::Found(RouteMatch::new(definition, params))
            }
            Dispatch::NotFound => RouterResult::NotFound,
            Dispatch::MethodNotAllowed(allowed_methods) => {
                RouterResult::MethodNotAllowed { allowed_methods }
            }
        };

        debug!(method, path, outcome = ?Outcome(&result), "Resolved request");
        Ok(result)
    }

    /// Resolve a route by its registered name. Unknown names are
    /// `NotFound`, not an error.
    pub fn resolve_by_name(&self, name: &str) -> Result<RouterResult> {
        match self.definitions()?.get_by_name(name) {
            Ok(definition) => Ok(RouterResult::Found(RouteMatch::new(
                definition,
                HashMap::new(),
            ))),
            Err(Error::RouteNotFoundByName(_)) => Ok(RouterResult::NotFound),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("providers", &self.providers.len())
            .field("compiled", &self.compiled.get().is_some())
            .finish()
    }
}

struct Outcome<'a>(&'a RouterResult);

impl std::fmt::Debug for Outcome<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            RouterResult::Found(route_match) => {
                write!(f, "Found({})", route_match.definition().path())
            }
            RouterResult::NotFound => f.write_str("NotFound"),
            RouterResult::MethodNotAllowed { allowed_methods } => {
                write!(f, "MethodNotAllowed({:?})", allowed_methods)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpRequest, HttpResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn noop(_req: HttpRequest) -> Result<HttpResponse> {
        Ok(HttpResponse::no_content())
    }

    struct CountingProvider(Arc<AtomicUsize>);

    impl RouteProvider for CountingProvider {
        fn routes(&self) -> Result<Vec<RouteDefinition>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RouteDefinition::get("/", noop).name("home")])
        }
    }

    #[test]
    fn test_providers_consulted_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new().with_provider(CountingProvider(Arc::clone(&calls)));

        router.warm_up().unwrap();
        router.resolve_for_request("GET", "/").unwrap();
        router.resolve_by_name("home").unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_query_string_is_ignored() {
        let router = Router::from_definitions(vec![RouteDefinition::get("/search", noop)]);
        assert!(router
            .resolve_for_request("GET", "/search?q=widgets")
            .unwrap()
            .is_found());
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let router = Router::from_definitions(vec![RouteDefinition::get("/", noop)]);
        assert!(router.resolve_by_name("nope").unwrap().is_not_found());
    }

    #[test]
    fn test_build_failure_surfaces_on_every_call() {
        let router = Router::from_definitions(vec![
            RouteDefinition::get("/a", noop).name("dup"),
            RouteDefinition::get("/b", noop).name("dup"),
        ]);

        assert!(matches!(router.warm_up(), Err(Error::DuplicateRouteName(_))));
        assert!(matches!(
            router.resolve_for_request("GET", "/a"),
            Err(Error::DuplicateRouteName(_))
        ));
    }

    #[test]
    fn test_concurrent_first_access_builds_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Arc::new(Router::new().with_provider(CountingProvider(Arc::clone(&calls))));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let router = Arc::clone(&router);
                std::thread::spawn(move || router.resolve_for_request("GET", "/").unwrap().is_found())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
