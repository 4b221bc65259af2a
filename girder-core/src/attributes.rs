//! Typed attribute bag carried by every [`HttpRequest`](crate::HttpRequest).
//!
//! Middleware hands data downstream by inserting a value keyed by its own
//! type; the route match attached by
//! [`AttachRouteToRequest`](crate::AttachRouteToRequest) is stored here as a
//! [`RouteMatch`](crate::routing::RouteMatch), the log trace as a
//! [`LogTrace`](crate::LogTrace).
//!
//! Values are stored behind `Arc`, so cloning a request (the "attach returns a
//! new request" pattern) never deep-copies attributes.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct RequestAttributes {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl RequestAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.insert_arc(Arc::new(value));
    }

    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.map
            .insert(TypeId::of::<T>(), value as Arc<dyn Any + Send + Sync>);
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Remove and return the value of type `T`, if any.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<Arc<T>> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for RequestAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAttributes")
            .field("count", &self.map.len())
            .finish()
    }
}
