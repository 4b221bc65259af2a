// Routing outcomes

use super::RouteDefinition;
use crate::HttpMethod;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A successful match: the registered definition plus what the path captured.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    definition: Arc<RouteDefinition>,
    path_parameters: HashMap<String, String>,
    merged_attributes: BTreeMap<String, Value>,
}

impl RouteMatch {
    /// Build a match; captured parameters are overlaid on the definition's
    /// attributes and win on key collision.
    pub fn new(definition: Arc<RouteDefinition>, path_parameters: HashMap<String, String>) -> Self {
        let mut merged_attributes = definition.attributes();
        for (key, value) in &path_parameters {
            merged_attributes.insert(key.clone(), Value::String(value.clone()));
        }

        Self {
            definition,
            path_parameters,
            merged_attributes,
        }
    }

    pub fn definition(&self) -> &Arc<RouteDefinition> {
        &self.definition
    }

    pub fn path_parameters(&self) -> &HashMap<String, String> {
        &self.path_parameters
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_parameters.get(name).map(String::as_str)
    }

    pub fn merged_attributes(&self) -> &BTreeMap<String, Value> {
        &self.merged_attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.merged_attributes.get(key)
    }

    pub fn route_name(&self) -> Option<&str> {
        self.definition.route_name()
    }
}

/// Outcome of resolving a request or a route name.
#[derive(Debug, Clone)]
pub enum RouterResult {
    Found(RouteMatch),
    NotFound,
    /// The path matched, but only under other methods.
    MethodNotAllowed { allowed_methods: Vec<HttpMethod> },
}

impl RouterResult {
    pub fn is_found(&self) -> bool {
        matches!(self, RouterResult::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RouterResult::NotFound)
    }

    pub fn is_method_not_allowed(&self) -> bool {
        matches!(self, RouterResult::MethodNotAllowed { .. })
    }

    /// The match of a `Found` result.
    ///
    /// # Panics
    ///
    /// Panics on `NotFound` and `MethodNotAllowed`. Check [`is_found`](Self::is_found)
    /// first or use [`as_route_match`](Self::as_route_match).
    pub fn route_match(&self) -> &RouteMatch {
        match self {
            RouterResult::Found(route_match) => route_match,
            other => panic!(
                "route_match() called on a {} routing result",
                other.kind()
            ),
        }
    }

    pub fn as_route_match(&self) -> Option<&RouteMatch> {
        match self {
            RouterResult::Found(route_match) => Some(route_match),
            _ => None,
        }
    }

    pub fn into_route_match(self) -> Option<RouteMatch> {
        match self {
            RouterResult::Found(route_match) => Some(route_match),
            _ => None,
        }
    }

    /// Methods the path accepts; empty unless `MethodNotAllowed`.
    pub fn allowed_methods(&self) -> &[HttpMethod] {
        match self {
            RouterResult::MethodNotAllowed { allowed_methods } => allowed_methods,
            _ => &[],
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RouterResult::Found(_) => "Found",
            RouterResult::NotFound => "NotFound",
            RouterResult::MethodNotAllowed { .. } => "MethodNotAllowed",
        }
    }
}
