// Ordered, name-indexed list of route definitions

use super::RouteDefinition;
use crate::{Error, Result, RouteProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Every route definition known to the application, in registration order.
///
/// Built from an ordered list of providers: provider outputs are
/// concatenated in provider order, then in each provider's own order.
/// Names are unique across the whole list.
#[derive(Debug, Default)]
pub struct DefinitionList {
    definitions: Vec<Arc<RouteDefinition>>,
    by_name: HashMap<String, usize>,
}

impl DefinitionList {
    pub fn from_providers(providers: &[Arc<dyn RouteProvider>]) -> Result<Self> {
        let mut definitions = Vec::new();
        for provider in providers {
            definitions.extend(provider.routes()?);
        }
        Self::from_definitions(definitions)
    }

    pub fn from_definitions(definitions: Vec<RouteDefinition>) -> Result<Self> {
        let mut list = Self {
            definitions: Vec::with_capacity(definitions.len()),
            by_name: HashMap::new(),
        };

        for definition in definitions {
            if definition.methods().is_empty() {
                return Err(Error::Configuration(format!(
                    "route '{}' declares no HTTP methods",
                    definition.path()
                )));
            }

            let index = list.definitions.len();
            if let Some(name) = definition.route_name() {
                if list.by_name.insert(name.to_string(), index).is_some() {
                    return Err(Error::DuplicateRouteName(name.to_string()));
                }
            }
            list.definitions.push(Arc::new(definition));
        }

        debug!(
            routes = list.definitions.len(),
            named = list.by_name.len(),
            "Built route definition list"
        );
        Ok(list)
    }

    /// Look up a definition by its unique name.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<RouteDefinition>> {
        self.by_name
            .get(name)
            .map(|&index| Arc::clone(&self.definitions[index]))
            .ok_or_else(|| Error::RouteNotFoundByName(name.to_string()))
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<RouteDefinition>> {
        self.definitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl<'a> IntoIterator for &'a DefinitionList {
    type Item = &'a Arc<RouteDefinition>;
    type IntoIter = std::slice::Iter<'a, Arc<RouteDefinition>>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}
