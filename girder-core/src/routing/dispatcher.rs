// Compiled per-method radix trees over a definition list

use super::DefinitionList;
use crate::{Error, HttpMethod, Result};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;

/// Outcome of a dispatch against the compiled trees.
#[derive(Debug, PartialEq)]
pub(crate) enum Dispatch {
    Found {
        index: usize,
        params: HashMap<String, String>,
    },
    NotFound,
    MethodNotAllowed(Vec<HttpMethod>),
}

/// One `matchit` tree per method, each value an index into the
/// [`DefinitionList`] the dispatcher was compiled from.
///
/// Trees are kept in the order their method was first seen while walking
/// the list, which fixes the order of `MethodNotAllowed` listings.
pub(crate) struct Dispatcher {
    trees: Vec<(HttpMethod, MatchitRouter<usize>)>,
}

impl Dispatcher {
    pub(crate) fn compile(list: &DefinitionList) -> Result<Self> {
        let mut trees: Vec<(HttpMethod, MatchitRouter<usize>)> = Vec::new();

        for (index, definition) in list.iter().enumerate() {
            for &method in definition.methods() {
                let position = match trees.iter().position(|(m, _)| *m == method) {
                    Some(position) => position,
                    None => {
                        trees.push((method, MatchitRouter::new()));
                        trees.len() - 1
                    }
                };

                trees[position]
                    .1
                    .insert(definition.path(), index)
                    .map_err(|e| Error::RouteConflict {
                        method: method.to_string(),
                        path: definition.path().to_string(),
                        reason: e.to_string(),
                    })?;
            }
        }

        Ok(Self { trees })
    }

    /// Match `path` for `method`; `None` is a method string no route can
    /// be registered under.
    pub(crate) fn dispatch(&self, method: Option<HttpMethod>, path: &str) -> Dispatch {
        if let Some(method) = method {
            if let Some(found) = self.lookup(method, path) {
                return found;
            }
            if method == HttpMethod::HEAD {
                if let Some(found) = self.lookup(HttpMethod::GET, path) {
                    return found;
                }
            }
        }

        let allowed: Vec<HttpMethod> = self
            .trees
            .iter()
            .filter(|(m, _)| Some(*m) != method)
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(m, _)| *m)
            .collect();

        if allowed.is_empty() {
            Dispatch::NotFound
        } else {
            Dispatch::MethodNotAllowed(allowed)
        }
    }

    fn lookup(&self, method: HttpMethod, path: &str) -> Option<Dispatch> {
        let (_, tree) = self.trees.iter().find(|(m, _)| *m == method)?;
        let matched = tree.at(path).ok()?;
        let params = matched
            .params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Some(Dispatch::Found {
            index: *matched.value,
            params,
        })
    }

    pub(crate) fn methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.trees.iter().map(|(method, _)| *method)
    }
}
