//! Request routing.
//!
//! Route definitions come from [`RouteProvider`](crate::RouteProvider)s and
//! are collected into a [`DefinitionList`]. The [`Router`] compiles the list
//! into one radix tree per HTTP method on first use and resolves requests to
//! a [`RouterResult`]:
//!
//! - `Found`: the matched definition and captured path parameters
//! - `MethodNotAllowed`: the path exists, but only under other methods
//! - `NotFound`: nothing matched
//!
//! Routes are registered with matchit syntax: `{id}` captures a segment,
//! `{*rest}` captures the remainder of the path. Static segments take
//! priority over parameters.

mod attach;
mod definition;
mod definition_list;
mod dispatch;
mod dispatcher;
mod result;
mod router;

pub use attach::{AttachRouteToRequest, DEFAULT_PREFLIGHT_MAX_AGE, attach_route, preflight_response};
pub use definition::{RouteCollection, RouteDefinition};
pub use definition_list::DefinitionList;
pub use dispatch::{DispatchRoute, NotFoundHandler};
pub use result::{RouteMatch, RouterResult};
pub use router::Router;
