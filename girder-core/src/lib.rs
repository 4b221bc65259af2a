// Core library for the Girder HTTP layer
// Routing, middleware, exceptional responses and response emitters

pub mod attributes;
pub mod content_negotiation;
pub mod emitter;
pub mod error;
pub mod error_transform;
pub mod exception;
pub mod http;
pub mod log_trace;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod routing;
pub mod settings;
pub mod sse;
pub mod status;
pub mod streaming;
pub mod traits;

// Re-export commonly used types
pub use attributes::*;
pub use content_negotiation::*;
pub use emitter::*;
pub use error::*;
pub use error_transform::*;
pub use exception::*;
pub use http::*;
pub use log_trace::*;
pub use middleware::*;
pub use pipeline::*;
pub use routing::*;
pub use settings::{Configuration, HttpSettings};
pub use sse::*;
pub use status::*;
pub use streaming::*;
pub use traits::*;
