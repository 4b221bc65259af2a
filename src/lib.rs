// Girder - HTTP routing and exceptional-response layer for Rust
//
// Resolves requests against compiled route tables, answers CORS preflight and
// 405 requests, renders failures as problem details or plain text, and writes
// responses through buffered, chunked or server-sent-event emitters.

// Re-export core functionality
pub use girder_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use girder_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Configuration,
        Error,
        ErrorFormat,
        HttpExceptionResponse,
        HttpMethod,
        HttpPipeline,
        HttpPipelineBuilder,
        HttpRequest,
        HttpResponse,
        HttpSettings,
        LogTrace,
        Middleware,
        Next,
        RequestHandler,
        Result,
        RouteCollection,
        RouteDefinition,
        RouteMatch,
        RouteProvider,
        Router,
        RouterResult,
    };

    pub use crate::logging::{LogConfig, LogFormat, LogLevel, debug, error, info, trace, warn};

    #[cfg(feature = "config")]
    pub use girder_config::{ConfigManager, ConfigService};

    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
}
