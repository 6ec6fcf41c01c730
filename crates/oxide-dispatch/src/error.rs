//! Error types for routing and dispatch.

use thiserror::Error;

/// Boxed error returned by user code: handlers, predicates and containers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Router-specific errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid registration: namespace, handler spec, policy class,
    /// middleware entry or parameter declaration.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Invalid path template.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),

    /// No route matched the request.
    #[error("no matching route: {method} {path}")]
    NoMatch { method: String, path: String },

    /// The route policy denied the request.
    #[error("unauthorized route: {route}")]
    Unauthorized { route: String },

    /// The policy could not be evaluated.
    #[error("policy of route {route} failed: {source}")]
    Policy {
        route: String,
        #[source]
        source: Box<RouterError>,
    },

    /// A dependency needs the container but none is configured.
    #[error("missing router container: {dependency} can not be resolved without a container")]
    MissingContainer { dependency: String },

    /// The container could not provide a dependency.
    #[error("container failed to provide \"{key}\": {source}")]
    Container {
        key: String,
        #[source]
        source: BoxError,
    },

    /// A declared parameter could not be bound.
    #[error("can not resolve argument \"{parameter}\" passed to {target}")]
    UnresolvableParameter {
        parameter: String,
        target: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Route name not found.
    #[error("can not generate uri for unknown route \"{0}\"")]
    MissingRoute(String),

    /// URI generation failed.
    #[error(transparent)]
    Uri(#[from] UriError),

    /// Controller class or method does not exist.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// A handler or middleware returned an error.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl RouterError {
    /// Whether `Router::resolve` may turn this error into an absent result.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NoMatch { .. } | Self::Unauthorized { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// URI generation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    /// A bound parameter was not supplied.
    #[error("missing route parameter \"{parameter}\"")]
    Missing { parameter: String },

    /// A supplied value does not satisfy the bound regex.
    #[error(
        "parameter value \"{value}\" of route parameter \"{parameter}\" does not match required regex \"{regex}\""
    )]
    Mismatch {
        parameter: String,
        value: String,
        regex: String,
    },
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
