//! Error types for route-tree construction and attachment.

use std::path::PathBuf;
use thiserror::Error;

use crate::method::Method;

/// Boxed error returned by registrars.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using [`RouteError`].
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors that can occur while building or attaching a route tree.
#[derive(Error, Debug)]
pub enum RouteError {
    /// A field was given a value of the wrong shape (unknown verb, bad pattern).
    #[error("invalid route configuration for {field}: {reason}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A node with a method has no handlers.
    #[error("no handler given for {method} {path}")]
    MissingHandler {
        /// Method of the node.
        method: Method,
        /// Effective path of the node.
        path: String,
    },

    /// Something that is not a route was offered as a child.
    #[error("attempted to add something that is neither a route nor a group: {reason}")]
    InvalidChild {
        /// Description of the rejected value.
        reason: String,
    },

    /// The registrar refused a route.
    #[error("unable to add route {method} {path} (name: {name:?})")]
    AttachFailed {
        /// Method of the failing node.
        method: Method,
        /// Effective path of the failing node.
        path: String,
        /// Name of the failing node.
        name: String,
        /// Error raised by the registrar.
        #[source]
        source: BoxError,
    },

    /// A manifest references a handler the registry does not know.
    #[error("unknown handler in route manifest: {name}")]
    UnknownHandler {
        /// The handler name.
        name: String,
    },

    /// Failed to read a manifest file.
    #[error("failed to read route manifest: {path}")]
    ManifestRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Manifest file extension is neither `.toml` nor `.json`.
    #[error("unsupported route manifest format: {path}")]
    UnsupportedFormat {
        /// Path to the file.
        path: PathBuf,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML route manifest: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error, or a route table that does not match the schema.
    #[error("invalid route manifest: {0}")]
    Json(#[from] serde_json::Error),
}

impl RouteError {
    /// Create a new invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new missing handler error.
    pub fn missing_handler(method: Method, path: impl Into<String>) -> Self {
        Self::MissingHandler {
            method,
            path: path.into(),
        }
    }

    /// Create a new invalid child error.
    pub fn invalid_child(reason: impl Into<String>) -> Self {
        Self::InvalidChild {
            reason: reason.into(),
        }
    }

    /// Create a new unknown handler error.
    pub fn unknown_handler(name: impl Into<String>) -> Self {
        Self::UnknownHandler { name: name.into() }
    }

    /// Returns true if the error came from the registrar rather than from validation.
    #[must_use]
    pub fn is_attach_failure(&self) -> bool {
        matches!(self, Self::AttachFailed { .. })
    }
}
