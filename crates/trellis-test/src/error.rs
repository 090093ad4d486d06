//! Registrar error types.

use thiserror::Error;
use trellis::Method;

/// Errors raised by the in-memory registrars.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrarError {
    /// The registrar was told to refuse this route.
    #[error("route rejected: {method} {path}")]
    Rejected {
        /// Verb of the refused route.
        method: Method,
        /// Path of the refused route.
        path: String,
    },
}
