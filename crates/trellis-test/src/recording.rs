//! In-memory registrars.

use std::collections::HashSet;

use trellis::{BoxError, Method, PlannedRoute, Registrar, RouteDescriptor};

use crate::error::RegistrarError;

/// One call to [`Registrar::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration<H> {
    /// Verb.
    pub method: Method,
    /// Route record as received.
    pub route: RouteDescriptor,
    /// Handler chain as received.
    pub handlers: Vec<H>,
}

impl<H> Registration<H> {
    /// Returns the registered path (or pattern source).
    #[must_use]
    pub fn path(&self) -> &str {
        self.route.path.as_str()
    }
}

impl<H> From<PlannedRoute<H>> for Registration<H> {
    fn from(planned: PlannedRoute<H>) -> Self {
        Self {
            method: planned.method,
            route: planned.route,
            handlers: planned.handlers,
        }
    }
}

/// A registrar that records every registration.
///
/// Paths added with [`RecordingRegistrar::reject`] are refused with
/// [`RegistrarError::Rejected`]; refused calls are counted but not recorded.
///
/// # Example
///
/// ```rust
/// use trellis::{Node, NodeConfig, RouteError};
/// use trellis_test::RecordingRegistrar;
///
/// let node = Node::new(NodeConfig::new().path("/dup").method("get").handler(1)).unwrap();
/// let mut server = RecordingRegistrar::new().reject("/dup");
///
/// let err = node.attach(&mut server).unwrap_err();
/// assert!(matches!(err, RouteError::AttachFailed { .. }));
/// assert_eq!(server.calls(), 1);
/// assert!(server.registrations().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RecordingRegistrar<H> {
    registrations: Vec<Registration<H>>,
    rejected: HashSet<String>,
    calls: usize,
}

impl<H> Default for RecordingRegistrar<H> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            rejected: HashSet::new(),
            calls: 0,
        }
    }
}

impl<H> RecordingRegistrar<H> {
    /// Creates an empty registrar that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses registrations at `path`.
    #[must_use]
    pub fn reject(mut self, path: impl Into<String>) -> Self {
        self.rejected.insert(path.into());
        self
    }

    /// Accepts every path again.
    pub fn accept_all(&mut self) {
        self.rejected.clear();
    }

    /// Returns the accepted registrations in order.
    #[must_use]
    pub fn registrations(&self) -> &[Registration<H>] {
        &self.registrations
    }

    /// Returns the accepted paths in order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.registrations.iter().map(Registration::path).collect()
    }

    /// Returns the number of register calls, refused ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Finds the registration for `method` at `path`.
    #[must_use]
    pub fn find(&self, method: Method, path: &str) -> Option<&Registration<H>> {
        self.registrations
            .iter()
            .find(|r| r.method == method && r.path() == path)
    }

    /// Counts registrations at `path`, any method.
    #[must_use]
    pub fn count(&self, path: &str) -> usize {
        self.registrations.iter().filter(|r| r.path() == path).count()
    }

    /// Forgets all registrations and calls.
    pub fn clear(&mut self) {
        self.registrations.clear();
        self.calls = 0;
    }
}

impl<H> Registrar<H> for RecordingRegistrar<H> {
    fn register(
        &mut self,
        method: Method,
        route: RouteDescriptor,
        handlers: Vec<H>,
    ) -> Result<(), BoxError> {
        self.calls += 1;

        if self.rejected.contains(route.path.as_str()) {
            return Err(Box::new(RegistrarError::Rejected {
                method,
                path: route.path.to_string(),
            }));
        }

        self.registrations.push(Registration {
            method,
            route,
            handlers,
        });
        Ok(())
    }
}

/// A registrar that refuses everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRegistrar {
    calls: usize,
}

impl FailingRegistrar {
    /// Creates a new failing registrar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of register calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl<H> Registrar<H> for FailingRegistrar {
    fn register(
        &mut self,
        method: Method,
        route: RouteDescriptor,
        _handlers: Vec<H>,
    ) -> Result<(), BoxError> {
        self.calls += 1;
        Err(Box::new(RegistrarError::Rejected {
            method,
            path: route.path.to_string(),
        }))
    }
}
