//! The server-facing registration surface.
//!
//! Trellis never talks to a concrete server. Attaching a route tree calls
//! [`Registrar::register`] once per endpoint with a [`RouteDescriptor`] and
//! the accumulated handler chain. Servers that expose one entry point per
//! verb can be adapted with a [`VerbTable`].

use serde::Serialize;
use thiserror::Error;

use crate::error::BoxError;
use crate::method::Method;
use crate::path::PathSpec;

/// The route record handed to the registrar ahead of the handler chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RouteDescriptor {
    /// Final path, prefixes already applied.
    pub path: PathSpec,
    /// API version tag, empty when unversioned.
    pub version: String,
    /// Route name, empty when unnamed.
    pub name: String,
}

/// A server that routes can be registered against.
///
/// # Example
///
/// ```rust
/// use trellis::{BoxError, Method, Registrar, RouteDescriptor};
///
/// #[derive(Default)]
/// struct Table(Vec<(Method, String, usize)>);
///
/// impl Registrar<&'static str> for Table {
///     fn register(
///         &mut self,
///         method: Method,
///         route: RouteDescriptor,
///         handlers: Vec<&'static str>,
///     ) -> Result<(), BoxError> {
///         self.0.push((method, route.path.to_string(), handlers.len()));
///         Ok(())
///     }
/// }
/// ```
pub trait Registrar<H> {
    /// Registers `handlers`, in call order, for `method` at `route.path`.
    fn register(
        &mut self,
        method: Method,
        route: RouteDescriptor,
        handlers: Vec<H>,
    ) -> Result<(), BoxError>;
}

impl<H, R> Registrar<H> for &mut R
where
    R: Registrar<H> + ?Sized,
{
    fn register(
        &mut self,
        method: Method,
        route: RouteDescriptor,
        handlers: Vec<H>,
    ) -> Result<(), BoxError> {
        (**self).register(method, route, handlers)
    }
}

impl<H, R> Registrar<H> for Box<R>
where
    R: Registrar<H> + ?Sized,
{
    fn register(
        &mut self,
        method: Method,
        route: RouteDescriptor,
        handlers: Vec<H>,
    ) -> Result<(), BoxError> {
        (**self).register(method, route, handlers)
    }
}

/// The registrar has no entry point for a verb.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("server has no registration entry point for {0}")]
pub struct UnsupportedVerb(pub Method);

/// A verb-specific registration function.
pub type RegisterFn<S, H> = fn(&mut S, RouteDescriptor, Vec<H>) -> Result<(), BoxError>;

/// Adapts a server with one registration function per verb.
///
/// Verbs without an entry fail with [`UnsupportedVerb`].
///
/// # Example
///
/// ```rust
/// use trellis::{Method, Node, NodeConfig, VerbTable};
///
/// #[derive(Default)]
/// struct Server {
///     gets: Vec<String>,
/// }
///
/// let mut table = VerbTable::new(Server::default()).get(|server, route, _handlers: Vec<u8>| {
///     server.gets.push(route.path.to_string());
///     Ok(())
/// });
///
/// let node = Node::new(NodeConfig::new().path("/hello").method("get").handler(1u8)).unwrap();
/// node.attach(&mut table).unwrap();
///
/// assert_eq!(table.into_inner().gets, vec!["/hello".to_string()]);
/// ```
pub struct VerbTable<S, H> {
    server: S,
    get: Option<RegisterFn<S, H>>,
    post: Option<RegisterFn<S, H>>,
    put: Option<RegisterFn<S, H>>,
    patch: Option<RegisterFn<S, H>>,
    delete: Option<RegisterFn<S, H>>,
    head: Option<RegisterFn<S, H>>,
    options: Option<RegisterFn<S, H>>,
    trace: Option<RegisterFn<S, H>>,
    connect: Option<RegisterFn<S, H>>,
}

impl<S, H> VerbTable<S, H> {
    /// Creates a table with no entry points.
    #[must_use]
    pub fn new(server: S) -> Self {
        Self {
            server,
            get: None,
            post: None,
            put: None,
            patch: None,
            delete: None,
            head: None,
            options: None,
            trace: None,
            connect: None,
        }
    }

    /// Sets the GET entry point.
    #[must_use]
    pub fn get(self, f: RegisterFn<S, H>) -> Self {
        self.method(Method::Get, f)
    }

    /// Sets the POST entry point.
    #[must_use]
    pub fn post(self, f: RegisterFn<S, H>) -> Self {
        self.method(Method::Post, f)
    }

    /// Sets the PUT entry point.
    #[must_use]
    pub fn put(self, f: RegisterFn<S, H>) -> Self {
        self.method(Method::Put, f)
    }

    /// Sets the PATCH entry point.
    #[must_use]
    pub fn patch(self, f: RegisterFn<S, H>) -> Self {
        self.method(Method::Patch, f)
    }

    /// Sets the DELETE entry point.
    #[must_use]
    pub fn delete(self, f: RegisterFn<S, H>) -> Self {
        self.method(Method::Delete, f)
    }

    /// Sets the HEAD entry point.
    #[must_use]
    pub fn head(self, f: RegisterFn<S, H>) -> Self {
        self.method(Method::Head, f)
    }

    /// Sets the OPTIONS entry point.
    #[must_use]
    pub fn options(self, f: RegisterFn<S, H>) -> Self {
        self.method(Method::Options, f)
    }

    /// Sets the entry point for any verb.
    #[must_use]
    pub fn method(mut self, method: Method, f: RegisterFn<S, H>) -> Self {
        *self.slot_mut(method) = Some(f);
        self
    }

    /// Returns the entry point for a verb.
    #[must_use]
    pub fn entry(&self, method: Method) -> Option<RegisterFn<S, H>> {
        match method {
            Method::Get => self.get,
            Method::Post => self.post,
            Method::Put => self.put,
            Method::Patch => self.patch,
            Method::Delete => self.delete,
            Method::Head => self.head,
            Method::Options => self.options,
            Method::Trace => self.trace,
            Method::Connect => self.connect,
        }
    }

    /// Returns the verbs with an entry point.
    #[must_use]
    pub fn supported_methods(&self) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| self.entry(*m).is_some())
            .collect()
    }

    /// Returns the wrapped server.
    pub fn server(&self) -> &S {
        &self.server
    }

    /// Returns the wrapped server mutably.
    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    /// Consumes the table, returning the server.
    pub fn into_inner(self) -> S {
        self.server
    }

    fn slot_mut(&mut self, method: Method) -> &mut Option<RegisterFn<S, H>> {
        match method {
            Method::Get => &mut self.get,
            Method::Post => &mut self.post,
            Method::Put => &mut self.put,
            Method::Patch => &mut self.patch,
            Method::Delete => &mut self.delete,
            Method::Head => &mut self.head,
            Method::Options => &mut self.options,
            Method::Trace => &mut self.trace,
            Method::Connect => &mut self.connect,
        }
    }
}

impl<S, H> Registrar<H> for VerbTable<S, H> {
    fn register(
        &mut self,
        method: Method,
        route: RouteDescriptor,
        handlers: Vec<H>,
    ) -> Result<(), BoxError> {
        let f = self.entry(method).ok_or(UnsupportedVerb(method))?;
        f(&mut self.server, route, handlers)
    }
}

impl<S: std::fmt::Debug, H> std::fmt::Debug for VerbTable<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerbTable")
            .field("server", &self.server)
            .field("methods", &self.supported_methods())
            .finish()
    }
}
