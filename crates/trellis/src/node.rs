//! Route tree nodes.
//!
//! A [`Node`] is both a route and a group: it may carry a method and a
//! handler chain of its own, and it may hold children whose paths are
//! prefixed with its path and whose handler chains are prefixed with its
//! handlers. [`Node::attach`] flattens the tree onto a [`Registrar`].

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{RouteError, RouteResult};
use crate::method::Method;
use crate::path::{merge_paths, PathSpec};
use crate::registrar::{Registrar, RouteDescriptor};

/// Construction parameters for a [`Node`].
///
/// # Example
///
/// ```rust
/// use trellis::{Method, Node, NodeConfig};
///
/// let node = Node::new(
///     NodeConfig::new()
///         .name("hello")
///         .version("1.0.0")
///         .path(" /hello ")
///         .method("GET")
///         .handler("say_hello"),
/// )
/// .unwrap();
///
/// assert_eq!(node.method(), Some(Method::Get));
/// assert_eq!(node.path().as_str(), "/hello");
/// ```
#[derive(Debug, Clone)]
pub struct NodeConfig<H> {
    /// Informational label.
    pub name: String,
    /// Version tag passed to the registrar.
    pub version: String,
    /// Literal path or pattern.
    pub path: PathSpec,
    /// Verb; empty for a pure container.
    pub method: String,
    /// Handler chain in call order.
    pub handlers: Vec<H>,
}

impl<H> Default for NodeConfig<H> {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: String::new(),
            path: PathSpec::default(),
            method: String::new(),
            handlers: Vec::new(),
        }
    }
}

impl<H> NodeConfig<H> {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the version tag.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the path.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathSpec>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Appends a single handler.
    #[must_use]
    pub fn handler(mut self, handler: H) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Appends a sequence of handlers.
    #[must_use]
    pub fn handlers(mut self, handlers: impl IntoIterator<Item = H>) -> Self {
        self.handlers.extend(handlers);
        self
    }
}

/// Outcome of [`Node::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStatus {
    /// The node (and its subtree) was registered by this call.
    Attached,
    /// The node was already attached; nothing was registered.
    AlreadyAttached,
}

/// Progress of a node through [`Node::attach`].
///
/// A node moves `Unattached -> Attaching -> Attached`. A failure below the
/// node leaves it `Registered`: its own route is in place, and the next
/// attach pass re-enters it to finish the subtree without registering it
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttachState {
    /// Not registered, or its registration failed.
    Unattached = 0,
    /// An attach pass is inside this node's subtree.
    Attaching = 1,
    /// Registered, but part of the subtree is not.
    Registered = 2,
    /// The node and its whole subtree are registered.
    Attached = 3,
}

impl AttachState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Attaching,
            2 => Self::Registered,
            3 => Self::Attached,
            _ => Self::Unattached,
        }
    }
}

/// A registration [`Node::plan`] expects [`Node::attach`] to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRoute<H> {
    /// Verb.
    pub method: Method,
    /// Route record.
    pub route: RouteDescriptor,
    /// Effective handler chain.
    pub handlers: Vec<H>,
}

/// A node in a route tree.
///
/// `Node` is a shared handle: cloning it yields another handle to the same
/// node, which is how a subtree is grafted under more than one parent. Each
/// node is registered at most once; later visits (including a node reached
/// through itself) are skipped.
///
/// # Example
///
/// ```rust
/// use trellis::{Node, NodeConfig};
///
/// let api = Node::new(NodeConfig::new().name("api").path("/api")).unwrap();
/// let get_name = Node::new(
///     NodeConfig::new().path(":name").method("get").handler("name"),
/// )
/// .unwrap();
/// get_name.add_route(
///     Node::new(NodeConfig::new().path(":place").method("get").handler("place")).unwrap(),
/// );
/// api.add_route(get_name);
///
/// let plan = api.plan().unwrap();
/// assert_eq!(plan[0].route.path.as_str(), "/api/:name");
/// assert_eq!(plan[1].route.path.as_str(), "/api/:name/:place");
/// assert_eq!(plan[1].handlers, vec!["name", "place"]);
/// ```
pub struct Node<H> {
    inner: Arc<Inner<H>>,
}

struct Inner<H> {
    state: RwLock<State<H>>,
    phase: AtomicU8,
}

#[derive(Clone)]
struct State<H> {
    name: String,
    version: String,
    path: PathSpec,
    method: Option<Method>,
    handlers: Vec<H>,
    children: Vec<Node<H>>,
}

/// Path and handler chain of a node after its ancestors are applied.
struct Resolved<H> {
    path: PathSpec,
    handlers: Vec<H>,
}

impl<H> Clone for Node<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H> Default for Node<H> {
    fn default() -> Self {
        Self::from_state(State {
            name: String::new(),
            version: String::new(),
            path: PathSpec::default(),
            method: None,
            handlers: Vec::new(),
            children: Vec::new(),
        })
    }
}

impl<H> fmt::Debug for Node<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // children may loop back to this node, so only counts are printed
        let state = self.inner.state.read();
        f.debug_struct("Node")
            .field("name", &state.name)
            .field("version", &state.version)
            .field("path", &state.path)
            .field("method", &state.method)
            .field("handlers", &state.handlers.len())
            .field("children", &state.children.len())
            .field("state", &self.attach_state())
            .finish()
    }
}

impl<H> Node<H> {
    /// Creates a node from a configuration.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidConfig`] if the method is not a known verb
    /// - [`RouteError::MissingHandler`] if a method is set without handlers
    pub fn new(config: NodeConfig<H>) -> RouteResult<Self> {
        let method = Method::parse_optional(&config.method)?;
        let path = match config.path {
            PathSpec::Literal(path) => PathSpec::literal(path),
            pattern @ PathSpec::Pattern(_) => pattern,
        };

        if let Some(method) = method {
            if config.handlers.is_empty() {
                return Err(RouteError::missing_handler(method, path.as_str()));
            }
        }

        Ok(Self::from_state(State {
            name: config.name,
            version: config.version,
            path,
            method,
            handlers: config.handlers,
            children: Vec::new(),
        }))
    }

    /// Creates an empty container node.
    #[must_use]
    pub fn container() -> Self {
        Self::default()
    }

    /// Creates an anonymous container holding `children`.
    ///
    /// Used to adopt externally built subtrees under a fresh parent.
    #[must_use]
    pub fn group(children: impl IntoIterator<Item = Node<H>>) -> Self {
        let root = Self::container();
        root.add_routes(children);
        root
    }

    fn from_state(state: State<H>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                phase: AtomicU8::new(AttachState::Unattached as u8),
            }),
        }
    }

    /// Appends a child.
    pub fn add_route(&self, child: Node<H>) -> &Self {
        self.inner.state.write().children.push(child);
        self
    }

    /// Appends children in order.
    pub fn add_routes(&self, children: impl IntoIterator<Item = Node<H>>) -> &Self {
        for child in children {
            self.add_route(child);
        }
        self
    }

    /// Appends a handler to the end of the chain.
    pub fn add_handler(&self, handler: H) -> &Self {
        self.inner.state.write().handlers.push(handler);
        self
    }

    /// Replaces the path.
    pub fn set_path(&self, path: impl Into<PathSpec>) -> &Self {
        let path = match path.into() {
            PathSpec::Literal(path) => PathSpec::literal(path),
            pattern @ PathSpec::Pattern(_) => pattern,
        };
        self.inner.state.write().path = path;
        self
    }

    /// Replaces the path with a compiled pattern.
    ///
    /// The path is left untouched if `source` does not compile.
    pub fn set_pattern(&self, source: &str) -> RouteResult<&Self> {
        let pattern = PathSpec::pattern(source)?;
        self.inner.state.write().path = pattern;
        Ok(self)
    }

    /// Prepends `prefix` to the current path.
    pub fn set_prefix(&self, prefix: impl Into<PathSpec>) -> RouteResult<&Self> {
        let prefix = prefix.into();
        let mut state = self.inner.state.write();
        state.path = merge_paths(&prefix, &state.path)?;
        Ok(self)
    }

    /// Sets the name.
    pub fn set_name(&self, name: impl Into<String>) -> &Self {
        self.inner.state.write().name = name.into();
        self
    }

    /// Sets the version tag.
    pub fn set_version(&self, version: impl Into<String>) -> &Self {
        self.inner.state.write().version = version.into();
        self
    }

    /// Sets the method; an empty string turns the node into a container.
    ///
    /// The method is left untouched if `method` is not a known verb.
    pub fn set_method(&self, method: &str) -> RouteResult<&Self> {
        let method = Method::parse_optional(method)?;
        self.inner.state.write().method = method;
        Ok(self)
    }

    /// Sets method and path in one call.
    pub fn route(&self, method: Method, path: impl Into<PathSpec>) -> &Self {
        self.inner.state.write().method = Some(method);
        self.set_path(path)
    }

    /// Makes this a GET route at `path`.
    pub fn get(&self, path: impl Into<PathSpec>) -> &Self {
        self.route(Method::Get, path)
    }

    /// Makes this a POST route at `path`.
    pub fn post(&self, path: impl Into<PathSpec>) -> &Self {
        self.route(Method::Post, path)
    }

    /// Makes this a PUT route at `path`.
    pub fn put(&self, path: impl Into<PathSpec>) -> &Self {
        self.route(Method::Put, path)
    }

    /// Makes this a PATCH route at `path`.
    pub fn patch(&self, path: impl Into<PathSpec>) -> &Self {
        self.route(Method::Patch, path)
    }

    /// Makes this a DELETE route at `path`.
    pub fn delete(&self, path: impl Into<PathSpec>) -> &Self {
        self.route(Method::Delete, path)
    }

    /// Makes this a HEAD route at `path`.
    pub fn head(&self, path: impl Into<PathSpec>) -> &Self {
        self.route(Method::Head, path)
    }

    /// Makes this an OPTIONS route at `path`.
    pub fn options(&self, path: impl Into<PathSpec>) -> &Self {
        self.route(Method::Options, path)
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.state.read().name.clone()
    }

    /// Returns the version tag.
    #[must_use]
    pub fn version(&self) -> String {
        self.inner.state.read().version.clone()
    }

    /// Returns the stored (unprefixed) path.
    #[must_use]
    pub fn path(&self) -> PathSpec {
        self.inner.state.read().path.clone()
    }

    /// Returns the method, `None` for containers.
    #[must_use]
    pub fn method(&self) -> Option<Method> {
        self.inner.state.read().method
    }

    /// Returns true if the node has no method of its own.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.method().is_none()
    }

    /// Returns handles to the children, in insertion order.
    #[must_use]
    pub fn children(&self) -> Vec<Node<H>> {
        self.inner.state.read().children.clone()
    }

    /// Returns the number of own handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.state.read().handlers.len()
    }

    /// Returns where the node is in the attach state machine.
    #[must_use]
    pub fn attach_state(&self) -> AttachState {
        AttachState::from_u8(self.inner.phase.load(Ordering::Acquire))
    }

    /// Returns true once the node and its whole subtree are registered.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attach_state() == AttachState::Attached
    }

    /// Returns true if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns this node and every node below it to [`AttachState::Unattached`].
    ///
    /// Needed before attaching the same tree to a second server.
    pub fn reset_attachment(&self) {
        let mut seen = HashSet::new();
        self.reset_inner(&mut seen);
    }

    fn reset_inner(&self, seen: &mut HashSet<*const ()>) {
        if !seen.insert(self.id()) {
            return;
        }
        self.set_state(AttachState::Unattached);
        for child in self.children() {
            child.reset_inner(seen);
        }
    }

    fn id(&self) -> *const () {
        Arc::as_ptr(&self.inner).cast()
    }

    fn set_state(&self, state: AttachState) {
        self.inner.phase.store(state as u8, Ordering::Release);
    }

    /// Moves the node to `Attaching` and returns the state it left, or
    /// `None` if another pass owns it or it is already attached.
    fn begin_attach(&self) -> Option<AttachState> {
        let mut current = self.inner.phase.load(Ordering::Acquire);
        loop {
            let previous = AttachState::from_u8(current);
            if matches!(previous, AttachState::Attaching | AttachState::Attached) {
                return None;
            }
            match self.inner.phase.compare_exchange_weak(
                current,
                AttachState::Attaching as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(previous),
                Err(actual) => current = actual,
            }
        }
    }
}

impl<H: Clone> Node<H> {
    /// Returns a copy of the node's own handler chain.
    #[must_use]
    pub fn handlers(&self) -> Vec<H> {
        self.inner.state.read().handlers.clone()
    }

    /// Registers this node and its subtree with `registrar`.
    ///
    /// Traversal is depth-first in insertion order. Each child is registered
    /// under `merge_paths(parent path, child path)` with the parent's chain
    /// in front of its own. Stored paths and chains are never modified.
    ///
    /// A node that is already attached, or that the current pass is still
    /// inside, is skipped, which also breaks cycles. Registration is not
    /// atomic: when a registration fails, routes registered earlier in the
    /// traversal stay registered. Use [`Node::plan`] to validate the whole
    /// tree first.
    ///
    /// # Errors
    ///
    /// - [`RouteError::MissingHandler`] if a node with a method ends up with
    ///   an empty chain; the registrar is not called
    /// - [`RouteError::AttachFailed`] if the registrar rejects a route
    /// - [`RouteError::InvalidConfig`] if a merged pattern does not compile
    ///
    /// Calling `attach` again on the same root resumes: nodes already
    /// registered are not registered twice, and the failed part of the tree
    /// is registered under its full path and chain.
    pub fn attach<R>(&self, registrar: &mut R) -> RouteResult<AttachStatus>
    where
        R: Registrar<H> + ?Sized,
    {
        self.attach_under(registrar, None)
    }

    fn attach_under<R>(
        &self,
        registrar: &mut R,
        parent: Option<&Resolved<H>>,
    ) -> RouteResult<AttachStatus>
    where
        R: Registrar<H> + ?Sized,
    {
        let Some(previous) = self.begin_attach() else {
            debug!(path = %self.path(), "Route already attached, skipping");
            return Ok(AttachStatus::AlreadyAttached);
        };

        // snapshot so no lock is held across registrar calls or recursion
        let state = self.inner.state.read().clone();

        let resolved = match state.resolve(parent) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.set_state(previous);
                return Err(e);
            }
        };

        if previous == AttachState::Registered {
            debug!(path = %resolved.path, "Resuming partially attached route");
        } else if let Some(method) = state.method {
            if let Err(e) = self.register(registrar, method, &state, &resolved) {
                self.set_state(AttachState::Unattached);
                return Err(e);
            }
        } else {
            debug!(path = %resolved.path, children = state.children.len(), "Attaching route group");
        }

        for child in &state.children {
            if let Err(e) = child.attach_under(registrar, Some(&resolved)) {
                self.set_state(AttachState::Registered);
                return Err(e);
            }
        }

        self.set_state(AttachState::Attached);
        Ok(AttachStatus::Attached)
    }

    fn register<R>(
        &self,
        registrar: &mut R,
        method: Method,
        state: &State<H>,
        resolved: &Resolved<H>,
    ) -> RouteResult<()>
    where
        R: Registrar<H> + ?Sized,
    {
        if resolved.handlers.is_empty() {
            return Err(RouteError::missing_handler(method, resolved.path.as_str()));
        }

        let route = state.descriptor(&resolved.path);

        info!(
            http.method = %method,
            http.path = %resolved.path,
            route.name = %state.name,
            route.version = %state.version,
            "Attaching route"
        );

        registrar
            .register(method, route, resolved.handlers.clone())
            .map_err(|source| {
                warn!(
                    http.method = %method,
                    http.path = %resolved.path,
                    error = %source,
                    "Route registration failed"
                );
                RouteError::AttachFailed {
                    method,
                    path: resolved.path.to_string(),
                    name: state.name.clone(),
                    source,
                }
            })
    }

    /// Computes the registrations [`Node::attach`] would make on a fresh tree.
    ///
    /// Attach states are neither read nor written; shared nodes are visited
    /// once, as during attach.
    ///
    /// # Errors
    ///
    /// Returns the first [`RouteError::MissingHandler`] or
    /// [`RouteError::InvalidConfig`] found.
    pub fn plan(&self) -> RouteResult<Vec<PlannedRoute<H>>> {
        let mut planned = Vec::new();
        let mut seen = HashSet::new();
        self.plan_under(None, &mut seen, &mut planned)?;
        Ok(planned)
    }

    fn plan_under(
        &self,
        parent: Option<&Resolved<H>>,
        seen: &mut HashSet<*const ()>,
        planned: &mut Vec<PlannedRoute<H>>,
    ) -> RouteResult<()> {
        if !seen.insert(self.id()) {
            return Ok(());
        }

        let state = self.inner.state.read().clone();
        let resolved = state.resolve(parent)?;

        if let Some(method) = state.method {
            if resolved.handlers.is_empty() {
                return Err(RouteError::missing_handler(method, resolved.path.as_str()));
            }
            planned.push(PlannedRoute {
                method,
                route: state.descriptor(&resolved.path),
                handlers: resolved.handlers.clone(),
            });
        }

        for child in &state.children {
            child.plan_under(Some(&resolved), seen, planned)?;
        }
        Ok(())
    }
}

impl<H: Clone> State<H> {
    fn resolve(&self, parent: Option<&Resolved<H>>) -> RouteResult<Resolved<H>> {
        match parent {
            None => Ok(Resolved {
                path: self.path.clone(),
                handlers: self.handlers.clone(),
            }),
            Some(parent) => {
                let path = merge_paths(&parent.path, &self.path)?;
                let mut handlers = Vec::with_capacity(parent.handlers.len() + self.handlers.len());
                handlers.extend(parent.handlers.iter().cloned());
                handlers.extend(self.handlers.iter().cloned());
                Ok(Resolved { path, handlers })
            }
        }
    }

    fn descriptor(&self, path: &PathSpec) -> RouteDescriptor {
        RouteDescriptor {
            path: path.clone(),
            version: self.version.clone(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;

    type Record = (Method, String, Vec<&'static str>);

    /// Records registrations; fails for paths listed in `reject`.
    #[derive(Default)]
    struct Recorder {
        routes: Vec<Record>,
        descriptors: Vec<RouteDescriptor>,
        reject: Vec<String>,
        calls: usize,
    }

    impl Registrar<&'static str> for Recorder {
        fn register(
            &mut self,
            method: Method,
            route: RouteDescriptor,
            handlers: Vec<&'static str>,
        ) -> Result<(), BoxError> {
            self.calls += 1;
            let path = route.path.to_string();
            if self.reject.contains(&path) {
                return Err(format!("route {path} rejected").into());
            }
            self.routes.push((method, path, handlers));
            self.descriptors.push(route);
            Ok(())
        }
    }

    fn route(path: &str, method: &str, handlers: &[&'static str]) -> Node<&'static str> {
        Node::new(
            NodeConfig::new()
                .path(path)
                .method(method)
                .handlers(handlers.iter().copied()),
        )
        .unwrap()
    }

    fn group(path: &str) -> Node<&'static str> {
        Node::new(NodeConfig::new().path(path)).unwrap()
    }

    fn record(method: Method, path: &str, handlers: &[&'static str]) -> Record {
        (method, path.to_string(), handlers.to_vec())
    }

    #[test]
    fn test_new_normalizes_method_and_path() {
        let node = route("  /hello  ", "GET", &["h"]);
        assert_eq!(node.method(), Some(Method::Get));
        assert_eq!(node.path().as_str(), "/hello");
        assert!(!node.is_container());
        assert!(!node.is_attached());
    }

    #[test]
    fn test_new_single_handler_and_sequence() {
        let single = Node::new(NodeConfig::new().method("get").handler("a")).unwrap();
        assert_eq!(single.handlers(), vec!["a"]);

        let many = Node::new(NodeConfig::new().method("get").handlers(["a", "b"])).unwrap();
        assert_eq!(many.handlers(), vec!["a", "b"]);
    }

    #[test]
    fn test_new_method_without_handler() {
        let err = Node::<&str>::new(NodeConfig::new().path("/x").method("post")).unwrap_err();
        assert!(matches!(
            err,
            RouteError::MissingHandler { method: Method::Post, ref path } if path == "/x"
        ));
    }

    #[test]
    fn test_new_unknown_method() {
        let err = Node::new(NodeConfig::new().method("fetch").handler("h")).unwrap_err();
        assert!(matches!(err, RouteError::InvalidConfig { .. }));
    }

    #[test]
    fn test_new_without_method_is_container() {
        let node = Node::<&str>::new(NodeConfig::new().path("/api")).unwrap();
        assert!(node.is_container());
        assert_eq!(node.handler_count(), 0);
    }

    #[test]
    fn test_add_routes_preserves_order() {
        let parent = group("/p");
        let a = route("a", "get", &["a"]);
        let b = route("b", "get", &["b"]);
        let c = route("c", "get", &["c"]);

        parent.add_route(a.clone()).add_routes(vec![b.clone(), c.clone()]);
        parent.add_routes(Vec::new());

        let children = parent.children();
        assert_eq!(children.len(), 3);
        assert!(children[0].ptr_eq(&a));
        assert!(children[1].ptr_eq(&b));
        assert!(children[2].ptr_eq(&c));
    }

    #[test]
    fn test_add_routes_accepts_single_node() {
        let parent = group("/p");
        parent.add_routes(Some(route("a", "get", &["a"])));
        assert_eq!(parent.children().len(), 1);
    }

    #[test]
    fn test_add_handler_appends() {
        let node = route("/x", "get", &["a"]);
        node.add_handler("b").add_handler("c");
        assert_eq!(node.handlers(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_set_method_invalid_leaves_method() {
        let node = route("/x", "get", &["a"]);
        assert!(node.set_method("fetch").is_err());
        assert_eq!(node.method(), Some(Method::Get));

        node.set_method("").unwrap();
        assert!(node.is_container());
    }

    #[test]
    fn test_set_pattern_invalid_leaves_path() {
        let node = group("/kept");
        assert!(node.set_pattern("^/(broken").is_err());
        assert_eq!(node.path(), PathSpec::literal("/kept"));

        node.set_pattern(r"^/ok$").unwrap();
        assert!(node.path().is_pattern());
    }

    #[test]
    fn test_set_prefix_merges() {
        let node = route("/world", "get", &["a"]);
        node.set_prefix("/hello/").unwrap();
        assert_eq!(node.path().as_str(), "/hello/world");
    }

    #[test]
    fn test_setters() {
        let node = group("/x");
        node.set_name("named").set_version("2.0.0").set_path(" /y ");
        assert_eq!(node.name(), "named");
        assert_eq!(node.version(), "2.0.0");
        assert_eq!(node.path().as_str(), "/y");
    }

    #[test]
    fn test_verb_shortcut() {
        let node = Node::container();
        node.patch("/patchme").add_handler("patch");

        let mut recorder = Recorder::default();
        node.attach(&mut recorder).unwrap();
        assert_eq!(recorder.routes, vec![record(Method::Patch, "/patchme", &["patch"])]);
    }

    #[test]
    fn test_attach_simple_route() {
        let node = Node::new(
            NodeConfig::new()
                .name("hello")
                .version("1.0.0")
                .path("/hello")
                .method("get")
                .handler("h"),
        )
        .unwrap();

        let mut recorder = Recorder::default();
        assert_eq!(node.attach(&mut recorder).unwrap(), AttachStatus::Attached);
        assert!(node.is_attached());
        assert_eq!(recorder.routes, vec![record(Method::Get, "/hello", &["h"])]);
        assert_eq!(recorder.descriptors[0].name, "hello");
        assert_eq!(recorder.descriptors[0].version, "1.0.0");
    }

    #[test]
    fn test_attach_twice_registers_once() {
        let node = route("/hello", "get", &["h"]);
        let mut recorder = Recorder::default();

        assert_eq!(node.attach(&mut recorder).unwrap(), AttachStatus::Attached);
        assert_eq!(
            node.attach(&mut recorder).unwrap(),
            AttachStatus::AlreadyAttached
        );
        assert_eq!(recorder.calls, 1);
    }

    #[test]
    fn test_attach_nested_accumulates_handlers() {
        let api = Node::new(NodeConfig::new().name("api").path("/api")).unwrap();
        let get_name = route(":name", "get", &["H1"]);
        let get_place = route(":place", "get", &["H2"]);
        api.add_route(get_name.clone());
        get_name.add_route(get_place);

        let mut recorder = Recorder::default();
        api.attach(&mut recorder).unwrap();

        assert_eq!(
            recorder.routes,
            vec![
                record(Method::Get, "/api/:name", &["H1"]),
                record(Method::Get, "/api/:name/:place", &["H1", "H2"]),
            ]
        );
    }

    #[test]
    fn test_group_handlers_run_first_in_order() {
        let root = Node::new(NodeConfig::new().path("/r").handlers(["a", "b"])).unwrap();
        let mid = Node::new(NodeConfig::new().path("m").handler("c")).unwrap();
        let leaf = route("l", "get", &["d", "e"]);
        root.add_route(mid.clone());
        mid.add_route(leaf.clone());

        let mut recorder = Recorder::default();
        root.attach(&mut recorder).unwrap();

        assert_eq!(
            recorder.routes,
            vec![record(Method::Get, "/r/m/l", &["a", "b", "c", "d", "e"])]
        );
        // stored chains are not rewritten
        assert_eq!(leaf.handlers(), vec!["d", "e"]);
        assert_eq!(leaf.path().as_str(), "l");
    }

    #[test]
    fn test_shared_child_registered_once() {
        let shared = route("health", "get", &["ok"]);
        let v1 = group("/v1");
        let v2 = group("/v2");
        v1.add_route(shared.clone());
        v2.add_route(shared.clone());
        let root = Node::group([v1, v2]);

        let mut recorder = Recorder::default();
        root.attach(&mut recorder).unwrap();

        assert_eq!(recorder.routes, vec![record(Method::Get, "/v1/health", &["ok"])]);
    }

    #[test]
    fn test_self_cycle_terminates() {
        let node = route("/loop", "get", &["h"]);
        node.add_route(node.clone());

        let mut recorder = Recorder::default();
        assert_eq!(node.attach(&mut recorder).unwrap(), AttachStatus::Attached);
        assert_eq!(recorder.calls, 1);

        let plan = node.plan().unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_indirect_cycle_terminates() {
        let a = route("/a", "get", &["a"]);
        let b = route("b", "get", &["b"]);
        a.add_route(b.clone());
        b.add_route(a.clone());

        let mut recorder = Recorder::default();
        a.attach(&mut recorder).unwrap();
        assert_eq!(
            recorder.routes,
            vec![
                record(Method::Get, "/a", &["a"]),
                record(Method::Get, "/a/b", &["a", "b"]),
            ]
        );
    }

    #[test]
    fn test_missing_handler_at_attach() {
        let node = Node::container();
        node.get("/empty");

        let mut recorder = Recorder::default();
        let err = node.attach(&mut recorder).unwrap_err();
        assert!(matches!(err, RouteError::MissingHandler { .. }));
        assert_eq!(recorder.calls, 0);
        assert!(!node.is_attached());

        node.add_handler("late");
        node.attach(&mut recorder).unwrap();
        assert_eq!(recorder.routes, vec![record(Method::Get, "/empty", &["late"])]);
    }

    #[test]
    fn test_inherited_handlers_satisfy_child() {
        let parent = Node::new(NodeConfig::new().path("/p").handler("auth")).unwrap();
        let child = Node::container();
        child.get("c");
        parent.add_route(child);

        let mut recorder = Recorder::default();
        parent.attach(&mut recorder).unwrap();
        assert_eq!(recorder.routes, vec![record(Method::Get, "/p/c", &["auth"])]);
    }

    #[test]
    fn test_attach_failure_resets_state_and_allows_retry() {
        let node = Node::new(
            NodeConfig::new()
                .name("dup")
                .path("/dup")
                .method("put")
                .handler("h"),
        )
        .unwrap();
        let mut recorder = Recorder {
            reject: vec!["/dup".to_string()],
            ..Default::default()
        };

        let err = node.attach(&mut recorder).unwrap_err();
        match &err {
            RouteError::AttachFailed {
                method, path, name, ..
            } => {
                assert_eq!(*method, Method::Put);
                assert_eq!(path, "/dup");
                assert_eq!(name, "dup");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!node.is_attached());

        recorder.reject.clear();
        assert_eq!(node.attach(&mut recorder).unwrap(), AttachStatus::Attached);
        assert_eq!(recorder.routes.len(), 1);
    }

    #[test]
    fn test_attach_failure_is_partial() {
        let root = group("/api");
        let first = route("first", "get", &["1"]);
        first.add_route(route("nested", "get", &["n"]));
        let failing = route("failing", "get", &["f"]);
        failing.add_route(route("below", "get", &["b"]));
        let last = route("last", "get", &["l"]);
        root.add_routes([first.clone(), failing.clone(), last.clone()]);

        let mut recorder = Recorder {
            reject: vec!["/api/failing".to_string()],
            ..Default::default()
        };
        let err = root.attach(&mut recorder).unwrap_err();
        assert!(err.is_attach_failure());

        // earlier sibling and its subtree stay registered
        assert_eq!(
            recorder.routes,
            vec![
                record(Method::Get, "/api/first", &["1"]),
                record(Method::Get, "/api/first/nested", &["1", "n"]),
            ]
        );
        assert_eq!(root.attach_state(), AttachState::Registered);
        assert!(first.is_attached());
        assert_eq!(failing.attach_state(), AttachState::Unattached);
        assert_eq!(last.attach_state(), AttachState::Unattached);
    }

    #[test]
    fn test_retry_from_root_registers_each_route_once() {
        let root = group("/api");
        let first = route("first", "get", &["1"]);
        let failing = route("failing", "get", &["f"]);
        failing.add_route(route("below", "get", &["b"]));
        let last = route("last", "get", &["l"]);
        root.add_routes([first, failing, last]);

        let mut recorder = Recorder {
            reject: vec!["/api/failing/below".to_string()],
            ..Default::default()
        };
        assert!(root.attach(&mut recorder).is_err());

        recorder.reject.clear();
        assert_eq!(root.attach(&mut recorder).unwrap(), AttachStatus::Attached);

        assert_eq!(
            recorder.routes,
            vec![
                record(Method::Get, "/api/first", &["1"]),
                record(Method::Get, "/api/failing", &["f"]),
                record(Method::Get, "/api/failing/below", &["f", "b"]),
                record(Method::Get, "/api/last", &["l"]),
            ]
        );
        assert!(root.is_attached());
        assert_eq!(
            root.attach(&mut recorder).unwrap(),
            AttachStatus::AlreadyAttached
        );
    }

    #[test]
    fn test_retry_through_cycle_after_failure() {
        let a = route("/a", "get", &["a"]);
        let b = route("b", "get", &["b"]);
        a.add_route(b.clone());
        b.add_route(a.clone());

        let mut recorder = Recorder {
            reject: vec!["/a/b".to_string()],
            ..Default::default()
        };
        assert!(a.attach(&mut recorder).is_err());
        assert_eq!(a.attach_state(), AttachState::Registered);

        recorder.reject.clear();
        a.attach(&mut recorder).unwrap();
        assert_eq!(
            recorder.routes,
            vec![
                record(Method::Get, "/a", &["a"]),
                record(Method::Get, "/a/b", &["a", "b"]),
            ]
        );
        assert!(a.is_attached());
        assert!(b.is_attached());
    }

    #[test]
    fn test_reset_attachment_allows_second_server() {
        let root = group("/api");
        let leaf = route("x", "get", &["h"]);
        root.add_route(leaf.clone());
        leaf.add_route(root.clone());

        let mut first = Recorder::default();
        root.attach(&mut first).unwrap();
        assert!(leaf.is_attached());

        let mut second = Recorder::default();
        assert_eq!(
            root.attach(&mut second).unwrap(),
            AttachStatus::AlreadyAttached
        );

        root.reset_attachment();
        assert!(!root.is_attached());
        assert!(!leaf.is_attached());

        root.attach(&mut second).unwrap();
        assert_eq!(second.routes, first.routes);
    }

    #[test]
    fn test_nested_pattern_attach() {
        let parent = Node::container();
        parent.set_pattern(r"^\/lets\/([a-z]+)\/$").unwrap();
        let child = Node::container();
        child.set_pattern(r"^\/this\/([a-z]+)$").unwrap();
        child.set_method("get").unwrap().add_handler("h");
        parent.add_route(child);

        let mut recorder = Recorder::default();
        parent.attach(&mut recorder).unwrap();

        let path = &recorder.descriptors[0].path;
        let caps = path
            .as_regex()
            .unwrap()
            .captures("/lets/test/this/out")
            .unwrap();
        assert_eq!(&caps[1], "test");
        assert_eq!(&caps[2], "out");
    }

    #[test]
    fn test_invalid_merge_resets_child() {
        let parent = group("/(open");
        let child = Node::container();
        child.set_pattern("^/x$").unwrap();
        child.set_method("get").unwrap().add_handler("h");
        parent.add_route(child.clone());

        let mut recorder = Recorder::default();
        let err = parent.attach(&mut recorder).unwrap_err();
        assert!(matches!(err, RouteError::InvalidConfig { .. }));
        assert!(!child.is_attached());
    }

    #[test]
    fn test_plan_matches_attach_without_side_effects() {
        let api = group("/api");
        let users = Node::new(NodeConfig::new().path("users").handler("auth")).unwrap();
        users.add_routes([
            route("/", "get", &["list"]),
            route(":id", "delete", &["remove"]),
        ]);
        api.add_route(users);

        let plan = api.plan().unwrap();
        assert!(!api.is_attached());

        let mut recorder = Recorder::default();
        api.attach(&mut recorder).unwrap();

        let planned: Vec<Record> = plan
            .into_iter()
            .map(|p| (p.method, p.route.path.to_string(), p.handlers))
            .collect();
        assert_eq!(planned, recorder.routes);
        assert_eq!(
            planned[1],
            record(Method::Delete, "/api/users/:id", &["auth", "remove"])
        );
    }

    #[test]
    fn test_plan_reports_missing_handler() {
        let root = group("/r");
        let child = Node::container();
        child.head("h");
        root.add_route(child);

        let err = root.plan().unwrap_err();
        assert!(matches!(err, RouteError::MissingHandler { method: Method::Head, .. }));
    }

    #[test]
    fn test_node_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Node<&'static str>>();
        assert_send_sync::<Node<std::sync::Arc<dyn Fn() + Send + Sync>>>();
    }

    #[test]
    fn test_debug_does_not_recurse() {
        let node = route("/loop", "get", &["h"]);
        node.add_route(node.clone());
        let rendered = format!("{node:?}");
        assert!(rendered.contains("children: 1"));
    }
}
