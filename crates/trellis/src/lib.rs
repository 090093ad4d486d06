//! Composable route trees for Themis services.
//!
//! Trellis lets route definitions be assembled into a tree independently of
//! any server, then flattened onto a live server in one pass. Each node may
//! be an endpoint (method + handlers), a path-prefix group, or both.
//!
//! # Features
//!
//! - **Prefix Composition**: child paths are joined to parent paths with
//!   exactly one `/`; regular-expression paths compose into one pattern
//! - **Handler Chains**: parent handlers run before child handlers
//! - **Exactly-Once Registration**: shared and cyclic subtrees register once
//! - **Server Agnostic**: registration goes through the [`Registrar`] trait
//! - **Route Manifests**: trees can be loaded from TOML or JSON
//!
//! # Example
//!
//! ```rust
//! use trellis::{BoxError, Method, Node, NodeConfig, Registrar, RouteDescriptor};
//!
//! #[derive(Default)]
//! struct Server {
//!     routes: Vec<(Method, String, Vec<&'static str>)>,
//! }
//!
//! impl Registrar<&'static str> for Server {
//!     fn register(
//!         &mut self,
//!         method: Method,
//!         route: RouteDescriptor,
//!         handlers: Vec<&'static str>,
//!     ) -> Result<(), BoxError> {
//!         self.routes.push((method, route.path.to_string(), handlers));
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), trellis::RouteError> {
//! let api = Node::new(NodeConfig::new().name("api").path("/api").handler("auth"))?;
//! let users = Node::new(NodeConfig::new().path("users").method("get").handler("list"))?;
//! users.add_route(Node::new(
//!     NodeConfig::new().path("/:id").method("delete").handler("remove"),
//! )?);
//! api.add_route(users);
//!
//! let mut server = Server::default();
//! api.attach(&mut server)?;
//!
//! assert_eq!(server.routes, vec![
//!     (Method::Get, "/api/users".to_string(), vec!["auth", "list"]),
//!     (Method::Delete, "/api/users/:id".to_string(), vec!["auth", "list", "remove"]),
//! ]);
//! # Ok(())
//! # }
//! ```
//!
//! # Attachment
//!
//! ```text
//!          /api [auth]
//!               │
//!        users  GET [list]              ──► GET    /api/users      [auth, list]
//!               │
//!        /:id   DELETE [remove]         ──► DELETE /api/users/:id  [auth, list, remove]
//! ```
//!
//! Registration is depth-first in insertion order and is not atomic: a
//! failing registration leaves earlier routes in place. Attaching the root
//! again resumes where the failed pass stopped (see [`AttachState`]).
//! [`Node::plan`] computes the full set of registrations up front.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod manifest;
mod method;
mod node;
mod path;
mod registrar;

pub use error::{BoxError, RouteError, RouteResult};
pub use manifest::{HandlerRegistry, ManifestLoader, OneOrMany, RouteManifest};
pub use method::Method;
pub use node::{AttachState, AttachStatus, Node, NodeConfig, PlannedRoute};
pub use path::{merge_literal, merge_paths, PathSpec};
pub use registrar::{RegisterFn, Registrar, RouteDescriptor, UnsupportedVerb, VerbTable};
