//! Declarative route manifests.
//!
//! A manifest describes a route tree in TOML or JSON. Handlers are referred
//! to by name and resolved through a [`HandlerRegistry`] when the tree is
//! built.
//!
//! # Manifest Format
//!
//! ```toml
//! name = "api"
//! path = "/api"
//!
//! [[routes]]
//! path = ":name"
//! method = "get"
//! handler = "name"
//!
//! [[routes.routes]]
//! path = ":place"
//! method = "get"
//! handlers = ["place"]
//! ```
//!
//! Recognised keys: `name`, `version`, `path`, `pattern` (a regular
//! expression, exclusive with `path`), `method`, `handler` / `handlers` (a
//! name or a list of names) and `routes` (a route or a list of routes).
//! Unknown keys are rejected. A document whose top level is a list builds an
//! anonymous group.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{RouteError, RouteResult};
use crate::node::{Node, NodeConfig};
use crate::path::PathSpec;

/// A single item or a list of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A list of items.
    Many(Vec<T>),
    /// A single item.
    One(T),
}

impl<T> OneOrMany<T> {
    /// Returns the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Many(items) => items,
            Self::One(item) => std::slice::from_ref(item),
        }
    }
}

/// One route table of a manifest.
///
/// # Example
///
/// ```rust
/// use trellis::{HandlerRegistry, RouteManifest};
///
/// let manifest: RouteManifest = toml::from_str(
///     r#"
///     path = "/hello"
///     method = "get"
///     handlers = ["auth", "hello"]
///     "#,
/// )
/// .unwrap();
///
/// let registry = HandlerRegistry::new().with("auth", 1).with("hello", 2);
/// let node = manifest.build(&registry).unwrap();
/// assert_eq!(node.handlers(), vec![1, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteManifest {
    /// Route name.
    #[serde(default)]
    pub name: String,

    /// Version tag.
    #[serde(default)]
    pub version: String,

    /// Literal path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Regular expression path, exclusive with `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Verb; empty for a group.
    #[serde(default)]
    pub method: String,

    /// Handler name or names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<OneOrMany<String>>,

    /// Handler name or names, exclusive with `handler`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handlers: Option<OneOrMany<String>>,

    /// Child route tables. Entries stay untyped until the tree is built so
    /// that an entry which is not a table reports [`RouteError::InvalidChild`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<OneOrMany<Value>>,
}

impl RouteManifest {
    /// Reads a route table from an untyped value.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidChild`] if `value` is not a table
    /// - [`RouteError::Json`] for mistyped or unknown fields
    pub fn from_value(value: &Value) -> RouteResult<Self> {
        if !value.is_object() {
            return Err(RouteError::invalid_child(format!(
                "expected a route table, got `{value}`"
            )));
        }
        Ok(Self::deserialize(value)?)
    }

    /// Builds the node and its children.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidConfig`] for conflicting keys, an unknown verb
    ///   or a pattern that does not compile
    /// - [`RouteError::UnknownHandler`] for handler names not in `registry`
    /// - [`RouteError::MissingHandler`] for a method without handlers
    /// - any error of [`RouteManifest::from_value`] for child entries
    pub fn build<H: Clone>(&self, registry: &HandlerRegistry<H>) -> RouteResult<Node<H>> {
        let mut config = NodeConfig::new()
            .name(self.name.as_str())
            .version(self.version.as_str())
            .method(self.method.as_str());

        match (&self.path, &self.pattern) {
            (Some(_), Some(_)) => {
                return Err(RouteError::invalid_config(
                    "path",
                    "set either `path` or `pattern`, not both",
                ))
            }
            (Some(path), None) => config = config.path(path.as_str()),
            (None, Some(pattern)) => config = config.path(PathSpec::pattern(pattern)?),
            (None, None) => {}
        }

        let names = match (&self.handler, &self.handlers) {
            (Some(_), Some(_)) => {
                return Err(RouteError::invalid_config(
                    "handlers",
                    "set either `handler` or `handlers`, not both",
                ))
            }
            (Some(names), None) | (None, Some(names)) => names.as_slice(),
            (None, None) => &[][..],
        };
        for name in names {
            config = config.handler(registry.resolve(name)?);
        }

        let node = Node::new(config)?;
        if let Some(routes) = &self.routes {
            node.add_routes(build_all(routes.as_slice(), registry)?);
        }
        Ok(node)
    }
}

/// Named handlers a manifest can refer to.
///
/// # Example
///
/// ```rust
/// use trellis::HandlerRegistry;
///
/// let registry = HandlerRegistry::new()
///     .with("list_users", 1)
///     .with("get_user", 2);
///
/// assert_eq!(registry.get("get_user"), Some(&2));
/// assert!(registry.resolve("missing").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct HandlerRegistry<H> {
    handlers: HashMap<String, H>,
}

impl<H> Default for HandlerRegistry<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<H> HandlerRegistry<H> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler, replacing any handler with the same name.
    pub fn insert(&mut self, name: impl Into<String>, handler: H) -> &mut Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Adds a handler, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, handler: H) -> Self {
        self.insert(name, handler);
        self
    }

    /// Looks a handler up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&H> {
        self.handlers.get(name)
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<H: Clone> HandlerRegistry<H> {
    /// Looks a handler up by name.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownHandler`] if the name is not registered.
    pub fn resolve(&self, name: &str) -> RouteResult<H> {
        self.get(name)
            .cloned()
            .ok_or_else(|| RouteError::unknown_handler(name))
    }
}

/// Loads a route manifest from a file or a string.
///
/// # Example
///
/// ```rust
/// use trellis::{HandlerRegistry, ManifestLoader};
///
/// # fn main() -> Result<(), trellis::RouteError> {
/// let registry = HandlerRegistry::new().with("hello", "say_hello");
///
/// let root = ManifestLoader::from_toml_str(
///     r#"
///     path = "/hello"
///     method = "get"
///     handler = "hello"
///     "#,
/// )?
/// .build(&registry)?;
///
/// assert_eq!(root.plan()?[0].handlers, vec!["say_hello"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    document: Value,
    source: Option<PathBuf>,
}

impl ManifestLoader {
    /// Loads a manifest file.
    ///
    /// The format is determined by the file extension (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] if the file cannot be read, has an unsupported
    /// extension, or does not parse.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RouteResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let content = fs::read_to_string(path).map_err(|source| RouteError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;

        let loader = match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            _ => {
                return Err(RouteError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        Ok(Self {
            source: Some(path.to_path_buf()),
            ..loader
        })
    }

    /// Parses a TOML manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Toml`] on malformed input.
    pub fn from_toml_str(content: &str) -> RouteResult<Self> {
        let document: Value = toml::from_str(content)?;
        Ok(Self::from_value(document))
    }

    /// Parses a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Json`] on malformed input.
    pub fn from_json_str(content: &str) -> RouteResult<Self> {
        let document: Value = serde_json::from_str(content)?;
        Ok(Self::from_value(document))
    }

    /// Wraps an already parsed document.
    #[must_use]
    pub fn from_value(document: Value) -> Self {
        Self {
            document,
            source: None,
        }
    }

    /// Returns the file the manifest was loaded from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Builds the route tree.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidChild`] for route entries that are not tables
    /// - [`RouteError::Json`] for mistyped or unknown keys
    /// - the errors of [`RouteManifest::build`]
    pub fn build<H: Clone>(&self, registry: &HandlerRegistry<H>) -> RouteResult<Node<H>> {
        let root = match &self.document {
            Value::Array(entries) => Node::group(build_all(entries, registry)?),
            entry => RouteManifest::from_value(entry)?.build(registry)?,
        };

        debug!(
            source = ?self.source,
            routes = root.children().len(),
            "Loaded route manifest"
        );
        Ok(root)
    }
}

impl<H: Clone> Node<H> {
    /// Appends children described by an untyped manifest value.
    ///
    /// `value` is a route table or a list of route tables. Every entry is
    /// built before any is appended, so on error the children are unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`ManifestLoader::build`].
    pub fn add_routes_from_value(
        &self,
        value: &Value,
        registry: &HandlerRegistry<H>,
    ) -> RouteResult<&Self> {
        let children = match value {
            Value::Array(entries) => build_all(entries, registry)?,
            entry => vec![RouteManifest::from_value(entry)?.build(registry)?],
        };
        Ok(self.add_routes(children))
    }
}

fn build_all<H: Clone>(
    entries: &[Value],
    registry: &HandlerRegistry<H>,
) -> RouteResult<Vec<Node<H>>> {
    entries
        .iter()
        .map(|entry| RouteManifest::from_value(entry)?.build(registry))
        .collect()
}
