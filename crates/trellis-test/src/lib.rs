//! # Trellis Test
//!
//! Test utilities for Trellis route trees, providing in-memory registrars
//! so a tree can be attached and inspected without a real server.
//!
//! ## Key Features
//!
//! - **Recording Registrar**: captures every registration in order
//! - **Failure Injection**: reject chosen paths to exercise partial attach
//! - **Log Capture**: assert on the events emitted while attaching
//! - **Test Logging**: one-call `tracing` subscriber for test output
//!
//! ## Example
//!
//! ```rust
//! use trellis::{Method, Node, NodeConfig};
//! use trellis_test::RecordingRegistrar;
//!
//! let api = Node::new(NodeConfig::new().path("/api")).unwrap();
//! let users = NodeConfig::new().path("users").method("get").handler("list");
//! api.add_route(Node::new(users).unwrap());
//!
//! let mut server = RecordingRegistrar::new();
//! api.attach(&mut server).unwrap();
//!
//! let route = server.find(Method::Get, "/api/users").unwrap();
//! assert_eq!(route.handlers, vec!["list"]);
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;
mod recording;

pub use error::RegistrarError;
pub use logging::{capture_logs, init_test_logging, CapturedEvent};
pub use recording::{FailingRegistrar, RecordingRegistrar, Registration};
