//! Signal Graph Core
//!
//! This crate builds declarative graphs of push-based signals. It
//! implements:
//!
//! - Reactive primitives (subjects, streams, operators, shared replay)
//! - Topological ordering of derived signals with cycle detection
//! - The graph builder and the handle for driving and observing a graph
//! - A small DSL for assembling definitions
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Subjects, cold streams, operators and shared streams
//! - `graph`: Definitions, sorting, graph construction and the graph handle
//! - `dsl`: Definition transforms and the builder
//! - `error`: Build, lookup and stream errors
//!
//! # Example
//!
//! ```rust
//! use signal_graph_core::dsl::{add_dependency, add_derived, add_primary, SignalGraphBuilder};
//! use signal_graph_core::graph::{Dependency, Upstreams};
//!
//! let graph = SignalGraphBuilder::<String>::new()
//!     .define([
//!         add_primary("x"),
//!         add_dependency("dep", Dependency::value("sauce".to_string())),
//!         add_derived(
//!             "y",
//!             |up: &Upstreams<'_, String>| {
//!                 let dep = up.value(1)?.clone();
//!                 Ok(up.stream(0)?.map(move |x: String| format!("{x} {dep}")))
//!             },
//!             ["x", "dep"],
//!         ),
//!     ])
//!     .build()
//!     .unwrap();
//!
//! graph.input("x").unwrap().push("apple".to_string());
//!
//! // Late subscribers get the latest value replayed
//! let _sub = graph
//!     .output("y")
//!     .unwrap()
//!     .subscribe(|y| assert_eq!(y, "apple sauce"));
//! ```

pub mod dsl;
pub mod error;
pub mod graph;
pub mod reactive;

pub use dsl::SignalGraphBuilder;
pub use error::{GraphError, StreamError, UpstreamError};
pub use graph::{build, Connection, Dependency, DerivationSpec, GraphDefinition, SignalGraph, SignalName};
pub use reactive::{Stream, Subject, Subscription};
