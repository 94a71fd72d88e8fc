//! Signal Graphs
//!
//! This module turns a declarative graph definition into wired streams.
//!
//! # Overview
//!
//! A signal graph is a directed acyclic graph where:
//!
//! - Primary signals are the roots. Each is driven through an input subject.
//! - External dependencies are values, streams or services supplied with the
//!   definition. They feed derived signals but are not signals themselves.
//! - Derived signals are computed from an ordered list of dependency slots.
//! - Edges point from a dependency to the signal that uses it.
//!
//! # Design Decisions
//!
//! 1. Derived signals are built in topological order, so every upstream
//!    already exists when a derivation runs and each derivation runs once
//!    per build.
//!
//! 2. Every name has exactly one role. Lookups go through the role table
//!    rather than probing each map in turn.
//!
//! 3. Every primary and derived signal is a shared replaying stream, so any
//!    number of subscribers share one computation and late subscribers see
//!    the current value.

mod builder;
mod definition;
mod name;
mod role;
mod signal_graph;
mod topology;
pub mod toposort;
mod upstream;

pub use builder::build;
pub use definition::{
    Dependency, DependencyList, DerivationFn, DerivationSpec, GraphDefinition, InitialValues,
    MAX_DEPENDENCY_SLOTS,
};
pub use name::SignalName;
pub use role::Role;
pub use signal_graph::{Connection, SignalGraph};
pub use topology::{DerivedNode, Topology};
pub use upstream::{Upstream, Upstreams};
