//! Graph Topology
//!
//! A serializable snapshot of a built graph's structure, for debugging and
//! tooling. It carries names and edges only, never values.

use serde::{Deserialize, Serialize};

use super::name::SignalName;

/// The structure of a built signal graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Primary signals in declaration order.
    pub primary: Vec<SignalName>,

    /// External dependencies in declaration order.
    pub external: Vec<SignalName>,

    /// Derived signals in declaration order, with their dependency slots.
    pub derived: Vec<DerivedNode>,

    /// The order in which derived signals were constructed.
    pub build_order: Vec<SignalName>,
}

/// One derived signal and the slots it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedNode {
    pub name: SignalName,

    /// Dependency slots as declared. `None` marks an empty slot.
    pub dependencies: Vec<Option<SignalName>>,
}

impl Topology {
    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a topology written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Edges as `(dependency, dependent)` pairs, skipping empty slots.
    pub fn edges(&self) -> impl Iterator<Item = (&SignalName, &SignalName)> + '_ {
        self.derived.iter().flat_map(|node| {
            node.dependencies
                .iter()
                .flatten()
                .map(move |dependency| (dependency, &node.name))
        })
    }
}
