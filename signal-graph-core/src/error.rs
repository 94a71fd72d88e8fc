//! Error types.
//!
//! Build-time problems are [`GraphError`]s and abort `build()` as a whole.
//! Once a graph is running, failures travel through streams as
//! [`StreamError`]s instead.

use std::fmt;
use std::sync::Arc;

use crate::graph::{Role, SignalName};

/// Errors raised while building a signal graph or looking up its signals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The derived signals depend on each other in a cycle.
    #[error("cyclic dependency between signals: {}", NameList(.signals))]
    CyclicDependency { signals: Vec<SignalName> },

    /// A dependency list names something the graph does not declare.
    #[error(
        "signal `{signal}` depends on `{dependency}`, which is neither a primary signal, \
         an external dependency nor a derived signal"
    )]
    MissingSignal {
        signal: SignalName,
        dependency: SignalName,
    },

    /// The same name was declared in two roles.
    #[error("`{name}` is declared both as {first} and as {second}")]
    ConflictingRole {
        name: SignalName,
        first: Role,
        second: Role,
    },

    /// A dependency list has more slots than a derivation can take.
    #[error(
        "signal `{signal}` has {count} dependency slots, at most {} are allowed",
        crate::graph::MAX_DEPENDENCY_SLOTS
    )]
    TooManyDependencies { signal: SignalName, count: usize },

    /// A derivation function rejected its resolved upstreams.
    #[error("derivation of `{signal}` failed")]
    Derivation {
        signal: SignalName,
        #[source]
        source: UpstreamError,
    },

    /// `input()` was asked for a name that is not a primary signal.
    #[error("`{name}` is not a primary signal of this graph")]
    NotAnInput { name: SignalName },

    /// `output()` was asked for a name the graph does not produce.
    #[error("`{name}` is not a signal of this graph")]
    UnknownSignal { name: SignalName },
}

/// Errors a derivation function reports about its upstreams.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// The derivation asked for a slot past the populated ones.
    #[error("upstream slot {slot} requested, but only {len} are populated")]
    MissingSlot { slot: usize, len: usize },

    /// The upstream in a slot has a different shape than requested.
    #[error("upstream slot {slot} holds {found}, expected {expected}")]
    KindMismatch {
        slot: usize,
        expected: &'static str,
        found: &'static str,
    },
}

/// A failure carried through a stream at runtime.
///
/// Cheap to clone: every subscriber of a shared stream gets the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StreamError {
    message: Arc<str>,
}

impl StreamError {
    /// Create an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

struct NameList<'a>(&'a [SignalName]);

impl fmt::Display for NameList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "`{name}`")?;
        }
        Ok(())
    }
}
