//! Graph Definitions
//!
//! A [`GraphDefinition`] is the declarative description of a signal graph:
//! which names are primary signals, which external dependencies are supplied,
//! and how each derived signal is computed from its upstreams. Definitions
//! are plain immutable data. Nothing is wired until the graph is built.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::name::SignalName;
use super::upstream::Upstreams;
use crate::error::UpstreamError;
use crate::reactive::Stream;

/// Maximum number of dependency slots a derived signal may declare.
pub const MAX_DEPENDENCY_SLOTS: usize = 10;

/// Initial values per signal name, applied when the graph is built.
pub type InitialValues<V> = IndexMap<SignalName, V>;

/// The ordered dependency slots of a derived signal.
///
/// A slot is either a name or empty. Empty slots are placeholders: they do
/// not take part in ordering and are dropped before the derivation runs, so
/// the remaining upstreams shift down to fill them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyList {
    slots: SmallVec<[Option<SignalName>; MAX_DEPENDENCY_SLOTS]>,
}

impl DependencyList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from raw slots.
    pub fn from_slots(slots: impl IntoIterator<Item = Option<SignalName>>) -> Self {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    /// Append a named slot.
    pub fn with(mut self, name: impl Into<SignalName>) -> Self {
        self.slots.push(Some(name.into()));
        self
    }

    /// Append an empty slot.
    pub fn with_empty_slot(mut self) -> Self {
        self.slots.push(None);
        self
    }

    /// All slots, empty ones included.
    pub fn slots(&self) -> &[Option<SignalName>] {
        &self.slots
    }

    /// Names of the populated slots, in slot order.
    pub fn names(&self) -> impl Iterator<Item = &SignalName> + '_ {
        self.slots.iter().flatten()
    }

    /// Number of slots, empty ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<S: Into<SignalName>> FromIterator<S> for DependencyList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_slots(iter.into_iter().map(|name| Some(name.into())))
    }
}

impl<S: Into<SignalName>, const N: usize> From<[S; N]> for DependencyList {
    fn from(names: [S; N]) -> Self {
        names.into_iter().collect()
    }
}

impl<S: Into<SignalName>> From<Vec<S>> for DependencyList {
    fn from(names: Vec<S>) -> Self {
        names.into_iter().collect()
    }
}

/// An externally supplied upstream.
pub enum Dependency<V> {
    /// A constant. Derivations may read it directly or as a one-value stream.
    Value(V),

    /// An existing stream, subscribed by whichever derivations use it.
    Stream(Stream<V>),

    /// Any shared object, such as an API client. Derivations downcast it.
    Service(Arc<dyn Any + Send + Sync>),
}

impl<V> Dependency<V> {
    /// A constant dependency.
    pub fn value(value: V) -> Self {
        Dependency::Value(value)
    }

    /// A stream dependency.
    pub fn stream(stream: Stream<V>) -> Self {
        Dependency::Stream(stream)
    }

    /// A service dependency. Read it back with [`Upstreams::service`].
    pub fn service<S: Any + Send + Sync>(service: S) -> Self {
        Dependency::Service(Arc::new(service))
    }

    /// Short description of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Dependency::Value(_) => "a value dependency",
            Dependency::Stream(_) => "a stream dependency",
            Dependency::Service(_) => "a service dependency",
        }
    }
}

impl<V: Clone> Clone for Dependency<V> {
    fn clone(&self) -> Self {
        match self {
            Dependency::Value(value) => Dependency::Value(value.clone()),
            Dependency::Stream(stream) => Dependency::Stream(stream.clone()),
            Dependency::Service(service) => Dependency::Service(Arc::clone(service)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Dependency<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Dependency::Stream(stream) => f.debug_tuple("Stream").field(stream).finish(),
            Dependency::Service(_) => f.write_str("Service(..)"),
        }
    }
}

/// The function that turns resolved upstreams into a derived stream.
pub type DerivationFn<V> =
    dyn Fn(&Upstreams<'_, V>) -> Result<Stream<V>, UpstreamError> + Send + Sync;

/// How one derived signal is computed.
pub struct DerivationSpec<V> {
    derivation: Arc<DerivationFn<V>>,
    dependencies: DependencyList,
}

impl<V> DerivationSpec<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Pair a derivation with its dependency slots.
    ///
    /// The derivation runs once per build, with the upstreams of the
    /// populated slots in slot order.
    pub fn new<F>(derivation: F, dependencies: impl Into<DependencyList>) -> Self
    where
        F: Fn(&Upstreams<'_, V>) -> Result<Stream<V>, UpstreamError> + Send + Sync + 'static,
    {
        Self {
            derivation: Arc::new(derivation),
            dependencies: dependencies.into(),
        }
    }

    pub(crate) fn derive(&self, upstreams: &Upstreams<'_, V>) -> Result<Stream<V>, UpstreamError> {
        (self.derivation)(upstreams)
    }
}

impl<V> DerivationSpec<V> {
    /// The dependency slots, in the order the derivation receives them.
    pub fn dependencies(&self) -> &DependencyList {
        &self.dependencies
    }
}

impl<V> Clone for DerivationSpec<V> {
    fn clone(&self) -> Self {
        Self {
            derivation: Arc::clone(&self.derivation),
            dependencies: self.dependencies.clone(),
        }
    }
}

impl<V> fmt::Debug for DerivationSpec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivationSpec")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Declarative description of a signal graph.
///
/// The `with_*` methods consume the definition and return an extended copy.
/// Redeclaring a name within the same role replaces the earlier entry but
/// keeps its position.
#[derive(Debug)]
pub struct GraphDefinition<V> {
    primary_keys: IndexSet<SignalName>,
    external_dependencies: IndexMap<SignalName, Dependency<V>>,
    derived_signals: IndexMap<SignalName, DerivationSpec<V>>,
}

impl<V> GraphDefinition<V> {
    /// An empty definition.
    pub fn new() -> Self {
        Self {
            primary_keys: IndexSet::new(),
            external_dependencies: IndexMap::new(),
            derived_signals: IndexMap::new(),
        }
    }

    /// Declare a primary signal.
    pub fn with_primary(mut self, name: impl Into<SignalName>) -> Self {
        self.primary_keys.insert(name.into());
        self
    }

    /// Supply an external dependency.
    pub fn with_dependency(mut self, name: impl Into<SignalName>, dependency: Dependency<V>) -> Self {
        self.external_dependencies.insert(name.into(), dependency);
        self
    }

    /// Declare a derived signal.
    pub fn with_derived(mut self, name: impl Into<SignalName>, spec: DerivationSpec<V>) -> Self {
        self.derived_signals.insert(name.into(), spec);
        self
    }

    /// Primary signal names in declaration order.
    pub fn primary_keys(&self) -> &IndexSet<SignalName> {
        &self.primary_keys
    }

    /// External dependencies in declaration order.
    pub fn external_dependencies(&self) -> &IndexMap<SignalName, Dependency<V>> {
        &self.external_dependencies
    }

    /// Derived signals in declaration order.
    pub fn derived_signals(&self) -> &IndexMap<SignalName, DerivationSpec<V>> {
        &self.derived_signals
    }

    /// Whether nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.primary_keys.is_empty()
            && self.external_dependencies.is_empty()
            && self.derived_signals.is_empty()
    }
}

impl<V> Default for GraphDefinition<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for GraphDefinition<V> {
    fn clone(&self) -> Self {
        Self {
            primary_keys: self.primary_keys.clone(),
            external_dependencies: self.external_dependencies.clone(),
            derived_signals: self.derived_signals.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_list_keeps_empty_slots() {
        let list = DependencyList::new().with("a").with_empty_slot().with("b");
        assert_eq!(list.len(), 3);
        assert_eq!(list.slots()[1], None);

        let names: Vec<&str> = list.names().map(SignalName::as_str).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn dependency_list_from_array() {
        let list = DependencyList::from(["x", "y"]);
        assert_eq!(
            list.slots(),
            &[Some(SignalName::from("x")), Some(SignalName::from("y"))]
        );
    }

    #[test]
    fn definition_accumulates_in_declaration_order() {
        let definition = GraphDefinition::<i32>::new()
            .with_primary("b")
            .with_primary("a")
            .with_primary("b")
            .with_dependency("offset", Dependency::value(1));

        let primary: Vec<&str> = definition.primary_keys().iter().map(SignalName::as_str).collect();
        assert_eq!(primary, ["b", "a"]);
        assert!(definition.external_dependencies().contains_key("offset"));
        assert!(definition.derived_signals().is_empty());
        assert!(!definition.is_empty());
    }

    #[test]
    fn dependency_kinds() {
        assert_eq!(Dependency::value(1).kind(), "a value dependency");
        assert_eq!(Dependency::<i32>::stream(Stream::empty()).kind(), "a stream dependency");
        assert_eq!(Dependency::<i32>::service("client").kind(), "a service dependency");
    }

    #[test]
    fn debug_hides_service_contents() {
        let dependency = Dependency::<i32>::service(42u8);
        assert_eq!(format!("{dependency:?}"), "Service(..)");
    }
}
