//! Signal Graph Handle
//!
//! A built graph. Primary signals are driven through their input subjects,
//! every primary and derived signal can be observed as a stream, and one
//! graph's inputs can be fed from another graph's outputs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use super::definition::{GraphDefinition, InitialValues};
use super::name::SignalName;
use super::role::{Role, RoleTable};
use super::topology::Topology;
use crate::error::GraphError;
use crate::reactive::{Event, Stream, Subject, Subscription};

/// A running signal graph.
///
/// Dropping the graph does not stop anything that is still subscribed to
/// its outputs. Subscriptions own the chains they keep alive.
pub struct SignalGraph<V> {
    inputs: IndexMap<SignalName, Subject<V>>,
    primary_signals: IndexMap<SignalName, Stream<V>>,
    derived_signals: IndexMap<SignalName, Stream<V>>,
    roles: RoleTable,
    build_order: Vec<SignalName>,
    topology: Topology,
}

impl<V> SignalGraph<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        inputs: IndexMap<SignalName, Subject<V>>,
        primary_signals: IndexMap<SignalName, Stream<V>>,
        derived_signals: IndexMap<SignalName, Stream<V>>,
        roles: RoleTable,
        build_order: Vec<SignalName>,
        topology: Topology,
    ) -> Self {
        Self {
            inputs,
            primary_signals,
            derived_signals,
            roles,
            build_order,
            topology,
        }
    }

    /// Build a graph from a definition. See [`build`](super::build).
    pub fn build(
        definition: &GraphDefinition<V>,
        initial_values: &InitialValues<V>,
    ) -> Result<Self, GraphError> {
        super::builder::build(definition, initial_values)
    }

    /// The input subject of primary signal `name`.
    ///
    /// Values pushed into it reach the primary signal and everything derived
    /// from it before `push` returns.
    pub fn input(&self, name: &str) -> Result<&Subject<V>, GraphError> {
        self.inputs.get(name).ok_or_else(|| GraphError::NotAnInput {
            name: SignalName::from(name),
        })
    }

    /// The shared stream of primary or derived signal `name`.
    ///
    /// External dependencies are not signals and are not returned here.
    pub fn output(&self, name: &str) -> Result<Stream<V>, GraphError> {
        let signal = match self.roles.get(name) {
            Some(Role::Primary) => self.primary_signals.get(name),
            Some(Role::Derived) => self.derived_signals.get(name),
            Some(Role::External) | None => None,
        };
        signal.cloned().ok_or_else(|| GraphError::UnknownSignal {
            name: SignalName::from(name),
        })
    }

    /// Feed every value of `other`'s signal `other_name` into this graph's
    /// input `name`.
    ///
    /// Only values are forwarded. An error or completion on the source stops
    /// the forwarding but leaves this graph's input open. Forwarding ends
    /// when the returned [`Connection`] is dropped or disconnected.
    pub fn connect<W>(
        &self,
        name: &str,
        other: &SignalGraph<W>,
        other_name: &str,
    ) -> Result<Connection, GraphError>
    where
        W: Clone + Send + Sync + 'static,
        V: From<W>,
    {
        let input = self.input(name)?.clone();
        let source = other.output(other_name)?;

        let target = SignalName::from(name);
        let origin = SignalName::from(other_name);
        tracing::debug!(target = %target, source = %origin, "connecting graphs");

        let forwarding = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&forwarding);
        let (from, to) = (origin.clone(), target.clone());
        let subscription = source.subscribe_events(move |event| match event {
            Event::Next(value) => input.push(V::from(value)),
            Event::Error(_) | Event::Complete => {
                tracing::debug!(target = %to, source = %from, "source finished, forwarding stopped");
                flag.store(false, Ordering::SeqCst);
            }
        });
        Ok(Connection {
            subscription,
            forwarding,
            target,
            source: origin,
        })
    }

    /// The role `name` plays in this graph, if it is declared.
    pub fn role(&self, name: &str) -> Option<Role> {
        self.roles.get(name)
    }

    /// Primary signal names in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &SignalName> + '_ {
        self.inputs.keys()
    }

    /// Derived signal names in declaration order.
    pub fn derived_keys(&self) -> impl Iterator<Item = &SignalName> + '_ {
        self.roles.names(Role::Derived)
    }

    /// Names of external dependencies in declaration order.
    pub fn external_keys(&self) -> impl Iterator<Item = &SignalName> + '_ {
        self.roles.names(Role::External)
    }

    /// Derived signal names in the order they were constructed.
    pub fn build_order(&self) -> &[SignalName] {
        &self.build_order
    }

    /// A serializable description of the graph's shape.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

impl<V> fmt::Debug for SignalGraph<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalGraph")
            .field("primary", &self.topology.primary)
            .field("external", &self.topology.external)
            .field("build_order", &self.build_order)
            .finish_non_exhaustive()
    }
}

/// Forwarding from one graph's output into another graph's input.
///
/// Dropping the connection stops the forwarding.
#[must_use = "dropping a Connection stops forwarding immediately"]
pub struct Connection {
    subscription: Subscription,

    /// Cleared when the source errors or completes.
    forwarding: Arc<AtomicBool>,

    target: SignalName,
    source: SignalName,
}

impl Connection {
    /// Stop forwarding.
    pub fn disconnect(self) {
        self.subscription.unsubscribe();
    }

    /// Keep forwarding for as long as the source produces values.
    pub fn detach(self) {
        self.subscription.detach();
    }

    /// Whether values are still being forwarded. False once disconnected or
    /// once the source has errored or completed.
    pub fn is_connected(&self) -> bool {
        !self.subscription.is_closed() && self.forwarding.load(Ordering::SeqCst)
    }

    /// The input being fed.
    pub fn target(&self) -> &SignalName {
        &self.target
    }

    /// The output being read.
    pub fn source(&self) -> &SignalName {
        &self.source
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Dependency, DerivationSpec};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn doubling_graph() -> SignalGraph<i32> {
        let definition = GraphDefinition::<i32>::new()
            .with_primary("x")
            .with_dependency("factor", Dependency::value(2))
            .with_derived(
                "doubled",
                DerivationSpec::<i32>::new(
                    |upstreams| {
                        let factor = *upstreams.value(1)?;
                        Ok(upstreams.stream(0)?.map(move |x| x * factor))
                    },
                    ["x", "factor"],
                ),
            );
        SignalGraph::build(&definition, &InitialValues::new()).unwrap()
    }

    fn collect(stream: &Stream<i32>) -> (Arc<Mutex<Vec<i32>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = stream.subscribe(move |value| sink.lock().push(value));
        (seen, subscription)
    }

    #[test]
    fn input_only_for_primary_signals() {
        let graph = doubling_graph();
        assert!(graph.input("x").is_ok());
        assert_eq!(
            graph.input("doubled").unwrap_err(),
            GraphError::NotAnInput {
                name: "doubled".into()
            }
        );
        assert!(matches!(
            graph.input("factor"),
            Err(GraphError::NotAnInput { .. })
        ));
    }

    #[test]
    fn output_excludes_external_dependencies() {
        let graph = doubling_graph();
        assert!(graph.output("x").is_ok());
        assert!(graph.output("doubled").is_ok());
        assert_eq!(
            graph.output("factor").unwrap_err(),
            GraphError::UnknownSignal {
                name: "factor".into()
            }
        );
        assert!(matches!(
            graph.output("nope"),
            Err(GraphError::UnknownSignal { .. })
        ));
    }

    #[test]
    fn pushes_propagate_synchronously() {
        let graph = doubling_graph();
        let (seen, _sub) = collect(&graph.output("doubled").unwrap());

        graph.input("x").unwrap().push(3);
        assert_eq!(*seen.lock(), vec![6]);
        graph.input("x").unwrap().push(5);
        assert_eq!(*seen.lock(), vec![6, 10]);
    }

    #[test]
    fn introspection() {
        let graph = doubling_graph();
        let derived: Vec<&str> = graph.derived_keys().map(SignalName::as_str).collect();
        let external: Vec<&str> = graph.external_keys().map(SignalName::as_str).collect();

        assert_eq!(derived, ["doubled"]);
        assert_eq!(external, ["factor"]);
        assert_eq!(graph.role("x"), Some(Role::Primary));
        assert_eq!(graph.role("factor"), Some(Role::External));
        assert_eq!(graph.role("nope"), None);
    }

    #[test]
    fn connection_forwards_until_dropped() {
        let upstream = doubling_graph();
        let downstream = doubling_graph();
        let (seen, _sub) = collect(&downstream.output("doubled").unwrap());

        let connection = downstream.connect("x", &upstream, "doubled").unwrap();
        assert!(connection.is_connected());
        assert_eq!(connection.source().as_str(), "doubled");

        upstream.input("x").unwrap().push(1);
        assert_eq!(*seen.lock(), vec![4]);

        connection.disconnect();
        upstream.input("x").unwrap().push(2);
        assert_eq!(*seen.lock(), vec![4]);
    }

    #[test]
    fn connection_stops_reporting_connected_when_source_finishes() {
        let upstream = doubling_graph();
        let downstream = doubling_graph();

        let connection = downstream.connect("x", &upstream, "x").unwrap();
        upstream.input("x").unwrap().push(1);
        assert!(connection.is_connected());

        upstream.input("x").unwrap().complete();
        assert!(!connection.is_connected());
        assert!(!downstream.input("x").unwrap().is_closed());
    }

    #[test]
    fn connect_checks_both_names() {
        let a = doubling_graph();
        let b = doubling_graph();
        assert!(matches!(
            b.connect("doubled", &a, "x"),
            Err(GraphError::NotAnInput { .. })
        ));
        assert!(matches!(
            b.connect("x", &a, "factor"),
            Err(GraphError::UnknownSignal { .. })
        ));
    }
}
