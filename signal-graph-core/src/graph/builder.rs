//! Graph Construction
//!
//! Turns a [`GraphDefinition`] plus initial values into a running
//! [`SignalGraph`].
//!
//! # Build Steps
//!
//! 1. Collect the role of every name. Reject names declared twice in
//!    different roles, dependency lists with too many slots, and slots
//!    naming nothing declared. No derivation has run at this point.
//! 2. Sort the derived signals topologically over their dependency slots.
//!    A cycle fails the build before anything is allocated.
//! 3. Create one input subject per primary signal.
//! 4. Wrap each input in a shared replaying view, seeded with its initial
//!    value if one was given.
//! 5. Walk the sorted names. Resolve each derived signal's populated slots
//!    to already built signals or external dependencies, run its derivation,
//!    and store the result as a shared replaying view.
//! 6. Hand the subjects and views to the graph handle.
//!
//! Any failure aborts the whole build. A build never returns a partially
//! wired graph.

use indexmap::IndexMap;

use super::definition::{
    Dependency, DependencyList, GraphDefinition, InitialValues, MAX_DEPENDENCY_SLOTS,
};
use super::name::SignalName;
use super::role::{Role, RoleTable};
use super::signal_graph::SignalGraph;
use super::topology::{DerivedNode, Topology};
use super::toposort;
use super::upstream::{Upstream, Upstreams};
use crate::error::GraphError;
use crate::reactive::{Stream, Subject};

/// Build a signal graph from its definition.
pub fn build<V>(
    definition: &GraphDefinition<V>,
    initial_values: &InitialValues<V>,
) -> Result<SignalGraph<V>, GraphError>
where
    V: Clone + Send + Sync + 'static,
{
    let span = tracing::debug_span!(
        "build_signal_graph",
        primary = definition.primary_keys().len(),
        external = definition.external_dependencies().len(),
        derived = definition.derived_signals().len(),
    );
    let _enter = span.enter();

    let roles = RoleTable::from_definition(definition)?;
    check_slot_counts(definition)?;
    check_dependencies_declared(definition, &roles)?;
    check_initial_values(&roles, initial_values);

    let build_order = derived_build_order(definition, &roles)?;
    tracing::debug!(order = ?build_order, "derived signal build order");

    let inputs: IndexMap<SignalName, Subject<V>> = definition
        .primary_keys()
        .iter()
        .map(|name| (name.clone(), Subject::new()))
        .collect();

    let mut arena = SignalArena {
        roles: &roles,
        external: definition.external_dependencies(),
        primary: inputs
            .iter()
            .map(|(name, input)| {
                let seed = initial_values.get(name).cloned();
                (name.clone(), input.stream().share_replay_seeded(seed))
            })
            .collect(),
        derived: IndexMap::with_capacity(definition.derived_signals().len()),
    };

    for name in &build_order {
        let Some(spec) = definition.derived_signals().get(name) else {
            continue;
        };

        let stream = {
            let upstreams = arena.resolve(name, spec.dependencies())?;
            spec.derive(&upstreams)
                .map_err(|source| GraphError::Derivation {
                    signal: name.clone(),
                    source,
                })?
        };

        let seed = initial_values.get(name).cloned();
        arena
            .derived
            .insert(name.clone(), stream.share_replay_seeded(seed));
        tracing::trace!(signal = %name, "derived signal wired");
    }

    let topology = topology(definition, &build_order);
    let SignalArena {
        primary, derived, ..
    } = arena;

    tracing::debug!(
        inputs = inputs.len(),
        derived = derived.len(),
        "signal graph built"
    );

    Ok(SignalGraph::new(
        inputs,
        primary,
        derived,
        roles,
        build_order,
        topology,
    ))
}

/// Signals built so far, plus the external dependencies they may use.
struct SignalArena<'d, V> {
    roles: &'d RoleTable,
    external: &'d IndexMap<SignalName, Dependency<V>>,
    primary: IndexMap<SignalName, Stream<V>>,
    derived: IndexMap<SignalName, Stream<V>>,
}

impl<'d, V> SignalArena<'d, V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Resolve the populated slots of `signal`'s dependency list.
    fn resolve<'a>(
        &'a self,
        signal: &SignalName,
        dependencies: &DependencyList,
    ) -> Result<Upstreams<'a, V>, GraphError> {
        dependencies
            .names()
            .map(|dependency| {
                let upstream = match self.roles.get(dependency) {
                    Some(Role::Primary) => self.primary.get(dependency).map(Upstream::Signal),
                    Some(Role::External) => self.external.get(dependency).map(Upstream::Dependency),
                    Some(Role::Derived) => self.derived.get(dependency).map(Upstream::Signal),
                    None => None,
                };
                upstream.ok_or_else(|| GraphError::MissingSignal {
                    signal: signal.clone(),
                    dependency: dependency.clone(),
                })
            })
            .collect()
    }
}

fn check_slot_counts<V>(definition: &GraphDefinition<V>) -> Result<(), GraphError> {
    for (name, spec) in definition.derived_signals() {
        let count = spec.dependencies().len();
        if count > MAX_DEPENDENCY_SLOTS {
            return Err(GraphError::TooManyDependencies {
                signal: name.clone(),
                count,
            });
        }
    }
    Ok(())
}

fn check_dependencies_declared<V>(
    definition: &GraphDefinition<V>,
    roles: &RoleTable,
) -> Result<(), GraphError> {
    for (name, spec) in definition.derived_signals() {
        if let Some(dependency) = spec
            .dependencies()
            .names()
            .find(|dependency| roles.get(dependency).is_none())
        {
            return Err(GraphError::MissingSignal {
                signal: name.clone(),
                dependency: dependency.clone(),
            });
        }
    }
    Ok(())
}

fn check_initial_values<V>(roles: &RoleTable, initial_values: &InitialValues<V>) {
    for name in initial_values.keys() {
        match roles.get(name) {
            Some(Role::Primary | Role::Derived) => {}
            Some(Role::External) => {
                tracing::warn!(signal = %name, "initial value for an external dependency ignored");
            }
            None => {
                tracing::warn!(signal = %name, "initial value for an undeclared signal ignored");
            }
        }
    }
}

/// Topological order of the derived signals. Primary signals and external
/// dependencies take part in the sort but are filtered out.
fn derived_build_order<V>(
    definition: &GraphDefinition<V>,
    roles: &RoleTable,
) -> Result<Vec<SignalName>, GraphError> {
    let dependency_map = definition
        .derived_signals()
        .iter()
        .map(|(name, spec)| (name.clone(), spec.dependencies().slots().iter().cloned()));

    let order = toposort::sort(dependency_map).map_err(|err| GraphError::CyclicDependency {
        signals: err.unresolved,
    })?;

    Ok(order
        .into_iter()
        .filter(|name| roles.get(name) == Some(Role::Derived))
        .collect())
}

fn topology<V>(definition: &GraphDefinition<V>, build_order: &[SignalName]) -> Topology {
    Topology {
        primary: definition.primary_keys().iter().cloned().collect(),
        external: definition.external_dependencies().keys().cloned().collect(),
        derived: definition
            .derived_signals()
            .iter()
            .map(|(name, spec)| DerivedNode {
                name: name.clone(),
                dependencies: spec.dependencies().slots().to_vec(),
            })
            .collect(),
        build_order: build_order.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::graph::DerivationSpec;

    fn passthrough(dependencies: &[&str]) -> DerivationSpec<i32> {
        DerivationSpec::new(|upstreams| upstreams.stream(0), dependencies.to_vec())
    }

    #[test]
    fn builds_in_dependency_order() {
        let definition = GraphDefinition::new()
            .with_primary("x")
            .with_derived("z", passthrough(&["y"]))
            .with_derived("y", passthrough(&["x"]));

        let graph = build(&definition, &InitialValues::new()).unwrap();
        let order: Vec<&str> = graph.build_order().iter().map(SignalName::as_str).collect();
        assert_eq!(order, ["y", "z"]);
    }

    #[test]
    fn missing_dependency_fails_the_build() {
        let definition = GraphDefinition::new().with_derived("y", passthrough(&["nowhere"]));

        let err = build(&definition, &InitialValues::new()).unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingSignal {
                signal: "y".into(),
                dependency: "nowhere".into(),
            }
        );
    }

    #[test]
    fn missing_dependency_fails_before_any_derivation_runs() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let definition = GraphDefinition::<i32>::new()
            .with_primary("x")
            .with_derived(
                "y",
                DerivationSpec::new(
                    move |upstreams| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        upstreams.stream(0)
                    },
                    ["x"],
                ),
            )
            .with_derived("z", passthrough(&["y", "nowhere"]));

        let err = build(&definition, &InitialValues::new()).unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingSignal {
                signal: "z".into(),
                dependency: "nowhere".into(),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cycles_fail_the_build() {
        let definition = GraphDefinition::new()
            .with_derived("a", passthrough(&["b"]))
            .with_derived("b", passthrough(&["a"]));

        let err = build(&definition, &InitialValues::new()).unwrap_err();
        assert_eq!(
            err,
            GraphError::CyclicDependency {
                signals: vec!["a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn too_many_slots_fail_the_build() {
        let names: Vec<String> = (0..=MAX_DEPENDENCY_SLOTS).map(|i| format!("x{i}")).collect();
        let definition = names
            .iter()
            .fold(GraphDefinition::<i32>::new(), |definition, name| {
                definition.with_primary(name)
            })
            .with_derived(
                "y",
                DerivationSpec::new(|upstreams| upstreams.stream(0), names.clone()),
            );

        let err = build(&definition, &InitialValues::new()).unwrap_err();
        assert_eq!(
            err,
            GraphError::TooManyDependencies {
                signal: "y".into(),
                count: MAX_DEPENDENCY_SLOTS + 1,
            }
        );
    }

    #[test]
    fn derivation_errors_name_the_signal() {
        let definition = GraphDefinition::<i32>::new()
            .with_primary("x")
            .with_derived("y", DerivationSpec::new(|upstreams| upstreams.stream(3), ["x"]));

        let err = build(&definition, &InitialValues::new()).unwrap_err();
        assert_eq!(
            err,
            GraphError::Derivation {
                signal: "y".into(),
                source: UpstreamError::MissingSlot { slot: 3, len: 1 },
            }
        );
    }

    #[test]
    fn derivation_runs_once_per_build() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let definition = GraphDefinition::<i32>::new().with_primary("x").with_derived(
            "y",
            DerivationSpec::new(
                move |upstreams| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    upstreams.stream(0)
                },
                ["x"],
            ),
        );

        let graph = build(&definition, &InitialValues::new()).unwrap();
        let _a = graph.output("y").unwrap().subscribe(|_| {});
        let _b = graph.output("y").unwrap().subscribe(|_| {});
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn topology_mirrors_definition() {
        let definition = GraphDefinition::<i32>::new()
            .with_primary("x")
            .with_dependency("offset", Dependency::value(1))
            .with_derived(
                "y",
                DerivationSpec::new(
                    |upstreams| upstreams.stream(0),
                    DependencyList::new().with("x").with_empty_slot().with("offset"),
                ),
            );

        let graph = build(&definition, &InitialValues::new()).unwrap();
        let topology = graph.topology();
        assert_eq!(topology.primary, vec![SignalName::from("x")]);
        assert_eq!(topology.external, vec![SignalName::from("offset")]);
        assert_eq!(topology.derived[0].dependencies.len(), 3);
        assert_eq!(topology.build_order, vec![SignalName::from("y")]);
    }
}
