//! Definition Transforms
//!
//! Each transform extends one field of a [`GraphDefinition`]. Transforms are
//! plain values, so a list of them can be built up, stored and applied in
//! one fold.

use std::fmt;

use crate::error::UpstreamError;
use crate::graph::{
    Dependency, DependencyList, DerivationSpec, GraphDefinition, SignalName, Upstreams,
};
use crate::reactive::Stream;

/// One step of a graph definition.
pub enum Transform<V> {
    AddPrimary(SignalName),
    AddDependency(SignalName, Dependency<V>),
    AddDerived(SignalName, DerivationSpec<V>),
}

impl<V> Transform<V> {
    /// Apply this step, returning the extended definition.
    pub fn apply(self, definition: GraphDefinition<V>) -> GraphDefinition<V> {
        match self {
            Transform::AddPrimary(name) => definition.with_primary(name),
            Transform::AddDependency(name, dependency) => {
                definition.with_dependency(name, dependency)
            }
            Transform::AddDerived(name, spec) => definition.with_derived(name, spec),
        }
    }

    /// The name this step declares.
    pub fn name(&self) -> &SignalName {
        match self {
            Transform::AddPrimary(name)
            | Transform::AddDependency(name, _)
            | Transform::AddDerived(name, _) => name,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Transform<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::AddPrimary(name) => f.debug_tuple("AddPrimary").field(name).finish(),
            Transform::AddDependency(name, dependency) => f
                .debug_tuple("AddDependency")
                .field(name)
                .field(dependency)
                .finish(),
            Transform::AddDerived(name, spec) => {
                f.debug_tuple("AddDerived").field(name).field(spec).finish()
            }
        }
    }
}

/// Declare a primary signal.
pub fn add_primary<V>(name: impl Into<SignalName>) -> Transform<V> {
    Transform::AddPrimary(name.into())
}

/// Supply an external dependency.
pub fn add_dependency<V>(name: impl Into<SignalName>, dependency: Dependency<V>) -> Transform<V> {
    Transform::AddDependency(name.into(), dependency)
}

/// Declare a derived signal computed by `derivation` from `dependencies`.
///
/// ```
/// use signal_graph_core::dsl::{add_derived, add_primary, SignalGraphBuilder};
///
/// let graph = SignalGraphBuilder::<i32>::new()
///     .define([
///         add_primary("x"),
///         add_derived("doubled", |up| Ok(up.stream(0)?.map(|x: i32| x * 2)), ["x"]),
///     ])
///     .build()
///     .unwrap();
///
/// graph.input("x").unwrap().push(21);
/// let _sub = graph.output("doubled").unwrap().subscribe(|v| assert_eq!(v, 42));
/// ```
pub fn add_derived<V, F>(
    name: impl Into<SignalName>,
    derivation: F,
    dependencies: impl Into<DependencyList>,
) -> Transform<V>
where
    V: Clone + Send + Sync + 'static,
    F: Fn(&Upstreams<'_, V>) -> Result<Stream<V>, UpstreamError> + Send + Sync + 'static,
{
    Transform::AddDerived(name.into(), DerivationSpec::new(derivation, dependencies))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_extend_one_field_each() {
        let definition = [
            add_primary::<i32>("x"),
            add_dependency("offset", Dependency::value(3)),
            add_derived("y", |up| up.stream(0), ["x"]),
        ]
        .into_iter()
        .fold(GraphDefinition::new(), |definition, transform| {
            transform.apply(definition)
        });

        assert_eq!(definition.primary_keys().len(), 1);
        assert!(definition.external_dependencies().contains_key("offset"));
        assert!(definition.derived_signals().contains_key("y"));
    }

    #[test]
    fn apply_leaves_other_fields_alone() {
        let before = GraphDefinition::<i32>::new().with_primary("x");
        let after = add_dependency("offset", Dependency::value(1)).apply(before.clone());

        assert_eq!(after.primary_keys(), before.primary_keys());
        assert!(before.external_dependencies().is_empty());
        assert_eq!(after.external_dependencies().len(), 1);
    }

    #[test]
    fn transform_reports_its_name() {
        let transform = add_primary::<i32>("x");
        assert_eq!(transform.name().as_str(), "x");
    }
}
