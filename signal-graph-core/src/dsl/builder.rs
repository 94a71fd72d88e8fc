//! Graph Builder
//!
//! [`SignalGraphBuilder`] accumulates a definition from transforms and an
//! initial value bag, then builds graphs from them.

use crate::error::GraphError;
use crate::graph::{self, GraphDefinition, InitialValues, SignalGraph, SignalName};

use super::transform::Transform;

/// Accumulates a graph definition and its initial values.
///
/// Building borrows the builder, so one builder can produce any number of
/// independent graphs.
pub struct SignalGraphBuilder<V> {
    definition: GraphDefinition<V>,
    initial_values: InitialValues<V>,
}

impl<V> SignalGraphBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// A builder over an empty definition.
    pub fn new() -> Self {
        Self::from_definition(GraphDefinition::new())
    }

    /// A builder starting from an existing definition.
    pub fn from_definition(definition: GraphDefinition<V>) -> Self {
        Self {
            definition,
            initial_values: InitialValues::new(),
        }
    }

    /// Apply `transforms` in order. May be called repeatedly.
    pub fn define(mut self, transforms: impl IntoIterator<Item = Transform<V>>) -> Self {
        self.definition = transforms
            .into_iter()
            .fold(self.definition, |definition, transform| {
                transform.apply(definition)
            });
        self
    }

    /// Replace the initial values.
    pub fn initialize_with<K>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<SignalName>,
    {
        self.initial_values = values
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        self
    }

    /// Build a graph from the accumulated definition and initial values.
    pub fn build(&self) -> Result<SignalGraph<V>, GraphError> {
        graph::build(&self.definition, &self.initial_values)
    }

    /// The definition assembled so far.
    pub fn definition(&self) -> &GraphDefinition<V> {
        &self.definition
    }

    /// The current initial values.
    pub fn initial_values(&self) -> &InitialValues<V> {
        &self.initial_values
    }

    /// Split the builder into its definition and initial values, ready for
    /// [`build`](crate::graph::build).
    pub fn into_parts(self) -> (GraphDefinition<V>, InitialValues<V>) {
        (self.definition, self.initial_values)
    }
}

impl<V> Default for SignalGraphBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{add_derived, add_primary};

    #[test]
    fn define_folds_repeatedly() {
        let builder = SignalGraphBuilder::<i32>::new()
            .define([add_primary("x")])
            .define([add_derived("y", |up| up.stream(0), ["x"])]);

        let (definition, initial_values) = builder.into_parts();
        assert!(definition.primary_keys().contains("x"));
        assert!(definition.derived_signals().contains_key("y"));
        assert!(initial_values.is_empty());
    }

    #[test]
    fn initialize_with_replaces_the_bag() {
        let builder = SignalGraphBuilder::<i32>::new()
            .define([add_primary("x"), add_primary("y")])
            .initialize_with([("x", 1)])
            .initialize_with([("y", 2)]);

        let values = builder.initial_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("y"), Some(&2));
    }

    #[test]
    fn builds_independent_graphs() {
        let builder = SignalGraphBuilder::<i32>::new().define([add_primary("x")]);
        let a = builder.build().unwrap();
        let b = builder.build().unwrap();

        a.input("x").unwrap().push(1);
        assert_eq!(a.input("x").unwrap().latest(), Some(1));
        assert_eq!(b.input("x").unwrap().latest(), None);
    }

    #[test]
    fn from_definition_keeps_existing_entries() {
        let definition = GraphDefinition::<i32>::new().with_primary("x");
        let builder = SignalGraphBuilder::from_definition(definition).define([add_primary("y")]);
        assert_eq!(builder.definition().primary_keys().len(), 2);
    }
}
