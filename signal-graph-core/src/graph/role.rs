//! Signal Roles
//!
//! Every name in a graph definition plays exactly one role. The role table is
//! built once per build and answers "what is this name" for dependency
//! resolution and for the handle's lookups.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::definition::GraphDefinition;
use super::name::SignalName;
use crate::error::GraphError;

/// The role a name plays in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Driven from outside through an input subject. Roots of the graph.
    Primary,

    /// A value, stream or service supplied with the definition. Never a
    /// signal itself, only an upstream of derived signals.
    External,

    /// Computed from other signals and dependencies.
    Derived,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Primary => "a primary signal",
            Role::External => "an external dependency",
            Role::Derived => "a derived signal",
        })
    }
}

/// Name to role lookup for one graph definition.
#[derive(Debug, Clone, Default)]
pub(crate) struct RoleTable {
    roles: IndexMap<SignalName, Role>,
}

impl RoleTable {
    /// Collect the roles of every declared name.
    ///
    /// Fails with [`GraphError::ConflictingRole`] on the first name declared
    /// in two roles.
    pub(crate) fn from_definition<V>(definition: &GraphDefinition<V>) -> Result<Self, GraphError> {
        let mut table = Self::default();
        for name in definition.primary_keys() {
            table.declare(name, Role::Primary)?;
        }
        for name in definition.external_dependencies().keys() {
            table.declare(name, Role::External)?;
        }
        for name in definition.derived_signals().keys() {
            table.declare(name, Role::Derived)?;
        }
        Ok(table)
    }

    fn declare(&mut self, name: &SignalName, role: Role) -> Result<(), GraphError> {
        match self.roles.get(name) {
            Some(&first) if first != role => Err(GraphError::ConflictingRole {
                name: name.clone(),
                first,
                second: role,
            }),
            Some(_) => Ok(()),
            None => {
                self.roles.insert(name.clone(), role);
                Ok(())
            }
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Role> {
        self.roles.get(name).copied()
    }

    pub(crate) fn names(&self, role: Role) -> impl Iterator<Item = &SignalName> + '_ {
        self.roles
            .iter()
            .filter(move |(_, r)| **r == role)
            .map(|(name, _)| name)
    }
}
