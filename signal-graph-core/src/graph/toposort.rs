//! Topological Sort
//!
//! Orders a dependency map so that every node comes after everything it
//! depends on. The graph builder uses this to decide in which order derived
//! signals have to be constructed.
//!
//! # Algorithm
//!
//! Kahn's algorithm:
//!
//! 1. Discover every node, keys and dependencies alike, in first-appearance
//!    order. Empty dependency slots are skipped and create no node.
//! 2. Add an edge dependency → dependent for every populated slot and count
//!    incoming edges per node.
//! 3. Repeatedly emit a node with no incoming edges and remove its outgoing
//!    edges.
//! 4. If any node is left over, the remaining edges contain a cycle.
//!
//! Ready nodes are processed first-in first-out in discovery order, so the
//! result for a given input is always the same.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use indexmap::IndexSet;
use thiserror::Error;

/// The dependency map could not be ordered because it contains a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency cycle among {unresolved:?}")]
pub struct CycleError<N> {
    /// Nodes that could not be ordered, in discovery order. This includes
    /// every node on a cycle and everything downstream of one.
    pub unresolved: Vec<N>,
}

/// Sort a dependency map topologically.
///
/// Each item of `dependency_map` is a node together with its dependency
/// slots. Returns every distinct node, each after all of its dependencies.
pub fn sort<N, I, D>(dependency_map: I) -> Result<Vec<N>, CycleError<N>>
where
    N: Clone + Eq + Hash,
    I: IntoIterator<Item = (N, D)>,
    D: IntoIterator<Item = Option<N>>,
{
    let mut nodes: IndexSet<N> = IndexSet::new();
    let mut dependents: Vec<Vec<usize>> = Vec::new();
    let mut in_degree: Vec<usize> = Vec::new();
    let mut edges: HashSet<(usize, usize)> = HashSet::new();

    let mut intern = |node: N, dependents: &mut Vec<Vec<usize>>, in_degree: &mut Vec<usize>| {
        let (index, inserted) = nodes.insert_full(node);
        if inserted {
            dependents.push(Vec::new());
            in_degree.push(0);
        }
        index
    };

    for (node, dependencies) in dependency_map {
        let dependent = intern(node, &mut dependents, &mut in_degree);
        for dependency in dependencies.into_iter().flatten() {
            let dependency = intern(dependency, &mut dependents, &mut in_degree);
            if edges.insert((dependency, dependent)) {
                dependents[dependency].push(dependent);
                in_degree[dependent] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(index) = queue.pop_front() {
        order.push(index);

        for &dependent in &dependents[index] {
            let degree = &mut in_degree[dependent];
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() < nodes.len() {
        let unresolved = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .filter_map(|(index, _)| nodes.get_index(index).cloned())
            .collect();
        return Err(CycleError { unresolved });
    }

    Ok(order
        .into_iter()
        .filter_map(|index| nodes.get_index(index).cloned())
        .collect())
}
