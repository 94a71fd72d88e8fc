//! Property Tests for Topological Sorting

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use proptest::sample::Index;

use signal_graph_core::graph::toposort::sort;

/// Node `i` may only depend on nodes below `i`, which keeps the map acyclic.
/// `None` entries become empty slots.
fn acyclic_map(slots: &[Vec<Option<Index>>]) -> Vec<(String, Vec<Option<String>>)> {
    slots
        .iter()
        .enumerate()
        .map(|(i, node_slots)| {
            let deps = node_slots
                .iter()
                .map(|slot| match slot {
                    Some(index) if i > 0 => Some(format!("n{}", index.index(i))),
                    _ => None,
                })
                .collect();
            (format!("n{i}"), deps)
        })
        .collect()
}

proptest! {
    #[test]
    fn acyclic_maps_sort_completely(
        slots in prop::collection::vec(
            prop::collection::vec(prop::option::of(any::<Index>()), 0..5),
            1..24,
        ),
        reverse in any::<bool>(),
    ) {
        let mut map = acyclic_map(&slots);
        if reverse {
            map.reverse();
        }

        let order = sort(map.clone()).unwrap();

        let distinct: HashSet<&String> = map
            .iter()
            .flat_map(|(node, deps)| std::iter::once(node).chain(deps.iter().flatten()))
            .collect();
        prop_assert_eq!(order.len(), distinct.len());

        let position: HashMap<&String, usize> =
            order.iter().enumerate().map(|(i, node)| (node, i)).collect();
        prop_assert_eq!(position.len(), order.len());

        for (node, deps) in &map {
            for dep in deps.iter().flatten() {
                prop_assert!(position[dep] < position[node], "{} before {}", dep, node);
            }
        }
    }

    #[test]
    fn rings_are_reported_as_cycles(len in 1usize..12) {
        let map: Vec<(usize, Vec<Option<usize>>)> =
            (0..len).map(|i| (i, vec![Some((i + 1) % len)])).collect();

        let err = sort(map).unwrap_err();
        prop_assert_eq!(err.unresolved.len(), len);
    }

    #[test]
    fn sorting_is_deterministic(
        slots in prop::collection::vec(
            prop::collection::vec(prop::option::of(any::<Index>()), 0..4),
            1..16,
        ),
    ) {
        let map = acyclic_map(&slots);
        prop_assert_eq!(sort(map.clone()).unwrap(), sort(map).unwrap());
    }
}
