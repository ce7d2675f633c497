//! Parent-class dependency ordering
//!
//! An entry depends on another when its target parent is the other entry's
//! generated class. Cycles are found with Tarjan's SCC; the execution order is
//! Kahn's algorithm with a min-heap on the row index, so independent entries
//! keep their file order.

use crate::entry::PlanEntry;
use crate::error::{PlanError, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Compute the execution order of `entries` as indices into the slice
pub(crate) fn dependency_order(entries: &[PlanEntry]) -> Result<Vec<usize>> {
    let mut graph = DiGraph::<usize, ()>::with_capacity(entries.len(), entries.len());
    let nodes: Vec<NodeIndex> = (0..entries.len()).map(|i| graph.add_node(i)).collect();

    let by_class: HashMap<_, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.path.generated_class(), i))
        .collect();

    for (i, entry) in entries.iter().enumerate() {
        if let Some(&parent) = by_class.get(&entry.target_parent) {
            if parent == i {
                return Err(PlanError::CyclicParentDependency {
                    cycle: vec![entry.path.to_string()],
                });
            }
            graph.add_edge(nodes[parent], nodes[i], ());
        }
    }

    if let Some(component) = tarjan_scc(&graph).into_iter().find(|c| c.len() > 1) {
        let mut members: Vec<usize> = component.iter().map(|n| graph[*n]).collect();
        members.sort_unstable();
        return Err(PlanError::CyclicParentDependency {
            cycle: members.iter().map(|&i| entries[i].path.to_string()).collect(),
        });
    }

    let mut indegree: Vec<usize> = nodes
        .iter()
        .map(|n| graph.neighbors_directed(*n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(entries.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for child in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
            let c = graph[child];
            indegree[c] -= 1;
            if indegree[c] == 0 {
                ready.push(Reverse(c));
            }
        }
    }
    debug_assert_eq!(order.len(), entries.len());
    Ok(order)
}

/// Lazy iterator over plan entries in dependency order
#[derive(Debug, Clone)]
pub struct OrderedEntries<'a> {
    pub(crate) entries: &'a [PlanEntry],
    pub(crate) order: std::slice::Iter<'a, usize>,
}

impl<'a> Iterator for OrderedEntries<'a> {
    type Item = &'a PlanEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.order.next().map(|&i| &self.entries[i])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl ExactSizeIterator for OrderedEntries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use bpm_model::{AssetPath, ClassPath};

    fn entry(path: &str, parent: &str) -> PlanEntry {
        PlanEntry::new(AssetPath::parse(path).unwrap(), ClassPath::parse(parent).unwrap())
    }

    #[test]
    fn children_follow_parents() {
        let entries = vec![
            entry("/Game/Child", "/Game/Parent"),
            entry("/Game/Other", "/Script/G.Other"),
            entry("/Game/Parent", "/Script/G.Base"),
        ];
        assert_eq!(dependency_order(&entries).unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn ties_keep_file_order() {
        let entries = vec![
            entry("/Game/C", "/Script/G.X"),
            entry("/Game/A", "/Script/G.X"),
            entry("/Game/B", "/Script/G.X"),
        ];
        assert_eq!(dependency_order(&entries).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let entries = vec![entry("/Game/A", "/Game/A.A_C")];
        let err = dependency_order(&entries).unwrap_err();
        assert!(matches!(err, PlanError::CyclicParentDependency { cycle } if cycle == ["/Game/A"]));
    }

    #[test]
    fn two_entry_cycle_is_reported_in_row_order() {
        let entries = vec![
            entry("/Game/Z", "/Script/G.Base"),
            entry("/Game/B", "/Game/A"),
            entry("/Game/A", "/Game/B"),
        ];
        let err = dependency_order(&entries).unwrap_err();
        assert!(
            matches!(err, PlanError::CyclicParentDependency { ref cycle } if cycle == &["/Game/B", "/Game/A"]),
            "{err}"
        );
    }
}
