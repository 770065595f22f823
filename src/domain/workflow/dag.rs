use std::collections::BTreeSet;

use crate::domain::workflow::indexer::InstanceIndexer;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

/// Directed acyclic graph over instance indices.
///
/// Edges are addressed by `(from, to)` index pairs; there are no node objects
/// holding references to each other.
#[derive(Debug, Clone)]
pub struct Dag {
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    topological_order: Vec<usize>,
}

impl Dag {
    /// Builds the graph and its topological order.
    ///
    /// Fails with `CycleDetected` naming an instance on the cycle.
    pub fn new(instances: &InstanceIndexer, edges: &[(usize, usize)]) -> Result<Self> {
        let node_count = instances.len();
        let mut successor_sets = vec![BTreeSet::new(); node_count];
        let mut predecessor_sets = vec![BTreeSet::new(); node_count];

        for &(from, to) in edges {
            if from >= node_count || to >= node_count {
                return Err(Error::UnknownIdentifier(format!("edge {} -> {}", from, to)));
            }
            successor_sets[from].insert(to);
            predecessor_sets[to].insert(from);
        }

        let successors: Vec<Vec<usize>> = successor_sets.into_iter().map(|set| set.into_iter().collect()).collect();
        let predecessors: Vec<Vec<usize>> = predecessor_sets.into_iter().map(|set| set.into_iter().collect()).collect();

        let topological_order = Self::topological_sort(instances, &successors)?;

        Ok(Dag { predecessors, successors, topological_order })
    }

    /// Depth-first search with visiting/visited colouring. A back edge to a
    /// node still being visited is a cycle.
    fn topological_sort(instances: &InstanceIndexer, successors: &[Vec<usize>]) -> Result<Vec<usize>> {
        let node_count = successors.len();
        let mut state = vec![VisitState::Unvisited; node_count];
        let mut post_order = Vec::with_capacity(node_count);

        for root in 0..node_count {
            if state[root] != VisitState::Unvisited {
                continue;
            }

            // (node, next successor position)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            state[root] = VisitState::Visiting;

            while let Some((node, position)) = stack.last_mut() {
                let node = *node;
                if let Some(&next) = successors[node].get(*position) {
                    *position += 1;
                    match state[next] {
                        VisitState::Unvisited => {
                            state[next] = VisitState::Visiting;
                            stack.push((next, 0));
                        }
                        VisitState::Visiting => {
                            let name = instances.index_to_value(next).map(str::to_string).unwrap_or_else(|_| next.to_string());
                            return Err(Error::CycleDetected(name));
                        }
                        VisitState::Visited => {}
                    }
                } else {
                    state[node] = VisitState::Visited;
                    post_order.push(node);
                    stack.pop();
                }
            }
        }

        post_order.reverse();
        Ok(post_order)
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn predecessors(&self, instance: usize) -> &[usize] {
        &self.predecessors[instance]
    }

    pub fn successors(&self, instance: usize) -> &[usize] {
        &self.successors[instance]
    }

    /// Every predecessor precedes its successors in this order.
    pub fn topological_order(&self) -> &[usize] {
        &self.topological_order
    }

    pub fn is_sync_node(&self, instance: usize) -> bool {
        self.predecessors[instance].len() >= 2
    }

    /// Instances without predecessors.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.predecessors[i].is_empty()).collect()
    }

    /// Every simple path that starts at `start` and ends at a sync node.
    ///
    /// Paths do not stop at the first sync node; a path through a sync node to a
    /// later one is reported as well. If `start` is itself a sync node, `[start]`
    /// is one of the paths.
    pub fn paths_to_any_sync_node(&self, start: usize) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        let mut current = vec![start];
        self.collect_sync_paths(start, &mut current, &mut paths);
        paths
    }

    fn collect_sync_paths(&self, node: usize, current: &mut Vec<usize>, paths: &mut Vec<Vec<usize>>) {
        if self.is_sync_node(node) {
            paths.push(current.clone());
        }
        for &next in &self.successors[node] {
            // acyclic, so the path can never revisit a node
            current.push(next);
            self.collect_sync_paths(next, current, paths);
            current.pop();
        }
    }

    /// Sync nodes at the end of any path returned by [`Dag::paths_to_any_sync_node`].
    pub fn reachable_sync_nodes(&self, start: usize) -> Vec<usize> {
        let nodes: BTreeSet<usize> = self.paths_to_any_sync_node(start).into_iter().filter_map(|path| path.last().copied()).collect();
        nodes.into_iter().collect()
    }
}
