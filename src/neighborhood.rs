use fnv::FnvHashSet;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::graph::Adjacency;

/// A vertex set and the edges of the original graph induced by it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct Subgraph {
    /// Vertices in the order they were first visited.
    pub vertices: Vec<usize>,
    /// Indices into the original graph's edges, in edge order.
    pub edges: Vec<usize>,
}

impl Subgraph {
    pub fn contains(&self, vertex: usize) -> bool {
        self.vertices.contains(&vertex)
    }
}

/// Collects the vertices reachable from `start` in at most
/// `max_depth` steps, ignoring edge direction, together with every
/// edge whose endpoints were both reached.
///
/// The frontier is expanded exactly `max_depth + 1` times. A vertex
/// that shows up in a frontier after it has been visited is skipped,
/// so the frontier can hold duplicates without changing the result.
/// With `max_depth == 0` only `start` is visited, and the only edges
/// kept are its self-loops.
pub fn neighborhood<G: Adjacency>(
    graph: &G,
    start: usize,
    max_depth: usize,
) -> Subgraph {
    if !graph.has_vertex(start) {
        return Subgraph::default();
    }

    let mut visited: FnvHashSet<usize> = FnvHashSet::default();
    let mut order = Vec::new();

    let mut frontier = vec![start];
    let mut pending = Vec::new();

    for _ in 0..=max_depth {
        for &vertex in frontier.iter() {
            if !visited.insert(vertex) {
                continue;
            }
            order.push(vertex);
            pending.extend_from_slice(graph.neighbors(vertex));
        }
        std::mem::swap(&mut frontier, &mut pending);
        pending.clear();
    }

    let edges = (0..graph.edge_count())
        .filter(|&e| {
            let (from, to) = graph.edge_endpoints(e);
            visited.contains(&from) && visited.contains(&to)
        })
        .collect();

    Subgraph {
        vertices: order,
        edges,
    }
}
