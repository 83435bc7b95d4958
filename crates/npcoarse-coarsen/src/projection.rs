//! One-mode projection of a single layer.
//!
//! # Overview
//!
//! The projection is a same-layer graph: its nodes are the vertices of one
//! layer, and two of them are joined when they sit at distance exactly two in
//! the layered graph (they share a neighbor in another layer). Each edge is
//! weighted by the projection similarity measured on the layered graph.
//!
//! Nodes use local indices `0..layer_size` in layer order; the node weight is
//! the vertex's global id. Strategies that run on the projection report
//! matchings in global ids through [`OneModeProjection::to_global`].

use std::ops::Range;

use fixedbitset::FixedBitSet;
use npcoarse_core::graph::{Adjacency, LayeredGraph};
use npcoarse_core::similarity::Similarity;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use tracing::{debug, instrument};

/// Weighted same-layer graph derived from two-hop connectivity.
#[derive(Debug, Clone)]
pub struct OneModeProjection {
    graph: UnGraph<usize, f64>,
    adjacency: Adjacency,
    range: Range<usize>,
}

impl OneModeProjection {
    /// Project `layer` of `graph`, weighting edges with `projection`.
    ///
    /// Edges are inserted in layer order of their first endpoint, then in
    /// BFS order of the second, so edge order is deterministic.
    #[must_use]
    #[instrument(skip(graph), fields(layer_size = graph.layer_size(layer)))]
    pub fn build(graph: &LayeredGraph, layer: usize, projection: Similarity) -> Self {
        let range = graph.layer_range(layer);
        let size = range.len();
        let score = projection.bind(graph.adjacency());

        let mut projected = UnGraph::<usize, f64>::with_capacity(size, 0);
        for v in range.clone() {
            projected.add_node(v);
        }

        let mut done = FixedBitSet::with_capacity(size);
        for v in range.clone() {
            let local = v - range.start;
            for u in graph.two_hop_in_layer(v) {
                if done.contains(u - range.start) {
                    continue;
                }
                projected.add_edge(
                    NodeIndex::new(local),
                    NodeIndex::new(u - range.start),
                    score(v, u),
                );
            }
            done.insert(local);
        }

        let adjacency = Adjacency::from_edges(
            size,
            projected
                .edge_references()
                .map(|e| (e.source().index(), e.target().index(), *e.weight())),
        );
        debug!(edges = projected.edge_count(), "built one-mode projection");

        Self {
            graph: projected,
            adjacency,
            range,
        }
    }

    /// Number of projected vertices (the layer size).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges as `(local_u, local_v, weight)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    /// Adjacency over local indices.
    #[must_use]
    pub const fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Global id of local node `local`.
    #[must_use]
    pub fn to_global(&self, local: usize) -> usize {
        self.graph[NodeIndex::new(local)]
    }

    /// Global id range of the projected layer.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// A copy of this projection with every edge weight replaced.
    ///
    /// # Panics
    ///
    /// Panics if `weights` does not hold one value per edge.
    #[must_use]
    pub fn reweighted(&self, weights: &[f64]) -> Self {
        assert_eq!(weights.len(), self.edge_count(), "one weight per edge");
        let mut graph = self.graph.clone();
        for (edge, &w) in graph.edge_weights_mut().zip(weights) {
            *edge = w;
        }
        let adjacency = Adjacency::from_edges(
            graph.node_count(),
            graph
                .edge_references()
                .map(|e| (e.source().index(), e.target().index(), *e.weight())),
        );
        Self {
            graph,
            adjacency,
            range: self.range.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Layer 0 = {0, 1, 2}, layer 1 = {3, 4}.
    /// 0 and 1 share 3 and 4; 1 and 2 share 4; 0 and 2 share 4.
    fn bipartite() -> LayeredGraph {
        LayeredGraph::from_edges(
            &[3, 2],
            &[(0, 3, 1.0), (0, 4, 1.0), (1, 3, 1.0), (1, 4, 1.0), (2, 4, 1.0)],
        )
        .expect("valid graph")
    }

    #[test]
    fn projects_two_hop_pairs_once() {
        let g = bipartite();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        assert_eq!(p.node_count(), 3);
        let edges: Vec<_> = p.edges().collect();
        assert_eq!(edges, vec![(0, 1, 2.0), (0, 2, 1.0), (1, 2, 1.0)]);
    }

    #[test]
    fn second_layer_uses_local_indices() {
        let g = bipartite();
        let p = OneModeProjection::build(&g, 1, Similarity::CommonNeighbors);
        assert_eq!(p.node_count(), 2);
        assert_eq!(p.to_global(0), 3);
        assert_eq!(p.to_global(1), 4);
        assert_eq!(p.edges().collect::<Vec<_>>(), vec![(0, 1, 2.0)]);
        assert_eq!(p.adjacency().degree(1), 1);
    }

    #[test]
    fn edgeless_layer_projects_to_no_edges() {
        let g = LayeredGraph::from_edges(&[2, 2], &[]).expect("valid graph");
        let p = OneModeProjection::build(&g, 0, Similarity::Jaccard);
        assert_eq!(p.edge_count(), 0);
        assert_eq!(p.range(), 0..2);
    }

    #[test]
    fn reweighting_keeps_structure() {
        let g = bipartite();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        let q = p.reweighted(&[0.1, 0.2, 0.3]);
        assert_eq!(
            q.edges().collect::<Vec<_>>(),
            vec![(0, 1, 0.1), (0, 2, 0.2), (1, 2, 0.3)]
        );
        assert_eq!(q.adjacency().weight(2, 1), Some(0.3));
    }
}
