//! The layered (n-partite) graph and its vertices.
//!
//! # Layout
//!
//! Vertices of layer `l` occupy one contiguous, ascending id range, and the
//! ranges of all layers partition `0..vertex_count` in layer order:
//!
//! ```text
//! layer 0        layer 1      layer 2
//! [0 ........ 4) [4 ...... 7) [7 .... 9)
//! ```
//!
//! Vertex and edge data live in a petgraph `UnGraph` whose node indices are
//! the vertex ids. The [`Adjacency`] cache mirrors the edge set for fast
//! neighborhood queries and is rebuilt eagerly whenever a graph is built.
//!
//! # Provenance
//!
//! Each vertex records the original (level-0) vertices it stands for
//! (`source`), the vertices of the finer level merged into it
//! (`predecessor`), and once the next level exists, the coarse vertex it was
//! merged into (`successor`). `successor` is the only field that changes
//! after a graph is built, and it is written at most once.

use std::collections::BTreeMap;
use std::ops::Range;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use tracing::{debug, instrument};

use super::adjacency::Adjacency;
use super::contract::{Contraction, contract};
use crate::error::InputError;
use crate::matching::Matching;

// ---------------------------------------------------------------------------
// Vertex
// ---------------------------------------------------------------------------

/// A (super)vertex of a layered graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    type_id: usize,
    weight: u64,
    source: Vec<usize>,
    predecessor: Vec<usize>,
    successor: Option<usize>,
}

impl Vertex {
    /// A level-0 vertex representing only itself.
    #[must_use]
    pub fn original(id: usize, type_id: usize) -> Self {
        Self {
            type_id,
            weight: 1,
            source: vec![id],
            predecessor: Vec::new(),
            successor: None,
        }
    }

    /// A supervertex built by the contractor.
    ///
    /// `source` must be sorted; `weight` must be positive.
    #[must_use]
    pub fn merged(type_id: usize, weight: u64, source: Vec<usize>, predecessor: Vec<usize>) -> Self {
        assert!(weight > 0, "supervertex weight must be positive");
        debug_assert!(source.windows(2).all(|w| w[0] < w[1]));
        Self {
            type_id,
            weight,
            source,
            predecessor,
            successor: None,
        }
    }

    /// Layer index.
    #[must_use]
    pub const fn type_id(&self) -> usize {
        self.type_id
    }

    /// Number of original vertices represented.
    #[must_use]
    pub const fn weight(&self) -> u64 {
        self.weight
    }

    /// Original vertex ids represented, ascending.
    #[must_use]
    pub fn source(&self) -> &[usize] {
        &self.source
    }

    /// Vertex ids of the finer level merged into this vertex.
    /// Empty at level 0.
    #[must_use]
    pub fn predecessor(&self) -> &[usize] {
        &self.predecessor
    }

    /// Index of this vertex's supervertex in the next coarser level.
    #[must_use]
    pub const fn successor(&self) -> Option<usize> {
        self.successor
    }
}

// ---------------------------------------------------------------------------
// LayeredGraph
// ---------------------------------------------------------------------------

/// An undirected, weighted, multi-layer graph with contraction provenance.
#[derive(Debug, Clone)]
pub struct LayeredGraph {
    graph: UnGraph<Vertex, f64>,
    layer_ranges: Vec<Range<usize>>,
    level: Vec<usize>,
    adjacency: Adjacency,
}

impl LayeredGraph {
    /// Build the level-0 graph.
    ///
    /// `vertex_counts[l]` is the number of vertices of layer `l`; layer ids
    /// are assigned in contiguous blocks in that order. Edges are treated as
    /// undirected: `(u, v)` and `(v, u)` name the same edge, and a repeated
    /// pair keeps the last weight given. Self-loops are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if there are no layers, an endpoint is out of
    /// range, or a weight is not a positive finite number.
    #[instrument(skip_all, fields(layers = vertex_counts.len(), edges = edges.len()))]
    pub fn from_edges(
        vertex_counts: &[usize],
        edges: &[(usize, usize, f64)],
    ) -> Result<Self, InputError> {
        if vertex_counts.is_empty() {
            return Err(InputError::NoLayers);
        }
        let vertex_count: usize = vertex_counts.iter().sum();

        let mut canonical: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut self_loops = 0_usize;
        for &(u, v, weight) in edges {
            if u >= vertex_count || v >= vertex_count {
                return Err(InputError::VertexOutOfRange { u, v, vertex_count });
            }
            if !(weight.is_finite() && weight > 0.0) {
                return Err(InputError::InvalidWeight { u, v, weight });
            }
            if u == v {
                self_loops += 1;
                continue;
            }
            canonical.insert((u.min(v), u.max(v)), weight);
        }
        if self_loops > 0 {
            debug!(self_loops, "dropped self-loops from input");
        }

        let mut vertices = Vec::with_capacity(vertex_count);
        for (layer, &count) in vertex_counts.iter().enumerate() {
            let start = vertices.len();
            vertices.extend((start..start + count).map(|id| Vertex::original(id, layer)));
        }

        Ok(Self::from_parts(
            vertices,
            vertex_counts,
            vec![0; vertex_counts.len()],
            canonical.into_iter().map(|((u, v), w)| (u, v, w)),
        ))
    }

    /// Assemble a graph from already-validated parts.
    ///
    /// `vertices` must be grouped by layer in ascending layer order, with
    /// `vertex_counts[l]` vertices in layer `l`; edges must be canonical
    /// (`u < v`), unique, and free of self-loops.
    pub(crate) fn from_parts<I>(
        vertices: Vec<Vertex>,
        vertex_counts: &[usize],
        level: Vec<usize>,
        edges: I,
    ) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut layer_ranges = Vec::with_capacity(vertex_counts.len());
        let mut start = 0;
        for &count in vertex_counts {
            layer_ranges.push(start..start + count);
            start += count;
        }
        assert_eq!(start, vertices.len(), "layer sizes must cover every vertex");

        let mut graph = UnGraph::<Vertex, f64>::with_capacity(vertices.len(), 0);
        for (layer, range) in layer_ranges.iter().enumerate() {
            for id in range.clone() {
                assert_eq!(
                    vertices[id].type_id, layer,
                    "vertex {id} is outside its layer block"
                );
            }
        }
        for vertex in vertices {
            graph.add_node(vertex);
        }
        for (u, v, w) in edges {
            graph.add_edge(NodeIndex::new(u), NodeIndex::new(v), w);
        }

        let adjacency = Adjacency::from_edges(
            graph.node_count(),
            graph
                .edge_references()
                .map(|e| (e.source().index(), e.target().index(), *e.weight())),
        );

        Self {
            graph,
            layer_ranges,
            level,
            adjacency,
        }
    }

    // -----------------------------------------------------------------------
    // Size queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of layers.
    #[must_use]
    pub fn layers(&self) -> usize {
        self.layer_ranges.len()
    }

    /// Id range of layer `layer`.
    #[must_use]
    pub fn layer_range(&self, layer: usize) -> Range<usize> {
        self.layer_ranges[layer].clone()
    }

    /// Number of vertices in layer `layer`.
    #[must_use]
    pub fn layer_size(&self, layer: usize) -> usize {
        self.layer_ranges[layer].len()
    }

    /// Vertex count per layer.
    #[must_use]
    pub fn vertex_count_by_type(&self) -> Vec<usize> {
        self.layer_ranges.iter().map(ExactSizeIterator::len).collect()
    }

    /// Layer of vertex `v`.
    #[must_use]
    pub fn layer_of(&self, v: usize) -> usize {
        self.vertex(v).type_id
    }

    /// Coarsening depth reached per layer.
    #[must_use]
    pub fn level(&self) -> &[usize] {
        &self.level
    }

    pub fn set_level(&mut self, level: Vec<usize>) {
        assert_eq!(level.len(), self.layers(), "one level counter per layer");
        self.level = level;
    }

    /// Sum of vertex weights (the number of original vertices).
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.vertices().map(Vertex::weight).sum()
    }

    // -----------------------------------------------------------------------
    // Vertex and edge access
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn vertex(&self, v: usize) -> &Vertex {
        &self.graph[NodeIndex::new(v)]
    }

    /// All vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.graph.raw_nodes().iter().map(|node| &node.weight)
    }

    /// All edges as `(u, v, weight)` with `u < v`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.graph.edge_references().map(|e| {
            let (a, b) = (e.source().index(), e.target().index());
            (a.min(b), a.max(b), *e.weight())
        })
    }

    /// The adjacency cache.
    #[must_use]
    pub const fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    #[must_use]
    pub fn degree(&self, v: usize) -> usize {
        self.adjacency.degree(v)
    }

    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency.neighbors(v)
    }

    /// Sum of incident edge weights.
    #[must_use]
    pub fn strength(&self, v: usize) -> f64 {
        self.adjacency.strength(v)
    }

    /// Vertices at distance exactly 2 from `v`, in BFS order.
    #[must_use]
    pub fn two_hop(&self, v: usize) -> Vec<usize> {
        self.adjacency.two_hop(v)
    }

    /// Vertices at distance exactly 2 from `v` that share its layer.
    #[must_use]
    pub fn two_hop_in_layer(&self, v: usize) -> Vec<usize> {
        let range = self.layer_range(self.layer_of(v));
        self.adjacency
            .two_hop(v)
            .into_iter()
            .filter(|u| range.contains(u))
            .collect()
    }

    /// Vertices at BFS distance `mindist..=order` from `v`.
    #[must_use]
    pub fn neighborhood(&self, v: usize, order: usize, mindist: usize) -> Vec<usize> {
        self.adjacency.neighborhood(v, order, mindist)
    }

    /// Degree-0 vertices of `layer`.
    #[must_use]
    pub fn isolated_in_layer(&self, layer: usize) -> Vec<usize> {
        self.layer_range(layer)
            .filter(|&v| self.degree(v) == 0)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Contraction
    // -----------------------------------------------------------------------

    /// Contract this graph by `matching` and record successors on `self`.
    ///
    /// See [`contract`] for the merge rules.
    ///
    /// # Panics
    ///
    /// Panics if the matching merges vertices across layers, or if this
    /// graph has already been contracted.
    pub fn contract(&mut self, matching: &Matching) -> Self {
        let Contraction { coarse, successors } = contract(self, matching);
        self.apply_successors(&successors);
        coarse
    }

    /// Record, for every vertex, the id of its supervertex in the next level.
    ///
    /// # Panics
    ///
    /// Panics if `successors` does not cover every vertex or if any
    /// successor was already set.
    pub fn apply_successors(&mut self, successors: &[usize]) {
        assert_eq!(
            successors.len(),
            self.vertex_count(),
            "one successor per vertex"
        );
        for (v, &s) in successors.iter().enumerate() {
            let vertex = &mut self.graph[NodeIndex::new(v)];
            assert!(vertex.successor.is_none(), "successor of {v} is write-once");
            vertex.successor = Some(s);
        }
    }
}
