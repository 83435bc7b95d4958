//! Contraction: build the next-coarser level from a matching.
//!
//! # Rules
//!
//! Within each layer, vertices sharing a matching target form one cluster
//! (unset entries target themselves). Clusters become supervertices in
//! ascending target order, layer by layer, so the coarse graph keeps the
//! contiguous layer layout. A supervertex's weight is the sum of its
//! members' weights and its source is the union of their sources.
//!
//! Every finer edge `(u, w)` is mapped to `(succ(u), succ(w))`. Edges landing
//! on the same coarse pair are summed; edges landing inside a single cluster
//! are dropped (that mass is already reflected in the supervertex weight).

use std::collections::BTreeMap;

use tracing::{instrument, trace};

use super::layered::{LayeredGraph, Vertex};
use crate::matching::Matching;

/// Output of [`contract`]: the coarse graph and, for every finer vertex, the
/// id of its supervertex.
#[derive(Debug, Clone)]
pub struct Contraction {
    pub coarse: LayeredGraph,
    pub successors: Vec<usize>,
}

/// Contract `graph` by `matching` without touching `graph`.
///
/// The coarse graph inherits `graph`'s level counters; callers that advance
/// levels set them afterwards.
///
/// # Panics
///
/// Panics if `matching.len() != graph.vertex_count()` or if any vertex is
/// matched to a vertex of another layer.
#[must_use]
#[instrument(skip_all, fields(vertices = graph.vertex_count(), edges = graph.edge_count()))]
pub fn contract(graph: &LayeredGraph, matching: &Matching) -> Contraction {
    assert_eq!(
        matching.len(),
        graph.vertex_count(),
        "matching must cover every vertex"
    );

    let mut successors = vec![usize::MAX; graph.vertex_count()];
    let mut vertices = Vec::new();
    let mut counts = Vec::with_capacity(graph.layers());

    for layer in 0..graph.layers() {
        let range = graph.layer_range(layer);

        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for v in range.clone() {
            let target = matching.resolve(v);
            assert!(
                range.contains(&target),
                "vertex {v} (layer {layer}) matched across layers to {target}"
            );
            clusters.entry(target).or_default().push(v);
        }

        counts.push(clusters.len());
        for members in clusters.into_values() {
            let id = vertices.len();
            let mut weight = 0;
            let mut source = Vec::new();
            for &member in &members {
                let vertex = graph.vertex(member);
                weight += vertex.weight();
                source.extend_from_slice(vertex.source());
                successors[member] = id;
            }
            source.sort_unstable();
            vertices.push(Vertex::merged(layer, weight, source, members));
        }
    }

    let mut edges: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    let mut absorbed = 0_usize;
    for (u, w, weight) in graph.edges() {
        let (a, b) = (successors[u], successors[w]);
        if a == b {
            absorbed += 1;
            continue;
        }
        *edges.entry((a.min(b), a.max(b))).or_insert(0.0) += weight;
    }
    trace!(absorbed, coarse_edges = edges.len(), "mapped edges onto supervertices");

    let coarse = LayeredGraph::from_parts(
        vertices,
        &counts,
        graph.level().to_vec(),
        edges.into_iter().map(|((a, b), w)| (a, b, w)),
    );

    Contraction { coarse, successors }
}
