//! Two-hop greedy matchings: `gmb` and `rgmb`.
//!
//! Both restrict candidates to vertices at distance exactly two that share
//! the seed's layer, so a match always joins two vertices of one type.

use fixedbitset::FixedBitSet;
use npcoarse_core::graph::LayeredGraph;
use npcoarse_core::matching::Matching;
use tracing::trace;

/// Global greedy matching.
///
/// Every unordered same-layer two-hop pair is scored once; pairs are sorted
/// by score (descending when `reverse`, ascending otherwise, ties in
/// discovery order) and accepted while both endpoints are unclaimed and the
/// budget lasts.
pub fn gmb<S>(
    graph: &LayeredGraph,
    layer: usize,
    score: S,
    budget: usize,
    reverse: bool,
) -> Matching
where
    S: Fn(usize, usize) -> f64,
{
    let range = graph.layer_range(layer);
    let mut matching = Matching::identity_on(graph.vertex_count(), range.clone());

    let mut scored = Vec::new();
    let mut sourced = FixedBitSet::with_capacity(range.len());
    for v in range.clone() {
        for u in graph.two_hop_in_layer(v) {
            if !sourced.contains(u - range.start) {
                scored.push((v, u, score(v, u)));
            }
        }
        sourced.insert(v - range.start);
    }

    scored.sort_by(|a, b| {
        let ord = a.2.total_cmp(&b.2);
        if reverse { ord.reverse() } else { ord }
    });

    let mut claimed = FixedBitSet::with_capacity(range.len());
    let mut remaining = budget;
    for (v, u, _) in scored {
        if remaining == 0 {
            break;
        }
        let (lv, lu) = (v - range.start, u - range.start);
        if claimed.contains(lv) || claimed.contains(lu) {
            continue;
        }
        matching.pair(v, u);
        claimed.insert(lv);
        claimed.insert(lu);
        remaining -= 1;
    }
    trace!(layer, merges = budget - remaining, "gmb finished");
    matching
}

/// Seed-ordered greedy matching.
///
/// Seeds are visited in `order`; each unclaimed seed takes its best-scoring
/// unclaimed two-hop neighbor in the same layer (first one on ties). Only
/// strictly positive scores qualify. A seed without a qualifying neighbor
/// is marked visited and does not use budget.
pub fn rgmb<S>(
    graph: &LayeredGraph,
    layer: usize,
    score: S,
    budget: usize,
    order: &[usize],
) -> Matching
where
    S: Fn(usize, usize) -> f64,
{
    let range = graph.layer_range(layer);
    let mut matching = Matching::identity_on(graph.vertex_count(), range.clone());

    let mut claimed = FixedBitSet::with_capacity(range.len());
    let mut remaining = budget;
    for &seed in order {
        if remaining == 0 {
            break;
        }
        debug_assert!(range.contains(&seed), "seed {seed} outside layer {layer}");
        if claimed.contains(seed - range.start) {
            continue;
        }
        claimed.insert(seed - range.start);

        let mut best: Option<(usize, f64)> = None;
        for u in graph.two_hop_in_layer(seed) {
            if claimed.contains(u - range.start) {
                continue;
            }
            let s = score(seed, u);
            if s > best.map_or(0.0, |(_, b)| b) {
                best = Some((u, s));
            }
        }
        if let Some((partner, _)) = best {
            matching.pair(seed, partner);
            claimed.insert(partner - range.start);
            remaining -= 1;
        }
    }
    trace!(layer, merges = budget - remaining, "rgmb finished");
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use npcoarse_core::similarity::Similarity;

    /// K_{4,3}: every pair inside a layer shares all of the other layer.
    fn k43() -> LayeredGraph {
        let mut edges = Vec::new();
        for u in 0..4 {
            for v in 4..7 {
                edges.push((u, v, 1.0));
            }
        }
        LayeredGraph::from_edges(&[4, 3], &edges).expect("valid graph")
    }

    #[test]
    fn gmb_pairs_within_budget() {
        let g = k43();
        let score = Similarity::CommonNeighbors.bind(g.adjacency());
        let m = gmb(&g, 0, score, 2, true);
        assert_eq!(m.merged_count(), 2);
        assert!(m.is_within(&(0..4)));
        // ties resolve in discovery order: (0, 1) then (2, 3)
        assert_eq!(m.resolved(), vec![0, 0, 2, 2, 4, 5, 6]);
    }

    #[test]
    fn gmb_prefers_high_scores() {
        // layer 0 = {0, 1, 2}; 0 and 1 share two neighbors, 2 shares one.
        let g = LayeredGraph::from_edges(
            &[3, 2],
            &[(0, 3, 1.0), (0, 4, 1.0), (1, 3, 1.0), (1, 4, 1.0), (2, 4, 1.0)],
        )
        .expect("valid graph");
        let score = Similarity::CommonNeighbors.bind(g.adjacency());
        let m = gmb(&g, 0, &score, 1, true);
        assert_eq!(m.resolve(1), 0);
        assert_eq!(m.resolve(2), 2);

        let m = gmb(&g, 0, &score, 1, false);
        assert_eq!(m.resolve(2), 0);
    }

    #[test]
    fn rgmb_respects_order_and_budget() {
        let g = k43();
        let score = Similarity::CommonNeighbors.bind(g.adjacency());
        let m = rgmb(&g, 1, &score, 1, &[6, 5, 4]);
        assert_eq!(m.merged_count(), 1);
        assert_eq!(m.resolve(4), 6);
        assert_eq!(m.resolve(5), 5);
        assert!(m.is_within(&(4..7)));
    }

    #[test]
    fn rgmb_skips_seeds_without_positive_candidates() {
        // 0 and 1 share vertex 3; 2 is isolated.
        let g = LayeredGraph::from_edges(&[3, 1], &[(0, 3, 1.0), (1, 3, 1.0)])
            .expect("valid graph");
        let score = Similarity::CommonNeighbors.bind(g.adjacency());
        let m = rgmb(&g, 0, &score, 1, &[2, 0, 1]);
        assert_eq!(m.resolve(1), 0);
        assert_eq!(m.resolve(2), 2);
    }

    #[test]
    fn edgeless_layer_yields_identity() {
        let g = LayeredGraph::from_edges(&[3, 2], &[]).expect("valid graph");
        let score = Similarity::CommonNeighbors.bind(g.adjacency());
        assert!(gmb(&g, 0, &score, 1, true).is_identity());
        assert!(rgmb(&g, 0, &score, 1, &[0, 1, 2]).is_identity());
    }
}
