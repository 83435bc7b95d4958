//! Weight-bounded label propagation (`mlpb`).
//!
//! # Algorithm
//!
//! Every vertex of the layer starts with its own label. A round visits the
//! vertices in seed order and lets each one adopt the label that dominates
//! its same-layer neighborhood at exact distance `hop`:
//!
//! ```text
//! Q[l]  = Σ score(v, u)  over neighbors u with label l and score > 0
//! Q'[l] = Q[l] - (Σ Q - Q[l])
//! ```
//!
//! Only labels whose aggregate weight plus `v`'s weight stays within
//! `max_weight = ceil((1 + upper_bound) * n / min_vertices)` are
//! considered, where `n` is the layer's size at level 0. Propagation stops
//! when the number of live labels reaches `min_vertices`, when a round
//! makes no more than `tolerance * layer_size` swaps, or after `itr`
//! rounds.

use std::collections::HashMap;

use npcoarse_core::config::SeedPriority;
use npcoarse_core::graph::LayeredGraph;
use npcoarse_core::matching::Matching;
use rand::rngs::StdRng;
use tracing::debug;

use super::budget::seed_order;

/// Parameters of one label-propagation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationParams {
    pub reduction_factor: f64,
    pub target_min_vertices: Option<usize>,
    pub upper_bound: f64,
    /// Layer size at level 0.
    pub original_size: usize,
    pub tolerance: f64,
    pub itr: usize,
    pub hop: usize,
    pub seed_priority: SeedPriority,
    pub reverse: bool,
}

impl PropagationParams {
    /// Lower bound on the number of labels left alive.
    #[must_use]
    pub fn min_vertices(&self, layer_size: usize) -> usize {
        self.target_min_vertices
            .unwrap_or_else(|| ((1.0 - self.reduction_factor) * layer_size as f64).floor() as usize)
            .max(1)
    }

    /// Heaviest supervertex a label may grow into.
    #[must_use]
    pub fn max_weight(&self, layer_size: usize) -> u64 {
        let min = self.min_vertices(layer_size) as f64;
        ((1.0 + self.upper_bound) * self.original_size as f64 / min).ceil() as u64
    }
}

/// Why propagation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    MinimumReached,
    Stable,
    RoundLimit,
}

/// Run label propagation on `layer` and return its matching.
///
/// `score` is the hop-aware similarity on `graph`'s global ids.
pub fn mlpb<S>(
    graph: &LayeredGraph,
    layer: usize,
    params: &PropagationParams,
    score: S,
    rng: &mut StdRng,
) -> Matching
where
    S: Fn(usize, usize) -> f64,
{
    let range = graph.layer_range(layer);
    let size = range.len();
    let start = range.start;
    let mut matching = Matching::identity_on(graph.vertex_count(), range.clone());
    if size == 0 {
        return matching;
    }

    let min_vertices = params.min_vertices(size);
    let max_weight = params.max_weight(size);

    // Indexed by local id; labels are local ids too.
    let mut labels: Vec<usize> = (0..size).collect();
    let mut label_weight: Vec<u64> = range.clone().map(|v| graph.vertex(v).weight()).collect();
    let mut hood: Vec<Option<Vec<usize>>> = vec![None; size];
    let mut scores: HashMap<(usize, usize), f64> = HashMap::new();
    let mut live = size;

    let mut order = match params.seed_priority {
        SeedPriority::Random => Vec::new(),
        priority => seed_order(graph, layer, priority, params.reverse, rng),
    };

    let threshold = params.tolerance * size as f64;
    let mut swaps = 0_usize;
    let mut rounds = 0;
    let mut has_path = false;
    let mut stop = Stop::RoundLimit;

    'rounds: while rounds < params.itr {
        rounds += 1;
        swaps = 0;
        if params.seed_priority == SeedPriority::Random {
            order = seed_order(graph, layer, SeedPriority::Random, params.reverse, rng);
        }

        for &v in &order {
            if graph.degree(v) == 0 {
                continue;
            }
            let lv = v - start;
            let weight = graph.vertex(v).weight();
            let neighbors = hood[lv].get_or_insert_with(|| {
                graph
                    .neighborhood(v, params.hop, params.hop)
                    .into_iter()
                    .filter(|u| range.contains(u))
                    .collect()
            });

            // Insertion-ordered so ties go to the first label seen.
            let mut candidates: Vec<(usize, f64)> = Vec::new();
            for &u in neighbors.iter() {
                has_path = true;
                let label = labels[u - start];
                if label_weight[label] + weight > max_weight {
                    continue;
                }
                let key = (v.min(u), v.max(u));
                let s = *scores.entry(key).or_insert_with(|| score(key.0, key.1));
                if s > 0.0 {
                    match candidates.iter_mut().find(|(l, _)| *l == label) {
                        Some((_, acc)) => *acc += s,
                        None => candidates.push((label, s)),
                    }
                }
            }

            let total: f64 = candidates.iter().map(|(_, s)| s).sum();
            let dominant = candidates
                .iter()
                .map(|&(l, s)| (l, s - (total - s)))
                .fold(None, |best: Option<(usize, f64)>, (l, s)| match best {
                    Some((_, b)) if b >= s => best,
                    _ => Some((l, s)),
                });

            let Some((dominant, _)) = dominant else {
                continue;
            };
            let previous = labels[lv];
            if dominant == previous {
                continue;
            }
            swaps += 1;
            labels[lv] = dominant;
            label_weight[previous] -= weight;
            label_weight[dominant] += weight;
            if label_weight[previous] == 0 {
                live -= 1;
            }
            if live <= min_vertices {
                stop = Stop::MinimumReached;
                break 'rounds;
            }
        }

        if swaps as f64 <= threshold {
            stop = Stop::Stable;
            break;
        }
    }

    debug!(
        layer,
        hop = params.hop,
        rounds,
        swaps,
        live,
        min_vertices,
        max_weight,
        has_path,
        ?stop,
        "label propagation finished"
    );

    for (local, &label) in labels.iter().enumerate() {
        matching.assign(start + local, start + label);
    }
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use npcoarse_core::similarity::Similarity;
    use rand::SeedableRng;

    fn params(hop: usize) -> PropagationParams {
        PropagationParams {
            reduction_factor: 0.5,
            target_min_vertices: None,
            upper_bound: 0.2,
            original_size: 4,
            tolerance: 0.01,
            itr: 10,
            hop,
            seed_priority: SeedPriority::Degree,
            reverse: true,
        }
    }

    /// Layer 0 = {0, 1, 2, 3}; {0, 1} share 4 and {2, 3} share 5.
    fn two_pairs() -> LayeredGraph {
        LayeredGraph::from_edges(
            &[4, 2],
            &[(0, 4, 1.0), (1, 4, 1.0), (2, 5, 1.0), (3, 5, 1.0)],
        )
        .expect("valid graph")
    }

    /// Layer 0 = {0..5} as a path through hubs 5..9: 0-5-1-6-2-7-3-8-4.
    fn path() -> LayeredGraph {
        LayeredGraph::from_edges(
            &[5, 4],
            &[
                (0, 5, 1.0),
                (1, 5, 1.0),
                (1, 6, 1.0),
                (2, 6, 1.0),
                (2, 7, 1.0),
                (3, 7, 1.0),
                (3, 8, 1.0),
                (4, 8, 1.0),
            ],
        )
        .expect("valid graph")
    }

    /// Ascending degree order visits 0 and 4 before the middle, so label 3
    /// reaches 4 in the first round and label 1 only catches up in the second.
    fn path_params(itr: usize, tolerance: f64) -> PropagationParams {
        PropagationParams {
            reduction_factor: 1.0,
            original_size: 5,
            tolerance,
            itr,
            reverse: false,
            ..params(2)
        }
    }

    fn path_labels(p: &PropagationParams) -> Vec<usize> {
        let g = path();
        let m = mlpb(&g, 0, p, |_, _| 1.0, &mut StdRng::seed_from_u64(0));
        (0..5).map(|v| m.resolve(v)).collect()
    }

    #[test]
    fn zero_rounds_leave_the_layer_unmatched() {
        let g = path();
        let m = mlpb(&g, 0, &path_params(0, 0.0), |_, _| 1.0, &mut StdRng::seed_from_u64(0));
        assert!(m.is_identity());
    }

    #[test]
    fn later_rounds_carry_labels_against_seed_order() {
        assert_eq!(path_labels(&path_params(1, 0.0)), vec![1, 1, 1, 1, 3]);
        assert_eq!(path_labels(&path_params(10, 0.0)), vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn few_swaps_stop_after_the_first_round() {
        // Round one makes 4 swaps over 5 vertices.
        assert_eq!(path_labels(&path_params(10, 0.9)), vec![1, 1, 1, 1, 3]);
        assert_eq!(path_labels(&path_params(10, 0.7)), vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn bounds_follow_layer_sizes() {
        let p = params(2);
        assert_eq!(p.min_vertices(4), 2);
        assert_eq!(p.max_weight(4), 3);
        let p = PropagationParams {
            reduction_factor: 1.0,
            ..params(2)
        };
        assert_eq!(p.min_vertices(4), 1);
        let p = PropagationParams {
            target_min_vertices: Some(3),
            ..params(2)
        };
        assert_eq!(p.min_vertices(4), 3);
    }

    #[test]
    fn propagates_labels_across_shared_neighbors() {
        let g = two_pairs();
        let score = Similarity::CommonNeighbors.bind_at_hop(g.adjacency(), 2);
        let m = mlpb(&g, 0, &params(2), score, &mut StdRng::seed_from_u64(0));
        assert_eq!(m.resolved(), vec![1, 1, 3, 3, 4, 5]);
    }

    #[test]
    fn no_same_layer_vertices_at_hop_gives_identity() {
        let g = two_pairs();
        let score = Similarity::CommonNeighbors.bind_at_hop(g.adjacency(), 3);
        let m = mlpb(&g, 0, &params(3), score, &mut StdRng::seed_from_u64(0));
        assert!(m.is_identity());
    }

    #[test]
    fn cluster_weight_and_count_bounds_hold() {
        // A star: layer 0 = {0..6} all attached to 6.
        let edges: Vec<_> = (0..6).map(|v| (v, 6, 1.0)).collect();
        let g = LayeredGraph::from_edges(&[6, 1], &edges).expect("valid graph");
        let p = PropagationParams {
            reduction_factor: 0.9,
            target_min_vertices: Some(3),
            original_size: 6,
            ..params(2)
        };
        let max = p.max_weight(6);
        assert_eq!(max, 3);
        for seed in 0..4 {
            let p = PropagationParams {
                seed_priority: SeedPriority::Random,
                ..p
            };
            let score = Similarity::CommonNeighbors.bind_at_hop(g.adjacency(), 2);
            let m = mlpb(&g, 0, &p, score, &mut StdRng::seed_from_u64(seed));
            let mut sizes = HashMap::new();
            for v in 0..6 {
                *sizes.entry(m.resolve(v)).or_insert(0_u64) += 1;
            }
            assert!(sizes.values().all(|&s| s <= max), "{sizes:?}");
            assert!(sizes.len() >= 3, "{sizes:?}");
            assert!(m.is_within(&(0..6)));
        }
    }

    #[test]
    fn isolated_vertices_keep_their_label() {
        let g = LayeredGraph::from_edges(&[3, 1], &[(0, 3, 1.0), (1, 3, 1.0)])
            .expect("valid graph");
        let score = Similarity::CommonNeighbors.bind_at_hop(g.adjacency(), 2);
        let m = mlpb(
            &g,
            0,
            &PropagationParams {
                original_size: 3,
                ..params(2)
            },
            score,
            &mut StdRng::seed_from_u64(0),
        );
        assert_eq!(m.resolve(2), 2);
        assert_eq!(m.resolve(0), m.resolve(1));
    }
}
