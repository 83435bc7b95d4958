//! Most-similar-vertex matching (`msvm`) on a one-mode projection.

use fixedbitset::FixedBitSet;
use npcoarse_core::matching::Matching;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::projection::OneModeProjection;

/// Visit projected vertices in random order; each unclaimed vertex takes
/// its best-scoring unclaimed projection neighbor.
///
/// `score` works on local projection indices. Only strictly positive scores
/// qualify; a vertex without a qualifying neighbor stays single and does not
/// use budget.
pub fn msvm<S>(
    projection: &OneModeProjection,
    vertex_count: usize,
    score: S,
    budget: usize,
    rng: &mut StdRng,
) -> Matching
where
    S: Fn(usize, usize) -> f64,
{
    let n = projection.node_count();
    let mut matching = Matching::identity_on(vertex_count, projection.range());
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let adjacency = projection.adjacency();
    let mut claimed = FixedBitSet::with_capacity(n);
    let mut remaining = budget;
    for v in order {
        if remaining == 0 {
            break;
        }
        if claimed.contains(v) {
            continue;
        }
        claimed.insert(v);

        let best = adjacency
            .neighbors(v)
            .filter(|&u| !claimed.contains(u))
            .map(|u| (u, score(v, u)))
            .filter(|&(_, s)| s > 0.0)
            .fold(None, |best: Option<(usize, f64)>, (u, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((u, s)),
            });

        if let Some((u, _)) = best {
            claimed.insert(u);
            matching.pair(projection.to_global(v), projection.to_global(u));
            remaining -= 1;
        }
    }
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use npcoarse_core::graph::LayeredGraph;
    use npcoarse_core::similarity::Similarity;
    use rand::SeedableRng;

    #[test]
    fn pairs_projection_neighbors_only() {
        // layer 1 = {3, 4, 5}: 3 and 4 share vertex 0, 5 shares nothing.
        let g = LayeredGraph::from_edges(&[3, 3], &[(0, 3, 1.0), (0, 4, 1.0), (1, 5, 1.0)])
            .expect("valid graph");
        let p = OneModeProjection::build(&g, 1, Similarity::CommonNeighbors);
        let score = Similarity::Unweight.bind(p.adjacency());
        for seed in 0..8 {
            let m = msvm(&p, g.vertex_count(), &score, 3, &mut StdRng::seed_from_u64(seed));
            assert!(m.is_within(&(3..6)));
            assert_eq!(m.merged_count(), 1);
            assert_eq!(m.resolve(5), 5);
            assert_eq!(m.resolve(3), m.resolve(4));
        }
    }

    #[test]
    fn zero_scores_never_merge() {
        let g = LayeredGraph::from_edges(&[1, 2], &[(0, 1, 1.0), (0, 2, 1.0)])
            .expect("valid graph");
        let p = OneModeProjection::build(&g, 1, Similarity::CommonNeighbors);
        // within the projection 1 and 2 have no common neighbors
        let score = Similarity::CommonNeighbors.bind(p.adjacency());
        let m = msvm(&p, g.vertex_count(), &score, 1, &mut StdRng::seed_from_u64(1));
        assert!(m.is_identity());
    }
}
