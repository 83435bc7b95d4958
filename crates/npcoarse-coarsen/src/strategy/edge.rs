//! Independent-edge matchings on a one-mode projection: `rm`, `hem`, `lem`
//! and the factorization-reweighted `mnmf`.

use fixedbitset::FixedBitSet;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use npcoarse_core::error::CoarsenError;
use npcoarse_core::matching::Matching;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::nmf::{Factorizer, row_cosine};
use crate::projection::OneModeProjection;

/// Edge visit order for [`edge_matching`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrder {
    /// Heaviest first.
    Heavy,
    /// Lightest first.
    Light,
}

/// Accept edges in the given order while both endpoints are unclaimed.
///
/// The first endpoint of an accepted edge becomes the representative.
fn accept_independent<I>(
    projection: &OneModeProjection,
    vertex_count: usize,
    edges: I,
    budget: usize,
) -> Matching
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut matching = Matching::identity_on(vertex_count, projection.range());
    let mut claimed = FixedBitSet::with_capacity(projection.node_count());
    let mut remaining = budget;
    for (a, b) in edges {
        if remaining == 0 {
            break;
        }
        if claimed.contains(a) || claimed.contains(b) {
            continue;
        }
        claimed.insert(a);
        claimed.insert(b);
        matching.pair(projection.to_global(a), projection.to_global(b));
        remaining -= 1;
    }
    matching
}

/// Random maximal matching (`rm`): edges in uniformly shuffled order.
pub fn random_matching(
    projection: &OneModeProjection,
    vertex_count: usize,
    budget: usize,
    rng: &mut StdRng,
) -> Matching {
    let mut edges: Vec<(usize, usize)> = projection.edges().map(|(a, b, _)| (a, b)).collect();
    edges.shuffle(rng);
    accept_independent(projection, vertex_count, edges, budget)
}

/// Heavy- or light-edge matching (`hem` / `lem`).
///
/// Edges are stably sorted by weight, so equal weights keep insertion order.
pub fn edge_matching(
    projection: &OneModeProjection,
    vertex_count: usize,
    budget: usize,
    order: EdgeOrder,
) -> Matching {
    let mut edges: Vec<(usize, usize, f64)> = projection.edges().collect();
    edges.sort_by(|x, y| match order {
        EdgeOrder::Heavy => y.2.total_cmp(&x.2),
        EdgeOrder::Light => x.2.total_cmp(&y.2),
    });
    accept_independent(
        projection,
        vertex_count,
        edges.into_iter().map(|(a, b, _)| (a, b)),
        budget,
    )
}

/// Factorization-based matching (`mnmf`).
///
/// Factors the projection's symmetric weighted adjacency at `rank` (capped at
/// the layer size), replaces every edge weight with the cosine similarity of
/// its endpoints' embedding rows, then runs heavy-edge matching.
///
/// # Errors
///
/// Propagates [`CoarsenError::Factorization`] from `factorizer`.
pub fn nmf_matching(
    projection: &OneModeProjection,
    vertex_count: usize,
    budget: usize,
    rank: usize,
    factorizer: &dyn Factorizer,
) -> Result<Matching, CoarsenError> {
    let n = projection.node_count();
    if projection.edge_count() == 0 {
        return Ok(Matching::identity_on(vertex_count, projection.range()));
    }

    let mut coo = CooMatrix::new(n, n);
    for (a, b, w) in projection.edges() {
        coo.push(a, b, w);
        coo.push(b, a, w);
    }
    let x = CsrMatrix::from(&coo);
    let rank = rank.min(n);
    let factors = factorizer.factorize(&x, rank)?;

    let weights: Vec<f64> = projection
        .edges()
        .map(|(a, b, _)| row_cosine(&factors.w, a, b))
        .collect();
    debug!(rank, edges = weights.len(), "reweighted projection by embedding cosine");

    let reweighted = projection.reweighted(&weights);
    Ok(edge_matching(&reweighted, vertex_count, budget, EdgeOrder::Heavy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmf::{Factors, MultiplicativeNmf};
    use npcoarse_core::graph::LayeredGraph;
    use npcoarse_core::similarity::Similarity;
    use rand::SeedableRng;

    /// Layer 0 = {0, 1, 2, 3}. Projection weights (common neighbors):
    /// (0,1)=2, (0,2)=1, (1,2)=1, (2,3)=1.
    fn graph() -> LayeredGraph {
        LayeredGraph::from_edges(
            &[4, 3],
            &[
                (0, 4, 1.0),
                (0, 5, 1.0),
                (1, 4, 1.0),
                (1, 5, 1.0),
                (2, 5, 1.0),
                (2, 6, 1.0),
                (3, 6, 1.0),
            ],
        )
        .expect("valid graph")
    }

    #[test]
    fn heavy_edge_takes_heaviest_first() {
        let g = graph();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        let m = edge_matching(&p, g.vertex_count(), 2, EdgeOrder::Heavy);
        assert_eq!(m.resolve(1), 0);
        assert_eq!(m.resolve(3), 2);
        assert_eq!(m.merged_count(), 2);
    }

    #[test]
    fn light_edge_takes_lightest_first() {
        let g = graph();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        let m = edge_matching(&p, g.vertex_count(), 1, EdgeOrder::Light);
        assert_eq!(m.resolve(2), 0);
        assert_eq!(m.merged_count(), 1);
    }

    #[test]
    fn random_matching_is_independent_and_seeded() {
        let g = graph();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        let a = random_matching(&p, g.vertex_count(), 2, &mut StdRng::seed_from_u64(3));
        let b = random_matching(&p, g.vertex_count(), 2, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
        assert!(a.is_within(&(0..4)));
        let mut sizes = [0_usize; 7];
        for v in 0..7 {
            sizes[a.resolve(v)] += 1;
        }
        assert!(sizes.iter().all(|&s| s <= 2));
    }

    #[test]
    fn nmf_matching_stays_in_layer() {
        let g = graph();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        let m = nmf_matching(&p, g.vertex_count(), 2, 100, &MultiplicativeNmf::default())
            .expect("factorize");
        assert!(m.is_within(&(0..4)));
        assert!(m.merged_count() <= 2);
    }

    struct Failing;

    impl Factorizer for Failing {
        fn factorize(&self, _: &CsrMatrix<f64>, _: usize) -> Result<Factors, CoarsenError> {
            Err(CoarsenError::Factorization("diverged".to_string()))
        }
    }

    #[test]
    fn factorization_failure_propagates() {
        let g = graph();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        let err = nmf_matching(&p, g.vertex_count(), 2, 2, &Failing).unwrap_err();
        assert!(matches!(err, CoarsenError::Factorization(_)));
    }

    /// Reports the shape of the matrix it was handed through the error.
    struct Inspect;

    impl Factorizer for Inspect {
        fn factorize(&self, x: &CsrMatrix<f64>, _: usize) -> Result<Factors, CoarsenError> {
            Err(CoarsenError::Factorization(format!(
                "n={} nnz={} symmetric={}",
                x.nrows(),
                x.nnz(),
                x.transpose() == *x
            )))
        }
    }

    #[test]
    fn projection_is_factorized_as_sparse_symmetric_matrix() {
        let g = graph();
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        let err = nmf_matching(&p, g.vertex_count(), 2, 2, &Inspect).unwrap_err();
        assert_eq!(err.to_string(), "matrix factorization failed: n=4 nnz=8 symmetric=true");
    }

    #[test]
    fn edgeless_projection_yields_identity() {
        let g = LayeredGraph::from_edges(&[3, 1], &[]).expect("valid graph");
        let p = OneModeProjection::build(&g, 0, Similarity::CommonNeighbors);
        assert!(edge_matching(&p, 4, 1, EdgeOrder::Heavy).is_identity());
        assert!(random_matching(&p, 4, 1, &mut StdRng::seed_from_u64(0)).is_identity());
        assert!(
            nmf_matching(&p, 4, 1, 5, &Failing)
                .expect("no factorization needed")
                .is_identity()
        );
    }
}
