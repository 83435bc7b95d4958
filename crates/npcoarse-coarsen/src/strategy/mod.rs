//! Matching strategies.
//!
//! # Overview
//!
//! Each strategy reads one immutable graph snapshot and returns a matching
//! in which only its own layer's entries are set. [`run_task`] maps a
//! [`LayerTask`] to the configured strategy and builds whatever scoring
//! collaborator it needs: a similarity bound to the layered graph, or a
//! one-mode projection of the layer.
//!
//! | Strategy | Works on | Module |
//! |---|---|---|
//! | `gmb`, `rgmb` | two-hop pairs of the layered graph | [`greedy`] |
//! | `rm`, `hem`, `lem`, `mnmf` | projection edges | [`edge`] |
//! | `msvm` | projection neighbors | [`msvm`] |
//! | `mlpb` | hop-bounded neighborhoods | [`mlpb`] |

pub mod budget;
pub mod edge;
pub mod greedy;
pub mod mlpb;
pub mod msvm;

use npcoarse_core::config::{LayerParams, MatchingStrategy, Named};
use npcoarse_core::error::CoarsenError;
use npcoarse_core::graph::LayeredGraph;
use npcoarse_core::matching::Matching;
use npcoarse_core::similarity::Similarity;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, instrument};

use crate::nmf::Factorizer;
use crate::projection::OneModeProjection;

pub use budget::{merge_budget, seed_order};
pub use edge::EdgeOrder;
pub use mlpb::PropagationParams;

/// One layer's unit of work for a round.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerTask {
    pub layer: usize,
    pub params: LayerParams,
    /// Minimum vertex count after isolated vertices are accounted for.
    pub target_min_vertices: Option<usize>,
    /// Layer size at level 0.
    pub original_size: usize,
    /// Hop radius for `mlpb`.
    pub hop: usize,
    /// Similarity used to weight one-mode projections.
    pub projection: Similarity,
    /// Seed of this task's random stream.
    pub seed: u64,
}

/// Run the strategy configured for `task.layer` on `graph`.
///
/// # Errors
///
/// Only `mnmf` can fail, when its factorization does.
///
/// # Panics
///
/// Panics if the strategy returns entries outside its layer.
#[instrument(skip_all, fields(layer = task.layer, matching = task.params.matching.name()))]
pub fn run_task(
    graph: &LayeredGraph,
    task: &LayerTask,
    factorizer: &dyn Factorizer,
) -> Result<Matching, CoarsenError> {
    let params = &task.params;
    let layer = task.layer;
    let size = graph.layer_size(layer);
    let n = graph.vertex_count();
    let budget = merge_budget(size, params.reduction_factor, task.target_min_vertices);
    let mut rng = StdRng::seed_from_u64(task.seed);

    let matching = if params.matching.needs_projection() {
        let projection = OneModeProjection::build(graph, layer, task.projection);
        debug!(
            nodes = projection.node_count(),
            edges = projection.edge_count(),
            "built one-mode projection"
        );
        match_projection(params, &projection, n, budget, factorizer, &mut rng)?
    } else {
        match_layer(graph, task, budget, &mut rng)
    };

    assert!(
        matching.is_within(&graph.layer_range(layer)),
        "strategy {:?} matched outside layer {layer}",
        params.matching
    );
    debug!(budget, merges = matching.merged_count(), "layer matched");
    Ok(matching)
}

/// Strategies that read the layered graph directly.
fn match_layer(
    graph: &LayeredGraph,
    task: &LayerTask,
    budget: usize,
    rng: &mut StdRng,
) -> Matching {
    let params = &task.params;
    let layer = task.layer;
    match params.matching {
        MatchingStrategy::Gmb => {
            let score = params.similarity.bind(graph.adjacency());
            greedy::gmb(graph, layer, score, budget, params.reverse)
        }
        MatchingStrategy::Rgmb => {
            let score = params.similarity.bind(graph.adjacency());
            let order = seed_order(graph, layer, params.seed_priority, params.reverse, rng);
            greedy::rgmb(graph, layer, score, budget, &order)
        }
        MatchingStrategy::Mlpb => {
            let propagation = PropagationParams {
                reduction_factor: params.reduction_factor,
                target_min_vertices: task.target_min_vertices,
                upper_bound: params.upper_bound,
                original_size: task.original_size,
                tolerance: params.tolerance,
                itr: params.itr,
                hop: task.hop,
                seed_priority: params.seed_priority,
                reverse: params.reverse,
            };
            let score = params.similarity.bind_at_hop(graph.adjacency(), task.hop);
            mlpb::mlpb(graph, layer, &propagation, score, rng)
        }
        MatchingStrategy::Rm
        | MatchingStrategy::Hem
        | MatchingStrategy::Lem
        | MatchingStrategy::Mnmf
        | MatchingStrategy::Msvm => {
            unreachable!("{:?} runs on the one-mode projection", params.matching)
        }
    }
}

/// Strategies that read the layer's one-mode projection.
fn match_projection(
    params: &LayerParams,
    projection: &OneModeProjection,
    vertex_count: usize,
    budget: usize,
    factorizer: &dyn Factorizer,
    rng: &mut StdRng,
) -> Result<Matching, CoarsenError> {
    let n = vertex_count;
    Ok(match params.matching {
        MatchingStrategy::Rm => edge::random_matching(projection, n, budget, rng),
        MatchingStrategy::Hem => edge::edge_matching(projection, n, budget, EdgeOrder::Heavy),
        MatchingStrategy::Lem => edge::edge_matching(projection, n, budget, EdgeOrder::Light),
        MatchingStrategy::Mnmf => {
            edge::nmf_matching(projection, n, budget, params.rank, factorizer)?
        }
        MatchingStrategy::Msvm => {
            let score = params.similarity.bind(projection.adjacency());
            msvm::msvm(projection, n, score, budget, rng)
        }
        MatchingStrategy::Gmb | MatchingStrategy::Rgmb | MatchingStrategy::Mlpb => {
            unreachable!("{:?} runs on the layered graph", params.matching)
        }
    })
}
