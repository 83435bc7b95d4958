//! Merge budgets and seed ordering shared by the strategies.

use std::cmp::Ordering;

use npcoarse_core::config::SeedPriority;
use npcoarse_core::graph::LayeredGraph;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Step by which the reduction factor shrinks until a minimum is honored.
const FACTOR_STEP: f64 = 0.01;

/// Number of merges allowed on a layer of `layer_size` vertices.
///
/// The budget is `floor(reduction_factor * layer_size)`. With a minimum
/// vertex count, the factor is lowered in steps of 0.01 until
/// `layer_size - budget >= target_min_vertices` or the factor reaches 0.
#[must_use]
pub fn merge_budget(
    layer_size: usize,
    reduction_factor: f64,
    target_min_vertices: Option<usize>,
) -> usize {
    let budget_for = |rf: f64| (rf.max(0.0) * layer_size as f64).floor() as usize;

    let mut rf = reduction_factor;
    let mut budget = budget_for(rf);
    if let Some(min) = target_min_vertices {
        while layer_size.saturating_sub(budget) < min && rf > 0.0 {
            rf -= FACTOR_STEP;
            budget = budget_for(rf);
        }
    }
    budget.min(layer_size)
}

/// Order in which a layer's vertices are visited as seeds.
///
/// `strength` and `degree` sort by score, descending when `reverse` is set
/// and ascending otherwise; ties keep ascending id order. `random` is a
/// uniform shuffle drawn from `rng`.
pub fn seed_order(
    graph: &LayeredGraph,
    layer: usize,
    priority: SeedPriority,
    reverse: bool,
    rng: &mut StdRng,
) -> Vec<usize> {
    let mut order: Vec<usize> = graph.layer_range(layer).collect();
    let score: fn(&LayeredGraph, usize) -> f64 = match priority {
        SeedPriority::Strength => LayeredGraph::strength,
        SeedPriority::Degree => |g, v| g.degree(v) as f64,
        SeedPriority::Random => {
            order.shuffle(rng);
            return order;
        }
    };
    order.sort_by(|&a, &b| {
        let ord = score(graph, a)
            .partial_cmp(&score(graph, b))
            .unwrap_or(Ordering::Equal);
        if reverse { ord.reverse() } else { ord }
    });
    order
}
