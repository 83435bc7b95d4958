//! The multilevel coarsening loop.
//!
//! # Overview
//!
//! [`Coarsener::run`] drives rounds over the current coarsest graph:
//!
//! 1. Pick the eligible layers (not at `max_levels` when no minimum is set,
//!    not at or below their minimum vertex count).
//! 2. Build one [`LayerTask`] per eligible layer and run them on the worker
//!    pool against the same immutable snapshot.
//! 3. Overlay the layer-scoped matchings in ascending layer order and
//!    contract the graph.
//! 4. If nothing merged, widen the hop radius and retry the same graph;
//!    past `max_hops` the run ends. Otherwise record the level and go on.
//!
//! The run ends at a fixed point when no layer is eligible. Both endings
//! are successful outcomes.
//!
//! # Determinism
//!
//! Each task draws from its own `StdRng` seeded by [`derive_seed`] from the
//! global seed, the layer and the round. The pool preserves task order, so
//! results do not depend on the worker count.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, instrument, warn};

use npcoarse_core::config::CoarseningConfig;
use npcoarse_core::error::CoarsenError;
use npcoarse_core::graph::{Contraction, LayeredGraph, contract};
use npcoarse_core::hierarchy::Hierarchy;
use npcoarse_core::matching::Matching;

use crate::nmf::{Factorizer, MultiplicativeNmf};
use crate::strategy::{LayerTask, run_task};

/// Hop radius of the first round.
pub const INITIAL_HOP: usize = 2;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a coarsening run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No layer was eligible for another round.
    FixedPoint,
    /// Rounds kept producing no merges past the maximum hop radius.
    HopsExhausted,
}

/// Result of [`Coarsener::run`].
#[derive(Debug, Clone)]
pub struct CoarseningOutcome {
    pub hierarchy: Hierarchy,
    pub termination: Termination,
    /// Rounds executed, including rounds that merged nothing.
    pub rounds: usize,
    /// Hop radius in effect when the run ended.
    pub hop: usize,
}

// ---------------------------------------------------------------------------
// Coarsener
// ---------------------------------------------------------------------------

/// Runs validated coarsening configurations on a fixed-size worker pool.
pub struct Coarsener {
    config: CoarseningConfig,
    pool: ThreadPool,
    factorizer: Box<dyn Factorizer>,
}

impl std::fmt::Debug for Coarsener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coarsener")
            .field("config", &self.config)
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl Coarsener {
    /// Build a coarsener with `config.workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`CoarsenError::WorkerPool`] if the pool cannot be created.
    pub fn new(config: CoarseningConfig) -> Result<Self, CoarsenError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("npcoarse-worker-{i}"))
            .build()
            .map_err(|err| CoarsenError::WorkerPool(err.to_string()))?;
        Ok(Self {
            config,
            pool,
            factorizer: Box::new(MultiplicativeNmf::default()),
        })
    }

    /// Replace the factorization used by `mnmf`.
    #[must_use]
    pub fn with_factorizer(mut self, factorizer: impl Factorizer + 'static) -> Self {
        self.factorizer = Box::new(factorizer);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &CoarseningConfig {
        &self.config
    }

    /// Coarsen `graph` until a fixed point or hop exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`CoarsenError::Config`] if the configuration was validated
    /// for a different number of layers, and propagates strategy failures.
    /// A failing round leaves no partial level behind.
    #[instrument(skip_all, fields(vertices = graph.vertex_count(), layers = graph.layers()))]
    pub fn run(&self, graph: LayeredGraph) -> Result<CoarseningOutcome, CoarsenError> {
        let layers = graph.layers();
        if self.config.layers.len() != layers {
            return Err(npcoarse_core::ConfigError::LengthMismatch {
                param: "layers",
                layers,
                len: self.config.layers.len(),
            }
            .into());
        }
        if let Some(&layer) = self.config.layers_to_coarse.iter().find(|&&l| l >= layers) {
            return Err(npcoarse_core::ConfigError::UnknownLayer { layer, layers }.into());
        }

        log_layer_summary(&graph);
        let original_sizes = graph.vertex_count_by_type();
        let targets = self.effective_targets(&graph);

        let mut hierarchy = Hierarchy::new(graph);
        let mut hop = INITIAL_HOP;
        let mut rounds = 0;

        let termination = loop {
            let current = hierarchy.coarsest();
            let eligible = self.eligible_layers(current, &targets);
            if eligible.is_empty() {
                info!(levels = hierarchy.len(), "no layer eligible; fixed point reached");
                break Termination::FixedPoint;
            }

            let tasks: Vec<LayerTask> = eligible
                .iter()
                .map(|&layer| LayerTask {
                    layer,
                    params: self.config.layers[layer].clone(),
                    target_min_vertices: targets[layer],
                    original_size: original_sizes[layer],
                    hop,
                    projection: self.config.projection,
                    seed: derive_seed(self.config.seed, layer, rounds),
                })
                .collect();
            rounds += 1;
            info!(round = rounds, hop, layers = ?eligible, "starting round");

            let partials = self.run_tasks(current, &tasks)?;
            let mut merged = Matching::unset(current.vertex_count());
            for partial in &partials {
                merged.overlay(partial);
            }

            let Contraction {
                mut coarse,
                successors,
            } = contract(current, &merged);

            if coarse.vertex_count() == current.vertex_count() {
                warn!(
                    round = rounds,
                    hop,
                    vertices = current.vertex_count(),
                    "round merged nothing"
                );
                if hop >= self.config.max_hops {
                    info!(max_hops = self.config.max_hops, "hop radius exhausted");
                    break Termination::HopsExhausted;
                }
                hop += 1;
                continue;
            }

            let mut level = current.level().to_vec();
            for &layer in &eligible {
                level[layer] += 1;
            }
            coarse.set_level(level);
            info!(
                round = rounds,
                vertices = coarse.vertex_count(),
                edges = coarse.edge_count(),
                by_layer = ?coarse.vertex_count_by_type(),
                level = ?coarse.level(),
                "recorded level"
            );
            hierarchy.push(&successors, coarse);
        };

        Ok(CoarseningOutcome {
            hierarchy,
            termination,
            rounds,
            hop,
        })
    }

    /// Per-layer minimum vertex counts, raised by the layer's degree-0
    /// vertices (which can never merge) and capped at the layer size.
    fn effective_targets(&self, graph: &LayeredGraph) -> Vec<Option<usize>> {
        self.config
            .layers
            .iter()
            .enumerate()
            .map(|(layer, params)| {
                params.target_min_vertices.map(|min| {
                    let isolated = graph.isolated_in_layer(layer).len();
                    let raised = (min + isolated).min(graph.layer_size(layer));
                    if isolated > 0 {
                        debug!(layer, isolated, target = raised, "raised minimum for isolated vertices");
                    }
                    raised
                })
            })
            .collect()
    }

    fn eligible_layers(&self, graph: &LayeredGraph, targets: &[Option<usize>]) -> Vec<usize> {
        self.config
            .layers_to_coarse
            .iter()
            .copied()
            .filter(|&layer| {
                let eligible = match targets[layer] {
                    None => graph.level()[layer] < self.config.layers[layer].max_levels,
                    Some(min) => graph.layer_size(layer) > min,
                };
                if !eligible {
                    debug!(
                        layer,
                        level = graph.level()[layer],
                        size = graph.layer_size(layer),
                        "layer reached its stop condition"
                    );
                }
                eligible
            })
            .collect()
    }

    /// Run one round's tasks on the pool, in task order.
    fn run_tasks(
        &self,
        graph: &LayeredGraph,
        tasks: &[LayerTask],
    ) -> Result<Vec<Matching>, CoarsenError> {
        let factorizer = self.factorizer.as_ref();
        self.pool.install(|| {
            tasks
                .par_iter()
                .map(|task| run_task(graph, task, factorizer))
                .collect()
        })
    }
}

/// Log vertex counts per layer and edge counts per pair of layers.
fn log_layer_summary(graph: &LayeredGraph) {
    let layers = graph.layers();
    let mut between = vec![vec![0_usize; layers]; layers];
    for (u, v, _) in graph.edges() {
        let (a, b) = (graph.layer_of(u), graph.layer_of(v));
        between[a.min(b)][a.max(b)] += 1;
    }
    for layer in 0..layers {
        debug!(
            layer,
            vertices = graph.layer_size(layer),
            isolated = graph.isolated_in_layer(layer).len(),
            "layer summary"
        );
        for other in layer..layers {
            if between[layer][other] > 0 {
                debug!(layer, other, edges = between[layer][other], "edges between layers");
            }
        }
    }
}

/// Seed for the random stream of `layer` in `round` (SplitMix64 finalizer).
#[must_use]
pub const fn derive_seed(seed: u64, layer: usize, round: usize) -> u64 {
    let mut z = seed
        ^ (layer as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (round as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
