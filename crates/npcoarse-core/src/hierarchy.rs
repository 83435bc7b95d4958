//! The append-only coarsening hierarchy.
//!
//! Level 0 is the input graph. Each pushed level records the coarse graph
//! and the per-layer level counters reached. Pushing a level also writes the
//! `successor` back-references of the previous level, so any vertex can be
//! followed from the finest to the coarsest graph.

use crate::graph::LayeredGraph;

/// One recorded level.
#[derive(Debug, Clone)]
pub struct Level {
    pub graph: LayeredGraph,
    /// Coarsening depth per layer at this level.
    pub level: Vec<usize>,
}

/// Ordered levels, finest first.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    levels: Vec<Level>,
}

impl Hierarchy {
    #[must_use]
    pub fn new(base: LayeredGraph) -> Self {
        let level = base.level().to_vec();
        Self {
            levels: vec![Level { graph: base, level }],
        }
    }

    /// Append `coarse`, recording `successors` on the current coarsest level.
    ///
    /// # Panics
    ///
    /// Panics if `successors` does not match the current coarsest graph or
    /// if that graph already has successors.
    pub fn push(&mut self, successors: &[usize], coarse: LayeredGraph) {
        if let Some(last) = self.levels.last_mut() {
            last.graph.apply_successors(successors);
        }
        let level = coarse.level().to_vec();
        self.levels.push(Level {
            graph: coarse,
            level,
        });
    }

    /// Number of levels, including level 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false: a hierarchy holds at least level 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// The input graph.
    #[must_use]
    pub fn original(&self) -> &LayeredGraph {
        &self.levels[0].graph
    }

    /// The coarsest graph built so far.
    #[must_use]
    pub fn coarsest(&self) -> &LayeredGraph {
        &self.levels[self.levels.len() - 1].graph
    }

    /// For every original vertex, the id of the vertex representing it at
    /// level `index`. `None` if the level does not exist.
    #[must_use]
    pub fn membership(&self, index: usize) -> Option<Vec<usize>> {
        let level = self.levels.get(index)?;
        let mut out = vec![0; self.original().vertex_count()];
        for (id, vertex) in level.graph.vertices().enumerate() {
            for &s in vertex.source() {
                out[s] = id;
            }
        }
        Some(out)
    }

    /// Follow `successor` links from original vertex `v`: the id of the
    /// vertex representing `v` at each level, finest first.
    #[must_use]
    pub fn trace(&self, v: usize) -> Vec<usize> {
        let mut path = Vec::with_capacity(self.levels.len());
        let mut current = Some(v);
        for level in &self.levels {
            let Some(id) = current else { break };
            path.push(id);
            current = level.graph.vertex(id).successor();
        }
        path
    }
}
