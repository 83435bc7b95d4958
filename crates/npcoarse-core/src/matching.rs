//! Matching vectors.
//!
//! A [`Matching`] assigns each vertex either a merge target or nothing.
//! Strategies produce layer-scoped matchings in which only their own
//! layer's entries are set; the orchestrator overlays them into one global
//! matching. Unset entries are treated as identity when contracting.

use std::ops::Range;

/// Per-vertex merge targets for one contraction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    targets: Vec<Option<usize>>,
}

impl Matching {
    /// Every entry unset.
    #[must_use]
    pub fn unset(len: usize) -> Self {
        Self {
            targets: vec![None; len],
        }
    }

    /// Every vertex targets itself.
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self {
            targets: (0..len).map(Some).collect(),
        }
    }

    /// Vertices in `range` target themselves; every other entry is unset.
    #[must_use]
    pub fn identity_on(len: usize, range: Range<usize>) -> Self {
        let mut matching = Self::unset(len);
        for v in range {
            matching.targets[v] = Some(v);
        }
        matching
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Raw entry for `v`.
    #[must_use]
    pub fn get(&self, v: usize) -> Option<usize> {
        self.targets[v]
    }

    /// Set `v`'s target.
    pub fn assign(&mut self, v: usize, target: usize) {
        self.targets[v] = Some(target);
    }

    /// Merge `partner` into `seed`; `seed` becomes the cluster representative.
    pub fn pair(&mut self, seed: usize, partner: usize) {
        self.targets[seed] = Some(seed);
        self.targets[partner] = Some(seed);
    }

    /// Target of `v`, with unset entries resolving to `v`.
    #[must_use]
    pub fn resolve(&self, v: usize) -> usize {
        self.targets[v].unwrap_or(v)
    }

    /// Fully resolved target vector.
    #[must_use]
    pub fn resolved(&self) -> Vec<usize> {
        (0..self.len()).map(|v| self.resolve(v)).collect()
    }

    /// Copy every set entry of `partial` over `self`.
    ///
    /// # Panics
    ///
    /// Panics if the two matchings differ in length.
    pub fn overlay(&mut self, partial: &Self) {
        assert_eq!(self.len(), partial.len(), "matchings must cover the same graph");
        for (slot, value) in self.targets.iter_mut().zip(&partial.targets) {
            if value.is_some() {
                *slot = *value;
            }
        }
    }

    /// Number of vertices whose resolved target is not themselves.
    #[must_use]
    pub fn merged_count(&self) -> usize {
        (0..self.len()).filter(|&v| self.resolve(v) != v).count()
    }

    /// Whether every vertex resolves to itself.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.merged_count() == 0
    }

    /// Whether every set entry lies in `range` and points into `range`.
    #[must_use]
    pub fn is_within(&self, range: &Range<usize>) -> bool {
        self.targets.iter().enumerate().all(|(v, t)| match t {
            None => true,
            Some(t) => range.contains(&v) && range.contains(t),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_on_leaves_other_layers_unset() {
        let m = Matching::identity_on(5, 2..4);
        assert_eq!(m.get(0), None);
        assert_eq!(m.get(2), Some(2));
        assert_eq!(m.get(4), None);
        assert!(m.is_within(&(2..4)));
        assert!(m.is_identity());
    }

    #[test]
    fn pair_sets_both_endpoints() {
        let mut m = Matching::unset(4);
        m.pair(1, 3);
        assert_eq!(m.resolved(), vec![0, 1, 2, 1]);
        assert_eq!(m.merged_count(), 1);
        assert!(!m.is_within(&(0..2)));
    }

    #[test]
    fn overlay_only_copies_set_entries() {
        let mut global = Matching::identity(4);
        let mut a = Matching::unset(4);
        a.pair(0, 1);
        let mut b = Matching::unset(4);
        b.assign(3, 2);
        global.overlay(&a);
        global.overlay(&b);
        assert_eq!(global.resolved(), vec![0, 0, 2, 2]);
    }
}
