//! Weighted adjacency cache.
//!
//! Every vertex keeps an ordered map `neighbor -> edge weight`. Ordered maps
//! keep neighbor iteration (and therefore every BFS and every greedy
//! tie-break downstream) deterministic across runs.
//!
//! The cache is rebuilt from scratch whenever a graph's edge set is built or
//! contracted; nothing mutates it afterwards, so it is never stale.

use std::collections::BTreeMap;

use fixedbitset::FixedBitSet;

/// Symmetric weighted adjacency over vertices `0..len`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjacency {
    rows: Vec<BTreeMap<usize, f64>>,
}

impl Adjacency {
    /// Build a symmetric adjacency from undirected weighted edges.
    ///
    /// Self-loops are ignored. A repeated pair keeps the last weight seen.
    ///
    /// # Panics
    ///
    /// Panics if an edge endpoint is `>= vertex_count`.
    #[must_use]
    pub fn from_edges<I>(vertex_count: usize, edges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut rows = vec![BTreeMap::new(); vertex_count];
        for (u, v, w) in edges {
            assert!(
                u < vertex_count && v < vertex_count,
                "edge ({u}, {v}) outside 0..{vertex_count}"
            );
            if u == v {
                continue;
            }
            rows[u].insert(v, w);
            rows[v].insert(u, w);
        }
        Self { rows }
    }

    /// Number of vertices covered by the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Neighbor ids of `v`, ascending.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows[v].keys().copied()
    }

    /// `(neighbor, weight)` pairs of `v`, ascending by neighbor id.
    pub fn weighted(&self, v: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows[v].iter().map(|(&n, &w)| (n, w))
    }

    /// Raw neighbor map of `v`.
    #[must_use]
    pub fn row(&self, v: usize) -> &BTreeMap<usize, f64> {
        &self.rows[v]
    }

    /// Weight of edge `(u, v)`, if present.
    #[must_use]
    pub fn weight(&self, u: usize, v: usize) -> Option<f64> {
        self.rows[u].get(&v).copied()
    }

    #[must_use]
    pub fn contains(&self, u: usize, v: usize) -> bool {
        self.rows[u].contains_key(&v)
    }

    #[must_use]
    pub fn degree(&self, v: usize) -> usize {
        self.rows[v].len()
    }

    /// Sum of incident edge weights.
    #[must_use]
    pub fn strength(&self, v: usize) -> f64 {
        self.rows[v].values().sum()
    }

    /// Vertices whose BFS distance from `v` lies in `mindist..=order`.
    ///
    /// Results are in BFS order (by distance, then by discovery order).
    /// `v` itself is included only when `mindist == 0`.
    #[must_use]
    pub fn neighborhood(&self, v: usize, order: usize, mindist: usize) -> Vec<usize> {
        let mut seen = FixedBitSet::with_capacity(self.len());
        seen.insert(v);

        let mut out = Vec::new();
        if mindist == 0 {
            out.push(v);
        }

        let mut frontier = vec![v];
        for depth in 1..=order {
            let mut next = Vec::new();
            for &u in &frontier {
                for w in self.neighbors(u) {
                    if !seen.put(w) {
                        next.push(w);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            if depth >= mindist {
                out.extend_from_slice(&next);
            }
            frontier = next;
        }
        out
    }

    /// Vertices at distance exactly 2 from `v`.
    #[must_use]
    pub fn two_hop(&self, v: usize) -> Vec<usize> {
        self.neighborhood(v, 2, 2)
    }

    /// All vertices within `radius` hops of `v`, excluding `v`, as a bitset.
    #[must_use]
    pub fn ball(&self, v: usize, radius: usize) -> FixedBitSet {
        let mut set = FixedBitSet::with_capacity(self.len());
        for u in self.neighborhood(v, radius, 1) {
            set.insert(u);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Path 0 - 1 - 2 - 3 - 4 plus a pendant 1 - 5.
    fn path() -> Adjacency {
        Adjacency::from_edges(
            6,
            [
                (0, 1, 1.0),
                (1, 2, 2.0),
                (2, 3, 1.0),
                (3, 4, 1.0),
                (1, 5, 0.5),
            ],
        )
    }

    #[test]
    fn edges_are_symmetric() {
        let adj = path();
        assert_eq!(adj.weight(1, 2), Some(2.0));
        assert_eq!(adj.weight(2, 1), Some(2.0));
        assert!(!adj.contains(0, 2));
    }

    #[test]
    fn degree_and_strength() {
        let adj = path();
        assert_eq!(adj.degree(1), 3);
        assert!((adj.strength(1) - 3.5).abs() < 1e-12);
        assert_eq!(adj.degree(4), 1);
    }

    #[test]
    fn self_loops_are_dropped() {
        let adj = Adjacency::from_edges(2, [(0, 0, 1.0), (0, 1, 1.0)]);
        assert_eq!(adj.degree(0), 1);
    }

    #[test]
    fn two_hop_excludes_direct_neighbors() {
        let adj = path();
        assert_eq!(adj.two_hop(0), vec![2, 5]);
        assert_eq!(adj.two_hop(2), vec![0, 5, 4]);
    }

    #[test]
    fn neighborhood_bounds_are_inclusive() {
        let adj = path();
        assert_eq!(adj.neighborhood(0, 3, 3), vec![3]);
        assert_eq!(adj.neighborhood(0, 1, 0), vec![0, 1]);
        assert_eq!(adj.neighborhood(0, 2, 1), vec![1, 2, 5]);
        assert!(adj.neighborhood(0, 10, 5).is_empty());
    }

    #[test]
    fn ball_excludes_center() {
        let adj = path();
        let ball = adj.ball(2, 1);
        assert!(ball.contains(1));
        assert!(ball.contains(3));
        assert!(!ball.contains(2));
        assert_eq!(ball.count_ones(..), 2);
    }
}
