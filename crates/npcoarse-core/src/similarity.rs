//! Vertex similarity measures.
//!
//! # Overview
//!
//! Every measure scores a vertex pair from the structure around it in an
//! [`Adjacency`]: neighbor sets Γ, degrees k and edge weights w. Measures
//! are selected by name at configuration time and bound to one adjacency
//! snapshot with [`Similarity::bind`]; the resulting closure is what the
//! matching strategies consume.
//!
//! | name | score(u, v) |
//! |---|---|
//! | `common_neighbors` | \|Γu ∩ Γv\| |
//! | `weighted_common_neighbors` | Σ (w_uz + w_vz) / 2 over common z |
//! | `hops_common_neighbors` | shared vertices of the radius-(h−1) balls |
//! | `salton` | CN / √(ku·kv) |
//! | `preferential_attachment` | ku·kv |
//! | `jaccard` | CN / \|Γu ∪ Γv\| |
//! | `weighted_jaccard` | Σ min(w_uz, w_vz) / Σ max(w_uz, w_vz) over Γu ∪ Γv |
//! | `adamic_adar` | Σ 1 / ln kz over common z with kz > 1 |
//! | `resource_allocation` | Σ 1 / kz over common z |
//! | `sorensen` | 2·CN / (ku + kv) |
//! | `hub_promoted` | CN / min(ku, kv) |
//! | `hub_depressed` | CN / max(ku, kv) |
//! | `leicht_holme_newman` | CN / (ku·kv) |
//! | `newman_collaboration` | Σ w_uz·w_vz / (kz − 1) over common z with kz > 1 |
//! | `unweight` | 1 |
//!
//! Any division by zero scores `0.0`.

use serde::{Deserialize, Serialize};

use crate::config::{Named, parse_name};
use crate::error::ConfigError;
use crate::graph::Adjacency;

/// A named similarity measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    CommonNeighbors,
    WeightedCommonNeighbors,
    HopsCommonNeighbors,
    Salton,
    PreferentialAttachment,
    Jaccard,
    WeightedJaccard,
    AdamicAdar,
    ResourceAllocation,
    Sorensen,
    HubPromoted,
    HubDepressed,
    LeichtHolmeNewman,
    NewmanCollaboration,
    Unweight,
}

impl Named for Similarity {
    const ALL: &'static [Self] = &[
        Self::CommonNeighbors,
        Self::WeightedCommonNeighbors,
        Self::HopsCommonNeighbors,
        Self::Salton,
        Self::PreferentialAttachment,
        Self::Jaccard,
        Self::WeightedJaccard,
        Self::AdamicAdar,
        Self::ResourceAllocation,
        Self::Sorensen,
        Self::HubPromoted,
        Self::HubDepressed,
        Self::LeichtHolmeNewman,
        Self::NewmanCollaboration,
        Self::Unweight,
    ];

    const EXPECTED: &'static str = "common_neighbors, weighted_common_neighbors, \
        hops_common_neighbors, salton, preferential_attachment, jaccard, weighted_jaccard, \
        adamic_adar, resource_allocation, sorensen, hub_promoted, hub_depressed, \
        leicht_holme_newman, newman_collaboration, unweight";

    fn name(self) -> &'static str {
        match self {
            Self::CommonNeighbors => "common_neighbors",
            Self::WeightedCommonNeighbors => "weighted_common_neighbors",
            Self::HopsCommonNeighbors => "hops_common_neighbors",
            Self::Salton => "salton",
            Self::PreferentialAttachment => "preferential_attachment",
            Self::Jaccard => "jaccard",
            Self::WeightedJaccard => "weighted_jaccard",
            Self::AdamicAdar => "adamic_adar",
            Self::ResourceAllocation => "resource_allocation",
            Self::Sorensen => "sorensen",
            Self::HubPromoted => "hub_promoted",
            Self::HubDepressed => "hub_depressed",
            Self::LeichtHolmeNewman => "leicht_holme_newman",
            Self::NewmanCollaboration => "newman_collaboration",
            Self::Unweight => "unweight",
        }
    }
}

impl std::str::FromStr for Similarity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_name("similarity", s)
    }
}

impl Similarity {
    /// Score the pair `(u, v)` on `adj`.
    #[must_use]
    pub fn score(self, adj: &Adjacency, u: usize, v: usize) -> f64 {
        let ku = adj.degree(u) as f64;
        let kv = adj.degree(v) as f64;
        let cn = || common(adj, u, v).count() as f64;

        match self {
            Self::CommonNeighbors => cn(),
            Self::WeightedCommonNeighbors => common(adj, u, v)
                .map(|(_, wu, wv)| (wu + wv) / 2.0)
                .sum(),
            Self::HopsCommonNeighbors => hops_common_neighbors(adj, 1, u, v),
            Self::Salton => ratio(cn(), (ku * kv).sqrt()),
            Self::PreferentialAttachment => ku * kv,
            Self::Jaccard => {
                let shared = cn();
                ratio(shared, ku + kv - shared)
            }
            Self::WeightedJaccard => weighted_jaccard(adj, u, v),
            Self::AdamicAdar => common(adj, u, v)
                .map(|(z, _, _)| adj.degree(z) as f64)
                .filter(|&kz| kz > 1.0)
                .map(|kz| 1.0 / kz.ln())
                .sum(),
            Self::ResourceAllocation => common(adj, u, v)
                .map(|(z, _, _)| ratio(1.0, adj.degree(z) as f64))
                .sum(),
            Self::Sorensen => ratio(2.0 * cn(), ku + kv),
            Self::HubPromoted => ratio(cn(), ku.min(kv)),
            Self::HubDepressed => ratio(cn(), ku.max(kv)),
            Self::LeichtHolmeNewman => ratio(cn(), ku * kv),
            Self::NewmanCollaboration => common(adj, u, v)
                .filter_map(|(z, wu, wv)| {
                    let kz = adj.degree(z) as f64;
                    (kz > 1.0).then(|| wu * wv / (kz - 1.0))
                })
                .sum(),
            Self::Unweight => 1.0,
        }
    }

    /// Hop-aware score used by label propagation at radius `hop`.
    ///
    /// Vertices at exact distance 3 or more share no direct neighbors, so
    /// beyond two hops every measure falls back to counting the shared
    /// vertices of the radius-(hop − 1) balls.
    #[must_use]
    pub fn score_at_hop(self, adj: &Adjacency, hop: usize, u: usize, v: usize) -> f64 {
        if hop > 2 || self == Self::HopsCommonNeighbors {
            hops_common_neighbors(adj, hop.saturating_sub(1).max(1), u, v)
        } else {
            self.score(adj, u, v)
        }
    }

    /// Bind this measure to one adjacency snapshot.
    pub fn bind(self, adj: &Adjacency) -> impl Fn(usize, usize) -> f64 + Send + Sync + '_ {
        move |u, v| self.score(adj, u, v)
    }

    /// Bind the hop-aware form to one adjacency snapshot.
    pub fn bind_at_hop(
        self,
        adj: &Adjacency,
        hop: usize,
    ) -> impl Fn(usize, usize) -> f64 + Send + Sync + '_ {
        move |u, v| self.score_at_hop(adj, hop, u, v)
    }
}

impl std::fmt::Display for Similarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Common neighbors of `u` and `v` as `(z, w_uz, w_vz)`.
fn common(adj: &Adjacency, u: usize, v: usize) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
    let (small, large, swapped) = if adj.degree(u) <= adj.degree(v) {
        (u, v, false)
    } else {
        (v, u, true)
    };
    adj.weighted(small).filter_map(move |(z, w_small)| {
        adj.weight(large, z).map(|w_large| {
            if swapped {
                (z, w_large, w_small)
            } else {
                (z, w_small, w_large)
            }
        })
    })
}

fn weighted_jaccard(adj: &Adjacency, u: usize, v: usize) -> f64 {
    let mut min_sum = 0.0;
    let mut max_sum = 0.0;
    for (z, wu) in adj.weighted(u) {
        let wv = adj.weight(v, z).unwrap_or(0.0);
        min_sum += wu.min(wv);
        max_sum += wu.max(wv);
    }
    for (z, wv) in adj.weighted(v) {
        if !adj.contains(u, z) {
            max_sum += wv;
        }
    }
    ratio(min_sum, max_sum)
}

fn hops_common_neighbors(adj: &Adjacency, radius: usize, u: usize, v: usize) -> f64 {
    let mut a = adj.ball(u, radius);
    let b = adj.ball(v, radius);
    a.intersect_with(&b);
    a.set(u, false);
    a.set(v, false);
    a.count_ones(..) as f64
}

fn ratio(num: f64, den: f64) -> f64 {
    if den <= 0.0 { 0.0 } else { num / den }
}
