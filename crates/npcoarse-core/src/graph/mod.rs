//! Layered graph model and contraction.
//!
//! # Overview
//!
//! A [`LayeredGraph`] is an undirected, weighted n-partite graph whose
//! vertices are grouped into contiguous per-layer id ranges. Each coarser
//! level of the hierarchy is produced from the previous one by
//! [`contract::contract`], which never merges vertices of different layers.
//!
//! ## Pipeline
//!
//! ```text
//! edge list + vertex counts per layer
//!        ↓  LayeredGraph::from_edges()
//! level 0
//!        ↓  contract(graph, matching)
//! level 1 (supervertices, summed edge weights, provenance)
//!        ↓  ...
//! ```

pub mod adjacency;
pub mod contract;
pub mod layered;

pub use adjacency::Adjacency;
pub use contract::{Contraction, contract};
pub use layered::{LayeredGraph, Vertex};
