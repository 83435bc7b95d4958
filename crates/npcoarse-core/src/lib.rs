#![forbid(unsafe_code)]
//! npcoarse-core library.
//!
//! The data model shared by every coarsening strategy: the layered graph
//! with per-vertex provenance, matching vectors, contraction, the level
//! hierarchy, validated configuration, and the neighborhood similarity
//! measures.
//!
//! # Conventions
//!
//! - **Errors**: Use the `thiserror` enums in [`error`]; binaries wrap them in `anyhow`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod io;
pub mod matching;
pub mod similarity;

pub use config::{CoarseningConfig, CoarseningOptions, LayerParams, MatchingStrategy, SeedPriority};
pub use error::{CoarsenError, ConfigError, InputError};
pub use graph::{LayeredGraph, Vertex};
pub use hierarchy::Hierarchy;
pub use matching::Matching;
pub use similarity::Similarity;
