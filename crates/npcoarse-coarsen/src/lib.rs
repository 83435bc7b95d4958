#![forbid(unsafe_code)]
//! npcoarse-coarsen library.
//!
//! # Conventions
//!
//! - **Errors**: Return [`npcoarse_core::CoarsenError`]; strategies themselves are infallible
//!   except where a numeric collaborator can fail.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod nmf;
pub mod orchestrator;
pub mod projection;
pub mod strategy;

pub use nmf::{Factorizer, Factors, MultiplicativeNmf};
pub use orchestrator::{Coarsener, CoarseningOutcome, Termination};
pub use projection::OneModeProjection;
