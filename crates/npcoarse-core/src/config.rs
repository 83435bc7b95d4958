//! Coarsening options and their validation.
//!
//! [`CoarseningOptions`] is the raw option set as it arrives from a TOML
//! file or the command line: names are strings and per-layer options are
//! arrays of length 1 (broadcast to every layer) or exactly one value per
//! layer. [`CoarseningOptions::validate`] turns it into a typed
//! [`CoarseningConfig`] once, before any coarsening work starts.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::similarity::Similarity;

// ---------------------------------------------------------------------------
// Named enums
// ---------------------------------------------------------------------------

/// A closed set of values selected by name in configuration.
pub trait Named: Sized + Copy + 'static {
    /// Every variant.
    const ALL: &'static [Self];
    /// Human-readable list of accepted names.
    const EXPECTED: &'static str;

    fn name(self) -> &'static str;
}

/// Parse a case-insensitive name into a [`Named`] value.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownName`] naming `param` when `value` matches
/// no variant.
pub fn parse_name<T: Named>(param: &'static str, value: &str) -> Result<T, ConfigError> {
    let wanted = value.trim().to_ascii_lowercase();
    T::ALL
        .iter()
        .copied()
        .find(|v| v.name() == wanted)
        .ok_or_else(|| ConfigError::UnknownName {
            param,
            value: value.to_string(),
            expected: T::EXPECTED,
        })
}

/// Matching heuristic used for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Global greedy over scored two-hop pairs.
    Gmb,
    /// Seed-ordered greedy over two-hop neighbors.
    Rgmb,
    /// Random maximal matching on the one-mode projection.
    Rm,
    /// Heavy-edge matching on the one-mode projection.
    Hem,
    /// Light-edge matching on the one-mode projection.
    Lem,
    /// Heavy-edge matching after factorization-based reweighting.
    Mnmf,
    /// Most-similar-vertex matching on the one-mode projection.
    Msvm,
    /// Weight-bounded label propagation over hop-bounded neighborhoods.
    Mlpb,
}

impl Named for MatchingStrategy {
    const ALL: &'static [Self] = &[
        Self::Gmb,
        Self::Rgmb,
        Self::Rm,
        Self::Hem,
        Self::Lem,
        Self::Mnmf,
        Self::Msvm,
        Self::Mlpb,
    ];
    const EXPECTED: &'static str = "gmb, rgmb, rm, hem, lem, mnmf, msvm, mlpb";

    fn name(self) -> &'static str {
        match self {
            Self::Gmb => "gmb",
            Self::Rgmb => "rgmb",
            Self::Rm => "rm",
            Self::Hem => "hem",
            Self::Lem => "lem",
            Self::Mnmf => "mnmf",
            Self::Msvm => "msvm",
            Self::Mlpb => "mlpb",
        }
    }
}

impl FromStr for MatchingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_name("matching", s)
    }
}

impl MatchingStrategy {
    /// Whether the strategy runs on a one-mode projection of its layer.
    #[must_use]
    pub const fn needs_projection(self) -> bool {
        matches!(
            self,
            Self::Rm | Self::Hem | Self::Lem | Self::Mnmf | Self::Msvm
        )
    }

    /// Whether the strategy can merge more than two vertices per cluster.
    #[must_use]
    pub const fn is_pairwise(self) -> bool {
        !matches!(self, Self::Mlpb)
    }
}

/// Order in which seed vertices are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPriority {
    Strength,
    Degree,
    Random,
}

impl Named for SeedPriority {
    const ALL: &'static [Self] = &[Self::Strength, Self::Degree, Self::Random];
    const EXPECTED: &'static str = "strength, degree, random";

    fn name(self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Degree => "degree",
            Self::Random => "random",
        }
    }
}

impl FromStr for SeedPriority {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_name("seed_priority", s)
    }
}

// ---------------------------------------------------------------------------
// Raw options
// ---------------------------------------------------------------------------

/// A boolean flag as written by users: either a TOML boolean or a word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn parse(&self, param: &'static str) -> Result<bool, ConfigError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "t" | "y" | "1" => Ok(true),
                "no" | "false" | "f" | "n" | "0" => Ok(false),
                _ => Err(ConfigError::InvalidBool {
                    param,
                    value: text.clone(),
                }),
            },
        }
    }
}

/// Unvalidated coarsening options.
///
/// `target_min_vertices` uses `0` for "no minimum", since TOML arrays cannot
/// hold an empty value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseningOptions {
    pub reduction_factor: Vec<f64>,
    pub max_levels: Vec<usize>,
    pub matching: Vec<String>,
    pub similarity: Vec<String>,
    pub itr: Vec<usize>,
    pub upper_bound: Vec<f64>,
    pub seed_priority: Vec<String>,
    pub target_min_vertices: Vec<usize>,
    pub tolerance: Vec<f64>,
    pub reverse: Vec<Flag>,
    pub rank: Vec<usize>,
    pub max_hops: usize,
    pub layers_to_coarse: Vec<usize>,
    pub projection: String,
    pub workers: usize,
    pub seed: u64,
}

impl Default for CoarseningOptions {
    fn default() -> Self {
        Self {
            reduction_factor: vec![0.5],
            max_levels: vec![3],
            matching: vec!["rgmb".to_string()],
            similarity: vec!["common_neighbors".to_string()],
            itr: vec![10],
            upper_bound: vec![0.2],
            seed_priority: vec!["degree".to_string()],
            target_min_vertices: vec![0],
            tolerance: vec![0.01],
            reverse: vec![Flag::Bool(true)],
            rank: vec![100],
            max_hops: 2,
            layers_to_coarse: Vec::new(),
            projection: "common_neighbors".to_string(),
            workers: 1,
            seed: 0,
        }
    }
}

/// Load options from a TOML file. Missing keys take their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::File`] if the file cannot be read or parsed.
pub fn load_options(path: &Path) -> Result<CoarseningOptions, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|err| ConfigError::File {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    toml::from_str(&text).map_err(|err| ConfigError::File {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Validated config
// ---------------------------------------------------------------------------

/// Validated parameters of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerParams {
    pub reduction_factor: f64,
    pub max_levels: usize,
    pub matching: MatchingStrategy,
    pub similarity: Similarity,
    pub itr: usize,
    pub upper_bound: f64,
    pub seed_priority: SeedPriority,
    pub target_min_vertices: Option<usize>,
    pub tolerance: f64,
    pub reverse: bool,
    pub rank: usize,
}

/// Validated coarsening configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CoarseningConfig {
    pub layers: Vec<LayerParams>,
    pub max_hops: usize,
    /// Layers considered for coarsening, ascending.
    pub layers_to_coarse: Vec<usize>,
    pub projection: Similarity,
    pub workers: usize,
    pub seed: u64,
}

impl CoarseningOptions {
    /// Validate against a graph with `layers` layers.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found; every error names the
    /// offending parameter.
    pub fn validate(&self, layers: usize) -> Result<CoarseningConfig, ConfigError> {
        let reduction_factor = broadcast("reduction_factor", &self.reduction_factor, layers)?;
        let max_levels = broadcast("max_levels", &self.max_levels, layers)?;
        let matching = broadcast("matching", &self.matching, layers)?;
        let similarity = broadcast("similarity", &self.similarity, layers)?;
        let itr = broadcast("itr", &self.itr, layers)?;
        let upper_bound = broadcast("upper_bound", &self.upper_bound, layers)?;
        let seed_priority = broadcast("seed_priority", &self.seed_priority, layers)?;
        let target_min = broadcast("target_min_vertices", &self.target_min_vertices, layers)?;
        let tolerance = broadcast("tolerance", &self.tolerance, layers)?;
        let reverse = broadcast("reverse", &self.reverse, layers)?;
        let rank = broadcast("rank", &self.rank, layers)?;

        let mut params = Vec::with_capacity(layers);
        for layer in 0..layers {
            let matching: MatchingStrategy = parse_name("matching", &matching[layer])?;

            let mut rf = reduction_factor[layer];
            if !(rf > 0.0 && rf <= 1.0) {
                return Err(out_of_range("reduction_factor", rf, "must be in (0, 1]"));
            }
            if matching.is_pairwise() && rf > 0.5 {
                warn!(
                    layer,
                    matching = matching.name(),
                    reduction_factor = rf,
                    "pairwise matching cannot remove more than half a layer; using 0.5"
                );
                rf = 0.5;
            }

            let upper_bound = upper_bound[layer];
            if !(upper_bound >= 0.0 && upper_bound.is_finite()) {
                return Err(out_of_range("upper_bound", upper_bound, "must be >= 0"));
            }
            let tolerance = tolerance[layer];
            if !(tolerance >= 0.0 && tolerance.is_finite()) {
                return Err(out_of_range("tolerance", tolerance, "must be >= 0"));
            }
            if rank[layer] == 0 {
                return Err(out_of_range("rank", 0, "must be >= 1"));
            }

            params.push(LayerParams {
                reduction_factor: rf,
                max_levels: max_levels[layer],
                matching,
                similarity: parse_name("similarity", &similarity[layer])?,
                itr: itr[layer],
                upper_bound,
                seed_priority: parse_name("seed_priority", &seed_priority[layer])?,
                target_min_vertices: (target_min[layer] > 0).then_some(target_min[layer]),
                tolerance,
                reverse: reverse[layer].parse("reverse")?,
                rank: rank[layer],
            });
        }

        if self.max_hops < 2 {
            return Err(out_of_range("max_hops", self.max_hops, "must be >= 2"));
        }

        let mut layers_to_coarse = if self.layers_to_coarse.is_empty() {
            (0..layers).collect()
        } else {
            self.layers_to_coarse.clone()
        };
        layers_to_coarse.sort_unstable();
        layers_to_coarse.dedup();
        if let Some(&layer) = layers_to_coarse.iter().find(|&&l| l >= layers) {
            return Err(ConfigError::UnknownLayer { layer, layers });
        }

        Ok(CoarseningConfig {
            layers: params,
            max_hops: self.max_hops,
            layers_to_coarse,
            projection: parse_name("projection", &self.projection)?,
            workers: clamp_workers(self.workers)?,
            seed: self.seed,
        })
    }
}

/// Expand a length-1 array to `layers` copies; require exact length otherwise.
fn broadcast<T: Clone>(
    param: &'static str,
    values: &[T],
    layers: usize,
) -> Result<Vec<T>, ConfigError> {
    match values.len() {
        1 => Ok(vec![values[0].clone(); layers]),
        n if n == layers => Ok(values.to_vec()),
        len => Err(ConfigError::LengthMismatch { param, layers, len }),
    }
}

fn out_of_range(param: &'static str, value: impl ToString, reason: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        param,
        value: value.to_string(),
        reason,
    }
}

/// Clamp the worker count to the available hardware parallelism.
fn clamp_workers(requested: usize) -> Result<usize, ConfigError> {
    if requested == 0 {
        return Err(out_of_range("workers", 0, "must be >= 1"));
    }
    let available = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    if requested > available {
        warn!(
            requested,
            available, "worker count exceeds available parallelism; clamping"
        );
        return Ok(available);
    }
    Ok(requested)
}
