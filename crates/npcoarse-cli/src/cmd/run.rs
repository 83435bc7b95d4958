use crate::output::{self, OutputMode, RunSummary};
use anyhow::{Context as _, Result};
use clap::Args;
use npcoarse_coarsen::Coarsener;
use npcoarse_core::config::{CoarseningOptions, Flag, load_options};
use npcoarse_core::graph::LayeredGraph;
use npcoarse_core::io::load_ncol;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Edge list in ncol format (`u v [weight]` per line).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Vertex count per layer. Layer 0 holds ids `0..n0`, layer 1 the next
    /// `n1`, and so on.
    #[arg(long, value_delimiter = ',', required = true)]
    pub vertices: Vec<usize>,

    /// TOML file with coarsening options. Flags below take precedence.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Matching strategy per layer (gmb, rgmb, rm, hem, lem, mnmf, msvm, mlpb).
    #[arg(long, value_delimiter = ',')]
    pub matching: Vec<String>,

    /// Fraction of each layer to eliminate per level.
    #[arg(long, value_delimiter = ',')]
    pub reduction_factor: Vec<f64>,

    /// Maximum coarsening depth per layer.
    #[arg(long, value_delimiter = ',')]
    pub max_levels: Vec<usize>,

    /// Similarity measure per layer.
    #[arg(long, value_delimiter = ',')]
    pub similarity: Vec<String>,

    /// Minimum vertex count per layer; 0 means no minimum.
    #[arg(long, value_delimiter = ',', visible_alias = "target-min-vertices")]
    pub gmv: Vec<usize>,

    /// Seed ordering per layer (strength, degree, random).
    #[arg(long, value_delimiter = ',')]
    pub seed_priority: Vec<String>,

    /// Factorization rank per layer (mnmf).
    #[arg(long, value_delimiter = ',')]
    pub rank: Vec<usize>,

    /// Label-propagation round limit per layer (mlpb).
    #[arg(long, value_delimiter = ',')]
    pub itr: Vec<usize>,

    /// Allowed supervertex weight above the balanced size per layer (mlpb).
    #[arg(long, value_delimiter = ',')]
    pub upper_bound: Vec<f64>,

    /// Fraction of swapped labels per round below which propagation stops (mlpb).
    #[arg(long, value_delimiter = ',')]
    pub tolerance: Vec<f64>,

    /// Reverse the seed ordering per layer (yes/no, true/false).
    #[arg(long, value_delimiter = ',')]
    pub reverse: Vec<String>,

    /// Layers to coarsen; all layers when empty.
    #[arg(long, value_delimiter = ',')]
    pub layers_to_coarse: Vec<usize>,

    /// Weighting of one-mode projection edges.
    #[arg(long)]
    pub projection: Option<String>,

    /// Worker threads; clamped to the available parallelism.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Largest hop radius tried before giving up on a stalled round.
    #[arg(long)]
    pub max_hops: Option<usize>,

    /// Seed for randomized strategies.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write `<name>.membership` and `<name>.hierarchy.json` here.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Base name for output files (defaults to the input file stem).
    #[arg(long)]
    pub name: Option<String>,
}

/// Replace option values with those given on the command line.
fn apply_overrides(args: &RunArgs, options: &mut CoarseningOptions) {
    fn replace<T: Clone>(target: &mut Vec<T>, given: &[T]) {
        if !given.is_empty() {
            *target = given.to_vec();
        }
    }

    replace(&mut options.matching, &args.matching);
    replace(&mut options.reduction_factor, &args.reduction_factor);
    replace(&mut options.max_levels, &args.max_levels);
    replace(&mut options.similarity, &args.similarity);
    replace(&mut options.target_min_vertices, &args.gmv);
    replace(&mut options.seed_priority, &args.seed_priority);
    replace(&mut options.rank, &args.rank);
    replace(&mut options.itr, &args.itr);
    replace(&mut options.upper_bound, &args.upper_bound);
    replace(&mut options.tolerance, &args.tolerance);
    if !args.reverse.is_empty() {
        options.reverse = args.reverse.iter().cloned().map(Flag::Text).collect();
    }
    replace(&mut options.layers_to_coarse, &args.layers_to_coarse);
    if let Some(projection) = &args.projection {
        options.projection.clone_from(projection);
    }
    if let Some(workers) = args.workers {
        options.workers = workers;
    }
    if let Some(max_hops) = args.max_hops {
        options.max_hops = max_hops;
    }
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
}

fn output_name(args: &RunArgs) -> String {
    args.name.clone().unwrap_or_else(|| {
        args.input
            .file_stem()
            .map_or_else(|| "graph".to_string(), |s| s.to_string_lossy().into_owned())
    })
}

/// Execute `npcoarse run`.
///
/// # Errors
///
/// Returns an error if the options are invalid, the edge list cannot be
/// loaded, coarsening fails, or an output file cannot be written.
#[instrument(skip_all, fields(input = %args.input.display()))]
pub fn run(args: &RunArgs, mode: OutputMode) -> Result<()> {
    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => CoarseningOptions::default(),
    };
    apply_overrides(args, &mut options);
    let config = options.validate(args.vertices.len())?;

    let edges = load_ncol(&args.input)?;
    let graph = LayeredGraph::from_edges(&args.vertices, &edges)?;
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        layers = graph.layers(),
        "graph loaded"
    );

    let outcome = Coarsener::new(config)?.run(graph)?;
    let name = output_name(args);
    let mut summary = RunSummary::from_outcome(&name, &outcome);

    if let Some(dir) = &args.output_dir {
        let last = outcome.hierarchy.len() - 1;
        let membership = outcome
            .hierarchy
            .membership(last)
            .context("hierarchy has no coarsest level")?;
        summary.files = write_outputs(dir, &name, &membership, &summary)?;
    }

    output::render(mode, &summary, output::write_summary_text)
}

fn write_outputs(
    dir: &Path,
    name: &str,
    membership: &[usize],
    summary: &RunSummary,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let membership_path = dir.join(format!("{name}.membership"));
    output::write_membership(&membership_path, membership)
        .with_context(|| format!("failed to write {}", membership_path.display()))?;

    let hierarchy_path = dir.join(format!("{name}.hierarchy.json"));
    output::write_hierarchy(&hierarchy_path, summary)
        .with_context(|| format!("failed to write {}", hierarchy_path.display()))?;

    info!(dir = %dir.display(), "outputs written");
    Ok(vec![membership_path, hierarchy_path])
}
