//! Output layer for the CLI: human text or JSON on stdout, plus the files
//! written under `--output-dir`.
//!
//! # Files
//!
//! - `<name>.membership`: one line per original vertex, holding the id of
//!   the coarsest-level vertex that represents it.
//! - `<name>.hierarchy.json`: the [`RunSummary`] of the run.

use npcoarse_coarsen::{CoarseningOutcome, Termination};
use npcoarse_core::error::ErrorCode;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Width of the rule under section headings.
pub const RULE_WIDTH: usize = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

// ---------------------------------------------------------------------------
// Summary model
// ---------------------------------------------------------------------------

/// One recorded hierarchy level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    /// Coarsening depth reached per layer.
    pub level: Vec<usize>,
    /// Vertex count per layer.
    pub vertices: Vec<usize>,
    pub edges: usize,
}

/// Everything reported about a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub termination: &'static str,
    pub rounds: usize,
    pub hop: usize,
    pub levels: Vec<LevelSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

impl RunSummary {
    #[must_use]
    pub fn from_outcome(name: &str, outcome: &CoarseningOutcome) -> Self {
        let levels = outcome
            .hierarchy
            .levels()
            .iter()
            .map(|l| LevelSummary {
                level: l.level.clone(),
                vertices: l.graph.vertex_count_by_type(),
                edges: l.graph.edge_count(),
            })
            .collect();
        Self {
            name: name.to_string(),
            termination: termination_name(outcome.termination),
            rounds: outcome.rounds,
            hop: outcome.hop,
            levels,
            files: Vec::new(),
        }
    }
}

#[must_use]
pub const fn termination_name(termination: Termination) -> &'static str {
    match termination {
        Termination::FixedPoint => "fixed_point",
        Termination::HopsExhausted => "hops_exhausted",
    }
}

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Human rendering of a summary.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_summary_text(summary: &RunSummary, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", summary.name)?;
    writeln!(w, "{:-<width$}", "", width = RULE_WIDTH)?;
    writeln!(
        w,
        "{:<12} {} after {} rounds (hop {})",
        "stopped:", summary.termination, summary.rounds, summary.hop
    )?;
    writeln!(w, "{:<12} {}", "levels:", summary.levels.len())?;
    writeln!(w)?;
    writeln!(w, "{:<6} {:<14} {:<20} {:>10}", "#", "level", "vertices", "edges")?;
    for (i, level) in summary.levels.iter().enumerate() {
        writeln!(
            w,
            "{:<6} {:<14} {:<20} {:>10}",
            i,
            join(&level.level),
            join(&level.vertices),
            level.edges
        )?;
    }
    if !summary.files.is_empty() {
        writeln!(w)?;
        for file in &summary.files {
            writeln!(w, "wrote {}", file.display())?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render `value` to stdout: JSON in JSON mode, `human_fn` otherwise.
///
/// # Errors
///
/// Propagates serialization and write failures.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => human_fn(value, &mut out)?,
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

/// Render an error to stderr, with its code and hint when known.
///
/// # Errors
///
/// Propagates serialization and write failures.
pub fn render_error(
    mode: OutputMode,
    err: &anyhow::Error,
    code: Option<ErrorCode>,
) -> anyhow::Result<()> {
    let body = ErrorBody {
        error_code: code.map(ErrorCode::code),
        message: format!("{err:#}"),
        suggestion: code.and_then(ErrorCode::hint),
    };
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, &serde_json::json!({ "error": body }))?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            match body.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", body.message)?,
                None => writeln!(out, "error: {}", body.message)?,
            }
            if let Some(suggestion) = body.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Write one cluster id per line.
///
/// # Errors
///
/// Propagates I/O failures.
pub fn write_membership(path: &Path, membership: &[usize]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for cluster in membership {
        writeln!(out, "{cluster}")?;
    }
    out.flush()
}

/// Write `summary` as pretty JSON.
///
/// # Errors
///
/// Propagates I/O and serialization failures.
pub fn write_hierarchy(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, summary)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use npcoarse_coarsen::Coarsener;
    use npcoarse_core::config::CoarseningOptions;
    use npcoarse_core::graph::LayeredGraph;

    fn k43_outcome() -> CoarseningOutcome {
        let mut edges = Vec::new();
        for u in 0..4 {
            for v in 4..7 {
                edges.push((u, v, 1.0));
            }
        }
        let graph = LayeredGraph::from_edges(&[4, 3], &edges).expect("valid graph");
        let options = CoarseningOptions {
            max_levels: vec![2],
            ..CoarseningOptions::default()
        };
        Coarsener::new(options.validate(2).expect("valid"))
            .expect("pool")
            .run(graph)
            .expect("run")
    }

    #[test]
    fn summary_lists_every_level() {
        let summary = RunSummary::from_outcome("k43", &k43_outcome());
        assert_eq!(summary.termination, "fixed_point");
        assert_eq!(summary.levels.len(), 3);
        assert_eq!(summary.levels[0].vertices, vec![4, 3]);
        assert_eq!(summary.levels[0].edges, 12);
        assert_eq!(summary.levels[0].level, vec![0, 0]);
        assert_eq!(summary.levels[2].level, vec![2, 2]);
    }

    #[test]
    fn json_omits_empty_file_list() {
        let summary = RunSummary::from_outcome("k43", &k43_outcome());
        let value = serde_json::to_value(&summary).expect("serialize");
        assert!(value.get("files").is_none());
        assert_eq!(value["levels"][1]["vertices"], serde_json::json!([2, 2]));
    }

    #[test]
    fn text_summary_has_one_row_per_level() {
        let summary = RunSummary::from_outcome("k43", &k43_outcome());
        let mut buf = Vec::new();
        write_summary_text(&summary, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("k43\n"));
        assert!(text.contains("fixed_point"));
        assert!(text.lines().any(|l| l.starts_with("0 ") && l.contains("4,3")));
        assert!(text.lines().any(|l| l.starts_with("2 ") && l.contains("1,1")));
    }

    #[test]
    fn membership_file_has_one_line_per_vertex() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("g.membership");
        write_membership(&path, &[0, 0, 1, 2]).expect("write");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(text, "0\n0\n1\n2\n");
    }

    #[test]
    fn termination_names_are_snake_case() {
        assert_eq!(termination_name(Termination::HopsExhausted), "hops_exhausted");
    }
}
