//! Edge-list (`ncol`) loading.
//!
//! Each non-blank line is `u v [weight]` with whitespace separators. Lines
//! starting with `#` are comments. A missing weight defaults to `1.0`. A
//! repeated `(u, v)` line overwrites the earlier weight but keeps the
//! position of its first occurrence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, instrument};

use crate::error::InputError;

/// Weighted edges in file order.
pub type EdgeList = Vec<(usize, usize, f64)>;

/// Read an `ncol` edge list from `path`.
///
/// # Errors
///
/// Returns [`InputError::Io`] if the file cannot be opened or read, and
/// [`InputError::Parse`] (with the 1-based line number) on malformed lines.
#[instrument]
pub fn load_ncol(path: &Path) -> Result<EdgeList, InputError> {
    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let edges = read_ncol(BufReader::new(file)).map_err(|err| match err {
        InputError::Io { source, .. } => InputError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    debug!(edges = edges.len(), "loaded edge list");
    Ok(edges)
}

/// Read an `ncol` edge list from any buffered reader.
///
/// # Errors
///
/// See [`load_ncol`].
pub fn read_ncol<R: BufRead>(reader: R) -> Result<EdgeList, InputError> {
    let mut edges: EdgeList = Vec::new();
    let mut positions: HashMap<(usize, usize), usize> = HashMap::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|source| InputError::Io {
            path: "<reader>".into(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let (u, v, weight) = match fields.as_slice() {
            [u, v] => (parse_id(u, line_no)?, parse_id(v, line_no)?, 1.0),
            [u, v, w] => (
                parse_id(u, line_no)?,
                parse_id(v, line_no)?,
                parse_weight(w, line_no)?,
            ),
            _ => {
                return Err(InputError::Parse {
                    line: line_no,
                    reason: format!("expected 2 or 3 fields, found {}", fields.len()),
                });
            }
        };

        if let Some(&pos) = positions.get(&(u, v)) {
            edges[pos].2 = weight;
        } else {
            positions.insert((u, v), edges.len());
            edges.push((u, v, weight));
        }
    }

    Ok(edges)
}

fn parse_id(field: &str, line: usize) -> Result<usize, InputError> {
    field.parse().map_err(|_| InputError::Parse {
        line,
        reason: format!("invalid vertex id `{field}`"),
    })
}

fn parse_weight(field: &str, line: usize) -> Result<f64, InputError> {
    field.parse().map_err(|_| InputError::Parse {
        line,
        reason: format!("invalid weight `{field}`"),
    })
}
