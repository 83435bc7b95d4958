//! Error types for graph loading, configuration and coarsening.
//!
//! Configuration errors are detected once, before any coarsening work
//! starts. Input errors come from the edge-list loader and graph
//! construction. Structural invariant violations (cross-layer merges,
//! double-claimed vertices) are not represented here: they are defects and
//! are guarded by assertions where they could arise.

use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes, surfaced by the CLI next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigLengthMismatch,
    ConfigUnknownName,
    ConfigOutOfRange,
    ConfigUnreadable,
    InputUnreadable,
    InputMalformed,
    FactorizationFailed,
    WorkerPoolFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigLengthMismatch => "E1001",
            Self::ConfigUnknownName => "E1002",
            Self::ConfigOutOfRange => "E1003",
            Self::ConfigUnreadable => "E1004",
            Self::InputUnreadable => "E2001",
            Self::InputMalformed => "E2002",
            Self::FactorizationFailed => "E3001",
            Self::WorkerPoolFailed => "E3002",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigLengthMismatch => {
                Some("Pass one value per layer, or a single value to apply to every layer.")
            }
            Self::ConfigUnknownName => Some("Run `npcoarse run --help` for the accepted names."),
            Self::ConfigOutOfRange => None,
            Self::ConfigUnreadable => Some("Check that the config file exists and is valid TOML."),
            Self::InputUnreadable => Some("Check the path and read permissions."),
            Self::InputMalformed => Some("Each line must be `u v [weight]` with integer ids."),
            Self::FactorizationFailed => {
                Some("Lower the factorization rank or pick a different matching for this layer.")
            }
            Self::WorkerPoolFailed => Some("Lower --workers or check the process thread limit."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Invalid coarsening options. Always names the offending parameter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("number of layers ({layers}) and {param} ({len} values) do not match")]
    LengthMismatch {
        param: &'static str,
        layers: usize,
        len: usize,
    },

    #[error("{param}: unknown value `{value}` (expected one of: {expected})")]
    UnknownName {
        param: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{param}: boolean value expected, got `{value}`")]
    InvalidBool { param: &'static str, value: String },

    #[error("{param}: value {value} out of range ({reason})")]
    OutOfRange {
        param: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("layers_to_coarse: layer {layer} does not exist (graph has {layers} layers)")]
    UnknownLayer { layer: usize, layers: usize },

    #[error("failed to read config file {path}: {reason}")]
    File { path: PathBuf, reason: String },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::LengthMismatch { .. } => ErrorCode::ConfigLengthMismatch,
            Self::UnknownName { .. } | Self::InvalidBool { .. } => ErrorCode::ConfigUnknownName,
            Self::OutOfRange { .. } | Self::UnknownLayer { .. } => ErrorCode::ConfigOutOfRange,
            Self::File { .. } => ErrorCode::ConfigUnreadable,
        }
    }
}

/// Failure to read or build the level-0 graph.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("edge ({u}, {v}) references a vertex outside 0..{vertex_count}")]
    VertexOutOfRange {
        u: usize,
        v: usize,
        vertex_count: usize,
    },

    #[error("edge ({u}, {v}) has invalid weight {weight}")]
    InvalidWeight { u: usize, v: usize, weight: f64 },

    #[error("graph must have at least one layer")]
    NoLayers,
}

impl InputError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::InputUnreadable,
            _ => ErrorCode::InputMalformed,
        }
    }
}

/// Top-level library error.
#[derive(Debug, thiserror::Error)]
pub enum CoarsenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("matrix factorization failed: {0}")]
    Factorization(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

impl CoarsenError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(err) => err.code(),
            Self::Input(err) => err.code(),
            Self::Factorization(_) => ErrorCode::FactorizationFailed,
            Self::WorkerPool(_) => ErrorCode::WorkerPoolFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigLengthMismatch,
            ErrorCode::ConfigUnknownName,
            ErrorCode::ConfigOutOfRange,
            ErrorCode::ConfigUnreadable,
            ErrorCode::InputUnreadable,
            ErrorCode::InputMalformed,
            ErrorCode::FactorizationFailed,
            ErrorCode::WorkerPoolFailed,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn config_error_names_parameter() {
        let err = ConfigError::LengthMismatch {
            param: "max_levels",
            layers: 3,
            len: 2,
        };
        let text = err.to_string();
        assert!(text.contains("max_levels"));
        assert!(text.contains('3'));
        assert_eq!(err.code(), ErrorCode::ConfigLengthMismatch);
    }

    #[test]
    fn pool_and_config_file_failures_have_their_own_codes() {
        let pool = CoarsenError::WorkerPool("thread spawn failed".to_string());
        assert_eq!(pool.code(), ErrorCode::WorkerPoolFailed);
        assert_eq!(pool.code().code(), "E3002");
        assert!(pool.code().hint().is_some_and(|h| !h.contains("rank")));

        let file = ConfigError::File {
            path: PathBuf::from("opts.toml"),
            reason: "not found".to_string(),
        };
        assert_eq!(file.code(), ErrorCode::ConfigUnreadable);
        assert_eq!(CoarsenError::from(file).code().code(), "E1004");
    }

    #[test]
    fn wrapped_errors_keep_their_code() {
        let err = CoarsenError::from(InputError::Parse {
            line: 4,
            reason: "bad id".to_string(),
        });
        assert_eq!(err.code(), ErrorCode::InputMalformed);
        assert_eq!(err.to_string(), "line 4: bad id");
    }
}
