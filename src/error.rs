//! Error types for the build engine.
//!
//! Every variant is fatal: a build either finishes or stops at the first
//! failure with one of these.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Error, Debug)]
pub enum BuildError {
    /// A quoted include names a file absent from every search directory.
    #[error("cannot resolve \"{include}\" included from {from} (searched: {})", join_paths(.searched))]
    Resolution {
        include: String,
        from: PathBuf,
        searched: Vec<PathBuf>,
    },

    /// The compiler returned a non-success status.
    #[error("compilation of {file} failed{}", status_suffix(.code))]
    Compilation { file: PathBuf, code: Option<i32> },

    /// The linker returned a non-success status.
    #[error("linking {output} failed{}", status_suffix(.code))]
    Link { output: PathBuf, code: Option<i32> },

    /// Bad variant, missing entry, empty source set, unmappable paths.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The compiler or linker executable could not be started.
    #[error("failed to execute '{program}': {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Linking reported success but produced nothing.
    #[error("expected output {path} was not produced")]
    MissingOutput { path: PathBuf },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status to report for this failure.
    ///
    /// Tool failures forward the tool's own status so wrappers see what the
    /// compiler or linker returned.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Compilation { code, .. } | BuildError::Link { code, .. } => {
                code.filter(|c| *c != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn status_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" with exit status {}", c),
        None => " (terminated by signal)".to_string(),
    }
}
