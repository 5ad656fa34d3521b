//! Error type of the CLI.

use std::{io, path::PathBuf};

use thiserror::Error;

use strata::StrataError;

/// Errors raised while loading files or laying out the graph.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Missing configuration file: {}", .0.display())]
    MissingConfig(PathBuf),

    /// A TOML file that does not deserialize. Keeps the source for snippets.
    #[error("Failed to parse {}: {}", path.display(), err.message())]
    Toml {
        path: PathBuf,
        src: String,
        err: toml::de::Error,
    },

    /// A well-formed input that describes an invalid graph.
    #[error("Invalid input graph: {0}")]
    Input(String),

    #[error(transparent)]
    Layout(#[from] StrataError),
}

impl CliError {
    pub(crate) fn toml(path: impl Into<PathBuf>, src: impl Into<String>, err: toml::de::Error) -> Self {
        Self::Toml {
            path: path.into(),
            src: src.into(),
            err,
        }
    }
}
