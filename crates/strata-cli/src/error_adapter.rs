//! Error adapter for converting CliError to miette diagnostics.
//!
//! This module provides the bridge between the CLI's standard error type and
//! miette's rich diagnostic formatting. TOML errors carry their source text,
//! so they are rendered with a labeled snippet.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, SourceSpan};

use strata::StrataError;

use crate::error::CliError;

/// Adapter implementing [`MietteDiagnostic`] for a [`CliError`].
pub struct ErrorAdapter<'a> {
    err: &'a CliError,
    /// Source of a TOML error, named after its file
    source: Option<NamedSource<String>>,
}

impl<'a> ErrorAdapter<'a> {
    pub fn new(err: &'a CliError) -> Self {
        let source = match err {
            CliError::Toml { path, src, .. } => {
                Some(NamedSource::new(path.display().to_string(), src.clone()))
            }
            _ => None,
        };
        Self { err, source }
    }
}

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.err, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.err, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self.err)
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.err {
            CliError::Io(_) => "strata::io",
            CliError::MissingConfig(_) => "strata::config",
            CliError::Toml { .. } => "strata::toml",
            CliError::Input(_) => "strata::input",
            CliError::Layout(StrataError::Config(_)) => "strata::config",
            CliError::Layout(StrataError::Precondition { .. }) => "strata::precondition",
            CliError::Layout(StrataError::Consistency { .. }) => "strata::consistency",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self.err {
            CliError::MissingConfig(_) => "check the path passed with --config",
            CliError::Layout(StrataError::Config(_)) => {
                "strategies and spacings are set in the configuration file"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source
            .as_ref()
            .map(|source| source as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let CliError::Toml { err, .. } = self.err else {
            return None;
        };
        let span = err.span()?;
        let label = LabeledSpan::new_primary_with_span(
            Some(err.message().to_string()),
            SourceSpan::new(span.start.into(), span.len()),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

/// Convert a [`CliError`] into the reportable errors rendered by `main`.
///
/// Every variant currently maps to a single report.
pub fn to_reportables(err: &CliError) -> Vec<ErrorAdapter<'_>> {
    vec![ErrorAdapter::new(err)]
}
