//! Error types for Strata operations.
//!
//! This module provides the main error type [`StrataError`] and the [`Stage`]
//! that names which component (and which strategy) raised it.

use std::fmt;

use thiserror::Error;

use crate::config::{GraphCompactionStrategy, NodePlacementStrategy};

/// Component of the layout pipeline an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Structural checks on a layered or tree graph.
    GraphModel,
    NodePlacement(NodePlacementStrategy),
    Compaction(GraphCompactionStrategy),
    TreeReduction,
    TreePlacement,
    TreeRestoration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::GraphModel => write!(f, "graph model"),
            Stage::NodePlacement(strategy) => write!(f, "node placement ({strategy})"),
            Stage::Compaction(strategy) => write!(f, "compaction ({strategy})"),
            Stage::TreeReduction => write!(f, "tree reduction"),
            Stage::TreePlacement => write!(f, "tree placement"),
            Stage::TreeRestoration => write!(f, "tree restoration"),
        }
    }
}

/// The main error type for Strata operations.
///
/// Every variant aborts the current layout invocation. Cancellation is not an
/// error; it is reported through [`Outcome::Cancelled`](crate::Outcome).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrataError {
    /// An unknown strategy identifier or an invalid configuration value.
    /// Raised before any graph is touched.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The input handed to a component breaks that component's preconditions.
    #[error("Precondition violated in {stage}: {message}")]
    Precondition { stage: Stage, message: String },

    /// A component produced or detected contradictory internal state, such as
    /// two locked compaction nodes that overlap.
    #[error("Internal consistency error in {stage}: {message}")]
    Consistency { stage: Stage, message: String },
}

impl StrataError {
    /// Create a new `Precondition` error for the given stage.
    pub fn precondition(stage: Stage, message: impl Into<String>) -> Self {
        Self::Precondition {
            stage,
            message: message.into(),
        }
    }

    /// Create a new `Consistency` error for the given stage.
    pub fn consistency(stage: Stage, message: impl Into<String>) -> Self {
        Self::Consistency {
            stage,
            message: message.into(),
        }
    }

    /// Returns the stage that raised the error, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Config(_) => None,
            Self::Precondition { stage, .. } | Self::Consistency { stage, .. } => Some(*stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stage_and_strategy() {
        let err = StrataError::consistency(
            Stage::Compaction(GraphCompactionStrategy::Left),
            "groups overlap",
        );
        assert_eq!(
            err.to_string(),
            "Internal consistency error in compaction (left): groups overlap"
        );
        assert_eq!(
            err.stage(),
            Some(Stage::Compaction(GraphCompactionStrategy::Left))
        );
    }

    #[test]
    fn test_config_error_has_no_stage() {
        let err = StrataError::Config("unknown strategy".to_string());
        assert_eq!(err.stage(), None);
        assert_eq!(err.to_string(), "Configuration error: unknown strategy");
    }

    #[test]
    fn test_precondition_display() {
        let err = StrataError::precondition(Stage::TreeRestoration, "graph is not reduced");
        assert_eq!(
            err.to_string(),
            "Precondition violated in tree restoration: graph is not reduced"
        );
    }
}
