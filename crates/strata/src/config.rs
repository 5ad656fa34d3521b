//! Configuration types for Strata layouts.
//!
//! All types implement [`serde::Deserialize`] so that they can be loaded from
//! external sources. Strategy names are snake_case strings; an unknown name is
//! rejected at load time, before any graph is touched.
//!
//! # Overview
//!
//! - [`LayoutConfig`] - Top-level configuration combining every section.
//! - [`PlacementConfig`] - Which [`NodePlacementStrategy`] runs and its tuning.
//! - [`CompactionConfig`] - Which [`GraphCompactionStrategy`] runs and its tuning.
//! - [`TreeConfig`] - Spacing for tree drawings.
//!
//! # Example
//!
//! ```
//! # use strata::config::{LayoutConfig, NodePlacementStrategy};
//! let config = LayoutConfig::default();
//! assert_eq!(config.placement().strategy(), NodePlacementStrategy::BrandesKoepf);
//! assert!(config.validate().is_ok());
//! ```

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::Deserialize;

use crate::error::StrataError;

/// Available node placement strategies, in increasing cost/quality.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePlacementStrategy {
    /// Centers every layer around a shared centerline.
    Simple,
    /// Keeps the coordinates the caller already assigned.
    Interactive,
    /// Aligns chains of long-edge dummies and balances them with the pendulum method.
    LinearSegments,
    /// Brandes–Köpf vertical alignment blocks, averaged over four sweeps.
    #[default]
    BrandesKoepf,
    /// Minimum-cost placement through network simplex on an auxiliary graph.
    NetworkSimplex,
}

impl NodePlacementStrategy {
    /// Every strategy, in registry order.
    pub const ALL: [Self; 5] = [
        Self::Simple,
        Self::Interactive,
        Self::LinearSegments,
        Self::BrandesKoepf,
        Self::NetworkSimplex,
    ];
}

impl FromStr for NodePlacementStrategy {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "interactive" => Ok(Self::Interactive),
            "linear_segments" => Ok(Self::LinearSegments),
            "brandes_koepf" => Ok(Self::BrandesKoepf),
            "network_simplex" => Ok(Self::NetworkSimplex),
            _ => Err(StrataError::Config(format!(
                "Unsupported node placement strategy `{s}`"
            ))),
        }
    }
}

impl From<NodePlacementStrategy> for &'static str {
    fn from(val: NodePlacementStrategy) -> Self {
        match val {
            NodePlacementStrategy::Simple => "simple",
            NodePlacementStrategy::Interactive => "interactive",
            NodePlacementStrategy::LinearSegments => "linear_segments",
            NodePlacementStrategy::BrandesKoepf => "brandes_koepf",
            NodePlacementStrategy::NetworkSimplex => "network_simplex",
        }
    }
}

impl Display for NodePlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Available compaction strategies applied after node placement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphCompactionStrategy {
    /// Positions pass through unchanged.
    #[default]
    None,
    /// Moves everything toward the leading edge.
    Left,
    /// Moves everything toward the trailing edge.
    Right,
    /// Left pass, lock constrained nodes, right pass.
    LeftRightConstraintLocking,
    /// Left pass, lock nodes toward their side with fewer connections, right pass.
    LeftRightConnectionLocking,
    /// Left pass followed by sweeps that shorten edges instead of narrowing.
    EdgeLength,
}

impl FromStr for GraphCompactionStrategy {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "left_right_constraint_locking" => Ok(Self::LeftRightConstraintLocking),
            "left_right_connection_locking" => Ok(Self::LeftRightConnectionLocking),
            "edge_length" => Ok(Self::EdgeLength),
            _ => Err(StrataError::Config(format!(
                "Unsupported compaction strategy `{s}`"
            ))),
        }
    }
}

impl From<GraphCompactionStrategy> for &'static str {
    fn from(val: GraphCompactionStrategy) -> Self {
        match val {
            GraphCompactionStrategy::None => "none",
            GraphCompactionStrategy::Left => "left",
            GraphCompactionStrategy::Right => "right",
            GraphCompactionStrategy::LeftRightConstraintLocking => "left_right_constraint_locking",
            GraphCompactionStrategy::LeftRightConnectionLocking => "left_right_connection_locking",
            GraphCompactionStrategy::EdgeLength => "edge_length",
        }
    }
}

impl Display for GraphCompactionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Top-level configuration combining every section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    placement: PlacementConfig,

    #[serde(default)]
    compaction: CompactionConfig,

    #[serde(default)]
    tree: TreeConfig,
}

impl LayoutConfig {
    /// Creates a new [`LayoutConfig`] from its sections.
    pub fn new(placement: PlacementConfig, compaction: CompactionConfig, tree: TreeConfig) -> Self {
        Self {
            placement,
            compaction,
            tree,
        }
    }

    pub fn placement(&self) -> &PlacementConfig {
        &self.placement
    }

    pub fn compaction(&self) -> &CompactionConfig {
        &self.compaction
    }

    pub fn tree(&self) -> &TreeConfig {
        &self.tree
    }

    /// Checks every numeric value of every section.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), StrataError> {
        self.placement.validate()?;
        self.compaction.validate()?;
        self.tree.validate()
    }
}

/// Node placement settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Strategy used by the node placement phase.
    strategy: NodePlacementStrategy,

    /// Minimum gap between consecutive nodes of a layer.
    node_spacing: f64,

    /// Gap between consecutive layers along the layering axis.
    layer_spacing: f64,

    /// Whether the layouter assigns layer coordinates before placement.
    assign_layer_positions: bool,

    /// Pendulum settings for [`NodePlacementStrategy::LinearSegments`].
    linear_segments: LinearSegmentsConfig,

    /// Solver settings for [`NodePlacementStrategy::NetworkSimplex`].
    network_simplex: NetworkSimplexConfig,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            strategy: NodePlacementStrategy::default(),
            node_spacing: 20.0,
            layer_spacing: 40.0,
            assign_layer_positions: true,
            linear_segments: LinearSegmentsConfig::default(),
            network_simplex: NetworkSimplexConfig::default(),
        }
    }
}

impl PlacementConfig {
    pub fn strategy(&self) -> NodePlacementStrategy {
        self.strategy
    }

    pub fn node_spacing(&self) -> f64 {
        self.node_spacing
    }

    pub fn layer_spacing(&self) -> f64 {
        self.layer_spacing
    }

    pub fn assign_layer_positions(&self) -> bool {
        self.assign_layer_positions
    }

    pub fn linear_segments(&self) -> &LinearSegmentsConfig {
        &self.linear_segments
    }

    pub fn network_simplex(&self) -> &NetworkSimplexConfig {
        &self.network_simplex
    }

    /// Set the placement strategy.
    pub fn with_strategy(mut self, strategy: NodePlacementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the minimum spacing between nodes of a layer.
    pub fn with_node_spacing(mut self, spacing: f64) -> Self {
        self.node_spacing = spacing;
        self
    }

    /// Set the spacing between layers.
    pub fn with_layer_spacing(mut self, spacing: f64) -> Self {
        self.layer_spacing = spacing;
        self
    }

    /// Enable or disable layer coordinate assignment.
    pub fn with_assign_layer_positions(mut self, assign: bool) -> Self {
        self.assign_layer_positions = assign;
        self
    }

    fn validate(&self) -> Result<(), StrataError> {
        check_spacing("placement.node_spacing", self.node_spacing)?;
        check_spacing("placement.layer_spacing", self.layer_spacing)?;
        self.linear_segments.validate()?;
        self.network_simplex.validate()
    }
}

/// Pendulum balancing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinearSegmentsConfig {
    max_iterations: usize,
    convergence_threshold: f64,
    deflection_damping: f64,
}

impl Default for LinearSegmentsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 0.01,
            deflection_damping: 0.5,
        }
    }
}

impl LinearSegmentsConfig {
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn convergence_threshold(&self) -> f64 {
        self.convergence_threshold
    }

    pub fn deflection_damping(&self) -> f64 {
        self.deflection_damping
    }

    fn validate(&self) -> Result<(), StrataError> {
        check_spacing(
            "placement.linear_segments.convergence_threshold",
            self.convergence_threshold,
        )?;
        if !(self.deflection_damping > 0.0 && self.deflection_damping <= 1.0) {
            return Err(StrataError::Config(format!(
                "placement.linear_segments.deflection_damping must be in (0, 1], got {}",
                self.deflection_damping
            )));
        }
        Ok(())
    }
}

/// Network simplex settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSimplexConfig {
    max_iterations: usize,
}

impl Default for NetworkSimplexConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
        }
    }
}

impl NetworkSimplexConfig {
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn validate(&self) -> Result<(), StrataError> {
        if self.max_iterations == 0 {
            return Err(StrataError::Config(
                "placement.network_simplex.max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compaction settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    strategy: GraphCompactionStrategy,

    /// Minimum gap between compaction nodes along the compaction axis. Also
    /// the clearance below which two nodes count as overlapping across it.
    spacing: f64,

    /// Sweep cap for [`GraphCompactionStrategy::EdgeLength`].
    max_iterations: usize,

    /// Largest move, in layout units, still counted as progress.
    convergence_threshold: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            strategy: GraphCompactionStrategy::default(),
            spacing: 20.0,
            max_iterations: 50,
            convergence_threshold: 0.001,
        }
    }
}

impl CompactionConfig {
    pub fn strategy(&self) -> GraphCompactionStrategy {
        self.strategy
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn convergence_threshold(&self) -> f64 {
        self.convergence_threshold
    }

    /// Set the compaction strategy.
    pub fn with_strategy(mut self, strategy: GraphCompactionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the compaction spacing.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    fn validate(&self) -> Result<(), StrataError> {
        check_spacing("compaction.spacing", self.spacing)?;
        check_spacing(
            "compaction.convergence_threshold",
            self.convergence_threshold,
        )
    }
}

/// Tree drawing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    node_spacing: f64,
    level_spacing: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            node_spacing: 20.0,
            level_spacing: 40.0,
        }
    }
}

impl TreeConfig {
    pub fn node_spacing(&self) -> f64 {
        self.node_spacing
    }

    pub fn level_spacing(&self) -> f64 {
        self.level_spacing
    }

    /// Set the spacing between siblings.
    pub fn with_node_spacing(mut self, spacing: f64) -> Self {
        self.node_spacing = spacing;
        self
    }

    /// Set the spacing between tree levels.
    pub fn with_level_spacing(mut self, spacing: f64) -> Self {
        self.level_spacing = spacing;
        self
    }

    fn validate(&self) -> Result<(), StrataError> {
        check_spacing("tree.node_spacing", self.node_spacing)?;
        check_spacing("tree.level_spacing", self.level_spacing)
    }
}

fn check_spacing(field: &str, value: f64) -> Result<(), StrataError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StrataError::Config(format!(
            "{field} must be finite and non-negative, got {value}"
        )))
    }
}
