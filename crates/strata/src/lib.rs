//! Strata - coordinate assignment for layered and tree graph drawings.
//!
//! Given a graph whose nodes are already partitioned into ordered layers, Strata
//! computes node positions: a node placement strategy assigns every node its
//! coordinate along the layer, and an optional compaction pass shrinks the
//! drawing along the layering axis. Rooted graphs are drawn as trees after a
//! temporary reduction to a forest that is undone afterwards.
//!
//! The [`Layouter`] runs both pipelines from a validated [`LayoutConfig`].

pub mod config;
pub mod error;
pub mod layout;
pub mod progress;
pub mod structure;

pub use strata_core::{geometry, identifier};

pub use config::LayoutConfig;
pub use error::{Stage, StrataError};
pub use progress::{Outcome, ProgressMonitor, Step};

use log::{debug, info};

use layout::{GraphCompactor, NodePlacementPhase, TreePlacer, tree};
use structure::{EdgeReduction, LayeredGraph, TGraph};

/// Runs the layered and tree layout pipelines.
///
/// A `Layouter` holds configuration only. It can be shared between threads
/// and lay out distinct graphs concurrently.
///
/// # Examples
///
/// ```
/// use strata::{Layouter, LayoutConfig, Outcome, progress::NullMonitor};
/// use strata::structure::{LNode, LayeredGraph};
/// use strata_core::geometry::Size;
///
/// let mut graph = LayeredGraph::new();
/// let a = graph.add_node(0, LNode::new("a", Size::new(10.0, 10.0)));
/// let b = graph.add_node(1, LNode::new("b", Size::new(10.0, 10.0)));
/// graph.add_edge(a, b);
///
/// let layouter = Layouter::new(LayoutConfig::default()).unwrap();
/// let outcome = layouter.layout(&mut graph, &NullMonitor).unwrap();
///
/// assert_eq!(outcome, Outcome::Completed);
/// assert_eq!(graph.node(b).position().x(), 50.0);
/// ```
pub struct Layouter {
    config: LayoutConfig,
    placement: NodePlacementPhase,
    compactor: GraphCompactor,
    tree_placer: TreePlacer,
}

impl Layouter {
    /// Create a new layouter with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Placement, compaction and tree settings
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] if a spacing, threshold or iteration
    /// cap is out of range.
    pub fn new(config: LayoutConfig) -> Result<Self, StrataError> {
        config.validate()?;
        debug!(config:?; "Layouter configured");
        Ok(Self {
            placement: NodePlacementPhase::new(config.placement()),
            compactor: GraphCompactor::new(config.compaction()),
            tree_placer: TreePlacer::new(config.tree()),
            config,
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Assign coordinates to every node of a layered graph.
    ///
    /// Runs layer axis assignment (if enabled), node placement with the
    /// configured strategy and compaction with the configured strategy.
    /// Nodes, edges and layers are never added or removed.
    ///
    /// # Arguments
    ///
    /// * `graph` - Graph whose layers and in-layer order are already fixed
    /// * `monitor` - Polled for cancellation between units of work
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage. Stages that finished before it
    /// keep their output.
    pub fn layout(
        &self,
        graph: &mut LayeredGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Outcome, StrataError> {
        let placement = self.config.placement();
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            layers = graph.layer_count();
            "Laying out layered graph"
        );

        if placement.assign_layer_positions() {
            graph.assign_layer_positions(placement.layer_spacing());
        }

        if self
            .placement
            .run(graph, placement.strategy(), monitor)?
            .is_cancelled()
        {
            return Ok(Outcome::Cancelled);
        }

        if self.compactor.run(graph, monitor)?.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        info!("Layered layout finished");
        Ok(Outcome::Completed)
    }

    /// Draw a rooted graph as a tree.
    ///
    /// An intact graph is reduced to a forest first; a graph whose caller
    /// already withheld edges is placed as is. The withheld edges are
    /// restored afterwards whether placement completed, was cancelled or
    /// failed, so the topology always comes back unchanged.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the graph was already restored or
    /// its attached edges do not form a forest. In the latter case the
    /// edges are restored before the error is returned.
    pub fn layout_tree(
        &self,
        graph: &mut TGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Outcome, StrataError> {
        info!(nodes = graph.node_count(), edges = graph.edge_count(); "Laying out tree");

        if graph.reduction() == &EdgeReduction::Intact {
            tree::reduce(graph)?;
        }
        let placed = self.tree_placer.place(graph, monitor);
        if matches!(graph.reduction(), EdgeReduction::Reduced { .. }) {
            tree::restore(graph)?;
        }
        let outcome = placed?;

        info!(outcome:?; "Tree layout finished");
        Ok(outcome)
    }
}
