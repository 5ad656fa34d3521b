//! Interactive node placement: keeps the coordinates the caller assigned.

use crate::{
    config::NodePlacementStrategy,
    error::StrataError,
    layout::placement::NodePlacer,
    progress::{ProgressMonitor, Step},
    structure::LayeredGraph,
};

/// Identity placer. The placement phase only verifies its result.
#[derive(Debug, Default)]
pub struct Placer;

impl Placer {
    pub fn new() -> Self {
        Self
    }
}

impl NodePlacer for Placer {
    fn strategy(&self) -> NodePlacementStrategy {
        NodePlacementStrategy::Interactive
    }

    fn place(
        &self,
        graph: &LayeredGraph,
        _monitor: &dyn ProgressMonitor,
    ) -> Result<Step<Vec<f64>>, StrataError> {
        Ok(Step::Done(graph.y_coordinates()))
    }
}
