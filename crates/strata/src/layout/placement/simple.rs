//! Simple node placement: stacks every layer and centers it on a shared line.

use log::debug;

use crate::{
    config::NodePlacementStrategy,
    error::StrataError,
    layout::placement::NodePlacer,
    progress::{ProgressMonitor, Step},
    structure::{Handle, LayeredGraph, NodeId},
};

/// Edge-unaware placer. The tallest layer starts at zero and every other
/// layer is offset so that its extent is centered on the tallest layer's
/// centerline.
pub struct Placer {
    spacing: f64,
}

impl Placer {
    pub fn new(spacing: f64) -> Self {
        Self { spacing }
    }

    fn layer_height(&self, graph: &LayeredGraph, layer: &[NodeId]) -> f64 {
        let heights: f64 = layer
            .iter()
            .map(|&id| graph.node(id).size().height())
            .sum();
        heights + self.spacing * layer.len().saturating_sub(1) as f64
    }
}

impl NodePlacer for Placer {
    fn strategy(&self) -> NodePlacementStrategy {
        NodePlacementStrategy::Simple
    }

    fn place(
        &self,
        graph: &LayeredGraph,
        _monitor: &dyn ProgressMonitor,
    ) -> Result<Step<Vec<f64>>, StrataError> {
        let heights: Vec<f64> = graph
            .layers()
            .map(|layer| self.layer_height(graph, layer))
            .collect();
        let tallest = heights.iter().copied().fold(0.0, f64::max);
        debug!(tallest, layers = heights.len(); "Centering layers");

        let mut ys = vec![0.0; graph.node_count()];
        for (layer, height) in graph.layers().zip(&heights) {
            let mut y = (tallest - height) / 2.0;
            for &id in layer {
                ys[id.index()] = y;
                y += graph.node(id).size().height() + self.spacing;
            }
        }

        Ok(Step::Done(ys))
    }
}
