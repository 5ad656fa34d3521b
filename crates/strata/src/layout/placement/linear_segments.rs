//! Linear segments node placement balanced with the pendulum method.
//!
//! Chains of long-edge dummies are kept on one straight line ("linear
//! segments"). Segments are placed top-down in dependency order and then
//! repeatedly pulled toward the mean center of their neighbors, like pendulums
//! coming to rest.

use std::{cmp::Reverse, collections::BinaryHeap};

use log::{debug, trace};

use crate::{
    config::NodePlacementStrategy,
    error::{Stage, StrataError},
    layout::placement::NodePlacer,
    progress::{ProgressMonitor, Step},
    structure::{Handle, LayeredGraph, NodeId},
};

/// Pendulum placer.
pub struct Placer {
    spacing: f64,
    max_iterations: usize,
    convergence_threshold: f64,
    deflection_damping: f64,
}

impl Placer {
    pub fn new(spacing: f64) -> Self {
        Self {
            spacing,
            max_iterations: 100,
            convergence_threshold: 0.01,
            deflection_damping: 0.5,
        }
    }

    /// Set the maximum number of balancing sweeps
    pub fn set_max_iterations(&mut self, iterations: usize) -> &mut Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the largest move that still counts as progress
    pub fn set_convergence_threshold(&mut self, threshold: f64) -> &mut Self {
        self.convergence_threshold = threshold;
        self
    }

    /// Set the factor applied to every deflection
    pub fn set_deflection_damping(&mut self, damping: f64) -> &mut Self {
        self.deflection_damping = damping;
        self
    }

    fn stage() -> Stage {
        Stage::NodePlacement(NodePlacementStrategy::LinearSegments)
    }

    /// Places every segment as high as the nodes above it allow, with all
    /// nodes of a segment sharing one center line.
    fn place_unbalanced(
        &self,
        graph: &LayeredGraph,
        segments: &Segments,
        order: &[usize],
    ) -> Vec<f64> {
        let mut ys = vec![0.0; graph.node_count()];
        for &segment in order {
            let center = segments.nodes[segment]
                .iter()
                .map(|&id| {
                    let min_top = graph
                        .above(id)
                        .map_or(0.0, |above| self.bottom(graph, &ys, above) + self.spacing);
                    min_top + graph.node(id).size().height() / 2.0
                })
                .fold(f64::NEG_INFINITY, f64::max);
            for &id in &segments.nodes[segment] {
                ys[id.index()] = center - graph.node(id).size().height() / 2.0;
            }
        }
        ys
    }

    /// Runs one pendulum sweep and returns the largest move made.
    fn balance(
        &self,
        graph: &LayeredGraph,
        segments: &Segments,
        order: &[usize],
        ys: &mut [f64],
    ) -> f64 {
        let deflections: Vec<f64> = (0..segments.nodes.len())
            .map(|segment| self.deflection_damping * segments.deflection(graph, ys, segment))
            .collect();

        let mut largest: f64 = 0.0;
        for &segment in order {
            let deflection = deflections[segment];
            if deflection < 0.0 {
                let room = segments.nodes[segment]
                    .iter()
                    .filter_map(|&id| {
                        graph.above(id).map(|above| {
                            ys[id.index()] - self.bottom(graph, ys, above) - self.spacing
                        })
                    })
                    .fold(f64::INFINITY, f64::min)
                    .max(0.0);
                let delta = deflection.max(-room);
                segments.shift(segment, ys, delta);
                largest = largest.max(delta.abs());
            }
        }
        for &segment in order.iter().rev() {
            let deflection = deflections[segment];
            if deflection > 0.0 {
                let room = segments.nodes[segment]
                    .iter()
                    .filter_map(|&id| {
                        below(graph, id).map(|below| {
                            ys[below.index()] - self.bottom(graph, ys, id) - self.spacing
                        })
                    })
                    .fold(f64::INFINITY, f64::min)
                    .max(0.0);
                let delta = deflection.min(room);
                segments.shift(segment, ys, delta);
                largest = largest.max(delta.abs());
            }
        }
        largest
    }

    fn bottom(&self, graph: &LayeredGraph, ys: &[f64], id: NodeId) -> f64 {
        ys[id.index()] + graph.node(id).size().height()
    }
}

impl NodePlacer for Placer {
    fn strategy(&self) -> NodePlacementStrategy {
        NodePlacementStrategy::LinearSegments
    }

    fn place(
        &self,
        graph: &LayeredGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<Vec<f64>>, StrataError> {
        let mut segments = Segments::build(graph);
        let order = segments.order(graph)?;
        debug!(segments = segments.nodes.len(); "Linear segments ordered");

        let mut ys = self.place_unbalanced(graph, &segments, &order);

        for iteration in 0..self.max_iterations {
            if monitor.is_cancelled() {
                return Ok(Step::Cancelled);
            }
            let largest = self.balance(graph, &segments, &order, &mut ys);
            trace!(iteration, largest; "Pendulum sweep");
            monitor.report_progress((iteration + 1) as f64 / self.max_iterations as f64);
            if largest < self.convergence_threshold {
                debug!(iterations = iteration + 1; "Pendulum balancing converged");
                break;
            }
        }

        Ok(Step::Done(ys))
    }
}

/// Linear segments of a graph and the segment of every node.
#[derive(Debug)]
struct Segments {
    /// Nodes of every segment, one per consecutive layer, top layer first.
    nodes: Vec<Vec<NodeId>>,
    /// Segment index of every node.
    owner: Vec<usize>,
}

impl Segments {
    fn build(graph: &LayeredGraph) -> Self {
        let mut segments = Self {
            nodes: Vec::new(),
            owner: vec![0; graph.node_count()],
        };
        for layer in graph.layers() {
            for &id in layer {
                match chain_predecessor(graph, id) {
                    Some(predecessor) => {
                        let segment = segments.owner[predecessor.index()];
                        segments.nodes[segment].push(id);
                        segments.owner[id.index()] = segment;
                    }
                    None => {
                        segments.owner[id.index()] = segments.nodes.len();
                        segments.nodes.push(vec![id]);
                    }
                }
            }
        }
        segments
    }

    /// Orders segments so that every segment comes after all segments holding
    /// a node directly above one of its nodes. Segments caught in a cycle are
    /// split until the ordering succeeds.
    fn order(&mut self, graph: &LayeredGraph) -> Result<Vec<usize>, StrataError> {
        loop {
            let count = self.nodes.len();
            let mut successors = vec![Vec::new(); count];
            let mut in_degree = vec![0usize; count];
            for layer in graph.layers() {
                for pair in layer.windows(2) {
                    let (upper, lower) = (self.owner[pair[0].index()], self.owner[pair[1].index()]);
                    successors[upper].push(lower);
                    in_degree[lower] += 1;
                }
            }

            let key = |segment: usize| {
                let first = graph.node(self.nodes[segment][0]);
                Reverse((first.layer(), first.index(), segment))
            };
            let mut ready: BinaryHeap<_> = (0..count)
                .filter(|&segment| in_degree[segment] == 0)
                .map(key)
                .collect();
            let mut order = Vec::with_capacity(count);
            while let Some(Reverse((_, _, segment))) = ready.pop() {
                order.push(segment);
                for &next in &successors[segment] {
                    in_degree[next] -= 1;
                    if in_degree[next] == 0 {
                        ready.push(key(next));
                    }
                }
            }
            if order.len() == count {
                return Ok(order);
            }

            let longest = (0..count)
                .filter(|&segment| in_degree[segment] > 0)
                .max_by_key(|&segment| (self.nodes[segment].len(), Reverse(segment)))
                .filter(|&segment| self.nodes[segment].len() > 1)
                .ok_or_else(|| {
                    StrataError::consistency(
                        Placer::stage(),
                        "segment ordering has a cycle that no split can break",
                    )
                })?;
            self.split(longest);
        }
    }

    /// Splits a segment at its midpoint; the lower half becomes a new segment.
    fn split(&mut self, segment: usize) {
        let middle = self.nodes[segment].len() / 2;
        let lower = self.nodes[segment].split_off(middle);
        let index = self.nodes.len();
        for id in &lower {
            self.owner[id.index()] = index;
        }
        debug!(segment, at = middle; "Split linear segment to break an ordering cycle");
        self.nodes.push(lower);
    }

    /// Weighted mean offset from the segment's center line to the centers of
    /// its neighbors in adjacent layers, ignoring edges inside the segment.
    fn deflection(&self, graph: &LayeredGraph, ys: &[f64], segment: usize) -> f64 {
        let center = |id: NodeId| ys[id.index()] + graph.node(id).size().height() / 2.0;

        let mut sum = 0.0;
        let mut weights = 0.0;
        for &id in &self.nodes[segment] {
            let node = graph.node(id);
            for &edge_id in node.incoming().iter().chain(node.outgoing()) {
                let edge = graph.edge(edge_id);
                if edge.is_self_loop() {
                    continue;
                }
                let other = edge.other(id);
                if self.owner[other.index()] == segment
                    || graph.node(other).layer().abs_diff(node.layer()) != 1
                {
                    continue;
                }
                let weight = f64::from(edge.weight());
                sum += weight * (center(other) - center(id));
                weights += weight;
            }
        }
        if weights > 0.0 { sum / weights } else { 0.0 }
    }

    fn shift(&self, segment: usize, ys: &mut [f64], delta: f64) {
        for id in &self.nodes[segment] {
            ys[id.index()] += delta;
        }
    }
}

/// Returns the dummy a dummy node continues in a straight chain, if any.
fn chain_predecessor(graph: &LayeredGraph, id: NodeId) -> Option<NodeId> {
    let node = graph.node(id);
    let [edge] = node.incoming() else {
        return None;
    };
    let predecessor = graph.edge(*edge).source();
    let upper = graph.node(predecessor);
    (node.is_dummy()
        && upper.is_dummy()
        && upper.layer() + 1 == node.layer()
        && upper.outgoing().len() == 1)
        .then_some(predecessor)
}

fn below(graph: &LayeredGraph, id: NodeId) -> Option<NodeId> {
    let node = graph.node(id);
    graph.layer(node.layer()).get(node.index() + 1).copied()
}
