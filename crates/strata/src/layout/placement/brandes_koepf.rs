//! Brandes–Köpf node placement.
//!
//! Nodes are grouped into vertical alignment blocks by median neighbors, once
//! for each combination of sweep direction (down or up the layers) and
//! in-layer direction (top-first or bottom-first). Each of the four
//! alignments is compacted with a longest path over its block graph, the
//! results are aligned to the narrowest one and averaged.
//!
//! Only edges between adjacent layers take part in the alignment.

use std::collections::HashSet;

use log::{debug, trace};

use crate::{
    config::NodePlacementStrategy,
    error::{Stage, StrataError},
    layout::placement::NodePlacer,
    progress::{ProgressMonitor, Step},
    structure::{Handle, LayeredGraph, NodeId},
};

/// Direction in which the layers are traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vertical {
    /// From the first layer to the last, aligning with upper neighbors.
    Down,
    /// From the last layer to the first, aligning with lower neighbors.
    Up,
}

/// Direction in which the nodes of a layer are traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Horizontal {
    TopFirst,
    BottomFirst,
}

const SWEEPS: [(Vertical, Horizontal); 4] = [
    (Vertical::Down, Horizontal::TopFirst),
    (Vertical::Down, Horizontal::BottomFirst),
    (Vertical::Up, Horizontal::TopFirst),
    (Vertical::Up, Horizontal::BottomFirst),
];

/// Aligned block placer.
pub struct Placer {
    spacing: f64,
}

impl Placer {
    pub fn new(spacing: f64) -> Self {
        Self { spacing }
    }

    fn stage() -> Stage {
        Stage::NodePlacement(NodePlacementStrategy::BrandesKoepf)
    }

    /// Runs one sweep and returns the center of every node in the original
    /// orientation.
    fn sweep(
        &self,
        graph: &LayeredGraph,
        conflicts: &Conflicts,
        vertical: Vertical,
        horizontal: Horizontal,
    ) -> Result<Vec<f64>, StrataError> {
        let layers = oriented_layers(graph, vertical, horizontal);
        let mut position = vec![0usize; graph.node_count()];
        for layer in &layers {
            for (slot, &id) in layer.iter().enumerate() {
                position[id.index()] = slot;
            }
        }

        let blocks = align(graph, &layers, &position, conflicts, vertical);
        let mut centers = self.compact(graph, &layers, &blocks)?;
        if horizontal == Horizontal::BottomFirst {
            for center in &mut centers {
                *center = -*center;
            }
        }
        Ok(centers)
    }

    /// Places every block at the longest path from the sources of the block
    /// graph. Consecutive nodes of a layer are separated by their half heights
    /// plus the spacing, measured between centers.
    fn compact(
        &self,
        graph: &LayeredGraph,
        layers: &[Vec<NodeId>],
        blocks: &Blocks,
    ) -> Result<Vec<f64>, StrataError> {
        let count = graph.node_count();
        let mut successors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); count];
        let mut in_degree = vec![0usize; count];
        for layer in layers {
            for pair in layer.windows(2) {
                let (upper, lower) = (pair[0], pair[1]);
                let separation = graph.node(upper).size().height() / 2.0
                    + self.spacing
                    + graph.node(lower).size().height() / 2.0;
                let from = blocks.root[upper.index()];
                let to = blocks.root[lower.index()];
                successors[from].push((to, separation));
                in_degree[to] += 1;
            }
        }

        let mut block_center = vec![0.0; count];
        let mut ready: Vec<usize> = (0..count)
            .filter(|&index| blocks.root[index] == index && in_degree[index] == 0)
            .collect();
        let mut placed = 0;
        while let Some(block) = ready.pop() {
            placed += 1;
            for &(next, separation) in &successors[block] {
                block_center[next] =
                    f64::max(block_center[next], block_center[block] + separation);
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(next);
                }
            }
        }

        let block_count = (0..count).filter(|&index| blocks.root[index] == index).count();
        if placed != block_count {
            return Err(StrataError::consistency(
                Self::stage(),
                "vertical alignment produced crossing blocks",
            ));
        }

        Ok((0..count)
            .map(|index| block_center[blocks.root[index]])
            .collect())
    }
}

impl NodePlacer for Placer {
    fn strategy(&self) -> NodePlacementStrategy {
        NodePlacementStrategy::BrandesKoepf
    }

    fn place(
        &self,
        graph: &LayeredGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<Vec<f64>>, StrataError> {
        let conflicts = Conflicts::mark(graph);
        debug!(type1_conflicts = conflicts.len(); "Marked alignment conflicts");

        let mut results = Vec::with_capacity(SWEEPS.len());
        for (done, &(vertical, horizontal)) in SWEEPS.iter().enumerate() {
            if monitor.is_cancelled() {
                return Ok(Step::Cancelled);
            }
            let centers = self.sweep(graph, &conflicts, vertical, horizontal)?;
            trace!(vertical:?, horizontal:?; "Brandes-Koepf sweep compacted");
            results.push((horizontal, centers));
            monitor.report_progress((done + 1) as f64 / (SWEEPS.len() + 1) as f64);
        }

        Ok(Step::Done(balance(graph, results)))
    }
}

/// Aligns the four results to the one with the smallest extent and averages
/// them per node. Returns top coordinates.
fn balance(graph: &LayeredGraph, mut results: Vec<(Horizontal, Vec<f64>)>) -> Vec<f64> {
    let extent = |centers: &[f64]| -> (f64, f64) {
        graph
            .nodes()
            .map(|(id, node)| {
                let half = node.size().height() / 2.0;
                (centers[id.index()] - half, centers[id.index()] + half)
            })
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), (top, bottom)| {
                (low.min(top), high.max(bottom))
            })
    };
    let min_max = |centers: &[f64]| -> (f64, f64) {
        centers
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &center| {
                (low.min(center), high.max(center))
            })
    };

    let Some(narrowest) = results
        .iter()
        .map(|(_, centers)| {
            let (top, bottom) = extent(centers);
            bottom - top
        })
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
    else {
        return Vec::new();
    };
    let (target_min, target_max) = min_max(&results[narrowest].1);

    for (horizontal, centers) in &mut results {
        let (min, max) = min_max(centers);
        let delta = match horizontal {
            Horizontal::TopFirst => target_min - min,
            Horizontal::BottomFirst => target_max - max,
        };
        if delta.is_finite() {
            for center in centers.iter_mut() {
                *center += delta;
            }
        }
    }

    let sweeps = results.len() as f64;
    graph
        .nodes()
        .map(|(id, node)| {
            let sum: f64 = results.iter().map(|(_, centers)| centers[id.index()]).sum();
            sum / sweeps - node.size().height() / 2.0
        })
        .collect()
}

/// Layers in sweep order, each in in-layer traversal order.
fn oriented_layers(
    graph: &LayeredGraph,
    vertical: Vertical,
    horizontal: Horizontal,
) -> Vec<Vec<NodeId>> {
    let mut layers: Vec<Vec<NodeId>> = graph
        .layers()
        .map(|layer| match horizontal {
            Horizontal::TopFirst => layer.to_vec(),
            Horizontal::BottomFirst => layer.iter().rev().copied().collect(),
        })
        .collect();
    if vertical == Vertical::Up {
        layers.reverse();
    }
    layers
}

/// Edges excluded from alignment, stored as unordered node pairs.
#[derive(Debug, Default)]
struct Conflicts {
    marked: HashSet<(NodeId, NodeId)>,
}

impl Conflicts {
    /// Marks type-1 conflicts: edges that are not inner segments and cross an
    /// inner segment. An inner segment connects two dummies.
    fn mark(graph: &LayeredGraph) -> Self {
        let mut conflicts = Self::default();
        for layer_index in 1..graph.layer_count() {
            let upper_len = graph.layer(layer_index - 1).len();
            let layer = graph.layer(layer_index);
            let mut k0 = 0;
            let mut scan = 0;
            for (slot, &id) in layer.iter().enumerate() {
                let inner = inner_segment_source(graph, id);
                if inner.is_none() && slot + 1 != layer.len() {
                    continue;
                }
                let k1 = inner.map_or(upper_len.saturating_sub(1), |upper| {
                    graph.node(upper).index()
                });
                for &lower in &layer[scan..=slot] {
                    for upper in graph.upper_neighbors(lower) {
                        let position = graph.node(upper).index();
                        let both_dummies =
                            graph.node(upper).is_dummy() && graph.node(lower).is_dummy();
                        if (position < k0 || position > k1) && !both_dummies {
                            conflicts.marked.insert(Self::key(upper, lower));
                        }
                    }
                }
                scan = slot + 1;
                k0 = k1;
            }
        }
        conflicts
    }

    fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a < b { (a, b) } else { (b, a) }
    }

    fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.marked.contains(&Self::key(a, b))
    }

    fn len(&self) -> usize {
        self.marked.len()
    }
}

/// Returns the upper end of the inner segment ending at `id`, if any.
fn inner_segment_source(graph: &LayeredGraph, id: NodeId) -> Option<NodeId> {
    if !graph.node(id).is_dummy() {
        return None;
    }
    graph
        .upper_neighbors(id)
        .find(|&upper| graph.node(upper).is_dummy())
}

/// Vertical alignment of one sweep. Every node points at the root (first
/// node in sweep order) of its block.
#[derive(Debug)]
struct Blocks {
    root: Vec<usize>,
}

fn align(
    graph: &LayeredGraph,
    layers: &[Vec<NodeId>],
    position: &[usize],
    conflicts: &Conflicts,
    vertical: Vertical,
) -> Blocks {
    let count = graph.node_count();
    let mut root: Vec<usize> = (0..count).collect();
    let mut align: Vec<usize> = (0..count).collect();

    for layer in layers.iter().skip(1) {
        let mut last_aligned: Option<usize> = None;
        for &v in layer {
            let mut neighbors: Vec<NodeId> = match vertical {
                Vertical::Down => graph.upper_neighbors(v).collect(),
                Vertical::Up => graph.lower_neighbors(v).collect(),
            };
            if neighbors.is_empty() {
                continue;
            }
            neighbors.sort_by_key(|w| position[w.index()]);
            neighbors.dedup();

            let degree = neighbors.len();
            let medians = [(degree - 1) / 2, degree / 2];
            for (nth, &median) in medians.iter().enumerate() {
                if nth == 1 && median == medians[0] {
                    break;
                }
                if align[v.index()] != v.index() {
                    break;
                }
                let w = neighbors[median];
                let w_position = position[w.index()];
                if conflicts.contains(v, w)
                    || last_aligned.is_some_and(|last| last >= w_position)
                {
                    continue;
                }
                align[w.index()] = v.index();
                root[v.index()] = root[w.index()];
                align[v.index()] = root[v.index()];
                last_aligned = Some(w_position);
            }
        }
    }

    Blocks { root }
}
