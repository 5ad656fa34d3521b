//! Network simplex node placement.
//!
//! Straightness is phrased as a linear program over an auxiliary constraint
//! graph. Every node is a variable. Every edge `(u, v)` gets an extra variable
//! `n` sitting no lower than both centers, with constraints `n -> u` and
//! `n -> v`; minimizing `(y_u − n) + (y_v − n)` then minimizes the center
//! distance of `u` and `v`. Consecutive layer mates are kept apart by zero
//! weight constraints of length `height + spacing`.

mod solver;

use log::debug;

use self::solver::Problem;
use crate::{
    config::NodePlacementStrategy,
    error::{Stage, StrataError},
    layout::placement::NodePlacer,
    progress::{ProgressMonitor, Step},
    structure::{Handle, LayeredGraph, NodeKind},
};

/// Optimal placer for the sum of weighted center distances along edges.
pub struct Placer {
    spacing: f64,
    max_iterations: usize,
}

impl Placer {
    pub fn new(spacing: f64) -> Self {
        Self {
            spacing,
            max_iterations: 10_000,
        }
    }

    /// Caps the number of simplex pivots per connected component.
    pub fn set_max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }

    fn build_problem(&self, graph: &LayeredGraph) -> Problem {
        let node_count = graph.node_count();
        let straightening: Vec<_> = graph
            .edges()
            .filter(|(_, edge)| !edge.is_self_loop())
            .collect();

        let mut problem = Problem::new(node_count + straightening.len());
        for (slot, (_, edge)) in straightening.iter().enumerate() {
            let aux = node_count + slot;
            let source = graph.node(edge.source());
            let target = graph.node(edge.target());
            let weight = priority(source.kind(), target.kind()) * f64::from(edge.weight());
            problem.add(
                aux,
                edge.source().index(),
                -source.size().height() / 2.0,
                weight,
            );
            problem.add(
                aux,
                edge.target().index(),
                -target.size().height() / 2.0,
                weight,
            );
        }

        for layer in graph.layers() {
            for pair in layer.windows(2) {
                let upper = graph.node(pair[0]);
                problem.add(
                    pair[0].index(),
                    pair[1].index(),
                    upper.size().height() + self.spacing,
                    0.0,
                );
            }
        }
        problem
    }
}

/// Weight factor favoring straight long edges.
pub(super) fn priority(source: NodeKind, target: NodeKind) -> f64 {
    match (source, target) {
        (NodeKind::Normal, NodeKind::Normal) => 1.0,
        (NodeKind::Dummy, NodeKind::Dummy) => 8.0,
        (NodeKind::Normal, NodeKind::Dummy) | (NodeKind::Dummy, NodeKind::Normal) => 2.0,
    }
}

impl NodePlacer for Placer {
    fn strategy(&self) -> NodePlacementStrategy {
        NodePlacementStrategy::NetworkSimplex
    }

    fn place(
        &self,
        graph: &LayeredGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<Vec<f64>>, StrataError> {
        let problem = self.build_problem(graph);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count();
            "Solving network simplex placement"
        );

        let stage = Stage::NodePlacement(self.strategy());
        let node_count = graph.node_count();
        Ok(problem
            .solve(self.max_iterations, stage, monitor)?
            .map(|mut ranks| {
                ranks.truncate(node_count);
                ranks
            }))
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use strata_core::geometry::Size;

    use super::*;
    use crate::{
        layout::placement::{
            TOLERANCE,
            testing::{fan_in, square},
            verify_contract,
        },
        progress::NullMonitor,
        structure::{LNode, NodeId},
    };

    fn place(graph: &LayeredGraph, spacing: f64) -> Vec<f64> {
        match Placer::new(spacing).place(graph, &NullMonitor).unwrap() {
            Step::Done(ys) => ys,
            Step::Cancelled => panic!("not cancelled"),
        }
    }

    /// Sum of weighted center distances along every edge.
    fn straightness(graph: &LayeredGraph, ys: &[f64]) -> f64 {
        graph
            .edges()
            .map(|(_, edge)| {
                let center = |id: NodeId| {
                    ys[id.index()] + graph.node(id).size().height() / 2.0
                };
                f64::from(edge.weight()) * (center(edge.source()) - center(edge.target())).abs()
            })
            .sum()
    }

    #[test]
    fn test_chain_centers_align() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, square("A"));
        let b = graph.add_node(1, LNode::new("B", Size::new(10.0, 30.0)));
        graph.add_edge(a, b);

        let ys = place(&graph, 5.0);

        assert_approx_eq!(f64, ys[a.index()], 10.0, epsilon = TOLERANCE);
        assert_approx_eq!(f64, ys[b.index()], 0.0, epsilon = TOLERANCE);
    }

    #[test]
    fn test_fan_in_target_between_sources() {
        let (graph, [a, b, c]) = fan_in();

        let ys = place(&graph, 5.0);

        assert!(verify_contract(&graph, &ys, 5.0).is_ok());
        assert_approx_eq!(f64, ys[b.index()] - ys[a.index()], 15.0, epsilon = TOLERANCE);
        assert!(ys[c.index()] >= ys[a.index()] - TOLERANCE);
        assert!(ys[c.index()] <= ys[b.index()] + TOLERANCE);
        assert_approx_eq!(f64, straightness(&graph, &ys), 15.0, epsilon = TOLERANCE);
    }

    #[test]
    fn test_no_single_shift_improves_straightness() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, square("A"));
        let b = graph.add_node(0, LNode::new("B", Size::new(10.0, 25.0)));
        let c = graph.add_node(1, square("C"));
        let d = graph.add_node(1, square("D"));
        let e = graph.add_node(2, square("E"));
        graph.add_weighted_edge(a, d, 3);
        graph.add_edge(b, c);
        graph.add_edge(c, e);
        graph.add_edge(d, e);

        let spacing = 5.0;
        let ys = place(&graph, spacing);
        assert!(verify_contract(&graph, &ys, spacing).is_ok());

        let best = straightness(&graph, &ys);
        for id in [a, b, c, d, e] {
            for delta in [-4.0, -1.0, 1.0, 4.0] {
                let mut moved = ys.clone();
                moved[id.index()] += delta;
                if verify_contract(&graph, &moved, spacing).is_ok() {
                    assert!(straightness(&graph, &moved) >= best - TOLERANCE);
                }
            }
        }
    }

    #[test]
    fn test_dummy_chains_weigh_more() {
        assert_eq!(priority(NodeKind::Normal, NodeKind::Normal), 1.0);
        assert_eq!(priority(NodeKind::Dummy, NodeKind::Normal), 2.0);
        assert_eq!(priority(NodeKind::Dummy, NodeKind::Dummy), 8.0);
    }

    #[test]
    fn test_self_loops_are_ignored() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, square("A"));
        graph.add_edge(a, a);

        assert_eq!(place(&graph, 5.0), vec![0.0]);
    }
}
