//! Compaction along the layer axis.
//!
//! Compaction runs after node placement. It never touches y coordinates: it
//! builds a [`ConstraintGraph`] from the placed nodes and slides rigid groups
//! of nodes left or right while keeping every pair that would collide at
//! least `spacing` apart.
//!
//! ```text
//!   LayeredGraph ──build──▶ ConstraintGraph ──passes──▶ group positions
//!        ▲                                                    │
//!        └──────────────── commit x (all at once) ────────────┘
//! ```

mod compactor;
mod constraint_graph;

use log::info;

pub use self::constraint_graph::{CGroup, CNode, CompactionLock, ConstraintGraph};
use self::compactor::Compactor;
use crate::{
    config::{CompactionConfig, GraphCompactionStrategy},
    error::{Stage, StrataError},
    progress::{Outcome, ProgressMonitor, Step},
    structure::LayeredGraph,
};

/// Runs a [`GraphCompactionStrategy`] over a layered graph.
///
/// # Examples
///
/// ```
/// use strata::{
///     config::{CompactionConfig, GraphCompactionStrategy},
///     layout::compaction::GraphCompactor,
///     progress::NullMonitor,
///     structure::{LNode, LayeredGraph},
/// };
/// use strata_core::geometry::{Point, Size};
///
/// let mut graph = LayeredGraph::new();
/// graph.add_node(0, LNode::new("a", Size::new(10.0, 10.0)));
/// let b = graph.add_node(
///     1,
///     LNode::new("b", Size::new(10.0, 10.0)).with_position(Point::new(90.0, 0.0)),
/// );
///
/// let config = CompactionConfig::default()
///     .with_strategy(GraphCompactionStrategy::Left)
///     .with_spacing(5.0);
/// GraphCompactor::new(&config).run(&mut graph, &NullMonitor).unwrap();
///
/// assert_eq!(graph.node(b).position().x(), 15.0);
/// ```
#[derive(Debug, Clone)]
pub struct GraphCompactor {
    strategy: GraphCompactionStrategy,
    spacing: f64,
    max_iterations: usize,
    convergence_threshold: f64,
}

impl GraphCompactor {
    pub fn new(config: &CompactionConfig) -> Self {
        Self {
            strategy: config.strategy(),
            spacing: config.spacing(),
            max_iterations: config.max_iterations(),
            convergence_threshold: config.convergence_threshold(),
        }
    }

    pub fn strategy(&self) -> GraphCompactionStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: GraphCompactionStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Compacts `graph` along x.
    ///
    /// On [`Outcome::Cancelled`] and on every error the graph keeps its
    /// previous positions.
    ///
    /// # Errors
    ///
    /// - [`StrataError::Precondition`] if the graph breaks its structural
    ///   invariants.
    /// - [`StrataError::Consistency`] if the separation constraints form a
    ///   cycle, or a locked group would have to move.
    pub fn run(
        &self,
        graph: &mut LayeredGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Outcome, StrataError> {
        let strategy = self.strategy;
        if strategy == GraphCompactionStrategy::None {
            return Ok(Outcome::Completed);
        }
        graph.validate()?;

        info!(strategy:%, nodes = graph.node_count(); "Compacting graph");
        let stage = Stage::Compaction(strategy);
        let mut constraints = ConstraintGraph::build(graph, self.spacing, stage)?;

        if let Step::Cancelled = self.apply(&mut constraints, stage, monitor)? {
            info!(strategy:%; "Compaction cancelled");
            return Ok(Outcome::Cancelled);
        }

        graph.commit_x_coordinates(&constraints.x_coordinates());
        monitor.report_progress(1.0);
        info!(strategy:%, width = constraints.trailing_edge(); "Compaction committed");
        Ok(Outcome::Completed)
    }

    fn apply(
        &self,
        constraints: &mut ConstraintGraph,
        stage: Stage,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<()>, StrataError> {
        let mut compactor = Compactor::new(constraints, stage);
        let cancelled = || monitor.is_cancelled();

        match self.strategy {
            GraphCompactionStrategy::None => {}
            GraphCompactionStrategy::Left => {
                if cancelled() {
                    return Ok(Step::Cancelled);
                }
                compactor.compact_left()?;
            }
            GraphCompactionStrategy::Right => {
                if cancelled() {
                    return Ok(Step::Cancelled);
                }
                compactor.compact_right()?;
            }
            GraphCompactionStrategy::LeftRightConstraintLocking
            | GraphCompactionStrategy::LeftRightConnectionLocking => {
                if cancelled() {
                    return Ok(Step::Cancelled);
                }
                compactor.compact_left()?;
                if self.strategy == GraphCompactionStrategy::LeftRightConstraintLocking {
                    compactor.lock_constrained();
                } else {
                    compactor.lock_by_connections();
                }
                if cancelled() {
                    return Ok(Step::Cancelled);
                }
                compactor.compact_right()?;
            }
            GraphCompactionStrategy::EdgeLength => {
                if cancelled() {
                    return Ok(Step::Cancelled);
                }
                compactor.compact_left()?;
                return compactor.minimize_edge_length(
                    self.max_iterations,
                    self.convergence_threshold,
                    monitor,
                );
            }
        }
        Ok(Step::Done(()))
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;
    use strata_core::geometry::{Point, Size};

    use super::*;
    use crate::{
        layout::placement::TOLERANCE,
        progress::{NullMonitor, testing::CancelAfter},
        structure::{Handle, LNode, NodeId},
    };

    fn compactor(strategy: GraphCompactionStrategy, spacing: f64) -> GraphCompactor {
        GraphCompactor::new(
            &CompactionConfig::default()
                .with_strategy(strategy)
                .with_spacing(spacing),
        )
    }

    fn boxed(label: &str, x: f64, y: f64) -> LNode {
        LNode::new(label, Size::new(10.0, 10.0)).with_position(Point::new(x, y))
    }

    fn x(graph: &LayeredGraph, id: NodeId) -> f64 {
        graph.node(id).position().x()
    }

    /// The placed fan-in: L0 = [A, B], L1 = [C], A->C, B->C.
    fn placed_fan_in() -> (LayeredGraph, [NodeId; 3]) {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, boxed("A", 0.0, 0.0));
        let b = graph.add_node(0, boxed("B", 0.0, 15.0));
        let c = graph.add_node(1, boxed("C", 50.0, 7.5));
        graph.add_edge(a, c);
        graph.add_edge(b, c);
        (graph, [a, b, c])
    }

    #[test]
    fn test_none_is_identity() {
        let (mut graph, _) = placed_fan_in();
        let before = graph.clone();

        let outcome = compactor(GraphCompactionStrategy::None, 5.0)
            .run(&mut graph, &NullMonitor)
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        for (id, node) in before.nodes() {
            assert_eq!(graph.node(id).position(), node.position());
        }
    }

    #[test]
    fn test_left_stops_at_right_edge_plus_spacing() {
        let (mut graph, [a, b, c]) = placed_fan_in();

        compactor(GraphCompactionStrategy::Left, 5.0)
            .run(&mut graph, &NullMonitor)
            .unwrap();

        assert_approx_eq!(f64, x(&graph, a), 0.0);
        assert_approx_eq!(f64, x(&graph, b), 0.0);
        assert_approx_eq!(f64, x(&graph, c), 15.0);
        assert_eq!(graph.y_coordinates(), vec![0.0, 15.0, 7.5]);
    }

    #[test]
    fn test_right_moves_toward_trailing_edge() {
        let (mut graph, [a, b, c]) = placed_fan_in();

        compactor(GraphCompactionStrategy::Right, 5.0)
            .run(&mut graph, &NullMonitor)
            .unwrap();

        assert_approx_eq!(f64, x(&graph, a), 35.0);
        assert_approx_eq!(f64, x(&graph, b), 35.0);
        assert_approx_eq!(f64, x(&graph, c), 50.0);
    }

    fn constraint_locking_graph() -> (LayeredGraph, [NodeId; 4]) {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, boxed("A", 0.0, 0.0));
        let b = graph.add_node(1, boxed("B", 60.0, 0.0).constrained());
        let c = graph.add_node(2, boxed("C", 120.0, 100.0));
        let d = graph.add_node(3, boxed("D", 200.0, 0.0));
        graph.add_edge(a, b);
        graph.add_edge(b, d);
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_constraint_locking_keeps_constrained_nodes() {
        let (mut graph, [a, b, c, d]) = constraint_locking_graph();

        compactor(GraphCompactionStrategy::LeftRightConstraintLocking, 10.0)
            .run(&mut graph, &NullMonitor)
            .unwrap();

        assert_approx_eq!(f64, x(&graph, a), 0.0);
        assert_approx_eq!(f64, x(&graph, b), 20.0);
        assert_approx_eq!(f64, x(&graph, c), 40.0);
        assert_approx_eq!(f64, x(&graph, d), 40.0);
    }

    #[test]
    fn test_constraint_locking_is_idempotent() {
        let (mut graph, _) = constraint_locking_graph();
        let compactor = compactor(GraphCompactionStrategy::LeftRightConstraintLocking, 10.0);

        compactor.run(&mut graph, &NullMonitor).unwrap();
        let once: Vec<Point> = graph.nodes().map(|(_, node)| node.position()).collect();
        compactor.run(&mut graph, &NullMonitor).unwrap();
        let twice: Vec<Point> = graph.nodes().map(|(_, node)| node.position()).collect();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_connection_locking_holds_nodes_with_left_connections() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, boxed("A", 0.0, 0.0));
        let b = graph.add_node(1, boxed("B", 30.0, 0.0));
        let free = graph.add_node(2, boxed("F", 60.0, 300.0));
        graph.add_node(
            3,
            LNode::new("E", Size::new(100.0, 10.0)).with_position(Point::new(90.0, 200.0)),
        );
        graph.add_edge(a, b);

        compactor(GraphCompactionStrategy::LeftRightConnectionLocking, 10.0)
            .run(&mut graph, &NullMonitor)
            .unwrap();

        assert_approx_eq!(f64, x(&graph, a), 0.0);
        assert_approx_eq!(f64, x(&graph, b), 20.0);
        assert_approx_eq!(f64, x(&graph, free), 90.0);
    }

    #[test]
    fn test_edge_length_pulls_connected_nodes_together() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, boxed("A", 0.0, 0.0));
        let b = graph.add_node(1, boxed("B", 40.0, 0.0));
        let c = graph.add_node(2, boxed("C", 80.0, 100.0));
        graph.add_edge(b, c);

        let mut left = graph.clone();
        compactor(GraphCompactionStrategy::Left, 10.0)
            .run(&mut left, &NullMonitor)
            .unwrap();
        compactor(GraphCompactionStrategy::EdgeLength, 10.0)
            .run(&mut graph, &NullMonitor)
            .unwrap();

        assert_approx_eq!(f64, x(&left, c), 0.0);
        assert_approx_eq!(f64, x(&graph, a), 0.0);
        assert_approx_eq!(f64, x(&graph, b), 20.0);
        assert_approx_eq!(f64, x(&graph, c), 20.0);
    }

    #[test]
    fn test_overlapping_locked_nodes_are_consistency_error() {
        let mut graph = LayeredGraph::new();
        graph.add_node(0, boxed("A", 0.0, 0.0).pinned());
        graph.add_node(1, boxed("B", 5.0, 0.0).pinned());
        let before = graph.clone();

        let err = compactor(GraphCompactionStrategy::Left, 10.0)
            .run(&mut graph, &NullMonitor)
            .unwrap_err();

        assert!(matches!(
            err,
            StrataError::Consistency {
                stage: Stage::Compaction(GraphCompactionStrategy::Left),
                ..
            }
        ));
        for (id, node) in before.nodes() {
            assert_eq!(graph.node(id).position(), node.position());
        }
    }

    #[test]
    fn test_cancelled_compaction_keeps_positions() {
        let (mut graph, [_, _, c]) = placed_fan_in();

        for strategy in [
            GraphCompactionStrategy::Left,
            GraphCompactionStrategy::LeftRightConnectionLocking,
            GraphCompactionStrategy::EdgeLength,
        ] {
            let outcome = compactor(strategy, 5.0)
                .run(&mut graph, &CancelAfter::new(0))
                .unwrap();
            assert_eq!(outcome, Outcome::Cancelled);
            assert_approx_eq!(f64, x(&graph, c), 50.0);
        }
    }

    #[test]
    fn test_right_on_overlapping_layers_stays_non_negative() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, boxed("A", 0.0, 0.0));
        let b = graph.add_node(1, boxed("B", 0.0, 0.0));

        let mut left = graph.clone();
        compactor(GraphCompactionStrategy::Left, 5.0)
            .run(&mut left, &NullMonitor)
            .unwrap();
        compactor(GraphCompactionStrategy::Right, 5.0)
            .run(&mut graph, &NullMonitor)
            .unwrap();

        assert_approx_eq!(f64, x(&left, a), 0.0);
        assert_approx_eq!(f64, x(&left, b), 15.0);
        assert_approx_eq!(f64, x(&graph, a), 0.0);
        assert_approx_eq!(f64, x(&graph, b), 15.0);
    }

    /// Random placed graph: per layer a column of nodes with random gaps and
    /// heights, some constrained, plus edges toward later layers. Layers are
    /// either spread along x or all stacked at x = 0.
    fn placed_graph() -> impl Strategy<Value = LayeredGraph> {
        let layers = prop::collection::vec(
            prop::collection::vec(
                (0.0f64..200.0, 1.0f64..30.0, prop::bool::weighted(0.2)),
                1..4,
            ),
            1..5,
        );
        let edges = prop::collection::vec((0usize..64, 0usize..64), 0..8);
        (layers, edges, any::<bool>()).prop_map(|(layers, edges, spread)| {
            let mut graph = LayeredGraph::new();
            for (layer, nodes) in layers.iter().enumerate() {
                let mut y = 0.0;
                for (slot, &(gap, height, constrained)) in nodes.iter().enumerate() {
                    y += gap;
                    let mut node = LNode::new(
                        format!("n{layer}_{slot}").as_str(),
                        Size::new(10.0 + height, height),
                    )
                    .with_position(Point::new(0.0, y));
                    if constrained {
                        node = node.constrained();
                    }
                    graph.add_node(layer, node);
                    y += height + 5.0;
                }
            }
            if spread {
                graph.assign_layer_positions(40.0);
            }

            let ids: Vec<NodeId> = graph.nodes().map(|(id, _)| id).collect();
            for (source, target) in edges {
                let source = ids[source % ids.len()];
                let target = ids[target % ids.len()];
                if graph.node(source).layer() < graph.node(target).layer() {
                    graph.add_edge(source, target);
                }
            }
            graph
        })
    }

    /// Nodes of different layers that overlap vertically keep `spacing`
    /// between them along x, and nothing lies left of x = 0.
    fn check_clearance(graph: &LayeredGraph, spacing: f64) -> Result<(), TestCaseError> {
        for (a, node_a) in graph.nodes() {
            prop_assert!(node_a.position().x() >= -TOLERANCE);
            for (b, node_b) in graph.nodes() {
                if a.index() >= b.index()
                    || node_a.layer() == node_b.layer()
                    || !node_a.bounds().overlaps_vertically(&node_b.bounds(), spacing)
                {
                    continue;
                }
                let (left, right) = if node_a.layer() < node_b.layer() {
                    (node_a, node_b)
                } else {
                    (node_b, node_a)
                };
                prop_assert!(
                    left.position().x() + left.size().width() + spacing
                        <= right.position().x() + TOLERANCE
                );
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_compaction_keeps_clearance(graph in placed_graph()) {
            let spacing = 8.0;
            for strategy in [
                GraphCompactionStrategy::Left,
                GraphCompactionStrategy::Right,
                GraphCompactionStrategy::LeftRightConnectionLocking,
                GraphCompactionStrategy::EdgeLength,
            ] {
                let mut compacted = graph.clone();
                let outcome = compactor(strategy, spacing)
                    .run(&mut compacted, &NullMonitor)
                    .unwrap();
                prop_assert_eq!(outcome, Outcome::Completed);
                check_clearance(&compacted, spacing)?;
            }
        }

        #[test]
        fn prop_constraint_locking_is_idempotent(graph in placed_graph()) {
            let compactor = compactor(GraphCompactionStrategy::LeftRightConstraintLocking, 8.0);
            let mut once = graph.clone();
            compactor.run(&mut once, &NullMonitor).unwrap();
            let mut twice = once.clone();
            compactor.run(&mut twice, &NullMonitor).unwrap();

            for (id, node) in once.nodes() {
                let again = twice.node(id).position();
                prop_assert!((node.position().x() - again.x()).abs() <= TOLERANCE);
                prop_assert_eq!(node.position().y(), again.y());
            }
        }
    }
}
