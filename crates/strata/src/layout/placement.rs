//! Node placement: assigns every node of a [`LayeredGraph`] its y coordinate.
//!
//! Every strategy implements [`NodePlacer`] and honors the same contract:
//! nodes of a layer keep their order with at least `node_spacing` between
//! them, coordinates are finite and non-negative, and pinned nodes keep their
//! coordinate. Strategies compute into a scratch vector; the
//! [`NodePlacementPhase`] normalizes it, applies pins, verifies the contract
//! and only then commits it to the graph.

mod brandes_koepf;
mod interactive;
mod linear_segments;
mod network_simplex;
mod simple;

use indexmap::IndexMap;
use log::{debug, info};

use crate::{
    config::{NodePlacementStrategy, PlacementConfig},
    error::{Stage, StrataError},
    progress::{Outcome, ProgressMonitor, Step},
    structure::{Handle, LayeredGraph, NodeId},
};

/// Slack allowed when checking the placement contract.
pub(crate) const TOLERANCE: f64 = 1e-6;

/// Interface shared by every node placement strategy.
pub trait NodePlacer: Send + Sync {
    /// The strategy this placer implements.
    fn strategy(&self) -> NodePlacementStrategy;

    /// Computes a top y coordinate for every node, indexed by [`NodeId`].
    ///
    /// The graph is only read. Implementations poll `monitor` between bounded
    /// units of work and return [`Step::Cancelled`] as soon as it asks to stop.
    ///
    /// # Errors
    /// Returns [`StrataError::Consistency`] if the strategy reaches a state its
    /// algorithm rules out.
    fn place(
        &self,
        graph: &LayeredGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<Vec<f64>>, StrataError>;
}

/// Lookup table from [`NodePlacementStrategy`] to a configured placer.
///
/// Built once from a [`PlacementConfig`]; the set of strategies is fixed for
/// the registry's lifetime.
pub struct PlacerRegistry {
    placers: IndexMap<NodePlacementStrategy, Box<dyn NodePlacer>>,
}

impl PlacerRegistry {
    /// Builds one placer per strategy, configured from `config`.
    pub fn new(config: &PlacementConfig) -> Self {
        let placers = NodePlacementStrategy::ALL
            .into_iter()
            .map(|strategy| (strategy, Self::build(strategy, config)))
            .collect();
        Self { placers }
    }

    fn build(strategy: NodePlacementStrategy, config: &PlacementConfig) -> Box<dyn NodePlacer> {
        let spacing = config.node_spacing();
        match strategy {
            NodePlacementStrategy::Simple => Box::new(simple::Placer::new(spacing)),
            NodePlacementStrategy::Interactive => Box::new(interactive::Placer::new()),
            NodePlacementStrategy::LinearSegments => {
                let mut placer = linear_segments::Placer::new(spacing);
                let settings = config.linear_segments();
                placer
                    .set_max_iterations(settings.max_iterations())
                    .set_convergence_threshold(settings.convergence_threshold())
                    .set_deflection_damping(settings.deflection_damping());
                Box::new(placer)
            }
            NodePlacementStrategy::BrandesKoepf => Box::new(brandes_koepf::Placer::new(spacing)),
            NodePlacementStrategy::NetworkSimplex => {
                let mut placer = network_simplex::Placer::new(spacing);
                placer.set_max_iterations(config.network_simplex().max_iterations());
                Box::new(placer)
            }
        }
    }

    /// Returns the placer registered for `strategy`.
    ///
    /// # Errors
    /// Returns [`StrataError::Config`] if no placer is registered for it.
    pub fn resolve(&self, strategy: NodePlacementStrategy) -> Result<&dyn NodePlacer, StrataError> {
        self.placers
            .get(&strategy)
            .map(|placer| &**placer)
            .ok_or_else(|| {
                StrataError::Config(format!("No placer registered for strategy `{strategy}`"))
            })
    }

    /// Returns the registered strategies in registration order.
    pub fn strategies(&self) -> impl Iterator<Item = NodePlacementStrategy> + '_ {
        self.placers.keys().copied()
    }
}

/// Runs a node placement strategy over a graph and commits its result.
pub struct NodePlacementPhase {
    registry: PlacerRegistry,
    node_spacing: f64,
}

impl NodePlacementPhase {
    pub fn new(config: &PlacementConfig) -> Self {
        Self {
            registry: PlacerRegistry::new(config),
            node_spacing: config.node_spacing(),
        }
    }

    pub fn registry(&self) -> &PlacerRegistry {
        &self.registry
    }

    /// Places every node of `graph` with the given strategy.
    ///
    /// On [`Outcome::Cancelled`] and on every error the graph is left exactly
    /// as it was.
    ///
    /// # Errors
    ///
    /// - [`StrataError::Precondition`] if the graph breaks its structural
    ///   invariants, if pinned nodes cannot all keep their coordinate, or if
    ///   the coordinates kept by the interactive strategy break the contract.
    /// - [`StrataError::Config`] if the strategy is not registered.
    /// - [`StrataError::Consistency`] if a strategy produced coordinates that
    ///   break the contract.
    pub fn run(
        &self,
        graph: &mut LayeredGraph,
        strategy: NodePlacementStrategy,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Outcome, StrataError> {
        graph.validate()?;
        let placer = self.registry.resolve(strategy)?;
        let stage = Stage::NodePlacement(strategy);

        info!(strategy:%, nodes = graph.node_count(), layers = graph.layer_count(); "Placing nodes");

        let mut ys = match placer.place(graph, monitor)? {
            Step::Done(ys) => ys,
            Step::Cancelled => {
                info!(strategy:%; "Node placement cancelled");
                return Ok(Outcome::Cancelled);
            }
        };
        if ys.len() != graph.node_count() {
            return Err(StrataError::consistency(
                stage,
                format!(
                    "produced {} coordinates for {} nodes",
                    ys.len(),
                    graph.node_count()
                ),
            ));
        }

        if strategy != NodePlacementStrategy::Interactive {
            normalize(&mut ys);
            apply_pins(graph, &mut ys, self.node_spacing, stage)?;
        }

        if let Err(message) = verify_contract(graph, &ys, self.node_spacing) {
            return Err(if strategy == NodePlacementStrategy::Interactive {
                StrataError::precondition(stage, message)
            } else {
                StrataError::consistency(stage, message)
            });
        }

        graph.commit_y_coordinates(&ys);
        monitor.report_progress(1.0);
        debug!(strategy:%, height = extent(graph, &ys); "Node placement committed");

        Ok(Outcome::Completed)
    }
}

/// Shifts all coordinates so the smallest is zero.
fn normalize(ys: &mut [f64]) {
    let min = ys.iter().copied().fold(f64::INFINITY, f64::min);
    if min.is_finite() && min != 0.0 {
        for y in ys.iter_mut() {
            *y -= min;
        }
    }
}

/// Restores pinned coordinates and clamps every other node into the room its
/// pinned layer mates leave it.
///
/// Each layer is swept twice: bottom-up to find how low every node may sit
/// without pushing a pinned node below it, then top-down to place nodes at or
/// below the previous node's bottom plus spacing.
fn apply_pins(
    graph: &LayeredGraph,
    ys: &mut [f64],
    spacing: f64,
    stage: Stage,
) -> Result<(), StrataError> {
    if !graph.nodes().any(|(_, node)| node.is_pinned()) {
        return Ok(());
    }

    for layer in graph.layers() {
        let mut caps = vec![f64::INFINITY; layer.len()];
        let mut cap = f64::INFINITY;
        for (slot, &id) in layer.iter().enumerate().rev() {
            let node = graph.node(id);
            if node.is_pinned() {
                let pinned_y = node.position().y();
                if pinned_y > cap + TOLERANCE {
                    return Err(pin_conflict(graph, id, stage));
                }
                cap = pinned_y;
            }
            caps[slot] = cap;
            if let Some(above) = graph.above(id) {
                cap -= spacing + graph.node(above).size().height();
            }
        }

        let mut floor = 0.0;
        for (slot, &id) in layer.iter().enumerate() {
            let node = graph.node(id);
            if caps[slot] < floor - TOLERANCE {
                return Err(pin_conflict(graph, id, stage));
            }
            let y = if node.is_pinned() {
                node.position().y()
            } else {
                ys[id.index()].clamp(floor, caps[slot].max(floor))
            };
            ys[id.index()] = y;
            floor = y + node.size().height() + spacing;
        }
    }

    Ok(())
}

fn pin_conflict(graph: &LayeredGraph, id: NodeId, stage: Stage) -> StrataError {
    let node = graph.node(id);
    StrataError::precondition(
        stage,
        format!(
            "pinned coordinates leave no room for node {id} ({}) in layer {}",
            node.label(),
            node.layer()
        ),
    )
}

/// Checks the placement contract, returning a description of the first
/// violation.
pub(crate) fn verify_contract(
    graph: &LayeredGraph,
    ys: &[f64],
    spacing: f64,
) -> Result<(), String> {
    for (id, node) in graph.nodes() {
        let y = ys[id.index()];
        if !y.is_finite() || y < -TOLERANCE {
            return Err(format!("node {id} ({}) got coordinate {y}", node.label()));
        }
        if node.is_pinned() && (y - node.position().y()).abs() > TOLERANCE {
            return Err(format!(
                "pinned node {id} ({}) moved from {} to {y}",
                node.label(),
                node.position().y()
            ));
        }
    }

    for layer in graph.layers() {
        for pair in layer.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let bottom = ys[a.index()] + graph.node(a).size().height() + spacing;
            if bottom > ys[b.index()] + TOLERANCE {
                return Err(format!(
                    "nodes {a} ({}) and {b} ({}) are closer than the node spacing",
                    graph.node(a).label(),
                    graph.node(b).label()
                ));
            }
        }
    }

    Ok(())
}

/// Height of the drawing described by `ys`.
fn extent(graph: &LayeredGraph, ys: &[f64]) -> f64 {
    graph
        .nodes()
        .map(|(id, node)| ys[id.index()] + node.size().height())
        .fold(0.0, f64::max)
}


#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;
    use strata_core::geometry::Size;

    use super::{testing::*, *};
    use crate::{
        progress::{NullMonitor, testing::CancelAfter},
        structure::LNode,
    };

    fn phase(spacing: f64) -> NodePlacementPhase {
        NodePlacementPhase::new(&PlacementConfig::default().with_node_spacing(spacing))
    }

    #[test]
    fn test_registry_resolves_every_strategy() {
        let registry = PlacerRegistry::new(&PlacementConfig::default());

        for strategy in NodePlacementStrategy::ALL {
            assert_eq!(registry.resolve(strategy).unwrap().strategy(), strategy);
        }
        assert_eq!(
            registry.strategies().collect::<Vec<_>>(),
            NodePlacementStrategy::ALL.to_vec()
        );
    }

    #[test]
    fn test_simple_scenario() {
        let (mut graph, [a, b, c]) = fan_in();

        let outcome = phase(5.0)
            .run(&mut graph, NodePlacementStrategy::Simple, &NullMonitor)
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_approx_eq!(f64, graph.node(a).position().y(), 0.0);
        assert_approx_eq!(f64, graph.node(b).position().y(), 15.0);
        assert_approx_eq!(f64, graph.node(c).position().y(), 7.5);
    }

    #[test]
    fn test_interactive_keeps_positions() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, square_at("A", 0.0));
        let b = graph.add_node(0, square_at("B", 15.0));
        let c = graph.add_node(1, square_at("C", 7.0));
        graph.add_edge(a, c);
        graph.add_edge(b, c);

        phase(5.0)
            .run(&mut graph, NodePlacementStrategy::Interactive, &NullMonitor)
            .unwrap();

        assert_eq!(graph.y_coordinates(), vec![0.0, 15.0, 7.0]);
    }

    #[test]
    fn test_interactive_overlap_is_precondition_error() {
        let mut graph = LayeredGraph::new();
        graph.add_node(0, square_at("A", 0.0));
        graph.add_node(0, square_at("B", 12.0));

        let err = phase(5.0)
            .run(&mut graph, NodePlacementStrategy::Interactive, &NullMonitor)
            .unwrap_err();

        assert!(matches!(
            err,
            StrataError::Precondition {
                stage: Stage::NodePlacement(NodePlacementStrategy::Interactive),
                ..
            }
        ));
        assert_eq!(graph.y_coordinates(), vec![0.0, 12.0]);
    }

    #[test]
    fn test_pinned_node_keeps_coordinate() {
        let mut graph = LayeredGraph::new();
        let a = graph.add_node(0, square("A"));
        let b = graph.add_node(0, square_at("B", 100.0).pinned());
        let c = graph.add_node(0, square("C"));
        let d = graph.add_node(1, square("D"));
        graph.add_edge(a, d);

        for strategy in NodePlacementStrategy::ALL {
            if strategy == NodePlacementStrategy::Interactive {
                continue;
            }
            let mut graph = graph.clone();
            phase(5.0).run(&mut graph, strategy, &NullMonitor).unwrap();

            assert_approx_eq!(f64, graph.node(b).position().y(), 100.0);
            assert!(graph.node(a).position().y() + 15.0 <= 100.0 + TOLERANCE);
            assert!(graph.node(c).position().y() >= 115.0 - TOLERANCE);
            assert!(graph.node(d).position().y() >= 0.0);
        }
    }

    #[test]
    fn test_conflicting_pins_are_precondition_error() {
        let mut graph = LayeredGraph::new();
        graph.add_node(0, square_at("A", 0.0).pinned());
        graph.add_node(0, square_at("B", 8.0).pinned());

        let err = phase(5.0)
            .run(&mut graph, NodePlacementStrategy::Simple, &NullMonitor)
            .unwrap_err();
        assert!(matches!(err, StrataError::Precondition { .. }));
    }

    #[test]
    fn test_pin_without_room_above_is_precondition_error() {
        let mut graph = LayeredGraph::new();
        graph.add_node(0, square("A"));
        graph.add_node(0, square_at("B", 5.0).pinned());

        let err = phase(5.0)
            .run(&mut graph, NodePlacementStrategy::BrandesKoepf, &NullMonitor)
            .unwrap_err();
        assert!(matches!(err, StrataError::Precondition { .. }));
    }

    #[test]
    fn test_invalid_graph_is_rejected_before_placement() {
        let mut graph = LayeredGraph::new();
        graph.add_node(0, LNode::new("A", Size::new(f64::NAN, 1.0)));

        let err = phase(5.0)
            .run(&mut graph, NodePlacementStrategy::Simple, &NullMonitor)
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::GraphModel));
    }

    #[test]
    fn test_cancelled_placement_leaves_graph_untouched() {
        let (mut graph, _) = fan_in();
        let before = graph.y_coordinates();

        for strategy in [
            NodePlacementStrategy::LinearSegments,
            NodePlacementStrategy::BrandesKoepf,
            NodePlacementStrategy::NetworkSimplex,
        ] {
            let outcome = phase(5.0)
                .run(&mut graph, strategy, &CancelAfter::new(0))
                .unwrap();
            assert_eq!(outcome, Outcome::Cancelled);
            assert_eq!(graph.y_coordinates(), before);
        }
    }

    #[test]
    fn test_empty_graph() {
        let mut graph = LayeredGraph::new();
        for strategy in NodePlacementStrategy::ALL {
            let outcome = phase(5.0).run(&mut graph, strategy, &NullMonitor).unwrap();
            assert_eq!(outcome, Outcome::Completed);
        }
    }

    #[test]
    fn test_normalize() {
        let mut ys = vec![-5.0, 3.0, -1.0];
        normalize(&mut ys);
        assert_eq!(ys, vec![0.0, 8.0, 4.0]);
    }

    /// Random layered graph: node heights per layer plus edges between
    /// adjacent layers given as (layer, upper slot, lower slot) picks.
    fn layered_graph_strategy() -> impl Strategy<Value = LayeredGraph> {
        let layers = prop::collection::vec(
            prop::collection::vec((1.0f64..40.0, any::<bool>()), 1..5),
            1..5,
        );
        let edges = prop::collection::vec((any::<usize>(), any::<usize>(), any::<usize>()), 0..12);
        (layers, edges).prop_map(|(layers, edges)| {
            let mut graph = LayeredGraph::new();
            let mut ids = Vec::new();
            for (index, layer) in layers.iter().enumerate() {
                let mut layer_ids = Vec::new();
                for (slot, &(height, dummy)) in layer.iter().enumerate() {
                    let mut node = LNode::new(
                        format!("n{index}_{slot}").as_str(),
                        Size::new(10.0, height),
                    );
                    if dummy {
                        node = node.dummy();
                    }
                    layer_ids.push(graph.add_node(index, node));
                }
                ids.push(layer_ids);
            }
            if ids.len() > 1 {
                for (layer, upper, lower) in edges {
                    let layer = layer % (ids.len() - 1);
                    let source = ids[layer][upper % ids[layer].len()];
                    let target = ids[layer + 1][lower % ids[layer + 1].len()];
                    graph.add_weighted_edge(source, target, 1 + (upper % 3) as u32);
                }
            }
            graph
        })
    }

    fn check_contract_holds(graph: &LayeredGraph, strategy: NodePlacementStrategy) {
        let spacing = 7.0;
        let mut graph = graph.clone();
        let outcome = phase(spacing)
            .run(&mut graph, strategy, &NullMonitor)
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);

        let ys = graph.y_coordinates();
        assert!(verify_contract(&graph, &ys, spacing).is_ok());
        assert!(ys.iter().copied().fold(f64::INFINITY, f64::min).abs() < TOLERANCE);
    }

    /// Weighted center distance summed over every edge, with the long-edge
    /// priorities network simplex minimizes.
    fn weighted_cost(graph: &LayeredGraph) -> f64 {
        let center = |id: NodeId| {
            let node = graph.node(id);
            node.position().y() + node.size().height() / 2.0
        };
        graph
            .edges()
            .filter(|(_, edge)| !edge.is_self_loop())
            .map(|(_, edge)| {
                let priority = network_simplex::priority(
                    graph.node(edge.source()).kind(),
                    graph.node(edge.target()).kind(),
                );
                priority
                    * f64::from(edge.weight())
                    * (center(edge.source()) - center(edge.target())).abs()
            })
            .sum()
    }

    proptest! {
        #[test]
        fn prop_every_strategy_keeps_the_contract(graph in layered_graph_strategy()) {
            for strategy in NodePlacementStrategy::ALL {
                if strategy != NodePlacementStrategy::Interactive {
                    check_contract_holds(&graph, strategy);
                }
            }
        }

        #[test]
        fn prop_network_simplex_is_cheapest(graph in layered_graph_strategy()) {
            let cost = |strategy| {
                let mut placed = graph.clone();
                let outcome = phase(7.0).run(&mut placed, strategy, &NullMonitor).unwrap();
                assert_eq!(outcome, Outcome::Completed);
                weighted_cost(&placed)
            };
            let optimal = cost(NodePlacementStrategy::NetworkSimplex);

            for strategy in [
                NodePlacementStrategy::Simple,
                NodePlacementStrategy::LinearSegments,
                NodePlacementStrategy::BrandesKoepf,
            ] {
                let other = cost(strategy);
                prop_assert!(
                    optimal <= other + TOLERANCE * (1.0 + other),
                    "network simplex cost {} exceeds {} cost {}",
                    optimal,
                    strategy,
                    other
                );
            }
        }
    }
}
