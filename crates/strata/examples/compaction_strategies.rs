//! Example: Comparing compaction strategies
//!
//! This example builds a small layered graph by hand, places it with the
//! Brandes-Köpf strategy and prints the node coordinates after each
//! compaction strategy.

use strata::{
    LayoutConfig, Layouter,
    config::{CompactionConfig, GraphCompactionStrategy, PlacementConfig, TreeConfig},
    geometry::Size,
    progress::NullMonitor,
    structure::{LNode, LayeredGraph},
};

fn build_graph() -> LayeredGraph {
    let mut graph = LayeredGraph::new();
    let size = Size::new(40.0, 20.0);

    let client = graph.add_node(0, LNode::new("client", size));
    let admin = graph.add_node(0, LNode::new("admin", size).constrained());
    let server = graph.add_node(1, LNode::new("server", Size::new(60.0, 30.0)));
    let dummy = graph.add_node(1, LNode::new("cache-edge", Size::new(0.0, 0.0)).dummy());
    let database = graph.add_node(2, LNode::new("database", size));
    let cache = graph.add_node(2, LNode::new("cache", size));

    graph.add_edge(client, server);
    graph.add_edge(admin, server);
    graph.add_edge(admin, dummy);
    graph.add_weighted_edge(server, database, 2);
    graph.add_edge(dummy, cache);
    graph
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let strategies = [
        GraphCompactionStrategy::None,
        GraphCompactionStrategy::Left,
        GraphCompactionStrategy::Right,
        GraphCompactionStrategy::LeftRightConstraintLocking,
        GraphCompactionStrategy::LeftRightConnectionLocking,
        GraphCompactionStrategy::EdgeLength,
    ];

    for strategy in strategies {
        let config = LayoutConfig::new(
            PlacementConfig::default().with_layer_spacing(80.0),
            CompactionConfig::default()
                .with_strategy(strategy)
                .with_spacing(20.0),
            TreeConfig::default(),
        );
        let layouter = Layouter::new(config)?;

        let mut graph = build_graph();
        layouter.layout(&mut graph, &NullMonitor)?;

        println!("{strategy}:");
        for (_, node) in graph.nodes() {
            let position = node.position();
            println!(
                "  {:<12} x = {:>6.1}  y = {:>6.1}",
                node.label().to_string(),
                position.x(),
                position.y()
            );
        }
        println!();
    }

    Ok(())
}
