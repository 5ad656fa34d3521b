//! Tree drawing: reduce, place, restore.
//!
//! Tree placement only understands forests, so the pipeline works on a
//! temporarily reduced graph:
//!
//! ```text
//!   Intact ──reduce──▶ Reduced { removable } ──place──▶ positions ──restore──▶ Restored
//! ```
//!
//! [`reduce`] is skipped when the caller already withheld edges with
//! [`TGraph::detach_edges`](crate::structure::TGraph::detach_edges).

mod placer;
mod restore;
mod treeify;

pub use self::{placer::TreePlacer, restore::restore, treeify::reduce};

#[cfg(test)]
mod tests {
    use strata_core::geometry::{Point, Size};

    use super::*;
    use crate::{
        config::TreeConfig,
        error::{Stage, StrataError},
        progress::{NullMonitor, Outcome},
        structure::{EdgeReduction, TGraph, TNode},
    };

    #[test]
    fn test_place_and_restore_with_caller_marked_edge() {
        let mut graph = TGraph::new();
        let size = Size::new(10.0, 10.0);
        let r = graph.add_node(TNode::new("R", size));
        let x = graph.add_node(TNode::new("X", size));
        let y = graph.add_node(TNode::new("Y", size));
        let z = graph.add_node(TNode::new("Z", size));
        let rx = graph.add_edge(r, x);
        let ry = graph.add_edge(r, y);
        let yz = graph.add_edge(y, z);
        let xz = graph.add_edge(x, z);
        graph.detach_edges(vec![xz]).unwrap();

        let placer = TreePlacer::new(
            &TreeConfig::default()
                .with_node_spacing(20.0)
                .with_level_spacing(40.0),
        );
        let outcome = placer.place(&mut graph, &NullMonitor).unwrap();
        assert_eq!(outcome, Outcome::Completed);
        let placed = graph.positions();
        assert_eq!(graph.node(z).position(), Point::new(30.0, 100.0));

        restore(&mut graph).unwrap();

        assert_eq!(graph.node(z).incoming(), &[yz, xz]);
        assert_eq!(graph.node(x).outgoing(), &[xz]);
        assert_eq!(graph.node(r).outgoing(), &[rx, ry]);
        assert_eq!(graph.positions(), placed);

        let err = restore(&mut graph).unwrap_err();
        assert!(matches!(
            err,
            StrataError::Precondition {
                stage: Stage::TreeRestoration,
                ..
            }
        ));
        assert_eq!(graph.reduction(), &EdgeReduction::Restored);
    }

    #[test]
    fn test_round_trip_keeps_every_edge_once() {
        let mut graph = TGraph::new();
        let size = Size::new(12.0, 8.0);
        let nodes: Vec<_> = (0..6)
            .map(|index| graph.add_node(TNode::new(format!("n{index}").as_str(), size)))
            .collect();
        for &(source, target) in &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 0), (4, 5), (5, 4), (3, 3)] {
            graph.add_edge(nodes[source], nodes[target]);
        }
        let mut before: Vec<_> = graph
            .nodes()
            .map(|(_, node)| (node.incoming().to_vec(), node.outgoing().to_vec()))
            .collect();

        reduce(&mut graph).unwrap();
        TreePlacer::new(&TreeConfig::default())
            .place(&mut graph, &NullMonitor)
            .unwrap();
        let placed = graph.positions();
        restore(&mut graph).unwrap();

        let mut after: Vec<_> = graph
            .nodes()
            .map(|(_, node)| (node.incoming().to_vec(), node.outgoing().to_vec()))
            .collect();
        for (incoming, outgoing) in before.iter_mut().chain(after.iter_mut()) {
            incoming.sort();
            outgoing.sort();
        }
        assert_eq!(before, after);
        assert_eq!(graph.positions(), placed);
        for (id, _) in graph.edges() {
            assert!(graph.is_attached(id));
        }
    }
}
