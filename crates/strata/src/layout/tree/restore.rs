//! Reattaches the edges withheld to make a graph a forest.

use log::info;

use crate::{
    error::{Stage, StrataError},
    structure::{EdgeReduction, TGraph},
};

/// Appends every withheld edge back to its endpoints, in the order it was
/// withheld, and moves the graph to [`EdgeReduction::Restored`].
///
/// Positions are not touched.
///
/// # Errors
/// Returns a precondition error if the graph is not
/// [`EdgeReduction::Reduced`], or if an endpoint still lists a withheld edge.
/// The graph is unchanged in both cases.
pub fn restore(graph: &mut TGraph) -> Result<(), StrataError> {
    let removable = match graph.reduction() {
        EdgeReduction::Reduced { removable } => removable.clone(),
        other => {
            return Err(StrataError::precondition(
                Stage::TreeRestoration,
                format!("graph is {other}, expected reduced"),
            ));
        }
    };

    for &edge in &removable {
        let endpoints = graph.edge(edge);
        if graph.node(endpoints.source()).outgoing().contains(&edge)
            || graph.node(endpoints.target()).incoming().contains(&edge)
        {
            return Err(StrataError::precondition(
                Stage::TreeRestoration,
                format!("withheld edge {edge} is still attached"),
            ));
        }
    }

    for &edge in &removable {
        graph.attach(edge);
    }
    graph.set_reduction(EdgeReduction::Restored);
    info!(restored = removable.len(); "Withheld edges restored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use strata_core::geometry::Size;

    use super::*;
    use crate::structure::TNode;

    #[test]
    fn test_restore_appends_in_recorded_order() {
        let mut graph = TGraph::new();
        let size = Size::new(10.0, 10.0);
        let a = graph.add_node(TNode::new("a", size));
        let b = graph.add_node(TNode::new("b", size));
        let first = graph.add_edge(a, b);
        let second = graph.add_edge(a, b);
        let third = graph.add_edge(a, b);
        graph.detach_edges(vec![third, first]).unwrap();

        restore(&mut graph).unwrap();

        assert_eq!(graph.reduction(), &EdgeReduction::Restored);
        assert_eq!(graph.node(a).outgoing(), &[second, third, first]);
        assert_eq!(graph.node(b).incoming(), &[second, third, first]);
    }

    #[test]
    fn test_restore_requires_reduced_graph() {
        let mut graph = TGraph::new();
        graph.add_node(TNode::new("a", Size::new(1.0, 1.0)));

        let err = restore(&mut graph).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::TreeRestoration));
        assert_eq!(graph.reduction(), &EdgeReduction::Intact);
    }

    #[test]
    fn test_attached_removable_edge_is_rejected() {
        let mut graph = TGraph::new();
        let size = Size::new(10.0, 10.0);
        let a = graph.add_node(TNode::new("a", size));
        let b = graph.add_node(TNode::new("b", size));
        let edge = graph.add_edge(a, b);
        graph.detach_edges(vec![edge]).unwrap();
        graph.attach(edge);

        let err = restore(&mut graph).unwrap_err();

        assert!(matches!(err, StrataError::Precondition { .. }));
        assert_eq!(graph.removable_edges(), &[edge]);
    }
}
