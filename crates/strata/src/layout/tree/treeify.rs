//! Breaks a rooted graph into a forest.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::{
    error::{Stage, StrataError},
    structure::{EdgeReduction, Handle, TGraph, TNodeId},
};

/// Withholds every edge that keeps `graph` from being a forest.
///
/// Nodes are visited breadth first, starting from all nodes without incoming
/// edges in node order. The first edge that reaches a node becomes its tree
/// edge. Any later edge into an already reached node (a second parent, a back
/// edge of a cycle, a self-loop) is detached and recorded in visiting order.
/// Nodes no traversal reached, such as those on a cycle without a root, start
/// further traversals in node order.
///
/// # Errors
/// Returns a precondition error unless the graph is [`EdgeReduction::Intact`].
pub fn reduce(graph: &mut TGraph) -> Result<(), StrataError> {
    if graph.reduction() != &EdgeReduction::Intact {
        return Err(StrataError::precondition(
            Stage::TreeReduction,
            format!("graph is already {}", graph.reduction()),
        ));
    }

    let mut reached = vec![false; graph.node_count()];
    let mut removable = Vec::new();
    let mut queue: VecDeque<TNodeId> = graph.roots().collect();
    for root in &queue {
        reached[root.index()] = true;
    }

    loop {
        while let Some(node) = queue.pop_front() {
            for &edge in graph.node(node).outgoing() {
                let target = graph.edge(edge).target();
                if reached[target.index()] {
                    trace!(edge:%, node:%; "Withholding edge");
                    removable.push(edge);
                } else {
                    reached[target.index()] = true;
                    queue.push_back(target);
                }
            }
        }
        match reached.iter().position(|&seen| !seen) {
            Some(next) => {
                reached[next] = true;
                queue.push_back(TNodeId::from_index(next));
            }
            None => break,
        }
    }

    for &edge in &removable {
        graph.detach(edge);
    }
    debug!(removable = removable.len(); "Graph reduced to a forest");
    graph.set_reduction(EdgeReduction::Reduced { removable });
    Ok(())
}
