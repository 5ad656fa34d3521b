//! Tidy placement of a reduced tree graph.

use log::{debug, info};
use strata_core::geometry::Point;

use crate::{
    config::TreeConfig,
    error::{Stage, StrataError},
    progress::{Outcome, ProgressMonitor},
    structure::{EdgeReduction, Handle, TGraph, TNodeId},
};

/// Places a forest top-down: roots on the first level, children one level
/// below their parent.
///
/// Leaves take consecutive horizontal slots in depth-first order and every
/// parent is centered over its first and last child. A parent wider than its
/// children shifts its whole subtree right, so sibling subtrees never overlap.
#[derive(Debug, Clone)]
pub struct TreePlacer {
    node_spacing: f64,
    level_spacing: f64,
}

/// A node whose children are being placed.
struct Frame {
    node: TNodeId,
    next_child: usize,
    /// Left edge of the subtree.
    start: f64,
}

impl TreePlacer {
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            node_spacing: config.node_spacing(),
            level_spacing: config.level_spacing(),
        }
    }

    /// Assigns every node of `graph` its position.
    ///
    /// Edges are left untouched. On [`Outcome::Cancelled`] no position has
    /// changed.
    ///
    /// # Errors
    /// Returns a precondition error unless the graph is
    /// [`EdgeReduction::Reduced`] and its attached edges form a forest.
    pub fn place(
        &self,
        graph: &mut TGraph,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Outcome, StrataError> {
        if !matches!(graph.reduction(), EdgeReduction::Reduced { .. }) {
            return Err(StrataError::precondition(
                Stage::TreePlacement,
                format!("graph is {}, expected reduced", graph.reduction()),
            ));
        }
        let roots: Vec<TNodeId> = graph.roots().collect();
        let children: Vec<Vec<TNodeId>> = graph
            .nodes()
            .map(|(id, _)| graph.children(id).collect())
            .collect();
        let depth = Self::depths(graph, &roots, &children)?;
        info!(nodes = graph.node_count(), roots = roots.len(); "Placing tree");

        let level_y = self.level_offsets(graph, &depth);
        let mut xs = vec![0.0; graph.node_count()];
        let mut cursor = 0.0;
        for (done, &root) in roots.iter().enumerate() {
            if monitor.is_cancelled() {
                info!("Tree placement cancelled");
                return Ok(Outcome::Cancelled);
            }
            cursor = self.place_subtree(graph, &children, root, cursor, &mut xs);
            monitor.report_progress((done + 1) as f64 / roots.len() as f64);
        }

        let positions: Vec<Point> = xs
            .iter()
            .zip(&depth)
            .map(|(&x, &level)| Point::new(x, level_y[level]))
            .collect();
        graph.commit_positions(&positions);
        debug!(width = cursor, levels = level_y.len(); "Tree placement committed");
        Ok(Outcome::Completed)
    }

    /// Depth of every node below its root.
    fn depths(
        graph: &TGraph,
        roots: &[TNodeId],
        children: &[Vec<TNodeId>],
    ) -> Result<Vec<usize>, StrataError> {
        if let Some((id, node)) = graph.nodes().find(|(_, node)| node.incoming().len() > 1) {
            return Err(StrataError::precondition(
                Stage::TreePlacement,
                format!(
                    "node {id} ({}) has {} parents",
                    node.label(),
                    node.incoming().len()
                ),
            ));
        }

        let mut depth = vec![usize::MAX; graph.node_count()];
        let mut stack: Vec<(TNodeId, usize)> = roots.iter().map(|&root| (root, 0)).collect();
        while let Some((node, level)) = stack.pop() {
            depth[node.index()] = level;
            stack.extend(children[node.index()].iter().map(|&child| (child, level + 1)));
        }
        if let Some(orphan) = depth.iter().position(|&level| level == usize::MAX) {
            return Err(StrataError::precondition(
                Stage::TreePlacement,
                format!(
                    "node {} lies on a cycle that no root reaches",
                    TNodeId::from_index(orphan)
                ),
            ));
        }
        Ok(depth)
    }

    /// Top y of every level: each level starts below the tallest node of the
    /// previous one plus the level spacing.
    fn level_offsets(&self, graph: &TGraph, depth: &[usize]) -> Vec<f64> {
        let levels = depth.iter().max().map_or(0, |&deepest| deepest + 1);
        let mut tallest = vec![0.0f64; levels];
        for (id, node) in graph.nodes() {
            let level = depth[id.index()];
            tallest[level] = tallest[level].max(node.size().height());
        }

        let mut y = 0.0;
        tallest
            .iter()
            .map(|height| {
                let top = y;
                y += height + self.level_spacing;
                top
            })
            .collect()
    }

    /// Places the subtree of `root` starting at `cursor` and returns the
    /// cursor after it.
    fn place_subtree(
        &self,
        graph: &TGraph,
        children: &[Vec<TNodeId>],
        root: TNodeId,
        mut cursor: f64,
        xs: &mut [f64],
    ) -> f64 {
        let width = |id: TNodeId| graph.node(id).size().width();
        let mut stack = vec![Frame {
            node: root,
            next_child: 0,
            start: cursor,
        }];

        while let Some(frame) = stack.last_mut() {
            let kids = &children[frame.node.index()];
            if let Some(&child) = kids.get(frame.next_child) {
                frame.next_child += 1;
                stack.push(Frame {
                    node: child,
                    next_child: 0,
                    start: cursor,
                });
                continue;
            }

            let Frame { node, start, .. } = *frame;
            stack.pop();
            let (Some(&first), Some(&last)) = (kids.first(), kids.last()) else {
                xs[node.index()] = cursor;
                cursor += width(node) + self.node_spacing;
                continue;
            };

            let center = (xs[first.index()] + width(first) / 2.0 + xs[last.index()] + width(last) / 2.0)
                / 2.0;
            let mut x = center - width(node) / 2.0;
            if x < start {
                let shift = start - x;
                Self::shift_descendants(children, node, shift, xs);
                cursor += shift;
                x = start;
            }
            xs[node.index()] = x;
            cursor = cursor.max(x + width(node) + self.node_spacing);
        }
        cursor
    }

    fn shift_descendants(children: &[Vec<TNodeId>], node: TNodeId, shift: f64, xs: &mut [f64]) {
        let mut stack = children[node.index()].clone();
        while let Some(descendant) = stack.pop() {
            xs[descendant.index()] += shift;
            stack.extend(children[descendant.index()].iter().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use strata_core::geometry::Size;

    use super::*;
    use crate::{
        layout::tree::reduce,
        progress::{NullMonitor, testing::CancelAfter},
        structure::TNode,
    };

    fn placer() -> TreePlacer {
        TreePlacer::new(
            &TreeConfig::default()
                .with_node_spacing(20.0)
                .with_level_spacing(40.0),
        )
    }

    fn square(label: &str) -> TNode {
        TNode::new(label, Size::new(10.0, 10.0))
    }

    #[test]
    fn test_parent_centered_over_children() {
        let mut graph = TGraph::new();
        let root = graph.add_node(square("root"));
        let a = graph.add_node(square("a"));
        let b = graph.add_node(square("b"));
        let c = graph.add_node(square("c"));
        graph.add_edge(root, a);
        graph.add_edge(root, b);
        graph.add_edge(root, c);
        reduce(&mut graph).unwrap();

        let outcome = placer().place(&mut graph, &NullMonitor).unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(graph.node(a).position(), Point::new(0.0, 50.0));
        assert_eq!(graph.node(b).position(), Point::new(30.0, 50.0));
        assert_eq!(graph.node(c).position(), Point::new(60.0, 50.0));
        assert_eq!(graph.node(root).position(), Point::new(30.0, 0.0));
    }

    #[test]
    fn test_wide_parent_shifts_its_subtree() {
        let mut graph = TGraph::new();
        let wide = graph.add_node(TNode::new("wide", Size::new(100.0, 20.0)));
        let a = graph.add_node(square("a"));
        let b = graph.add_node(square("b"));
        let next = graph.add_node(square("next"));
        graph.add_edge(wide, a);
        graph.add_edge(wide, b);
        reduce(&mut graph).unwrap();

        placer().place(&mut graph, &NullMonitor).unwrap();

        assert_approx_eq!(f64, graph.node(wide).position().x(), 0.0);
        assert_approx_eq!(f64, graph.node(a).position().x(), 30.0);
        assert_approx_eq!(f64, graph.node(b).position().x(), 60.0);
        assert_approx_eq!(f64, graph.node(a).position().y(), 60.0);
        assert_approx_eq!(f64, graph.node(next).position().x(), 120.0);
    }

    #[test]
    fn test_intact_graph_is_rejected() {
        let mut graph = TGraph::new();
        graph.add_node(square("a"));

        let err = placer().place(&mut graph, &NullMonitor).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::TreePlacement));
    }

    #[test]
    fn test_second_parent_is_rejected() {
        let mut graph = TGraph::new();
        let a = graph.add_node(square("a"));
        let b = graph.add_node(square("b"));
        let c = graph.add_node(square("c"));
        graph.add_edge(a, c);
        graph.add_edge(b, c);
        graph.detach_edges(Vec::new()).unwrap();

        let err = placer().place(&mut graph, &NullMonitor).unwrap_err();
        assert!(matches!(err, StrataError::Precondition { .. }));
    }

    #[test]
    fn test_cancelled_before_first_root() {
        let mut graph = TGraph::new();
        graph.add_node(TNode::new("a", Size::new(10.0, 10.0)));
        reduce(&mut graph).unwrap();
        let before = graph.positions();

        let outcome = placer().place(&mut graph, &CancelAfter::new(0)).unwrap();

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(graph.positions(), before);
    }
}
