//! Rooted graph model used by the tree drawing pipeline.
//!
//! Tree placement only works on forests. A [`TGraph`] therefore carries an
//! explicit [`EdgeReduction`] state: edges that break the tree shape are
//! detached from their endpoints and recorded, the tree is placed, and the
//! recorded edges are reattached afterwards.

use std::fmt;

use strata_core::{
    geometry::{Point, Size},
    identifier::Id,
};

use super::arena::{Arena, handle};
use crate::error::{Stage, StrataError};

handle!(
    /// Handle of a node in a [`TGraph`].
    TNodeId,
    "tn"
);

handle!(
    /// Handle of an edge in a [`TGraph`].
    TEdgeId,
    "te"
);

/// A node of a [`TGraph`].
#[derive(Debug, Clone)]
pub struct TNode {
    label: Id,
    size: Size,
    position: Point,
    incoming: Vec<TEdgeId>,
    outgoing: Vec<TEdgeId>,
}

impl TNode {
    pub fn new(label: impl Into<Id>, size: Size) -> Self {
        Self {
            label: label.into(),
            size,
            position: Point::default(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn label(&self) -> Id {
        self.label
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns the top-left position.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Edges currently attached as incoming. The order carries no meaning.
    pub fn incoming(&self) -> &[TEdgeId] {
        &self.incoming
    }

    /// Edges currently attached as outgoing. The order carries no meaning.
    pub fn outgoing(&self) -> &[TEdgeId] {
        &self.outgoing
    }
}

/// A directed edge of a [`TGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TEdge {
    source: TNodeId,
    target: TNodeId,
}

impl TEdge {
    pub fn source(&self) -> TNodeId {
        self.source
    }

    pub fn target(&self) -> TNodeId {
        self.target
    }
}

/// Lifecycle of the edges withheld to make a [`TGraph`] a forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EdgeReduction {
    /// Every edge is attached; nothing has been withheld.
    #[default]
    Intact,
    /// The listed edges are detached from their endpoints, in the order they
    /// were withheld.
    Reduced { removable: Vec<TEdgeId> },
    /// The withheld edges were reattached. Terminal.
    Restored,
}

impl fmt::Display for EdgeReduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeReduction::Intact => write!(f, "intact"),
            EdgeReduction::Reduced { removable } => {
                write!(f, "reduced ({} removable edges)", removable.len())
            }
            EdgeReduction::Restored => write!(f, "restored"),
        }
    }
}

/// A directed graph drawn as a tree.
///
/// # Examples
///
/// ```
/// use strata::structure::{EdgeReduction, TGraph, TNode};
/// use strata_core::geometry::Size;
///
/// let mut graph = TGraph::new();
/// let root = graph.add_node(TNode::new("root", Size::new(10.0, 10.0)));
/// let leaf = graph.add_node(TNode::new("leaf", Size::new(10.0, 10.0)));
/// let edge = graph.add_edge(root, leaf);
///
/// assert_eq!(graph.roots().collect::<Vec<_>>(), vec![root]);
/// assert_eq!(graph.node(leaf).incoming(), &[edge]);
/// assert_eq!(graph.reduction(), &EdgeReduction::Intact);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TGraph {
    nodes: Arena<TNodeId, TNode>,
    edges: Arena<TEdgeId, TEdge>,
    reduction: EdgeReduction,
}

impl TGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, mut node: TNode) -> TNodeId {
        node.incoming.clear();
        node.outgoing.clear();
        self.nodes.push(node)
    }

    /// Adds an edge and attaches it to both endpoints.
    ///
    /// # Panics
    /// Panics in debug mode if either node does not exist in the graph.
    pub fn add_edge(&mut self, source: TNodeId, target: TNodeId) -> TEdgeId {
        debug_assert!(
            self.nodes.contains(source),
            "Adding edge: source node {source} does not exist"
        );
        debug_assert!(
            self.nodes.contains(target),
            "Adding edge: target node {target} does not exist"
        );

        let id = self.edges.push(TEdge { source, target });
        self.attach(id);
        id
    }

    pub fn node(&self, id: TNodeId) -> &TNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (TNodeId, &TNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: TEdgeId) -> &TEdge {
        &self.edges[id]
    }

    /// Returns every edge ever added, attached or not.
    pub fn edges(&self) -> impl Iterator<Item = (TEdgeId, &TEdge)> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn reduction(&self) -> &EdgeReduction {
        &self.reduction
    }

    /// Returns the withheld edges while the graph is reduced, otherwise an
    /// empty slice.
    pub fn removable_edges(&self) -> &[TEdgeId] {
        match &self.reduction {
            EdgeReduction::Reduced { removable } => removable,
            EdgeReduction::Intact | EdgeReduction::Restored => &[],
        }
    }

    /// Returns the nodes without attached incoming edges, in node order.
    pub fn roots(&self) -> impl Iterator<Item = TNodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.incoming.is_empty())
            .map(|(id, _)| id)
    }

    /// Returns the targets of the attached outgoing edges of `id`.
    pub fn children(&self, id: TNodeId) -> impl Iterator<Item = TNodeId> + '_ {
        self.nodes[id]
            .outgoing
            .iter()
            .map(|&edge| self.edges[edge].target)
    }

    /// Returns true if the edge is listed by both of its endpoints.
    pub fn is_attached(&self, id: TEdgeId) -> bool {
        let edge = self.edges[id];
        self.nodes[edge.source].outgoing.contains(&id)
            && self.nodes[edge.target].incoming.contains(&id)
    }

    /// Withholds edges chosen by the caller and moves the graph to
    /// [`EdgeReduction::Reduced`].
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the graph is not intact, or if an edge
    /// is unknown or listed twice.
    pub fn detach_edges(&mut self, removable: Vec<TEdgeId>) -> Result<(), StrataError> {
        if self.reduction != EdgeReduction::Intact {
            return Err(StrataError::precondition(
                Stage::TreeReduction,
                format!("graph is already {}", self.reduction),
            ));
        }
        for (position, &edge) in removable.iter().enumerate() {
            if !self.edges.contains(edge) {
                return Err(StrataError::precondition(
                    Stage::TreeReduction,
                    format!("unknown edge {edge}"),
                ));
            }
            if removable[..position].contains(&edge) {
                return Err(StrataError::precondition(
                    Stage::TreeReduction,
                    format!("edge {edge} is listed twice"),
                ));
            }
        }

        for &edge in &removable {
            self.detach(edge);
        }
        self.reduction = EdgeReduction::Reduced { removable };
        Ok(())
    }

    pub(crate) fn set_reduction(&mut self, reduction: EdgeReduction) {
        self.reduction = reduction;
    }

    /// Appends the edge to its endpoints' collections.
    pub(crate) fn attach(&mut self, id: TEdgeId) {
        let TEdge { source, target } = self.edges[id];
        self.nodes[source].outgoing.push(id);
        self.nodes[target].incoming.push(id);
    }

    /// Removes the edge from its endpoints' collections.
    pub(crate) fn detach(&mut self, id: TEdgeId) {
        let TEdge { source, target } = self.edges[id];
        self.nodes[source].outgoing.retain(|&edge| edge != id);
        self.nodes[target].incoming.retain(|&edge| edge != id);
    }

    /// Overwrites every node's position, indexed by [`TNodeId`].
    pub(crate) fn commit_positions(&mut self, positions: &[Point]) {
        debug_assert_eq!(positions.len(), self.nodes.len());
        for (node, &position) in self.nodes.values_mut().zip(positions) {
            node.position = position;
        }
    }

    /// Returns the position of every node, indexed by [`TNodeId`].
    pub fn positions(&self) -> Vec<Point> {
        self.nodes.iter().map(|(_, node)| node.position).collect()
    }
}
