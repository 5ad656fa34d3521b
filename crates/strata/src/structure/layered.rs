//! Layered graph model consumed by node placement and compaction.
//!
//! Layers are columns along the x-axis; each layer lists its nodes from top to
//! bottom. Layer membership and in-layer order are fixed by upstream phases and
//! are never changed here; placement only assigns y coordinates and compaction
//! only moves nodes along x.

use log::debug;

use strata_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

use super::arena::{Arena, Handle, handle};
use crate::error::{Stage, StrataError};

handle!(
    /// Handle of a node in a [`LayeredGraph`].
    NodeId,
    "n"
);

handle!(
    /// Handle of an edge in a [`LayeredGraph`].
    EdgeId,
    "e"
);

/// Role of a node in the layered drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeKind {
    /// A node of the user's graph.
    #[default]
    Normal,
    /// A bend point of an edge that spans several layers, inserted by the
    /// upstream edge splitter.
    Dummy,
}

/// A node of a [`LayeredGraph`].
///
/// Built with [`LNode::new`] and the `with_*`/flag methods, then handed to
/// [`LayeredGraph::add_node`], which records its layer slot.
#[derive(Debug, Clone)]
pub struct LNode {
    label: Id,
    size: Size,
    position: Point,
    kind: NodeKind,
    pinned: bool,
    constrained: bool,
    layer: usize,
    index: usize,
    group: Option<usize>,
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
}

impl LNode {
    /// Creates a normal, unpinned node at the origin.
    pub fn new(label: impl Into<Id>, size: Size) -> Self {
        Self {
            label: label.into(),
            size,
            position: Point::default(),
            kind: NodeKind::Normal,
            pinned: false,
            constrained: false,
            layer: 0,
            index: 0,
            group: None,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// Sets the initial top-left position.
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Marks the node as pinned: its y coordinate survives node placement and
    /// compaction never moves it.
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    /// Marks the node as carrying an upstream positional constraint along the
    /// layering axis.
    pub fn constrained(mut self) -> Self {
        self.constrained = true;
        self
    }

    /// Marks the node as a long-edge dummy.
    pub fn dummy(mut self) -> Self {
        self.kind = NodeKind::Dummy;
        self
    }

    pub fn label(&self) -> Id {
        self.label
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dummy(&self) -> bool {
        self.kind == NodeKind::Dummy
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained
    }

    /// Returns the index of the node's layer.
    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Returns the node's index inside its layer.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the compaction group the node belongs to, if any.
    pub fn group(&self) -> Option<usize> {
        self.group
    }

    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    /// Returns the node's box at its current position.
    pub fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.position, self.size)
    }

    /// Returns the y coordinate of the node's center.
    pub fn center_y(&self) -> f64 {
        self.position.y() + self.size.height() / 2.0
    }

    /// Moves the node.
    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }
}

/// A directed edge between two nodes of a [`LayeredGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LEdge {
    source: NodeId,
    target: NodeId,
    weight: u32,
}

impl LEdge {
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Returns the edge's priority in edge-length objectives.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Returns true if both ends are the same node.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Returns the endpoint that is not `node`.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// A graph whose nodes are partitioned into ordered layers.
///
/// # Examples
///
/// ```
/// use strata::structure::{LNode, LayeredGraph};
/// use strata_core::geometry::Size;
///
/// let mut graph = LayeredGraph::new();
/// let a = graph.add_node(0, LNode::new("a", Size::new(10.0, 10.0)));
/// let b = graph.add_node(0, LNode::new("b", Size::new(10.0, 10.0)));
/// let c = graph.add_node(1, LNode::new("c", Size::new(10.0, 10.0)));
/// graph.add_edge(a, c);
/// graph.add_edge(b, c);
///
/// assert_eq!(graph.layer(0), &[a, b]);
/// assert_eq!(graph.node(b).index(), 1);
/// assert!(graph.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LayeredGraph {
    nodes: Arena<NodeId, LNode>,
    edges: Arena<EdgeId, LEdge>,
    layers: Vec<Vec<NodeId>>,
    groups: Vec<Vec<NodeId>>,
}

impl LayeredGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node at the end of the given layer, creating empty layers up
    /// to it if needed.
    pub fn add_node(&mut self, layer: usize, mut node: LNode) -> NodeId {
        if layer >= self.layers.len() {
            self.layers.resize_with(layer + 1, Vec::new);
        }
        node.layer = layer;
        node.index = self.layers[layer].len();
        node.group = None;
        node.incoming.clear();
        node.outgoing.clear();

        let id = self.nodes.push(node);
        self.layers[layer].push(id);
        id
    }

    /// Adds an edge of weight 1.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId) -> EdgeId {
        self.add_weighted_edge(source, target, 1)
    }

    /// Adds an edge with the given weight.
    ///
    /// # Panics
    /// Panics in debug mode if either node does not exist in the graph.
    pub fn add_weighted_edge(&mut self, source: NodeId, target: NodeId, weight: u32) -> EdgeId {
        debug_assert!(
            self.nodes.contains(source),
            "Adding edge: source node {source} does not exist"
        );
        debug_assert!(
            self.nodes.contains(target),
            "Adding edge: target node {target} does not exist"
        );

        let id = self.edges.push(LEdge {
            source,
            target,
            weight,
        });
        self.nodes[source].outgoing.push(id);
        self.nodes[target].incoming.push(id);
        id
    }

    /// Declares a rigid compaction group and returns its index.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the list is empty or a node already
    /// belongs to another group.
    pub fn group_nodes(&mut self, members: &[NodeId]) -> Result<usize, StrataError> {
        if members.is_empty() {
            return Err(StrataError::precondition(
                Stage::GraphModel,
                "compaction group must not be empty",
            ));
        }
        let group = self.groups.len();
        for &member in members {
            let node = self.nodes.get(member).ok_or_else(|| {
                StrataError::precondition(Stage::GraphModel, format!("unknown node {member}"))
            })?;
            if let Some(existing) = node.group {
                return Err(StrataError::precondition(
                    Stage::GraphModel,
                    format!("node {member} already belongs to group {existing}"),
                ));
            }
        }
        for &member in members {
            self.nodes[member].group = Some(group);
        }
        self.groups.push(members.to_vec());
        Ok(group)
    }

    pub fn node(&self, id: NodeId) -> &LNode {
        &self.nodes[id]
    }

    /// Returns an iterator over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &LNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: EdgeId) -> &LEdge {
        &self.edges[id]
    }

    /// Returns an iterator over all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &LEdge)> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Returns the nodes of a layer from top to bottom.
    ///
    /// # Panics
    /// Panics if the layer does not exist.
    pub fn layer(&self, layer: usize) -> &[NodeId] {
        &self.layers[layer]
    }

    /// Returns an iterator over all layers in order.
    pub fn layers(&self) -> impl Iterator<Item = &[NodeId]> {
        self.layers.iter().map(Vec::as_slice)
    }

    /// Returns the declared compaction groups.
    pub fn groups(&self) -> &[Vec<NodeId>] {
        &self.groups
    }

    /// Returns the node directly above `id` in its layer.
    pub fn above(&self, id: NodeId) -> Option<NodeId> {
        let node = &self.nodes[id];
        node.index
            .checked_sub(1)
            .map(|index| self.layers[node.layer][index])
    }

    /// Returns an iterator over the nodes connected to `id` through edges to
    /// the directly preceding layer.
    pub fn upper_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let layer = self.nodes[id].layer;
        self.nodes[id]
            .incoming
            .iter()
            .chain(&self.nodes[id].outgoing)
            .map(move |&edge| self.edges[edge].other(id))
            .filter(move |&other| layer > 0 && self.nodes[other].layer == layer - 1)
    }

    /// Returns an iterator over the nodes connected to `id` through edges to
    /// the directly following layer.
    pub fn lower_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let layer = self.nodes[id].layer;
        self.nodes[id]
            .incoming
            .iter()
            .chain(&self.nodes[id].outgoing)
            .map(move |&edge| self.edges[edge].other(id))
            .filter(move |&other| self.nodes[other].layer == layer + 1)
    }

    /// Returns the y coordinate of every node, indexed by [`NodeId`].
    pub fn y_coordinates(&self) -> Vec<f64> {
        self.nodes.iter().map(|(_, node)| node.position.y()).collect()
    }

    /// Overwrites every node's y coordinate, indexed by [`NodeId`].
    pub(crate) fn commit_y_coordinates(&mut self, ys: &[f64]) {
        debug_assert_eq!(ys.len(), self.nodes.len());
        for (node, &y) in self.nodes.values_mut().zip(ys) {
            node.position = node.position.with_y(y);
        }
    }

    /// Overwrites every node's x coordinate, indexed by [`NodeId`].
    pub(crate) fn commit_x_coordinates(&mut self, xs: &[f64]) {
        debug_assert_eq!(xs.len(), self.nodes.len());
        for (node, &x) in self.nodes.values_mut().zip(xs) {
            node.position = node.position.with_x(x);
        }
    }

    /// Places every layer along the x-axis: each layer starts after the widest
    /// node of the previous one plus `spacing`, and its nodes are left-aligned.
    pub fn assign_layer_positions(&mut self, spacing: f64) {
        let mut x = 0.0;
        for layer in &self.layers {
            let mut width: f64 = 0.0;
            for &id in layer {
                let node = &mut self.nodes[id];
                node.position = node.position.with_x(x);
                width = width.max(node.size.width());
            }
            x += width + spacing;
        }
        debug!(layers = self.layers.len(), width = x; "Layer positions assigned");
    }

    /// Checks the structural invariants every component relies on.
    ///
    /// # Errors
    ///
    /// Returns a [`StrataError::Precondition`] if a node is missing from its
    /// layer slot or listed twice, has an invalid size or a non-finite
    /// position, or if an edge references an unknown node or has zero weight.
    pub fn validate(&self) -> Result<(), StrataError> {
        let fail = |message: String| Err(StrataError::precondition(Stage::GraphModel, message));

        let mut seen = vec![false; self.nodes.len()];
        for (layer_index, layer) in self.layers.iter().enumerate() {
            for (index, &id) in layer.iter().enumerate() {
                let Some(node) = self.nodes.get(id) else {
                    return fail(format!("layer {layer_index} lists unknown node {id}"));
                };
                if std::mem::replace(&mut seen[id.index()], true) {
                    return fail(format!("node {id} is listed in more than one layer slot"));
                }
                if node.layer != layer_index || node.index != index {
                    return fail(format!(
                        "node {id} records slot ({}, {}) but sits at ({layer_index}, {index})",
                        node.layer, node.index
                    ));
                }
            }
        }
        if let Some(missing) = seen.iter().position(|&listed| !listed) {
            return fail(format!(
                "node {} does not belong to any layer",
                NodeId::from_index(missing)
            ));
        }

        for (id, node) in self.nodes.iter() {
            if !node.size.is_valid() {
                return fail(format!(
                    "node {id} ({}) has invalid size {}x{}",
                    node.label,
                    node.size.width(),
                    node.size.height()
                ));
            }
            if !node.position.is_finite() {
                return fail(format!("node {id} ({}) has a non-finite position", node.label));
            }
        }

        for (id, edge) in self.edges.iter() {
            if !self.nodes.contains(edge.source) || !self.nodes.contains(edge.target) {
                return fail(format!("edge {id} references an unknown node"));
            }
            if edge.weight == 0 {
                return fail(format!("edge {id} has zero weight"));
            }
        }

        Ok(())
    }
}
