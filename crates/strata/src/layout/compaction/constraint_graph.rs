//! Constraint graph over compaction nodes.
//!
//! Every layered node becomes a [`CNode`] whose hitbox is its current bounds.
//! CNodes are bundled into rigid [`CGroup`]s, which are the vertices of a
//! `petgraph` digraph. An edge `A -> B` weighted `sep` requires
//! `position(B) ≥ position(A) + sep`, where a group's position is the x of
//! its leftmost member.

use std::{cmp::Reverse, collections::BinaryHeap};

use log::{debug, trace};
use petgraph::{
    Direction,
    algo::toposort,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use strata_core::geometry::Bounds;

use crate::{
    error::{Stage, StrataError},
    structure::{Handle, LayeredGraph, NodeId},
};

/// Restriction on the direction a compaction pass may move a [`CNode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompactionLock {
    #[default]
    Free,
    /// Must not move toward smaller x.
    LockedLeft,
    /// Must not move toward larger x.
    LockedRight,
    /// Must not move at all.
    Locked,
}

impl CompactionLock {
    fn from_permissions(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, true) => CompactionLock::Free,
            (false, true) => CompactionLock::LockedLeft,
            (true, false) => CompactionLock::LockedRight,
            (false, false) => CompactionLock::Locked,
        }
    }

    pub fn allows_left(self) -> bool {
        matches!(self, CompactionLock::Free | CompactionLock::LockedRight)
    }

    pub fn allows_right(self) -> bool {
        matches!(self, CompactionLock::Free | CompactionLock::LockedLeft)
    }

    /// Returns the lock that forbids everything either lock forbids.
    pub fn combine(self, other: Self) -> Self {
        Self::from_permissions(
            self.allows_left() && other.allows_left(),
            self.allows_right() && other.allows_right(),
        )
    }
}

/// Compaction surrogate of one layered node.
#[derive(Debug, Clone)]
pub struct CNode {
    node: NodeId,
    hitbox: Bounds,
    layer: usize,
    index: usize,
    group: NodeIndex,
    /// Distance from the group's reference x to the hitbox's left edge.
    offset: f64,
    constrained: bool,
    lock: CompactionLock,
}

impl CNode {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn group(&self) -> NodeIndex {
        self.group
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained
    }

    pub fn lock(&self) -> CompactionLock {
        self.lock
    }
}

/// A set of CNodes moved as one rigid unit.
#[derive(Debug, Clone)]
pub struct CGroup {
    members: Vec<usize>,
    /// `(layer, index)` of the member that comes first in layer order.
    key: (usize, usize),
    /// Current x of the leftmost member.
    position: f64,
    /// Right edge of the group, relative to `position`.
    extent: f64,
}

impl CGroup {
    /// Indices of the member CNodes.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Width from the leftmost left edge to the rightmost right edge.
    pub fn extent(&self) -> f64 {
        self.extent
    }
}

/// Layered edge between CNodes of distinct groups.
#[derive(Debug, Clone, Copy)]
pub(super) struct Connection {
    pub source: usize,
    pub target: usize,
    pub weight: u32,
}

/// Separation constraints between the groups of a layered graph.
#[derive(Debug)]
pub struct ConstraintGraph {
    cnodes: Vec<CNode>,
    groups: DiGraph<CGroup, f64>,
    connections: Vec<Connection>,
    /// Groups in topological order, ties broken by layer order.
    order: Vec<NodeIndex>,
}

impl ConstraintGraph {
    /// Builds the constraint graph of `graph` from its current coordinates.
    ///
    /// Pinned nodes start [`CompactionLock::Locked`].
    ///
    /// # Errors
    /// Returns [`StrataError::Consistency`] if the separation constraints form
    /// a cycle among groups.
    pub fn build(graph: &LayeredGraph, spacing: f64, stage: Stage) -> Result<Self, StrataError> {
        let mut groups: DiGraph<CGroup, f64> = DiGraph::new();
        let mut group_of_declared = vec![None; graph.groups().len()];
        let mut cnodes = Vec::with_capacity(graph.node_count());

        for (id, node) in graph.nodes() {
            let group = match node.group() {
                Some(declared) => *group_of_declared[declared].get_or_insert_with(|| {
                    groups.add_node(Self::empty_group(node.layer(), node.index()))
                }),
                None => groups.add_node(Self::empty_group(node.layer(), node.index())),
            };
            groups[group].members.push(id.index());
            let key = (node.layer(), node.index());
            if key < groups[group].key {
                groups[group].key = key;
            }
            cnodes.push(CNode {
                node: id,
                hitbox: node.bounds(),
                layer: node.layer(),
                index: node.index(),
                group,
                offset: 0.0,
                constrained: node.is_constrained(),
                lock: if node.is_pinned() {
                    CompactionLock::Locked
                } else {
                    CompactionLock::Free
                },
            });
        }

        for group in groups.node_weights_mut() {
            let reference = group
                .members
                .iter()
                .map(|&member| cnodes[member].hitbox.min_x())
                .fold(f64::INFINITY, f64::min);
            let right = group
                .members
                .iter()
                .map(|&member| cnodes[member].hitbox.max_x())
                .fold(f64::NEG_INFINITY, f64::max);
            group.position = reference;
            group.extent = right - reference;
            for &member in &group.members {
                cnodes[member].offset = cnodes[member].hitbox.min_x() - reference;
            }
        }

        let mut constraint_graph = Self {
            cnodes,
            groups,
            connections: Vec::new(),
            order: Vec::new(),
        };
        constraint_graph.add_separations(spacing);
        constraint_graph.add_connections(graph);
        constraint_graph.order = constraint_graph.topological_order(stage)?;

        debug!(
            cnodes = constraint_graph.cnodes.len(),
            groups = constraint_graph.groups.node_count(),
            constraints = constraint_graph.groups.edge_count();
            "Constraint graph built"
        );
        Ok(constraint_graph)
    }

    fn empty_group(layer: usize, index: usize) -> CGroup {
        CGroup {
            members: Vec::new(),
            key: (layer, index),
            position: 0.0,
            extent: 0.0,
        }
    }

    /// Adds a separation constraint for every pair of CNodes in distinct
    /// groups and distinct layers whose vertical extents come closer than
    /// `spacing`. Parallel constraints keep the largest separation.
    fn add_separations(&mut self, spacing: f64) {
        let mut ordered: Vec<usize> = (0..self.cnodes.len()).collect();
        ordered.sort_by(|&a, &b| {
            let (a, b) = (&self.cnodes[a], &self.cnodes[b]);
            a.hitbox
                .min_x()
                .total_cmp(&b.hitbox.min_x())
                .then((a.layer, a.index).cmp(&(b.layer, b.index)))
        });

        for (position, &a) in ordered.iter().enumerate() {
            for &b in &ordered[position + 1..] {
                let (left, right) = (&self.cnodes[a], &self.cnodes[b]);
                if left.group == right.group
                    || left.layer == right.layer
                    || !left.hitbox.overlaps_vertically(&right.hitbox, spacing)
                {
                    continue;
                }
                let separation = left.offset + left.hitbox.width() + spacing - right.offset;
                let (from, to) = (left.group, right.group);
                match self.groups.find_edge(from, to) {
                    Some(edge) => {
                        let current = &mut self.groups[edge];
                        *current = current.max(separation);
                    }
                    None => {
                        self.groups.add_edge(from, to, separation);
                    }
                }
                trace!(from = from.index(), to = to.index(), separation; "Separation constraint");
            }
        }
    }

    fn add_connections(&mut self, graph: &LayeredGraph) {
        self.connections = graph
            .edges()
            .map(|(_, edge)| Connection {
                source: edge.source().index(),
                target: edge.target().index(),
                weight: edge.weight(),
            })
            .filter(|connection| {
                self.cnodes[connection.source].group != self.cnodes[connection.target].group
            })
            .collect();
    }

    /// Kahn's algorithm over the groups, always taking the ready group that
    /// comes first in layer order.
    fn topological_order(&self, stage: Stage) -> Result<Vec<NodeIndex>, StrataError> {
        if let Err(cycle) = toposort(&self.groups, None) {
            let member = self.groups[cycle.node_id()].members[0];
            return Err(StrataError::consistency(
                stage,
                format!(
                    "separation constraints form a cycle through the group of node {}",
                    self.cnodes[member].node
                ),
            ));
        }

        let mut in_degree: Vec<usize> = self
            .groups
            .node_indices()
            .map(|group| {
                self.groups
                    .edges_directed(group, Direction::Incoming)
                    .count()
            })
            .collect();
        let mut ready: BinaryHeap<Reverse<((usize, usize), usize)>> = self
            .groups
            .node_indices()
            .filter(|group| in_degree[group.index()] == 0)
            .map(|group| Reverse((self.groups[group].key, group.index())))
            .collect();

        let mut order = Vec::with_capacity(self.groups.node_count());
        while let Some(Reverse((_, group))) = ready.pop() {
            let group = NodeIndex::new(group);
            order.push(group);
            for successor in self.groups.neighbors_directed(group, Direction::Outgoing) {
                in_degree[successor.index()] -= 1;
                if in_degree[successor.index()] == 0 {
                    ready.push(Reverse((self.groups[successor].key, successor.index())));
                }
            }
        }
        Ok(order)
    }

    pub fn cnodes(&self) -> &[CNode] {
        &self.cnodes
    }

    pub fn group(&self, group: NodeIndex) -> &CGroup {
        &self.groups[group]
    }

    pub fn group_count(&self) -> usize {
        self.groups.node_count()
    }

    /// Groups in processing order: every group after all groups it must
    /// stay to the right of.
    pub fn order(&self) -> &[NodeIndex] {
        &self.order
    }

    pub(super) fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Lock of a group: it may move in a direction only if every member may.
    pub fn group_lock(&self, group: NodeIndex) -> CompactionLock {
        self.groups[group]
            .members
            .iter()
            .map(|&member| self.cnodes[member].lock)
            .fold(CompactionLock::Free, CompactionLock::combine)
    }

    /// Adds `lock` to the CNode's current lock.
    pub fn lock(&mut self, cnode: usize, lock: CompactionLock) {
        let current = &mut self.cnodes[cnode].lock;
        *current = current.combine(lock);
    }

    /// Groups this group must stay to the right of, with their separation.
    pub(super) fn predecessors(
        &self,
        group: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, f64)> + '_ {
        self.groups
            .edges_directed(group, Direction::Incoming)
            .map(|edge| (edge.source(), *edge.weight()))
    }

    /// Groups this group must stay to the left of, with their separation.
    pub(super) fn successors(&self, group: NodeIndex) -> impl Iterator<Item = (NodeIndex, f64)> + '_ {
        self.groups
            .edges_directed(group, Direction::Outgoing)
            .map(|edge| (edge.target(), *edge.weight()))
    }

    pub(super) fn set_position(&mut self, group: NodeIndex, position: f64) {
        self.groups[group].position = position;
    }

    /// Current left edge of a CNode.
    pub fn x(&self, cnode: usize) -> f64 {
        let cnode = &self.cnodes[cnode];
        self.groups[cnode.group].position + cnode.offset
    }

    /// Current horizontal center of a CNode.
    pub fn center_x(&self, cnode: usize) -> f64 {
        self.x(cnode) + self.cnodes[cnode].hitbox.width() / 2.0
    }

    /// Current horizontal center of a group's hull.
    pub fn group_center_x(&self, group: NodeIndex) -> f64 {
        let group = &self.groups[group];
        group.position + group.extent / 2.0
    }

    /// Largest right edge over all groups.
    pub fn trailing_edge(&self) -> f64 {
        self.groups
            .node_weights()
            .map(|group| group.position + group.extent)
            .fold(0.0, f64::max)
    }

    /// Current left edge of every node, indexed by [`NodeId`].
    pub fn x_coordinates(&self) -> Vec<f64> {
        (0..self.cnodes.len()).map(|cnode| self.x(cnode)).collect()
    }
}
