//! Network simplex over difference constraints with real-valued lengths.
//!
//! Solves: minimize `Σ weight(e) · (rank(head) − rank(tail))` subject to
//! `rank(head) − rank(tail) ≥ min_len(e)` for every edge. The method follows
//! the classic rank assignment of Gansner et al.: an initial feasible ranking
//! from a longest path, a feasible spanning tree of tight edges, then pivots
//! that swap a tree edge with a negative cut value for the non-tree edge of
//! minimum slack crossing the same cut.

use log::trace;

use crate::{
    error::{Stage, StrataError},
    progress::{ProgressMonitor, Step},
};

/// Slack below which an edge counts as tight.
const TIGHT: f64 = 1e-6;

/// Cut values above this bound count as optimal.
const OPTIMAL: f64 = -1e-9;

/// Pivots between two cancellation polls.
const POLL_INTERVAL: usize = 64;

/// A difference constraint `rank(head) − rank(tail) ≥ min_len`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Constraint {
    pub tail: usize,
    pub head: usize,
    pub min_len: f64,
    pub weight: f64,
}

/// Constraint problem over `node_count` variables.
#[derive(Debug)]
pub(super) struct Problem {
    node_count: usize,
    edges: Vec<Constraint>,
}

impl Problem {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            edges: Vec::new(),
        }
    }

    pub fn add(&mut self, tail: usize, head: usize, min_len: f64, weight: f64) {
        debug_assert!(tail < self.node_count && head < self.node_count);
        self.edges.push(Constraint {
            tail,
            head,
            min_len,
            weight,
        });
    }

    /// Solves every connected component independently. Each component's
    /// smallest rank is zero.
    ///
    /// When `max_iterations` pivots have been made in a component, its current
    /// feasible ranking is kept.
    pub fn solve(
        &self,
        max_iterations: usize,
        stage: Stage,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<Vec<f64>>, StrataError> {
        let mut ranks = vec![0.0; self.node_count];
        let components = self.components();
        for (done, members) in components.iter().enumerate() {
            let mut local = Component::extract(self, members);
            if let Step::Cancelled = local.solve(max_iterations, stage, monitor)? {
                return Ok(Step::Cancelled);
            }
            let min = local.rank.iter().copied().fold(f64::INFINITY, f64::min);
            for (&global, &rank) in members.iter().zip(&local.rank) {
                ranks[global] = rank - min;
            }
            monitor.report_progress((done + 1) as f64 / components.len() as f64);
        }
        Ok(Step::Done(ranks))
    }

    /// Groups nodes connected through any constraint, in order of their
    /// smallest member.
    fn components(&self) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..self.node_count).collect();
        fn find(parent: &mut [usize], mut node: usize) -> usize {
            while parent[node] != node {
                parent[node] = parent[parent[node]];
                node = parent[node];
            }
            node
        }
        for edge in &self.edges {
            let (a, b) = (find(&mut parent, edge.tail), find(&mut parent, edge.head));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        let mut slot_of_root = vec![usize::MAX; self.node_count];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for node in 0..self.node_count {
            let root = find(&mut parent, node);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = components.len();
                components.push(Vec::new());
            }
            components[slot_of_root[root]].push(node);
        }
        components
    }
}

/// One connected component with local node indices.
#[derive(Debug)]
struct Component {
    edges: Vec<Constraint>,
    /// Incident edge indices of every node.
    incident: Vec<Vec<usize>>,
    rank: Vec<f64>,
    /// Whether each edge belongs to the spanning tree.
    in_tree: Vec<bool>,
    /// Tree edge to the parent of each node; `None` for the root.
    parent_edge: Vec<Option<usize>>,
    cut_value: Vec<f64>,
    low: Vec<usize>,
    lim: Vec<usize>,
}

impl Component {
    fn extract(problem: &Problem, members: &[usize]) -> Self {
        let mut local = vec![usize::MAX; problem.node_count];
        for (index, &global) in members.iter().enumerate() {
            local[global] = index;
        }
        let edges: Vec<Constraint> = problem
            .edges
            .iter()
            .filter(|edge| local[edge.tail] != usize::MAX)
            .map(|edge| Constraint {
                tail: local[edge.tail],
                head: local[edge.head],
                ..*edge
            })
            .collect();

        let count = members.len();
        let mut incident = vec![Vec::new(); count];
        for (index, edge) in edges.iter().enumerate() {
            incident[edge.tail].push(index);
            if edge.head != edge.tail {
                incident[edge.head].push(index);
            }
        }
        let edge_count = edges.len();
        Self {
            edges,
            incident,
            rank: vec![0.0; count],
            in_tree: vec![false; edge_count],
            parent_edge: vec![None; count],
            cut_value: vec![0.0; count],
            low: vec![0; count],
            lim: vec![0; count],
        }
    }

    fn solve(
        &mut self,
        max_iterations: usize,
        stage: Stage,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<()>, StrataError> {
        if monitor.is_cancelled() {
            return Ok(Step::Cancelled);
        }
        self.longest_path(stage)?;
        self.feasible_tree(stage)?;
        self.init_low_lim();
        self.init_cut_values();

        let mut iterations = 0;
        while let Some(leaving) = self.leave_edge() {
            if iterations == max_iterations {
                trace!(iterations; "Network simplex stopped at the iteration cap");
                break;
            }
            if iterations % POLL_INTERVAL == POLL_INTERVAL - 1 && monitor.is_cancelled() {
                return Ok(Step::Cancelled);
            }
            let Some(entering) = self.enter_edge(leaving) else {
                break;
            };
            self.exchange(leaving, entering);
            iterations += 1;
        }
        trace!(iterations, nodes = self.rank.len(); "Network simplex component solved");
        Ok(Step::Done(()))
    }

    fn slack(&self, edge: usize) -> f64 {
        let edge = &self.edges[edge];
        self.rank[edge.head] - self.rank[edge.tail] - edge.min_len
    }

    /// Assigns every node the smallest rank that satisfies all constraints
    /// from its predecessors.
    fn longest_path(&mut self, stage: Stage) -> Result<(), StrataError> {
        let count = self.rank.len();
        let mut in_degree = vec![0usize; count];
        for edge in &self.edges {
            in_degree[edge.head] += 1;
        }
        let mut ready: Vec<usize> = (0..count).filter(|&node| in_degree[node] == 0).collect();
        let mut visited = 0;
        while let Some(node) = ready.pop() {
            visited += 1;
            for &index in &self.incident[node] {
                let edge = self.edges[index];
                if edge.tail != node {
                    continue;
                }
                self.rank[edge.head] = self.rank[edge.head].max(self.rank[node] + edge.min_len);
                in_degree[edge.head] -= 1;
                if in_degree[edge.head] == 0 {
                    ready.push(edge.head);
                }
            }
        }
        if visited != count {
            return Err(StrataError::consistency(
                stage,
                "constraint graph has a cycle",
            ));
        }
        Ok(())
    }

    /// Grows a spanning tree of tight edges from node 0, shifting the tree's
    /// ranks to tighten the minimum-slack edge leaving it whenever it stalls.
    fn feasible_tree(&mut self, stage: Stage) -> Result<(), StrataError> {
        let count = self.rank.len();
        let mut in_tree_node = vec![false; count];
        in_tree_node[0] = true;
        let mut size = 1;

        loop {
            size += self.grow_tight_tree(&mut in_tree_node);
            if size == count {
                return Ok(());
            }

            let crossing = (0..self.edges.len())
                .filter(|&index| {
                    let edge = &self.edges[index];
                    in_tree_node[edge.tail] != in_tree_node[edge.head]
                })
                .min_by(|&a, &b| self.slack(a).total_cmp(&self.slack(b)))
                .ok_or_else(|| {
                    StrataError::consistency(stage, "constraint component is disconnected")
                })?;
            let delta = if in_tree_node[self.edges[crossing].tail] {
                self.slack(crossing)
            } else {
                -self.slack(crossing)
            };
            for node in 0..count {
                if in_tree_node[node] {
                    self.rank[node] += delta;
                }
            }
        }
    }

    /// Adds every node reachable from the tree through tight edges and returns
    /// how many were added.
    fn grow_tight_tree(&mut self, in_tree_node: &mut [bool]) -> usize {
        let mut stack: Vec<usize> = (0..in_tree_node.len())
            .filter(|&node| in_tree_node[node])
            .collect();
        let mut added = 0;
        while let Some(node) = stack.pop() {
            for position in 0..self.incident[node].len() {
                let index = self.incident[node][position];
                let edge = self.edges[index];
                let other = if edge.tail == node { edge.head } else { edge.tail };
                if !in_tree_node[other] && self.slack(index).abs() <= TIGHT {
                    in_tree_node[other] = true;
                    self.in_tree[index] = true;
                    added += 1;
                    stack.push(other);
                }
            }
        }
        added
    }

    /// Numbers the tree in postorder from node 0 and records every node's
    /// parent edge.
    fn init_low_lim(&mut self) {
        let count = self.rank.len();
        let mut visited = vec![false; count];
        // (node, next incident position, low)
        let mut stack: Vec<(usize, usize, usize)> = Vec::new();
        let mut next_lim = 1;
        visited[0] = true;
        self.parent_edge[0] = None;
        stack.push((0, 0, next_lim));

        while let Some(frame) = stack.last_mut() {
            let (node, position, low) = *frame;
            if let Some(&index) = self.incident[node].get(position) {
                frame.1 += 1;
                if !self.in_tree[index] {
                    continue;
                }
                let edge = &self.edges[index];
                let child = if edge.tail == node { edge.head } else { edge.tail };
                if visited[child] {
                    continue;
                }
                visited[child] = true;
                self.parent_edge[child] = Some(index);
                stack.push((child, 0, next_lim));
            } else {
                self.low[node] = low;
                self.lim[node] = next_lim;
                next_lim += 1;
                stack.pop();
            }
        }
    }

    /// Computes the cut value of every tree edge, children before parents.
    fn init_cut_values(&mut self) {
        let mut order: Vec<usize> = (0..self.rank.len()).collect();
        order.sort_by_key(|&node| self.lim[node]);
        for node in order {
            if self.parent_edge[node].is_some() {
                self.cut_value[node] = self.calc_cut_value(node);
            }
        }
    }

    /// Cut value of the tree edge between `child` and its parent, from the
    /// cut values of the tree edges below it.
    fn calc_cut_value(&self, child: usize) -> f64 {
        let Some(tree_edge) = self.parent_edge[child] else {
            return 0.0;
        };
        let child_is_tail = self.edges[tree_edge].tail == child;
        let mut cut_value = self.edges[tree_edge].weight;

        for &index in &self.incident[child] {
            if index == tree_edge {
                continue;
            }
            let edge = &self.edges[index];
            let is_out_edge = edge.tail == child;
            let other = if is_out_edge { edge.head } else { edge.tail };
            let points_to_head = is_out_edge == child_is_tail;
            cut_value += if points_to_head {
                edge.weight
            } else {
                -edge.weight
            };
            if self.parent_edge[other] == Some(index) {
                let other_cut = self.cut_value[other];
                cut_value += if points_to_head { -other_cut } else { other_cut };
            }
        }
        cut_value
    }

    /// Returns the child end of a tree edge with a negative cut value.
    fn leave_edge(&self) -> Option<usize> {
        (0..self.rank.len())
            .find(|&node| self.parent_edge[node].is_some() && self.cut_value[node] < OPTIMAL)
    }

    fn is_descendant(&self, node: usize, root: usize) -> bool {
        self.low[root] <= self.lim[node] && self.lim[node] <= self.lim[root]
    }

    /// Finds the non-tree edge of minimum slack that reconnects the two parts
    /// left after removing the tree edge above `child`.
    fn enter_edge(&self, child: usize) -> Option<usize> {
        let tree_edge = self.parent_edge[child]?;
        let Constraint { tail, head, .. } = self.edges[tree_edge];
        let (subtree, flip) = if self.lim[tail] > self.lim[head] {
            (head, true)
        } else {
            (tail, false)
        };

        (0..self.edges.len())
            .filter(|&index| {
                let edge = &self.edges[index];
                flip == self.is_descendant(edge.tail, subtree)
                    && flip != self.is_descendant(edge.head, subtree)
            })
            .min_by(|&a, &b| self.slack(a).total_cmp(&self.slack(b)))
    }

    fn exchange(&mut self, child: usize, entering: usize) {
        if let Some(leaving) = self.parent_edge[child] {
            self.in_tree[leaving] = false;
        }
        self.in_tree[entering] = true;
        self.init_low_lim();
        self.init_cut_values();
        self.update_ranks();
    }

    /// Recomputes ranks from the root so that every tree edge is tight.
    fn update_ranks(&mut self) {
        let mut order: Vec<usize> = (0..self.rank.len()).collect();
        order.sort_by_key(|&node| std::cmp::Reverse(self.lim[node]));
        for node in order {
            let Some(index) = self.parent_edge[node] else {
                continue;
            };
            let edge = self.edges[index];
            self.rank[node] = if edge.tail == node {
                self.rank[edge.head] - edge.min_len
            } else {
                self.rank[edge.tail] + edge.min_len
            };
        }
    }
}
