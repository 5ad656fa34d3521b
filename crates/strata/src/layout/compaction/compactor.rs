//! Compaction passes over a [`ConstraintGraph`].

use log::{debug, trace};
use petgraph::graph::NodeIndex;

use super::constraint_graph::{CompactionLock, ConstraintGraph};
use crate::{
    error::{Stage, StrataError},
    layout::placement::TOLERANCE,
    progress::{ProgressMonitor, Step},
};

/// Moves the groups of a constraint graph, one pass at a time.
pub(super) struct Compactor<'a> {
    constraints: &'a mut ConstraintGraph,
    stage: Stage,
}

impl<'a> Compactor<'a> {
    pub fn new(constraints: &'a mut ConstraintGraph, stage: Stage) -> Self {
        Self { constraints, stage }
    }

    /// Moves every group as far toward x = 0 as its predecessors allow.
    pub fn compact_left(&mut self) -> Result<(), StrataError> {
        let order = self.constraints.order().to_vec();
        for group in order {
            let required = self
                .constraints
                .predecessors(group)
                .map(|(predecessor, separation)| {
                    self.constraints.group(predecessor).position() + separation
                })
                .fold(f64::NEG_INFINITY, f64::max);
            let current = self.constraints.group(group).position();
            let lock = self.constraints.group_lock(group);

            let target = if lock.allows_left() {
                required.max(0.0)
            } else {
                required.max(current)
            };
            if target > current + TOLERANCE && !lock.allows_right() {
                return Err(self.locked_conflict(group, "left"));
            }
            self.constraints.set_position(group, target);
        }
        debug!(width = self.constraints.trailing_edge(); "Left compaction pass done");
        Ok(())
    }

    /// Moves every group as far toward the trailing edge as its successors
    /// allow.
    ///
    /// The trailing edge is the current right edge of the drawing, widened to
    /// the narrowest width at which every constraint holds from x = 0, so
    /// overlapping input never pushes a group below zero.
    pub fn compact_right(&mut self) -> Result<(), StrataError> {
        let trailing = self.feasible_trailing_edge();
        let order = self.constraints.order().to_vec();
        for group in order.into_iter().rev() {
            let allowed = self
                .constraints
                .successors(group)
                .map(|(successor, separation)| {
                    self.constraints.group(successor).position() - separation
                })
                .fold(f64::INFINITY, f64::min);
            let current = self.constraints.group(group).position();
            let lock = self.constraints.group_lock(group);

            let target = if lock.allows_right() {
                allowed.min(trailing - self.constraints.group(group).extent())
            } else {
                allowed.min(current)
            };
            if target < current - TOLERANCE && !lock.allows_left() {
                return Err(self.locked_conflict(group, "right"));
            }
            self.constraints.set_position(group, target);
        }
        debug!(width = self.constraints.trailing_edge(); "Right compaction pass done");
        Ok(())
    }

    /// Larger of the current trailing edge and the right edge a left pass
    /// would produce.
    fn feasible_trailing_edge(&self) -> f64 {
        let mut required = vec![0.0; self.constraints.group_count()];
        let mut extent = self.constraints.trailing_edge();
        for &group in self.constraints.order() {
            let lower = self
                .constraints
                .predecessors(group)
                .map(|(predecessor, separation)| required[predecessor.index()] + separation)
                .fold(0.0, f64::max);
            let cgroup = self.constraints.group(group);
            let position = if self.constraints.group_lock(group).allows_left() {
                lower
            } else {
                lower.max(cgroup.position())
            };
            required[group.index()] = position;
            extent = extent.max(position + cgroup.extent());
        }
        extent
    }

    /// Locks every CNode an upstream phase fixed along the layer axis.
    pub fn lock_constrained(&mut self) {
        let constrained: Vec<usize> = (0..self.constraints.cnodes().len())
            .filter(|&cnode| self.constraints.cnodes()[cnode].is_constrained())
            .collect();
        trace!(count = constrained.len(); "Locking constrained nodes");
        for cnode in constrained {
            self.constraints.lock(cnode, CompactionLock::Locked);
        }
    }

    /// Locks every CNode against moving toward the side with fewer
    /// connections, comparing group centers.
    pub fn lock_by_connections(&mut self) {
        let count = self.constraints.cnodes().len();
        let mut left = vec![0usize; count];
        let mut right = vec![0usize; count];
        for connection in self.constraints.connections() {
            let source_group = self.constraints.cnodes()[connection.source].group();
            let target_group = self.constraints.cnodes()[connection.target].group();
            let source_center = self.constraints.group_center_x(source_group);
            let target_center = self.constraints.group_center_x(target_group);
            if target_center > source_center {
                right[connection.source] += 1;
                left[connection.target] += 1;
            } else if target_center < source_center {
                left[connection.source] += 1;
                right[connection.target] += 1;
            }
        }

        for cnode in 0..count {
            let lock = match right[cnode].cmp(&left[cnode]) {
                std::cmp::Ordering::Less => CompactionLock::LockedRight,
                std::cmp::Ordering::Greater => CompactionLock::LockedLeft,
                std::cmp::Ordering::Equal => CompactionLock::Free,
            };
            self.constraints.lock(cnode, lock);
        }
    }

    /// Coordinate descent toward the weighted median of each group's
    /// connection targets, within the room its neighbors leave it.
    ///
    /// Stops after a sweep in which no group moved more than `threshold`,
    /// or after `max_iterations` sweeps.
    pub fn minimize_edge_length(
        &mut self,
        max_iterations: usize,
        threshold: f64,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Step<()>, StrataError> {
        let trailing = self.constraints.trailing_edge();
        let order = self.constraints.order().to_vec();

        for iteration in 0..max_iterations {
            if monitor.is_cancelled() {
                return Ok(Step::Cancelled);
            }
            let mut largest_move: f64 = 0.0;
            for &group in &order {
                let Some(desired) = self.median_target(group) else {
                    continue;
                };
                let (lower, upper) = self.room(group, trailing);
                if lower > upper + TOLERANCE {
                    return Err(self.locked_conflict(group, "edge length"));
                }
                let current = self.constraints.group(group).position();
                let target = desired.clamp(lower, upper.max(lower));
                largest_move = largest_move.max((target - current).abs());
                self.constraints.set_position(group, target);
            }
            trace!(iteration, largest_move; "Edge length sweep");
            monitor.report_progress((iteration + 1) as f64 / max_iterations as f64);
            if largest_move <= threshold {
                debug!(sweeps = iteration + 1; "Edge length compaction converged");
                break;
            }
        }
        Ok(Step::Done(()))
    }

    /// Range of positions that keeps every constraint and lock of `group`.
    fn room(&self, group: NodeIndex, trailing: f64) -> (f64, f64) {
        let current = self.constraints.group(group).position();
        let lock = self.constraints.group_lock(group);

        let required = self
            .constraints
            .predecessors(group)
            .map(|(predecessor, separation)| {
                self.constraints.group(predecessor).position() + separation
            })
            .fold(f64::NEG_INFINITY, f64::max);
        let allowed = self
            .constraints
            .successors(group)
            .map(|(successor, separation)| {
                self.constraints.group(successor).position() - separation
            })
            .fold(f64::INFINITY, f64::min);

        let lower = if lock.allows_left() {
            required.max(0.0)
        } else {
            required.max(current)
        };
        let upper = if lock.allows_right() {
            allowed.min(trailing - self.constraints.group(group).extent())
        } else {
            allowed.min(current)
        };
        (lower, upper)
    }

    /// Weighted median of the positions that would center each member on the
    /// other end of its connections.
    fn median_target(&self, group: NodeIndex) -> Option<f64> {
        let members = self.constraints.group(group).members();
        let mut targets: Vec<(f64, f64)> = self
            .constraints
            .connections()
            .iter()
            .filter_map(|connection| {
                let (own, other) = if members.contains(&connection.source) {
                    (connection.source, connection.target)
                } else if members.contains(&connection.target) {
                    (connection.target, connection.source)
                } else {
                    return None;
                };
                let offset = self.constraints.center_x(own) - self.constraints.group(group).position();
                let target = self.constraints.center_x(other) - offset;
                Some((target, f64::from(connection.weight)))
            })
            .collect();
        if targets.is_empty() {
            return None;
        }

        targets.sort_by(|a, b| a.0.total_cmp(&b.0));
        let half = targets.iter().map(|(_, weight)| weight).sum::<f64>() / 2.0;
        let mut accumulated = 0.0;
        for (slot, &(target, weight)) in targets.iter().enumerate() {
            accumulated += weight;
            if accumulated > half {
                return Some(target);
            }
            if accumulated == half {
                let next = targets.get(slot + 1).map_or(target, |&(next, _)| next);
                return Some((target + next) / 2.0);
            }
        }
        targets.last().map(|&(target, _)| target)
    }

    fn locked_conflict(&self, group: NodeIndex, pass: &str) -> StrataError {
        let first = self.constraints.group(group).members()[0];
        StrataError::consistency(
            self.stage,
            format!(
                "{pass} pass must move the locked group of node {} against its lock",
                self.constraints.cnodes()[first].node()
            ),
        )
    }
}
