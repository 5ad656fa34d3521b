//! Coordinate assignment and compaction.
//!
//! ```text
//!   layered:  layer axis ──▶ placement (y) ──▶ compaction (x)
//!   tree:     reduce ──▶ tree placement ──▶ restore
//! ```

pub mod compaction;
pub mod placement;
pub mod tree;

pub use compaction::GraphCompactor;
pub use placement::{NodePlacementPhase, NodePlacer, PlacerRegistry};
pub use tree::TreePlacer;
