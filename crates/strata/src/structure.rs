//! Graph models shared by every layout component.
//!
//! - [`LayeredGraph`] holds nodes partitioned into ordered layers, consumed by
//!   node placement and compaction.
//! - [`TGraph`] holds a rooted graph drawn as a tree, together with its
//!   [`EdgeReduction`] state.
//!
//! Both are arenas: nodes and edges are addressed by typed handles that stay
//! valid for the lifetime of the graph.

mod arena;
mod layered;
mod tree;

pub use arena::Handle;
pub use layered::{EdgeId, LEdge, LNode, LayeredGraph, NodeId, NodeKind};
pub use tree::{EdgeReduction, TEdge, TEdgeId, TGraph, TNode, TNodeId};
