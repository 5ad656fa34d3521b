//! Strata Core Types
//!
//! This crate provides the foundational types shared by the Strata layout
//! crates:
//!
//! - **Identifiers**: String-interned node labels ([`identifier::Id`])
//! - **Geometry**: Points, sizes and bounds ([`geometry`] module)

pub mod geometry;
pub mod identifier;
