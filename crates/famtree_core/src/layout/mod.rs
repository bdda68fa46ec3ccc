//! Automatic family tree layout.
//!
//! # Responsibility
//! - Convert the relationship graph into node positions per generation.
//! - Produce connector polylines for parent/child and spouse links.
//!
//! # Invariants
//! - Layout never mutates relationships. Callers decide whether to cache
//!   positions back into the store.

pub mod config;
pub mod connector;
pub mod engine;

pub use config::{LayoutConfig, LayoutConfigError};
pub use connector::{Connector, ConnectorKind, NodeBox, Segment};
pub use engine::{compute_layout, couple_partner, pair_couples, LayoutUnit, TreeLayout};
