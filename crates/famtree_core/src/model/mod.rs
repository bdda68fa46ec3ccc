//! Family tree domain model.
//!
//! # Responsibility
//! - Define canonical person records and the geometry cached on them.
//! - Keep relationship fields read-only outside the crate.
//!
//! # Invariants
//! - Every person is identified by a stable `PersonId`.
//! - Relationships are stored once, as id fields plus derived sets.

pub mod geometry;
pub mod person;
