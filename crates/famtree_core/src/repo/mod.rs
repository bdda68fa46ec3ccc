//! Person storage.
//!
//! # Responsibility
//! - Own person records and their insertion order.
//! - Isolate record storage from relationship orchestration.
//!
//! # Invariants
//! - The store never repairs references on its own. Relationship writes and
//!   cascading delete belong to `service::relationship_manager`.

pub mod person_store;
