//! Core use-case services.
//!
//! # Responsibility
//! - Enforce relationship invariants above the person store.
//! - Orchestrate store, layout and drag gestures into use-case level APIs.
//! - Keep UI/FFI layers decoupled from graph internals.

pub mod assignment;
pub mod family_tree;
pub mod relationship_manager;
