//! Core domain logic for famtree.
//! This crate is the single source of truth for family graph invariants,
//! automatic layout and drag-and-drop relationship assignment.

pub mod layout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use layout::{
    compute_layout, Connector, ConnectorKind, LayoutConfig, LayoutConfigError, LayoutUnit,
    Segment, TreeLayout,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geometry::Point;
pub use model::person::{Gender, Person, PersonFields, PersonId, PersonValidationError};
pub use repo::person_store::{PersonStore, StoreError};
pub use service::assignment::{
    confirm, propose, suggest_other_parent, AssignmentError, AssignmentOption,
    AssignmentOutcome, AssignmentProposal, AssignmentResult, CoupleRoles, DragSession,
    ParentReplacement, ParentSuggestion, ReplacePolicy,
};
pub use service::family_tree::FamilyTree;
pub use service::relationship_manager::{
    LinkChange, ParentRole, ReconcileReport, Relationship, RelationshipError, RelationshipKind,
    RelationshipManager, RelationshipResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
