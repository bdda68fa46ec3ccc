//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose one family tree per `FamilyTreeHandle` to Dart via FRB.
//! - Translate ids to strings and core errors to response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every id crossing the boundary is a hyphenated UUID string.
//! - A failed call leaves the tree unchanged.

use famtree_core::{
    confirm, core_version as core_version_inner, default_log_level as default_log_level_inner,
    init_logging as init_logging_inner, suggest_other_parent, AssignmentOption,
    AssignmentOutcome, AssignmentProposal, ConnectorKind, CoupleRoles, DragSession, FamilyTree,
    Gender, ParentRole, Person, PersonFields, PersonId, ReplacePolicy,
};
use log::warn;
use uuid::Uuid;

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Returns the log level matching the native build mode.
#[flutter_rust_bridge::frb(sync)]
pub fn default_log_level() -> String {
    default_log_level_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope for tree mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Person created or affected, when there is one.
    pub person_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TreeActionResponse {
    fn success(message: impl Into<String>, person_id: Option<PersonId>) -> Self {
        Self {
            ok: true,
            person_id: person_id.map(|id| id.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            person_id: None,
            message: message.into(),
        }
    }
}

/// Read-only person projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonView {
    pub id: String,
    pub name: String,
    /// `male|female|unknown`.
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub place_of_birth: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    pub mother_id: Option<String>,
    pub father_id: Option<String>,
    pub spouse_ids: Vec<String>,
    pub children_ids: Vec<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Placed node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub person_id: String,
    /// Top-left corner.
    pub x: f64,
    pub y: f64,
    pub generation: u32,
}

/// One straight connector piece.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentView {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorView {
    /// `parent_child|parents|spouses`.
    pub kind: String,
    pub person_ids: Vec<String>,
    pub segments: Vec<SegmentView>,
}

/// Layout response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResponse {
    pub nodes: Vec<NodeView>,
    pub connectors: Vec<ConnectorView>,
    pub node_width: f64,
    pub node_height: f64,
}

/// One option the UI can confirm after a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOptionView {
    /// `child_of|spouse_of|child_of_couple`.
    pub kind: String,
    pub person_ids: Vec<String>,
}

/// Drop/confirmation response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropResponse {
    pub ok: bool,
    /// Options awaiting confirmation; empty once applied or cancelled.
    pub options: Vec<DropOptionView>,
    /// True when confirming would replace an existing parent.
    pub needs_replace_confirmation: bool,
    pub message: String,
}

impl DropResponse {
    fn idle(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            options: Vec::new(),
            needs_replace_confirmation: false,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            options: Vec::new(),
            needs_replace_confirmation: false,
            message: message.into(),
        }
    }
}

/// One family tree plus its drag gesture state.
#[flutter_rust_bridge::frb(opaque)]
#[derive(Debug, Default)]
pub struct FamilyTreeHandle {
    tree: FamilyTree,
    drag: DragSession,
    pending: Option<AssignmentProposal>,
}

impl FamilyTreeHandle {
    /// Creates an empty tree.
    #[flutter_rust_bridge::frb(sync)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a person without relationships.
    ///
    /// # FFI contract
    /// - Never panics.
    /// - Returns the created id on success.
    #[flutter_rust_bridge::frb(sync)]
    pub fn add_person(
        &mut self,
        name: String,
        gender: String,
        date_of_birth: Option<String>,
        date_of_death: Option<String>,
    ) -> TreeActionResponse {
        let person = new_person(name, &gender, date_of_birth, date_of_death);
        match self.tree.add_person(person) {
            Ok(id) => TreeActionResponse::success("Person added.", Some(id)),
            Err(err) => TreeActionResponse::failure(format!("add_person failed: {err}")),
        }
    }

    /// Replaces editable attributes of one person.
    #[flutter_rust_bridge::frb(sync)]
    #[allow(clippy::too_many_arguments)]
    pub fn update_person(
        &mut self,
        person_id: String,
        name: String,
        gender: String,
        date_of_birth: Option<String>,
        date_of_death: Option<String>,
        place_of_birth: Option<String>,
        occupation: Option<String>,
        notes: Option<String>,
    ) -> TreeActionResponse {
        let id = match parse_id(&person_id) {
            Ok(id) => id,
            Err(message) => return TreeActionResponse::failure(message),
        };
        let fields = PersonFields {
            name,
            date_of_birth: non_blank(date_of_birth),
            date_of_death: non_blank(date_of_death),
            gender: Gender::from_label(&gender),
            place_of_birth: non_blank(place_of_birth),
            occupation: non_blank(occupation),
            notes: non_blank(notes),
        };
        match self.tree.update_person_fields(id, fields) {
            Ok(()) => TreeActionResponse::success("Person updated.", Some(id)),
            Err(err) => TreeActionResponse::failure(format!("update_person failed: {err}")),
        }
    }

    /// Deletes a person and every reference to it. Missing ids are a no-op.
    #[flutter_rust_bridge::frb(sync)]
    pub fn remove_person(&mut self, person_id: String) -> TreeActionResponse {
        let id = match parse_id(&person_id) {
            Ok(id) => id,
            Err(message) => return TreeActionResponse::failure(message),
        };
        match self.tree.remove_person(id) {
            Some(_) => TreeActionResponse::success("Person removed.", Some(id)),
            None => TreeActionResponse::success("Person already absent.", None),
        }
    }

    /// Links `child_id` under `parent_id`. `role` is `mother|father`.
    #[flutter_rust_bridge::frb(sync)]
    pub fn set_parent(
        &mut self,
        parent_id: String,
        child_id: String,
        role: String,
    ) -> TreeActionResponse {
        let (parent, child) = match parse_pair(&parent_id, &child_id) {
            Ok(pair) => pair,
            Err(message) => return TreeActionResponse::failure(message),
        };
        let Some(role) = ParentRole::parse(&role) else {
            return TreeActionResponse::failure(format!(
                "set_parent failed: unsupported role `{role}`; expected mother|father"
            ));
        };
        match self.tree.set_parent_child(parent, child, role) {
            Ok(change) => TreeActionResponse::success(format!("Parent link {change:?}."), Some(child)),
            Err(err) => TreeActionResponse::failure(format!("set_parent failed: {err}")),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn remove_parent(&mut self, parent_id: String, child_id: String) -> TreeActionResponse {
        match parse_pair(&parent_id, &child_id) {
            Ok((parent, child)) => {
                let removed = self.tree.remove_parent_child(parent, child);
                TreeActionResponse::success(removed_message(removed), Some(child))
            }
            Err(message) => TreeActionResponse::failure(message),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn set_spouse(&mut self, a_id: String, b_id: String) -> TreeActionResponse {
        let (a, b) = match parse_pair(&a_id, &b_id) {
            Ok(pair) => pair,
            Err(message) => return TreeActionResponse::failure(message),
        };
        match self.tree.set_spouse(a, b) {
            Ok(change) => TreeActionResponse::success(format!("Spouse link {change:?}."), Some(a)),
            Err(err) => TreeActionResponse::failure(format!("set_spouse failed: {err}")),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn remove_spouse(&mut self, a_id: String, b_id: String) -> TreeActionResponse {
        match parse_pair(&a_id, &b_id) {
            Ok((a, b)) => {
                let removed = self.tree.remove_spouse(a, b);
                TreeActionResponse::success(removed_message(removed), Some(a))
            }
            Err(message) => TreeActionResponse::failure(message),
        }
    }

    /// Adds a new child of `parent_id` (and of the parent's partner).
    ///
    /// `role` overrides gender inference; pass `None` to infer.
    #[flutter_rust_bridge::frb(sync)]
    pub fn add_child_of(
        &mut self,
        parent_id: String,
        name: String,
        gender: String,
        role: Option<String>,
    ) -> TreeActionResponse {
        let parent = match parse_id(&parent_id) {
            Ok(id) => id,
            Err(message) => return TreeActionResponse::failure(message),
        };
        let role = match role.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => match ParentRole::parse(value) {
                Some(role) => Some(role),
                None => {
                    return TreeActionResponse::failure(format!(
                        "add_child_of failed: unsupported role `{value}`; expected mother|father"
                    ))
                }
            },
            None => None,
        };
        let person = new_person(name, &gender, None, None);
        match self.tree.add_child_of(parent, person, role) {
            Ok(id) => TreeActionResponse::success("Child added.", Some(id)),
            Err(err) => TreeActionResponse::failure(format!("add_child_of failed: {err}")),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn add_spouse_of(
        &mut self,
        person_id: String,
        name: String,
        gender: String,
    ) -> TreeActionResponse {
        let person = match parse_id(&person_id) {
            Ok(id) => id,
            Err(message) => return TreeActionResponse::failure(message),
        };
        match self
            .tree
            .add_spouse_of(person, new_person(name, &gender, None, None))
        {
            Ok(id) => TreeActionResponse::success("Spouse added.", Some(id)),
            Err(err) => TreeActionResponse::failure(format!("add_spouse_of failed: {err}")),
        }
    }

    /// Persons in store order.
    #[flutter_rust_bridge::frb(sync)]
    pub fn list_persons(&self) -> Vec<PersonView> {
        self.tree.all().map(to_person_view).collect()
    }

    /// Suggests the partner of `parent_id` for the child's empty parent slot.
    ///
    /// Returns a failure envelope when there is nothing to suggest.
    #[flutter_rust_bridge::frb(sync)]
    pub fn suggest_other_parent(&self, child_id: String, parent_id: String) -> TreeActionResponse {
        let (child, parent) = match parse_pair(&child_id, &parent_id) {
            Ok(pair) => pair,
            Err(message) => return TreeActionResponse::failure(message),
        };
        match suggest_other_parent(&self.tree, child, parent) {
            Some(suggestion) => TreeActionResponse::success(
                suggestion.role.as_str(),
                Some(suggestion.person),
            ),
            None => TreeActionResponse::failure("No suggestion."),
        }
    }

    /// Computes the layout and caches positions on the tree.
    #[flutter_rust_bridge::frb(sync)]
    pub fn compute_layout(&mut self) -> LayoutResponse {
        let layout = self.tree.compute_layout();
        let config = *self.tree.layout_config();
        let nodes = self
            .tree
            .store()
            .ids()
            .iter()
            .filter_map(|id| {
                let point = layout.position(*id)?;
                Some(NodeView {
                    person_id: id.to_string(),
                    x: point.x,
                    y: point.y,
                    generation: layout
                        .generations
                        .get(id)
                        .map(|depth| u32::try_from(*depth).unwrap_or(u32::MAX))
                        .unwrap_or_default(),
                })
            })
            .collect();
        let connectors = layout
            .connectors
            .iter()
            .map(|connector| {
                let (kind, ids) = match connector.kind {
                    ConnectorKind::ParentChild { parent, child } => {
                        ("parent_child", vec![parent, child])
                    }
                    ConnectorKind::Parents { parents, child } => {
                        ("parents", vec![parents[0], parents[1], child])
                    }
                    ConnectorKind::Spouses { a, b } => ("spouses", vec![a, b]),
                };
                ConnectorView {
                    kind: kind.to_string(),
                    person_ids: ids.iter().map(ToString::to_string).collect(),
                    segments: connector
                        .segments
                        .iter()
                        .map(|segment| SegmentView {
                            x1: segment.start.x,
                            y1: segment.start.y,
                            x2: segment.end.x,
                            y2: segment.end.y,
                        })
                        .collect(),
                }
            })
            .collect();
        LayoutResponse {
            nodes,
            connectors,
            node_width: config.node_width,
            node_height: config.node_height,
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn drag_start(&mut self, person_id: String) -> TreeActionResponse {
        let id = match parse_id(&person_id) {
            Ok(id) => id,
            Err(message) => return TreeActionResponse::failure(message),
        };
        self.pending = None;
        match self.drag.drag_start(&self.tree, id) {
            Ok(()) => TreeActionResponse::success("Drag started.", Some(id)),
            Err(err) => TreeActionResponse::failure(format!("drag_start failed: {err}")),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn drag_move(&mut self, x: f64, y: f64) -> TreeActionResponse {
        if !x.is_finite() || !y.is_finite() {
            return TreeActionResponse::failure("drag_move failed: coordinates must be finite");
        }
        match self.drag.drag_move(&mut self.tree, x, y) {
            Ok(()) => TreeActionResponse::success("Moved.", self.drag.dragged()),
            Err(err) => TreeActionResponse::failure(format!("drag_move failed: {err}")),
        }
    }

    /// Ends the drag over `target_id` (or empty space when `None`).
    ///
    /// Offered options stay pending until `confirm_drop` or `cancel_drop`.
    #[flutter_rust_bridge::frb(sync)]
    pub fn drag_release(&mut self, target_id: Option<String>) -> DropResponse {
        let target = match target_id.as_deref().map(parse_id).transpose() {
            Ok(target) => target,
            Err(message) => {
                self.drag.cancel();
                return DropResponse::failure(message);
            }
        };
        match self.drag.drag_release(&self.tree, target) {
            Ok(Some(proposal)) => {
                let options = proposal.options.iter().map(to_option_view).collect();
                self.pending = Some(proposal);
                DropResponse {
                    ok: true,
                    options,
                    needs_replace_confirmation: false,
                    message: "Choose a relationship.".to_string(),
                }
            }
            Ok(None) => DropResponse::idle("Nothing to assign."),
            Err(err) => DropResponse::failure(format!("drag_release failed: {err}")),
        }
    }

    /// Confirms option `index` of the pending drop.
    ///
    /// Input semantics:
    /// - `replace`: apply even when an existing parent would be replaced.
    /// - `mother_id`: manual role choice. For "child of" it names the target
    ///   as mother (equal to it) or father (anything else); for "child of
    ///   couple" it names the mother member.
    #[flutter_rust_bridge::frb(sync)]
    pub fn confirm_drop(
        &mut self,
        index: u32,
        replace: bool,
        mother_id: Option<String>,
    ) -> DropResponse {
        let Some(proposal) = self.pending.clone() else {
            return DropResponse::failure("confirm_drop failed: no pending drop");
        };
        let Some(option) = usize::try_from(index)
            .ok()
            .and_then(|index| proposal.options.get(index))
            .copied()
        else {
            return DropResponse::failure(format!("confirm_drop failed: no option {index}"));
        };
        let mother = match mother_id.as_deref().map(parse_id).transpose() {
            Ok(mother) => mother,
            Err(message) => return DropResponse::failure(message),
        };
        let option = with_manual_roles(option, mother);
        let policy = if replace {
            ReplacePolicy::Replace
        } else {
            ReplacePolicy::Ask
        };

        match confirm(&mut self.tree, &proposal, option, policy) {
            Ok(AssignmentOutcome::Applied { .. }) => {
                self.pending = None;
                DropResponse::idle("Relationship assigned.")
            }
            Ok(AssignmentOutcome::NeedsReplaceConfirmation { replacements }) => DropResponse {
                ok: true,
                options: proposal.options.iter().map(to_option_view).collect(),
                needs_replace_confirmation: true,
                message: format!("{} existing parent(s) would be replaced.", replacements.len()),
            },
            Err(err) => {
                warn!("event=confirm_drop module=ffi status=error");
                DropResponse {
                    ok: false,
                    options: proposal.options.iter().map(to_option_view).collect(),
                    needs_replace_confirmation: false,
                    message: format!("confirm_drop failed: {err}"),
                }
            }
        }
    }

    /// Drops the pending proposal without mutating the tree.
    #[flutter_rust_bridge::frb(sync)]
    pub fn cancel_drop(&mut self) -> DropResponse {
        self.pending = None;
        self.drag.cancel();
        DropResponse::idle("Cancelled.")
    }

    /// Forgets dragged and cached positions so the next layout is automatic.
    #[flutter_rust_bridge::frb(sync)]
    pub fn clear_manual_positions(&mut self) -> TreeActionResponse {
        self.tree.clear_layout_positions();
        TreeActionResponse::success("Positions cleared.", None)
    }

    /// Empties the tree.
    #[flutter_rust_bridge::frb(sync)]
    pub fn reset(&mut self) -> TreeActionResponse {
        self.tree.reset();
        self.drag.cancel();
        self.pending = None;
        TreeActionResponse::success("Tree reset.", None)
    }
}

fn new_person(
    name: String,
    gender: &str,
    date_of_birth: Option<String>,
    date_of_death: Option<String>,
) -> Person {
    let mut person = Person::new(name.trim()).with_gender(Gender::from_label(gender));
    person.date_of_birth = non_blank(date_of_birth);
    person.date_of_death = non_blank(date_of_death);
    person
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn parse_id(raw: &str) -> Result<PersonId, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| format!("invalid person id `{raw}`: {err}"))
}

fn parse_pair(first: &str, second: &str) -> Result<(PersonId, PersonId), String> {
    Ok((parse_id(first)?, parse_id(second)?))
}

fn removed_message(removed: bool) -> &'static str {
    if removed {
        "Link removed."
    } else {
        "Link already absent."
    }
}

fn with_manual_roles(option: AssignmentOption, mother: Option<PersonId>) -> AssignmentOption {
    let Some(mother) = mother else {
        return option;
    };
    match option {
        AssignmentOption::ChildOf { parent, .. } => AssignmentOption::ChildOf {
            parent,
            role: Some(if mother == parent {
                ParentRole::Mother
            } else {
                ParentRole::Father
            }),
        },
        AssignmentOption::ChildOfCouple { first, second, .. } => {
            let father = if mother == first { second } else { first };
            AssignmentOption::ChildOfCouple {
                first,
                second,
                roles: Some(CoupleRoles { mother, father }),
            }
        }
        AssignmentOption::SpouseOf { .. } => option,
    }
}

fn to_option_view(option: &AssignmentOption) -> DropOptionView {
    let (kind, ids) = match option {
        AssignmentOption::ChildOf { parent, .. } => ("child_of", vec![*parent]),
        AssignmentOption::SpouseOf { spouse } => ("spouse_of", vec![*spouse]),
        AssignmentOption::ChildOfCouple { first, second, .. } => {
            ("child_of_couple", vec![*first, *second])
        }
    };
    DropOptionView {
        kind: kind.to_string(),
        person_ids: ids.iter().map(ToString::to_string).collect(),
    }
}

fn to_person_view(person: &Person) -> PersonView {
    let position = person.layout_position();
    PersonView {
        id: person.id.to_string(),
        name: person.name.clone(),
        gender: person.gender.as_str().to_string(),
        date_of_birth: person.date_of_birth.clone(),
        date_of_death: person.date_of_death.clone(),
        place_of_birth: person.place_of_birth.clone(),
        occupation: person.occupation.clone(),
        notes: person.notes.clone(),
        mother_id: person.mother_id().map(|id| id.to_string()),
        father_id: person.father_id().map(|id| id.to_string()),
        spouse_ids: person.spouse_ids().iter().map(ToString::to_string).collect(),
        children_ids: person.children_ids().iter().map(ToString::to_string).collect(),
        x: position.map(|point| point.x),
        y: position.map(|point| point.y),
    }
}
