//! Drag-and-drop relationship assignment.
//!
//! # Responsibility
//! - Turn "drop A on B" gestures into relationship proposals.
//! - Infer mother/father roles from gender tags and ask before replacing an
//!   existing parent.
//! - Track the drag gesture and move couple partners together.
//!
//! # Invariants
//! - Proposing and cancelling never mutate relationships.
//! - Confirming applies the whole option or nothing.
//! - Every mutation goes through `FamilyTree`/`RelationshipManager`.

use crate::model::geometry::Point;
use crate::model::person::{Gender, Person, PersonId};
use crate::service::family_tree::FamilyTree;
use crate::service::relationship_manager::{
    parent_in_role, LinkChange, ParentRole, RelationshipError,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by assignment operations.
pub type AssignmentResult<T> = Result<T, AssignmentError>;

/// Errors from assignment operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    /// Relationship-level rejection (not found, cycle, ambiguous role, ...).
    Relationship(RelationshipError),
    /// Confirmed option was not part of the proposal.
    NotOffered,
    /// Drag event arrived without an active drag.
    NoDragInProgress,
}

impl Display for AssignmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relationship(err) => write!(f, "{err}"),
            Self::NotOffered => write!(f, "option was not offered for this drop"),
            Self::NoDragInProgress => write!(f, "no drag in progress"),
        }
    }
}

impl Error for AssignmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Relationship(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RelationshipError> for AssignmentError {
    fn from(value: RelationshipError) -> Self {
        Self::Relationship(value)
    }
}

/// Explicit mother/father choice for a couple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoupleRoles {
    pub mother: PersonId,
    pub father: PersonId,
}

/// One relationship a drop can turn into.
///
/// `role`/`roles` are `None` in proposals; a caller sets them to resolve an
/// ambiguous gender manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AssignmentOption {
    /// Dragged person becomes a child of `parent`.
    ChildOf {
        parent: PersonId,
        role: Option<ParentRole>,
    },
    /// Dragged person and `spouse` become spouses.
    SpouseOf { spouse: PersonId },
    /// Dragged person becomes a child of both members of a couple.
    ChildOfCouple {
        first: PersonId,
        second: PersonId,
        roles: Option<CoupleRoles>,
    },
}

impl AssignmentOption {
    /// Same option kind and targets, ignoring role overrides.
    fn same_offer(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ChildOf { parent: a, .. }, Self::ChildOf { parent: b, .. }) => a == b,
            (Self::SpouseOf { spouse: a }, Self::SpouseOf { spouse: b }) => a == b,
            (
                Self::ChildOfCouple { first, second, .. },
                Self::ChildOfCouple {
                    first: other_first,
                    second: other_second,
                    ..
                },
            ) => first == other_first && second == other_second,
            _ => false,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::ChildOf { .. } => "child_of",
            Self::SpouseOf { .. } => "spouse_of",
            Self::ChildOfCouple { .. } => "child_of_couple",
        }
    }
}

/// Options offered for one drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentProposal {
    pub dragged: PersonId,
    pub target: PersonId,
    pub options: Vec<AssignmentOption>,
}

/// What to do when a confirmed option would replace an existing parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Stop and report the replacement.
    #[default]
    Ask,
    /// Replace without asking.
    Replace,
}

/// Existing parent that a confirmed option would unlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentReplacement {
    pub role: ParentRole,
    pub current: PersonId,
    pub proposed: PersonId,
}

/// Result of confirming an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// Links were applied, one change per link.
    Applied { changes: Vec<LinkChange> },
    /// Nothing applied; confirm again with `ReplacePolicy::Replace`.
    NeedsReplaceConfirmation { replacements: Vec<ParentReplacement> },
}

/// Spouse suggested for the child's empty parent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentSuggestion {
    pub person: PersonId,
    pub role: ParentRole,
}

/// Infers mother/father for a couple from gender tags.
///
/// A single male member is the father. Otherwise a single female member is
/// the mother. Both male, both female and both unknown stay undecided.
pub fn infer_couple_roles(first: &Person, second: &Person) -> Option<CoupleRoles> {
    let assign = |mother: &Person, father: &Person| CoupleRoles {
        mother: mother.id,
        father: father.id,
    };
    match (first.gender, second.gender) {
        (Gender::Male, other) if other != Gender::Male => Some(assign(second, first)),
        (other, Gender::Male) if other != Gender::Male => Some(assign(first, second)),
        (Gender::Female, Gender::Unknown) => Some(assign(first, second)),
        (Gender::Unknown, Gender::Female) => Some(assign(second, first)),
        _ => None,
    }
}

/// Builds the options for dropping `dragged` on `target`.
///
/// Returns `None` for a drop on self. A target paired with a spouse other
/// than `dragged` only offers "child of the couple".
pub fn propose(
    tree: &FamilyTree,
    dragged: PersonId,
    target: PersonId,
) -> AssignmentResult<Option<AssignmentProposal>> {
    ensure_exists(tree, dragged)?;
    ensure_exists(tree, target)?;
    if dragged == target {
        return Ok(None);
    }

    let options = match tree.partner_of(target).filter(|partner| *partner != dragged) {
        Some(partner) => vec![AssignmentOption::ChildOfCouple {
            first: target,
            second: partner,
            roles: None,
        }],
        None => vec![
            AssignmentOption::ChildOf {
                parent: target,
                role: None,
            },
            AssignmentOption::SpouseOf { spouse: target },
        ],
    };
    debug!(
        "event=assignment_propose module=assignment status=ok options={}",
        options.len()
    );
    Ok(Some(AssignmentProposal {
        dragged,
        target,
        options,
    }))
}

/// Applies `option` from `proposal`.
///
/// # Errors
/// - `NotOffered` when `option` is not in `proposal`.
/// - `Relationship(AmbiguousRole)` when roles cannot be inferred.
/// - `Relationship(..)` for any link the manager rejects.
pub fn confirm(
    tree: &mut FamilyTree,
    proposal: &AssignmentProposal,
    option: AssignmentOption,
    policy: ReplacePolicy,
) -> AssignmentResult<AssignmentOutcome> {
    if !proposal.options.iter().any(|offered| offered.same_offer(&option)) {
        return Err(AssignmentError::NotOffered);
    }
    let child = proposal.dragged;

    let links = match option {
        AssignmentOption::SpouseOf { spouse } => {
            let change = tree.set_spouse(child, spouse)?;
            log_applied(&option);
            return Ok(AssignmentOutcome::Applied {
                changes: vec![change],
            });
        }
        AssignmentOption::ChildOf { parent, role } => {
            let gender = tree
                .get(parent)
                .map(|person| person.gender)
                .ok_or(RelationshipError::NotFound(parent))?;
            let role = role
                .or_else(|| ParentRole::for_gender(gender))
                .ok_or_else(|| RelationshipError::AmbiguousRole(vec![parent]))?;
            vec![(parent, role)]
        }
        AssignmentOption::ChildOfCouple {
            first,
            second,
            roles,
        } => {
            let roles = match roles {
                Some(roles) => {
                    let valid = (roles.mother == first && roles.father == second)
                        || (roles.mother == second && roles.father == first);
                    if !valid {
                        return Err(AssignmentError::NotOffered);
                    }
                    roles
                }
                None => {
                    let first_person = tree.get(first).ok_or(RelationshipError::NotFound(first))?;
                    let second_person =
                        tree.get(second).ok_or(RelationshipError::NotFound(second))?;
                    infer_couple_roles(first_person, second_person)
                        .ok_or_else(|| RelationshipError::AmbiguousRole(vec![first, second]))?
                }
            };
            vec![
                (roles.mother, ParentRole::Mother),
                (roles.father, ParentRole::Father),
            ]
        }
    };

    for (parent, _) in &links {
        tree.relationships().check_parent_child(*parent, child)?;
    }
    let replacements = pending_replacements(tree, child, &links);
    if !replacements.is_empty() && policy == ReplacePolicy::Ask {
        info!(
            "event=assignment_confirm module=assignment status=needs_confirmation replacements={}",
            replacements.len()
        );
        return Ok(AssignmentOutcome::NeedsReplaceConfirmation { replacements });
    }

    let changes = match links.as_slice() {
        [(mother, ParentRole::Mother), (father, ParentRole::Father)] => {
            let (mother_change, father_change) = tree.set_parents(child, *mother, *father)?;
            vec![mother_change, father_change]
        }
        _ => {
            let mut changes = Vec::with_capacity(links.len());
            for (parent, role) in links.iter().copied() {
                changes.push(tree.set_parent_child(parent, child, role)?);
            }
            changes
        }
    };
    log_applied(&option);
    Ok(AssignmentOutcome::Applied { changes })
}

/// Suggests the partner of `parent` for the child's other parent slot.
///
/// Returns `None` when `parent` is not a parent of `child`, has no partner,
/// the other slot is filled, the partner's gender contradicts the slot, or
/// linking would create a cycle.
pub fn suggest_other_parent(
    tree: &FamilyTree,
    child: PersonId,
    parent: PersonId,
) -> Option<ParentSuggestion> {
    let child_record = tree.get(child)?;
    let held = if child_record.mother_id() == Some(parent) {
        ParentRole::Mother
    } else if child_record.father_id() == Some(parent) {
        ParentRole::Father
    } else {
        return None;
    };
    let slot = held.other();
    if parent_in_role(child_record, slot).is_some() {
        return None;
    }

    let partner = tree.partner_of(parent).filter(|partner| *partner != child)?;
    let partner_gender = tree.get(partner)?.gender;
    let role = ParentRole::for_gender(partner_gender).unwrap_or(slot);
    if role != slot {
        return None;
    }
    tree.relationships()
        .check_parent_child(partner, child)
        .ok()?;
    Some(ParentSuggestion {
        person: partner,
        role,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveDrag {
    person: PersonId,
    anchor: Point,
    companion: Option<(PersonId, Point)>,
}

/// Drag gesture state for one pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragSession {
    active: Option<ActiveDrag>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn dragged(&self) -> Option<PersonId> {
        self.active.map(|drag| drag.person)
    }

    /// Couple partner moving along with the dragged person.
    pub fn companion(&self) -> Option<PersonId> {
        self.active.and_then(|drag| drag.companion.map(|(id, _)| id))
    }

    /// Starts dragging `id`. A drag already in progress is replaced.
    pub fn drag_start(&mut self, tree: &FamilyTree, id: PersonId) -> AssignmentResult<()> {
        ensure_exists(tree, id)?;
        let mut computed = None;
        let mut position_of = |person: PersonId| {
            tree.layout_position(person).unwrap_or_else(|| {
                computed
                    .get_or_insert_with(|| tree.layout())
                    .position(person)
                    .unwrap_or_default()
            })
        };
        let anchor = position_of(id);
        let companion = tree
            .partner_of(id)
            .map(|partner| (partner, position_of(partner)));
        self.active = Some(ActiveDrag {
            person: id,
            anchor,
            companion,
        });
        debug!(
            "event=drag_start module=assignment status=ok with_companion={}",
            companion.is_some()
        );
        Ok(())
    }

    /// Moves the dragged node to `(x, y)` and its partner by the same delta.
    pub fn drag_move(&mut self, tree: &mut FamilyTree, x: f64, y: f64) -> AssignmentResult<()> {
        let drag = self.active.ok_or(AssignmentError::NoDragInProgress)?;
        let target = Point::new(x, y);
        tree.set_layout_position(drag.person, target)?;
        if let Some((partner, start)) = drag.companion {
            let moved = start.offset(x - drag.anchor.x, y - drag.anchor.y);
            tree.set_layout_position(partner, moved)?;
        }
        Ok(())
    }

    /// Ends the drag and proposes options for `target`.
    ///
    /// Returns `None` without a target, on a drop on self, or when no drag
    /// is in progress.
    pub fn drag_release(
        &mut self,
        tree: &FamilyTree,
        target: Option<PersonId>,
    ) -> AssignmentResult<Option<AssignmentProposal>> {
        let Some(drag) = self.active.take() else {
            return Ok(None);
        };
        match target {
            Some(target) => propose(tree, drag.person, target),
            None => Ok(None),
        }
    }

    /// Abandons the drag. Cached positions stay where they were dropped.
    pub fn cancel(&mut self) {
        self.active = None;
    }
}

fn pending_replacements(
    tree: &FamilyTree,
    child: PersonId,
    links: &[(PersonId, ParentRole)],
) -> Vec<ParentReplacement> {
    let Some(record) = tree.get(child) else {
        return Vec::new();
    };
    links
        .iter()
        .filter_map(|(proposed, role)| {
            let current = parent_in_role(record, *role)?;
            (current != *proposed).then_some(ParentReplacement {
                role: *role,
                current,
                proposed: *proposed,
            })
        })
        .collect()
}

fn ensure_exists(tree: &FamilyTree, id: PersonId) -> AssignmentResult<()> {
    if tree.store().contains(id) {
        Ok(())
    } else {
        Err(RelationshipError::NotFound(id).into())
    }
}

fn log_applied(option: &AssignmentOption) {
    info!(
        "event=assignment_confirm module=assignment status=ok option={}",
        option.label()
    );
}

#[cfg(test)]
mod tests {
    use super::infer_couple_roles;
    use crate::model::person::{Gender, Person};

    fn person(gender: Gender) -> Person {
        Person::new("P").with_gender(gender)
    }

    #[test]
    fn male_member_is_father() {
        let a = person(Gender::Unknown);
        let b = person(Gender::Male);
        let roles = infer_couple_roles(&a, &b).unwrap();
        assert_eq!(roles.father, b.id);
        assert_eq!(roles.mother, a.id);
    }

    #[test]
    fn female_member_is_mother_when_no_male() {
        let a = person(Gender::Unknown);
        let b = person(Gender::Female);
        let roles = infer_couple_roles(&a, &b).unwrap();
        assert_eq!(roles.mother, b.id);
        assert_eq!(roles.father, a.id);
    }

    #[test]
    fn same_gender_couples_are_ambiguous() {
        for gender in [Gender::Male, Gender::Female, Gender::Unknown] {
            assert!(infer_couple_roles(&person(gender), &person(gender)).is_none());
        }
    }
}
