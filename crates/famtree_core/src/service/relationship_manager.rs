//! Relationship use-case service.
//!
//! # Responsibility
//! - Enforce family relationship invariants over `PersonStore`.
//! - Provide link/unlink, cascading delete and the post-load repair pass.
//! - Derive read-only projections (edge lists, adjacency) on demand.
//!
//! # Invariants
//! - At most one mother and one father; a new parent explicitly replaces
//!   the old one.
//! - `father_id`/`mother_id` and `children_ids` are always mirrored.
//! - `spouse_ids` is symmetric.
//! - No self links and no ancestry cycles.
//! - Every operation is all-or-nothing: validation happens before mutation.

use crate::model::person::{Gender, Person, PersonId, PersonValidationError};
use crate::repo::person_store::{PersonStore, StoreError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by relationship operations.
pub type RelationshipResult<T> = Result<T, RelationshipError>;

/// Parent slot on a child record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRole {
    Mother,
    Father,
}

impl ParentRole {
    /// Infers the role a parent of `gender` fills. `Unknown` infers nothing.
    pub fn for_gender(gender: Gender) -> Option<Self> {
        match gender {
            Gender::Male => Some(Self::Father),
            Gender::Female => Some(Self::Mother),
            Gender::Unknown => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Mother => Self::Father,
            Self::Father => Self::Mother,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mother => "mother",
            Self::Father => "father",
        }
    }

    /// Parses `mother|father` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mother" => Some(Self::Mother),
            "father" => Some(Self::Father),
            _ => None,
        }
    }
}

/// Errors from relationship operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipError {
    /// Referenced person is absent from the store.
    NotFound(PersonId),
    /// A new person carries an id that is already stored.
    AlreadyExists(PersonId),
    /// Operation targets the same person twice.
    SelfReference(PersonId),
    /// Link would make someone their own ancestor.
    CycleDetected { parent: PersonId, child: PersonId },
    /// Gender tags cannot decide mother/father for these persons.
    AmbiguousRole(Vec<PersonId>),
    /// Attribute payload failed validation.
    Validation(PersonValidationError),
}

impl Display for RelationshipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "person already exists: {id}"),
            Self::SelfReference(id) => write!(f, "person cannot be related to themself: {id}"),
            Self::CycleDetected { parent, child } => write!(
                f,
                "link would create ancestry cycle: {parent} is a descendant of {child}"
            ),
            Self::AmbiguousRole(ids) => {
                let joined = ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "cannot infer mother/father role from gender of: {joined}")
            }
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationshipError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RelationshipError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
        }
    }
}

impl From<PersonValidationError> for RelationshipError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

/// What a link operation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    /// A new link was created.
    Linked,
    /// An existing parent in the same role was unlinked first.
    Replaced { previous: PersonId },
    /// The link already existed; nothing changed.
    Unchanged,
}

/// Edge kind of the derived relationship projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Mother,
    Father,
    Spouse,
}

/// One derived edge. For parent kinds `from` is the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: PersonId,
    pub to: PersonId,
    pub kind: RelationshipKind,
}

/// Counts of repairs applied by `reconcile`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// References to ids absent from the store.
    pub dangling_refs_removed: usize,
    /// Self parent/spouse/child references.
    pub self_refs_removed: usize,
    /// Parent links recovered from a parent-side `children_ids` entry.
    pub parent_links_adopted: usize,
    /// `children_ids` entries with no matching parent field.
    pub child_links_dropped: usize,
    /// Parent links cleared to break ancestry cycles.
    pub cycles_broken: usize,
    /// `children_ids` entries added to mirror a parent field.
    pub child_links_mirrored: usize,
    /// Spouse entries added to restore symmetry.
    pub spouse_links_mirrored: usize,
}

impl ReconcileReport {
    /// Returns true when the loaded data needed no repair.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Relationship service owning the person store.
#[derive(Debug, Clone, Default)]
pub struct RelationshipManager {
    store: PersonStore,
}

impl RelationshipManager {
    /// Creates a manager over an existing store and repairs its links.
    pub fn new(store: PersonStore) -> Self {
        let mut manager = Self { store };
        manager.reconcile();
        manager
    }

    pub fn store(&self) -> &PersonStore {
        &self.store
    }

    /// Store access for attribute and layout-cache writes.
    pub(crate) fn store_mut(&mut self) -> &mut PersonStore {
        &mut self.store
    }

    /// Links `child` under `parent` in `role`.
    ///
    /// # Errors
    /// - `SelfReference` when both ids are equal.
    /// - `NotFound` when either id is absent.
    /// - `CycleDetected` when `parent` descends from `child`.
    pub fn set_parent_child(
        &mut self,
        parent: PersonId,
        child: PersonId,
        role: ParentRole,
    ) -> RelationshipResult<LinkChange> {
        self.check_parent_child(parent, child)?;
        let change = self.apply_parent_child(parent, child, role)?;
        info!(
            "event=set_parent_child module=relationships status=ok role={} change={}",
            role.as_str(),
            link_change_label(change)
        );
        Ok(change)
    }

    /// Links both parents of `child` atomically.
    ///
    /// Both links are validated before either is applied.
    pub fn set_parents(
        &mut self,
        child: PersonId,
        mother: PersonId,
        father: PersonId,
    ) -> RelationshipResult<(LinkChange, LinkChange)> {
        if mother == father {
            return Err(RelationshipError::SelfReference(mother));
        }
        self.check_parent_child(mother, child)?;
        self.check_parent_child(father, child)?;

        let mother_change = self.apply_parent_child(mother, child, ParentRole::Mother)?;
        let father_change = self.apply_parent_child(father, child, ParentRole::Father)?;
        info!(
            "event=set_parents module=relationships status=ok mother_change={} father_change={}",
            link_change_label(mother_change),
            link_change_label(father_change)
        );
        Ok((mother_change, father_change))
    }

    /// Removes the `parent` → `child` link in whichever role it occupies.
    ///
    /// Returns `false` (no-op) when no such link exists.
    pub fn remove_parent_child(&mut self, parent: PersonId, child: PersonId) -> bool {
        let Some(record) = self.store.get_mut(child) else {
            return false;
        };
        let mut removed = false;
        if record.mother_id() == Some(parent) {
            record.set_mother_id(None);
            removed = true;
        }
        if record.father_id() == Some(parent) {
            record.set_father_id(None);
            removed = true;
        }
        if let Some(parent_record) = self.store.get_mut(parent) {
            removed |= parent_record.children_ids_mut().remove(&child);
        }
        if removed {
            info!("event=remove_parent_child module=relationships status=ok");
        }
        removed
    }

    /// Links two persons as spouses. Idempotent.
    pub fn set_spouse(&mut self, a: PersonId, b: PersonId) -> RelationshipResult<LinkChange> {
        if a == b {
            return Err(RelationshipError::SelfReference(a));
        }
        self.ensure_exists(a)?;
        self.ensure_exists(b)?;

        let already = self
            .store
            .get(a)
            .is_some_and(|person| person.spouse_ids().contains(&b));
        if already {
            debug!("event=set_spouse module=relationships status=unchanged");
            return Ok(LinkChange::Unchanged);
        }

        self.person_mut(a)?.spouse_ids_mut().insert(b);
        self.person_mut(b)?.spouse_ids_mut().insert(a);
        info!("event=set_spouse module=relationships status=ok");
        Ok(LinkChange::Linked)
    }

    /// Removes a spouse link on both sides. Returns `false` when absent.
    pub fn remove_spouse(&mut self, a: PersonId, b: PersonId) -> bool {
        let mut removed = false;
        if let Some(person) = self.store.get_mut(a) {
            removed |= person.spouse_ids_mut().remove(&b);
        }
        if let Some(person) = self.store.get_mut(b) {
            removed |= person.spouse_ids_mut().remove(&a);
        }
        if removed {
            info!("event=remove_spouse module=relationships status=ok");
        }
        removed
    }

    /// Deletes a person and every reference to it.
    ///
    /// Visits every remaining person exactly once. Removing an absent id is
    /// a no-op and returns `None`.
    pub fn remove_person(&mut self, id: PersonId) -> Option<Person> {
        if !self.store.contains(id) {
            debug!("event=remove_person module=relationships status=noop");
            return None;
        }

        let mut cleared = 0usize;
        for other in self.store.ids().to_vec() {
            if other == id {
                continue;
            }
            let Some(person) = self.store.get_mut(other) else {
                continue;
            };
            if person.mother_id() == Some(id) {
                person.set_mother_id(None);
                cleared += 1;
            }
            if person.father_id() == Some(id) {
                person.set_father_id(None);
                cleared += 1;
            }
            if person.spouse_ids_mut().remove(&id) {
                cleared += 1;
            }
            if person.children_ids_mut().remove(&id) {
                cleared += 1;
            }
        }

        let removed = self.store.remove(id);
        info!(
            "event=remove_person module=relationships status=ok cleared_refs={cleared} remaining={}",
            self.store.len()
        );
        removed
    }

    /// Repairs mirrored fields after a bulk load from external data.
    ///
    /// Canonical fields are `mother_id`, `father_id` and `spouse_ids`;
    /// `children_ids` is rebuilt from them. A parent-side `children_ids`
    /// entry with no matching child field is adopted when the parent's
    /// gender names a free role, and dropped otherwise.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let ids = self.store.ids().to_vec();
        let known: HashSet<PersonId> = ids.iter().copied().collect();

        for id in &ids {
            let Some(person) = self.store.get_mut(*id) else {
                continue;
            };
            for role in [ParentRole::Mother, ParentRole::Father] {
                if let Some(parent) = parent_in_role(person, role) {
                    if parent == *id {
                        set_parent_in_role(person, role, None);
                        report.self_refs_removed += 1;
                    } else if !known.contains(&parent) {
                        set_parent_in_role(person, role, None);
                        report.dangling_refs_removed += 1;
                    }
                }
            }
            if person.mother_id().is_some() && person.mother_id() == person.father_id() {
                person.set_father_id(None);
                report.self_refs_removed += 1;
            }
            let (self_refs, dangling) = prune_id_set(person.spouse_ids_mut(), *id, &known);
            report.self_refs_removed += self_refs;
            report.dangling_refs_removed += dangling;
            let (self_refs, dangling) = prune_id_set(person.children_ids_mut(), *id, &known);
            report.self_refs_removed += self_refs;
            report.dangling_refs_removed += dangling;
        }

        for parent_id in &ids {
            let Some(parent) = self.store.get(*parent_id) else {
                continue;
            };
            let gender = parent.gender;
            let listed: Vec<PersonId> = parent.children_ids().iter().copied().collect();
            for child_id in listed {
                let Some(child) = self.store.get_mut(child_id) else {
                    continue;
                };
                if child.mother_id() == Some(*parent_id) || child.father_id() == Some(*parent_id) {
                    continue;
                }
                match ParentRole::for_gender(gender) {
                    Some(role) if parent_in_role(child, role).is_none() => {
                        set_parent_in_role(child, role, Some(*parent_id));
                        report.parent_links_adopted += 1;
                    }
                    _ => report.child_links_dropped += 1,
                }
            }
        }

        for id in &ids {
            for role in [ParentRole::Mother, ParentRole::Father] {
                let Some(parent) = self.store.get(*id).and_then(|p| parent_in_role(p, role))
                else {
                    continue;
                };
                if self.is_ancestor(*id, parent) {
                    if let Some(person) = self.store.get_mut(*id) {
                        set_parent_in_role(person, role, None);
                    }
                    report.cycles_broken += 1;
                }
            }
        }

        let mut derived: Vec<(PersonId, PersonId)> = Vec::new();
        for id in &ids {
            if let Some(person) = self.store.get(*id) {
                for parent in [person.mother_id(), person.father_id()].into_iter().flatten() {
                    derived.push((parent, *id));
                }
            }
        }
        let previous: HashSet<(PersonId, PersonId)> = ids
            .iter()
            .filter_map(|id| self.store.get(*id))
            .flat_map(|person| {
                person
                    .children_ids()
                    .iter()
                    .map(move |child| (person.id, *child))
            })
            .collect();
        for id in &ids {
            if let Some(person) = self.store.get_mut(*id) {
                person.children_ids_mut().clear();
            }
        }
        for (parent, child) in derived {
            if let Some(person) = self.store.get_mut(parent) {
                person.children_ids_mut().insert(child);
            }
            if !previous.contains(&(parent, child)) {
                report.child_links_mirrored += 1;
            }
        }

        let mut missing_spouse_links = Vec::new();
        for id in &ids {
            if let Some(person) = self.store.get(*id) {
                for spouse in person.spouse_ids() {
                    let mirrored = self
                        .store
                        .get(*spouse)
                        .is_some_and(|other| other.spouse_ids().contains(id));
                    if !mirrored {
                        missing_spouse_links.push((*spouse, *id));
                    }
                }
            }
        }
        for (person_id, spouse) in missing_spouse_links {
            if let Some(person) = self.store.get_mut(person_id) {
                if person.spouse_ids_mut().insert(spouse) {
                    report.spouse_links_mirrored += 1;
                }
            }
        }

        if report.is_clean() {
            debug!("event=reconcile module=relationships status=clean persons={}", ids.len());
        } else {
            warn!(
                "event=reconcile module=relationships status=repaired persons={} dangling={} self={} adopted={} dropped={} cycles={} child_mirrors={} spouse_mirrors={}",
                ids.len(),
                report.dangling_refs_removed,
                report.self_refs_removed,
                report.parent_links_adopted,
                report.child_links_dropped,
                report.cycles_broken,
                report.child_links_mirrored,
                report.spouse_links_mirrored
            );
        }
        report
    }

    /// Returns true when `ancestor` is reachable upward from `person`.
    ///
    /// The walk is bounded by a visited set, so corrupt cyclic data terminates.
    pub fn is_ancestor(&self, ancestor: PersonId, person: PersonId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.extend(self.parents_of(person));
        while let Some(current) = queue.pop_front() {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            queue.extend(self.parents_of(current));
        }
        false
    }

    /// Returns `[mother, father]` ids that are set, mother first.
    pub fn parents_of(&self, id: PersonId) -> Vec<PersonId> {
        self.store
            .get(id)
            .map(|person| {
                [person.mother_id(), person.father_id()]
                    .into_iter()
                    .flatten()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns children in store order.
    pub fn children_of(&self, id: PersonId) -> Vec<PersonId> {
        self.store
            .get(id)
            .map(|person| in_store_order(&self.store, person.children_ids()))
            .unwrap_or_default()
    }

    /// Returns spouses in store order.
    pub fn spouses_of(&self, id: PersonId) -> Vec<PersonId> {
        self.store
            .get(id)
            .map(|person| in_store_order(&self.store, person.spouse_ids()))
            .unwrap_or_default()
    }

    /// Returns persons sharing at least one parent with `id`, in store order.
    pub fn siblings_of(&self, id: PersonId) -> Vec<PersonId> {
        let mut siblings = BTreeSet::new();
        for parent in self.parents_of(id) {
            if let Some(record) = self.store.get(parent) {
                siblings.extend(record.children_ids().iter().copied());
            }
        }
        siblings.remove(&id);
        in_store_order(&self.store, &siblings)
    }

    /// Projects the graph into a typed edge list (spouse pairs listed once).
    pub fn relationships(&self) -> Vec<Relationship> {
        let index = self.store.order_index();
        let mut edges = Vec::new();
        for person in self.store.all() {
            if let Some(mother) = person.mother_id() {
                edges.push(Relationship {
                    from: mother,
                    to: person.id,
                    kind: RelationshipKind::Mother,
                });
            }
            if let Some(father) = person.father_id() {
                edges.push(Relationship {
                    from: father,
                    to: person.id,
                    kind: RelationshipKind::Father,
                });
            }
            let own_index = index.get(&person.id).copied().unwrap_or(usize::MAX);
            for spouse in in_store_order(&self.store, person.spouse_ids()) {
                if index.get(&spouse).is_some_and(|other| *other > own_index) {
                    edges.push(Relationship {
                        from: person.id,
                        to: spouse,
                        kind: RelationshipKind::Spouse,
                    });
                }
            }
        }
        edges
    }

    /// Validates a parent link without applying it.
    pub(crate) fn check_parent_child(
        &self,
        parent: PersonId,
        child: PersonId,
    ) -> RelationshipResult<()> {
        if parent == child {
            return Err(RelationshipError::SelfReference(parent));
        }
        self.ensure_exists(parent)?;
        self.ensure_exists(child)?;
        if self.is_ancestor(child, parent) {
            warn!("event=set_parent_child module=relationships status=rejected reason=cycle");
            return Err(RelationshipError::CycleDetected { parent, child });
        }
        Ok(())
    }

    fn apply_parent_child(
        &mut self,
        parent: PersonId,
        child: PersonId,
        role: ParentRole,
    ) -> RelationshipResult<LinkChange> {
        let record = self.person_mut(child)?;
        let previous = parent_in_role(record, role);
        if previous == Some(parent) {
            return Ok(LinkChange::Unchanged);
        }
        // One person cannot fill both roles; moving roles keeps the mirror.
        if parent_in_role(record, role.other()) == Some(parent) {
            set_parent_in_role(record, role.other(), None);
        }
        set_parent_in_role(record, role, Some(parent));
        let still_parent = previous.filter(|old| parent_in_role(record, role.other()) == Some(*old));

        if let Some(old) = previous {
            if still_parent.is_none() {
                if let Some(old_record) = self.store.get_mut(old) {
                    old_record.children_ids_mut().remove(&child);
                }
            }
        }
        self.person_mut(parent)?.children_ids_mut().insert(child);

        Ok(match previous {
            Some(previous) => LinkChange::Replaced { previous },
            None => LinkChange::Linked,
        })
    }

    fn ensure_exists(&self, id: PersonId) -> RelationshipResult<()> {
        if self.store.contains(id) {
            Ok(())
        } else {
            Err(RelationshipError::NotFound(id))
        }
    }

    fn person_mut(&mut self, id: PersonId) -> RelationshipResult<&mut Person> {
        self.store
            .get_mut(id)
            .ok_or(RelationshipError::NotFound(id))
    }
}

pub(crate) fn parent_in_role(person: &Person, role: ParentRole) -> Option<PersonId> {
    match role {
        ParentRole::Mother => person.mother_id(),
        ParentRole::Father => person.father_id(),
    }
}

fn set_parent_in_role(person: &mut Person, role: ParentRole, value: Option<PersonId>) {
    match role {
        ParentRole::Mother => person.set_mother_id(value),
        ParentRole::Father => person.set_father_id(value),
    }
}

/// Drops `owner` and unknown ids from `set`. Returns `(self, dangling)` counts.
fn prune_id_set(
    set: &mut BTreeSet<PersonId>,
    owner: PersonId,
    known: &HashSet<PersonId>,
) -> (usize, usize) {
    let had_self = usize::from(set.remove(&owner));
    let before = set.len();
    set.retain(|other| known.contains(other));
    (had_self, before - set.len())
}

fn in_store_order(store: &PersonStore, ids: &BTreeSet<PersonId>) -> Vec<PersonId> {
    store
        .ids()
        .iter()
        .filter(|id| ids.contains(id))
        .copied()
        .collect()
}

fn link_change_label(change: LinkChange) -> &'static str {
    match change {
        LinkChange::Linked => "linked",
        LinkChange::Replaced { .. } => "replaced",
        LinkChange::Unchanged => "unchanged",
    }
}
