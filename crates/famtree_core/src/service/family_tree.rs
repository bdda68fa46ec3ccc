//! Family tree facade owned by the UI root.
//!
//! # Responsibility
//! - Bundle the relationship graph with its layout configuration.
//! - Expose the mutation, query and persistence-collaborator API.
//!
//! # Invariants
//! - There is no global instance. Each `FamilyTree` is an isolated graph and
//!   a clone is an independent snapshot.
//! - Attribute edits never touch relationship fields.
//! - Composite operations (`add_child_of`, `add_spouse_of`) roll back the
//!   inserted person when linking fails.

use crate::layout::{self, LayoutConfig, LayoutConfigError, TreeLayout};
use crate::model::geometry::Point;
use crate::model::person::{Person, PersonFields, PersonId};
use crate::repo::person_store::PersonStore;
use crate::service::relationship_manager::{
    LinkChange, ParentRole, ReconcileReport, Relationship, RelationshipError,
    RelationshipManager, RelationshipResult,
};
use log::{info, warn};

/// Root object for one family tree.
#[derive(Debug, Clone, Default)]
pub struct FamilyTree {
    relationships: RelationshipManager,
    layout_config: LayoutConfig,
}

impl FamilyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tree with a custom layout configuration.
    pub fn with_layout_config(layout_config: LayoutConfig) -> Result<Self, LayoutConfigError> {
        layout_config.validate()?;
        Ok(Self {
            relationships: RelationshipManager::default(),
            layout_config,
        })
    }

    pub fn store(&self) -> &PersonStore {
        self.relationships.store()
    }

    pub fn relationships(&self) -> &RelationshipManager {
        &self.relationships
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    pub fn set_layout_config(&mut self, layout_config: LayoutConfig) -> Result<(), LayoutConfigError> {
        layout_config.validate()?;
        self.layout_config = layout_config;
        Ok(())
    }

    /// Replaces the whole graph with externally loaded records.
    ///
    /// Relationship fields are taken as given and then repaired by
    /// `reconcile`. For duplicate ids the first record wins.
    pub fn load(&mut self, persons: impl IntoIterator<Item = Person>) -> ReconcileReport {
        let store = self.relationships.store_mut();
        store.clear();
        let mut duplicates = 0usize;
        for person in persons {
            if store.contains(person.id) {
                duplicates += 1;
                continue;
            }
            store.insert_raw(person);
        }
        if duplicates > 0 {
            warn!("event=tree_load module=family_tree status=partial duplicates={duplicates}");
        }
        let report = self.relationships.reconcile();
        info!(
            "event=tree_load module=family_tree status=ok persons={}",
            self.relationships.store().len()
        );
        report
    }

    /// Returns every person in store order, ready for saving.
    pub fn snapshot(&self) -> Vec<Person> {
        self.store().all().cloned().collect()
    }

    /// Empties the tree. Layout configuration is kept.
    pub fn reset(&mut self) {
        self.relationships.store_mut().clear();
        info!("event=tree_reset module=family_tree status=ok");
    }

    /// Validates and adds a person with no relationships.
    pub fn add_person(&mut self, person: Person) -> RelationshipResult<PersonId> {
        person.validate()?;
        let id = self.relationships.store_mut().add(person);
        info!("event=person_add module=family_tree status=ok");
        Ok(id)
    }

    /// Cascading delete. Absent ids are a no-op.
    pub fn remove_person(&mut self, id: PersonId) -> Option<Person> {
        self.relationships.remove_person(id)
    }

    /// Replaces editable attributes after validation.
    pub fn update_person_fields(
        &mut self,
        id: PersonId,
        fields: PersonFields,
    ) -> RelationshipResult<()> {
        fields.validate()?;
        let person = self
            .relationships
            .store_mut()
            .get_mut(id)
            .ok_or(RelationshipError::NotFound(id))?;
        person.apply_fields(fields);
        info!("event=person_update module=family_tree status=ok");
        Ok(())
    }

    pub fn set_parent_child(
        &mut self,
        parent: PersonId,
        child: PersonId,
        role: ParentRole,
    ) -> RelationshipResult<LinkChange> {
        self.relationships.set_parent_child(parent, child, role)
    }

    pub fn set_parents(
        &mut self,
        child: PersonId,
        mother: PersonId,
        father: PersonId,
    ) -> RelationshipResult<(LinkChange, LinkChange)> {
        self.relationships.set_parents(child, mother, father)
    }

    pub fn remove_parent_child(&mut self, parent: PersonId, child: PersonId) -> bool {
        self.relationships.remove_parent_child(parent, child)
    }

    pub fn set_spouse(&mut self, a: PersonId, b: PersonId) -> RelationshipResult<LinkChange> {
        self.relationships.set_spouse(a, b)
    }

    pub fn remove_spouse(&mut self, a: PersonId, b: PersonId) -> bool {
        self.relationships.remove_spouse(a, b)
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.store().get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Person> + '_ {
        self.store().all()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn relationship_list(&self) -> Vec<Relationship> {
        self.relationships.relationships()
    }

    pub fn layout_position(&self, id: PersonId) -> Option<Point> {
        self.store().layout_position(id)
    }

    /// Pins a user-chosen node position.
    pub fn set_layout_position(&mut self, id: PersonId, position: Point) -> RelationshipResult<()> {
        self.relationships
            .store_mut()
            .set_layout_position(id, position)
            .map_err(Into::into)
    }

    /// Computes the layout without touching cached positions.
    pub fn layout(&self) -> TreeLayout {
        layout::compute_layout(self.store(), &self.layout_config)
    }

    /// Computes the layout and caches positions in the store.
    ///
    /// Pinned positions are honored by the layout and never overwritten.
    pub fn compute_layout(&mut self) -> TreeLayout {
        let computed = self.layout();
        let store = self.relationships.store_mut();
        for (id, position) in &computed.positions {
            store.cache_layout_position(*id, *position);
        }
        computed
    }

    /// Drops every cached and pinned position so the next layout is automatic.
    pub fn clear_layout_positions(&mut self) {
        self.relationships.store_mut().clear_layout_positions();
        info!("event=layout_positions_clear module=family_tree status=ok");
    }

    /// Returns the spouse `id` is paired with, else their first spouse.
    pub fn partner_of(&self, id: PersonId) -> Option<PersonId> {
        layout::couple_partner(self.store(), id)
            .or_else(|| self.relationships.spouses_of(id).into_iter().next())
    }

    /// Adds `person` as a child of `parent`, and of the parent's partner.
    ///
    /// `role` overrides the role inferred from the parent's gender. The
    /// partner takes the other role.
    ///
    /// # Errors
    /// - `NotFound` when `parent` is absent.
    /// - `AmbiguousRole` when no role is given and the parent's gender is
    ///   unknown.
    /// - `AlreadyExists` when `person.id` is already stored.
    /// - `Validation` when `person` fails attribute validation.
    pub fn add_child_of(
        &mut self,
        parent: PersonId,
        person: Person,
        role: Option<ParentRole>,
    ) -> RelationshipResult<PersonId> {
        let parent_gender = self
            .get(parent)
            .map(|record| record.gender)
            .ok_or(RelationshipError::NotFound(parent))?;
        let role = role
            .or_else(|| ParentRole::for_gender(parent_gender))
            .ok_or_else(|| RelationshipError::AmbiguousRole(vec![parent]))?;
        self.ensure_new(&person)?;
        person.validate()?;
        let partner = self.partner_of(parent);

        let child = self.relationships.store_mut().add(person);
        let linked = match partner {
            Some(partner) => {
                let (mother, father) = match role {
                    ParentRole::Mother => (parent, partner),
                    ParentRole::Father => (partner, parent),
                };
                self.relationships.set_parents(child, mother, father).map(|_| ())
            }
            None => self
                .relationships
                .set_parent_child(parent, child, role)
                .map(|_| ()),
        };
        if let Err(err) = linked {
            self.relationships.remove_person(child);
            warn!("event=add_child module=family_tree status=rolled_back");
            return Err(err);
        }
        info!(
            "event=add_child module=family_tree status=ok role={} with_partner={}",
            role.as_str(),
            partner.is_some()
        );
        Ok(child)
    }

    /// Adds `spouse` as a new person married to `person`.
    ///
    /// Fails with `AlreadyExists` when `spouse.id` is already stored.
    pub fn add_spouse_of(&mut self, person: PersonId, spouse: Person) -> RelationshipResult<PersonId> {
        if !self.store().contains(person) {
            return Err(RelationshipError::NotFound(person));
        }
        self.ensure_new(&spouse)?;
        spouse.validate()?;
        let spouse_id = self.relationships.store_mut().add(spouse);
        if let Err(err) = self.relationships.set_spouse(person, spouse_id) {
            self.relationships.remove_person(spouse_id);
            warn!("event=add_spouse module=family_tree status=rolled_back");
            return Err(err);
        }
        info!("event=add_spouse module=family_tree status=ok");
        Ok(spouse_id)
    }

    /// Composite adds insert and may roll back, so they only accept new ids.
    fn ensure_new(&self, person: &Person) -> RelationshipResult<()> {
        if !person.id.is_nil() && self.store().contains(person.id) {
            warn!("event=person_add module=family_tree status=rejected reason=duplicate_id");
            return Err(RelationshipError::AlreadyExists(person.id));
        }
        Ok(())
    }
}
