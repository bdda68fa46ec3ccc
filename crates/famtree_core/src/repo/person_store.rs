//! In-memory person store.
//!
//! # Responsibility
//! - Own every `Person` record plus a fast id index.
//! - Keep iteration order stable (insertion order) for deterministic layout.
//!
//! # Invariants
//! - `order` and `people` always hold the same id set.
//! - `add` never imports relationship fields; only `RelationshipManager` and
//!   the reconcile-on-load path write them.
//! - `remove` does not clean up references. It is crate-private so the only
//!   delete path is `RelationshipManager::remove_person`.

use crate::model::geometry::Point;
use crate::model::person::{Person, PersonId};
use log::warn;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from store-level operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Target person does not exist.
    NotFound(PersonId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "person not found: {id}"),
        }
    }
}

impl Error for StoreError {}

/// Owner of all person records for one family tree.
#[derive(Debug, Clone, Default)]
pub struct PersonStore {
    order: Vec<PersonId>,
    people: HashMap<PersonId, Person>,
}

impl PersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a person with empty relationship sets.
    ///
    /// A nil id is replaced with a fresh one. Re-adding an id that is
    /// already stored is a no-op: the stored record is kept unchanged and
    /// its id is returned.
    pub fn add(&mut self, mut person: Person) -> PersonId {
        if person.id.is_nil() {
            person.id = Uuid::new_v4();
        }
        if self.people.contains_key(&person.id) {
            warn!("event=person_add module=store status=skipped reason=duplicate_id");
            return person.id;
        }
        person.clear_relationships();
        self.insert_raw(person)
    }

    /// Inserts a record exactly as given, relationship fields included.
    ///
    /// Callers must run `RelationshipManager::reconcile` afterwards.
    pub(crate) fn insert_raw(&mut self, mut person: Person) -> PersonId {
        if person.id.is_nil() {
            person.id = Uuid::new_v4();
        }
        let id = person.id;
        if self.people.insert(id, person).is_none() {
            self.order.push(id);
        }
        id
    }

    pub(crate) fn remove(&mut self, id: PersonId) -> Option<Person> {
        let removed = self.people.remove(&id)?;
        self.order.retain(|current| *current != id);
        Some(removed)
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.people.clear();
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.people.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: PersonId) -> Option<&mut Person> {
        self.people.get_mut(&id)
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.people.contains_key(&id)
    }

    /// Iterates persons in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Person> + '_ {
        self.order.iter().filter_map(|id| self.people.get(id))
    }

    /// Returns ids in insertion order.
    pub fn ids(&self) -> &[PersonId] {
        &self.order
    }

    /// Returns the stable insertion index of `id`.
    pub fn index_of(&self, id: PersonId) -> Option<usize> {
        self.order.iter().position(|current| *current == id)
    }

    /// Returns an id → insertion index map for bulk ordering.
    pub fn order_index(&self) -> HashMap<PersonId, usize> {
        self.order
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pins a user-chosen position. Never touches relationship fields.
    pub fn set_layout_position(&mut self, id: PersonId, position: Point) -> Result<(), StoreError> {
        let person = self.people.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        person.set_layout_position(Some(position), true);
        Ok(())
    }

    /// Caches a computed position unless the user pinned one.
    pub(crate) fn cache_layout_position(&mut self, id: PersonId, position: Point) {
        if let Some(person) = self.people.get_mut(&id) {
            if !person.is_layout_pinned() {
                person.set_layout_position(Some(position), false);
            }
        }
    }

    pub fn layout_position(&self, id: PersonId) -> Option<Point> {
        self.people.get(&id)?.layout_position()
    }

    pub fn clear_layout_positions(&mut self) {
        for person in self.people.values_mut() {
            person.set_layout_position(None, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PersonStore, StoreError};
    use crate::model::geometry::Point;
    use crate::model::person::Person;
    use uuid::Uuid;

    #[test]
    fn add_assigns_id_when_nil() {
        let mut store = PersonStore::new();
        let mut person = Person::new("Ada");
        person.id = Uuid::nil();

        let id = store.add(person);
        assert!(!id.is_nil());
        assert_eq!(store.get(id).unwrap().name, "Ada");
    }

    #[test]
    fn re_adding_existing_id_keeps_original_record() {
        let mut store = PersonStore::new();
        let original = Person::new("Ada");
        let id = store.add(original.clone());

        let mut renamed = original;
        renamed.name = "Grace".to_string();
        assert_eq!(store.add(renamed), id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().name, "Ada");
    }

    #[test]
    fn all_iterates_in_insertion_order_after_removal() {
        let mut store = PersonStore::new();
        let a = store.add(Person::new("A"));
        let b = store.add(Person::new("B"));
        let c = store.add(Person::new("C"));

        store.remove(b);
        let ids: Vec<_> = store.all().map(|person| person.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(store.index_of(c), Some(1));
    }

    #[test]
    fn layout_position_requires_existing_person() {
        let mut store = PersonStore::new();
        let id = store.add(Person::new("Ada"));
        store.set_layout_position(id, Point::new(10.0, 20.0)).unwrap();
        assert_eq!(store.layout_position(id), Some(Point::new(10.0, 20.0)));
        assert!(store.get(id).unwrap().is_layout_pinned());

        store.cache_layout_position(id, Point::new(99.0, 99.0));
        assert_eq!(store.layout_position(id), Some(Point::new(10.0, 20.0)));

        let missing = Uuid::new_v4();
        assert_eq!(
            store.set_layout_position(missing, Point::default()),
            Err(StoreError::NotFound(missing))
        );

        store.clear_layout_positions();
        assert_eq!(store.layout_position(id), None);
        assert!(!store.get(id).unwrap().is_layout_pinned());

        store.cache_layout_position(id, Point::new(1.0, 2.0));
        assert_eq!(store.layout_position(id), Some(Point::new(1.0, 2.0)));
        assert!(!store.get(id).unwrap().is_layout_pinned());
    }
}
