//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical person record shared by store, layout and UI.
//! - Validate free-form attributes (name, partial dates) before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - Relationship fields are private; only `RelationshipManager` writes them.
//! - `layout_position` is a presentation cache and never implies a
//!   relationship change. A pinned position was placed by the user and
//!   takes precedence over computed layout.

use crate::model::geometry::Point;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static PARTIAL_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12]\d|3[01]))?)?$").expect("valid date regex")
});

/// Stable identifier for every person in a family tree.
pub type PersonId = Uuid;

/// Gender tag used to infer mother/father roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    /// Other or not recorded. Never resolves a parent role on its own.
    #[default]
    #[serde(alias = "other")]
    Unknown,
}

impl Gender {
    /// Parses a loose UI label (`Male`, `f`, `other`, ...).
    pub fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }
}

/// Attribute validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    /// Caller-provided id is the nil UUID.
    NilId,
    /// Name is empty after trim.
    BlankName,
    /// Date is not `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    InvalidDate { field: &'static str, value: String },
    /// Death date precedes birth date on their common precision.
    DeathBeforeBirth { birth: String, death: String },
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "person id must not be nil"),
            Self::BlankName => write!(f, "person name must not be blank"),
            Self::InvalidDate { field, value } => write!(
                f,
                "{field} `{value}` must be formatted as YYYY, YYYY-MM or YYYY-MM-DD"
            ),
            Self::DeathBeforeBirth { birth, death } => {
                write!(f, "date_of_death ({death}) must not precede date_of_birth ({birth})")
            }
        }
    }
}

impl Error for PersonValidationError {}

/// Editable, relationship-free attributes of a person.
///
/// This is the payload of `update_person_fields`; it can never carry a
/// relationship change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFields {
    pub name: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    pub gender: Gender,
    pub place_of_birth: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
}

impl PersonFields {
    /// Validates attribute-level invariants.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.name.trim().is_empty() {
            return Err(PersonValidationError::BlankName);
        }
        let birth = validate_date("date_of_birth", self.date_of_birth.as_deref())?;
        let death = validate_date("date_of_death", self.date_of_death.as_deref())?;
        if let (Some(birth), Some(death)) = (birth, death) {
            let precision = birth.len().min(death.len());
            if death[..precision] < birth[..precision] {
                return Err(PersonValidationError::DeathBeforeBirth {
                    birth: birth.to_string(),
                    death: death.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Canonical person record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Stable id. A nil id is replaced by the store on insert.
    pub id: PersonId,
    pub name: String,
    pub date_of_birth: Option<String>,
    pub date_of_death: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    pub place_of_birth: Option<String>,
    pub occupation: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    mother_id: Option<PersonId>,
    #[serde(default)]
    father_id: Option<PersonId>,
    /// External data may carry only one direction; `reconcile` repairs it.
    #[serde(default)]
    spouse_ids: BTreeSet<PersonId>,
    #[serde(default)]
    children_ids: BTreeSet<PersonId>,
    #[serde(default)]
    layout_position: Option<Point>,
    #[serde(default)]
    layout_pinned: bool,
}

impl Person {
    /// Creates a person with a generated stable id and no relationships.
    pub fn new(name: impl Into<String>) -> Self {
        Self::blank(Uuid::new_v4(), name.into())
    }

    /// Creates a person with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: PersonId, name: impl Into<String>) -> Result<Self, PersonValidationError> {
        if id.is_nil() {
            return Err(PersonValidationError::NilId);
        }
        Ok(Self::blank(id, name.into()))
    }

    fn blank(id: PersonId, name: String) -> Self {
        Self {
            id,
            name,
            date_of_birth: None,
            date_of_death: None,
            gender: Gender::Unknown,
            place_of_birth: None,
            occupation: None,
            notes: None,
            mother_id: None,
            father_id: None,
            spouse_ids: BTreeSet::new(),
            children_ids: BTreeSet::new(),
            layout_position: None,
            layout_pinned: false,
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_dates(mut self, birth: Option<&str>, death: Option<&str>) -> Self {
        self.date_of_birth = birth.map(str::to_string);
        self.date_of_death = death.map(str::to_string);
        self
    }

    /// Validates attribute-level invariants.
    ///
    /// Relationship invariants are owned by `RelationshipManager`, not checked
    /// here. A nil id passes: the store assigns one on insert.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        self.fields().validate()
    }

    /// Returns a copy of the editable attributes.
    pub fn fields(&self) -> PersonFields {
        PersonFields {
            name: self.name.clone(),
            date_of_birth: self.date_of_birth.clone(),
            date_of_death: self.date_of_death.clone(),
            gender: self.gender,
            place_of_birth: self.place_of_birth.clone(),
            occupation: self.occupation.clone(),
            notes: self.notes.clone(),
        }
    }

    pub(crate) fn apply_fields(&mut self, fields: PersonFields) {
        self.name = fields.name.trim().to_string();
        self.date_of_birth = fields.date_of_birth;
        self.date_of_death = fields.date_of_death;
        self.gender = fields.gender;
        self.place_of_birth = fields.place_of_birth;
        self.occupation = fields.occupation;
        self.notes = fields.notes;
    }

    pub fn mother_id(&self) -> Option<PersonId> {
        self.mother_id
    }

    pub fn father_id(&self) -> Option<PersonId> {
        self.father_id
    }

    pub fn spouse_ids(&self) -> &BTreeSet<PersonId> {
        &self.spouse_ids
    }

    pub fn children_ids(&self) -> &BTreeSet<PersonId> {
        &self.children_ids
    }

    pub fn layout_position(&self) -> Option<Point> {
        self.layout_position
    }

    /// Returns true when the cached position was set by the user.
    pub fn is_layout_pinned(&self) -> bool {
        self.layout_pinned && self.layout_position.is_some()
    }

    /// Returns true when neither parent is recorded.
    pub fn is_root(&self) -> bool {
        self.mother_id.is_none() && self.father_id.is_none()
    }

    pub(crate) fn set_mother_id(&mut self, value: Option<PersonId>) {
        self.mother_id = value;
    }

    pub(crate) fn set_father_id(&mut self, value: Option<PersonId>) {
        self.father_id = value;
    }

    pub(crate) fn spouse_ids_mut(&mut self) -> &mut BTreeSet<PersonId> {
        &mut self.spouse_ids
    }

    pub(crate) fn children_ids_mut(&mut self) -> &mut BTreeSet<PersonId> {
        &mut self.children_ids
    }

    pub(crate) fn set_layout_position(&mut self, value: Option<Point>, pinned: bool) {
        self.layout_pinned = pinned && value.is_some();
        self.layout_position = value;
    }

    pub(crate) fn clear_relationships(&mut self) {
        self.mother_id = None;
        self.father_id = None;
        self.spouse_ids.clear();
        self.children_ids.clear();
    }
}

fn validate_date<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<Option<&'a str>, PersonValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !PARTIAL_DATE_RE.is_match(trimmed) {
        return Err(PersonValidationError::InvalidDate {
            field,
            value: raw.to_string(),
        });
    }
    Ok(Some(trimmed))
}
