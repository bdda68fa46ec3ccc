//! Layout configuration.
//!
//! Defaults reproduce the desktop application's node geometry and spacing.
//! Hosts may override single fields through serde.

use crate::model::geometry::Point;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Node sizes and spacing consumed by `compute_layout`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between sibling subtrees and between root slots.
    pub h_spacing: f64,
    /// Vertical distance between the top edges of consecutive generations.
    pub level_spacing: f64,
    /// Gap between the two members of a couple-unit.
    pub spouse_gap: f64,
    /// Top-left corner of the first root slot.
    pub origin: Point,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 120.0,
            node_height: 60.0,
            h_spacing: 40.0,
            level_spacing: 160.0,
            spouse_gap: 10.0,
            origin: Point::new(50.0, 50.0),
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutConfigError {
    /// Size or spacing must be finite and strictly positive.
    NonPositive { field: &'static str, value: f64 },
    /// Gap or origin coordinate must be finite and not negative.
    Negative { field: &'static str, value: f64 },
    /// Rows would overlap: `level_spacing` must exceed `node_height`.
    LevelsOverlap { node_height: f64, level_spacing: f64 },
}

impl Display for LayoutConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositive { field, value } => {
                write!(f, "{field} must be finite and positive, got {value}")
            }
            Self::Negative { field, value } => {
                write!(f, "{field} must be finite and not negative, got {value}")
            }
            Self::LevelsOverlap {
                node_height,
                level_spacing,
            } => write!(
                f,
                "level_spacing ({level_spacing}) must exceed node_height ({node_height})"
            ),
        }
    }
}

impl Error for LayoutConfigError {}

impl LayoutConfig {
    /// Width of a couple-unit: two nodes plus the spouse gap.
    pub fn couple_width(&self) -> f64 {
        2.0 * self.node_width + self.spouse_gap
    }

    /// Validates sizes and spacing.
    ///
    /// # Errors
    /// - `NonPositive` for a zero, negative or non-finite size.
    /// - `Negative` for a negative or non-finite gap or origin coordinate.
    /// - `LevelsOverlap` when generations would overlap vertically.
    pub fn validate(&self) -> Result<(), LayoutConfigError> {
        for (field, value) in [
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("level_spacing", self.level_spacing),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(LayoutConfigError::NonPositive { field, value });
            }
        }
        for (field, value) in [
            ("h_spacing", self.h_spacing),
            ("spouse_gap", self.spouse_gap),
            ("origin.x", self.origin.x),
            ("origin.y", self.origin.y),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutConfigError::Negative { field, value });
            }
        }
        if self.level_spacing <= self.node_height {
            return Err(LayoutConfigError::LevelsOverlap {
                node_height: self.node_height,
                level_spacing: self.level_spacing,
            });
        }
        Ok(())
    }
}
