use serde::Serialize;
use std::fmt;

use crate::kernel::{Point2D, ProfileShape};

/// Canonical construction step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace the current sketch. A missing placement keeps the last one.
    DefineProfile {
        shape: ProfileShape,
        placement: Option<Point2D>,
    },
    Extrude {
        depth: f64,
    },
    /// Cut the current sketch through the whole body. Without a depth the
    /// builder's fallback depth is used.
    CutThroughAll {
        depth: Option<f64>,
    },
    Unrecognized {
        raw: String,
        reason: SkipReason,
    },
}

impl Step {
    /// Plan action name, used in diagnostics.
    pub fn action_name(&self) -> &'static str {
        match self {
            Step::DefineProfile { shape, .. } => shape.action_name(),
            Step::Extrude { .. } => "extrude",
            Step::CutThroughAll { .. } => "cut_through_all",
            Step::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Step::Unrecognized { .. })
    }
}

/// Why a plan entry did not produce a usable step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither `kind` nor `action` was given.
    NoAction,
    UnknownKind { kind: String },
    /// Free text matched none of the known phrases.
    NoPatternMatch,
    MissingField { field: String },
    InvalidField { field: String, value: String },
    /// Recognised geometry the builder cannot turn into a closed profile.
    UnsupportedGeometry { description: String },
}

impl SkipReason {
    /// The entry named a known command but its parameters were unusable.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            SkipReason::MissingField { .. } | SkipReason::InvalidField { .. }
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAction => write!(f, "entry has no action"),
            Self::UnknownKind { kind } => write!(f, "unknown action kind '{}'", kind),
            Self::NoPatternMatch => write!(f, "description matches no known phrase"),
            Self::MissingField { field } => write!(f, "required field '{}' is missing", field),
            Self::InvalidField { field, value } => {
                write!(f, "field '{}' has invalid value {}", field, value)
            }
            Self::UnsupportedGeometry { description } => {
                write!(f, "{} geometry is not supported", description)
            }
        }
    }
}
