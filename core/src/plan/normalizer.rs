//! Turns raw plan entries into canonical [`Step`] values.
//!
//! Two input shapes are accepted. Command entries name their action
//! (`create_rectangle`, `create_circle`, `extrude`, `cut_through_all`) and
//! carry numeric fields. Description entries carry a sentence, which is
//! matched against an ordered phrase table; the first rule that matches
//! decides the step. Lengths are plain scalars: unit suffixes such as `mm`
//! are dropped, never converted.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use super::step::{SkipReason, Step};
use super::RawStepEntry;
use crate::kernel::{Point2D, ProfileShape};

/// Structured actions understood by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    CreateRectangle,
    CreateCircle,
    Extrude,
    CutThroughAll,
}

impl CommandKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "create_rectangle" => Some(Self::CreateRectangle),
            "create_circle" => Some(Self::CreateCircle),
            "extrude" => Some(Self::Extrude),
            "cut_through_all" => Some(Self::CutThroughAll),
            _ => None,
        }
    }
}

/// Normalize a single plan entry. Never fails: unusable entries become
/// [`Step::Unrecognized`] with the reason attached.
pub fn normalize(entry: &RawStepEntry) -> Step {
    let result = match (&entry.kind, &entry.action) {
        (Some(kind), _) => match CommandKind::parse(kind) {
            Some(command) => normalize_command(entry, command),
            None => Err(SkipReason::UnknownKind { kind: kind.clone() }),
        },
        (None, Some(action)) => match CommandKind::parse(action) {
            Some(command) => normalize_command(entry, command),
            None => normalize_description(action),
        },
        (None, None) => Err(SkipReason::NoAction),
    };

    result.unwrap_or_else(|reason| Step::Unrecognized {
        raw: entry.display_text(),
        reason,
    })
}

/// Normalize every entry, preserving plan order.
pub fn normalize_all(entries: &[RawStepEntry]) -> Vec<Step> {
    entries.iter().map(normalize).collect()
}

// === Command entries ===

fn normalize_command(entry: &RawStepEntry, command: CommandKind) -> Result<Step, SkipReason> {
    match command {
        CommandKind::CreateRectangle => Ok(Step::DefineProfile {
            shape: ProfileShape::Rectangle {
                width: required_dimension(entry, "width")?,
                height: required_dimension(entry, "height")?,
            },
            placement: placement(entry)?,
        }),
        CommandKind::CreateCircle => {
            let radius = match dimension(entry, "diameter")? {
                Some(diameter) => diameter / 2.0,
                None => dimension(entry, "radius")?.ok_or_else(|| SkipReason::MissingField {
                    field: "diameter".into(),
                })?,
            };
            Ok(Step::DefineProfile {
                shape: ProfileShape::Circle { radius },
                placement: placement(entry)?,
            })
        }
        CommandKind::Extrude => Ok(Step::Extrude {
            depth: required_dimension(entry, "depth")?,
        }),
        CommandKind::CutThroughAll => Ok(Step::CutThroughAll {
            depth: dimension(entry, "depth")?,
        }),
    }
}

fn field<'a>(entry: &'a RawStepEntry, name: &str) -> Option<&'a Value> {
    entry.params.get(name).filter(|v| !v.is_null())
}

fn invalid(name: &str, value: &Value) -> SkipReason {
    SkipReason::InvalidField {
        field: name.to_string(),
        value: value.to_string(),
    }
}

/// A finite number of any sign, if present.
fn coordinate(entry: &RawStepEntry, name: &str) -> Result<Option<f64>, SkipReason> {
    match field(entry, name) {
        None => Ok(None),
        Some(value) => match value.as_f64() {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(invalid(name, value)),
        },
    }
}

/// A positive finite length, if present.
fn dimension(entry: &RawStepEntry, name: &str) -> Result<Option<f64>, SkipReason> {
    match coordinate(entry, name)? {
        Some(n) if n <= 0.0 => Err(SkipReason::InvalidField {
            field: name.to_string(),
            value: n.to_string(),
        }),
        other => Ok(other),
    }
}

fn required_dimension(entry: &RawStepEntry, name: &str) -> Result<f64, SkipReason> {
    dimension(entry, name)?.ok_or_else(|| SkipReason::MissingField {
        field: name.to_string(),
    })
}

fn placement(entry: &RawStepEntry) -> Result<Option<Point2D>, SkipReason> {
    match (coordinate(entry, "x")?, coordinate(entry, "y")?) {
        (Some(x), Some(y)) => Ok(Some(Point2D::new(x, y))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(SkipReason::MissingField { field: "y".into() }),
        (None, Some(_)) => Err(SkipReason::MissingField { field: "x".into() }),
    }
}

// === Description entries ===

type Extractor = fn(&Captures<'_>, &str) -> Result<Step, SkipReason>;

struct PhraseRule {
    name: &'static str,
    pattern: Regex,
    extract: Extractor,
}

const NUM: &str = r"(\d+(?:\.\d+)?)";

fn phrase_rules() -> &'static [PhraseRule] {
    static RULES: OnceLock<Vec<PhraseRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            rule(
                "two-circles-by-diameter",
                format!(r"(?i)\btwo\b.*?\bcircles?\b.*?\bdiameter\b\D*?{NUM}"),
                circle_from_diameter,
            ),
            rule(
                "circle-by-diameter",
                format!(r"(?i)\bcircle\b.*?\bdiameter\b\D*?{NUM}"),
                circle_from_diameter,
            ),
            rule(
                "circle-by-radius",
                format!(r"(?i)\bcircle\b.*?\bradius\b\D*?{NUM}"),
                circle_from_radius,
            ),
            rule(
                "rectangle-by-width-and-height",
                format!(r"(?i)\brectangle\b.*?{NUM}\s*(?:mm|units?)?\s*(?:x|×|by)\s*{NUM}"),
                rectangle_from_sides,
            ),
            rule(
                "arc-by-radius",
                format!(r"(?i)\barcs?\b.*?\bradius\b\D*?{NUM}"),
                arc_from_radius,
            ),
            rule(
                "line-by-length",
                format!(r"(?i)\b(?:(horizontal|vertical)\s+)?lines?\b.*?\blength\b\D*?{NUM}"),
                line_from_length,
            ),
            rule(
                "extrude-by-depth",
                format!(r"(?i)\bextrude\b\D*?{NUM}"),
                extrude_from_depth,
            ),
            rule(
                "cut-through-all",
                format!(r"(?i)\bcut\b.*?\bthrough\b(?:\D*?{NUM})?"),
                cut_through,
            ),
        ]
    })
}

fn rule(name: &'static str, pattern: String, extract: Extractor) -> PhraseRule {
    PhraseRule {
        name,
        pattern: Regex::new(&pattern).expect("phrase pattern compiles"),
        extract,
    }
}

fn placement_pattern() -> &'static Regex {
    static PLACEMENT: OnceLock<Regex> = OnceLock::new();
    PLACEMENT.get_or_init(|| {
        Regex::new(r"(?i)\bat\s*\(?\s*(-?\d+(?:\.\d+)?)\s*(?:mm|units?)?\s*,\s*(-?\d+(?:\.\d+)?)")
            .expect("placement pattern compiles")
    })
}

fn normalize_description(text: &str) -> Result<Step, SkipReason> {
    // Placement numbers must not be read as dimensions.
    let dimensions = placement_pattern().replace_all(text, " ");
    for rule in phrase_rules() {
        if let Some(caps) = rule.pattern.captures(&dimensions) {
            debug!(rule = rule.name, "description matched phrase rule");
            return (rule.extract)(&caps, text);
        }
    }
    Err(SkipReason::NoPatternMatch)
}

fn captured_length(caps: &Captures<'_>, group: usize, field: &str) -> Result<f64, SkipReason> {
    let text = caps.get(group).map(|m| m.as_str()).unwrap_or_default();
    match text.parse::<f64>() {
        Ok(n) if n > 0.0 && n.is_finite() => Ok(n),
        _ => Err(SkipReason::InvalidField {
            field: field.to_string(),
            value: text.to_string(),
        }),
    }
}

/// Optional "at (x, y)" phrase anywhere in the sentence.
fn described_placement(text: &str) -> Option<Point2D> {
    let caps = placement_pattern().captures(text)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some(Point2D::new(x, y))
}

fn circle_from_diameter(caps: &Captures<'_>, text: &str) -> Result<Step, SkipReason> {
    let diameter = captured_length(caps, 1, "diameter")?;
    Ok(Step::DefineProfile {
        shape: ProfileShape::Circle { radius: diameter / 2.0 },
        placement: described_placement(text),
    })
}

fn circle_from_radius(caps: &Captures<'_>, text: &str) -> Result<Step, SkipReason> {
    Ok(Step::DefineProfile {
        shape: ProfileShape::Circle {
            radius: captured_length(caps, 1, "radius")?,
        },
        placement: described_placement(text),
    })
}

fn rectangle_from_sides(caps: &Captures<'_>, text: &str) -> Result<Step, SkipReason> {
    Ok(Step::DefineProfile {
        shape: ProfileShape::Rectangle {
            width: captured_length(caps, 1, "width")?,
            height: captured_length(caps, 2, "height")?,
        },
        placement: described_placement(text),
    })
}

fn arc_from_radius(_caps: &Captures<'_>, _text: &str) -> Result<Step, SkipReason> {
    unsupported("arc")
}

fn line_from_length(caps: &Captures<'_>, _text: &str) -> Result<Step, SkipReason> {
    match caps.get(1) {
        Some(qualifier) => unsupported(&format!("{} line", qualifier.as_str().to_ascii_lowercase())),
        None => unsupported("line"),
    }
}

fn extrude_from_depth(caps: &Captures<'_>, _text: &str) -> Result<Step, SkipReason> {
    Ok(Step::Extrude {
        depth: captured_length(caps, 1, "depth")?,
    })
}

fn cut_through(caps: &Captures<'_>, _text: &str) -> Result<Step, SkipReason> {
    let depth = match caps.get(1) {
        Some(_) => Some(captured_length(caps, 1, "depth")?),
        None => None,
    };
    Ok(Step::CutThroughAll { depth })
}

fn unsupported(description: &str) -> Result<Step, SkipReason> {
    Err(SkipReason::UnsupportedGeometry {
        description: description.to_string(),
    })
}
