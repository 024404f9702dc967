//! Construction plans: the request document, its raw entries and the
//! canonical [`Step`] values the interpreter consumes.

pub mod dxf;
pub mod normalizer;
pub mod step;


pub use normalizer::{normalize, normalize_all};
pub use step::{SkipReason, Step};

use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding the ordered step list in a request document.
pub const PLAN_KEY: &str = "modeling_plan";

/// Problems with the plan document itself. Raised before any geometry work.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("Request body is empty or not a JSON object")]
    EmptyBody,

    #[error("`modeling_plan` property not found in request body")]
    MissingPlan,

    #[error("`modeling_plan` must be an array, got {0}")]
    NotASequence(&'static str),

    #[error("`modeling_plan` contains no steps")]
    EmptyPlan,
}

/// One element of `modeling_plan`, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStepEntry {
    /// 1-based position in the plan.
    pub position: usize,
    /// Optional `step` number supplied by the plan author.
    pub label: Option<u64>,
    /// Explicit command kind (`create_circle`, `extrude`, ...).
    pub kind: Option<String>,
    /// Either a command keyword or a free-form description.
    pub action: Option<String>,
    /// Every other field, numeric parameters included.
    pub params: Map<String, Value>,
}

impl RawStepEntry {
    pub fn from_value(position: usize, value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self {
                position,
                ..Default::default()
            };
        };

        let mut params = object.clone();
        let kind = take_string(&mut params, "kind");
        let action = take_string(&mut params, "action");
        let label = params.remove("step").and_then(|v| v.as_u64());

        Self {
            position,
            label,
            kind,
            action,
            params,
        }
    }

    /// Command entry with numeric parameters, mostly for tests and demos.
    pub fn command(position: usize, kind: &str, params: &[(&str, f64)]) -> Self {
        Self {
            position,
            kind: Some(kind.to_string()),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect(),
            ..Default::default()
        }
    }

    /// Free-text entry.
    pub fn description(position: usize, text: &str) -> Self {
        Self {
            position,
            action: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// Text used when the entry is reported as skipped.
    pub fn display_text(&self) -> String {
        self.kind
            .clone()
            .or_else(|| self.action.clone())
            .unwrap_or_else(|| "<no action>".to_string())
    }
}

fn take_string(params: &mut Map<String, Value>, key: &str) -> Option<String> {
    match params.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            // Keep non-string values visible to the normalizer as parameters.
            params.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Extract the ordered raw entries from a request document.
pub fn parse_plan(document: &Value) -> Result<Vec<RawStepEntry>, InputError> {
    let object = match document.as_object() {
        Some(object) if !object.is_empty() => object,
        _ => return Err(InputError::EmptyBody),
    };

    let plan = match object.get(PLAN_KEY) {
        None | Some(Value::Null) => return Err(InputError::MissingPlan),
        Some(plan) => plan,
    };

    let steps = plan
        .as_array()
        .ok_or_else(|| InputError::NotASequence(json_type_name(plan)))?;

    if steps.is_empty() {
        return Err(InputError::EmptyPlan);
    }

    Ok(steps
        .iter()
        .enumerate()
        .map(|(i, value)| RawStepEntry::from_value(i + 1, value))
        .collect())
}

/// Decode raw request bytes and extract the plan entries.
pub fn parse_plan_bytes(body: &[u8]) -> Result<Vec<RawStepEntry>, InputError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(InputError::EmptyBody);
    }
    let document: Value =
        serde_json::from_slice(body).map_err(|e| InputError::MalformedBody(e.to_string()))?;
    parse_plan(&document)
}
