//! Raw change events as delivered by the notification channel.

use super::errors::PayloadError;
use serde_json::{Map, Number, Value};
use std::fmt;

/// Loss category carried by an incident.
///
/// The trigger emits it either as a number or as a string depending on the
/// column type it was copied from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryCode {
    Numeric(i64),
    Text(String),
}

impl CategoryCode {
    /// Code `0` (numeric or `"0"`) marks a ship/structure loss.
    pub fn is_structure_loss(&self) -> bool {
        match self {
            CategoryCode::Numeric(code) => *code == 0,
            CategoryCode::Text(code) => code == "0",
        }
    }
}

impl Default for CategoryCode {
    fn default() -> Self {
        CategoryCode::Text(String::new())
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryCode::Numeric(code) => write!(f, "{}", code),
            CategoryCode::Text(code) => f.write_str(code),
        }
    }
}

/// One notified incident insertion.
///
/// Foreign keys that are absent or malformed in the payload are kept as
/// `None`; they resolve to blank display fields instead of failing the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Incident identifier.
    pub id: i64,
    /// Character that suffered the loss.
    pub victim_id: Option<i64>,
    /// Character credited with the kill.
    pub killer_id: Option<i64>,
    /// Raw loss category.
    pub category: CategoryCode,
    /// Solar system the incident happened in.
    pub solar_system_id: Option<i64>,
    /// Event time in store epoch seconds.
    pub time_stamp: i64,
}

impl ChangeEvent {
    /// Parse and validate a notification body.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
        let object = value.as_object().ok_or(PayloadError::NotAnObject)?;

        Ok(Self {
            id: required_integer(object, "id")?,
            victim_id: object.get("victim_id").and_then(reference_id),
            killer_id: object.get("killer_id").and_then(reference_id),
            category: category(object.get("loss_type"))?,
            solar_system_id: object.get("solar_system_id").and_then(reference_id),
            time_stamp: required_integer(object, "time_stamp")?,
        })
    }
}

/// Lenient foreign-key reading: integers and numeric strings resolve,
/// anything else is treated as unresolved.
fn reference_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Required fields must be JSON integers; numeric strings are rejected.
fn required_integer(object: &Map<String, Value>, field: &'static str) -> Result<i64, PayloadError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(PayloadError::MissingField(field)),
        Some(value) => value.as_i64().ok_or_else(|| PayloadError::InvalidField {
            field,
            reason: format!("expected an integer, got {}", value),
        }),
    }
}

/// Integral numbers, including whole floats such as `0.0`, become numeric codes.
fn numeric_category(n: &Number) -> CategoryCode {
    if let Some(code) = n.as_i64() {
        return CategoryCode::Numeric(code);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            CategoryCode::Numeric(f as i64)
        }
        _ => CategoryCode::Text(n.to_string()),
    }
}

fn category(value: Option<&Value>) -> Result<CategoryCode, PayloadError> {
    match value {
        None | Some(Value::Null) => Ok(CategoryCode::default()),
        Some(Value::Number(n)) => Ok(numeric_category(n)),
        Some(Value::String(s)) => Ok(CategoryCode::Text(s.clone())),
        Some(other) => Err(PayloadError::InvalidField {
            field: "loss_type",
            reason: format!("expected a number or string, got {}", other),
        }),
    }
}
