//! Payload validation — the only synchronous gate in front of the queue.
//!
//! Both the submission API and the worker run the same checks: the API so a
//! malformed request never becomes a job, the worker as defense in depth
//! against anything that bypassed submission-time validation. Faults are
//! collected across all fields rather than stopping at the first, so the
//! caller sees everything that is wrong in one response.

use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;
use crate::types::NotificationPayload;

/// Fields a payload must carry.
const REQUIRED_FIELDS: [&str; 3] = ["userId", "message", "type"];

/// How a single field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFault {
    Missing,
    NotAString,
    Blank,
}

impl std::fmt::Display for FieldFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldFault::Missing => write!(f, "is missing"),
            FieldFault::NotAString => write!(f, "must be a string"),
            FieldFault::Blank => write!(f, "must not be empty"),
        }
    }
}

/// A rejected payload, enumerating every offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid notification payload: {}", self.describe())]
pub struct ValidationError {
    pub faults: Vec<(&'static str, FieldFault)>,
}

impl ValidationError {
    fn describe(&self) -> String {
        self.faults
            .iter()
            .map(|(field, fault)| format!("{} {}", field, fault))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether a given field is among the faults.
    pub fn names(&self, field: &str) -> bool {
        self.faults.iter().any(|(f, _)| *f == field)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Validate an arbitrary JSON value into a well-typed payload.
///
/// Rejects payloads missing `userId`, `message`, or `type`, or where any of
/// these is not a string or is empty/whitespace-only.
pub fn validated(value: &Value) -> Result<NotificationPayload, ValidationError> {
    let mut faults = Vec::new();
    let mut fields: [Option<&str>; 3] = [None; 3];

    for (i, name) in REQUIRED_FIELDS.iter().enumerate() {
        match value.get(name) {
            None | Some(Value::Null) => faults.push((*name, FieldFault::Missing)),
            Some(Value::String(s)) if s.trim().is_empty() => {
                faults.push((*name, FieldFault::Blank));
            }
            Some(Value::String(s)) => fields[i] = Some(s.as_str()),
            Some(_) => faults.push((*name, FieldFault::NotAString)),
        }
    }

    if !faults.is_empty() {
        return Err(ValidationError { faults });
    }

    // All three slots are filled once faults is empty
    Ok(NotificationPayload {
        user_id: fields[0].unwrap_or_default().to_string(),
        message: fields[1].unwrap_or_default().to_string(),
        kind: fields[2].unwrap_or_default().to_string(),
    })
}

impl NotificationPayload {
    /// Re-check an already-typed payload, e.g. one deserialized from a job
    /// envelope. Same blank rules as [`validated`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut faults = Vec::new();
        for (name, value) in [
            ("userId", &self.user_id),
            ("message", &self.message),
            ("type", &self.kind),
        ] {
            if value.trim().is_empty() {
                faults.push((name, FieldFault::Blank));
            }
        }
        if faults.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { faults })
        }
    }
}
