//! Input validation at the service boundary.
//!
//! `validator` errors are flattened into `{ "field.path": ["message", ..] }`
//! and raised as a 422 [`KennelError`].

use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::errors::KennelError;

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "email" => Some("must be a valid email"),
        "length" => Some("has invalid length"),
        "url" => Some("must be a valid URL"),
        _ => None,
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn push_field(out: &mut Map<String, Value>, key: &str, msg: String) {
    match out.get_mut(key) {
        Some(Value::Array(arr)) => arr.push(Value::String(msg)),
        _ => {
            out.insert(key.to_string(), Value::Array(vec![Value::String(msg)]));
        }
    }
}

fn push_validation_errors(out: &mut Map<String, Value>, prefix: &str, errs: &ValidationErrors) {
    for (field, kind) in errs.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let key = join_path(prefix, field);
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| m.to_string()))
                        .unwrap_or_else(|| e.code.to_string());
                    push_field(out, &key, msg);
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                push_validation_errors(out, &join_path(prefix, field), nested.as_ref());
            }
            ValidationErrorsKind::List(items) => {
                let base = join_path(prefix, field);
                for (idx, nested) in items {
                    push_validation_errors(out, &format!("{base}[{idx}]"), nested.as_ref());
                }
            }
        }
    }
}

/// Field path → messages map for a set of validation errors.
pub fn error_map(errs: &ValidationErrors) -> Map<String, Value> {
    let mut out = Map::new();
    push_validation_errors(&mut out, "", errs);
    out
}

/// Validate `input`, raising `Unprocessable` with the per-field messages.
pub fn validate<T>(input: &T, message: &str) -> anyhow::Result<()>
where
    T: Validate,
{
    input.validate().map_err(|e| {
        KennelError::unprocessable(message)
            .with_errors(Value::Object(error_map(&e)))
            .into_anyhow()
    })
}
