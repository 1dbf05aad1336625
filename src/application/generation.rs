use crate::infrastructure::error::InfraError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*").expect("valid code fence pattern"));
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid json object pattern"));
static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid json array pattern"));

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation failed: {0}")]
    Service(#[from] InfraError),
    #[error("generator returned an empty response")]
    EmptyResponse,
    #[error("response is not valid JSON: {0}")]
    Unparsable(String),
    #[error("response JSON has an unexpected shape: {0}")]
    InvalidShape(String),
}

pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Parses the whole response as JSON, falling back to the outermost `{...}` and then `[...]` span.
pub fn extract_json_value(text: &str) -> Result<Value, GenerationError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let direct_error = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => return Ok(value),
        Err(error) => error,
    };

    let mut last_error = None;
    for pattern in [&JSON_OBJECT, &JSON_ARRAY] {
        let Some(candidate) = pattern.find(&cleaned) else {
            continue;
        };
        match serde_json::from_str::<Value>(candidate.as_str()) {
            Ok(value) => return Ok(value),
            Err(error) => last_error = Some(error),
        }
    }

    Err(match last_error {
        Some(error) => {
            GenerationError::Unparsable(format!("extracted JSON span is invalid: {error}"))
        }
        None => GenerationError::Unparsable(format!("no JSON object found ({direct_error})")),
    })
}

/// Returns the array stored under the first present key, or the value itself when it is an array.
pub fn array_payload(value: Value, keys: &[&str]) -> Result<Vec<Value>, GenerationError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => {
            let Some(found) = keys.iter().find_map(|key| object.remove(*key)) else {
                return Err(GenerationError::InvalidShape(format!(
                    "expected one of [{}]",
                    keys.join(", ")
                )));
            };
            match found {
                Value::Array(items) => Ok(items),
                other => Err(GenerationError::InvalidShape(format!(
                    "expected an array, found {}",
                    json_kind(&other)
                ))),
            }
        }
        other => Err(GenerationError::InvalidShape(format!(
            "expected an object or array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
