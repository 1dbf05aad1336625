use crate::domain::models::{SlotPolicy, TimeRange};
use crate::domain::time::TimeOfDay;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const GENERATOR_JSON: &str = "generator.json";
const SCHEDULING_JSON: &str = "scheduling.json";

pub const DEFAULT_GENERATOR_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SCHEDULE_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_SUGGESTION_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;
pub const API_KEY_ENV_KEYS: [&str; 2] = ["DAYPLANNER_GEMINI_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub generator: serde_json::Value,
    pub scheduling: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub base_url: String,
    pub schedule_model: String,
    pub suggestion_model: String,
    pub request_timeout_seconds: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GENERATOR_BASE_URL.to_string(),
            schedule_model: DEFAULT_SCHEDULE_MODEL.to_string(),
            suggestion_model: DEFAULT_SUGGESTION_MODEL.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "DayPlanner",
                "defaultTimeRange": {
                    "start": "09:00",
                    "end": "22:00"
                }
            }),
        ),
        (
            GENERATOR_JSON,
            serde_json::json!({
                "schema": 1,
                "baseUrl": DEFAULT_GENERATOR_BASE_URL,
                "scheduleModel": DEFAULT_SCHEDULE_MODEL,
                "suggestionModel": DEFAULT_SUGGESTION_MODEL,
                "requestTimeoutSeconds": DEFAULT_REQUEST_TIMEOUT_SECONDS
            }),
        ),
        (
            SCHEDULING_JSON,
            serde_json::json!({
                "schema": 1,
                "slotPolicy": "boundary"
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        generator: read_config(&config_dir.join(GENERATOR_JSON))?,
        scheduling: read_config(&config_dir.join(SCHEDULING_JSON))?,
    })
}

pub fn read_default_time_range(config_dir: &Path) -> Result<TimeRange, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let configured = app.get("defaultTimeRange");
    let start = match read_time_field(configured, "start")? {
        Some(start) => start,
        None => TimeOfDay::from_hm(9, 0).map_err(InfraError::InvalidConfig)?,
    };
    let end = match read_time_field(configured, "end")? {
        Some(end) => end,
        None => TimeOfDay::from_hm(22, 0).map_err(InfraError::InvalidConfig)?,
    };
    let range = TimeRange { start, end };
    range.validate().map_err(InfraError::InvalidConfig)?;
    Ok(range)
}

pub fn read_generator_settings(config_dir: &Path) -> Result<GeneratorSettings, InfraError> {
    let generator = read_config(&config_dir.join(GENERATOR_JSON))?;
    let defaults = GeneratorSettings::default();
    Ok(GeneratorSettings {
        base_url: read_string_field(&generator, "baseUrl").unwrap_or(defaults.base_url),
        schedule_model: read_string_field(&generator, "scheduleModel")
            .unwrap_or(defaults.schedule_model),
        suggestion_model: read_string_field(&generator, "suggestionModel")
            .unwrap_or(defaults.suggestion_model),
        request_timeout_seconds: generator
            .get("requestTimeoutSeconds")
            .and_then(serde_json::Value::as_u64)
            .filter(|seconds| *seconds > 0)
            .unwrap_or(defaults.request_timeout_seconds),
    })
}

pub fn read_slot_policy(config_dir: &Path) -> Result<SlotPolicy, InfraError> {
    let scheduling = read_config(&config_dir.join(SCHEDULING_JSON))?;
    let Some(raw) = read_string_field(&scheduling, "slotPolicy") else {
        return Ok(SlotPolicy::default());
    };
    match raw.to_ascii_lowercase().as_str() {
        "boundary" => Ok(SlotPolicy::Boundary),
        "gaps" => Ok(SlotPolicy::Gaps),
        other => Err(InfraError::InvalidConfig(format!(
            "unsupported slotPolicy '{other}' in {SCHEDULING_JSON}"
        ))),
    }
}

pub fn resolve_api_key_from_env() -> Option<String> {
    resolve_api_key(|key| std::env::var(key).ok())
}

pub fn resolve_api_key<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in API_KEY_ENV_KEYS {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

fn read_string_field(value: &serde_json::Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn read_time_field(
    value: Option<&serde_json::Value>,
    field: &str,
) -> Result<Option<TimeOfDay>, InfraError> {
    let Some(raw) = value.and_then(|value| read_string_field(value, field)) else {
        return Ok(None);
    };
    TimeOfDay::parse(&raw)
        .map(Some)
        .map_err(|error| InfraError::InvalidConfig(format!("defaultTimeRange.{field}: {error}")))
}
