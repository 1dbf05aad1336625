use crate::domain::time::TimeOfDay;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TASK_DURATION_MINUTES: u32 = 30;
pub const MIN_TASK_DURATION_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    #[default]
    Work,
    Class,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn validate(&self) -> Result<(), String> {
        if self.end <= self.start {
            return Err("time_range.end must be after time_range.start".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixedEvent {
    pub title: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default, alias = "type")]
    pub category: EventCategory,
}

impl FixedEvent {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "fixed_event.title")?;
        if self.end <= self.start {
            return Err(format!(
                "fixed_event '{}' must end after it starts",
                self.title.trim()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default, alias = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

impl Task {
    pub fn new(title: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            title: title.into(),
            duration_minutes: Some(duration_minutes),
        }
    }

    pub fn effective_duration_minutes(&self) -> u32 {
        self.duration_minutes
            .unwrap_or(DEFAULT_TASK_DURATION_MINUTES)
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        if let Some(duration) = self.duration_minutes {
            if duration < MIN_TASK_DURATION_MINUTES {
                return Err(format!(
                    "task.duration_minutes must be >= {MIN_TASK_DURATION_MINUTES}"
                ));
            }
        }
        Ok(())
    }
}

/// Stored and rendered as one to three stars.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn stars(self) -> &'static str {
        match self {
            Self::Low => "★",
            Self::Medium => "★★",
            Self::High => "★★★",
        }
    }

    pub fn star_count(self) -> usize {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        let normalized = value.trim();
        match normalized.to_ascii_lowercase().as_str() {
            "low" => return Ok(Self::Low),
            "medium" => return Ok(Self::Medium),
            "high" => return Ok(Self::High),
            _ => {}
        }

        let all_stars = !normalized.is_empty()
            && normalized.chars().all(|glyph| glyph == '★' || glyph == '☆');
        if !all_stars {
            return Err(format!("unsupported priority: '{normalized}'"));
        }
        match normalized.chars().count() {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(format!("unsupported priority: '{normalized}'")),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.stars().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    pub name: String,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
    pub priority: Priority,
    #[serde(default)]
    pub created_at: i64,
}

impl TodoItem {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "todo.name")?;
        if self.duration_minutes == 0 {
            return Err("todo.duration_minutes must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    pub name: Option<String>,
    pub duration_minutes: Option<u32>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreakSuggestion {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "task")]
    pub name: String,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl BreakSuggestion {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "suggestion.name")?;
        if self.duration_minutes == 0 {
            return Err("suggestion.duration_minutes must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreakHistoryEntry {
    #[serde(flatten)]
    pub suggestion: BreakSuggestion,
    pub selected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl From<TimeRange> for TimeSlot {
    fn from(range: TimeRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

/// How free time is derived from fixed events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Only the span before the earliest event and after the last one.
    #[default]
    Boundary,
    /// Every gap left after subtracting all events from the range.
    Gaps,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleItemKind {
    Fixed,
    Task,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ScheduleItemKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    #[serde(rename = "schedule")]
    pub items: Vec<ScheduleItem>,
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
