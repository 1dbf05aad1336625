use crate::application::generation::{array_payload, extract_json_value, GenerationError};
use crate::application::schedule_fallback::compose_fallback_schedule;
use crate::application::todo_store::TodoStore;
use crate::domain::models::{
    EventCategory, FixedEvent, Schedule, ScheduleItem, ScheduleItemKind, SlotPolicy, Task,
    TimeRange, TodoItem,
};
use crate::domain::time::TimeOfDay;
use crate::infrastructure::slot_store::SlotStore;
use crate::infrastructure::text_generator::TextGenerator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub type ScheduleGenerationError = GenerationError;

const SCHEDULE_ENVELOPE_KEYS: [&str; 2] = ["schedule", "items"];
const FALLBACK_NOTICE: &str =
    "The schedule could not be generated, so a basic plan was created from your inputs.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub time_range: TimeRange,
    #[serde(default)]
    pub fixed_events: Vec<FixedEvent>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl ScheduleRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.fixed_events.is_empty() && self.tasks.is_empty() {
            return Err("add at least one task or fixed event".to_string());
        }
        self.time_range.validate()?;
        for event in &self.fixed_events {
            event.validate()?;
        }
        for task in &self.tasks {
            task.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleSource {
    Ai,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSchedule {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub source: ScheduleSource,
    pub dropped_tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl GeneratedSchedule {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ScheduleSource::Fallback { .. })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheduleItem {
    #[serde(alias = "start")]
    start_time: String,
    #[serde(alias = "end")]
    end_time: String,
    #[serde(alias = "task", alias = "name")]
    title: String,
    #[serde(rename = "type", alias = "kind")]
    kind: String,
}

impl RawScheduleItem {
    fn into_item(self, index: usize) -> Result<ScheduleItem, GenerationError> {
        let invalid =
            |detail: String| GenerationError::InvalidShape(format!("schedule item {index}: {detail}"));
        let start_time = TimeOfDay::parse(&self.start_time).map_err(invalid)?;
        let end_time = TimeOfDay::parse(&self.end_time).map_err(invalid)?;
        let kind = match self.kind.trim().to_ascii_lowercase().as_str() {
            "fixed" => ScheduleItemKind::Fixed,
            "task" => ScheduleItemKind::Task,
            "break" => ScheduleItemKind::Break,
            other => return Err(invalid(format!("unsupported item type '{other}'"))),
        };
        Ok(ScheduleItem {
            start_time,
            end_time,
            title: self.title.trim().to_string(),
            kind,
        })
    }
}

/// Normalizes a free-text generator response into a [`Schedule`].
pub fn parse_schedule_response(text: &str) -> Result<Schedule, ScheduleGenerationError> {
    let value = extract_json_value(text)?;
    let items = array_payload(value, &SCHEDULE_ENVELOPE_KEYS)?
        .into_iter()
        .enumerate()
        .map(|(index, raw)| parse_schedule_item(index, raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Schedule { items })
}

fn parse_schedule_item(index: usize, raw: Value) -> Result<ScheduleItem, GenerationError> {
    serde_json::from_value::<RawScheduleItem>(raw)
        .map_err(|error| GenerationError::InvalidShape(format!("schedule item {index}: {error}")))?
        .into_item(index)
}

fn category_label(category: EventCategory) -> &'static str {
    match category {
        EventCategory::Work => "work",
        EventCategory::Class => "class",
        EventCategory::Other => "other",
    }
}

fn bullet_list<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items.iter().map(render).collect::<Vec<_>>().join("\n")
}

/// Deterministic prompt: same inputs always produce the same text.
pub fn schedule_prompt(request: &ScheduleRequest, todos: &[TodoItem]) -> String {
    let events = bullet_list(&request.fixed_events, |event| {
        format!(
            "- {} ({}): {}-{}",
            event.title.trim(),
            category_label(event.category),
            event.start,
            event.end
        )
    });
    let tasks = bullet_list(&request.tasks, |task| {
        format!(
            "- {}: {} minutes",
            task.title.trim(),
            task.effective_duration_minutes()
        )
    });
    let todo_lines = bullet_list(todos, |todo| {
        format!(
            "- {}: {} minutes (priority {})",
            todo.name.trim(),
            todo.duration_minutes,
            todo.priority.stars()
        )
    });

    format!(
        r#"Optimize the following day. Output JSON only.

Available time: {start} to {end}

Fixed events (do not move):
{events}

Tasks:
{tasks}

If there is room, also include items from the to-do list:
{todo_lines}

Scheduling principles:
1. Place work that needs focus in the morning, especially 09:00-12:00.
2. Concentration drops around 14:00-15:00; place exercise or light work there.
3. Split focused work into 25-50 minute blocks with 5-15 minute breaks between them.
4. After two hours of work, add a longer break of 15-30 minutes.
5. Avoid consecutive breaks and keep about 45 minutes for lunch.
6. Leave slack between events for travel.

Respond with JSON only, without markdown:
{{
  "schedule": [
    {{"startTime": "HH:MM", "endTime": "HH:MM", "title": "task name", "type": "fixed|task|break"}}
  ]
}}"#,
        start = request.time_range.start,
        end = request.time_range.end,
    )
}

/// Asks the generator for a day plan and falls back to the deterministic synthesizer.
pub struct ScheduleRequester<G, S>
where
    G: TextGenerator + ?Sized,
    S: SlotStore + ?Sized,
{
    generator: Arc<G>,
    todos: Arc<TodoStore<S>>,
    slot_policy: SlotPolicy,
}

impl<G, S> ScheduleRequester<G, S>
where
    G: TextGenerator + ?Sized,
    S: SlotStore + ?Sized,
{
    pub fn new(generator: Arc<G>, todos: Arc<TodoStore<S>>) -> Self {
        Self {
            generator,
            todos,
            slot_policy: SlotPolicy::default(),
        }
    }

    pub fn with_slot_policy(mut self, slot_policy: SlotPolicy) -> Self {
        self.slot_policy = slot_policy;
        self
    }

    pub fn build_prompt(&self, request: &ScheduleRequest) -> String {
        schedule_prompt(request, &self.todos.load())
    }

    pub async fn request_ai_schedule(
        &self,
        request: &ScheduleRequest,
    ) -> Result<Schedule, ScheduleGenerationError> {
        let prompt = self.build_prompt(request);
        let text = self.generator.generate(&prompt).await?;
        parse_schedule_response(&text)
    }

    pub async fn request_schedule(&self, request: &ScheduleRequest) -> GeneratedSchedule {
        match self.request_ai_schedule(request).await {
            Ok(schedule) => GeneratedSchedule {
                schedule,
                source: ScheduleSource::Ai,
                dropped_tasks: Vec::new(),
                notice: None,
            },
            Err(error) => {
                let fallback = compose_fallback_schedule(
                    request.time_range,
                    &request.fixed_events,
                    &request.tasks,
                    self.slot_policy,
                );
                let notice = match fallback.dropped_tasks.len() {
                    0 => FALLBACK_NOTICE.to_string(),
                    count => format!(
                        "{FALLBACK_NOTICE} {count} task(s) did not fit into the available time."
                    ),
                };
                GeneratedSchedule {
                    schedule: fallback.schedule,
                    source: ScheduleSource::Fallback {
                        reason: error.to_string(),
                    },
                    dropped_tasks: fallback.dropped_tasks,
                    notice: Some(notice),
                }
            }
        }
    }
}
