use crate::application::bootstrap::bootstrap_workspace;
use crate::application::break_history::BreakHistoryTracker;
use crate::application::break_suggestions::{
    BreakSuggestionRequester, SuggestionOutcome, SuggestionSource,
};
use crate::application::schedule_requester::{
    GeneratedSchedule, ScheduleRequest, ScheduleRequester, ScheduleSource,
};
use crate::application::todo_store::{sort_todos, TodoSort, TodoStore};
use crate::domain::models::{
    BreakHistoryEntry, BreakSuggestion, Priority, TimeRange, TodoItem, TodoPatch,
};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::config::{
    read_default_time_range, read_generator_settings, read_slot_policy, resolve_api_key_from_env,
    GeneratorSettings,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::slot_store::{SlotStore, SqliteSlotStore};
use crate::infrastructure::text_generator::{
    GeminiTextGenerator, TextGenerator, UnconfiguredTextGenerator,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Millisecond timestamp, bumped past every id already handed out or stored.
fn next_todo_id(existing: &[TodoItem], last_issued: &AtomicI64) -> i64 {
    let stored_max = existing.iter().map(|item| item.id).max().unwrap_or(0);
    let floor = stored_max.max(last_issued.load(Ordering::Relaxed));
    let id = Utc::now().timestamp_millis().max(floor + 1);
    last_issued.fetch_max(id, Ordering::Relaxed);
    id
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, what: &str) -> Result<Self, InfraError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| InfraError::InvalidInput(format!("{what} is already in progress")))?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    log: Arc<CommandLog>,
    default_time_range: TimeRange,
    todos: Arc<TodoStore<dyn SlotStore>>,
    break_history: Arc<BreakHistoryTracker<dyn SlotStore>>,
    schedule_requester: ScheduleRequester<dyn TextGenerator, dyn SlotStore>,
    suggestion_requester: BreakSuggestionRequester<dyn TextGenerator, dyn SlotStore>,
    schedule_in_flight: AtomicBool,
    suggestions_in_flight: AtomicBool,
    last_todo_id: AtomicI64,
}

impl AppState {
    /// Uses the Gemini client when an API key is present in the environment.
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let settings = read_generator_settings(&bootstrap.config_dir)?;
        let (schedule_generator, suggestion_generator) =
            build_generators(&settings, resolve_api_key_from_env())?;
        let slots: Arc<dyn SlotStore> = Arc::new(SqliteSlotStore::new(&bootstrap.database_path));
        Self::assemble(
            bootstrap.config_dir,
            bootstrap.logs_dir,
            bootstrap.database_path,
            slots,
            schedule_generator,
            suggestion_generator,
        )
    }

    pub fn with_text_generator(
        workspace_root: PathBuf,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let slots: Arc<dyn SlotStore> = Arc::new(SqliteSlotStore::new(&bootstrap.database_path));
        Self::assemble(
            bootstrap.config_dir,
            bootstrap.logs_dir,
            bootstrap.database_path,
            slots,
            Arc::clone(&generator),
            generator,
        )
    }

    fn assemble(
        config_dir: PathBuf,
        logs_dir: PathBuf,
        database_path: PathBuf,
        slots: Arc<dyn SlotStore>,
        schedule_generator: Arc<dyn TextGenerator>,
        suggestion_generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, InfraError> {
        let log = Arc::new(CommandLog::new(&logs_dir));
        let default_time_range = read_default_time_range(&config_dir)?;
        let slot_policy = read_slot_policy(&config_dir)?;

        let todos = Arc::new(TodoStore::new(Arc::clone(&slots), Arc::clone(&log)));
        let break_history = Arc::new(BreakHistoryTracker::new(slots, Arc::clone(&log)));

        let schedule_requester =
            ScheduleRequester::new(schedule_generator, Arc::clone(&todos))
                .with_slot_policy(slot_policy);
        let suggestion_requester =
            BreakSuggestionRequester::new(suggestion_generator, Arc::clone(&break_history));

        Ok(Self {
            config_dir,
            database_path,
            log,
            default_time_range,
            todos,
            break_history,
            schedule_requester,
            suggestion_requester,
            schedule_in_flight: AtomicBool::new(false),
            suggestions_in_flight: AtomicBool::new(false),
            last_todo_id: AtomicI64::new(0),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_log(&self) -> &CommandLog {
        &self.log
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.log.info(command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.log.error(command, message);
    }
}

fn build_generators(
    settings: &GeneratorSettings,
    api_key: Option<String>,
) -> Result<(Arc<dyn TextGenerator>, Arc<dyn TextGenerator>), InfraError> {
    let Some(api_key) = api_key else {
        let unconfigured: Arc<dyn TextGenerator> = Arc::new(UnconfiguredTextGenerator);
        return Ok((Arc::clone(&unconfigured), unconfigured));
    };
    let timeout = Duration::from_secs(settings.request_timeout_seconds);
    let schedule = GeminiTextGenerator::new(
        settings.base_url.clone(),
        settings.schedule_model.clone(),
        api_key.clone(),
        timeout,
    )?;
    let suggestion = GeminiTextGenerator::new(
        settings.base_url.clone(),
        settings.suggestion_model.clone(),
        api_key,
        timeout,
    )?;
    Ok((Arc::new(schedule), Arc::new(suggestion)))
}

pub fn list_todos_impl(state: &AppState, sort: Option<String>) -> Result<Vec<TodoItem>, InfraError> {
    let sort = match sort.as_deref() {
        Some(raw) => TodoSort::parse(raw)?,
        None => TodoSort::None,
    };
    Ok(sort_todos(state.todos.load(), sort))
}

pub fn create_todo_impl(
    state: &AppState,
    name: String,
    duration_minutes: Option<u32>,
    priority: Option<String>,
) -> Result<TodoItem, InfraError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InfraError::InvalidInput("name must not be empty".to_string()));
    }
    let Some(duration_minutes) = duration_minutes.filter(|minutes| *minutes > 0) else {
        return Err(InfraError::InvalidInput(
            "duration_minutes must be selected".to_string(),
        ));
    };
    let Some(priority) = priority
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Err(InfraError::InvalidInput("priority must be selected".to_string()));
    };
    let priority = Priority::parse(priority).map_err(InfraError::InvalidInput)?;

    insert_todo(state, "create_todo", name.to_string(), duration_minutes, priority)
}

fn insert_todo(
    state: &AppState,
    command: &str,
    name: String,
    duration_minutes: u32,
    priority: Priority,
) -> Result<TodoItem, InfraError> {
    let id = next_todo_id(&state.todos.load(), &state.last_todo_id);
    let item = TodoItem {
        id,
        name,
        duration_minutes,
        priority,
        created_at: id,
    };
    item.validate().map_err(InfraError::InvalidInput)?;

    let stored = state.todos.add(item.clone());
    if !stored.iter().any(|candidate| candidate.id == item.id) {
        return Err(InfraError::InvalidInput(format!(
            "todo could not be saved: id={}",
            item.id
        )));
    }
    state.log_info(command, &format!("created todo_id={}", item.id));
    Ok(item)
}

pub fn update_todo_impl(
    state: &AppState,
    id: i64,
    patch: TodoPatch,
) -> Result<TodoItem, InfraError> {
    if let Some(name) = patch.name.as_deref() {
        if name.trim().is_empty() {
            return Err(InfraError::InvalidInput("name must not be empty".to_string()));
        }
    }
    if patch.duration_minutes == Some(0) {
        return Err(InfraError::InvalidInput(
            "duration_minutes must be > 0".to_string(),
        ));
    }

    if !state.todos.load().iter().any(|item| item.id == id) {
        return Err(InfraError::InvalidInput(format!("todo not found: {id}")));
    }
    let updated = state.todos.update(id, &patch);
    let Some(item) = updated.into_iter().find(|item| item.id == id) else {
        return Err(InfraError::InvalidInput(format!("todo not found: {id}")));
    };
    state.log_info("update_todo", &format!("updated todo_id={id}"));
    Ok(item)
}

/// Returns whether an item was removed.
pub fn delete_todo_impl(state: &AppState, id: i64) -> Result<bool, InfraError> {
    let before = state.todos.load().len();
    let remaining = state.todos.delete(id);
    let removed = remaining.len() < before;
    if removed {
        state.log_info("delete_todo", &format!("deleted todo_id={id}"));
    }
    Ok(removed)
}

pub fn default_time_range_impl(state: &AppState) -> Result<TimeRange, InfraError> {
    Ok(state.default_time_range)
}

pub async fn generate_schedule_impl(
    state: &AppState,
    request: ScheduleRequest,
) -> Result<GeneratedSchedule, InfraError> {
    request.validate().map_err(InfraError::InvalidInput)?;
    let _guard = InFlightGuard::acquire(&state.schedule_in_flight, "schedule generation")?;

    let generated = state.schedule_requester.request_schedule(&request).await;
    match &generated.source {
        ScheduleSource::Ai => state.log_info(
            "generate_schedule",
            &format!("generated items={}", generated.schedule.items.len()),
        ),
        ScheduleSource::Fallback { reason } => {
            state.log.warn(
                "generate_schedule",
                &format!(
                    "fallback items={} dropped={} reason={reason}",
                    generated.schedule.items.len(),
                    generated.dropped_tasks.len()
                ),
            )
        }
    }
    Ok(generated)
}

pub async fn fetch_break_suggestions_impl(
    state: &AppState,
) -> Result<SuggestionOutcome, InfraError> {
    let _guard = InFlightGuard::acquire(&state.suggestions_in_flight, "break suggestion request")?;

    let outcome = state.suggestion_requester.fetch_suggestions().await;
    match &outcome.source {
        SuggestionSource::Ai => state.log_info(
            "fetch_break_suggestions",
            &format!("suggestions={}", outcome.suggestions.len()),
        ),
        SuggestionSource::Fallback { reason } => state
            .log
            .warn("fetch_break_suggestions", &format!("fallback reason={reason}")),
    }
    Ok(outcome)
}

/// Adds the suggestion to the to-do list, then records it in history.
pub fn accept_break_suggestion_impl(
    state: &AppState,
    suggestion: BreakSuggestion,
) -> Result<TodoItem, InfraError> {
    suggestion.validate().map_err(InfraError::InvalidInput)?;
    let priority = Priority::parse(&suggestion.priority).unwrap_or(Priority::Medium);

    let created = insert_todo(
        state,
        "accept_break_suggestion",
        suggestion.name.trim().to_string(),
        suggestion.duration_minutes,
        priority,
    )?;
    state.break_history.record(&suggestion);
    Ok(created)
}

pub fn list_break_history_impl(state: &AppState) -> Result<Vec<BreakHistoryEntry>, InfraError> {
    Ok(state.break_history.history())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::break_suggestions::fallback_suggestions;
    use crate::application::schedule_fallback::REVIEW_TITLE;
    use crate::application::todo_store::TODO_SLOT_KEY;
    use crate::domain::models::{EventCategory, FixedEvent, ScheduleItemKind, Task};
    use crate::domain::time::TimeOfDay;
    use crate::infrastructure::slot_store::InMemorySlotStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "dayplanner-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self, generator: Arc<dyn TextGenerator>) -> AppState {
            AppState::with_text_generator(self.path.clone(), generator)
                .expect("initialize app state")
        }

        fn offline_state(&self) -> AppState {
            self.app_state(Arc::new(UnconfiguredTextGenerator))
        }

        fn state_with_slots(&self, slots: Arc<dyn SlotStore>) -> AppState {
            let bootstrap = bootstrap_workspace(&self.path).expect("bootstrap workspace");
            let generator: Arc<dyn TextGenerator> = Arc::new(UnconfiguredTextGenerator);
            AppState::assemble(
                bootstrap.config_dir,
                bootstrap.logs_dir,
                bootstrap.database_path,
                slots,
                Arc::clone(&generator),
                generator,
            )
            .expect("assemble app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    /// Rejects writes to the to-do slot only.
    #[derive(Default)]
    struct TodoWriteFailingSlotStore {
        inner: InMemorySlotStore,
    }

    impl SlotStore for TodoWriteFailingSlotStore {
        fn read(&self, key: &str) -> Result<Option<String>, InfraError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), InfraError> {
            if key == TODO_SLOT_KEY {
                return Err(InfraError::Io(std::io::Error::other("disk full")));
            }
            self.inner.write(key, value)
        }
    }

    #[derive(Default)]
    struct QueuedTextGenerator {
        responses: Mutex<VecDeque<Result<String, InfraError>>>,
    }

    impl QueuedTextGenerator {
        fn with_responses(responses: Vec<Result<String, InfraError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for QueuedTextGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, InfraError> {
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Err(InfraError::Generation("no queued response".to_string())))
        }
    }

    /// Blocks until released so a second request can observe the in-flight flag.
    struct GatedTextGenerator {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl TextGenerator for GatedTextGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, InfraError> {
            self.entered.notify_one();
            self.release.notified().await;
            Err(InfraError::Generation("released".to_string()))
        }
    }

    fn time(value: &str) -> TimeOfDay {
        TimeOfDay::parse(value).expect("valid time")
    }

    fn schedule_request() -> ScheduleRequest {
        ScheduleRequest {
            time_range: TimeRange {
                start: time("09:00"),
                end: time("22:00"),
            },
            fixed_events: vec![FixedEvent {
                title: "Seminar".to_string(),
                start: time("13:00"),
                end: time("15:00"),
                category: EventCategory::Class,
            }],
            tasks: vec![Task::new("Problem set", 50)],
        }
    }

    #[test]
    fn create_todo_rejects_missing_fields() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();

        assert!(create_todo_impl(&state, "  ".to_string(), Some(30), Some("★".to_string())).is_err());
        assert!(create_todo_impl(&state, "Laundry".to_string(), None, Some("★".to_string())).is_err());
        assert!(create_todo_impl(&state, "Laundry".to_string(), Some(30), None).is_err());
        assert!(
            create_todo_impl(&state, "Laundry".to_string(), Some(30), Some("urgent".to_string()))
                .is_err()
        );
        assert!(list_todos_impl(&state, None).expect("list todos").is_empty());
    }

    #[test]
    fn create_list_and_sort_todos_roundtrip() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();

        let first = create_todo_impl(&state, " Laundry ".to_string(), Some(30), Some("★".to_string()))
            .expect("create first");
        let second = create_todo_impl(&state, "Essay".to_string(), Some(90), Some("★★★".to_string()))
            .expect("create second");
        assert_eq!(first.name, "Laundry");
        assert!(second.id > first.id);

        let listed = list_todos_impl(&state, None).expect("list todos");
        assert_eq!(listed, vec![first.clone(), second.clone()]);

        let by_priority = list_todos_impl(&state, Some("priority".to_string())).expect("sorted");
        assert_eq!(by_priority, vec![second, first]);
        assert!(list_todos_impl(&state, Some("random".to_string())).is_err());
    }

    #[test]
    fn todos_persist_across_app_state_instances() {
        let workspace = TempWorkspace::new();
        let created = {
            let state = workspace.offline_state();
            create_todo_impl(&state, "Call bank".to_string(), Some(15), Some("★★".to_string()))
                .expect("create todo")
        };

        let reopened = workspace.offline_state();
        assert_eq!(list_todos_impl(&reopened, None).expect("list"), vec![created]);
    }

    #[test]
    fn update_and_delete_todo_flow() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();
        let created = create_todo_impl(&state, "Laundry".to_string(), Some(30), Some("★".to_string()))
            .expect("create todo");

        let updated = update_todo_impl(
            &state,
            created.id,
            TodoPatch {
                name: Some("Fold laundry".to_string()),
                duration_minutes: None,
                priority: Some(Priority::High),
            },
        )
        .expect("update todo");
        assert_eq!(updated.name, "Fold laundry");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.duration_minutes, 30);

        assert!(update_todo_impl(&state, created.id + 1, TodoPatch::default()).is_err());
        assert!(!delete_todo_impl(&state, created.id + 1).expect("delete unknown"));
        assert_eq!(list_todos_impl(&state, None).expect("list").len(), 1);
        assert!(delete_todo_impl(&state, created.id).expect("delete existing"));
        assert!(list_todos_impl(&state, None).expect("list").is_empty());
    }

    #[test]
    fn default_time_range_comes_from_config() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();
        let range = default_time_range_impl(&state).expect("default range");
        assert_eq!(range.start, time("09:00"));
        assert_eq!(range.end, time("22:00"));
    }

    #[tokio::test]
    async fn generate_schedule_requires_inputs() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();
        let mut request = schedule_request();
        request.fixed_events.clear();
        request.tasks.clear();

        match generate_schedule_impl(&state, request).await {
            Err(InfraError::InvalidInput(message)) => assert!(message.contains("at least one")),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn offline_generation_uses_fallback_and_logs_warning() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();

        let generated = generate_schedule_impl(&state, schedule_request())
            .await
            .expect("generate schedule");
        assert!(matches!(generated.source, ScheduleSource::Fallback { .. }));
        assert_eq!(generated.schedule.items[0].title, REVIEW_TITLE);
        assert_eq!(generated.schedule.items[1].kind, ScheduleItemKind::Fixed);
        assert_eq!(generated.schedule.items[2].title, "Problem set");
        assert_eq!(generated.schedule.items[2].start_time, time("09:00"));

        let log_path = state.command_log().path().expect("log path");
        let log = fs::read_to_string(log_path).expect("read command log");
        assert!(log.contains("\"command\":\"generate_schedule\""));
        assert!(log.contains("\"level\":\"warn\""));
    }

    #[tokio::test]
    async fn generated_schedule_is_returned_when_parsable() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state(Arc::new(QueuedTextGenerator::with_responses(vec![Ok(
            r#"{"schedule": [{"startTime": "09:00", "endTime": "09:50", "title": "Problem set", "type": "task"}]}"#
                .to_string(),
        )])));

        let generated = generate_schedule_impl(&state, schedule_request())
            .await
            .expect("generate schedule");
        assert_eq!(generated.source, ScheduleSource::Ai);
        assert_eq!(generated.schedule.items.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_generation_is_rejected_while_first_is_in_flight() {
        let workspace = TempWorkspace::new();
        let generator = Arc::new(GatedTextGenerator {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let state = Arc::new(workspace.app_state(generator.clone()));

        let first = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { generate_schedule_impl(&state, schedule_request()).await })
        };
        generator.entered.notified().await;

        match generate_schedule_impl(&state, schedule_request()).await {
            Err(InfraError::InvalidInput(message)) => assert!(message.contains("already in progress")),
            other => panic!("expected in-flight rejection, got {other:?}"),
        }

        generator.release.notify_one();
        let first = first.await.expect("join first request").expect("first request");
        assert!(first.is_fallback());
        assert!(!state.schedule_in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn offline_break_suggestions_use_static_list() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();

        let outcome = fetch_break_suggestions_impl(&state).await.expect("suggestions");
        assert_eq!(outcome.suggestions, fallback_suggestions());
        assert!(matches!(outcome.source, SuggestionSource::Fallback { .. }));
    }

    #[test]
    fn accepting_suggestion_records_history_and_creates_todo() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();
        let suggestion = fallback_suggestions().remove(1);

        let created = accept_break_suggestion_impl(&state, suggestion.clone()).expect("accept");
        assert_eq!(created.name, suggestion.name);
        assert_eq!(created.duration_minutes, 15);
        assert_eq!(created.priority, Priority::High);

        let history = list_break_history_impl(&state).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].suggestion, suggestion);
        assert_eq!(list_todos_impl(&state, None).expect("list"), vec![created]);
    }

    #[test]
    fn accepting_suggestion_with_unknown_priority_defaults_to_medium() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();
        let mut suggestion = fallback_suggestions().remove(0);
        suggestion.priority = "high-ish".to_string();

        let created = accept_break_suggestion_impl(&state, suggestion).expect("accept");
        assert_eq!(created.priority, Priority::Medium);
    }

    #[test]
    fn failed_todo_write_leaves_break_history_untouched() {
        let workspace = TempWorkspace::new();
        let state = workspace.state_with_slots(Arc::new(TodoWriteFailingSlotStore::default()));

        let result = accept_break_suggestion_impl(&state, fallback_suggestions().remove(0));
        assert!(matches!(result, Err(InfraError::InvalidInput(_))));
        assert!(list_break_history_impl(&state).expect("history").is_empty());
        assert!(list_todos_impl(&state, None).expect("list").is_empty());
    }

    #[test]
    fn todo_ids_increase_within_one_state() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();
        let ids = (0..5)
            .map(|index| {
                create_todo_impl(&state, format!("Item {index}"), Some(10), Some("★".to_string()))
                    .expect("create todo")
                    .id
            })
            .collect::<Vec<_>>();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(state.last_todo_id.load(Ordering::Relaxed), ids[4]);
    }

    #[test]
    fn command_error_logs_and_stringifies() {
        let workspace = TempWorkspace::new();
        let state = workspace.offline_state();
        let message = state.command_error(
            "create_todo",
            &InfraError::InvalidInput("name must not be empty".to_string()),
        );
        assert!(message.contains("name must not be empty"));

        let log = fs::read_to_string(state.command_log().path().expect("log path"))
            .expect("read command log");
        assert!(log.contains("\"level\":\"error\""));
    }

    #[test]
    fn generators_fall_back_to_unconfigured_without_key() {
        let settings = GeneratorSettings::default();
        assert!(build_generators(&settings, None).is_ok());
        assert!(build_generators(&settings, Some("key".to_string())).is_ok());
    }
}
