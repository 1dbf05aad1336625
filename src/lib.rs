pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::break_suggestions::SuggestionOutcome;
use application::commands::{
    accept_break_suggestion_impl, create_todo_impl, default_time_range_impl, delete_todo_impl,
    fetch_break_suggestions_impl, generate_schedule_impl, list_break_history_impl,
    list_todos_impl, update_todo_impl, AppState,
};
use application::schedule_requester::{GeneratedSchedule, ScheduleRequest};
use domain::models::{BreakHistoryEntry, BreakSuggestion, TimeRange, TodoItem, TodoPatch};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub workspace_root: String,
    pub database_path: String,
}

fn resolve_workspace_root(root: Option<String>) -> Result<PathBuf, String> {
    match root {
        Some(path) => Ok(PathBuf::from(path)),
        None => std::env::current_dir().map_err(|error| error.to_string()),
    }
}

pub fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = resolve_workspace_root(root)?;
    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

/// Builds the shared state a UI shell holds for the lifetime of the process.
pub fn init_state(root: Option<String>) -> Result<AppState, String> {
    let workspace_root = resolve_workspace_root(root)?;
    AppState::new(workspace_root).map_err(|error| error.to_string())
}

pub fn list_todos(state: &AppState, sort: Option<String>) -> Result<Vec<TodoItem>, String> {
    list_todos_impl(state, sort).map_err(|error| state.command_error("list_todos", &error))
}

pub fn create_todo(
    state: &AppState,
    name: String,
    duration_minutes: Option<u32>,
    priority: Option<String>,
) -> Result<TodoItem, String> {
    create_todo_impl(state, name, duration_minutes, priority)
        .map_err(|error| state.command_error("create_todo", &error))
}

pub fn update_todo(state: &AppState, id: i64, patch: TodoPatch) -> Result<TodoItem, String> {
    update_todo_impl(state, id, patch).map_err(|error| state.command_error("update_todo", &error))
}

pub fn delete_todo(state: &AppState, id: i64) -> Result<bool, String> {
    delete_todo_impl(state, id).map_err(|error| state.command_error("delete_todo", &error))
}

pub fn default_time_range(state: &AppState) -> Result<TimeRange, String> {
    default_time_range_impl(state)
        .map_err(|error| state.command_error("default_time_range", &error))
}

pub async fn generate_schedule(
    state: &AppState,
    request: ScheduleRequest,
) -> Result<GeneratedSchedule, String> {
    generate_schedule_impl(state, request)
        .await
        .map_err(|error| state.command_error("generate_schedule", &error))
}

pub async fn fetch_break_suggestions(state: &AppState) -> Result<SuggestionOutcome, String> {
    fetch_break_suggestions_impl(state)
        .await
        .map_err(|error| state.command_error("fetch_break_suggestions", &error))
}

pub fn accept_break_suggestion(
    state: &AppState,
    suggestion: BreakSuggestion,
) -> Result<TodoItem, String> {
    accept_break_suggestion_impl(state, suggestion)
        .map_err(|error| state.command_error("accept_break_suggestion", &error))
}

pub fn list_break_history(state: &AppState) -> Result<Vec<BreakHistoryEntry>, String> {
    list_break_history_impl(state).map_err(|error| state.command_error("list_break_history", &error))
}
