pub mod bootstrap;
pub mod break_history;
pub mod break_suggestions;
pub mod commands;
pub mod generation;
pub mod schedule_fallback;
pub mod schedule_requester;
pub mod todo_store;
