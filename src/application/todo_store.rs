use crate::domain::models::{TodoItem, TodoPatch};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::slot_store::{read_records, write_records, SlotRecords, SlotStore};
use serde_json::Value;
use std::sync::Arc;

pub const TODO_SLOT_KEY: &str = "todoList";
const LOG_SOURCE: &str = "todo_store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TodoSort {
    #[default]
    None,
    Priority,
    Duration,
    CreatedAt,
}

impl TodoSort {
    pub fn parse(value: &str) -> Result<Self, InfraError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "priority" => Ok(Self::Priority),
            "duration" => Ok(Self::Duration),
            "created_at" | "createdat" => Ok(Self::CreatedAt),
            other => Err(InfraError::InvalidInput(format!(
                "unsupported todo sort: {other}"
            ))),
        }
    }
}

/// Stable sort: most stars first, longest first, or newest id first.
pub fn sort_todos(mut items: Vec<TodoItem>, sort: TodoSort) -> Vec<TodoItem> {
    match sort {
        TodoSort::None => {}
        TodoSort::Priority => items.sort_by(|left, right| {
            right.priority.star_count().cmp(&left.priority.star_count())
        }),
        TodoSort::Duration => {
            items.sort_by(|left, right| right.duration_minutes.cmp(&left.duration_minutes))
        }
        TodoSort::CreatedAt => items.sort_by(|left, right| right.id.cmp(&left.id)),
    }
    items
}

/// Read-modify-write CRUD over the `todoList` slot.
///
/// Storage failures never escape: reads degrade to an empty list and failed writes leave the stored
/// list as it was. Elements that no longer decode are kept in the slot, and a slot that cannot be
/// read at all is never overwritten.
pub struct TodoStore<S>
where
    S: SlotStore + ?Sized,
{
    slots: Arc<S>,
    log: Arc<CommandLog>,
}

impl<S> TodoStore<S>
where
    S: SlotStore + ?Sized,
{
    pub fn new(slots: Arc<S>, log: Arc<CommandLog>) -> Self {
        Self { slots, log }
    }

    pub fn load(&self) -> Vec<TodoItem> {
        self.read_contents()
            .map(|contents| contents.records)
            .unwrap_or_default()
    }

    pub fn save(&self, items: &[TodoItem]) -> bool {
        match self.read_contents() {
            Some(contents) => self.try_write(items, &contents.unreadable),
            None => false,
        }
    }

    pub fn add(&self, item: TodoItem) -> Vec<TodoItem> {
        let Some(contents) = self.read_contents() else {
            return Vec::new();
        };
        let mut updated = contents.records.clone();
        updated.push(item);
        self.commit(contents, updated)
    }

    /// Unknown ids leave the list untouched.
    pub fn delete(&self, id: i64) -> Vec<TodoItem> {
        let Some(contents) = self.read_contents() else {
            return Vec::new();
        };
        if !contents.records.iter().any(|item| item.id == id) {
            return contents.records;
        }
        let updated = contents
            .records
            .iter()
            .filter(|item| item.id != id)
            .cloned()
            .collect::<Vec<_>>();
        self.commit(contents, updated)
    }

    pub fn update(&self, id: i64, patch: &TodoPatch) -> Vec<TodoItem> {
        let Some(contents) = self.read_contents() else {
            return Vec::new();
        };
        if !contents.records.iter().any(|item| item.id == id) {
            return contents.records;
        }
        let updated = contents
            .records
            .iter()
            .cloned()
            .map(|mut item| {
                if item.id == id {
                    if let Some(name) = patch.name.as_deref() {
                        item.name = name.trim().to_string();
                    }
                    if let Some(duration) = patch.duration_minutes {
                        item.duration_minutes = duration;
                    }
                    if let Some(priority) = patch.priority {
                        item.priority = priority;
                    }
                }
                item
            })
            .collect::<Vec<_>>();
        self.commit(contents, updated)
    }

    fn commit(&self, current: SlotRecords<TodoItem>, updated: Vec<TodoItem>) -> Vec<TodoItem> {
        if self.try_write(&updated, &current.unreadable) {
            updated
        } else {
            current.records
        }
    }

    fn read_contents(&self) -> Option<SlotRecords<TodoItem>> {
        match read_records(self.slots.as_ref(), TODO_SLOT_KEY) {
            Ok(contents) => {
                if !contents.unreadable.is_empty() {
                    self.log.warn(
                        LOG_SOURCE,
                        &format!("skipped unreadable todo records: {}", contents.unreadable.len()),
                    );
                }
                Some(contents)
            }
            Err(error) => {
                self.log
                    .error(LOG_SOURCE, &format!("failed to load todo list: {error}"));
                None
            }
        }
    }

    fn try_write(&self, items: &[TodoItem], unreadable: &[Value]) -> bool {
        match write_records(self.slots.as_ref(), TODO_SLOT_KEY, items, unreadable) {
            Ok(()) => true,
            Err(error) => {
                self.log
                    .error(LOG_SOURCE, &format!("failed to save todo list: {error}"));
                false
            }
        }
    }
}
