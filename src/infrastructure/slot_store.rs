use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable named slots, each holding one serialized JSON document.
pub trait SlotStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn write(&self, key: &str, value: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSlotStore {
    db_path: PathBuf,
}

impl SqliteSlotStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl SlotStore for SqliteSlotStore {
    fn read(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_slots (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl SlotStore for InMemorySlotStore {
    fn read(&self, key: &str) -> Result<Option<String>, InfraError> {
        let slots = self
            .slots
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("slot store lock poisoned: {error}")))?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("slot store lock poisoned: {error}")))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON array slot split into records that decode and raw elements that do not.
///
/// Undecodable elements are written back untouched so one bad element never costs the rest.
#[derive(Debug)]
pub struct SlotRecords<T> {
    pub records: Vec<T>,
    pub unreadable: Vec<Value>,
}

impl<T> Default for SlotRecords<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            unreadable: Vec::new(),
        }
    }
}

/// Errors only when the slot cannot be read or is not a JSON array.
pub fn read_records<S, T>(slots: &S, key: &str) -> Result<SlotRecords<T>, InfraError>
where
    S: SlotStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(raw) = slots.read(key)? else {
        return Ok(SlotRecords::default());
    };
    let values: Vec<Value> = serde_json::from_str(&raw)?;

    let mut contents = SlotRecords::default();
    for value in values {
        match T::deserialize(&value) {
            Ok(record) => contents.records.push(record),
            Err(_) => contents.unreadable.push(value),
        }
    }
    Ok(contents)
}

pub fn write_records<S, T>(
    slots: &S,
    key: &str,
    records: &[T],
    unreadable: &[Value],
) -> Result<(), InfraError>
where
    S: SlotStore + ?Sized,
    T: Serialize,
{
    let mut values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    values.extend(unreadable.iter().cloned());
    slots.write(key, &serde_json::to_string(&values)?)
}
