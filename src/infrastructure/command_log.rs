use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const COMMAND_LOG_FILE: &str = "commands.log";

/// Appends one JSON object per line to `logs/commands.log`.
#[derive(Debug)]
pub struct CommandLog {
    path: Option<PathBuf>,
    guard: Mutex<()>,
}

impl CommandLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: Some(logs_dir.join(COMMAND_LOG_FILE)),
            guard: Mutex::new(()),
        }
    }

    /// A log that drops every record.
    pub fn disabled() -> Self {
        Self {
            path: None,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, command: &str, message: &str) {
        self.append("info", command, message);
    }

    pub fn warn(&self, command: &str, message: &str) {
        self.append("warn", command, message);
    }

    pub fn error(&self, command: &str, message: &str) {
        self.append("error", command, message);
    }

    fn append(&self, level: &str, command: &str, message: &str) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn appends_json_lines_with_level_and_command() {
        let dir = std::env::temp_dir().join(format!("dayplanner-log-tests-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create log dir");
        let log = CommandLog::new(&dir);

        log.info("generate_schedule", "used fallback");
        log.error("todo_store", "write failed");

        let raw = fs::read_to_string(log.path().expect("log path")).expect("read log");
        let lines = raw
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("json line"))
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "info");
        assert_eq!(lines[0]["command"], "generate_schedule");
        assert_eq!(lines[1]["level"], "error");
        assert_eq!(lines[1]["message"], "write failed");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = CommandLog::disabled();
        log.info("noop", "ignored");
        assert!(log.path().is_none());
    }
}
