use crate::domain::models::{BreakHistoryEntry, BreakSuggestion};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::slot_store::{read_records, write_records, SlotRecords, SlotStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub const BREAK_HISTORY_SLOT_KEY: &str = "breakSuggestionHistory";
pub const MAX_HISTORY_ITEMS: usize = 30;
pub const DEFAULT_LOOKBACK: usize = 10;
pub const DEFAULT_PROMPT_ITEMS: usize = 5;
const SIGNIFICANT_WORD_MIN_CHARS: usize = 4;
const LOG_SOURCE: &str = "break_history";

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Newest-first log of accepted break suggestions, capped at [`MAX_HISTORY_ITEMS`].
pub struct BreakHistoryTracker<S>
where
    S: SlotStore + ?Sized,
{
    slots: Arc<S>,
    log: Arc<CommandLog>,
    now_provider: NowProvider,
}

impl<S> BreakHistoryTracker<S>
where
    S: SlotStore + ?Sized,
{
    pub fn new(slots: Arc<S>, log: Arc<CommandLog>) -> Self {
        Self {
            slots,
            log,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn history(&self) -> Vec<BreakHistoryEntry> {
        self.read_contents()
            .map(|contents| contents.records)
            .unwrap_or_default()
    }

    /// Leaves an unreadable slot as it is and returns an empty history.
    pub fn record(&self, suggestion: &BreakSuggestion) -> Vec<BreakHistoryEntry> {
        let Some(current) = self.read_contents() else {
            return Vec::new();
        };
        let mut updated = Vec::with_capacity(current.records.len() + 1);
        updated.push(BreakHistoryEntry {
            suggestion: suggestion.clone(),
            selected_at: (self.now_provider)(),
        });
        updated.extend(current.records.iter().cloned());
        updated.truncate(MAX_HISTORY_ITEMS);

        match write_records(
            self.slots.as_ref(),
            BREAK_HISTORY_SLOT_KEY,
            &updated,
            &current.unreadable,
        ) {
            Ok(()) => updated,
            Err(error) => {
                self.log
                    .error(LOG_SOURCE, &format!("failed to save break history: {error}"));
                current.records
            }
        }
    }

    pub fn is_recently_suggested(&self, name: &str, lookback: usize) -> bool {
        self.history()
            .iter()
            .take(lookback)
            .any(|entry| names_are_similar(name, &entry.suggestion.name))
    }

    /// Exclusion clause for generation prompts; empty when there is no history.
    pub fn prompt_context(&self, max_items: usize) -> String {
        let names = self
            .history()
            .into_iter()
            .take(max_items)
            .map(|entry| entry.suggestion.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        if names.is_empty() {
            return String::new();
        }
        format!(
            "\n\nAvoid these recently suggested activities: [\"{}\"]",
            names.join("\", \"")
        )
    }

    fn read_contents(&self) -> Option<SlotRecords<BreakHistoryEntry>> {
        match read_records(self.slots.as_ref(), BREAK_HISTORY_SLOT_KEY) {
            Ok(contents) => {
                if !contents.unreadable.is_empty() {
                    self.log.warn(
                        LOG_SOURCE,
                        &format!(
                            "skipped unreadable break history entries: {}",
                            contents.unreadable.len()
                        ),
                    );
                }
                Some(contents)
            }
            Err(error) => {
                self.log
                    .error(LOG_SOURCE, &format!("failed to load break history: {error}"));
                None
            }
        }
    }
}

/// Case-insensitive exact match, or enough shared words of four or more characters.
///
/// Shared words are counted over `previous`, and the threshold is half the smaller word count.
pub fn names_are_similar(candidate: &str, previous: &str) -> bool {
    if previous.is_empty() {
        return false;
    }
    let candidate = candidate.to_lowercase();
    let previous = previous.to_lowercase();
    if candidate == previous {
        return true;
    }

    let candidate_words = candidate.split(' ').collect::<Vec<_>>();
    let previous_words = previous.split(' ').collect::<Vec<_>>();
    let shared = previous_words
        .iter()
        .filter(|word| {
            word.chars().count() >= SIGNIFICANT_WORD_MIN_CHARS && candidate_words.contains(word)
        })
        .count();

    let smaller = candidate_words.len().min(previous_words.len());
    shared as f64 >= smaller as f64 * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::slot_store::InMemorySlotStore;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn suggestion(name: &str) -> BreakSuggestion {
        BreakSuggestion {
            id: format!("id-{name}"),
            name: name.to_string(),
            duration_minutes: 15,
            priority: "★★".to_string(),
            benefit: None,
            category: None,
        }
    }

    fn tracker() -> BreakHistoryTracker<InMemorySlotStore> {
        let clock = Arc::new(AtomicI64::new(1_771_228_800));
        BreakHistoryTracker::new(
            Arc::new(InMemorySlotStore::default()),
            Arc::new(CommandLog::disabled()),
        )
        .with_now_provider(Arc::new(move || {
            let seconds = clock.fetch_add(60, Ordering::SeqCst);
            DateTime::from_timestamp(seconds, 0).expect("valid timestamp")
        }))
    }

    #[test]
    fn record_prepends_and_stamps_selection_time() {
        let tracker = tracker();
        tracker.record(&suggestion("Stretch"));
        let history = tracker.record(&suggestion("Walk"));

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].suggestion.name, "Walk");
        assert_eq!(history[1].suggestion.name, "Stretch");
        assert!(history[0].selected_at > history[1].selected_at);
        assert_eq!(tracker.history(), history);
    }

    #[test]
    fn history_is_capped_and_evicts_oldest() {
        let tracker = tracker();
        for index in 0..45 {
            tracker.record(&suggestion(&format!("Activity {index}")));
        }
        let history = tracker.history();
        assert_eq!(history.len(), MAX_HISTORY_ITEMS);
        assert_eq!(history[0].suggestion.name, "Activity 44");
        assert_eq!(history[MAX_HISTORY_ITEMS - 1].suggestion.name, "Activity 15");
    }

    #[test]
    fn similar_walk_is_recent_but_unrelated_activity_is_not() {
        let tracker = tracker();
        tracker.record(&suggestion("Take a walk in the park"));

        assert!(tracker.is_recently_suggested("Take a walk outside", DEFAULT_LOOKBACK));
        assert!(tracker.is_recently_suggested("TAKE A WALK IN THE PARK", DEFAULT_LOOKBACK));
        assert!(!tracker.is_recently_suggested("Read a book chapter", DEFAULT_LOOKBACK));
    }

    #[test]
    fn lookback_limits_which_entries_are_checked() {
        let tracker = tracker();
        tracker.record(&suggestion("Meditate quietly"));
        for index in 0..3 {
            tracker.record(&suggestion(&format!("Sketch doodle {index}")));
        }
        assert!(tracker.is_recently_suggested("Meditate quietly", 4));
        assert!(!tracker.is_recently_suggested("Meditate quietly", 3));
    }

    #[test]
    fn short_words_do_not_count_as_shared() {
        assert!(!names_are_similar("Go to the gym", "Go to the pool"));
        assert!(names_are_similar("Quick stretch", "Desk stretch"));
        assert!(!names_are_similar("Anything", ""));
    }

    #[test]
    fn prompt_context_lists_recent_names() {
        let tracker = tracker();
        assert_eq!(tracker.prompt_context(DEFAULT_PROMPT_ITEMS), "");

        tracker.record(&suggestion("Stretch"));
        tracker.record(&suggestion("Walk"));
        assert_eq!(
            tracker.prompt_context(DEFAULT_PROMPT_ITEMS),
            "\n\nAvoid these recently suggested activities: [\"Walk\", \"Stretch\"]"
        );
        assert_eq!(
            tracker.prompt_context(1),
            "\n\nAvoid these recently suggested activities: [\"Walk\"]"
        );
    }

    #[test]
    fn undecodable_entry_survives_record() {
        let slots = Arc::new(InMemorySlotStore::default());
        slots
            .write(
                BREAK_HISTORY_SLOT_KEY,
                r#"[{"id": "k1", "name": "Read poetry", "durationMinutes": 20, "priority": "★", "selectedAt": "2026-02-16T08:00:00Z"},
                    {"id": "k2", "name": "Undated nap", "durationMinutes": 15, "priority": "★"}]"#,
            )
            .expect("seed history");
        let tracker = BreakHistoryTracker::new(Arc::clone(&slots), Arc::new(CommandLog::disabled()));

        assert_eq!(tracker.history().len(), 1);
        let history = tracker.record(&suggestion("Walk"));
        assert_eq!(
            history
                .iter()
                .map(|entry| entry.suggestion.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Walk", "Read poetry"]
        );

        let raw = slots
            .read(BREAK_HISTORY_SLOT_KEY)
            .expect("read history")
            .expect("history present");
        assert!(raw.contains("Undated nap"));
        assert!(raw.contains("Read poetry"));
    }

    #[test]
    fn unreadable_history_slot_is_never_overwritten() {
        let slots = Arc::new(InMemorySlotStore::default());
        slots
            .write(BREAK_HISTORY_SLOT_KEY, "not json")
            .expect("seed corrupt history");
        let tracker = BreakHistoryTracker::new(Arc::clone(&slots), Arc::new(CommandLog::disabled()));

        assert!(tracker.record(&suggestion("Walk")).is_empty());
        assert_eq!(
            slots.read(BREAK_HISTORY_SLOT_KEY).expect("read history"),
            Some("not json".to_string())
        );
    }

    #[test]
    fn corrupt_history_reads_as_empty() {
        let slots = Arc::new(InMemorySlotStore::default());
        slots
            .write(BREAK_HISTORY_SLOT_KEY, "[{\"broken\": true}]")
            .expect("seed corrupt history");
        let tracker = BreakHistoryTracker::new(slots, Arc::new(CommandLog::disabled()));
        assert!(tracker.history().is_empty());
        assert!(!tracker.is_recently_suggested("Walk", DEFAULT_LOOKBACK));
    }
}
