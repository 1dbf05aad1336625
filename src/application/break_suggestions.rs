use crate::application::break_history::{BreakHistoryTracker, DEFAULT_LOOKBACK};
use crate::application::generation::{array_payload, extract_json_value, GenerationError};
use crate::domain::models::BreakSuggestion;
use crate::infrastructure::slot_store::SlotStore;
use crate::infrastructure::text_generator::TextGenerator;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const SUGGESTION_COUNT: usize = 3;
const SUGGESTION_ENVELOPE_KEYS: [&str; 1] = ["suggestions"];
const PROMPT_HISTORY_ITEMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionSource {
    Ai,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionOutcome {
    pub suggestions: Vec<BreakSuggestion>,
    pub source: SuggestionSource,
}

fn fallback_suggestion(
    id: &str,
    name: &str,
    duration_minutes: u32,
    priority: &str,
    benefit: &str,
    category: &str,
) -> BreakSuggestion {
    BreakSuggestion {
        id: id.to_string(),
        name: name.to_string(),
        duration_minutes,
        priority: priority.to_string(),
        benefit: Some(benefit.to_string()),
        category: Some(category.to_string()),
    }
}

pub fn fallback_suggestions() -> Vec<BreakSuggestion> {
    vec![
        fallback_suggestion(
            "b1",
            "Take a short walk",
            20,
            "★★",
            "A change of scenery and some light exercise",
            "Physical activity",
        ),
        fallback_suggestion(
            "b2",
            "Stretch and breathe deeply",
            15,
            "★★★",
            "Loosens stiff muscles and clears the head",
            "Relaxation",
        ),
        fallback_suggestion(
            "b3",
            "Free journaling",
            30,
            "★",
            "Sorts out your thoughts and steadies the mind",
            "Creative activity",
        ),
    ]
}

pub fn suggestion_prompt(history_context: &str) -> String {
    let avoid = if history_context.is_empty() {
        String::new()
    } else {
        format!("\n\nDo not repeat recent activities.{history_context}")
    };
    format!(
        r#"You advise university students on short breaks. Suggest exactly {SUGGESTION_COUNT} break activities.

1. Each activity fits between classes, takes 15-90 minutes and needs no special equipment or budget.
2. Balance the categories: quick refreshers, physical activity, creative work, social time, relaxation and small new skills.
3. Activities should work on campus, in a dorm or alone at home, and include rest from screens.
4. Name the concrete benefit: focus, stress relief, creativity, mood or study efficiency.
5. When a name mentions a duration, durationMinutes must match it.{avoid}

Respond with JSON only, without any explanation:
{{
  "suggestions": [
    {{"id": "b1", "name": "activity", "durationMinutes": 20, "priority": "★ to ★★★", "benefit": "main effect", "category": "category"}}
  ]
}}"#
    )
}

/// Normalizes a free-text generator response into suggestions, filling in missing ids.
pub fn parse_suggestion_response(text: &str) -> Result<Vec<BreakSuggestion>, GenerationError> {
    let value = extract_json_value(text)?;
    let stamp = Utc::now().timestamp_millis();
    array_payload(value, &SUGGESTION_ENVELOPE_KEYS)?
        .into_iter()
        .enumerate()
        .map(|(index, raw)| parse_suggestion(index, raw, stamp))
        .collect()
}

fn parse_suggestion(index: usize, raw: Value, stamp: i64) -> Result<BreakSuggestion, GenerationError> {
    let mut suggestion = serde_json::from_value::<BreakSuggestion>(raw).map_err(|error| {
        GenerationError::InvalidShape(format!("suggestion {index}: {error}"))
    })?;
    suggestion.name = suggestion.name.trim().to_string();
    suggestion
        .validate()
        .map_err(|error| GenerationError::InvalidShape(format!("suggestion {index}: {error}")))?;
    if suggestion.id.trim().is_empty() {
        suggestion.id = format!("b{stamp}-{}", index + 1);
    }
    Ok(suggestion)
}

pub struct BreakSuggestionRequester<G, S>
where
    G: TextGenerator + ?Sized,
    S: SlotStore + ?Sized,
{
    generator: Arc<G>,
    history: Arc<BreakHistoryTracker<S>>,
}

impl<G, S> BreakSuggestionRequester<G, S>
where
    G: TextGenerator + ?Sized,
    S: SlotStore + ?Sized,
{
    pub fn new(generator: Arc<G>, history: Arc<BreakHistoryTracker<S>>) -> Self {
        Self { generator, history }
    }

    pub fn build_prompt(&self) -> String {
        suggestion_prompt(&self.history.prompt_context(PROMPT_HISTORY_ITEMS))
    }

    pub async fn request_ai_suggestions(&self) -> Result<Vec<BreakSuggestion>, GenerationError> {
        let text = self.generator.generate(&self.build_prompt()).await?;
        parse_suggestion_response(&text)
    }

    /// Fresh suggestions, or the static list when generation fails or only repeats survive.
    pub async fn fetch_suggestions(&self) -> SuggestionOutcome {
        let reason = match self.request_ai_suggestions().await {
            Ok(suggestions) => {
                let fresh = suggestions
                    .into_iter()
                    .filter(|suggestion| {
                        !self
                            .history
                            .is_recently_suggested(&suggestion.name, DEFAULT_LOOKBACK)
                    })
                    .take(SUGGESTION_COUNT)
                    .collect::<Vec<_>>();
                if !fresh.is_empty() {
                    return SuggestionOutcome {
                        suggestions: fresh,
                        source: SuggestionSource::Ai,
                    };
                }
                "every generated suggestion was suggested recently".to_string()
            }
            Err(error) => error.to_string(),
        };
        SuggestionOutcome {
            suggestions: fallback_suggestions(),
            source: SuggestionSource::Fallback { reason },
        }
    }
}
