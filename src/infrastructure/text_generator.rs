use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Free-text generation service. Output is untrusted and parsed defensively by callers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct GeminiTextGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiTextGenerator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| InfraError::Generation(format!("failed to build http client: {error}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn generate_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| InfraError::Generation(format!("invalid generator base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::Generation("generator base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("v1beta");
            segments.push("models");
            segments.push(&format!("{}:generateContent", self.model));
        }
        Ok(url)
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("generator api error: http {}", status.as_u16())
        } else {
            format!("generator api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Generation(message)
    }
}

#[derive(Debug, serde::Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Concatenates the text parts of the first candidate.
fn extract_candidate_text(body: &str) -> Result<String, InfraError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|error| {
        InfraError::Generation(format!("invalid generateContent payload: {error}; body={body}"))
    })?;

    let text = parsed
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<String>();

    if text.trim().is_empty() {
        return Err(InfraError::Generation(
            "generator returned no candidate text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, InfraError> {
        let endpoint = self.generate_endpoint()?;
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                InfraError::Generation(format!(
                    "network error while generating: {}",
                    error.without_url()
                ))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| {
                InfraError::Generation(format!(
                    "failed reading generator response: {}",
                    error.without_url()
                ))
            })?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        extract_candidate_text(&body)
    }
}

/// Stands in when no API key is configured; every call fails so callers take their fallback path.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredTextGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredTextGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, InfraError> {
        Err(InfraError::Generation(
            "text generator is not configured; set DAYPLANNER_GEMINI_API_KEY".to_string(),
        ))
    }
}
