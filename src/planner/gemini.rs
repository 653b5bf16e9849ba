//! Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{PlanError, PlanGenerator, PlanRequest, PlanResponse};
use crate::config::PlannerConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiPlanner {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiPlanner {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(&config.base_url, &config.model, config.api_key.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn request(&self, request: &PlanRequest) -> Result<PlanResponse, PlanError> {
        let api_key = self.api_key.as_deref().ok_or(PlanError::MissingApiKey)?;

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt() }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        });

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PlanError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlanError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PlanError::Parse(e.to_string()))?;
        let text = generated.text().ok_or(PlanError::EmptyResponse)?;
        debug!(target: "taskforge", event = "plan_received", bytes = text.len());

        serde_json::from_str(&text).map_err(|e| PlanError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PlanGenerator for GeminiPlanner {
    async fn generate(&self, request: &PlanRequest) -> Result<PlanResponse, PlanError> {
        let result = self.request(request).await;
        if let Err(err) = &result {
            error!(
                target: "taskforge",
                event = "plan_request_failed",
                code = err.code(),
                model = %self.model,
                error = %err
            );
        }
        result
    }
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "roadmapTitle": { "type": "STRING" },
            "roadmapDescription": { "type": "STRING" },
            "steps": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "deadlineOffsetDays": { "type": "INTEGER" },
                        "suggestedResources": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" }
                        }
                    },
                    "required": ["title", "description", "deadlineOffsetDays"]
                }
            },
            "dailyHabits": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["roadmapTitle", "roadmapDescription", "steps", "dailyHabits"]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate, if any.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
        Some(text).filter(|text| !text.trim().is_empty())
    }
}
