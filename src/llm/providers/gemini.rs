use crate::config::LlmConfig;
use crate::llm::{build_client, LlmError, SqlGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Generative Language API (`models/{model}:generateContent`).
pub struct GeminiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::ConfigError("API key is required for the gemini provider".to_string())
        })?;

        let api_base = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            client: build_client(config)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    /// One user turn carrying the instruction and the question as separate parts.
    fn build_request(prompt: &str, question: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part {
                        text: prompt.to_string(),
                    },
                    Part {
                        text: question.to_string(),
                    },
                ],
            }],
        }
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(LlmError::ResponseError(format!(
                "Gemini returned no text: {}",
                reason
            )));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::ResponseError(
                "Gemini candidate contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl SqlGenerator for GeminiProvider {
    async fn generate_sql(&self, prompt: &str, question: &str) -> Result<String, LlmError> {
        info!("Sending question to Gemini model: {}", self.model);
        let request = Self::build_request(prompt, question);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Gemini API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Gemini API responded with status code: {}{}",
                status, error_body
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        let text = Self::extract_text(body)?;
        debug!("Raw response from Gemini: {}", text);
        Ok(text)
    }
}
