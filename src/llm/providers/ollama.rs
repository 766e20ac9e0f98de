use crate::config::LlmConfig;
use crate::llm::{build_client, LlmError, SqlGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate";

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            client: build_client(config)?,
            api_url,
            model: config.model.clone(),
        })
    }

    // /api/generate takes a single prompt, so the question follows the template
    fn build_request(&self, prompt: &str, question: &str) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: format!("{}\n{}", prompt, question),
            stream: false,
        }
    }
}

#[async_trait]
impl SqlGenerator for OllamaProvider {
    async fn generate_sql(&self, prompt: &str, question: &str) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let request = self.build_request(prompt, question);

        let response = self
            .client
            .post(&self.api_url)
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

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        let ollama_response: OllamaResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                LlmError::ResponseError(format!(
                    "Failed to parse Ollama response: {} - Response was: {}",
                    e, response_text
                ))
            })?;

        debug!("Raw response from Ollama: {}", ollama_response.response);
        Ok(ollama_response.response)
    }
}
