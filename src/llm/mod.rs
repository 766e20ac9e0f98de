pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// A hosted model that turns an instruction plus a question into SQL text.
///
/// Implementations return the model's text as-is. Trimming and everything
/// after it is the caller's business.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(&self, prompt: &str, question: &str) -> Result<String, LlmError>;
}

pub struct LlmManager {
    backend: String,
    model: String,
    generator: Box<dyn SqlGenerator>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn SqlGenerator> = match config.backend.as_str() {
            "gemini" => Box::new(providers::gemini::GeminiProvider::new(config)?),
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self {
            backend: config.backend.clone(),
            model: config.model.clone(),
            generator,
        })
    }

    /// Wraps an already-built generator, e.g. a canned one in tests.
    pub fn from_generator(generator: Box<dyn SqlGenerator>) -> Self {
        Self {
            backend: "custom".to_string(),
            model: "custom".to_string(),
            generator,
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate_sql(&self, prompt: &str, question: &str) -> Result<String, LlmError> {
        self.generator.generate_sql(prompt, question).await
    }
}

/// HTTP client shared by the providers. No timeout unless one is configured.
pub(crate) fn build_client(config: &LlmConfig) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder
        .build()
        .map_err(|e| LlmError::ConnectionError(e.to_string()))
}
