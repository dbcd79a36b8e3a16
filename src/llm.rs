//! Language-generation clients.
//!
//! A [`ChatModel`] turns a fully rendered prompt into text. Both
//! implementations send the prompt as a single user message and always
//! use [`TEMPERATURE`].

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};
use crate::http::{build_client, trim_base_url, JsonPost};

/// Sampling temperature for every generation call.
pub const TEMPERATURE: f32 = 0.0;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAIChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl OpenAIChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            client: build_client(config.timeout_secs).map_err(RagError::generation)?,
            api_key,
            base_url: trim_base_url(config.url.as_deref().unwrap_or(OPENAI_BASE_URL)),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = JsonPost {
            client: &self.client,
            url: format!("{}/chat/completions", self.base_url),
            service: "OpenAI",
            headers: vec![("Authorization", format!("Bearer {}", self.api_key))],
            max_retries: self.max_retries,
        }
        .send(&body)
        .await
        .map_err(|e| RagError::generation(format!("{:#}", e)))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| RagError::generation("invalid OpenAI response: missing message content"))
    }
}

/// Ollama `/api/chat` client (non-streaming).
pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaChat {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs).map_err(RagError::generation)?,
            url: trim_base_url(config.url.as_deref().unwrap_or(OLLAMA_BASE_URL)),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "options": { "temperature": TEMPERATURE },
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = JsonPost {
            client: &self.client,
            url: format!("{}/api/chat", self.url),
            service: "Ollama",
            headers: Vec::new(),
            max_retries: self.max_retries,
        }
        .send(&body)
        .await
        .map_err(|e| RagError::generation(format!("{:#}", e)))?;

        json["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| RagError::generation("invalid Ollama response: missing message content"))
    }
}

/// Create the configured [`ChatModel`].
pub fn create_chat_model(config: &GenerationConfig) -> Result<Box<dyn ChatModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        other => Err(RagError::Configuration(format!(
            "unknown generation provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_is_zero() {
        assert_eq!(TEMPERATURE, 0.0);
    }

    #[test]
    fn ollama_model_from_config() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            ..GenerationConfig::default()
        };
        let model = create_chat_model(&config).unwrap();
        assert_eq!(model.model_name(), "llama3");
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = GenerationConfig {
            provider: "markov".to_string(),
            ..GenerationConfig::default()
        };
        assert!(matches!(
            create_chat_model(&config),
            Err(RagError::Configuration(_))
        ));
    }
}
