//! Curriculum generation client
//!
//! Sends one structured prompt per request to the generation service and
//! extracts the plain-text result. Everything that can go wrong upstream
//! (unreachable service, non-2xx, missing text block, empty text) becomes
//! the one typed error callers distinguish: `AppError::CurriculumGeneration`.

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates educational \
curricula. Create a well-structured curriculum with clear sections.";

/// Trait for curriculum generation
#[async_trait]
pub trait CurriculumGenerator: Send + Sync + std::fmt::Debug {
    /// Generate curriculum text for a story
    async fn generate(&self, title: &str, content: &str, culture: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Generation client for the Anthropic messages API
#[derive(Debug)]
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl AnthropicGenerator {
    pub fn new(api_key: String, model: String, max_tokens: u32, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model,
            max_tokens,
        }
    }

    fn build_prompt(title: &str, content: &str, culture: &str) -> String {
        format!(
            "Generate an educational curriculum for the following story:\n\
             Title: {title}\n\
             Culture: {culture}\n\
             Excerpt: {content}\n\
             \n\
             Please create a structured curriculum that includes these sections:\n\
             1. Learning Objectives\n\
             2. Key Concepts\n\
             3. Discussion Questions\n\
             4. Activities\n\
             5. Additional Resources\n\
             \n\
             Format the response as a clear, well-structured text document with \
             headings and bullet points."
        )
    }
}

#[async_trait]
impl CurriculumGenerator for AnthropicGenerator {
    async fn generate(&self, title: &str, content: &str, culture: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: Self::build_prompt(title, content, culture),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::CurriculumGeneration {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::CurriculumGeneration {
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::CurriculumGeneration {
                    message: format!("Failed to parse response: {}", e),
                })?;

        extract_text(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Pull the curriculum text out of a generation response. The first content
/// block must be textual and non-empty after trimming.
fn extract_text(response: MessagesResponse) -> Result<String> {
    let first = response
        .content
        .into_iter()
        .next()
        .ok_or_else(|| AppError::CurriculumGeneration {
            message: "Empty response from generation service".to_string(),
        })?;

    if first.block_type != "text" {
        return Err(AppError::CurriculumGeneration {
            message: format!("Unexpected first content block: {}", first.block_type),
        });
    }

    let text = first
        .text
        .ok_or_else(|| AppError::CurriculumGeneration {
            message: "Text block without text field".to_string(),
        })?
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(AppError::CurriculumGeneration {
            message: "No curriculum content generated".to_string(),
        });
    }

    Ok(text)
}

/// Scripted generator for tests; counts calls so callers can assert
/// that validation failures never reach the service
#[derive(Debug)]
pub struct MockGenerator {
    response: Result<String>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockGenerator {
    /// Always succeeds with the given text
    pub fn returning(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Always fails with a generation error
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(AppError::CurriculumGeneration {
                message: message.to_string(),
            }),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CurriculumGenerator for MockGenerator {
    async fn generate(&self, _title: &str, _content: &str, _culture: &str) -> Result<String> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(AppError::CurriculumGeneration { message }) => {
                Err(AppError::CurriculumGeneration {
                    message: message.clone(),
                })
            }
            Err(_) => unreachable!("mock only holds generation errors"),
        }
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Create a generator from configuration. Fails when no API key is set,
/// so the gateway can answer with a configuration error instead of
/// issuing doomed requests.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn CurriculumGenerator>> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| AppError::Configuration {
            message: "Generation API key is not configured".to_string(),
        })?;

    Ok(Arc::new(AnthropicGenerator::new(
        api_key,
        config.model.clone(),
        config.max_tokens,
        config.api_base.clone(),
    )))
}
