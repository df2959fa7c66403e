//! External collaborators of the generator.
//!
//! The orchestrator talks to two black boxes: a source of sample documents
//! and a text-generation model. Both are single bounded calls with no retry;
//! callers decide whether to try again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use toolsmith_spec::{Document, ToolTarget};
use tracing::{debug, info};

use crate::config::OpenAiConfig;
use crate::error::ProviderError;

/// Key and index layout of a table, for stores that expose one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSchema {
    /// Columns the data is partitioned by.
    pub partition_key: Vec<String>,

    /// Clustering columns within a partition.
    #[serde(alias = "partition_sort")]
    pub sorting_key: Vec<String>,

    pub indexed_columns: Vec<String>,

    pub vector_columns: Vec<String>,

    /// Columns with a full-text index.
    pub text_columns: Vec<String>,
}

impl ObjectSchema {
    pub fn is_empty(&self) -> bool {
        self.partition_key.is_empty()
            && self.sorting_key.is_empty()
            && self.indexed_columns.is_empty()
            && self.vector_columns.is_empty()
            && self.text_columns.is_empty()
    }
}

/// Source of sample documents from a collection or table.
#[async_trait]
pub trait SampleProvider: Send + Sync {
    /// Fetch at most `limit` documents from `target`.
    async fn fetch_samples(
        &self,
        target: &ToolTarget,
        db_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Document>, ProviderError>;

    /// Key and index layout of `target`, if known.
    async fn fetch_schema(
        &self,
        _target: &ToolTarget,
        _db_name: Option<&str>,
    ) -> Result<Option<ObjectSchema>, ProviderError> {
        Ok(None)
    }
}

/// A prompt for the text generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System instruction, if any.
    pub system: Option<String>,

    /// The user prompt.
    pub prompt: String,

    /// Ask the model for a JSON object response.
    pub json_response: bool,
}

impl CompletionRequest {
    /// Create a plain text request.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            json_response: false,
        }
    }

    /// Set the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Request a JSON response.
    pub fn expect_json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// Text generation capability. Output is not guaranteed to be valid JSON
/// even when JSON was requested.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Name of this generator, for logs.
    fn name(&self) -> &str;

    /// Complete the prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;
}

/// OpenAI-compatible chat completions generator.
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    /// Create a generator from configuration.
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Check if an API key is set.
    pub fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
        });
        if request.json_response {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        debug!("Requesting completion with model: {}", self.config.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiRequest(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let result: ChatCompletionResponse = response.json().await?;
        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("No content in response".to_string()))?;

        info!("Received completion of {} characters", content.len());
        Ok(content)
    }
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> OpenAiGenerator {
        OpenAiGenerator::new(
            OpenAiConfig::default()
                .with_api_key("sk-test")
                .with_base_url(server.uri()),
        )
    }

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new("hello")
            .with_system("be brief")
            .expect_json();

        assert_eq!(request.system.as_deref(), Some("be brief"));
        assert!(request.json_response);
    }

    #[tokio::test]
    async fn test_complete_requests_json_and_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"name\":\"t\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let content = generator(&server)
            .complete(CompletionRequest::new("make a tool").expect_json())
            .await
            .unwrap();

        assert_eq!(content, "{\"name\":\"t\"}");
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = generator(&server)
            .complete(CompletionRequest::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::ApiRequest(message) if message.contains("boom")));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let provider = OpenAiGenerator::new(OpenAiConfig::default());
        assert!(!provider.is_available());

        let err = provider
            .complete(CompletionRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
