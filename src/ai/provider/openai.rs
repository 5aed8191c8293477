//! OpenAI / Azure OpenAI Provider
//!
//! Both services speak the Chat Completions wire format. They differ only in
//! URL shape and authentication:
//!
//! - OpenAI: `{base}/chat/completions`, `Authorization: Bearer <key>`
//! - Azure: `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`,
//!   `api-key: <key>`

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{
    ChatRequest, LlmCompletion, LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata,
    ResponseTiming, TokenUsage, prompt_utils,
};
use crate::constants::network;
use crate::types::{ErrorClassifier, ReportError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Which Chat Completions service to talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAiFlavor {
    OpenAi,
    Azure {
        deployment: String,
        api_version: String,
    },
}

/// OpenAI-compatible provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    flavor: OpenAiFlavor,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("flavor", &self.flavor)
            .finish()
    }
}

impl OpenAiProvider {
    /// OpenAI provider. Key from config or `OPENAI_API_KEY`.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| env_non_empty("OPENAI_API_KEY"))
            .ok_or_else(|| {
                ReportError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var".to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = validate_endpoint(&api_base)?;

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self::build(config, api_key, api_base, model, OpenAiFlavor::OpenAi)
    }

    /// Azure OpenAI provider.
    ///
    /// Endpoint from config or `AOAI_ENDPOINT`, key from config,
    /// `AZURE_OPENAI_API_KEY` or `AOAI_KEY`, deployment from config,
    /// `AOAI_DEPLOYMENT` or the model name.
    pub fn azure(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| env_non_empty("AZURE_OPENAI_API_KEY"))
            .or_else(|| env_non_empty("AOAI_KEY"))
            .ok_or_else(|| {
                ReportError::Config(
                    "Azure OpenAI API key not found. Set AZURE_OPENAI_API_KEY or AOAI_KEY"
                        .to_string(),
                )
            })?;

        let endpoint = config
            .api_base
            .clone()
            .or_else(|| env_non_empty("AOAI_ENDPOINT"))
            .ok_or_else(|| {
                ReportError::Config(
                    "Azure OpenAI endpoint not found. Set llm.api_base or AOAI_ENDPOINT"
                        .to_string(),
                )
            })?;
        let api_base = validate_endpoint(&endpoint)?;

        let deployment = config
            .azure_deployment
            .clone()
            .or_else(|| env_non_empty("AOAI_DEPLOYMENT"))
            .or_else(|| config.model.clone())
            .ok_or_else(|| {
                ReportError::Config(
                    "Azure OpenAI deployment not found. Set llm.azure_deployment or AOAI_DEPLOYMENT"
                        .to_string(),
                )
            })?;

        let flavor = OpenAiFlavor::Azure {
            deployment: deployment.clone(),
            api_version: config.azure_api_version.clone(),
        };

        Self::build(config, api_key, api_base, deployment, flavor)
    }

    fn build(
        config: ProviderConfig,
        api_key: String,
        api_base: String,
        model: String,
        flavor: OpenAiFlavor,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReportError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            flavor,
            client,
        })
    }

    fn completions_url(&self) -> String {
        match &self.flavor {
            OpenAiFlavor::OpenAi => format!("{}/chat/completions", self.api_base),
            OpenAiFlavor::Azure {
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.api_base, deployment, api_version
            ),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.flavor {
            OpenAiFlavor::OpenAi => builder.header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            ),
            OpenAiFlavor::Azure { .. } => builder.header("api-key", self.api_key.expose_secret()),
        }
    }

    fn build_request(&self, request: &ChatRequest, schema: Option<&Value>) -> ChatCompletionRequest {
        let system = match schema {
            Some(schema) => prompt_utils::build_schema_system(&request.system, schema),
            None => request.system.clone(),
        };

        ChatCompletionRequest {
            // Azure routes by deployment; the field is ignored there but harmless
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: schema.map(|_| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    /// Send one chat completion and return the first choice's text
    async fn send(&self, body: &ChatCompletionRequest) -> Result<(String, TokenUsage, Duration)> {
        let start_time = Instant::now();
        let url = self.completions_url();

        debug!(provider = self.name(), model = %self.model, "Sending chat completion");

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReportError::timeout(
                        format!("{} chat completion", self.name()),
                        start_time.elapsed(),
                    )
                } else {
                    ReportError::LlmApi(format!("{} request failed: {}", self.name(), e))
                }
            })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("API error ({}): {}", status, body),
                self.name(),
            )
            .into());
        }

        let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
            ReportError::LlmApi(format!("Failed to parse {} response: {}", self.name(), e))
        })?;

        let usage = response_body
            .usage
            .map(|u| TokenUsage::from_openai(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let content = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ReportError::LlmApi(format!("No content in {} response", self.name()))
            })?;

        Ok((content, usage, elapsed))
    }

    fn metadata(&self) -> ResponseMetadata {
        ResponseMetadata {
            model: self.model.clone(),
            provider: self.name().to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, request: &ChatRequest, schema: &Value) -> Result<LlmResponse> {
        let body = self.build_request(request, Some(schema));
        let (text, usage, elapsed) = self.send(&body).await?;

        Ok(LlmResponse {
            content: text,
            usage,
            timing: ResponseTiming::from_duration(elapsed),
            metadata: self.metadata(),
        })
    }

    async fn complete(&self, request: &ChatRequest) -> Result<LlmCompletion> {
        let body = self.build_request(request, None);
        let (text, usage, elapsed) = self.send(&body).await?;

        Ok(LlmCompletion {
            text,
            usage,
            timing: ResponseTiming::from_duration(elapsed),
            metadata: self.metadata(),
        })
    }

    fn name(&self) -> &str {
        match self.flavor {
            OpenAiFlavor::OpenAi => "openai",
            OpenAiFlavor::Azure { .. } => "azure-openai",
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = match &self.flavor {
            OpenAiFlavor::OpenAi => format!("{}/models", self.api_base),
            OpenAiFlavor::Azure { api_version, .. } => {
                format!("{}/openai/models?api-version={}", self.api_base, api_version)
            }
        };

        match self.authorize(self.client.get(&url)).send().await {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!("{} API check failed: {}", self.name(), resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("{} API check failed: {}", self.name(), e);
                Ok(false)
            }
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Only http/https endpoints; trailing slash removed
fn validate_endpoint(endpoint: &str) -> Result<String> {
    let url = url::Url::parse(endpoint).map_err(|e| {
        ReportError::Config(format!("Invalid API endpoint URL '{}': {}", endpoint, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ReportError::Config(format!(
            "API endpoint must use http or https scheme, got: {}",
            url.scheme()
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
