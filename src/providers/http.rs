//! HTTP providers speaking the chat-completions protocol (OpenRouter, GLM).
//!
//! Requests carry a bearer key taken from the environment; `auto_approve` has
//! no meaning for a remote API and is ignored.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{InvokeOptions, Provider, ProviderName};
use crate::error::{AiError, Result};

const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1/";
const GLM_BASE: &str = "https://open.bigmodel.cn/api/coding/paas/v4/";

/// Marker OpenRouter uses for zero-cost model variants.
pub const FREE_SUFFIX: &str = ":free";

pub struct HttpProvider {
    name: ProviderName,
    base: Url,
    key_vars: &'static [&'static str],
    free_only: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl HttpProvider {
    pub fn builtin(name: ProviderName) -> Result<Self> {
        let (base, key_vars, free_only): (&str, &'static [&'static str], bool) = match name {
            ProviderName::Openrouter => (OPENROUTER_BASE, &["OPENROUTER_API_KEY"], true),
            ProviderName::Glm => (GLM_BASE, &["ZHIPU_API_KEY", "GLM_API_KEY"], false),
            other => {
                return Err(AiError::Config(format!("{other} is not an HTTP provider")));
            }
        };
        let base = Url::parse(base).map_err(|e| AiError::Config(format!("bad base URL: {e}")))?;
        Ok(Self::new(name, base, key_vars, free_only))
    }

    pub fn new(
        name: ProviderName,
        base: Url,
        key_vars: &'static [&'static str],
        free_only: bool,
    ) -> Self {
        Self {
            name,
            base,
            key_vars,
            free_only,
            client: Client::new(),
        }
    }

    fn api_key(&self) -> Option<String> {
        self.key_vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| AiError::Config(format!("bad endpoint '{path}': {e}")))
    }

    /// Every model id the API advertises, unfiltered. Catalog build applies policy.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let Some(key) = self.api_key() else {
            return Ok(Vec::new());
        };
        let resp = self
            .client
            .get(self.endpoint("models")?)
            .bearer_auth(key)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AiError::provider(self.name, format!("connection error: {e}")))?;
        if !resp.status().is_success() {
            return Err(AiError::provider(self.name, format!("HTTP {}", resp.status())));
        }
        let list: ModelList = resp
            .json()
            .await
            .map_err(|e| AiError::provider(self.name, format!("invalid model list: {e}")))?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> ProviderName {
        self.name
    }

    fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    async fn invoke(&self, model: &str, prompt: &str, options: InvokeOptions) -> Result<String> {
        if self.free_only && !model.ends_with(FREE_SUFFIX) {
            return Err(AiError::Policy(format!(
                "{} model must end with '{FREE_SUFFIX}', got '{model}'",
                self.name
            )));
        }
        let key = self.api_key().ok_or_else(|| {
            AiError::provider(self.name, format!("{} not set", self.key_vars.join(" or ")))
        })?;

        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let resp = self
            .client
            .post(self.endpoint("chat/completions")?)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::provider(self.name, format!("connection error: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AiError::provider(self.name, format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(AiError::provider(
                self.name,
                format!("HTTP {}: {}", status.as_u16(), text.trim()),
            ));
        }
        parse_completion(self.name, &text)
    }
}

fn parse_completion(provider: ProviderName, body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AiError::provider(provider, format!("invalid response: {e}")))?;
    if let Some(err) = parsed.error {
        let msg = err.message.unwrap_or_else(|| "unknown API error".into());
        return Err(AiError::provider(provider, msg));
    }
    let first = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::provider(provider, "invalid response: missing 'choices'"))?;
    first
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| AiError::provider(provider, "invalid response: missing 'content'"))
}
