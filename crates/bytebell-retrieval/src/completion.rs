//! Chat completion client
//!
//! Used for the binary code-intent classification and for query rewriting.
//! Speaks the OpenAI-compatible `/chat/completions` protocol (OpenRouter by
//! default). Completions are not idempotent reads, so they get the timeout
//! but are never retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};
use crate::http::{join_url, HttpPolicy, RemoteClient};

const SERVICE: &str = "Completion";

/// Default OpenRouter API base URL
pub const DEFAULT_COMPLETION_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Chat completion provider
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Text of the first candidate completion
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Configuration for an OpenAI-compatible completion endpoint
#[derive(Clone)]
pub struct ChatClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Sent as `HTTP-Referer` for OpenRouter attribution
    pub referer: Option<String>,
    /// Sent as `X-Title` for OpenRouter attribution
    pub title: Option<String>,
    pub http: HttpPolicy,
}

impl ChatClientConfig {
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_COMPLETION_URL.into(),
            api_key: Some(api_key.into()),
            referer: None,
            title: None,
            http: HttpPolicy::default().with_max_retries(0),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_attribution(
        mut self,
        referer: Option<String>,
        title: Option<String>,
    ) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }

    pub fn with_http(mut self, http: HttpPolicy) -> Self {
        self.http = http;
        self
    }
}

impl std::fmt::Debug for ChatClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

/// OpenAI-compatible chat completion client
pub struct ChatClient {
    remote: RemoteClient,
    config: ChatClientConfig,
}

impl ChatClient {
    pub fn new(config: ChatClientConfig) -> Result<Self> {
        let remote = RemoteClient::new(SERVICE, config.http.clone())?;
        Ok(Self { remote, config })
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(key) = &self.config.api_key {
            headers.push(("Authorization", format!("Bearer {}", key)));
        }
        if let Some(referer) = &self.config.referer {
            headers.push(("HTTP-Referer", referer.clone()));
        }
        if let Some(title) = &self.config.title {
            headers.push(("X-Title", title.clone()));
        }
        headers
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = ChatRequestBody {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            service = self.remote.service(),
            model = %request.model,
            max_tokens = request.max_tokens,
            "Requesting completion"
        );
        let response: ChatResponseBody = self
            .remote
            .post_json(
                &join_url(&self.config.base_url, "chat/completions"),
                &self.headers(),
                &body,
            )
            .await
            .map_err(|e| match e {
                RetrievalError::MalformedResponse { .. } => e,
                other => RetrievalError::Completion(other.to_string()),
            })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| RetrievalError::malformed(SERVICE, "no choices[0].message.content"))
    }
}
