//! Chat panel backed by an OpenRouter-compatible completions endpoint.
//!
//! Failures never surface as errors to the user: the conversation gets one
//! synthetic assistant message instead.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use streaming::BoxFuture;
use tracing::{error, warn};

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const APP_TITLE: &str = "Metroverse";
/// OpenRouter attributes requests by referer; the CLI has no page origin.
pub const APP_REFERER: &str = "http://localhost";
pub const SYSTEM_PROMPT: &str =
    "You are a cyberpunk AI guide for Metroverse. Keep answers short, cool, and futuristic.";
/// Reply used when the response carries no message content.
pub const EMPTY_REPLY: &str = "Connection Interrupted...";
/// Reply used when the request itself failed.
pub const LINK_FAILED: &str = "NEURAL LINK FAILED";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug)]
pub struct ChatError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl ChatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Sends a full message list and returns the reply content, if any.
pub trait ChatTransport: Send + Sync {
    fn complete(
        &self,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<Option<String>, ChatError>>;
}

/// Pulls `choices[0].message.content` out of a completions response.
pub fn reply_content(response: &Value) -> Option<String> {
    response
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct OpenRouterTransport {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenRouterTransport {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            url: OPENROUTER_URL.to_string(),
        }
    }
}

impl ChatTransport for OpenRouterTransport {
    fn complete(
        &self,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<Option<String>, ChatError>> {
        Box::pin(async move {
            let body = json!({ "model": self.model, "messages": messages });
            let resp = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .header("HTTP-Referer", APP_REFERER)
                .header("X-Title", APP_TITLE)
                .json(&body)
                .send()
                .await
                .map_err(|e| ChatError::with_source("chat request failed", e))?;
            if !resp.status().is_success() {
                warn!("chat endpoint answered {}", resp.status());
            }
            let value: Value = resp
                .json()
                .await
                .map_err(|e| ChatError::with_source("chat response was not JSON", e))?;
            Ok(reply_content(&value))
        })
    }
}

/// Visible conversation plus the one-request-at-a-time rule.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    in_flight: bool,
    city: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight
    }

    pub fn set_city(&mut self, city: Option<String>) {
        self.city = city;
    }

    pub fn system_prompt(&self) -> String {
        match &self.city {
            Some(city) => format!("{SYSTEM_PROMPT} The user is currently exploring {city}."),
            None => SYSTEM_PROMPT.to_string(),
        }
    }

    /// Records the user's message and returns the request to send, or `None`
    /// when the input is blank or a reply is still pending.
    pub fn begin(&mut self, text: &str) -> Option<Vec<ChatMessage>> {
        if text.trim().is_empty() || self.in_flight {
            return None;
        }
        let mut request = Vec::with_capacity(self.history.len() + 2);
        request.push(ChatMessage::new(Role::System, self.system_prompt()));
        request.extend(self.history.iter().cloned());
        let user = ChatMessage::new(Role::User, text);
        request.push(user.clone());
        self.history.push(user);
        self.in_flight = true;
        Some(request)
    }

    /// Appends the assistant's reply for the pending request.
    pub fn finish(&mut self, result: Result<Option<String>, ChatError>) -> &ChatMessage {
        let content = match result {
            Ok(Some(content)) => content,
            Ok(None) => EMPTY_REPLY.to_string(),
            Err(err) => {
                error!("chat failed: {err}");
                LINK_FAILED.to_string()
            }
        };
        self.in_flight = false;
        self.history.push(ChatMessage::new(Role::Assistant, content));
        &self.history[self.history.len() - 1]
    }

    /// `begin`, send, `finish`. Returns the appended reply, or `None` when
    /// the input was ignored.
    pub async fn send(
        &mut self,
        transport: &dyn ChatTransport,
        text: &str,
    ) -> Option<ChatMessage> {
        let request = self.begin(text)?;
        let result = transport.complete(request).await;
        Some(self.finish(result).clone())
    }
}
