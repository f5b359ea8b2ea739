//! The companion's reply generator.
//!
//! `Agent` is the seam between the turn driver and the LLM. The production
//! implementation calls OpenAI chat completions with a system prompt built
//! from the persona fields; tests substitute fixed agents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::companion::block::Block;
use crate::companion::context::{ConversationContext, Role};
use crate::config::CompanionConfig;

const MAX_TOKENS: u32 = 1024;

#[derive(Debug)]
pub enum AgentError {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Http(e) => write!(f, "HTTP error: {e}"),
            AgentError::Api(e) => write!(f, "API error: {e}"),
            AgentError::Parse(e) => write!(f, "Parse error: {e}"),
            AgentError::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for AgentError {}

/// Produces one batch of output blocks for a conversation turn.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn respond(&self, ctx: &ConversationContext) -> Result<Vec<Block>, AgentError>;
}

/// Render the companion's system prompt from its persona fields.
pub fn system_prompt(config: &CompanionConfig) -> String {
    format!(
        "You are {}, {}.\n\n\
         Who you are:\n\n{}\n\n\
         How you behave:\n\n{}\n\n\
         Keep replies short and conversational, like chat messages.",
        config.name, config.byline, config.identity, config.behavior
    )
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'static str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI chat-completion agent.
pub struct OpenAiAgent {
    api_key: String,
    model: &'static str,
    temperature: f32,
    prompt: String,
    http: reqwest::Client,
}

impl OpenAiAgent {
    pub fn new(config: &CompanionConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            model: if config.use_gpt4 { "gpt-4" } else { "gpt-3.5-turbo" },
            temperature: config.temperature,
            prompt: system_prompt(config),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Agent for OpenAiAgent {
    async fn respond(&self, ctx: &ConversationContext) -> Result<Vec<Block>, AgentError> {
        let mut messages = vec![ApiMessage { role: "system", content: &self.prompt }];
        for entry in &ctx.history {
            messages.push(ApiMessage {
                role: match entry.role {
                    Role::User => "user",
                    Role::Companion => "assistant",
                },
                content: &entry.text,
            });
        }

        let request = ApiRequest {
            model: self.model,
            temperature: self.temperature,
            max_tokens: MAX_TOKENS,
            messages,
        };

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AgentError::Empty)?;

        Ok(vec![Block::text(content)])
    }
}
