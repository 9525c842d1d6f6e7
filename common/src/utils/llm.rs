use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

use crate::{error::AppError, utils::config::AppConfig};

/// Single-turn completion seam used by the answer path.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError>;
}

pub fn create_openai_client(config: &AppConfig) -> Client<OpenAIConfig> {
    Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    )
}

#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

pub fn create_chat_request(
    model: &str,
    system_prompt: &str,
    user_message: &str,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    CreateChatCompletionRequestArgs::default()
        .model(model)
        .temperature(0.0)
        .messages([
            ChatCompletionRequestSystemMessage::from(system_prompt).into(),
            ChatCompletionRequestUserMessage::from(user_message).into(),
        ])
        .build()
}

pub fn process_llm_response(response: CreateChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| AppError::Upstream("No content found in LLM response".into()))
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError> {
        let request = create_chat_request(&self.model, system_prompt, user_message)
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        debug!(model = %self.model, "Received completion");
        process_llm_response(response)
    }
}
