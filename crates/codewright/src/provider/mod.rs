//! Chat providers and endpoint resolution.

use async_trait::async_trait;

use crate::chat::{AssistantTurn, ChatMessage, Tool};
use crate::error::LLMError;

pub mod endpoint;
pub mod openai;

pub use endpoint::ModelEndpoint;
pub use openai::OpenAIChatProvider;

/// A chat-completion backend.
///
/// Every provider normalizes its reply into an [`AssistantTurn`]; transport
/// failures propagate as [`LLMError`] and are never retried at this layer.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Chat without tools. Delegates to [`ChatProvider::chat_with_tools`].
    async fn chat(&self, messages: &[ChatMessage]) -> Result<AssistantTurn, LLMError> {
        self.chat_with_tools(messages, None).await
    }

    /// Chat with an optional tool catalog. `None` disables tools for this
    /// call even when the caller normally advertises them.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<AssistantTurn, LLMError>;

    /// The model name as transmitted on the wire.
    fn model(&self) -> &str;
}
