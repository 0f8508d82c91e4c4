//! Core chat-completion types shared by every codewright crate.
//!
//! This crate owns the provider-neutral wire shapes (messages, tool calls,
//! token usage) and the OpenAI-compatible HTTP transport. It knows nothing
//! about the agent loop, the workspace, or any specific tool.

use serde::{Deserialize, Serialize};

pub mod chat;
pub mod error;
pub mod provider;

pub use chat::{AssistantTurn, ChatMessage, ChatRole, FunctionTool, Tool, ToolChoice};
pub use error::LLMError;
pub use provider::endpoint::ModelEndpoint;
pub use provider::ChatProvider;

/// A function invocation requested by the model.
///
/// The structure matches the OpenAI tool-calling wire format and is used
/// unchanged by every OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier correlating this call with its later tool result.
    pub id: String,
    /// Call kind, currently always `"function"`.
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function to invoke.
    pub function: FunctionCall,
}

/// Name and raw JSON arguments of a requested function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments exactly as transmitted by the provider: a JSON object
    /// serialized to a string.
    pub arguments: String,
}

impl ToolCall {
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Token accounting for one completion, when the endpoint reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(alias = "input_tokens")]
    pub prompt_tokens: u32,
    #[serde(alias = "output_tokens")]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    /// Accumulate another turn's usage into this running total.
    pub fn add(&mut self, other: Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}
