//! Chat transcript and tool-schema types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ToolCall, Usage};

/// Role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System directive steering the whole task.
    System,
    /// The human (or a synthesized steering message from the engine).
    User,
    /// A model reply, possibly carrying tool-call requests.
    Assistant,
    /// The string result of one tool call.
    Tool,
}

/// A single entry in a task transcript.
///
/// Invariant: a `Tool` message carries the `tool_call_id` of a call issued by
/// the immediately preceding assistant message; assistant messages keep their
/// `tool_calls` so the server can correlate the results on the next request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Tool result bound to the call that produced it.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A callable tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool kind, currently always `"function"`.
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionTool,
}

/// Function descriptor inside a [`Tool`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTool {
    pub name: String,
    pub description: String,
    /// JSON-schema object: `{"type":"object","properties":{...},"required":[...]}`.
    pub parameters: Value,
}

impl Tool {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// How the model may use the advertised tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides freely; the default.
    #[default]
    Auto,
    /// Model must call at least one tool.
    Required,
    /// Tools are disabled for this call.
    None,
}

impl Serialize for ToolChoice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::Required => serializer.serialize_str("required"),
            ToolChoice::None => serializer.serialize_str("none"),
        }
    }
}

/// One assistant reply, normalized across providers.
///
/// Missing `content` becomes an empty string and missing `tool_calls` an
/// empty list, so callers never branch on provider quirks.
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
}

impl AssistantTurn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Transcript entry for this reply, preserving the tool-call requests.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::assistant(self.content.clone()).with_tool_calls(self.tool_calls.clone())
    }
}
