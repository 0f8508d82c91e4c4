//! OpenAI-compatible chat-completions client.
//!
//! Speaks the plain `POST {base}/chat/completions` protocol with tool
//! calling. The configured model name is transmitted verbatim, with no
//! alias normalization, so local inference servers (LM Studio, Ollama,
//! vLLM) work unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::{AssistantTurn, ChatMessage, ChatRole, Tool, ToolChoice};
use crate::error::LLMError;
use crate::provider::ChatProvider;
use crate::{ToolCall, Usage};

#[derive(Debug)]
pub struct OpenAIChatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Message as serialized into the request body.
#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<&'a [ToolCall]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

impl OpenAIChatProvider {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1` or
    /// `http://localhost:1234/v1`. An empty `api_key` is permitted; local
    /// inference servers accept any value.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn wire_messages<'a>(messages: &'a [ChatMessage]) -> Vec<WireMessage<'a>> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                    ChatRole::Tool => "tool",
                };
                // Assistant turns that only carry tool calls have no content
                // field; everything else sends its text, even when empty.
                let content = if m.content.is_empty() && !m.tool_calls.is_empty() {
                    None
                } else {
                    Some(m.content.as_str())
                };
                WireMessage {
                    role,
                    content,
                    tool_calls: if m.tool_calls.is_empty() {
                        None
                    } else {
                        Some(m.tool_calls.as_slice())
                    },
                    tool_call_id: m.tool_call_id.as_deref(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl ChatProvider for OpenAIChatProvider {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<AssistantTurn, LLMError> {
        let tools = tools.filter(|t| !t.is_empty());
        let body = ChatRequest {
            model: &self.model,
            messages: Self::wire_messages(messages),
            tools,
            tool_choice: tools.map(|_| ToolChoice::Auto),
        };

        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("chat request to {} ({} messages)", url, messages.len());

        let mut request = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LLMError::Auth(format!("{}: {}", status, text)));
            }
            return Err(LLMError::Provider(format!("{}: {}", status, text)));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| LLMError::ResponseFormat {
            message: e.to_string(),
            raw: text.clone(),
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| LLMError::ResponseFormat {
            message: "response carried no choices".to_string(),
            raw: text,
        })?;

        Ok(AssistantTurn {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            usage: parsed.usage,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_round_trips_tool_calls() {
        let messages = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::user("list the files"),
            ChatMessage::assistant("").with_tool_calls(vec![ToolCall::function(
                "call_1",
                "list_files",
                "{}",
            )]),
            ChatMessage::tool("call_1", "a.txt\nb.txt"),
        ];
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: OpenAIChatProvider::wire_messages(&messages),
            tools: None,
            tool_choice: None,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        // Assistant turn keeps its tool_calls array and drops empty content.
        assert_eq!(json["messages"][2]["tool_calls"][0]["id"], "call_1");
        assert!(json["messages"][2].get("content").is_none());
        // Tool result is bound to the call id.
        assert_eq!(json["messages"][3]["tool_call_id"], "call_1");
        assert_eq!(json["messages"][3]["content"], "a.txt\nb.txt");
    }

    #[test]
    fn response_normalizes_missing_fields() {
        let raw = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let choice = parsed.choices.into_iter().next().unwrap();
        let turn = AssistantTurn {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            usage: parsed.usage,
        };
        assert_eq!(turn.content, "");
        assert!(turn.tool_calls.is_empty());
        assert!(turn.usage.is_none());
    }

    #[test]
    fn response_extracts_tool_calls_and_usage() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": null,
                "tool_calls": [{"id": "c1", "type": "function",
                    "function": {"name": "read_file", "arguments": "{\"path\":\"x\"}"}}]}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.total_tokens, 15);
        let calls = parsed.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "read_file");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAIChatProvider::new("http://localhost:1234/v1/", "", "local-model");
        assert_eq!(provider.base_url(), "http://localhost:1234/v1");
    }
}
