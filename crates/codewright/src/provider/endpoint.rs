//! Model endpoint description and resolution.

use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::provider::openai::OpenAIChatProvider;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const OLLAMA_BASE: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE: &str = "http://localhost:1234/v1";

/// One model endpoint: a model name plus an optional base URL and credential.
///
/// When `base_url` is set, the model name is passed through unmodified. When
/// absent, an optional `provider/` prefix on the model name selects a known
/// OpenAI-compatible endpoint (`openai/`, `ollama/`, `lmstudio/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEndpoint {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ModelEndpoint {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: None,
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Build the HTTP client for this endpoint.
    ///
    /// Fails when a hosted endpoint is selected without a credential; local
    /// endpoints accept an empty key.
    pub fn resolve(&self) -> Result<OpenAIChatProvider, LLMError> {
        if let Some(base_url) = &self.base_url {
            // Explicit base URL: pass the model name through untouched.
            let key = self.api_key.clone().unwrap_or_default();
            return Ok(OpenAIChatProvider::new(base_url, key, &self.model));
        }

        let (prefix, name) = match self.model.split_once('/') {
            Some((p, n)) => (p, n),
            None => ("openai", self.model.as_str()),
        };

        match prefix {
            "openai" => {
                let key = self
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        LLMError::Auth(
                            "OpenAI endpoint selected but no api_key configured and OPENAI_API_KEY is unset"
                                .to_string(),
                        )
                    })?;
                Ok(OpenAIChatProvider::new(OPENAI_BASE, key, name))
            }
            "ollama" => Ok(OpenAIChatProvider::new(
                OLLAMA_BASE,
                self.api_key.clone().unwrap_or_default(),
                name,
            )),
            "lmstudio" => Ok(OpenAIChatProvider::new(
                LMSTUDIO_BASE,
                self.api_key.clone().unwrap_or_default(),
                name,
            )),
            other => Err(LLMError::InvalidRequest(format!(
                "unknown provider prefix '{}' in model '{}' (known: openai, ollama, lmstudio)",
                other, self.model
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatProvider;

    #[test]
    fn explicit_base_url_keeps_model_name_verbatim() {
        let endpoint = ModelEndpoint::new("qwen/qwen3-coder-30b")
            .with_base_url("http://spark-0852.local:1234/v1")
            .with_api_key("");
        let provider = endpoint.resolve().unwrap();
        // A slash in the model name is NOT treated as a provider prefix here.
        assert_eq!(provider.model(), "qwen/qwen3-coder-30b");
        assert_eq!(provider.base_url(), "http://spark-0852.local:1234/v1");
    }

    #[test]
    fn ollama_prefix_maps_to_local_endpoint() {
        let provider = ModelEndpoint::new("ollama/llama3").resolve().unwrap();
        assert_eq!(provider.model(), "llama3");
        assert_eq!(provider.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn lmstudio_prefix_maps_to_local_endpoint() {
        let provider = ModelEndpoint::new("lmstudio/qwen2.5-7b-instruct").resolve().unwrap();
        assert_eq!(provider.base_url(), "http://localhost:1234/v1");
    }

    #[test]
    fn openai_with_explicit_key_resolves() {
        let provider = ModelEndpoint::new("gpt-4o-mini")
            .with_api_key("sk-test")
            .resolve()
            .unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn unknown_prefix_is_rejected() {
        let err = ModelEndpoint::new("groqcloud/some-model").resolve().unwrap_err();
        assert!(matches!(err, LLMError::InvalidRequest(_)));
        assert!(err.to_string().contains("groqcloud"));
    }
}
