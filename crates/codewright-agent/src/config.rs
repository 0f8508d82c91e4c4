//! Agent configuration.
//!
//! One canonical [`ModelProviderConfig`] replaces the historical pile of
//! overlapping knobs (`model`, `simple_model`, `complex_model`, `api_base`,
//! `api_key`); [`ModelProviderConfig::from_model_names`] is the single
//! migration shim for the legacy string pair.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use codewright::ModelEndpoint;
use serde::Deserialize;

use crate::error::AgentError;
use crate::tools::Complexity;

pub const DEFAULT_MAX_ITERATIONS: u32 = 30;
pub const MAX_ITERATIONS_CEILING: u32 = 1000;
pub const DEFAULT_HISTORY_TASKS: usize = 3;

/// Which endpoint serves which kind of call.
///
/// Immutable after startup. `tool_overrides` pins individual tools to a
/// specific endpoint regardless of their complexity tag.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelProviderConfig {
    pub simple: ModelEndpoint,
    pub complex: ModelEndpoint,
    #[serde(default)]
    pub tool_overrides: HashMap<String, ModelEndpoint>,
}

impl ModelProviderConfig {
    /// Migration shim for the legacy `simple_model` / `complex_model` pair.
    pub fn from_model_names(simple: impl Into<String>, complex: impl Into<String>) -> Self {
        Self {
            simple: ModelEndpoint::new(simple),
            complex: ModelEndpoint::new(complex),
            tool_overrides: HashMap::new(),
        }
    }

    /// Single fixed model for every call.
    pub fn single(model: impl Into<String>) -> Self {
        let endpoint = ModelEndpoint::new(model);
        Self {
            simple: endpoint.clone(),
            complex: endpoint,
            tool_overrides: HashMap::new(),
        }
    }

    /// Override-then-complexity lookup for one tool.
    pub fn endpoint_for(&self, tool: &str, complexity: Complexity) -> &ModelEndpoint {
        if let Some(endpoint) = self.tool_overrides.get(tool) {
            return endpoint;
        }
        match complexity {
            Complexity::Complex => &self.complex,
            Complexity::Simple => &self.simple,
        }
    }
}

/// Enumerated agent options. Constructed once, immutable afterwards.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Root directory bounding every file tool.
    pub workspace: PathBuf,
    pub provider: ModelProviderConfig,
    /// Enables planning, validation, and complexity-based routing.
    pub use_multi_model: bool,
    /// Per-task LLM-call budget, 1..=1000. Overridable per task.
    pub max_iterations: u32,
    /// Human-readable progress printing.
    pub verbose: bool,
    /// Append-only session log, written when set.
    pub log_file: Option<PathBuf>,
    /// Number of full task transcripts retained in memory.
    pub max_history_tasks: usize,
}

impl AgentConfig {
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Load from a TOML file. File values lose to nothing here; callers that
    /// want CLI-over-file precedence apply their overrides on the builder.
    pub fn from_file(path: &Path) -> Result<AgentConfigBuilder, AgentError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("cannot read config file {}: {}", path.display(), e)))?;
        let file: FileConfig = toml::from_str(&raw)
            .map_err(|e| AgentError::Config(format!("invalid config file {}: {}", path.display(), e)))?;
        Ok(file.into_builder())
    }

    fn validate(&self) -> Result<(), AgentError> {
        if self.max_iterations < 1 || self.max_iterations > MAX_ITERATIONS_CEILING {
            return Err(AgentError::Config(format!(
                "max_iterations must be within 1..={} (got {})",
                MAX_ITERATIONS_CEILING, self.max_iterations
            )));
        }
        if !self.workspace.is_dir() {
            return Err(AgentError::Config(format!(
                "workspace is not a directory: {}",
                self.workspace.display()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    workspace: Option<PathBuf>,
    provider: Option<ModelProviderConfig>,
    use_multi_model: Option<bool>,
    max_iterations: Option<u32>,
    verbose: Option<bool>,
    log_file: Option<PathBuf>,
    max_history_tasks: Option<usize>,
}

impl AgentConfigBuilder {
    pub fn workspace(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace = Some(path.into());
        self
    }

    pub fn provider(mut self, provider: ModelProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn use_multi_model(mut self, enabled: bool) -> Self {
        self.use_multi_model = Some(enabled);
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = Some(enabled);
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn max_history_tasks(mut self, n: usize) -> Self {
        self.max_history_tasks = Some(n);
        self
    }

    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let workspace = self.workspace.unwrap_or_else(|| PathBuf::from("."));
        let workspace = workspace.canonicalize().map_err(|e| {
            AgentError::Config(format!("cannot resolve workspace {}: {}", workspace.display(), e))
        })?;
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("a model provider configuration is required".to_string()))?;

        let config = AgentConfig {
            workspace,
            provider,
            use_multi_model: self.use_multi_model.unwrap_or(false),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            verbose: self.verbose.unwrap_or(true),
            log_file: self.log_file,
            max_history_tasks: self.max_history_tasks.unwrap_or(DEFAULT_HISTORY_TASKS),
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk TOML shape. Legacy `simple_model`/`complex_model` names are
/// accepted here and folded through the migration shim.
#[derive(Debug, Deserialize)]
struct FileConfig {
    workspace: Option<PathBuf>,
    provider: Option<ModelProviderConfig>,
    simple_model: Option<String>,
    complex_model: Option<String>,
    use_multi_model: Option<bool>,
    max_iterations: Option<u32>,
    verbose: Option<bool>,
    log_file: Option<PathBuf>,
    max_history_tasks: Option<usize>,
}

impl FileConfig {
    fn into_builder(self) -> AgentConfigBuilder {
        let provider = self.provider.or_else(|| match (self.simple_model, self.complex_model) {
            (Some(simple), Some(complex)) => Some(ModelProviderConfig::from_model_names(simple, complex)),
            (Some(model), None) | (None, Some(model)) => Some(ModelProviderConfig::single(model)),
            (None, None) => None,
        });

        let mut builder = AgentConfig::builder();
        if let Some(workspace) = self.workspace {
            builder = builder.workspace(workspace);
        }
        if let Some(provider) = provider {
            builder = builder.provider(provider);
        }
        if let Some(multi) = self.use_multi_model {
            builder = builder.use_multi_model(multi);
        }
        if let Some(n) = self.max_iterations {
            builder = builder.max_iterations(n);
        }
        if let Some(v) = self.verbose {
            builder = builder.verbose(v);
        }
        if let Some(path) = self.log_file {
            builder = builder.log_file(path);
        }
        if let Some(n) = self.max_history_tasks {
            builder = builder.max_history_tasks(n);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider() -> ModelProviderConfig {
        ModelProviderConfig::from_model_names("gpt-4o-mini", "gpt-4o")
    }

    #[test]
    fn builder_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AgentConfig::builder()
            .workspace(dir.path())
            .provider(provider())
            .build()
            .unwrap();
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.max_history_tasks, DEFAULT_HISTORY_TASKS);
        assert!(!config.use_multi_model);
        assert!(config.verbose);
    }

    #[test]
    fn max_iterations_bounds_are_fatal() {
        let dir = TempDir::new().unwrap();
        for bad in [0, 1001] {
            let err = AgentConfig::builder()
                .workspace(dir.path())
                .provider(provider())
                .max_iterations(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, AgentError::Config(_)), "{bad} should be rejected");
        }
    }

    #[test]
    fn missing_provider_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = AgentConfig::builder().workspace(dir.path()).build().unwrap_err();
        assert!(err.to_string().contains("provider"));
    }

    #[test]
    fn endpoint_for_prefers_tool_override() {
        let mut config = provider();
        config
            .tool_overrides
            .insert("edit_lines".to_string(), ModelEndpoint::new("gpt-4o"));
        assert_eq!(config.endpoint_for("edit_lines", Complexity::Simple).model, "gpt-4o");
        assert_eq!(config.endpoint_for("read_file", Complexity::Simple).model, "gpt-4o-mini");
        assert_eq!(config.endpoint_for("read_file", Complexity::Complex).model, "gpt-4o");
    }

    #[test]
    fn file_config_accepts_legacy_model_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(
            &path,
            format!(
                "workspace = {:?}\nsimple_model = \"lmstudio/qwen2.5-7b-instruct\"\ncomplex_model = \"gpt-4o\"\nuse_multi_model = true\nmax_iterations = 50\n",
                dir.path()
            ),
        )
        .unwrap();
        let config = AgentConfig::from_file(&path).unwrap().build().unwrap();
        assert_eq!(config.provider.simple.model, "lmstudio/qwen2.5-7b-instruct");
        assert_eq!(config.provider.complex.model, "gpt-4o");
        assert_eq!(config.max_iterations, 50);
        assert!(config.use_multi_model);
    }

    #[test]
    fn file_config_accepts_structured_provider() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(
            &path,
            format!(
                r#"workspace = {:?}

[provider.simple]
model = "qwen/qwen3-coder-30b"
base_url = "http://localhost:1234/v1"
api_key = ""

[provider.complex]
model = "gpt-4o"

[provider.tool_overrides.edit_lines]
model = "gpt-4o"
"#,
                dir.path()
            ),
        )
        .unwrap();
        let config = AgentConfig::from_file(&path).unwrap().build().unwrap();
        assert_eq!(
            config.provider.simple.base_url.as_deref(),
            Some("http://localhost:1234/v1")
        );
        assert!(config.provider.tool_overrides.contains_key("edit_lines"));
    }
}
