//! Tool registry and dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use codewright::{Tool, ToolCall};
use serde_json::Value;

use crate::error::AgentError;
use crate::tools::context::{AgentTool, Complexity, ToolCtx};

/// Catalog of callable tools, static after startup.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn AgentTool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate names are a startup error, not a silent replacement.
    pub fn register(&mut self, tool: Arc<dyn AgentTool>) -> Result<&mut Self, AgentError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AgentError::Config(format!("tool '{name}' registered twice")));
        }
        self.tools.insert(name, tool);
        Ok(self)
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Aggregate schema list attached to each chat request.
    pub fn definitions(&self) -> Vec<Tool> {
        let mut defs: Vec<Tool> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    pub fn complexity_of(&self, name: &str) -> Option<Complexity> {
        self.tools.get(name).map(|t| t.complexity())
    }

    /// Execute one model-requested tool call, reifying every failure mode
    /// into a result string so the transcript stays intact.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolCtx) -> String {
        let name = &call.function.name;
        let Some(tool) = self.find(name) else {
            return format!("✗ tool '{name}' not found");
        };

        let raw = call.function.arguments.trim();
        let args: Value = if raw.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str(raw) {
                Ok(value) => value,
                Err(e) => return format!("❌ invalid arguments: {e}"),
            }
        };

        match tool.call(args, ctx).await {
            Ok(result) => result,
            Err(e) => format!("❌ ERROR {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct EchoTool;

    #[async_trait]
    impl AgentTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn definition(&self) -> Tool {
            Tool::function("echo", "Echo the text argument.", serde_json::json!({
                "type": "object",
                "properties": {"text": {"type": "string", "description": "Text to echo."}},
                "required": ["text"]
            }))
        }

        async fn call(&self, args: Value, _ctx: &ToolCtx) -> Result<String, ToolError> {
            let text = args
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArgs("text is required".to_string()))?;
            Ok(text.to_string())
        }
    }

    fn ctx() -> (TempDir, ToolCtx) {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let err = registry.register(Arc::new(EchoTool)).unwrap_err();
        assert!(err.to_string().contains("registered twice"));
    }

    #[tokio::test]
    async fn dispatch_runs_the_handler() {
        let (_dir, ctx) = ctx();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let call = ToolCall::function("c1", "echo", r#"{"text":"hello"}"#);
        assert_eq!(registry.dispatch(&call, &ctx).await, "hello");
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_tools() {
        let (_dir, ctx) = ctx();
        let registry = ToolRegistry::new();
        let call = ToolCall::function("c1", "nope", "{}");
        assert_eq!(registry.dispatch(&call, &ctx).await, "✗ tool 'nope' not found");
    }

    #[tokio::test]
    async fn dispatch_reports_malformed_arguments() {
        let (_dir, ctx) = ctx();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let call = ToolCall::function("c1", "echo", "{not json");
        let result = registry.dispatch(&call, &ctx).await;
        assert!(result.starts_with("❌ invalid arguments:"), "{result}");
    }

    #[tokio::test]
    async fn dispatch_reifies_handler_errors() {
        let (_dir, ctx) = ctx();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        // Valid JSON, missing required key.
        let call = ToolCall::function("c1", "echo", "{}");
        let result = registry.dispatch(&call, &ctx).await;
        assert!(result.starts_with("❌ ERROR"), "{result}");
        assert!(result.contains("text is required"));
    }

    #[tokio::test]
    async fn empty_argument_string_means_no_arguments() {
        let (_dir, ctx) = ctx();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();

        let call = ToolCall::function("c1", "echo", "");
        let result = registry.dispatch(&call, &ctx).await;
        // Reaches the handler, which then reports the missing key itself.
        assert!(result.contains("text is required"));
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].function.name, "echo");
        assert_eq!(defs[0].tool_type, "function");
    }
}
