//! Read the full contents of a workspace file.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::required_str;
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct ReadFileTool;

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Read the complete contents of a workspace file. Always read before modifying.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to the workspace."
                    }
                },
                "required": ["path"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let content = ctx.editor.read(path)?;
        Ok(format!("✓ Contents of {path}:\n\n{content}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi there\n").unwrap();

        let result = ReadFileTool::new()
            .call(json!({"path": "hello.txt"}), &ctx)
            .await
            .unwrap();
        assert!(result.starts_with("✓ Contents of hello.txt"));
        assert!(result.contains("hi there"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        let err = ReadFileTool::new()
            .call(json!({"path": "ghost.txt"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
