//! Bounded glob listing of workspace files.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::editor::LIST_LIMIT;
use crate::tools::builtins::helpers::optional_str;
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct ListFilesTool;

impl Default for ListFilesTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ListFilesTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "List workspace files matching a glob pattern (use '**' to recurse).",
            json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Glob pattern, e.g. '*.py' or 'src/**/*.rs'.",
                        "default": "*"
                    }
                },
                "required": []
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let pattern = optional_str(&args, "pattern").unwrap_or("*");
        let listing = ctx.editor.list(pattern)?;

        if listing.files.is_empty() {
            return Ok(format!("No files match '{pattern}'"));
        }

        let mut out = format!("✓ Files matching '{pattern}' ({} found):\n", listing.total);
        for file in &listing.files {
            out.push_str("  - ");
            out.push_str(file);
            out.push('\n');
        }
        if listing.total > LIST_LIMIT {
            out.push_str(&format!("… (showing first {LIST_LIMIT})\n"));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn lists_matching_files_only() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.py"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let result = ListFilesTool::new()
            .call(json!({"pattern": "*.py"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("a.py"));
        assert!(!result.contains("b.txt"));
    }

    #[tokio::test]
    async fn default_pattern_excludes_backup_directory() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("visible.txt"), "").unwrap();
        std::fs::write(
            dir.path().join(".code_agent_backups").join("hidden.backup"),
            "",
        )
        .unwrap();

        let result = ListFilesTool::new().call(json!({}), &ctx).await.unwrap();
        assert!(result.contains("visible.txt"));
        assert!(!result.contains("hidden.backup"));
    }
}
