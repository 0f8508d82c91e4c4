//! Idempotent line-set union, for config-style files.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str, string_array};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct EnsureLinesTool;

impl Default for EnsureLinesTool {
    fn default() -> Self {
        Self::new()
    }
}

impl EnsureLinesTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for EnsureLinesTool {
    fn name(&self) -> &str {
        "ensure_lines"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Ensure each given line is present in a file, appending the missing ones. \
             Creates the file when absent. Safe to call repeatedly.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Target file, e.g. requirements.txt or .gitignore."
                    },
                    "lines": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Lines that must be present."
                    },
                    "reason": {
                        "type": "string",
                        "description": "Why these lines are needed."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "lines", "reason"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let lines = string_array(&args, "lines")?
            .ok_or_else(|| ToolError::InvalidArgs("lines is required".to_string()))?;

        let outcome = ctx.editor.ensure_lines(path, &lines)?;
        let mut result = if outcome.created {
            format!("✓ File {path} created with {} line(s)", outcome.added.len())
        } else if outcome.added.is_empty() {
            format!("ℹ️ All {} line(s) already present in {path}", outcome.present.len())
        } else {
            format!(
                "✓ {path}: appended {} line(s) ({} already present)\nAdded:\n{}",
                outcome.added.len(),
                outcome.present.len(),
                outcome
                    .added
                    .iter()
                    .map(|l| format!("  + {l}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };

        if outcome.created || !outcome.added.is_empty() {
            if let Some(note) = maybe_checkpoint(ctx, &args, "ensure_lines", path).await {
                result.push('\n');
                result.push_str(&note);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn union_reports_added_and_present() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "fastapi\n").unwrap();

        let result = EnsureLinesTool::new()
            .call(
                json!({"path": "requirements.txt", "lines": ["fastapi", "pytest"], "reason": "test deps"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("appended 1 line(s)"));
        assert!(result.contains("+ pytest"));
        assert!(result.contains("1 already present"));
    }
}
