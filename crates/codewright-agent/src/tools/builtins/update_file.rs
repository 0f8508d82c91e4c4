//! Atomic whole-file replace with before/after reporting.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct UpdateFileTool;

impl Default for UpdateFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for UpdateFileTool {
    fn name(&self) -> &str {
        "update_file"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Replace the entire content of an EXISTING file in one atomic step. \
             A backup is created; before/after previews are reported.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Existing file to replace."
                    },
                    "new_content": {
                        "type": "string",
                        "description": "New complete content."
                    },
                    "reason": {
                        "type": "string",
                        "description": "Why the file is being replaced."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "new_content", "reason"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let content = required_str(&args, "new_content")?;
        let reason = required_str(&args, "reason")?;

        if !ctx.editor.exists(path)? {
            return Ok(format!(
                "⚠️ File '{path}' does not exist. Use write_file to create it instead."
            ));
        }

        let outcome = ctx.editor.update(path, content)?;
        let mut result = format!(
            "✓ File {path} updated\nReason: {reason}\n\
             Before: {} lines, first lines:\n{}\n\
             After: {} lines, first lines:\n{}",
            outcome.old_lines,
            indent(&outcome.old_head),
            outcome.new_lines,
            indent(&outcome.new_head),
        );
        if let Some(note) = maybe_checkpoint(ctx, &args, "update_file", path).await {
            result.push('\n');
            result.push_str(&note);
        }
        Ok(result)
    }
}

fn indent(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("  | {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reports_before_and_after_previews() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("app.py"), "old line\n").unwrap();

        let result = UpdateFileTool::new()
            .call(
                json!({"path": "app.py", "new_content": "new line\nsecond\n", "reason": "rewrite"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("Before: 1 lines"));
        assert!(result.contains("After: 2 lines"));
        assert!(result.contains("| old line"));
        assert!(result.contains("| new line"));
    }
}
