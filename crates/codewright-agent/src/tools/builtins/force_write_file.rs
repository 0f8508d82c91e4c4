//! Deliberate overwrite of an existing file, with an audited reason.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct ForceWriteFileTool;

impl Default for ForceWriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceWriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for ForceWriteFileTool {
    fn name(&self) -> &str {
        "force_write_file"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Overwrite an EXISTING file unconditionally. Use only when certain; a backup is \
             created and the reason is recorded.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Existing file to overwrite."
                    },
                    "content": {
                        "type": "string",
                        "description": "New complete content."
                    },
                    "reason": {
                        "type": "string",
                        "description": "Why the overwrite is intended (audit trail)."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "content", "reason"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;
        let reason = required_str(&args, "reason")?;

        if !ctx.editor.exists(path)? {
            return Ok(format!(
                "⚠️ File '{path}' does not exist. Use write_file to create new files; \
                 force_write_file only overwrites existing ones."
            ));
        }

        log::info!("force overwrite of {path}: {reason}");
        let outcome = ctx.editor.force_write(path, content)?;
        let mut result = format!(
            "✓ File {path} overwritten\nReason: {reason}\nBackup created automatically\n\
             Change: {} → {} lines",
            outcome.old_lines, outcome.new_lines
        );
        if let Some(note) = maybe_checkpoint(ctx, &args, "force_write_file", path).await {
            result.push('\n');
            result.push_str(&note);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn overwrites_and_echoes_reason() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("f.txt"), "old\n").unwrap();

        let result = ForceWriteFileTool::new()
            .call(
                json!({"path": "f.txt", "content": "new\n", "reason": "user asked for a rewrite"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("Reason: user asked for a rewrite"));
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "new\n");
    }

    #[tokio::test]
    async fn refuses_missing_target() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        let result = ForceWriteFileTool::new()
            .call(json!({"path": "nope.txt", "content": "x", "reason": "r"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("Use write_file"), "{result}");
    }
}
