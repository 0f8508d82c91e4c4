//! Protected file creation.
//!
//! `write_file` only creates. An existing target with identical content is a
//! no-op, a pure extension is adapted, and anything else is refused with the
//! `🚫 BLOCK:` sentinel the agent loop's deadlock detector watches for.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::editor::WriteOutcome;
use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

/// Tools the blocked-create message points the model at.
pub const REMEDIATION_TOOLS: &str =
    "update_file, ensure_lines, edit_lines, search_replace, force_write_file (with a reason)";

pub struct WriteFileTool;

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Create a new file. BLOCKS when the file already exists with different content; \
             use the editing tools (or force_write_file) to modify existing files.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path to create, relative to the workspace."
                    },
                    "content": {
                        "type": "string",
                        "description": "Complete file content."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "content"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;

        let outcome = ctx.editor.write_protected(path, content)?;
        let mut result = match outcome {
            WriteOutcome::Created { bytes } => {
                format!("✓ File {path} created ({bytes} bytes)")
            }
            WriteOutcome::Unchanged => {
                format!("ℹ️ File {path} already exists with identical content (no change needed)")
            }
            WriteOutcome::Extended { added_lines } => {
                format!(
                    "✓ File {path} adapted: existing content was a prefix of the new content, \
                     appended {added_lines} new line(s) (backup created)"
                )
            }
            WriteOutcome::Blocked {
                current_bytes,
                new_bytes,
            } => {
                return Ok(format!(
                    "🚫 BLOCK: file '{path}' already exists with different content\n\
                     Current size: {current_bytes} bytes, proposed: {new_bytes} bytes\n\
                     Nothing was written. write_file never overwrites divergent content.\n\
                     To modify this file, read it first and then use one of: {REMEDIATION_TOOLS}."
                ));
            }
        };

        if matches!(outcome, WriteOutcome::Created { .. } | WriteOutcome::Extended { .. }) {
            if let Some(note) = maybe_checkpoint(ctx, &args, "write_file", path).await {
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

    fn ctx() -> (TempDir, ToolCtx) {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[tokio::test]
    async fn creates_new_file() {
        let (dir, ctx) = ctx();
        let result = WriteFileTool::new()
            .call(json!({"path": "new.py", "content": "print(1)\n"}), &ctx)
            .await
            .unwrap();
        assert!(result.starts_with("✓ File new.py created"));
        assert!(dir.path().join("new.py").exists());
    }

    #[tokio::test]
    async fn divergent_overwrite_returns_block_sentinel() {
        let (dir, ctx) = ctx();
        std::fs::write(dir.path().join("main.py"), "print(\"hello\")\n").unwrap();

        let result = WriteFileTool::new()
            .call(json!({"path": "main.py", "content": "print(\"goodbye\")\n"}), &ctx)
            .await
            .unwrap();

        // First line is the machine-scanned sentinel; the rest names the way out.
        assert!(result.starts_with("🚫 BLOCK:"), "{result}");
        assert!(result.contains("force_write_file"));
        assert!(result.contains("update_file"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.py")).unwrap(),
            "print(\"hello\")\n"
        );
    }

    #[tokio::test]
    async fn identical_content_is_informational() {
        let (dir, ctx) = ctx();
        std::fs::write(dir.path().join("same.txt"), "abc\n").unwrap();
        let result = WriteFileTool::new()
            .call(json!({"path": "same.txt", "content": "abc\n"}), &ctx)
            .await
            .unwrap();
        assert!(result.starts_with("ℹ️"), "{result}");
    }

    #[tokio::test]
    async fn extension_is_adapted() {
        let (dir, ctx) = ctx();
        std::fs::write(dir.path().join("grow.txt"), "a\n").unwrap();
        let result = WriteFileTool::new()
            .call(json!({"path": "grow.txt", "content": "a\nb\n"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("adapted"), "{result}");
        assert_eq!(std::fs::read_to_string(dir.path().join("grow.txt")).unwrap(), "a\nb\n");
    }
}
