//! Batched line edits against one file.
//!
//! All edits are validated against the current snapshot before any is
//! applied; application order is bottom-up so line numbers keep meaning what
//! the caller saw.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::editor::FileEdit;
use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct ApplyEditsTool;

impl Default for ApplyEditsTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyEditsTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for ApplyEditsTool {
    fn name(&self) -> &str {
        "apply_edits"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Apply several line-range edits to one file in a single safe batch. All line \
             numbers refer to the file as it is NOW; ordering is handled internally.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File to edit."
                    },
                    "edits": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Edit records: {start_line, end_line, new_content, description?} with 1-indexed inclusive ranges."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "edits"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let raw_edits = args
            .get("edits")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::InvalidArgs("edits is required and must be an array".to_string()))?;

        let mut edits = Vec::with_capacity(raw_edits.len());
        for (i, raw) in raw_edits.iter().enumerate() {
            let start_line = raw.get("start_line").and_then(Value::as_u64).ok_or_else(|| {
                ToolError::InvalidArgs(format!("edit {} is missing start_line", i + 1))
            })? as usize;
            let end_line = raw.get("end_line").and_then(Value::as_u64).ok_or_else(|| {
                ToolError::InvalidArgs(format!("edit {} is missing end_line", i + 1))
            })? as usize;
            let new_content = raw.get("new_content").and_then(Value::as_str).ok_or_else(|| {
                ToolError::InvalidArgs(format!("edit {} is missing new_content", i + 1))
            })?;
            let description = raw
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            edits.push(FileEdit {
                start_line,
                end_line,
                new_content: new_content.to_string(),
                description: description.to_string(),
            });
        }

        let applied = ctx.editor.apply_edits(path, &edits)?;
        let mut result = format!("✓ Applied {applied} edit(s) to {path} (backup created)");
        if let Some(note) = maybe_checkpoint(ctx, &args, "apply_edits", path).await {
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
    async fn batch_applies_regardless_of_submission_order() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        let content: String = (1..=10).map(|i| format!("{i}\n")).collect();
        std::fs::write(dir.path().join("a.txt"), &content).unwrap();

        // Top-of-file edit submitted first; the batch still lands both.
        ApplyEditsTool::new()
            .call(
                json!({"path": "a.txt", "edits": [
                    {"start_line": 3, "end_line": 3, "new_content": "THREE"},
                    {"start_line": 7, "end_line": 7, "new_content": "SEVEN"}
                ]}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "1\n2\nTHREE\n4\n5\n6\nSEVEN\n8\n9\n10\n"
        );
    }

    #[tokio::test]
    async fn invalid_edit_aborts_whole_batch() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.txt"), "1\n2\n").unwrap();

        let err = ApplyEditsTool::new()
            .call(
                json!({"path": "a.txt", "edits": [
                    {"start_line": 1, "end_line": 1, "new_content": "ok"},
                    {"start_line": 99, "end_line": 99, "new_content": "bad"}
                ]}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("edit 2"));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "1\n2\n");
    }
}
