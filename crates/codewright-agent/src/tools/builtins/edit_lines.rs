//! Replace a 1-indexed line range.
//!
//! This REMOVES the lines in `start_line..=end_line` and puts the new
//! content in their place. Use `insert_lines` to add code without removing
//! anything.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str, required_usize};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct EditLinesTool;

impl Default for EditLinesTool {
    fn default() -> Self {
        Self::new()
    }
}

impl EditLinesTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for EditLinesTool {
    fn name(&self) -> &str {
        "edit_lines"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "REPLACE lines start_line..=end_line (1-indexed, inclusive) with new content. \
             The existing lines in that range are removed. To ADD code without removing \
             anything, use insert_lines instead.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File to edit."
                    },
                    "start_line": {
                        "type": "integer",
                        "description": "First line to replace (1-indexed)."
                    },
                    "end_line": {
                        "type": "integer",
                        "description": "Last line to replace (1-indexed, inclusive)."
                    },
                    "new_content": {
                        "type": "string",
                        "description": "Replacement content (may span multiple lines; empty deletes the range)."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "start_line", "end_line", "new_content"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let start = required_usize(&args, "start_line")?;
        let end = required_usize(&args, "end_line")?;
        let new_content = required_str(&args, "new_content")?;

        let outcome = ctx.editor.edit_lines(path, start, end, new_content)?;
        let mut result = format!(
            "✓ Lines {start}-{end} of {path} replaced ({} → {} lines, backup created)",
            outcome.old_total, outcome.new_total
        );
        if let Some(note) = maybe_checkpoint(ctx, &args, "edit_lines", path).await {
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
    async fn replaces_range_and_reports_counts() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("e.txt"), "1\n2\n3\n").unwrap();

        let result = EditLinesTool::new()
            .call(
                json!({"path": "e.txt", "start_line": 2, "end_line": 3, "new_content": "X"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("Lines 2-3"));
        assert!(result.contains("3 → 2 lines"));
        assert_eq!(std::fs::read_to_string(dir.path().join("e.txt")).unwrap(), "1\nX\n");
    }

    #[tokio::test]
    async fn out_of_bounds_range_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("e.txt"), "1\n").unwrap();

        let err = EditLinesTool::new()
            .call(
                json!({"path": "e.txt", "start_line": 5, "end_line": 6, "new_content": "X"}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("beyond the file"));
    }
}
