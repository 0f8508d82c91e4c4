//! Insert content between two lines without touching either.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str, required_usize};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct InsertLinesTool;

impl Default for InsertLinesTool {
    fn default() -> Self {
        Self::new()
    }
}

impl InsertLinesTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for InsertLinesTool {
    fn name(&self) -> &str {
        "insert_lines"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "ADD content AFTER a line, between it and the next one. Nothing is removed or \
             replaced: after_line=8 inserts between lines 8 and 9 and both survive. \
             after_line=0 prepends, after_line=<line count> appends. This is the default \
             way to add new code; edit_lines REPLACES instead.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File to modify."
                    },
                    "after_line": {
                        "type": "integer",
                        "description": "Insert after this 1-indexed line (0 = start of file)."
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to insert (complete block, not line by line)."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "after_line", "content"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let after = required_usize(&args, "after_line")?;
        let content = required_str(&args, "content")?;

        let outcome = ctx.editor.insert_lines(path, after, content)?;
        let mut result = format!(
            "✅ Inserted after line {after} in {path} ({} → {} lines, backup created)\n\
             No existing lines were removed or replaced.",
            outcome.old_total, outcome.new_total
        );
        if let Some(note) = maybe_checkpoint(ctx, &args, "insert_lines", path).await {
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
    async fn inserts_between_lines() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("b.txt"), "a\nb\nc\n").unwrap();

        let result = InsertLinesTool::new()
            .call(json!({"path": "b.txt", "after_line": 1, "content": "X"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("3 → 4 lines"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("b.txt")).unwrap(),
            "a\nX\nb\nc\n"
        );
    }

    #[tokio::test]
    async fn beyond_end_is_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("b.txt"), "a\n").unwrap();

        let err = InsertLinesTool::new()
            .call(json!({"path": "b.txt", "after_line": 9, "content": "X"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("beyond the file"));
    }
}
