//! Numbered preview of the start of a file.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::editor::PREVIEW_LINES;
use crate::tools::builtins::helpers::required_str;
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct ShowFileTool;

impl Default for ShowFileTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ShowFileTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for ShowFileTool {
    fn name(&self) -> &str {
        "show_file"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Quick preview of a file: the first 30 lines with line numbers.",
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
        let preview = ctx.editor.preview(path)?;

        let mut out = format!("✓ Preview of {path} ({} lines):\n\n", preview.total);
        for (i, line) in preview.lines.iter().enumerate() {
            out.push_str(&format!("{:4} | {}\n", i + 1, line));
        }
        if preview.total > PREVIEW_LINES {
            out.push_str(&format!("… ({} more lines)\n", preview.total - PREVIEW_LINES));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn preview_shows_numbered_lines_and_remainder() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        let content: String = (1..=35).map(|i| format!("row {i}\n")).collect();
        std::fs::write(dir.path().join("long.txt"), content).unwrap();

        let result = ShowFileTool::new()
            .call(json!({"path": "long.txt"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("   1 | row 1"));
        assert!(result.contains("  30 | row 30"));
        assert!(!result.contains("row 31"));
        assert!(result.contains("(5 more lines)"));
    }
}
