//! Remove lines by range or by explicit index list.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::editor::DeleteSpec;
use crate::tools::builtins::helpers::{
    checkpoint_property, maybe_checkpoint, optional_usize, required_str,
};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct DeleteLinesTool;

impl Default for DeleteLinesTool {
    fn default() -> Self {
        Self::new()
    }
}

impl DeleteLinesTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for DeleteLinesTool {
    fn name(&self) -> &str {
        "delete_lines"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Remove lines from a file. Either a 1-indexed inclusive range \
             (start_line/end_line) OR a list of 0-indexed line_indices, never both.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File to modify."
                    },
                    "start_line": {
                        "type": "integer",
                        "description": "First line of the range (1-indexed, inclusive)."
                    },
                    "end_line": {
                        "type": "integer",
                        "description": "Last line of the range (1-indexed, inclusive)."
                    },
                    "line_indices": {
                        "type": "array",
                        "items": {"type": "integer"},
                        "description": "0-indexed lines to remove, e.g. [0, 10, 23]."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let start = optional_usize(&args, "start_line")?;
        let end = optional_usize(&args, "end_line")?;
        let indices = args.get("line_indices").and_then(Value::as_array);

        let spec = match (start, end, indices) {
            (None, None, None) => {
                return Err(ToolError::InvalidArgs(
                    "provide start_line/end_line OR line_indices".to_string(),
                ));
            }
            (Some(_), _, Some(_)) | (_, Some(_), Some(_)) => {
                return Err(ToolError::InvalidArgs(
                    "use the range OR line_indices, not both".to_string(),
                ));
            }
            (Some(start), Some(end), None) => DeleteSpec::Range { start, end },
            (Some(_), None, None) | (None, Some(_), None) => {
                return Err(ToolError::InvalidArgs(
                    "both start_line and end_line are required in range mode".to_string(),
                ));
            }
            (None, None, Some(items)) => {
                let mut indices = Vec::with_capacity(items.len());
                for item in items {
                    let idx = item.as_u64().ok_or_else(|| {
                        ToolError::InvalidArgs("line_indices must contain non-negative integers".to_string())
                    })?;
                    indices.push(idx as usize);
                }
                DeleteSpec::Indices(indices)
            }
        };

        let outcome = ctx.editor.delete_lines(path, spec)?;
        let removed: Vec<String> = outcome.removed.iter().map(|n| n.to_string()).collect();
        let mut result = format!(
            "✓ Removed line(s) {} from {path} ({} lines remain, backup created)",
            removed.join(", "),
            outcome.remaining
        );
        if let Some(note) = maybe_checkpoint(ctx, &args, "delete_lines", path).await {
            result.push('\n');
            result.push_str(&note);
        }
        Ok(result)
    }
}
