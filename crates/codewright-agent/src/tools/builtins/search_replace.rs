//! Literal search and replace across a whole file.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{checkpoint_property, maybe_checkpoint, required_str};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub struct SearchReplaceTool;

impl Default for SearchReplaceTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchReplaceTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for SearchReplaceTool {
    fn name(&self) -> &str {
        "search_replace"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Replace every occurrence of a literal text in a file (no regex). \
             Best for targeted changes to existing code.",
            json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File to modify."
                    },
                    "search": {
                        "type": "string",
                        "description": "Exact text to find."
                    },
                    "replace": {
                        "type": "string",
                        "description": "Replacement text."
                    },
                    "checkpoint": checkpoint_property()
                },
                "required": ["path", "search", "replace"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let path = required_str(&args, "path")?;
        let search = required_str(&args, "search")?;
        let replace = required_str(&args, "replace")?;

        let outcome = ctx.editor.search_replace(path, search, replace)?;
        if outcome.occurrences == 0 {
            return Ok(format!("⚠️ Text not found in {path}: '{search}' (file unchanged)"));
        }
        let mut result = format!(
            "✓ Replaced {} occurrence(s) in {path} (backup created)",
            outcome.occurrences
        );
        if let Some(note) = maybe_checkpoint(ctx, &args, "search_replace", path).await {
            result.push('\n');
            result.push_str(&note);
        }
        Ok(result)
    }
}
