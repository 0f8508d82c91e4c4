//! Cognitive meta-tools.
//!
//! These handlers compute nothing: they hand a structured reflection prompt
//! back to the model. Calling one signals the model is in failure-analysis
//! mode, and the router answers the next turn with the complex endpoint.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{optional_str, required_str};
use crate::tools::context::{AgentTool, Complexity, ToolCtx, ToolError};

/// Names of the four reflection stubs, in registration order.
pub const COGNITIVE_TOOL_NAMES: [&str; 4] = [
    "analyze_error",
    "replan_approach",
    "validate_result",
    "progress_checkpoint",
];

pub struct AnalyzeErrorTool;

#[async_trait]
impl AgentTool for AnalyzeErrorTool {
    fn name(&self) -> &str {
        "analyze_error"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "🧠 ERROR ANALYSIS - use when a tool failed or returned an unexpected result. \
             Returns a structured breakdown to reason about the root cause and next steps.",
            json!({
                "type": "object",
                "properties": {
                    "error_message": {"type": "string", "description": "The error or unexpected result."},
                    "tool_name": {"type": "string", "description": "Tool that failed."},
                    "tool_args": {"type": "string", "description": "Arguments used (JSON string)."},
                    "context": {"type": "string", "description": "What you were trying to do."}
                },
                "required": ["error_message", "tool_name", "context"]
            }),
        )
    }

    fn complexity(&self) -> Complexity {
        Complexity::Complex
    }

    async fn call(&self, args: Value, _ctx: &ToolCtx) -> Result<String, ToolError> {
        let error = required_str(&args, "error_message")?;
        let tool = required_str(&args, "tool_name")?;
        let context = required_str(&args, "context")?;
        let tool_args = optional_str(&args, "tool_args").unwrap_or("{}");

        Ok(format!(
            "🔍 ERROR ANALYSIS REQUESTED\n\n\
             📛 Tool: {tool}\n\
             📋 Arguments: {tool_args}\n\
             ❌ Error: {error}\n\
             📝 Context: {context}\n\n\
             ⚠️ INSTRUCTIONS:\n\
             1. Identify the root cause of this error\n\
             2. Check whether the arguments were correct\n\
             3. Consider an alternative approach\n\
             4. If the strategy itself is wrong, call replan_approach\n\n\
             COMMON CAUSES:\n\
             - File does not exist: check with list_files\n\
             - Line numbers out of range: re-read the file first\n\
             - Missing dependency: install it with run_command"
        ))
    }
}

pub struct ReplanApproachTool;

#[async_trait]
impl AgentTool for ReplanApproachTool {
    fn name(&self) -> &str {
        "replan_approach"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "🔄 REPLANNING - use when the current strategy is not working: repeated errors, \
             a blocked action, or new information that changes the plan.",
            json!({
                "type": "object",
                "properties": {
                    "original_goal": {"type": "string", "description": "The original task goal."},
                    "current_situation": {"type": "string", "description": "What was done and what failed."},
                    "obstacles": {"type": "string", "description": "Obstacles encountered."},
                    "new_information": {"type": "string", "description": "New facts discovered during execution."}
                },
                "required": ["original_goal", "current_situation", "obstacles"]
            }),
        )
    }

    fn complexity(&self) -> Complexity {
        Complexity::Complex
    }

    async fn call(&self, args: Value, _ctx: &ToolCtx) -> Result<String, ToolError> {
        let goal = required_str(&args, "original_goal")?;
        let situation = required_str(&args, "current_situation")?;
        let obstacles = required_str(&args, "obstacles")?;
        let news = optional_str(&args, "new_information").unwrap_or("none");

        Ok(format!(
            "🔄 REPLANNING REQUESTED\n\n\
             🎯 Original goal: {goal}\n\n\
             📍 Current situation:\n{situation}\n\n\
             🚧 Obstacles:\n{obstacles}\n\n\
             💡 New information:\n{news}\n\n\
             ⚠️ INSTRUCTIONS:\n\
             1. Revise the strategy in light of the obstacles\n\
             2. Pick a different approach, not a retry of the same call\n\
             3. Write the new plan step by step\n\
             4. Execute the new plan"
        ))
    }
}

pub struct ValidateResultTool;

#[async_trait]
impl AgentTool for ValidateResultTool {
    fn name(&self) -> &str {
        "validate_result"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "✅ RESULT VALIDATION - use after important operations to confirm the action \
             actually did what was expected.",
            json!({
                "type": "object",
                "properties": {
                    "action_taken": {"type": "string", "description": "The action that was executed."},
                    "expected_result": {"type": "string", "description": "What you expected to happen."},
                    "actual_result": {"type": "string", "description": "What the tool actually returned."},
                    "verification_method": {"type": "string", "description": "How to verify (e.g. 'read_file', 'run_command ls')."}
                },
                "required": ["action_taken", "expected_result", "actual_result"]
            }),
        )
    }

    fn complexity(&self) -> Complexity {
        Complexity::Complex
    }

    async fn call(&self, args: Value, _ctx: &ToolCtx) -> Result<String, ToolError> {
        let action = required_str(&args, "action_taken")?;
        let expected = required_str(&args, "expected_result")?;
        let actual = required_str(&args, "actual_result")?;
        let method = optional_str(&args, "verification_method")
            .filter(|m| !m.is_empty())
            .unwrap_or("use read_file or list_files to confirm");

        // A cheap lexical hint; the real judgement happens in the model.
        let lower = actual.to_lowercase();
        let looks_failed = ["✗", "❌", "error", "failed", "not found"]
            .iter()
            .any(|ind| lower.contains(&ind.to_lowercase()));
        let looks_ok = ["✓", "✅", "success", "created", "edited", "ok"]
            .iter()
            .any(|ind| lower.contains(&ind.to_lowercase()));
        let status = if looks_failed {
            "❌ LIKELY FAILURE"
        } else if looks_ok {
            "✅ LIKELY SUCCESS"
        } else {
            "⚠️ UNCERTAIN"
        };

        Ok(format!(
            "✅ RESULT VALIDATION\n\n\
             📋 Action: {action}\n\
             🎯 Expected: {expected}\n\
             📊 Actual: {actual}\n\n\
             {status}\n\n\
             🔍 Suggested verification: {method}\n\n\
             ⚠️ INSTRUCTIONS:\n\
             1. Compare expected and actual results\n\
             2. If uncertain, run the suggested verification\n\
             3. If it failed, call analyze_error\n\
             4. If it succeeded, continue to the next step"
        ))
    }
}

pub struct ProgressCheckpointTool;

#[async_trait]
impl AgentTool for ProgressCheckpointTool {
    fn name(&self) -> &str {
        "progress_checkpoint"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "📊 PROGRESS CHECKPOINT - use periodically during long tasks to record what is \
             done, what remains, and whether the plan still makes sense.",
            json!({
                "type": "object",
                "properties": {
                    "task_description": {"type": "string", "description": "The main task."},
                    "steps_completed": {"type": "string", "description": "Steps already completed."},
                    "steps_remaining": {"type": "string", "description": "Steps still to do."},
                    "confidence_level": {"type": "string", "description": "Confidence: high, medium, low."}
                },
                "required": ["task_description", "steps_completed", "steps_remaining"]
            }),
        )
    }

    fn complexity(&self) -> Complexity {
        Complexity::Complex
    }

    async fn call(&self, args: Value, _ctx: &ToolCtx) -> Result<String, ToolError> {
        let task = required_str(&args, "task_description")?;
        let done = required_str(&args, "steps_completed")?;
        let remaining = required_str(&args, "steps_remaining")?;
        let confidence = optional_str(&args, "confidence_level").unwrap_or("medium");

        Ok(format!(
            "📊 PROGRESS CHECKPOINT\n\n\
             🎯 Task: {task}\n\n\
             ✅ Completed:\n{done}\n\n\
             ⏳ Remaining:\n{remaining}\n\n\
             📈 Confidence: {}\n\n\
             ⚠️ INSTRUCTIONS:\n\
             1. Confirm the completed steps actually succeeded\n\
             2. Check the remaining steps still make sense\n\
             3. On low confidence, call replan_approach\n\
             4. Continue with the next step",
            confidence.to_uppercase()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stubs_restate_inputs_and_are_complex() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();

        let tool = AnalyzeErrorTool;
        assert_eq!(tool.complexity(), Complexity::Complex);
        let result = tool
            .call(
                json!({
                    "error_message": "file not found: app.py",
                    "tool_name": "read_file",
                    "context": "reading the app before editing"
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("read_file"));
        assert!(result.contains("file not found: app.py"));
        assert!(result.contains("replan_approach"));
    }

    #[tokio::test]
    async fn validate_result_hints_at_failure() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        let result = ValidateResultTool
            .call(
                json!({
                    "action_taken": "edit_lines",
                    "expected_result": "line replaced",
                    "actual_result": "❌ ERROR line numbers out of range"
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("LIKELY FAILURE"));
    }
}
