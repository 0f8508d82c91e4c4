pub mod apply_edits;
pub mod cognitive;
pub mod delete_lines;
pub mod edit_lines;
pub mod ensure_lines;
pub mod force_write_file;
pub mod git_tools;
pub mod helpers;
pub mod insert_lines;
pub mod list_files;
pub mod read_file;
pub mod search_replace;
pub mod shell;
pub mod show_file;
pub mod update_file;
pub mod write_file;

pub use apply_edits::ApplyEditsTool;
pub use cognitive::{
    AnalyzeErrorTool, COGNITIVE_TOOL_NAMES, ProgressCheckpointTool, ReplanApproachTool,
    ValidateResultTool,
};
pub use delete_lines::DeleteLinesTool;
pub use edit_lines::EditLinesTool;
pub use ensure_lines::EnsureLinesTool;
pub use force_write_file::ForceWriteFileTool;
pub use git_tools::{
    GitBranchCreateTool, GitBranchListTool, GitBranchSwitchTool, GitCheckpointTool,
    GitHistoryTool, GitInitTool, GitReviewTool, GitRollbackTool, GitSessionEndTool,
    GitSessionStartTool, GitStashApplyTool, GitStashListTool, GitStashSaveTool, GitStatusTool,
};
pub use insert_lines::InsertLinesTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use search_replace::SearchReplaceTool;
pub use shell::{RunCommandTool, RunScriptTool, StopBackgroundProcessTool};
pub use show_file::ShowFileTool;
pub use update_file::UpdateFileTool;
pub use write_file::WriteFileTool;

use std::sync::Arc;

use crate::tools::context::AgentTool;

/// All builtin tools, the canonical registration set.
pub fn all_builtin_tools() -> Vec<Arc<dyn AgentTool>> {
    vec![
        // Files
        Arc::new(ReadFileTool::new()),
        Arc::new(ListFilesTool::new()),
        Arc::new(ShowFileTool::new()),
        // Mutation
        Arc::new(WriteFileTool::new()),
        Arc::new(ForceWriteFileTool::new()),
        Arc::new(UpdateFileTool::new()),
        Arc::new(EnsureLinesTool::new()),
        Arc::new(SearchReplaceTool::new()),
        Arc::new(EditLinesTool::new()),
        Arc::new(InsertLinesTool::new()),
        Arc::new(DeleteLinesTool::new()),
        Arc::new(ApplyEditsTool::new()),
        // Shell
        Arc::new(RunCommandTool::new()),
        Arc::new(RunScriptTool::new()),
        Arc::new(StopBackgroundProcessTool::new()),
        // Cognitive stubs
        Arc::new(AnalyzeErrorTool),
        Arc::new(ReplanApproachTool),
        Arc::new(ValidateResultTool),
        Arc::new(ProgressCheckpointTool),
        // Git
        Arc::new(GitInitTool),
        Arc::new(GitStatusTool),
        Arc::new(GitHistoryTool),
        Arc::new(GitCheckpointTool),
        Arc::new(GitRollbackTool),
        Arc::new(GitStashSaveTool),
        Arc::new(GitStashApplyTool),
        Arc::new(GitStashListTool),
        Arc::new(GitBranchCreateTool),
        Arc::new(GitBranchSwitchTool),
        Arc::new(GitBranchListTool),
        Arc::new(GitSessionStartTool),
        Arc::new(GitSessionEndTool),
        Arc::new(GitReviewTool),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::ToolRegistry;

    #[test]
    fn all_builtins_register_without_collisions() {
        let mut registry = ToolRegistry::new();
        for tool in all_builtin_tools() {
            registry.register(tool).unwrap();
        }
        let names = registry.names();
        assert!(names.len() >= 30, "got {}", names.len());
        for name in COGNITIVE_TOOL_NAMES {
            assert!(names.contains(&name.to_string()), "{name} missing");
        }
    }

    #[test]
    fn cognitive_tools_are_the_only_complex_ones() {
        let mut registry = ToolRegistry::new();
        for tool in all_builtin_tools() {
            registry.register(tool).unwrap();
        }
        for name in registry.names() {
            let complexity = registry.complexity_of(&name).unwrap();
            let is_cognitive = COGNITIVE_TOOL_NAMES.contains(&name.as_str());
            assert_eq!(
                complexity == crate::tools::Complexity::Complex,
                is_cognitive,
                "{name} has unexpected complexity"
            );
        }
    }
}
