//! Tool wrappers over the git session manager.
//!
//! Every wrapper is thin: pull the arguments, delegate to [`GitSession`],
//! pass the message through. Non-repository workspaces get the session
//! manager's friendly no-op messages rather than errors.

use async_trait::async_trait;
use codewright::Tool;
use serde_json::{Value, json};

use crate::tools::builtins::helpers::{optional_bool, optional_str, optional_usize, required_str, string_array};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

macro_rules! git_tool {
    ($struct_name:ident, $tool_name:literal, $description:literal, $params:tt, $required:tt,
     |$args:ident, $ctx:ident| $body:expr) => {
        pub struct $struct_name;

        #[async_trait]
        impl AgentTool for $struct_name {
            fn name(&self) -> &str {
                $tool_name
            }

            fn definition(&self) -> Tool {
                Tool::function(
                    self.name(),
                    $description,
                    json!({
                        "type": "object",
                        "properties": $params,
                        "required": $required
                    }),
                )
            }

            async fn call(&self, $args: Value, $ctx: &ToolCtx) -> Result<String, ToolError> {
                Ok($body?)
            }
        }
    };
}

git_tool!(
    GitInitTool,
    "git_init",
    "Initialize a git repository in the workspace, seed a .gitignore, and commit a baseline.",
    {},
    [],
    |_args, ctx| ctx.git.init().await
);

git_tool!(
    GitStatusTool,
    "git_status",
    "Show the current branch and working tree status.",
    {},
    [],
    |_args, ctx| ctx.git.status().await
);

git_tool!(
    GitHistoryTool,
    "git_history",
    "Show recent commit history.",
    {
        "limit": {"type": "integer", "description": "Number of commits to show.", "default": 10},
        "oneline": {"type": "boolean", "description": "Compact one-line format.", "default": true}
    },
    [],
    |args, ctx| {
        let limit = optional_usize(&args, "limit")?.unwrap_or(10);
        let oneline = optional_bool(&args, "oneline", true);
        ctx.git.history(limit, oneline).await
    }
);

git_tool!(
    GitCheckpointTool,
    "git_checkpoint",
    "Stage all changes and commit a 🔖 [CHECKPOINT] to roll back to later.",
    {
        "message": {"type": "string", "description": "Checkpoint description."}
    },
    ["message"],
    |args, ctx| {
        let message = required_str(&args, "message")?;
        ctx.git.checkpoint(message).await
    }
);

git_tool!(
    GitRollbackTool,
    "git_rollback",
    "Roll back to a commit. With files, restores just those paths; otherwise resets the \
     branch (soft by default, auto-stashing current changes first).",
    {
        "ref": {"type": "string", "description": "Commit hash or reference to roll back to."},
        "hard": {"type": "boolean", "description": "Hard reset (discards changes).", "default": false},
        "files": {"type": "array", "items": {"type": "string"}, "description": "Optional specific paths to restore."}
    },
    ["ref"],
    |args, ctx| {
        let reference = required_str(&args, "ref")?;
        let hard = optional_bool(&args, "hard", false);
        let files = string_array(&args, "files")?;
        ctx.git.rollback(reference, hard, files.as_deref()).await
    }
);

git_tool!(
    GitStashSaveTool,
    "git_stash_save",
    "Stash current changes under a name. Refuses when the tree is clean.",
    {
        "name": {"type": "string", "description": "Stash description."},
        "include_untracked": {"type": "boolean", "description": "Also stash untracked files.", "default": true}
    },
    ["name"],
    |args, ctx| {
        let name = required_str(&args, "name")?;
        let untracked = optional_bool(&args, "include_untracked", true);
        ctx.git.stash_save(name, untracked).await
    }
);

git_tool!(
    GitStashApplyTool,
    "git_stash_apply",
    "Apply a stash (newest by default) and drop it unless told otherwise.",
    {
        "ref": {"type": "string", "description": "Stash reference, e.g. 'stash@{1}'. Default: newest."},
        "drop": {"type": "boolean", "description": "Drop the stash after applying.", "default": true}
    },
    [],
    |args, ctx| {
        let reference = optional_str(&args, "ref");
        let drop = optional_bool(&args, "drop", true);
        ctx.git.stash_apply(reference, drop).await
    }
);

git_tool!(
    GitStashListTool,
    "git_stash_list",
    "List saved stashes.",
    {},
    [],
    |_args, ctx| ctx.git.stash_list().await
);

git_tool!(
    GitBranchCreateTool,
    "git_branch_create",
    "Create a branch, checking it out by default.",
    {
        "name": {"type": "string", "description": "Branch name."},
        "checkout": {"type": "boolean", "description": "Switch to the new branch.", "default": true}
    },
    ["name"],
    |args, ctx| {
        let name = required_str(&args, "name")?;
        let checkout = optional_bool(&args, "checkout", true);
        ctx.git.branch_create(name, checkout).await
    }
);

git_tool!(
    GitBranchSwitchTool,
    "git_branch_switch",
    "Switch branches. Refuses while uncommitted changes are present.",
    {
        "name": {"type": "string", "description": "Branch to switch to."},
        "create": {"type": "boolean", "description": "Create the branch when missing.", "default": false}
    },
    ["name"],
    |args, ctx| {
        let name = required_str(&args, "name")?;
        let create = optional_bool(&args, "create", false);
        ctx.git.branch_switch(name, create).await
    }
);

git_tool!(
    GitBranchListTool,
    "git_branch_list",
    "List branches.",
    {
        "show_remote": {"type": "boolean", "description": "Include remote branches.", "default": false}
    },
    [],
    |args, ctx| {
        let remote = optional_bool(&args, "show_remote", false);
        ctx.git.branch_list(remote).await
    }
);

git_tool!(
    GitSessionStartTool,
    "git_session_start",
    "Start an isolated session branch (session/<timestamp>-<slug>) for this run's work. \
     Initializes the repository when there is none; refuses on a dirty tree.",
    {
        "description": {"type": "string", "description": "Short description of the session."}
    },
    ["description"],
    |args, ctx| {
        let description = required_str(&args, "description")?;
        ctx.git.session_start(description).await
    }
);

git_tool!(
    GitSessionEndTool,
    "git_session_end",
    "Summarize the session branch and print the merge/squash/discard commands. Never \
     merges by itself; the human decides.",
    {
        "target_branch": {"type": "string", "description": "Branch to compare against.", "default": "master"}
    },
    [],
    |args, ctx| {
        let target = optional_str(&args, "target_branch").unwrap_or("master");
        ctx.git.session_end(target).await
    }
);

git_tool!(
    GitReviewTool,
    "git_review",
    "Review the current session: commits, changed files, merge suggestions.",
    {},
    [],
    |_args, ctx| ctx.git.review().await
);
