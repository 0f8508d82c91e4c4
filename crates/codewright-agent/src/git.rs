//! Git session management.
//!
//! Drives the `git` binary as a child process. A run is isolated on its own
//! `session/<timestamp>-<slug>` branch; checkpoints, stashes, and rollbacks
//! all happen there, and `session_end` only prints the merge commands; the
//! human decides what lands on the target branch.

use std::path::PathBuf;
use std::process::Output;
use std::sync::Mutex;

use thiserror::Error;
use tokio::process::Command;

use crate::util::{slugify, timestamp_human, timestamp_minute};

const COMMIT_IDENTITY: [&str; 4] = [
    "-c",
    "user.name=codewright",
    "-c",
    "user.email=agent@codewright.local",
];

const GITIGNORE_TEMPLATE: &str = "\
# Common build and environment artifacts
__pycache__/
*.pyc
.env
venv/
node_modules/
target/
*.log
.DS_Store

# Agent backups
.code_agent_backups/
";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git is not available: {0}")]
    Unavailable(String),

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
struct SessionState {
    active: bool,
    branch: Option<String>,
}

pub struct GitSession {
    workspace: PathBuf,
    state: Mutex<SessionState>,
}

impl GitSession {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn session_branch(&self) -> Option<String> {
        self.state.lock().unwrap().branch.clone()
    }

    pub fn session_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    async fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workspace)
            .output()
            .await
            .map_err(|e| GitError::Unavailable(e.to_string()))
    }

    async fn run_ok(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(GitError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    async fn commit(&self, args: &[&str]) -> Result<String, GitError> {
        let mut full: Vec<&str> = COMMIT_IDENTITY.to_vec();
        full.extend_from_slice(args);
        self.run_ok(&full).await
    }

    pub async fn is_repo(&self) -> bool {
        matches!(
            self.run(&["rev-parse", "--is-inside-work-tree"]).await,
            Ok(output) if output.status.success()
        )
    }

    pub async fn has_changes(&self) -> Result<bool, GitError> {
        Ok(!self.run_ok(&["status", "--porcelain"]).await?.is_empty())
    }

    pub async fn current_branch(&self) -> Result<String, GitError> {
        self.run_ok(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    fn not_a_repo() -> String {
        "ℹ️ The workspace is not a git repository. Use git_init to initialize one.".to_string()
    }

    fn dirty_tree_refusal(action: &str) -> String {
        format!(
            "⚠️ Cannot {action}: there are uncommitted changes.\n\
             Options: git_checkpoint to commit them, git_stash_save to park them, \
             or git_rollback to discard them."
        )
    }

    /// Initialize a repository, seed a `.gitignore`, and commit the existing
    /// files as a baseline.
    pub async fn init(&self) -> Result<String, GitError> {
        if self.is_repo().await {
            return Ok("ℹ️ The workspace is already a git repository.".to_string());
        }
        self.run_ok(&["init"]).await?;

        let gitignore = self.workspace.join(".gitignore");
        if !gitignore.exists() {
            std::fs::write(&gitignore, GITIGNORE_TEMPLATE)?;
        }

        self.run_ok(&["add", "-A"]).await?;
        self.commit(&["commit", "-m", "initial commit", "--allow-empty"]).await?;
        Ok("✓ Initialized git repository with an initial commit (.gitignore seeded).".to_string())
    }

    /// Start an isolated session branch. Initializes the repository first
    /// when the workspace has none; refuses while the tree is dirty.
    pub async fn session_start(&self, description: &str) -> Result<String, GitError> {
        if !self.is_repo().await {
            self.init().await?;
        } else if self.has_changes().await? {
            return Ok(Self::dirty_tree_refusal("start a session"));
        }

        let branch = format!("session/{}-{}", timestamp_minute(), slugify(description, 30));
        self.run_ok(&["checkout", "-b", &branch]).await?;

        let mut state = self.state.lock().unwrap();
        state.active = true;
        state.branch = Some(branch.clone());
        Ok(format!("✓ Session started on branch {branch}"))
    }

    /// Lazy bootstrap on the first task of a run. Unlike `session_start` this
    /// never initializes a repository and tolerates a dirty tree: branch
    /// creation carries uncommitted changes along.
    pub async fn bootstrap_for_task(&self, task: &str) -> Result<Option<String>, GitError> {
        if self.session_active() {
            return Ok(self.session_branch());
        }
        if !self.is_repo().await {
            return Ok(None);
        }

        let current = self.current_branch().await?;
        if current.starts_with("session/") {
            let mut state = self.state.lock().unwrap();
            state.active = true;
            state.branch = Some(current.clone());
            return Ok(Some(current));
        }

        let short_task: String = task.chars().take(28).collect();
        let branch = format!("session/{}-{}", timestamp_minute(), slugify(&short_task, 30));
        self.run_ok(&["checkout", "-b", &branch]).await?;

        let mut state = self.state.lock().unwrap();
        state.active = true;
        state.branch = Some(branch.clone());
        Ok(Some(branch))
    }

    /// End-of-session report: commits ahead of the target, changed files,
    /// and the three ready-to-paste commands. Never merges by itself.
    pub async fn session_end(&self, target: &str) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        let branch = self.current_branch().await?;
        let target = self.existing_target(target).await;

        let range = format!("{}..HEAD", target);
        let count = self
            .run_ok(&["rev-list", "--count", &range])
            .await
            .unwrap_or_else(|_| "?".to_string());
        let commits = self
            .run_ok(&["log", "--oneline", &range])
            .await
            .unwrap_or_default();
        let files = self
            .run_ok(&["diff", "--name-only", &format!("{}...HEAD", target)])
            .await
            .unwrap_or_default();

        Ok(format!(
            "📋 Session review for {branch}\n\
             Commits ahead of {target}: {count}\n\n\
             Commits:\n{commits}\n\n\
             Changed files:\n{files}\n\n\
             To keep the work:\n\
             \x20 git checkout {target} && git merge {branch}\n\
             To squash it into one commit:\n\
             \x20 git checkout {target} && git merge --squash {branch} && git commit\n\
             To discard it:\n\
             \x20 git checkout {target} && git branch -D {branch}"
        ))
    }

    async fn existing_target(&self, target: &str) -> String {
        for candidate in [target, "master", "main"] {
            let reference = format!("refs/heads/{}", candidate);
            if let Ok(output) = self.run(&["rev-parse", "--verify", "--quiet", &reference]).await {
                if output.status.success() {
                    return candidate.to_string();
                }
            }
        }
        target.to_string()
    }

    /// Stage everything and commit a checkpoint. Returns the short hash.
    pub async fn checkpoint(&self, message: &str) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        if !self.has_changes().await? {
            return Ok("ℹ️ Working tree is clean, nothing to checkpoint.".to_string());
        }
        self.run_ok(&["add", "-A"]).await?;
        let full_message = format!("🔖 [CHECKPOINT] {} ({})", message, timestamp_human());
        self.commit(&["commit", "-m", &full_message]).await?;
        let hash = self.run_ok(&["rev-parse", "--short", "HEAD"]).await?;
        Ok(format!("✓ Checkpoint {hash}: {message}"))
    }

    /// Per-file restore when `files` is given, otherwise a reset. Soft resets
    /// stash the current changes first so nothing is silently lost.
    pub async fn rollback(
        &self,
        reference: &str,
        hard: bool,
        files: Option<&[String]>,
    ) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }

        if let Some(files) = files.filter(|f| !f.is_empty()) {
            let mut args = vec!["checkout", reference, "--"];
            args.extend(files.iter().map(String::as_str));
            self.run_ok(&args).await?;
            return Ok(format!("✓ Restored {} file(s) from {reference}", files.len()));
        }

        if !hard && self.has_changes().await? {
            self.run_ok(&["stash", "push", "-u", "-m", "auto-stash before rollback"]).await?;
        }
        let mode = if hard { "--hard" } else { "--soft" };
        self.run_ok(&["reset", mode, reference]).await?;
        let note = if hard {
            ""
        } else {
            " (current changes auto-stashed; git_stash_apply restores them)"
        };
        Ok(format!("✓ Reset {mode} to {reference}{note}"))
    }

    pub async fn history(&self, limit: usize, oneline: bool) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        let limit_arg = format!("-{}", limit.max(1));
        let log = if oneline {
            self.run_ok(&["log", "--oneline", &limit_arg]).await?
        } else {
            self.run_ok(&["log", &limit_arg, "--stat"]).await?
        };
        if log.is_empty() {
            return Ok("ℹ️ No commits yet.".to_string());
        }
        Ok(log)
    }

    pub async fn status(&self) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        let branch = self.current_branch().await?;
        let short = self.run_ok(&["status", "--short"]).await?;
        if short.is_empty() {
            Ok(format!("On branch {branch}: working tree clean"))
        } else {
            Ok(format!("On branch {branch}:\n{short}"))
        }
    }

    /// Reporting-only summary of the current session branch.
    pub async fn review(&self) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        match self.session_branch() {
            Some(_) => self.session_end("master").await,
            None => {
                let branch = self.current_branch().await?;
                let recent = self.history(5, true).await?;
                Ok(format!("On branch {branch} (no session branch)\nRecent commits:\n{recent}"))
            }
        }
    }

    pub async fn stash_save(&self, name: &str, include_untracked: bool) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        if !self.has_changes().await? {
            return Ok("ℹ️ Working tree is clean, nothing to stash.".to_string());
        }
        let mut args = vec!["stash", "push"];
        if include_untracked {
            args.push("-u");
        }
        args.extend_from_slice(&["-m", name]);
        self.run_ok(&args).await?;
        Ok(format!("✓ Stashed changes as '{name}'"))
    }

    /// Apply a stash, newest first by default. `drop` pops it afterwards.
    pub async fn stash_apply(&self, reference: Option<&str>, drop: bool) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        let target = reference.unwrap_or("stash@{0}");
        let verb = if drop { "pop" } else { "apply" };
        self.run_ok(&["stash", verb, target]).await?;
        Ok(format!("✓ Applied {target}{}", if drop { " (dropped)" } else { "" }))
    }

    pub async fn stash_list(&self) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        let list = self.run_ok(&["stash", "list"]).await?;
        if list.is_empty() {
            return Ok("ℹ️ No stashes.".to_string());
        }
        Ok(list)
    }

    pub async fn branch_create(&self, name: &str, checkout: bool) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        if checkout {
            self.run_ok(&["checkout", "-b", name]).await?;
            Ok(format!("✓ Created and switched to branch {name}"))
        } else {
            self.run_ok(&["branch", name]).await?;
            Ok(format!("✓ Created branch {name}"))
        }
    }

    pub async fn branch_switch(&self, name: &str, create: bool) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        if self.has_changes().await? {
            return Ok(Self::dirty_tree_refusal(&format!("switch to {name}")));
        }
        if create {
            self.run_ok(&["checkout", "-B", name]).await?;
        } else {
            self.run_ok(&["checkout", name]).await?;
        }
        Ok(format!("✓ Switched to branch {name}"))
    }

    pub async fn branch_list(&self, remote: bool) -> Result<String, GitError> {
        if !self.is_repo().await {
            return Ok(Self::not_a_repo());
        }
        if remote {
            self.run_ok(&["branch", "-a"]).await
        } else {
            self.run_ok(&["branch"]).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn git_available() -> bool {
        Command::new("git").arg("--version").output().await.is_ok()
    }

    async fn repo_session() -> Option<(TempDir, GitSession)> {
        if !git_available().await {
            return None;
        }
        let dir = TempDir::new().unwrap();
        let session = GitSession::new(dir.path());
        Some((dir, session))
    }

    #[tokio::test]
    async fn non_repo_operations_are_friendly_noops() {
        let Some((_dir, session)) = repo_session().await else { return };
        assert!(!session.is_repo().await);
        assert!(session.status().await.unwrap().contains("not a git repository"));
        assert!(session.checkpoint("x").await.unwrap().contains("not a git repository"));
        assert!(session.stash_list().await.unwrap().contains("not a git repository"));
    }

    #[tokio::test]
    async fn init_seeds_gitignore_with_backup_dir() {
        let Some((dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        assert!(session.is_repo().await);
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(gitignore.contains(".code_agent_backups/"));
    }

    #[tokio::test]
    async fn session_start_creates_named_branch() {
        let Some((_dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        let message = session.session_start("Add user auth flow").await.unwrap();
        assert!(message.contains("session/"));
        let branch = session.current_branch().await.unwrap();
        assert!(branch.starts_with("session/"), "{branch}");
        assert!(branch.ends_with("add-user-auth-flow"), "{branch}");
        assert!(session.session_active());
    }

    #[tokio::test]
    async fn session_start_refuses_dirty_tree() {
        let Some((dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        std::fs::write(dir.path().join("dirty.txt"), "x").unwrap();
        let message = session.session_start("task").await.unwrap();
        assert!(message.contains("uncommitted changes"));
        assert!(!session.session_active());
    }

    #[tokio::test]
    async fn checkpoint_commits_on_session_branch() {
        let Some((dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        let base = session.current_branch().await.unwrap();
        session.session_start("checkpoint test").await.unwrap();

        std::fs::write(dir.path().join("work.txt"), "content").unwrap();
        let result = session.checkpoint("first step").await.unwrap();
        assert!(result.starts_with("✓ Checkpoint"));

        // The commit landed on the session branch, not the base branch.
        let on_session = session.run_ok(&["log", "--oneline", "-1"]).await.unwrap();
        assert!(on_session.contains("[CHECKPOINT] first step"));
        let range = format!("{base}..HEAD");
        let ahead = session.run_ok(&["rev-list", "--count", &range]).await.unwrap();
        assert_eq!(ahead, "1");
    }

    #[tokio::test]
    async fn checkpoint_on_clean_tree_reports_nothing_to_do() {
        let Some((_dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        let result = session.checkpoint("noop").await.unwrap();
        assert!(result.contains("nothing to checkpoint"));
    }

    #[tokio::test]
    async fn bootstrap_creates_branch_from_task_text() {
        let Some((_dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        let branch = session.bootstrap_for_task("add README documentation for the project").await.unwrap();
        let branch = branch.expect("repo should get a session branch");
        assert!(branch.starts_with("session/"));
        // Slug derives from the first 28 characters of the task.
        assert!(branch.contains("add-readme"), "{branch}");

        // A second bootstrap in the same process is a no-op.
        let again = session.bootstrap_for_task("different task").await.unwrap();
        assert_eq!(again.as_deref(), Some(branch.as_str()));
    }

    #[tokio::test]
    async fn stash_cycle_round_trips_changes() {
        let Some((dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        assert!(session.stash_save("empty", true).await.unwrap().contains("nothing to stash"));

        std::fs::write(dir.path().join("wip.txt"), "wip").unwrap();
        session.stash_save("wip work", true).await.unwrap();
        assert!(!dir.path().join("wip.txt").exists());
        assert!(session.stash_list().await.unwrap().contains("wip work"));

        session.stash_apply(None, true).await.unwrap();
        assert!(dir.path().join("wip.txt").exists());
        assert!(session.stash_list().await.unwrap().contains("No stashes"));
    }

    #[tokio::test]
    async fn branch_switch_refuses_dirty_tree() {
        let Some((dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        session.branch_create("feature", false).await.unwrap();
        std::fs::write(dir.path().join("dirty.txt"), "x").unwrap();
        let message = session.branch_switch("feature", false).await.unwrap();
        assert!(message.contains("uncommitted changes"));
    }

    #[tokio::test]
    async fn session_end_lists_merge_commands() {
        let Some((dir, session)) = repo_session().await else { return };
        session.init().await.unwrap();
        session.session_start("merge commands").await.unwrap();
        std::fs::write(dir.path().join("f.txt"), "1").unwrap();
        session.checkpoint("step").await.unwrap();

        let report = session.session_end("master").await.unwrap();
        assert!(report.contains("git merge"));
        assert!(report.contains("--squash"));
        assert!(report.contains("branch -D"));
        assert!(report.contains("f.txt"));
    }
}
