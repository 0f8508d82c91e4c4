//! Tool trait, execution context, and error type.
//!
//! Handlers receive their dependencies through an explicit [`ToolCtx`] record
//! instead of parameter introspection: the dispatcher supplies the context,
//! the argument bag stays pure JSON.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use codewright::Tool;
use serde_json::Value;
use thiserror::Error;

use crate::editor::{EditorError, FileEditor};
use crate::error::AgentError;
use crate::git::{GitError, GitSession};

/// Routing weight of a tool. Simple tools run on the cheap endpoint; calling
/// a complex tool routes the *next* model call to the strong endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Complex,
}

/// Errors raised inside tool handlers. The dispatcher reifies every variant
/// into a `❌ …` tool-result string; nothing here ever aborts the task.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Ambient context injected into every tool call.
pub struct ToolCtx {
    pub workspace: PathBuf,
    pub editor: Arc<FileEditor>,
    pub git: Arc<GitSession>,
}

impl ToolCtx {
    pub fn new(workspace: impl Into<PathBuf>) -> Result<Self, AgentError> {
        let workspace = workspace.into();
        let editor = Arc::new(FileEditor::new(&workspace)?);
        let git = Arc::new(GitSession::new(&workspace));
        Ok(Self {
            workspace,
            editor,
            git,
        })
    }
}

/// A callable agent tool.
///
/// Handlers return a single UTF-8 string; that contract is load-bearing (the
/// model consumes strings). Internally they work with the editor's structured
/// outcomes and stringify at the edge.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;

    /// Schema descriptor as advertised to the model.
    fn definition(&self) -> Tool;

    fn complexity(&self) -> Complexity {
        Complexity::Simple
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError>;
}
