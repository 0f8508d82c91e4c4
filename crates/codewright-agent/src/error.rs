//! Structured error type for the agent crate.

use codewright::LLMError;
use thiserror::Error;

use crate::editor::EditorError;
use crate::git::GitError;

/// Top-level agent failures.
///
/// Propagation policy: configuration errors abort the process, transport
/// errors abort the current task, and everything raised inside a tool is
/// reified into a tool-result string before it ever reaches this type.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] LLMError),

    #[error("git error: {0}")]
    Git(#[from] GitError),

    #[error("editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
