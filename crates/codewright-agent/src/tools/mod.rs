pub mod builtins;
pub mod context;
pub mod registry;

pub use context::{AgentTool, Complexity, ToolCtx, ToolError};
pub use registry::ToolRegistry;
