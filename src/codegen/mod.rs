//! Script regeneration: turn a recorded browser session plus free-text
//! guidelines into a standalone automation script via the Claude CLI, then
//! iterate on operator feedback.

pub mod generator;
pub mod prompt;
pub mod workflow;

pub use generator::ScriptGenerator;
pub use workflow::{RegenWorkflow, WorkflowConfig};
