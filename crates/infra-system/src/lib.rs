// adbridge Infrastructure - System Adapters
// Implements: ProcessRunner over the real adb executable

pub mod subprocess_runner;
pub mod tool_path;

pub use subprocess_runner::SubprocessRunner;
pub use tool_path::{resolve_tool_path, ToolPathError};
