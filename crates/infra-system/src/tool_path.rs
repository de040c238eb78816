// Resolution of the device-bridge executable (fail fast at startup)

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolPathError {
    #[error("adb path is required")]
    Empty,

    #[error("adb executable '{0}' not found on PATH: {1}")]
    NotOnPath(String, String),

    #[error("adb executable '{0}' does not exist or is not a file")]
    Missing(PathBuf),
}

/// Resolve `tool` to an absolute executable path
///
/// Bare names (`adb`) are looked up on `PATH`; anything containing a path
/// separator must point at an existing file.
pub fn resolve_tool_path(tool: &Path) -> Result<PathBuf, ToolPathError> {
    if tool.as_os_str().is_empty() {
        return Err(ToolPathError::Empty);
    }

    if tool.components().count() == 1 && !tool.is_absolute() {
        return which::which(tool).map_err(|e| {
            ToolPathError::NotOnPath(tool.display().to_string(), e.to_string())
        });
    }

    if tool.is_file() {
        Ok(tool.to_path_buf())
    } else {
        Err(ToolPathError::Missing(tool.to_path_buf()))
    }
}
