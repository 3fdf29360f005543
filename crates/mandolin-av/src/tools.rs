//! External tool detection.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's version output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Check whether `program` runs and report its version.
///
/// ```no_run
/// use mandolin_av::check_tool;
///
/// let info = check_tool("ffmpeg", "-version");
/// if info.available {
///     println!("ffmpeg: {:?}", info.version);
/// }
/// ```
pub fn check_tool(program: &str, version_arg: &str) -> ToolInfo {
    let name = Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string());

    match Command::new(program).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            // HandBrakeCLI prints its banner on stderr
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).to_string()
            } else {
                String::from_utf8_lossy(&output.stdout).to_string()
            };
            ToolInfo {
                name,
                available: true,
                version: text.lines().next().map(|s| s.trim().to_string()),
                path: which::which(program).ok(),
            }
        }
        _ => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check the tools the editor uses: ffmpeg and HandBrakeCLI.
pub fn check_tools(ffmpeg: &str, handbrake: &str) -> Vec<ToolInfo> {
    vec![
        check_tool(ffmpeg, "-version"),
        check_tool(handbrake, "--version"),
    ]
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    require_tool(name)
}
