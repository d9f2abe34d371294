//! External tool detection and management.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use tubeforged_av::check_tool;
///
/// let info = check_tool("yt-dlp");
/// if info.available {
///     println!("yt-dlp version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "--version")
}

/// Check if a tool is available using a custom version argument.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    check_program(name, Path::new(name), version_arg)
}

fn check_program(name: &str, program: &Path, version_arg: &str) -> ToolInfo {
    let result = Command::new(program).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = if program.components().count() > 1 {
                Some(program.to_path_buf())
            } else {
                which::which(program).ok()
            };

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check the tools the service shells out to.
///
/// Configured paths take precedence over a `PATH` lookup.
pub fn check_tools(ffmpeg_path: Option<&Path>, ytdlp_path: Option<&Path>) -> Vec<ToolInfo> {
    vec![
        check_program(
            "ffmpeg",
            ffmpeg_path.unwrap_or_else(|| Path::new("ffmpeg")),
            "-version",
        ),
        check_program(
            "yt-dlp",
            ytdlp_path.unwrap_or_else(|| Path::new("yt-dlp")),
            "--version",
        ),
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
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    require_tool(name)
}

/// Like [`get_tool_path`], but falls back to the bare tool name.
///
/// Used at server startup: a missing tool should surface as a per-request
/// launch error rather than keep the server from starting.
pub fn resolve_tool_path(name: &str, config_path: Option<&Path>) -> PathBuf {
    match get_tool_path(name, config_path) {
        Ok(path) => path,
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(tool = name, error = %_e, "tool not found, relying on PATH at spawn time");
            PathBuf::from(name)
        }
    }
}
