//! # tubeforged-av
//!
//! Adapters for the two external tools tubeforged drives.
//!
//! This crate provides functionality for:
//! - Resolving video links into metadata and direct media URLs (`yt-dlp`)
//! - Planning transcoder invocations (`ffmpeg`) for audio or video output
//! - Locating and checking the external tools
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tubeforged_av::{InfoExtractor, TranscodePlan, TranscodeSettings, YtDlpExtractor, YtDlpOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = YtDlpExtractor::new(PathBuf::from("yt-dlp"), YtDlpOptions::default());
//! let info = extractor
//!     .extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "bestaudio")
//!     .await?;
//! let plan = TranscodePlan::from_media(&info)?;
//! println!("ffmpeg {}", plan.ffmpeg_args(&TranscodeSettings::default()).join(" "));
//! # Ok(())
//! # }
//! ```

mod command;
mod error;
pub mod extract;
pub mod models;
pub mod tools;
pub mod transcode;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use extract::{InfoExtractor, YtDlpExtractor, YtDlpOptions, DEFAULT_FORMAT};
pub use models::{Format, FormatKind, MediaInfo, Thumbnail};
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, resolve_tool_path, ToolInfo};
pub use transcode::{OutputKind, PlanError, TranscodePlan, TranscodeSettings};
