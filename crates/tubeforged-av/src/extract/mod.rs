//! Metadata extraction.
//!
//! [`InfoExtractor`] is the seam between the HTTP layer and whatever
//! resolves a source link into [`MediaInfo`]. The production implementation
//! shells out to `yt-dlp`; tests substitute their own.

mod links;
mod ytdlp;

pub use links::{is_http_url, is_youtube_url, youtube_video_id};
pub use ytdlp::{classify_failure, YtDlpExtractor, YtDlpOptions, DEFAULT_USER_AGENT};

use async_trait::async_trait;

use crate::{MediaInfo, Result};

/// Format selector used when the caller does not pass one.
pub const DEFAULT_FORMAT: &str = "bestvideo+bestaudio/best";

/// Resolves source links into metadata and direct media URLs.
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Cheap syntactic check run before any network access.
    fn validate_url(&self, url: &str) -> bool;

    /// Resolve `url`, letting the extractor pick streams for `format`.
    ///
    /// Failures come back classified: [`crate::Error::Blocked`],
    /// [`crate::Error::Restricted`], [`crate::Error::Malformed`], or another
    /// variant for everything else.
    async fn extract(&self, url: &str, format: &str) -> Result<MediaInfo>;

    /// Version string of the underlying tool.
    async fn version(&self) -> Result<String>;
}
