//! `yt-dlp` backed extractor.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::InfoExtractor;
use crate::command::ToolCommand;
use crate::{Error, MediaInfo, Result};

const TOOL: &str = "yt-dlp";

/// Desktop browser UA sent upstream; the default yt-dlp UA gets blocked more often.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Invocation options for [`YtDlpExtractor`].
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    pub user_agent: String,
    /// Passed to `--socket-timeout`.
    pub socket_timeout_secs: u64,
    /// Wall-clock limit for one extraction run.
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub cookies_path: Option<PathBuf>,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            socket_timeout_secs: 10,
            timeout: Duration::from_secs(120),
            proxy: None,
            cookies_path: None,
        }
    }
}

/// Extractor running the `yt-dlp` binary with `-J`.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    program: PathBuf,
    options: YtDlpOptions,
}

impl YtDlpExtractor {
    pub fn new(program: PathBuf, options: YtDlpOptions) -> Self {
        Self { program, options }
    }

    /// Argument vector for one extraction.
    pub fn build_args(&self, url: &str, format: &str) -> Vec<String> {
        let mut args = vec![
            "-J".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--flat-playlist".to_string(),
            "--format".to_string(),
            // `+` arrives as a space when the selector came through a query string.
            format.trim().replace(' ', "+"),
            "--user-agent".to_string(),
            self.options.user_agent.clone(),
            "--socket-timeout".to_string(),
            self.options.socket_timeout_secs.to_string(),
        ];

        if let Some(proxy) = &self.options.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        if let Some(path) = &self.options.cookies_path {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

/// Turn yt-dlp's error output into a typed failure.
///
/// Matching on message text is inherently version-dependent, which is why it
/// stays inside this adapter.
pub fn classify_failure(stderr: &str) -> Error {
    let message = error_summary(stderr);
    let lower = message.to_lowercase();

    const BLOCKED: &[&str] = &["blocked", "403", "429", "not a bot", "too many requests"];
    const RESTRICTED: &[&str] = &[
        "private",
        "age-restricted",
        "age restricted",
        "confirm your age",
        "members-only",
    ];

    if BLOCKED.iter().any(|needle| lower.contains(needle)) {
        Error::Blocked { message }
    } else if RESTRICTED.iter().any(|needle| lower.contains(needle)) {
        Error::Restricted { message }
    } else {
        Error::tool_failed(TOOL, message)
    }
}

/// The `ERROR:` lines of the output, or its last line when there are none.
fn error_summary(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        return errors.join("\n");
    }

    stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("unknown error")
        .to_string()
}

#[async_trait]
impl InfoExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        TOOL
    }

    fn validate_url(&self, url: &str) -> bool {
        super::is_youtube_url(url)
    }

    async fn extract(&self, url: &str, format: &str) -> Result<MediaInfo> {
        let args = self.build_args(url, format);

        #[cfg(feature = "tracing")]
        tracing::debug!(program = %self.program.display(), ?args, "running extractor");

        let output = ToolCommand::new(self.program.clone())
            .args(args)
            .timeout(self.options.timeout)
            .output()
            .await?;

        if !output.status.success() {
            let err = classify_failure(&output.stderr);
            #[cfg(feature = "tracing")]
            tracing::warn!(%url, status = %output.status, error = %err, "extraction failed");
            return Err(err);
        }

        let value: serde_json::Value = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::parse_error(TOOL, e.to_string()))?;

        MediaInfo::from_extractor_json(value, url)
    }

    async fn version(&self) -> Result<String> {
        let output = ToolCommand::new(self.program.clone())
            .arg("--version")
            .timeout(Duration::from_secs(10))
            .execute()
            .await?;
        Ok(output.stdout.trim().to_string())
    }
}
