use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tubeforged_av::{TranscodeSettings, YtDlpOptions, DEFAULT_FORMAT};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL the download route uses to reach this server's info route.
    /// Derived from the bound address when unset.
    #[serde(default)]
    pub self_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            self_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    /// User-Agent sent upstream by the extractor
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Format selector used when a request does not pass `f`
    #[serde(default = "default_format")]
    pub default_format: String,

    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_secs: u64,

    /// Hard limit for one extractor run
    #[serde(default = "default_extract_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub proxy: Option<String>,

    /// Netscape-format cookies file handed to the extractor
    #[serde(default)]
    pub cookies_path: Option<PathBuf>,
}

fn default_user_agent() -> String {
    tubeforged_av::extract::DEFAULT_USER_AGENT.to_string()
}
fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}
fn default_socket_timeout() -> u64 {
    10
}
fn default_extract_timeout() -> u64 {
    120
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            default_format: default_format(),
            socket_timeout_secs: default_socket_timeout(),
            timeout_secs: default_extract_timeout(),
            proxy: None,
            cookies_path: None,
        }
    }
}

impl ExtractorConfig {
    pub fn ytdlp_options(&self) -> YtDlpOptions {
        YtDlpOptions {
            user_agent: self.user_agent.clone(),
            socket_timeout_secs: self.socket_timeout_secs,
            timeout: Duration::from_secs(self.timeout_secs),
            proxy: self.proxy.clone(),
            cookies_path: self.cookies_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_mp3_codec")]
    pub mp3_codec: String,

    /// ffmpeg `-loglevel`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Filename stem used when the source has no title
    #[serde(default = "default_fallback_filename")]
    pub fallback_filename: String,
}

fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_audio_codec() -> String {
    "aac".to_string()
}
fn default_mp3_codec() -> String {
    "libmp3lame".to_string()
}
fn default_log_level() -> String {
    "error".to_string()
}
fn default_fallback_filename() -> String {
    "download".to_string()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            mp3_codec: default_mp3_codec(),
            log_level: default_log_level(),
            fallback_filename: default_fallback_filename(),
        }
    }
}

impl TranscodeConfig {
    pub fn settings(&self) -> TranscodeSettings {
        TranscodeSettings {
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            mp3_codec: self.mp3_codec.clone(),
            log_level: self.log_level.clone(),
        }
    }
}
