//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which starts the full router on a random port
//! with a scripted [`FakeExtractor`] in place of yt-dlp and a shell script in
//! place of ffmpeg.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use tubeforged::config::Config;
use tubeforged::server::{create_router, AppContext};
use tubeforged_av::{extract::is_http_url, Error, InfoExtractor, MediaInfo, Result};

/// What the fake extractor answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Raw extractor JSON, parsed the way the real adapter parses it.
    Info(Value),
    Blocked(String),
    Restricted(String),
    Failed(String),
}

pub struct FakeExtractor {
    reply: Reply,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InfoExtractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn validate_url(&self, url: &str) -> bool {
        is_http_url(url)
    }

    async fn extract(&self, url: &str, _format: &str) -> Result<MediaInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Info(doc) => MediaInfo::from_extractor_json(doc.clone(), url),
            Reply::Blocked(message) => Err(Error::Blocked {
                message: message.clone(),
            }),
            Reply::Restricted(message) => Err(Error::Restricted {
                message: message.clone(),
            }),
            Reply::Failed(message) => Err(Error::tool_failed("yt-dlp", message.clone())),
        }
    }

    async fn version(&self) -> Result<String> {
        Ok("2024.01.01".to_string())
    }
}

/// Stand-in for the ffmpeg binary. Every script variant touches a marker
/// file when started, see [`TestHarness::ffmpeg_invoked`].
#[derive(Debug, Clone, Copy)]
pub enum FakeFfmpeg {
    /// Prints its arguments, one per line, to stdout.
    EchoArgs,
    /// Writes a diagnostic to stderr and exits non-zero without output.
    Fail,
    /// Records its pid and writes to stdout until killed.
    Endless,
    /// Path that does not exist.
    Missing,
}

/// Test harness wrapping a running server.
pub struct TestHarness {
    pub ctx: AppContext,
    pub addr: SocketAddr,
    pub extractor: Arc<FakeExtractor>,
    pub tools: TempDir,
}

impl TestHarness {
    /// Start a server with default configuration.
    pub async fn start(reply: Reply, ffmpeg: FakeFfmpeg) -> Self {
        Self::start_with_config(Config::default(), reply, ffmpeg).await
    }

    /// Start a server with a custom configuration.
    pub async fn start_with_config(config: Config, reply: Reply, ffmpeg: FakeFfmpeg) -> Self {
        let tools = tempfile::tempdir().expect("failed to create tool dir");
        let ffmpeg_path = install_ffmpeg(tools.path(), ffmpeg);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let extractor = Arc::new(FakeExtractor::new(reply));
        let mut ctx = AppContext::new(config, extractor.clone(), &format!("http://{addr}"));
        ctx.ffmpeg = ffmpeg_path;

        let app = create_router(ctx.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            ctx,
            addr,
            extractor,
            tools,
        }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// File the endless fake ffmpeg writes its pid to.
    pub fn pid_file(&self) -> PathBuf {
        pid_file(self.tools.path())
    }

    /// Whether any fake ffmpeg has been started by this server.
    pub fn ffmpeg_invoked(&self) -> bool {
        invoked_marker(self.tools.path()).exists()
    }
}

fn pid_file(dir: &Path) -> PathBuf {
    dir.join("ffmpeg.pid")
}

fn invoked_marker(dir: &Path) -> PathBuf {
    dir.join("ffmpeg.invoked")
}

fn install_ffmpeg(dir: &Path, kind: FakeFfmpeg) -> PathBuf {
    let body = match kind {
        FakeFfmpeg::EchoArgs => "printf '%s\\n' \"$@\"\n".to_string(),
        FakeFfmpeg::Fail => {
            "echo 'Invalid data found when processing input' >&2\nexit 1\n".to_string()
        }
        FakeFfmpeg::Endless => format!(
            "echo $$ > '{}'\nexec yes\n",
            pid_file(dir).display()
        ),
        FakeFfmpeg::Missing => return dir.join("no-such-ffmpeg"),
    };

    let path = dir.join("ffmpeg");
    let script = format!(
        "#!/bin/sh\ntouch '{}'\n{body}",
        invoked_marker(dir).display()
    );
    std::fs::write(&path, script).expect("failed to write fake ffmpeg");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to mark fake ffmpeg executable");
    }

    path
}

/// yt-dlp style document for an audio-only selection.
pub fn audio_doc(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "duration": 212.0,
        "is_live": false,
        "acodec": "aac",
        "vcodec": "none",
        "url": "https://cdn.example/audio.track",
        "formats": [
            { "format_id": "140", "url": "https://cdn.example/audio.track", "acodec": "aac", "vcodec": "none" }
        ]
    })
}

/// yt-dlp style document for a merged video+audio selection.
pub fn merged_doc(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "duration": 60,
        "acodec": "opus",
        "vcodec": "avc1.640028",
        "formats": [],
        "requested_formats": [
            { "format_id": "137", "url": "https://cdn.example/video.track", "acodec": "none", "vcodec": "avc1.640028" },
            { "format_id": "251", "url": "https://cdn.example/audio.track", "acodec": "opus", "vcodec": "none" }
        ]
    })
}
