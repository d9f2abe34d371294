//! Integration tests for the streaming download route.
//!
//! ffmpeg is replaced by shell scripts, so these only run on Unix.

#![cfg(unix)]

mod common;

use common::{audio_doc, merged_doc, FakeFfmpeg, Reply, TestHarness};
use futures::StreamExt;

const SOURCE: &str = "https://valid.example/watch%3Fid%3Dabc";

fn args_of(body: &str) -> Vec<&str> {
    body.lines().collect()
}

// ---------------------------------------------------------------------------
// Successful streams
// ---------------------------------------------------------------------------

#[tokio::test]
async fn audio_source_streams_mp3() {
    let h = TestHarness::start(Reply::Info(audio_doc("Song")), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg3");
    assert_eq!(
        resp.headers()["content-disposition"],
        r#"attachment; filename="Song.mp3""#
    );
    assert_eq!(resp.headers()["cache-control"], "no-store");

    let body = resp.text().await.unwrap();
    assert_eq!(
        args_of(&body),
        vec![
            "-nostdin",
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "https://cdn.example/audio.track",
            "-acodec",
            "libmp3lame",
            "-f",
            "mp3",
            "-",
        ]
    );
    assert_eq!(h.extractor.calls(), 1);
    assert!(h.ffmpeg_invoked());
}

#[tokio::test]
async fn merged_source_streams_fragmented_mp4() {
    let h = TestHarness::start(Reply::Info(merged_doc("Clip")), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}&f=bestvideo+bestaudio")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
    assert_eq!(
        resp.headers()["content-disposition"],
        r#"attachment; filename="Clip.mp4""#
    );

    let body = resp.text().await.unwrap();
    let args = args_of(&body);
    let inputs: Vec<&str> = args
        .windows(2)
        .filter(|w| w[0] == "-i")
        .map(|w| w[1])
        .collect();
    assert_eq!(
        inputs,
        vec!["https://cdn.example/video.track", "https://cdn.example/audio.track"]
    );
    assert!(args.contains(&"frag_keyframe+empty_moov"));
    assert!(args.contains(&"libx264"));
    assert_eq!(args.last(), Some(&"-"));
}

#[tokio::test]
async fn untitled_source_uses_fallback_filename() {
    let mut doc = audio_doc("");
    doc["title"] = serde_json::json!("   ");
    let h = TestHarness::start(Reply::Info(doc), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-disposition"],
        r#"attachment; filename="download.mp3""#
    );
}

#[tokio::test]
async fn api_prefix_serves_downloads() {
    let h = TestHarness::start(Reply::Info(audio_doc("Song")), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/api/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg3");
}

// ---------------------------------------------------------------------------
// Rejections before any process starts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_url_is_rejected_without_downstream_calls() {
    let h = TestHarness::start(Reply::Info(audio_doc("Song")), FakeFfmpeg::EchoArgs).await;

    for path in ["/download", "/download?url=", "/download?url=%20%20"] {
        let resp = reqwest::get(h.url(path)).await.unwrap();
        assert_eq!(resp.status(), 400, "{path}");
        assert_eq!(
            resp.text().await.unwrap(),
            "URL parameter is required and cannot be empty"
        );
    }
    assert_eq!(h.extractor.calls(), 0);
    assert!(!h.ffmpeg_invoked());
}

#[tokio::test]
async fn non_http_url_is_rejected_without_downstream_calls() {
    let h = TestHarness::start(Reply::Info(audio_doc("Song")), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url("/download?url=ftp://files.example/a"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.headers()["cache-control"].to_str().unwrap(),
        "no-store, max-age=0"
    );
    assert_eq!(h.extractor.calls(), 0);
}

#[tokio::test]
async fn playlist_is_rejected() {
    let doc = serde_json::json!({
        "title": "Mix",
        "entries": [{ "id": "a" }, { "id": "b" }]
    });
    let h = TestHarness::start(Reply::Info(doc), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.text().await.unwrap(),
        "This endpoint does not support playlists"
    );
    assert_eq!(h.extractor.calls(), 1);
    assert!(!h.ffmpeg_invoked());
}

#[tokio::test]
async fn video_without_audio_is_rejected() {
    let doc = serde_json::json!({
        "title": "Silent",
        "acodec": "none",
        "vcodec": "avc1",
        "url": "https://cdn.example/video.track",
        "formats": []
    });
    let h = TestHarness::start(Reply::Info(doc), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.text().await.unwrap(),
        "Only video, no audio is not supported"
    );
    assert_eq!(h.extractor.calls(), 1);
    assert!(!h.ffmpeg_invoked());
}

#[tokio::test]
async fn missing_input_is_rejected() {
    let doc = serde_json::json!({
        "title": "Nothing",
        "acodec": "aac",
        "vcodec": "none",
        "formats": []
    });
    let h = TestHarness::start(Reply::Info(doc), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(
        resp.text().await.unwrap(),
        "No valid input URL found in info response"
    );
    assert_eq!(h.extractor.calls(), 1);
    assert!(!h.ffmpeg_invoked());
}

#[tokio::test]
async fn resolver_failure_is_forwarded() {
    let h = TestHarness::start(Reply::Blocked("HTTP Error 403".into()), FakeFfmpeg::EchoArgs).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let text = resp.text().await.unwrap();
    assert!(text.starts_with("Info fetch failed: "), "{text}");
    assert!(text.contains("Access blocked by YouTube"), "{text}");
}

// ---------------------------------------------------------------------------
// Transcoder failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transcoder_failure_before_output_is_500() {
    let h = TestHarness::start(Reply::Info(audio_doc("Song")), FakeFfmpeg::Fail).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let text = resp.text().await.unwrap();
    assert!(text.starts_with("FFmpeg error: "), "{text}");
    assert!(text.contains("Invalid data found"), "{text}");
}

#[tokio::test]
async fn missing_transcoder_is_500() {
    let h = TestHarness::start(Reply::Info(audio_doc("Song")), FakeFfmpeg::Missing).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.text().await.unwrap().starts_with("FFmpeg error: "));
}

// ---------------------------------------------------------------------------
// Client disconnect
// ---------------------------------------------------------------------------

/// True once the process is gone or only a zombie is left.
#[cfg(target_os = "linux")]
fn process_finished(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Err(_) => true,
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .is_some_and(|state| state == "Z" || state == "X"),
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn client_disconnect_kills_transcoder() {
    let h = TestHarness::start(Reply::Info(audio_doc("Song")), FakeFfmpeg::Endless).await;

    let resp = reqwest::get(h.url(&format!("/download?url={SOURCE}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let mut body = resp.bytes_stream();
    let chunk = body.next().await.unwrap().unwrap();
    assert!(!chunk.is_empty());

    let pid: u32 = std::fs::read_to_string(h.pid_file())
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(!process_finished(pid));

    drop(body);

    let mut finished = false;
    for _ in 0..100 {
        if process_finished(pid) {
            finished = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(finished, "transcoder {pid} still running after disconnect");
}
