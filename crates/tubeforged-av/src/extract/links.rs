//! Source URL validation.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Hosts where the video id lives in the `v` query parameter.
const QUERY_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "gaming.youtube.com",
];

/// Path prefixes on youtube.com that carry the id as the next segment.
const ID_PATHS: &[&str] = &["embed", "v", "shorts", "live"];

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("static regex"))
}

fn parse_http(input: &str) -> Option<Url> {
    let url = Url::parse(input.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

/// Whether the input is an absolute http(s) URL.
pub fn is_http_url(input: &str) -> bool {
    parse_http(input).is_some()
}

/// Extract the 11-character video id from a YouTube link.
pub fn youtube_video_id(input: &str) -> Option<String> {
    let url = parse_http(input)?;
    let host = url.host_str()?.to_ascii_lowercase();

    let candidate = if QUERY_HOSTS.contains(&host.as_str()) {
        match url.query_pairs().find(|(k, _)| k == "v") {
            Some((_, v)) => Some(v.into_owned()),
            None => {
                let mut segments = url.path_segments()?;
                match (segments.next(), segments.next()) {
                    (Some(prefix), Some(id)) if ID_PATHS.contains(&prefix) => Some(id.to_string()),
                    _ => None,
                }
            }
        }
    } else if host == "youtu.be" {
        url.path_segments()?.next().map(str::to_string)
    } else {
        None
    };

    candidate.filter(|id| video_id_pattern().is_match(id))
}

/// Whether the input is a YouTube link pointing at a single video.
pub fn is_youtube_url(input: &str) -> bool {
    youtube_video_id(input).is_some()
}
