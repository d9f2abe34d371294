//! Metadata types shared by the extractor and the download orchestrator.
//!
//! The same [`MediaInfo`] type reads raw `yt-dlp -J` output and the
//! normalized document served by the info endpoint: serde aliases accept the
//! tool's key names while serialization uses the public ones.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Codec marker the extractor uses for "this stream is absent".
pub const NO_CODEC: &str = "none";

/// Whether a codec field says the stream is absent.
///
/// A missing field is not the same as `"none"`: only an explicit marker
/// counts as absent.
pub fn codec_is_none(codec: Option<&str>) -> bool {
    codec == Some(NO_CODEC)
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A thumbnail image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Audio/video composition of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    AudioOnly,
    VideoOnly,
    Combined,
}

/// One downloadable rendition of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acodec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcodec: Option<String>,
    /// Extractor-specific fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Format {
    pub fn kind(&self) -> FormatKind {
        let no_audio = codec_is_none(self.acodec.as_deref());
        let no_video = codec_is_none(self.vcodec.as_deref());
        match (no_audio, no_video) {
            (false, true) => FormatKind::AudioOnly,
            (true, false) => FormatKind::VideoOnly,
            _ => FormatKind::Combined,
        }
    }
}

/// Normalized metadata for one source URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(rename = "lengthSeconds", alias = "duration", default)]
    pub duration_seconds: Option<f64>,
    #[serde(
        rename = "isLive",
        alias = "is_live",
        default,
        deserialize_with = "null_as_default"
    )]
    pub is_live: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<Format>,

    // What the extractor picked for the requested format selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acodec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcodec: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub requested_formats: Vec<Format>,

    /// Present when the source URL is a playlist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<Value>>,
}

impl MediaInfo {
    /// Build from raw extractor JSON, rejecting documents without the core
    /// fields instead of passing a partial result on.
    pub fn from_extractor_json(value: Value, source_url: &str) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::malformed("extractor output is not a JSON object"))?;

        if !obj.get("title").is_some_and(Value::is_string) {
            return Err(Error::malformed("missing title"));
        }
        let has_formats = obj.get("formats").is_some_and(Value::is_array);
        let has_entries = obj.get("entries").is_some_and(Value::is_array);
        if !has_formats && !has_entries {
            return Err(Error::malformed("missing formats"));
        }

        let mut info: MediaInfo =
            serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string()))?;
        if info.webpage_url.is_none() {
            info.webpage_url = Some(source_url.to_string());
        }
        Ok(info)
    }

    pub fn is_playlist(&self) -> bool {
        self.entries.is_some()
    }
}
