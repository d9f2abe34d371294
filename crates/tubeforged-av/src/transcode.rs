//! Transcoder planning: which inputs, which output, which ffmpeg arguments.
//!
//! Planning is pure. Spawning the process and streaming its output is the
//! caller's job.

use serde::{Deserialize, Serialize};

use crate::models::{codec_is_none, MediaInfo};

/// What the transcoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// MP3 audio.
    Audio,
    /// Fragmented MP4 with H.264 video and AAC audio.
    Video,
}

impl OutputKind {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputKind::Audio => "audio/mpeg3",
            OutputKind::Video => "video/mp4",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Audio => "mp3",
            OutputKind::Video => "mp4",
        }
    }
}

/// Codec and logging settings for the transcoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub mp3_codec: String,
    pub log_level: String,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            mp3_codec: "libmp3lame".to_string(),
            log_level: "error".to_string(),
        }
    }
}

/// Why a resolved document cannot be transcoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("This endpoint does not support playlists")]
    Playlist,

    #[error("Only video, no audio is not supported")]
    VideoWithoutAudio,

    #[error("No valid input URL found in info response")]
    NoInput,
}

/// A validated transcoder job description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodePlan {
    /// One combined input, or a video input followed by an audio input.
    pub inputs: Vec<String>,
    pub kind: OutputKind,
    /// Title for the download filename, `None` when the source has none.
    pub title: Option<String>,
}

impl TranscodePlan {
    /// Decide how to transcode a resolved document.
    ///
    /// Playlists are rejected. So is video without audio: this never
    /// produces silent video.
    pub fn from_media(info: &MediaInfo) -> Result<Self, PlanError> {
        if info.is_playlist() {
            return Err(PlanError::Playlist);
        }

        let no_audio = codec_is_none(info.acodec.as_deref());
        let no_video = codec_is_none(info.vcodec.as_deref());
        if no_audio && !no_video {
            return Err(PlanError::VideoWithoutAudio);
        }
        let kind = if !no_audio && no_video {
            OutputKind::Audio
        } else {
            OutputKind::Video
        };

        let requested = |i: usize| {
            info.requested_formats
                .get(i)
                .and_then(|f| f.url.as_deref())
                .filter(|u| !u.is_empty())
        };

        let mut inputs = Vec::with_capacity(2);
        match info.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => inputs.push(url.to_string()),
            None => {
                let first = requested(0).ok_or(PlanError::NoInput)?;
                inputs.push(first.to_string());
                if kind == OutputKind::Video {
                    if let Some(second) = requested(1) {
                        inputs.push(second.to_string());
                    }
                }
            }
        }

        let title = Some(info.title.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            inputs,
            kind,
            title,
        })
    }

    /// Download filename with the output extension.
    pub fn filename(&self, fallback: &str) -> String {
        let stem = self.title.as_deref().unwrap_or(fallback);
        format!("{}.{}", stem, self.kind.extension())
    }

    /// Full ffmpeg argument vector, writing the result to stdout.
    pub fn ffmpeg_args(&self, settings: &TranscodeSettings) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-nostdin".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            settings.log_level.clone(),
        ];

        match self.kind {
            OutputKind::Audio => {
                // A stray second input would only be the video half.
                args.push("-i".into());
                args.push(self.inputs[0].clone());
                args.extend([
                    "-acodec".into(),
                    settings.mp3_codec.clone(),
                    "-f".into(),
                    "mp3".into(),
                ]);
            }
            OutputKind::Video => {
                for input in &self.inputs {
                    args.push("-i".into());
                    args.push(input.clone());
                }
                args.extend([
                    "-c:v".into(),
                    settings.video_codec.clone(),
                    "-acodec".into(),
                    settings.audio_codec.clone(),
                    "-movflags".into(),
                    "frag_keyframe+empty_moov".into(),
                    "-f".into(),
                    "mp4".into(),
                ]);
            }
        }

        args.push("-".into());
        args
    }
}
