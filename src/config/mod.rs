mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./tubeforged.toml",
        "~/.config/tubeforged/config.toml",
        "/etc/tubeforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if let Some(ref url) = config.server.self_url {
        if !tubeforged_av::extract::is_http_url(url) {
            anyhow::bail!("server.self_url must be an http(s) URL, got '{}'", url);
        }
    }

    for path in [&config.tools.ffmpeg_path, &config.tools.ytdlp_path]
        .into_iter()
        .flatten()
    {
        if !path.exists() {
            tracing::warn!("Configured tool path does not exist: {:?}", path);
        }
    }

    if config.extractor.default_format.trim().is_empty() {
        anyhow::bail!("extractor.default_format cannot be empty");
    }
    if config.extractor.timeout_secs == 0 {
        anyhow::bail!("extractor.timeout_secs cannot be 0");
    }

    let t = &config.transcode;
    for (name, value) in [
        ("video_codec", &t.video_codec),
        ("audio_codec", &t.audio_codec),
        ("mp3_codec", &t.mp3_codec),
        ("log_level", &t.log_level),
        ("fallback_filename", &t.fallback_filename),
    ] {
        if value.trim().is_empty() {
            anyhow::bail!("transcode.{} cannot be empty", name);
        }
    }

    Ok(())
}
