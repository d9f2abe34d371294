mod cli;

use tubeforged::{config, server};
use tubeforged_av::{check_tools as probe_tools, resolve_tool_path, InfoExtractor, YtDlpExtractor};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting Tubeforged server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose mode: trace for tubeforged, debug for HTTP
            "tubeforged=trace,tubeforged_av=trace,tower_http=debug".to_string()
        } else {
            // Normal mode: debug for tubeforged crates, info for HTTP requests
            "tubeforged=debug,tubeforged_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Resolve { url, format, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resolve_url(&url, format, json, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("tubeforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn resolve_url(
    url: &str,
    format: Option<String>,
    json: bool,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let ytdlp = resolve_tool_path("yt-dlp", config.tools.ytdlp_path.as_deref());
    let extractor = YtDlpExtractor::new(ytdlp, config.extractor.ytdlp_options());

    if !extractor.validate_url(url) {
        anyhow::bail!("Not a supported URL: {}", url);
    }

    let format = format
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| config.extractor.default_format.clone());

    tracing::info!("Resolving {} with format {}", url, format);
    let info = extractor.extract(url, &format).await?;

    if json {
        let json_str = serde_json::to_string_pretty(&info)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("Title: {}", info.title);
    if let Some(ref uploader) = info.uploader {
        println!("Uploader: {}", uploader);
    }
    if let Some(secs) = info.duration_seconds {
        let secs = secs.round() as u64;
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    if info.is_live {
        println!("Live: yes");
    }
    if info.is_playlist() {
        let count = info.entries.as_ref().map_or(0, Vec::len);
        println!("Playlist with {} entries", count);
        return Ok(());
    }

    println!(
        "Codecs: audio={} video={}",
        info.acodec.as_deref().unwrap_or("?"),
        info.vcodec.as_deref().unwrap_or("?")
    );
    println!("Formats available: {}", info.formats.len());

    if let Some(ref direct) = info.url {
        println!("\nStream: {}", direct);
    }
    for (i, selected) in info.requested_formats.iter().enumerate() {
        println!(
            "\n[{}] {} ({:?})",
            i,
            selected.format_id.as_deref().unwrap_or("?"),
            selected.kind()
        );
        if let Some(ref u) = selected.url {
            println!("    {}", u);
        }
    }

    Ok(())
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = probe_tools(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ytdlp_path.as_deref(),
    );
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg and yt-dlp or set their paths in [tools].");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            if let Some(ref url) = config.server.self_url {
                println!("  Self URL: {}", url);
            }
            println!("  Default format: {}", config.extractor.default_format);
            println!("  Extractor timeout: {}s", config.extractor.timeout_secs);
            println!(
                "  Codecs: video={} audio={} mp3={}",
                config.transcode.video_codec,
                config.transcode.audio_codec,
                config.transcode.mp3_codec
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
