//! narrate - read a paged text document aloud through a remote TTS service

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use page_narrator::playback::ExternalPlayerSink;
use page_narrator::{
    NarrationSnapshot, Narrator, NarratorConfig, PagedDocument, Phase, segment,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tts_client::{SpeechSynthesizer, get_synthesizer};

#[derive(Parser, Debug)]
#[command(name = "narrate")]
#[command(about = "Read document pages aloud through a text-to-speech service", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a UTF-8 text document (pages separated by form feeds)
    file: Option<PathBuf>,

    /// Page to start on (1-based)
    #[arg(short, long)]
    page: Option<u32>,

    /// Only write audio files, don't start a player
    #[arg(long)]
    no_player: bool,

    /// Directory to keep chunk audio in (default: temporary directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Synthesis endpoint (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print how a page is split into chunks
    Chunks {
        /// Path to the document
        file: PathBuf,

        /// Page to segment (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Soft chunk limit in characters (default from config)
        #[arg(long)]
        max_chunk_size: Option<usize>,

        /// Print chunks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the synthesis endpoint
    SetEndpoint {
        /// URL accepting POST {"text": ...}
        url: String,
    },
    /// Set the per-chunk request timeout
    SetTimeout {
        /// Seconds
        secs: u64,
    },
    /// Set the soft chunk limit
    SetChunkSize {
        /// Characters
        size: usize,
    },
    /// Set the player command (empty to only write files)
    SetPlayer {
        /// Command and arguments; the audio path is appended
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

/// A line typed during an interactive session.
#[derive(Debug, PartialEq, Eq)]
enum KeyCommand {
    PlayPause,
    Next,
    Previous,
    GoTo(u32),
    Stop,
    Dismiss,
    Quit,
    Help,
}

fn parse_key_command(line: &str) -> Option<KeyCommand> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "p" | "play" | "pause" => KeyCommand::PlayPause,
        "n" | "next" => KeyCommand::Next,
        "b" | "back" => KeyCommand::Previous,
        "g" | "go" => KeyCommand::GoTo(parts.next()?.parse().ok()?),
        "s" | "stop" => KeyCommand::Stop,
        "d" | "dismiss" => KeyCommand::Dismiss,
        "q" | "quit" => KeyCommand::Quit,
        "h" | "?" | "help" => KeyCommand::Help,
        _ => return None,
    };
    Some(command)
}

const KEY_HELP: &str = "Commands: p play/pause, n next page, b previous page, g N go to page, \
                        s stop, d dismiss error, q quit";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match &args.command {
        Some(Commands::Config { action }) => {
            return handle_config_command(action);
        }
        Some(Commands::Chunks {
            file,
            page,
            max_chunk_size,
            json,
        }) => {
            return handle_chunks_command(file, *page, *max_chunk_size, *json);
        }
        None => {}
    }

    let file = args
        .file
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Document path is required. Run 'narrate --help' for usage."))?;

    if !file.exists() {
        anyhow::bail!("Document not found: {}", file.display());
    }

    run_interactive(&args, &file).await
}

/// `warn` by default, `debug` with --debug; RUST_LOG wins over both.
fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

async fn run_interactive(args: &Args, file: &Path) -> Result<()> {
    let mut config = NarratorConfig::load().context("Failed to load configuration")?;
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if args.no_player {
        config.player.clear();
    }

    let document = Arc::new(PagedDocument::load(file)?);
    if let Some(page) = args.page {
        if !document.go_to(page) {
            anyhow::bail!(
                "Page {} is out of range (document has {} pages)",
                page,
                document.page_count()
            );
        }
    }

    eprintln!(
        "Document: \"{}\" ({} pages, ~{} words)",
        document.title,
        document.page_count(),
        document.total_words()
    );

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::from(
        get_synthesizer(&config.client_config()).context("Invalid synthesis settings")?,
    );
    let sink = ExternalPlayerSink::from_config(&config).context("Failed to prepare audio output")?;

    if args.debug {
        eprintln!("Endpoint: {}", config.endpoint);
        eprintln!("Synthesizer: {}", synthesizer.name());
        eprintln!("Audio files: {}", sink.output_dir().display());
        eprintln!("Player: {:?}", config.player);
    }

    let narrator = Narrator::builder(document.clone(), synthesizer, Arc::new(sink))
        .with_config(&config)
        .spawn();

    eprintln!("{}", KEY_HELP);

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("#>-"),
    );

    let mut state = narrator.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    render(&pb, &document, &narrator.snapshot());

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                render(&pb, &document, &snapshot);
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match parse_key_command(&line) {
                    Some(KeyCommand::PlayPause) => narrator.play(),
                    Some(KeyCommand::Next) => {
                        if document.next_page() {
                            narrator.cleanup();
                        } else {
                            pb.println("Already on the last page");
                        }
                    }
                    Some(KeyCommand::Previous) => {
                        if document.previous_page() {
                            narrator.cleanup();
                        } else {
                            pb.println("Already on the first page");
                        }
                    }
                    Some(KeyCommand::GoTo(page)) => {
                        if document.go_to(page) {
                            narrator.cleanup();
                        } else {
                            pb.println(format!(
                                "Page {} is out of range (1-{})",
                                page,
                                document.page_count()
                            ));
                        }
                    }
                    Some(KeyCommand::Stop) => narrator.cleanup(),
                    Some(KeyCommand::Dismiss) => narrator.dismiss_error(),
                    Some(KeyCommand::Quit) => break,
                    Some(KeyCommand::Help) => pb.println(KEY_HELP),
                    None => pb.println(format!("Unknown command: {}", line.trim())),
                }
                render(&pb, &document, &narrator.snapshot());
            }
        }
    }

    pb.finish_and_clear();
    narrator.shutdown().await;
    Ok(())
}

fn render(pb: &ProgressBar, document: &PagedDocument, snapshot: &NarrationSnapshot) {
    pb.set_position(u64::from(snapshot.progress_percent));

    let status = match snapshot.phase {
        Phase::Idle => "stopped",
        Phase::Generating => "generating",
        Phase::Playing => "playing",
        Phase::Paused => "paused",
    };
    let mut message = format!(
        "page {}/{} {}",
        document.current_page_number(),
        document.page_count(),
        status
    );
    if let Some(index) = snapshot.chunk_index {
        if snapshot.total_chunks > 0 {
            message.push_str(&format!(" chunk {}/{}", index + 1, snapshot.total_chunks));
        }
    }
    if let Some(error) = &snapshot.error {
        message.push_str(&format!(" | {} (d to dismiss)", error));
    }
    pb.set_message(message);
}

fn handle_chunks_command(
    file: &Path,
    page: u32,
    max_chunk_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = NarratorConfig::load().context("Failed to load configuration")?;
    let document = PagedDocument::load(file)?;
    let text = document.page(page).with_context(|| {
        format!(
            "Page {} is out of range (document has {} pages)",
            page,
            document.page_count()
        )
    })?;

    let max_chunk_size = max_chunk_size.unwrap_or(config.max_chunk_size);
    let chunks = segment(text, page, max_chunk_size);

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
    } else {
        for chunk in &chunks {
            println!("[{}] ({} chars) {}", chunk.index, chunk.char_len(), chunk.text);
        }
        eprintln!("{} chunk(s), limit {} chars", chunks.len(), max_chunk_size);
    }
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = NarratorConfig::load()?;
            println!("Configuration file: {:?}", NarratorConfig::config_path()?);
            println!();
            println!("endpoint = \"{}\"", config.endpoint);
            println!("request_timeout_secs = {}", config.request_timeout_secs);
            println!("max_audio_bytes = {}", config.max_audio_bytes);
            println!("max_chunk_size = {}", config.max_chunk_size);
            println!("cache_capacity = {}", config.cache_capacity);
            println!("cache_expiry_secs = {}", config.cache_expiry_secs);
            if config.player.is_empty() {
                println!("player = (none, files only)");
            } else {
                println!("player = \"{}\"", config.player.join(" "));
            }
            if let Some(dir) = &config.output_dir {
                println!("output_dir = \"{}\"", dir.display());
            } else {
                println!("output_dir = (temporary)");
            }
        }
        ConfigAction::SetEndpoint { url } => {
            let mut config = NarratorConfig::load()?;
            config.endpoint = url.clone();
            config.client_config().validate()?;
            config.save()?;
            println!("Endpoint set to: {}", config.endpoint);
        }
        ConfigAction::SetTimeout { secs } => {
            if *secs == 0 {
                anyhow::bail!("Timeout must be at least 1 second");
            }
            let mut config = NarratorConfig::load()?;
            config.request_timeout_secs = *secs;
            config.save()?;
            println!("Request timeout set to: {}s", secs);
        }
        ConfigAction::SetChunkSize { size } => {
            if *size == 0 {
                anyhow::bail!("Chunk size must be at least 1 character");
            }
            let mut config = NarratorConfig::load()?;
            config.max_chunk_size = *size;
            config.save()?;
            println!("Chunk size set to: {} chars", size);
        }
        ConfigAction::SetPlayer { command } => {
            let mut config = NarratorConfig::load()?;
            config.player = command.clone();
            config.save()?;
            if command.is_empty() {
                println!("Player cleared, audio will only be written to files");
            } else {
                println!("Player set to: {}", command.join(" "));
            }
        }
    }
    Ok(())
}
