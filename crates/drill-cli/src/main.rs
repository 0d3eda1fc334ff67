//! Sentence Drill CLI
//!
//! Runs a practice session either in the terminal or behind the HTTP API.

mod repl;

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use drill_provider::OpenAiProvider;
use drill_session::{
    create_router, AppState, Config, DifficultyTier, EventBroadcaster, FeedbackSkip,
    LoadOutcome, SessionController,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::repl::{describe_skip, render_event, render_slot, render_snapshot, Command, HELP};

/// Sentence Drill - vocabulary practice with generated example sentences
///
/// Pick a word (or let the tier pick one), study ten example sentences, then
/// hide each reference and reproduce it from memory.
#[derive(Parser, Debug)]
#[command(name = "drill")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: drill.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Starting difficulty tier (name or 1-5)
    #[arg(short, long, value_name = "TIER")]
    tier: Option<DifficultyTier>,

    /// Word to load at startup
    #[arg(short, long, value_name = "WORD")]
    word: Option<String>,

    /// Serve the HTTP API instead of the interactive session
    #[arg(short, long)]
    serve: bool,

    /// Port for the HTTP API server
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Credentials may live in a .env file
    let dotenv = dotenvy::dotenv();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to read .env file"),
    }
    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads configuration, builds the session and runs the selected mode.
async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(tier) = args.tier {
        config.default_tier = tier;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    let controller = build_controller(&config);

    if let Some(word) = args.word.as_deref() {
        if controller.provider_available() {
            if let Err(e) = controller.submit_word(word).await {
                eprintln!("{e}");
            }
        }
    }

    if args.serve {
        run_server(config, controller).await
    } else {
        run_interactive(controller).await
    }
}

/// Loads configuration from the given file or the current directory.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    let config = match config_path {
        Some(path) => {
            let path = Path::new(path);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: {}\n\nSuggestion: Check the path or omit --config to use drill.json in the current directory",
                    path.display()
                );
            }
            Config::load_from_file(path)?
        }
        None => Config::load()?,
    };
    tracing::debug!(
        tier = %config.default_tier,
        model = %config.provider.model,
        "Configuration loaded"
    );
    Ok(config)
}

/// Builds the controller, falling back to unavailable mode without
/// credentials.
fn build_controller(config: &Config) -> SessionController {
    let broadcaster = EventBroadcaster::new(config.event_capacity);

    match OpenAiProvider::from_config(&config.provider) {
        Ok(provider) => {
            tracing::info!(
                model = %config.provider.model,
                endpoint = %config.provider.api_endpoint,
                "Content provider ready"
            );
            SessionController::new(Arc::new(provider), config.default_tier)
                .with_broadcaster(broadcaster)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Content provider unavailable");
            eprintln!("{e}");
            eprintln!();
            eprintln!("Running without a content provider: new words cannot be loaded.");
            SessionController::unavailable(config.default_tier).with_broadcaster(broadcaster)
        }
    }
}

// ============================================================================
// Serve mode
// ============================================================================

/// Serves the HTTP API until Ctrl+C.
async fn run_server(config: Config, controller: SessionController) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind HTTP server to {addr}: {e}\n\nSuggestion: Check if port {} is already in use or pass --port",
            config.port
        )
    })?;

    let router = create_router(AppState::new(config, controller));
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    println!("Sentence Drill API listening on http://{addr}");
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    println!();
    println!("Shutting down");
    server_handle.abort();
    Ok(())
}

// ============================================================================
// Interactive mode
// ============================================================================

/// Runs the terminal session until `quit`, end of input or Ctrl+C.
async fn run_interactive(controller: SessionController) -> anyhow::Result<()> {
    let printer = spawn_event_printer(&controller);

    println!("Sentence Drill - type 'help' for commands");
    println!("{}", render_snapshot(&controller.snapshot().await));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => execute(&controller, command).await,
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                }
            }
        }
    }

    printer.abort();
    println!("Goodbye");
    Ok(())
}

/// Prints broadcast events as they arrive.
fn spawn_event_printer(controller: &SessionController) -> tokio::task::JoinHandle<()> {
    let mut events = controller.broadcaster().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(text) = render_event(&event) {
                        println!("{text}");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "Event printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Runs one command.
///
/// Loads and feedback requests run in the background so the prompt stays
/// responsive; their results arrive through the event printer.
async fn execute(controller: &SessionController, command: Command) {
    match command {
        Command::Tier(tier) => spawn_load(controller, Some(tier), None),
        Command::Random => spawn_load(controller, None, None),
        Command::Word(word) => spawn_load(controller, None, Some(word)),
        Command::Show => println!("{}", render_snapshot(&controller.snapshot().await)),
        Command::Toggle(index) => match controller.toggle_practice(index).await {
            Ok(_) => {
                let snapshot = controller.snapshot().await;
                if let Some(slot) = snapshot.slots.get(index) {
                    println!("{}", render_slot(slot));
                }
            }
            Err(e) => println!("{e}"),
        },
        Command::Type(index, text) => match controller.set_practice_text(index, text).await {
            Ok(view) => println!("{}", render_slot(&view)),
            Err(e) => println!("{e}"),
        },
        Command::Feedback(index) => match controller.start_feedback(index).await {
            Ok(Ok(task)) => {
                println!("Asking for feedback on slot {}...", index + 1);
                tokio::spawn(task.run());
            }
            Ok(Err(FeedbackSkip::ProviderUnavailable)) => {
                println!("Feedback is unavailable without a content provider");
            }
            Ok(Err(reason)) => println!("{}", describe_skip(index, reason)),
            Err(e) => println!("{e}"),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

/// Starts a load in the background.
///
/// `tier` selects a random word at that tier, `word` loads a typed word, and
/// neither picks a random word at the current tier.
fn spawn_load(controller: &SessionController, tier: Option<DifficultyTier>, word: Option<String>) {
    if !controller.provider_available() {
        println!("No content provider configured; set the API key and restart.");
        return;
    }

    let controller = controller.clone();
    tokio::spawn(async move {
        let result = match (tier, word) {
            (_, Some(word)) => controller.submit_word(&word).await,
            (Some(tier), None) => controller.select_word(tier).await,
            (None, None) => {
                let tier = controller.snapshot().await.difficulty;
                controller.select_word(tier).await
            }
        };
        match result {
            Ok(LoadOutcome::Ignored) => println!("Type a word to practice"),
            Ok(LoadOutcome::Superseded) => {
                tracing::debug!("Load superseded by a newer request");
            }
            // Success and failure are printed from the event stream
            Ok(LoadOutcome::Loaded { .. }) | Err(_) => {}
        }
    });
}
