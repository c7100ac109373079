//! Camcycle slideshow daemon — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use camcycle::acquire::FeedAcquirer;

use camcycle_daemon::config::Config;
use camcycle_daemon::events::SlideshowEvent;
use camcycle_daemon::state::SharedState;
use camcycle_daemon::{rest, tasks};

#[derive(Parser)]
#[command(
    name = "camcycle-daemon",
    about = "Camcycle — timed camera slideshow with a REST/SSE control surface",
    version
)]
struct Cli {
    /// Feed source URL; may be repeated, tried in order.
    #[arg(short, long = "source")]
    sources: Vec<String>,

    /// Port for the REST/SSE surface.
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the slideshow daemon (default).
    Serve,

    /// Fetch and parse the feed once, then print the camera list.
    Check {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env();
    if !cli.sources.is_empty() {
        config.sources = cli.sources.clone();
    }
    if let Some(port) = cli.port {
        config.http_port = port;
    }

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Check { json }) => check(config, json).await,
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "camcycle-daemon", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Run the slideshow: acquire an initial list, start the periodic tasks, and
/// serve the REST/SSE surface until interrupted.
async fn serve(config: Config) -> anyhow::Result<()> {
    anyhow::ensure!(
        !config.sources.is_empty(),
        "no feed sources configured; pass --source or set CAMCYCLE_SOURCES"
    );

    tracing::info!("starting camcycle-daemon v{}", env!("CARGO_PKG_VERSION"));

    let acquirer = FeedAcquirer::with_timeout(config.sources.clone(), config.fetch_timeout);

    // The feed being down at boot is not fatal: keep retrying with a fixed
    // delay until a list arrives, then never go below it again (a failed
    // hourly refresh keeps the previous list).
    let initial = loop {
        match acquirer.acquire(&config.defaults).await {
            Ok(list) => break list,
            Err(e) => {
                tracing::error!(
                    "startup acquisition failed: {e}; retrying in {}s",
                    config.startup_retry_delay.as_secs()
                );
                tokio::time::sleep(config.startup_retry_delay).await;
            }
        }
    };
    tracing::info!("initial camera list: {} active cameras", initial.len());

    let camera_count = initial.len();
    let state = SharedState::new(config, acquirer, initial);
    state.events.emit(SlideshowEvent::DaemonStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
        camera_count,
    });

    tasks::start_all(&state).await;

    let port = state.config.http_port;
    tokio::select! {
        result = rest::start(port, Arc::clone(&state)) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            tasks::stop_all(&state).await;
        }
    }

    Ok(())
}

/// One-shot acquisition for debugging a feed.
async fn check(config: Config, json: bool) -> anyhow::Result<()> {
    anyhow::ensure!(
        !config.sources.is_empty(),
        "no feed sources configured; pass --source or set CAMCYCLE_SOURCES"
    );

    let acquirer = FeedAcquirer::with_timeout(config.sources.clone(), config.fetch_timeout);
    let list = acquirer.acquire(&config.defaults).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(list.records())?);
    } else {
        println!("{} active camera(s):", list.len());
        for (index, camera) in list.iter().enumerate() {
            println!(
                "  {index:>3}  {}  {} ({})",
                camera.id, camera.title, camera.owner
            );
        }
    }

    Ok(())
}
