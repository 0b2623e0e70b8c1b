use crate::config::{self, Config};
use crate::discovery::StreamFinder;
use crate::miner::ProcessMiner;
use crate::rotation::{RotationSettings, Rotator};
use crate::twitch::{HelixApi, HelixClient, TokenManager};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "dropwatch")]
#[command(about = "dropwatch - rotate a drops miner across live Twitch channels")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable verbose logging (DEBUG level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path of the .env file to load (defaults to the nearest .env)
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the rotation loop (default)
    Run {
        /// Mine this category instead of GAME_ID for this run
        #[arg(long, value_name = "NAME")]
        game: Option<String>,

        /// Skip the interactive category prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Exchange an authorization code for a refresh token and store it
    Auth {
        /// Authorization code from the redirect URL (prompted if omitted)
        #[arg(long, value_name = "CODE")]
        code: Option<String>,
    },
    /// Display version information
    Version,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            game: None,
            yes: false,
        }
    }
}

/// Dispatches the parsed command line
///
/// `env_path` is the env file already loaded by `main`, and the file the
/// `auth` command writes to.
pub fn run(cli: Cli, env_path: &Path) -> Result<()> {
    let verbose = cli.verbose;
    match cli.command.unwrap_or_default() {
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Auth { code } => run_auth(code, env_path),
        Commands::Run { game, yes } => run_rotation(game, yes, verbose),
    }
}

fn print_version() {
    println!("dropwatch {}", env!("CARGO_PKG_VERSION"));
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

fn run_auth(code: Option<String>, env_path: &Path) -> Result<()> {
    let setup = config::load_setup_config()?;
    let client = HelixClient::new(setup.http_timeout_secs)?;
    let authorize_url = client.authorize_url(&setup.credentials.client_id, &setup.redirect_uri)?;

    build_runtime()?.block_on(config::run_auth_setup(
        &client,
        &setup,
        &authorize_url,
        code,
        env_path,
    ))
}

fn run_rotation(game: Option<String>, yes: bool, verbose: bool) -> Result<()> {
    let config = config::load_config()?;
    info!("Starting dropwatch v{}", env!("CARGO_PKG_VERSION"));
    build_runtime()?.block_on(mine(config, game, yes, verbose))
}

/// Builds the process miner; its output is shown only in debug mode
fn build_miner(config: &Config, verbose: bool) -> ProcessMiner {
    ProcessMiner::new(
        config.miner_command.clone(),
        config.username.clone(),
        verbose || config.debug,
    )
}

async fn mine(config: Config, game: Option<String>, yes: bool, verbose: bool) -> Result<()> {
    let api: Arc<dyn HelixApi> = Arc::new(HelixClient::new(config.http_timeout_secs)?);
    let tokens = Arc::new(TokenManager::new(
        api,
        config.credentials.clone(),
        config.refresh_token.clone(),
    ));

    tokens
        .refresh()
        .await
        .context("Could not obtain an access token; run 'dropwatch auth' to renew the refresh token")?;
    info!("Token OK");

    let finder =
        StreamFinder::new(tokens, config.stream_filter()).with_page_limit(config.page_limit);

    let game_name = match game {
        Some(name) => Some(name),
        None if yes => None,
        None => tokio::task::spawn_blocking(config::prompt_game_override)
            .await
            .context("Prompt task failed")??,
    };

    let mut settings = config.rotation_settings();
    if let Some(name) = game_name {
        settings = apply_game_override(&finder, settings, &name).await?;
    }

    let miner = Arc::new(build_miner(&config, verbose));
    debug!(
        miner = %miner.command(),
        output = miner.shows_output(),
        "Miner configured"
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let signal_handle = spawn_signal_handler(shutdown_tx);

    let result = Rotator::new(finder, miner, settings).run(shutdown_rx).await;
    signal_handle.abort();
    result.context("Rotation loop stopped")?;

    info!("dropwatch stopped");
    Ok(())
}

/// Resolves a category name and swaps it into the settings
///
/// An unknown name or a transient lookup failure keeps the configured game.
async fn apply_game_override(
    finder: &StreamFinder,
    settings: RotationSettings,
    name: &str,
) -> Result<RotationSettings> {
    match finder.resolve_game_id(name).await {
        Ok(Some(id)) => {
            info!(game = %name, game_id = %id, "Game changed");
            Ok(settings.with_game_id(id))
        }
        Ok(None) => {
            warn!(game = %name, game_id = %settings.game_id, "Game not found, keeping configured game");
            Ok(settings)
        }
        Err(e) if e.is_fatal() => Err(e).context("Failed to look up game"),
        Err(e) => {
            warn!(game = %name, error = %e, "Game lookup failed, keeping configured game");
            Ok(settings)
        }
    }
}

/// Sends on `shutdown_tx` when SIGINT or SIGTERM arrives
fn spawn_signal_handler(shutdown_tx: mpsc::Sender<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(()).await;
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Failed to install signal handlers, falling back to Ctrl-C");
                wait_for_ctrl_c().await;
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, initiating graceful shutdown...");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, initiating graceful shutdown..."),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
