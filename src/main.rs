//! breather - a work/rest interval timer
//!
//! Alternates a working interval with a short resting interval so you
//! remember to look away from the screen:
//! - 20 minutes of work
//! - 20 seconds of rest
//! - optional automatic cycling

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use breather::cli::{Cli, Commands, Display, IpcClient};
use breather::daemon::{default_socket_path, run_daemon};
use breather::settings::{default_settings_path, SettingsStore};

/// Refresh interval for `status --watch`.
const WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, matches!(cli.command, Some(Commands::Daemon)));

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins when set; otherwise the daemon and `--verbose` log at info.
fn init_tracing(verbose: bool, daemon: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose || daemon { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let socket = cli.socket;

    match cli.command {
        Some(Commands::Start) => {
            let response = client(socket)?.start().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Rest) => {
            let response = client(socket)?.rest().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Pause) => {
            let response = client(socket)?.pause().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Resume) => {
            let response = client(socket)?.resume().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Skip { generation }) => {
            let response = client(socket)?.skip(generation).await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Reset) => {
            let response = client(socket)?.reset().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Status { watch: false }) => {
            let response = client(socket)?.status().await?;
            Display::show_status(&response);
        }
        Some(Commands::Status { watch: true }) => {
            watch_status(&client(socket)?).await?;
        }
        Some(Commands::Settings) => {
            let response = client(socket)?.settings().await?;
            Display::show_settings(&response);
        }
        Some(Commands::Configure(args)) => {
            let patch = args.to_patch();
            if patch.is_empty() {
                anyhow::bail!("Nothing to change. See 'breather configure --help'");
            }
            let response = client(socket)?.configure(patch).await?;
            Display::show_settings(&response);
        }
        Some(Commands::Daemon) => {
            let socket = match socket {
                Some(path) => path,
                None => default_socket_path()?,
            };
            let store = SettingsStore::load(default_settings_path()?)?;
            run_daemon(&socket, Arc::new(store)).await?;
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Builds a client for the given socket, or the default one.
fn client(socket: Option<PathBuf>) -> Result<IpcClient> {
    match socket {
        Some(path) => Ok(IpcClient::with_socket_path(path)),
        None => IpcClient::new(),
    }
}

/// Redraws the status line once per second until Ctrl-C.
async fn watch_status(client: &IpcClient) -> Result<()> {
    let mut interval = tokio::time::interval(WATCH_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let response = client.status().await?;
                if let Some(snapshot) = response.snapshot() {
                    Display::show_status_inline(snapshot);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
