pub mod api;
pub mod app;
pub mod channel;
pub mod cli;
pub mod command;
pub mod config;
pub mod event;
pub mod feed;
pub mod richtext;
pub mod store;
pub mod ui;

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use app::App;
use clap::Parser;
use cli::{Cli, CliCommand};
use config::{AppConfig, load_config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let initial_query = cli.initial_query();

    match cli.command {
        // No subcommand or explicit `tui` → launch the interactive TUI.
        None | Some(CliCommand::Tui) => run_tui(initial_query).await,
        // All other subcommands → non-interactive JSONL output.
        Some(cmd) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
            cli::run_command(cmd).await
        }
    }
}

/// The terminal owns stdout/stderr while the TUI runs, so logs go to a file,
/// and only when `RUST_LOG` is set.
fn init_tui_tracing(config: &AppConfig) -> color_eyre::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let Some(path) = config.log_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Launch the interactive TUI.
async fn run_tui(initial_query: Option<String>) -> color_eyre::Result<()> {
    let config = load_config();
    init_tui_tracing(&config)?;

    let client = api::LucerneClient::new(&config.server_url);
    tracing::info!(server = %client.base_url(), "starting");

    let terminal = ratatui::init();
    let result = App::new(config, client, initial_query).run(terminal).await;
    ratatui::restore();
    result
}
