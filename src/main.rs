//! Poker Tally - Unified CLI
//!
//! Ledger server plus maintenance commands.

#![warn(missing_docs)]

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use poker_tally::{Backend, LedgerApi, LedgerService, ServerConfig, report};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,poker_tally=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            db_path,
            backend,
            config,
        } => {
            let config = load_config(config)?.with_overrides(host, port, db_path, backend);
            run_http_server(config).await
        }
        Command::Provision { db_path } => {
            let config =
                load_config(None)?.with_overrides(None, None, db_path, Some(Backend::Sqlite));
            run_provision(config)
        }
        Command::Report { player, db_path } => {
            let config =
                load_config(None)?.with_overrides(None, None, db_path, Some(Backend::Sqlite));
            run_report(config, &player)
        }
    }
}

/// Builds configuration from an optional file plus the environment.
#[instrument]
fn load_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    let base = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    Ok(base.with_env(|key| std::env::var(key).ok())?)
}

/// Run the HTTP ledger server
#[instrument(skip(config), fields(host = %config.host(), port = config.port()))]
async fn run_http_server(config: ServerConfig) -> Result<()> {
    info!(backend = ?config.backend(), db_path = %config.db_path(), "Starting Poker Tally server");

    let service = LedgerService::new(config.open_store()?);

    // Provision before accepting traffic
    let svc = service.clone();
    let outcome = tokio::task::spawn_blocking(move || svc.provision()).await??;
    info!(%outcome, "Storage ready");

    let app = LedgerApi::new(service).router();

    let listener =
        tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!("Server ready at http://{}:{}/", config.host(), config.port());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Provision the database and exit
#[instrument(skip(config), fields(db_path = %config.db_path()))]
fn run_provision(config: ServerConfig) -> Result<()> {
    let service = LedgerService::new(config.open_store()?);
    let outcome = service.provision()?;
    println!("Schema {} in {}", outcome, config.db_path());
    Ok(())
}

/// Print a player's report
#[instrument(skip(config), fields(db_path = %config.db_path()))]
fn run_report(config: ServerConfig, player: &str) -> Result<()> {
    let service = LedgerService::new(config.open_store()?);
    service.provision()?;

    let stats = service.stats(player);
    let records = service.records(player);
    print!("{}", report::render_report(player, stats.as_ref(), &records));
    Ok(())
}
