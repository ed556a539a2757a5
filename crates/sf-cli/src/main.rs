use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sf_cli::commands::{metrics, record, registry, seed, status};
use sf_cli::{Cli, Commands, Config, RegistryAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(sf_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = sf_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut out = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut out, &db, &config)?;
        }
        Some(Commands::Metrics { json, since, until }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let options = metrics::MetricsOptions {
                json: *json,
                since: since.as_deref(),
                until: until.as_deref(),
            };
            metrics::run(&mut out, &db, &config.metrics(), &options)?;
        }
        Some(Commands::Record {
            worker,
            station,
            event_type,
            at,
            confidence,
            count,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let args = record::RecordArgs {
                worker,
                station,
                event_type: *event_type,
                at: at.as_deref(),
                confidence: *confidence,
                count: *count,
            };
            record::run(&mut out, &mut db, &args)?;
        }
        Some(Commands::Seed { seed: rng_seed }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            seed::run(&mut out, &mut db, *rng_seed)?;
        }
        Some(Commands::Workers(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                RegistryAction::Add { id, label } => {
                    registry::add_worker(&mut out, &mut db, id, label)?;
                }
                RegistryAction::List { json } => registry::list_workers(&mut out, &db, *json)?,
            }
        }
        Some(Commands::Stations(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                RegistryAction::Add { id, label } => {
                    registry::add_workstation(&mut out, &mut db, id, label)?;
                }
                RegistryAction::List { json } => {
                    registry::list_workstations(&mut out, &db, *json)?;
                }
            }
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    Ok(())
}
