//! Warrant CLI - In-process walkthroughs of delegation and revocation
//!
//! Every command spins up a fresh directory, authority and batch facade on a
//! manual clock, runs a short script against them and prints the audit trail.
//!
//! ```bash
//! warrant scenario
//! warrant cascade --children 3 --grants 2
//! warrant batch --grants 5 --json
//! RUST_LOG=debug warrant scenario --expiry
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::prelude::*;
use warrant_types::WarrantConfig;

mod commands;
mod display;

/// Warrant - hierarchical agent delegation with cascading revocation
#[derive(Parser)]
#[command(name = "warrant")]
#[command(version)]
#[command(about = "Walk through master/child delegation, scoped grants and revocation", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// TOML config file (defaults to WARRANT_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the audit trail as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind, grant, execute and revoke for one master and one child
    Scenario {
        /// Also show the grant becoming invalid at its expiry
        #[arg(long)]
        expiry: bool,
    },

    /// Tear down a master with many children and grants
    Cascade {
        /// Number of children
        #[arg(long, default_value = "3")]
        children: usize,

        /// Grants issued to each child
        #[arg(long, default_value = "2")]
        grants: usize,
    },

    /// Revoke a list of grants in one batch, tolerating failures
    Batch {
        /// Grants to issue before the batch
        #[arg(long, default_value = "4")]
        grants: usize,
    },

    /// Print the effective configuration
    Config,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<WarrantConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            WarrantConfig::from_toml_str(&raw)?
        }
        None => WarrantConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    tracing::debug!(?config, "configuration loaded");

    println!("{}", "Warrant".bright_white().bold());

    let world = match cli.command {
        Commands::Scenario { expiry } => commands::scenario::run(&config, expiry).await?,
        Commands::Cascade { children, grants } => commands::cascade::run(&config, children, grants).await?,
        Commands::Batch { grants } => commands::batch::run(&config, grants).await?,
        Commands::Config => {
            display::section("Configuration");
            display::kv("max_batch_size", &config.max_batch_size.to_string());
            display::kv("max_selectors_per_grant", &config.max_selectors_per_grant.to_string());
            display::kv("event_buffer", &config.event_buffer.to_string());
            display::kv(
                "audit_max_entries",
                &config
                    .audit_max_entries
                    .map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
            );
            return Ok(());
        }
    };

    if cli.json {
        println!("{}", world.journal.export_json()?);
    } else {
        display::trail(&world.journal.entries());
    }
    if !world.journal.verify_chain() {
        anyhow::bail!("audit chain failed verification");
    }
    display::success("audit chain verified");
    Ok(())
}
