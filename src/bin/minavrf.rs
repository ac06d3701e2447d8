//! minavrf CLI
//!
//! Prints the per-slot outcome table for one producer and epoch

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minavrf::tables::WitnessStore;
use minavrf::{AuditConfig, EpochAssembler, EpochResult, IndexerClient, IndexerConfig, Outcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minavrf")]
#[command(about = "Slot outcome analysis for Mina block producers")]
struct Cli {
    /// Indexer GraphQL endpoint
    #[arg(long, env = "MINA_EXPLORER_ENDPOINT", global = true)]
    endpoint: Option<String>,
    /// Ledger snapshot cache directory
    #[arg(long, env = "LEDGER_PATH", global = true)]
    ledger_dir: Option<PathBuf>,
    /// Base URL serving <ledger_hash>.json on a cache miss
    #[arg(long, env = "LEDGER_DOWNLOAD_SOURCE", global = true)]
    ledger_source: Option<String>,
    /// Root directory of <key>/check-epoch-<n> witness files
    #[arg(long, env = "VRF_CHECKED_PATH", global = true)]
    witness_dir: Option<PathBuf>,
    /// Receipt latency (seconds) above which a block counts as late
    #[arg(long, env = "LATE_THRESHOLD_SECS", global = true)]
    late_threshold_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every eligible slot of an epoch
    Epoch {
        #[arg(long)]
        epoch: u32,
        /// Block producer public key
        #[arg(long)]
        key: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dump the parsed witness stream for an epoch
    Witnesses {
        #[arg(long)]
        epoch: u32,
        #[arg(long)]
        key: String,
        /// Include witnesses whose threshold was not met
        #[arg(long)]
        all: bool,
    },
}

impl Cli {
    fn config(&self) -> AuditConfig {
        let mut config = AuditConfig::from_env();
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(dir) = &self.ledger_dir {
            config.ledger_dir = dir.clone();
        }
        if let Some(source) = &self.ledger_source {
            config.ledger_source = Some(source.trim_end_matches('/').to_string());
        }
        if let Some(dir) = &self.witness_dir {
            config.witness_dir = dir.clone();
        }
        if let Some(secs) = self.late_threshold_secs {
            config.late_threshold = Duration::from_secs(secs);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.command {
        Commands::Epoch { epoch, key, json } => {
            let client = IndexerClient::new(IndexerConfig::from_audit_config(&config))
                .context("Failed to create indexer client")?;
            let assembler = EpochAssembler::from_config(client, &config)?;
            let result = assembler
                .assemble(epoch, &key)
                .await
                .with_context(|| format!("Failed to assemble epoch {} for {}", epoch, key))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_report(&result);
            }
        }
        Commands::Witnesses { epoch, key, all } => {
            let store = WitnessStore::new(config.witness_dir.clone());
            let witnesses = store
                .read(&key, epoch, !all)
                .with_context(|| format!("Failed to read witnesses for epoch {}", epoch))?;
            for witness in &witnesses {
                println!("{}", serde_json::to_string(witness)?);
            }
            eprintln!("{} witnesses", witnesses.len());
        }
    }

    Ok(())
}

fn print_report(result: &EpochResult) {
    let data = &result.epoch_data;
    println!("Epoch {} - producer {}", result.epoch, result.producer_key);
    println!("  Ledger: {}", data.ledger_hash);
    println!("  Total currency: {:.0}", data.total_currency);
    println!(
        "  Last canonical slot: {} (global {})",
        data.last_slot, data.last_global_slot
    );
    println!();
    println!(
        "{:>6} {:>8} {:>8} {:<20} {:>9} {:>11} {:<56}",
        "slot", "global", "block", "outcome", "min_bt_m", "next_in_m", "winner_pk"
    );

    for out in &result.rows {
        let row = &out.row;
        println!(
            "{:>6} {:>8} {:>8} {:<20} {:>9.2} {:>11} {:<56}{}",
            row.slot,
            row.global_slot,
            row.block.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string()),
            out.outcome.label(),
            out.min_block_time_minutes(),
            out.next_block_in
                .map(|d| (d.as_secs() / 60).to_string())
                .unwrap_or_else(|| "-".to_string()),
            row.winner_pk,
            if row.super_charged { " *" } else { "" },
        );
    }

    let summary = result.summary();
    println!();
    println!("Summary ({} slots):", summary.total);
    for outcome in Outcome::ALL {
        let count = summary.count(outcome);
        if count > 0 {
            println!("  {:<20} {}", outcome.label(), count);
        }
    }
    println!("\nAssembled in {:.2}s", result.elapsed.as_secs_f64());
}
