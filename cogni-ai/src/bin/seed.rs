//! cogni-seed - Insert sample notes and chat messages into a classroom
//!
//! Usage: `cogni-seed <classroom_id> <user_id>`
//!
//! Only datastore credentials are required; no LLM key is needed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cogni_common::config::ServiceConfig;
use tracing::{error, info};

use cogni_ai::seed::seed_classroom;
use cogni_ai::store::PostgrestStore;

/// Command-line arguments for cogni-seed
#[derive(Parser, Debug)]
#[command(name = "cogni-seed")]
#[command(about = "Seed a ClassroomCogni classroom with sample biology notes and messages")]
#[command(version)]
struct Args {
    /// Classroom to seed (copy from the datastore dashboard)
    classroom_id: String,

    /// User recorded as the author of the sample rows
    user_id: String,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = cogni_ai::init_tracing();

    let config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(log_filter) = &log_filter {
        log_filter.set_level(&config.logging.level);
    }

    if let Err(e) = config.validate_datastore() {
        error!("{}", e);
        std::process::exit(1);
    }

    let store = PostgrestStore::from_config(&config.datastore)
        .context("Failed to create datastore client")?;

    let summary = seed_classroom(&store, &args.classroom_id, &args.user_id).await?;

    info!(
        uploads = summary.uploads,
        messages = summary.messages,
        "Test data seeded successfully"
    );
    info!("Now run: cogni-ai generate {} --insight all", args.classroom_id);
    Ok(())
}
