//! cogni-ai - Classroom insight service
//!
//! Reads a classroom's uploaded notes and chat messages from the shared
//! datastore, asks the configured LLM provider for a study guide or a
//! confusion-pattern summary, and writes the result back as an insight row.
//!
//! Runs either as a one-shot job (`cogni-ai generate <classroom_id>`) or as a
//! small HTTP server (`cogni-ai serve`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use cogni_common::config::ServiceConfig;
use cogni_common::InsightType;
use tokio::signal;
use tracing::{error, info};

use cogni_ai::llm::create_provider;
use cogni_ai::services::{InsightPipeline, ProcessResult};
use cogni_ai::store::PostgrestStore;
use cogni_ai::{build_router, AppState};

/// Command-line arguments for cogni-ai
#[derive(Parser, Debug)]
#[command(name = "cogni-ai")]
#[command(about = "Generates study guides and confusion summaries for ClassroomCogni classrooms")]
#[command(version)]
struct Args {
    /// TOML config file (overrides COGNI_CONFIG and the per-user default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Run as HTTP server (same as the `serve` subcommand)
    #[arg(long, hide = true)]
    server: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate insights for one classroom and exit
    Generate {
        /// Classroom to process
        classroom_id: String,

        /// Regenerate even when the stored insight is current
        #[arg(short, long)]
        force: bool,

        /// Which insight to generate
        #[arg(short, long, value_enum, default_value_t = InsightSelection::StudyGuide)]
        insight: InsightSelection,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InsightSelection {
    StudyGuide,
    Confusion,
    All,
}

impl InsightSelection {
    fn kinds(self) -> Vec<InsightType> {
        match self {
            InsightSelection::StudyGuide => vec![InsightType::StudyGuide],
            InsightSelection::Confusion => vec![InsightType::ConfusionSummary],
            InsightSelection::All => InsightType::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed first so config loading can log; the configured level applies after
    let log_filter = cogni_ai::init_tracing();

    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(log_filter) = &log_filter {
        log_filter.set_level(&config.logging.level);
    }

    info!(
        "Starting ClassroomCogni AI service (cogni-ai) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let command = match (args.command, args.server) {
        (Some(command), _) => command,
        (None, true) => Command::Serve {
            host: None,
            port: None,
        },
        (None, false) => {
            Args::command().print_help()?;
            return Ok(());
        }
    };

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    let store = Arc::new(
        PostgrestStore::from_config(&config.datastore).context("Failed to create datastore client")?,
    );
    let provider = create_provider(&config).context("Failed to create LLM provider")?;
    let pipeline = Arc::new(InsightPipeline::new(store, provider, config.limits.clone())?);

    match command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(&config, pipeline).await
        }
        Command::Generate {
            classroom_id,
            force,
            insight,
        } => {
            let results = pipeline.run(&classroom_id, &insight.kinds(), force).await?;
            report(&results)?;
            if results.iter().any(|r| !r.success) {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Log each result and print them as JSON on stdout
fn report(results: &[ProcessResult]) -> Result<()> {
    for result in results {
        if result.success {
            info!(insight_type = %result.insight_type, "✓ {}", result.message);
        } else {
            error!(insight_type = %result.insight_type, "✗ {}", result.message);
        }
    }
    println!("{}", serde_json::to_string_pretty(results)?);
    Ok(())
}

async fn run_server(config: &ServiceConfig, pipeline: Arc<InsightPipeline>) -> Result<()> {
    let state = AppState::new(pipeline);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.host, config.server.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("AI Provider: {}", config.provider_info());
    info!("Listening on http://{}", addr);
    info!("  GET  /health                  - Health check");
    info!("  POST /generate                - Generate study guide");
    info!("  POST /analyze-confusion       - Generate confusion summary");
    info!("  GET  /insights/:classroom_id  - List stored insights");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
