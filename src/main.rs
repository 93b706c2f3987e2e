// Copyright 2026 Matchup Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::{info, warn};

use matchup::analyzer::Analyzer;
use matchup::config::AppConfig;
use matchup::events::{AnalysisEvent, EventBus};
use matchup::export;
use matchup::job::JobStore;
use matchup::renderer::chromium::ChromiumBrowser;
use matchup::renderer::{Browser, NoopBrowser};
use matchup::rest::{self, AppState};

#[derive(Parser)]
#[command(
    name = "matchup",
    about = "Matchup — side-by-side feature comparison of competitor websites",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on (default 7800, or MATCHUP_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one comparison and print the result
    Analyze {
        /// First site base URL
        url_a: String,
        /// Second site base URL
        url_b: String,
        /// Output format (json, csv)
        #[arg(long, default_value = "json")]
        format: String,
        /// Per-page navigation timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve { port } => serve(port).await,
        Commands::Analyze {
            url_a,
            url_b,
            format,
            timeout,
        } => analyze_once(&url_a, &url_b, &format, timeout).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "matchup", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "matchup=debug" } else { "matchup=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default.parse().expect("static directive parses")),
        )
        .init();
}

async fn serve(port: Option<u16>) -> Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(p) = port {
        config.port = p;
    }
    config
        .ensure_dirs()
        .context("failed to create data directories")?;

    // Without Chromium the server still comes up; jobs fail with a session
    // acquisition error instead of crashing the process.
    let browser: Arc<dyn Browser> = match ChromiumBrowser::launch(config.viewport).await {
        Ok(b) => Arc::new(b),
        Err(e) => {
            warn!("Chromium unavailable ({e:#}); jobs will fail until it is installed");
            Arc::new(NoopBrowser)
        }
    };

    let events = EventBus::new(256);
    let analyzer = Arc::new(Analyzer::new(Arc::clone(&browser), &config, events.clone()));
    let state = Arc::new(AppState {
        store: Arc::new(JobStore::new()),
        analyzer,
        events: events.clone(),
        started_at: Instant::now(),
        config: config.clone(),
    });

    info!("starting matchup v{}", env!("CARGO_PKG_VERSION"));
    events.emit(AnalysisEvent::ServerStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: config.port,
    });

    rest::start(config.port, state).await
}

async fn analyze_once(
    url_a: &str,
    url_b: &str,
    format: &str,
    timeout: Option<u64>,
) -> Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(t) = timeout {
        config.nav_timeout_ms = t;
    }
    config
        .ensure_dirs()
        .context("failed to create data directories")?;

    let browser: Arc<dyn Browser> = Arc::new(
        ChromiumBrowser::launch(config.viewport)
            .await
            .context("a one-shot analysis needs Chromium")?,
    );

    let events = EventBus::new(256);
    let analyzer = Analyzer::new(Arc::clone(&browser), &config, events);
    let result = analyzer.analyze("cli", url_a, url_b).await?;

    match format {
        "csv" => print!("{}", export::matrix_csv(&result)),
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        other => anyhow::bail!("unknown output format '{other}' (expected json or csv)"),
    }

    browser.shutdown().await?;
    Ok(())
}
