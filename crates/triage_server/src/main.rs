//! Patient Triage API Server
//!
//! Registration, scheduling and symptom triage over HTTP

use std::path::PathBuf;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;
use triage_server::{ServerConfig, start_server};

const DEFAULT_LOG_FILTER: &str = "triage_server=debug,triage_core=debug,triage_api=debug,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "triage-server", version, about = "Patient Triage & Management API server")]
struct Cli {
    /// Path to a TOML config file; the standard locations are searched otherwise
    #[arg(short, long, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .pretty()
        .init();

    let config = ServerConfig::load(cli.config.as_deref())
        .await
        .into_diagnostic()?;

    start_server(config).await.into_diagnostic()?;

    Ok(())
}
