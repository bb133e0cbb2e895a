use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use repurpose_models::config::RepurposeConfig;
use repurpose_models::request::RepurposingRequest;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "repurpose", about = "Drug repurposing evidence orchestrator")]
struct Cli {
    /// Path to configuration file. Built-in defaults are used when the file is absent.
    #[arg(short, long, default_value = "config/repurpose.toml")]
    config: String,

    /// Read the request JSON from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

fn load_config(path: &str) -> Result<RepurposeConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => toml::from_str(&text).with_context(|| format!("Failed to parse config: {path}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path, "Config file not found, using defaults");
            Ok(RepurposeConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read config: {path}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    // Read request
    let request_json = if let Some(input_path) = &cli.input {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input: {input_path}"))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };

    let request: RepurposingRequest = if request_json.trim().is_empty() {
        RepurposingRequest::default()
    } else {
        serde_json::from_str(&request_json).context("Failed to parse request JSON")?
    };

    let pipeline = repurpose::build_pipeline(&config).context("Failed to build pipeline")?;
    info!(
        agents = ?pipeline.orchestrator().registered_kinds(),
        "Pipeline ready"
    );

    // Ctrl-C cancels the in-flight request
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let report = pipeline
        .analyze(&request, &cancel)
        .await
        .context("Analysis failed")?;

    // Output report as JSON to stdout
    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    Ok(())
}
