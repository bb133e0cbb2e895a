use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use repurpose_loader::config::LoaderConfig;
use repurpose_loader::import::run_import;
use repurpose_loader::writer::SqliteWriter;

#[derive(Parser, Debug)]
#[command(
    name = "repurpose-loader",
    about = "Builds the reference SQLite store from a medicine dataset CSV and an optional evidence seed file"
)]
struct Cli {
    /// Path to loader configuration file
    #[arg(short, long, default_value = "config/repurpose-loader.toml")]
    config: String,

    /// Override the dataset CSV path from the config
    #[arg(long)]
    csv: Option<String>,

    /// Override the evidence seed path from the config
    #[arg(long)]
    evidence: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let mut config: LoaderConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse loader config")?;
    if let Some(csv) = cli.csv {
        config.dataset.csv_path = csv;
    }
    if let Some(evidence) = cli.evidence {
        config.dataset.evidence_path = Some(evidence);
    }

    let mut writer = SqliteWriter::open(&config.reference.sqlite_path).with_context(|| {
        format!(
            "Failed to open reference DB: {}",
            config.reference.sqlite_path
        )
    })?;

    let summary = run_import(&config, &mut writer).context("Import failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
