//! problemdeck CLI: export the problem-statement PDF and inspect the result.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use problemdeck::{ContentRecord, Countdown, DeckConfig, ProblemDeck, inspect_pdf_path};

#[derive(Parser)]
#[command(name = "problemdeck")]
#[command(author, version, about = "Problem-statement handout renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the problem statements to PDF
    Export {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// JSON array of records to render instead of the bundled catalog
        #[arg(long)]
        records: Option<PathBuf>,

        /// Skip the page background pattern
        #[arg(long)]
        no_background: bool,
    },

    /// Print a JSON summary of a PDF file
    Inspect {
        file: PathBuf,
    },

    /// Print the bundled catalog as JSON
    Catalog,

    /// Show the time left until the submission deadline
    Countdown {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Export {
            config,
            out,
            records,
            no_background,
        } => cmd_export(config.as_deref(), &out, records.as_deref(), no_background),
        Commands::Inspect { file } => cmd_inspect(&file),
        Commands::Catalog => cmd_catalog(),
        Commands::Countdown { config } => cmd_countdown(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<DeckConfig> {
    match path {
        Some(path) => DeckConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(DeckConfig::default()),
    }
}

fn load_records(path: &Path) -> Result<Vec<ContentRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse records: {}", path.display()))
}

fn cmd_export(
    config: Option<&Path>,
    out: &Path,
    records: Option<&Path>,
    no_background: bool,
) -> Result<()> {
    let mut builder = ProblemDeck::builder()
        .config(load_config(config)?)
        .background(!no_background);
    if let Some(path) = records {
        builder = builder.records(load_records(path)?);
    }
    let deck = builder.build().context("Invalid deck setup")?;
    let path = deck
        .export(out)
        .context("Failed to generate PDF. Please try again.")?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
    let report = inspect_pdf_path(file)
        .with_context(|| format!("Failed to inspect PDF: {}", file.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn catalog_document() -> serde_json::Value {
    serde_json::json!({
        "catalog": problemdeck_catalog::catalog_json(),
        "categories": problemdeck_catalog::categories(),
        "fingerprint_sha256": problemdeck_catalog::catalog_fingerprint_sha256(),
    })
}

fn cmd_catalog() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&catalog_document())?);
    Ok(())
}

fn cmd_countdown(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let countdown = Countdown::new(config.deadline()?);
    let left = countdown.time_left(SystemTime::now());
    if left.is_zero() {
        println!("Submissions closed");
    } else {
        println!("{left}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_document_lists_categories_in_order() {
        let doc = catalog_document();
        let categories = doc["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 20);
        assert_eq!(categories[0], "Healthcare");
        assert_eq!(doc["catalog"]["count"], 20);
        assert_eq!(doc["fingerprint_sha256"].as_str().unwrap().len(), 64);
    }
}
