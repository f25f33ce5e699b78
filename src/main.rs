use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use county_choropleth::pipeline::{self, InteractiveStatus};
use county_choropleth::AppConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join, classify and write the static and interactive maps
    Render {
        /// TOML configuration; built-in defaults when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Print the join and classification report without writing maps
    Check {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            println!("Using config: {:?}", path);
            AppConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {:?}", path))
        }
        None => Ok(AppConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            let app_config = load_config(config.as_deref())?;
            let summary = pipeline::run(&app_config).context("Map generation failed")?;

            match summary.interactive {
                InteractiveStatus::Written(_) => {
                    println!("Done: static and interactive maps written.")
                }
                InteractiveStatus::Skipped(_) => {
                    println!("Done: static map written, interactive map skipped.")
                }
            }
        }
        Commands::Check { config } => {
            let app_config = load_config(config.as_deref())?;
            let prepared = pipeline::prepare(&app_config).context("Failed to prepare map data")?;
            pipeline::report(&prepared);
        }
    }

    Ok(())
}
