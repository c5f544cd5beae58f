mod config;
mod data;
mod download;
mod error;
mod features;
mod merge;
mod model;
mod pipeline;
mod schema;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};

use config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use features::SaleQuery;

#[derive(Parser)]
#[command(name = "steam-sale")]
#[command(about = "Merge Steam catalogs and predict which games go on sale", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline settings (TOML); defaults apply when the file is absent
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the raw catalogs and write the merged, cleaned table
    Prepare {
        /// Download even if both CSVs are already present
        #[arg(long, conflicts_with = "skip_download")]
        force_download: bool,

        /// Use the CSVs already in the download directory
        #[arg(long)]
        skip_download: bool,
    },

    /// Train the sale classifier and save the model
    Train {
        /// Sales table to train on (defaults to the configured one)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Do not add never-discounted catalog rows as negatives
        #[arg(long)]
        no_augment: bool,
    },

    /// Predict the chance that a game goes on sale soon
    Predict {
        /// Current price
        #[arg(long)]
        price: f64,

        /// Review score in percent
        #[arg(long)]
        rating: f64,

        /// Years since release
        #[arg(long)]
        age: f64,

        /// The current price is a new historical low
        #[arg(long)]
        new_low: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load(&cli.config)?;

    match cli.command {
        Commands::Prepare {
            force_download,
            skip_download,
        } => {
            let merged = pipeline::prepare(&config, force_download, skip_download)?;
            let report = &merged.report;
            info!(
                "Dropped {:?} rows without a name, collapsed {:?} repeated names",
                report.dropped_missing_names, report.collapsed_duplicates
            );
            info!(
                "Price from '{}', release from {:?}",
                report.price_column, report.release_column
            );
            if report.label_fallback {
                warn!("on_sale could not be derived from prices; every row is labelled 0");
            }
            info!(
                "Done: {} games ({} in both catalogs)",
                merged.table.len(),
                merged.report.both
            );
        }
        Commands::Train { input, no_augment } => {
            let outcome = pipeline::train_model(&config, input.as_deref(), !no_augment)?;
            println!("{}", outcome.evaluation);
            info!(
                "Model trained on {} rows, evaluated on {}",
                outcome.train_rows, outcome.test_rows
            );
        }
        Commands::Predict {
            price,
            rating,
            age,
            new_low,
        } => {
            let query = SaleQuery {
                price,
                rating_pct: rating,
                age_years: age,
                is_new_low: new_low,
            };
            println!("{}", pipeline::predict_sale(&config, &query)?);
        }
    }
    Ok(())
}
