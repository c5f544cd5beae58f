//! Entry points behind the CLI subcommands.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};

use crate::config::PipelineConfig;
use crate::data::loader::{load_file, load_file_head};
use crate::data::writer::write_file;
use crate::download::{ensure_sources, locate_sources, DownloadOptions};
use crate::features::{create_features, process_no_sales, Features, SaleQuery};
use crate::merge::{clean_and_merge, Merged};
use crate::model::train::{train, TrainOutcome};
use crate::model::{sale_message, SaleModel};

/// Fetch (unless skipped) and merge the raw catalogs, then write the
/// processed table.
pub fn prepare(config: &PipelineConfig, force_download: bool, skip_download: bool) -> Result<Merged> {
    let dir = &config.paths.download_dir;
    let sources = if skip_download {
        locate_sources(dir)
            .ok_or_else(|| anyhow!("catalog CSVs not found in {}", dir.display()))?
    } else {
        let opts = DownloadOptions {
            force: force_download || config.download.force,
            ..config.download.clone()
        };
        ensure_sources(dir, &opts)?
    };

    let games = load_file(&sources.games)?;
    let store = load_file(&sources.store)?;
    info!("Games dataset: {} rows x {} columns", games.len(), games.columns.len());
    info!("Store dataset: {} rows x {} columns", store.len(), store.columns.len());

    let merged = clean_and_merge(games, store, &config.merge.options())?;
    write_file(&merged.table, &config.paths.processed)
        .with_context(|| format!("writing {}", config.paths.processed.display()))?;
    info!(
        "Final dataset: {} rows x {} columns saved to {}",
        merged.table.len(),
        merged.table.columns.len(),
        config.paths.processed.display()
    );
    Ok(merged)
}

/// Features of the sales table, optionally followed by the never-discounted
/// catalog rows.
pub fn training_features(config: &PipelineConfig, input: &Path, augment: bool) -> Result<Features> {
    let opts = config.features.options();
    let sales = load_file(input)?;
    if sales.is_empty() {
        return Err(anyhow!("{} has no rows", input.display()));
    }
    let mut features = create_features(&sales, &opts);
    info!(
        "{} rows from {} ({} on sale)",
        features.len(),
        input.display(),
        features.positives()
    );

    if augment {
        let path = &config.paths.no_sales;
        if path.exists() {
            let catalog = load_file_head(path, Some(config.paths.no_sales_rows))?;
            let extra = create_features(&process_no_sales(catalog), &opts);
            if extra.frame.is_empty() {
                warn!("No priced games in {}, nothing to add", path.display());
            } else {
                info!("Adding {} never-discounted rows from {}", extra.len(), path.display());
                features.append(extra);
            }
        } else {
            warn!("No-sales table {} not found, training without it", path.display());
        }
    }
    Ok(features)
}

/// Train on `input` (the configured sales table when `None`) and save the
/// model artifact.
pub fn train_model(config: &PipelineConfig, input: Option<&Path>, augment: bool) -> Result<TrainOutcome> {
    let input = input.unwrap_or(config.paths.sales.as_path());
    let features = training_features(config, input, augment)?;
    let outcome = train(&features, &config.training).context("training the sale model")?;
    outcome.model.save(&config.paths.model)?;
    Ok(outcome)
}

/// Probability message for a single game.
pub fn predict_sale(config: &PipelineConfig, query: &SaleQuery) -> Result<String> {
    let path = &config.paths.model;
    let model = SaleModel::load(path)
        .with_context(|| format!("loading model from {} (run `train` first)", path.display()))?;
    let probability = model.predict_query(query)?;
    Ok(sale_message(probability))
}
