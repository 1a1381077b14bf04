pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::catalog::{CURRENCY_CATEGORY, UnitCatalog};
use crate::core::config::AppConfig;
use crate::core::engine::ConversionEngine;
use crate::core::format::Formatter;
use crate::providers::caching::{RateProvider, RateProviderOptions};
use crate::providers::exchange_rates::HttpRateSource;
use crate::store::disk::DiskSnapshotStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Convert {
        category: String,
        from: String,
        to: String,
        amount: String,
    },
    List {
        category: Option<String>,
    },
    Matrix {
        category: String,
    },
    Rates,
}

impl AppCommand {
    /// Whether the command works on the currency category.
    fn targets_currency(&self) -> bool {
        match self {
            AppCommand::Convert { category, .. } | AppCommand::Matrix { category } => {
                category == CURRENCY_CATEGORY
            }
            AppCommand::List { category } => category.as_deref() == Some(CURRENCY_CATEGORY),
            AppCommand::Rates => false,
        }
    }
}

/// Builds the rate provider described by the config, with on-disk
/// persistence when enabled and available.
pub fn build_rate_provider(config: &AppConfig) -> Result<RateProvider> {
    let source = HttpRateSource::from_config(&config.rates)?;
    let provider = RateProvider::new(
        Arc::new(source),
        RateProviderOptions::from(&config.rates),
    );
    if !config.persist_rates {
        return Ok(provider);
    }

    let path = config.default_data_path()?.join("rates");
    match DiskSnapshotStore::open(&path) {
        Ok(store) => Ok(provider.with_store(Arc::new(store))),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Rate persistence unavailable");
            Ok(provider)
        }
    }
}

/// Builds the engine for `command`, loading the rates it needs first.
pub async fn prepare_engine(
    config: &AppConfig,
    command: &AppCommand,
) -> Result<(ConversionEngine, RateProvider)> {
    let catalog = UnitCatalog::builtin().context("Built-in unit catalog is invalid")?;
    catalog.validate()?;

    let provider = build_rate_provider(config)?;
    if command.targets_currency() {
        cli::rates::ensure_rates(&provider, false).await;
    } else if !matches!(command, AppCommand::Rates) {
        // offline listing still shows currency when rates were stored earlier
        provider.warm_start().await;
    }

    let engine = ConversionEngine::new(Arc::new(catalog))
        .with_rates(Arc::new(provider.clone()))
        .with_formatter(Formatter::new(config.display.precision));
    Ok((engine, provider))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("convkit starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let (engine, provider) = prepare_engine(&config, &command).await?;

    match command {
        AppCommand::Convert {
            category,
            from,
            to,
            amount,
        } => cli::convert::run(&engine, &category, &from, &to, &amount),
        AppCommand::List { category } => cli::list::run(&engine, category.as_deref()),
        AppCommand::Matrix { category } => cli::list::run_matrix(&engine, &category),
        AppCommand::Rates => cli::rates::run(&provider).await,
    }
}
