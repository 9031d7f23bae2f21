//! `resync`: operator tool for the caches that resumable syncs write to.

mod cli;
mod error;
mod logging;

use crate::cli::{CacheCommand, Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::{OptionExt, ResultExt};
use resync_cache::{CacheHandle, CacheLayout, FileCache, Reconciliation, ShardedCache};
use resync_config::Config;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The debug representation is the full error tree.
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    logging::init(config.log.level_filter().or_raise(|| ErrorKind::Config)?, cli.verbose);
    tracing::debug!(layout = %config.cache.layout, path = ?config.cache.path, "configuration loaded");

    match cli.command {
        Command::Config => {
            let json = serde_json::to_string_pretty(&config).or_raise(|| ErrorKind::Output)?;
            println!("{json}");
        },
        Command::Cache { action } => match action {
            CacheCommand::Keys => {
                for key in open(&config).await?.keys().await {
                    println!("{key}");
                }
            },
            CacheCommand::Get { key } => {
                let value = open(&config).await?.get(&key).await.or_raise(|| ErrorKind::Cache)?;
                let value = value.ok_or_raise(|| ErrorKind::NotCached(key.clone()))?;
                let json = serde_json::to_string_pretty(&value).or_raise(|| ErrorKind::Output)?;
                println!("{json}");
            },
            CacheCommand::Delete { key } => {
                let cache = open(&config).await?;
                cache.delete(&key).await.or_raise(|| ErrorKind::Cache)?;
                tracing::info!(cache = cache.name(), %key, "deleted");
            },
            CacheCommand::Reconcile => reconcile(&config).await?,
        },
    }
    Ok(())
}

async fn open(config: &Config) -> Result<CacheHandle> {
    let path = config.cache.path.clone().unwrap_or_default();
    config.cache.layout.open(path).await.or_raise(|| ErrorKind::Cache)
}

async fn reconcile(config: &Config) -> Result<()> {
    let Some(path) = config.cache.path.as_deref() else {
        println!("Nothing to reconcile: the {} cache is not persisted.", config.cache.layout);
        return Ok(());
    };
    match config.cache.layout {
        CacheLayout::Sharded => {
            let cache = ShardedCache::new(path).or_raise(|| ErrorKind::Cache)?;
            let report = cache.load().await.or_raise(|| ErrorKind::Cache)?;
            print_reconciliation(&report, cache.len().await);
        },
        CacheLayout::File => {
            let entries = FileCache::new(path).or_raise(|| ErrorKind::Cache)?.load().await.or_raise(|| ErrorKind::Cache)?;
            println!("{entries} entries; a single-file cache has no index to reconcile.");
        },
        CacheLayout::Memory => {
            println!("Nothing to reconcile: the memory cache is not persisted.");
        },
    }
    Ok(())
}

fn print_reconciliation(report: &Reconciliation, keys: usize) {
    if report.is_clean() {
        println!("Index and data shards agree ({keys} keys).");
        return;
    }
    for key in &report.dropped {
        println!("dropped  {key}  (indexed, but no data shard)");
    }
    for key in &report.adopted {
        println!("adopted  {key}  (data shard missing from the index)");
    }
    if report.cleaned > 0 {
        println!("removed  {} leftover temporary files", report.cleaned);
    }
    println!("Index repaired ({keys} keys).");
}
