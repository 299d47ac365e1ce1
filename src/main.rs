mod cli;
mod commands;
mod crawl;
mod seeds;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// Use mimalloc to prevent memory bloat (glibc malloc doesn't release memory with high concurrency)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use onioncrawl_core::config::AppConfig;

use crate::cli::{Cli, Commands};
use crate::crawl::run_crawl;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(32)
        .thread_stack_size(8 * 1024 * 1024)
        .max_blocking_threads(512)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    // `-x`/`-v` set the tracing filter level directly; absent either, fall
    // back to `RUST_LOG`, then "info".
    let filter = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::new("info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;
    config.apply_env_overrides();

    if let Some(blacklist) = cli.blacklist {
        config.general.blacklist_file = blacklist;
    }
    if let Some(depth) = cli.depth {
        config.general.max_depth = depth;
    }
    if let Some(workers) = cli.workers {
        config.general.num_workers = workers;
    }
    if let Some(parallelism) = cli.parallelism {
        config.general.parallelism = parallelism;
    }

    match cli.command {
        Commands::Crawl { seeds, seed } => {
            run_crawl(config, seeds, seed).await?;
        }
        Commands::Search { domain, limit } => {
            commands::run_search(config, domain, limit).await?;
        }
        Commands::Status => {
            commands::run_status(config).await?;
        }
        Commands::Export { format, output } => {
            commands::run_export(config, &format, &output).await?;
        }
    }

    Ok(())
}
