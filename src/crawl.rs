use anyhow::Result;
use tracing::info;

use onioncrawl_core::config::AppConfig;
use onioncrawl_dispatch::{DispatchConfig, Engine};
use onioncrawl_fetcher::TorFetcher;
use onioncrawl_jobstore::DurableJobStore;
use onioncrawl_sink::PageSink;
use onioncrawl_storage::Storage;
use onioncrawl_visited::VisitedStore;

use crate::seeds::TOR_SEEDS;

pub async fn run_crawl(config: AppConfig, seeds: Option<String>, seed: Option<String>) -> Result<()> {
    let disallow = load_blacklist(&config.general.blacklist_file)?;

    let fetcher = TorFetcher::new(&config.tor, &disallow)?;
    let visited = VisitedStore::connect(&config.visited.redis_uri).await?;
    let storage = Storage::new(&config.database.mysql_url).await?;
    storage.run_migrations().await?;
    let sink = PageSink::connect(&config.sink.elastic_uri, &config.sink.elastic_index).await?;
    let jobstore = DurableJobStore::connect(
        &config.jobstore.mongo_uri,
        &config.jobstore.mongo_db,
        &config.jobstore.mongo_col,
    )
    .await?;

    let dispatch_config = DispatchConfig {
        num_workers: config.general.num_workers,
        parallelism: config.general.parallelism,
        max_depth: config.general.max_depth,
        max_body_bytes: config.general.max_body_bytes,
        ..DispatchConfig::default()
    };

    let engine = Engine::new(dispatch_config, fetcher, visited, storage, sink, jobstore);

    let seed_urls = gather_seeds(seeds, seed);
    for url in seed_urls {
        info!(url, "enqueuing seed");
        engine.enqueue_seed(url).await?;
    }

    engine.run().await?;
    Ok(())
}

fn gather_seeds(seeds: Option<String>, seed: Option<String>) -> Vec<String> {
    if let Some(seed) = seed {
        return vec![seed];
    }
    if let Some(seeds) = seeds {
        return seeds.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    TOR_SEEDS.iter().map(|s| s.to_string()).collect()
}

fn load_blacklist(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
}
