//! The dispatch engine: bounded job queue with spill-to-durable-storage,
//! worker pool, per-worker fetch/parse/enrich pipeline, and the seed
//! HTTP endpoint. Orchestrates the other crates without owning any of
//! their storage details itself.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use onioncrawl_core::{CrawlError, Job};
use onioncrawl_extractor::extract;
use onioncrawl_fetcher::TorFetcher;
use onioncrawl_jobstore::DurableJobStore;
use onioncrawl_sink::PageSink;
use onioncrawl_storage::Storage;
use onioncrawl_visited::VisitedStore;

const REFILL_THRESHOLD: f64 = 0.15;
const SPILL_THRESHOLD: f64 = 0.85;
const LOOP_BACKOFF: Duration = Duration::from_millis(50);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Depth cap for URLs dropped in through the HTTP seed endpoint, distinct
/// from and shorter than the configurable `-d` used by the normal queue.
const INPUT_COLLECTOR_MAX_DEPTH: u32 = 3;

/// Which gating a `crawl_at_depth` call runs under. Jobs dequeued from the
/// main queue always run `Normal`; the HTTP seed endpoint runs
/// `InputCollector` so operators can force a re-crawl of any URL without
/// it being dropped by the onion allow-list or the visited-store dedup.
/// Links found while still under the collector's depth cap recurse in the
/// same mode; past it they cross back onto the main queue as `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gating {
    Normal,
    InputCollector,
}

/// `-d`/`-w`/`-p` and friends, collected into one value passed to the
/// engine at construction.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub num_workers: usize,
    pub parallelism: usize,
    pub max_depth: u32,
    pub max_body_bytes: usize,
    pub seed_port: u16,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            num_workers: 12,
            parallelism: 32,
            max_depth: 2,
            max_body_bytes: 1_000_000,
            seed_port: 8888,
        }
    }
}

struct Shared {
    fetcher: TorFetcher,
    visited: VisitedStore,
    storage: Storage,
    sink: PageSink,
    jobstore: DurableJobStore,
    job_tx: mpsc::Sender<Job>,
    job_rx: Mutex<mpsc::Receiver<Job>>,
    queue_len: AtomicUsize,
    queue_cap: usize,
    active_workers: AtomicUsize,
    max_depth: u32,
    max_body_bytes: usize,
    link_semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

pub struct Engine {
    shared: Arc<Shared>,
    config: DispatchConfig,
}

impl Engine {
    pub fn new(
        config: DispatchConfig,
        fetcher: TorFetcher,
        visited: VisitedStore,
        storage: Storage,
        sink: PageSink,
        jobstore: DurableJobStore,
    ) -> Self {
        let queue_cap = config.num_workers * config.parallelism * 100;
        let (job_tx, job_rx) = mpsc::channel(queue_cap);
        let shared = Arc::new(Shared {
            fetcher,
            visited,
            storage,
            sink,
            jobstore,
            job_tx,
            job_rx: Mutex::new(job_rx),
            queue_len: AtomicUsize::new(0),
            queue_cap,
            active_workers: AtomicUsize::new(0),
            max_depth: config.max_depth,
            max_body_bytes: config.max_body_bytes,
            link_semaphore: Arc::new(Semaphore::new(config.parallelism)),
            cancel: CancellationToken::new(),
        });
        Self { shared, config }
    }

    /// Enqueue a seed job directly, bypassing the durable store. Used by
    /// both the CLI seed list and the HTTP seed endpoint.
    pub async fn enqueue_seed(&self, url: String) -> Result<(), CrawlError> {
        enqueue(&self.shared, Job::new(url)).await
    }

    /// Runs every loop (worker dispatch, refill, spill, heartbeat, seed
    /// endpoint) until `Ctrl+C` or an external cancellation fires. Each
    /// loop exits within one iteration of the signal, per the
    /// cancellation-token redesign.
    pub async fn run(self) -> Result<(), CrawlError> {
        let cancel = self.shared.cancel.clone();

        let mut handles = Vec::new();
        for worker_id in 0..self.config.num_workers {
            handles.push(tokio::spawn(worker_loop(self.shared.clone(), worker_id)));
        }
        handles.push(tokio::spawn(refill_loop(self.shared.clone())));
        handles.push(tokio::spawn(spill_loop(self.shared.clone())));
        handles.push(tokio::spawn(heartbeat_loop(self.shared.clone())));
        handles.push(tokio::spawn(seed_server(self.shared.clone(), self.config.seed_port)));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
            }
            _ = cancel.cancelled() => {}
        }
        self.shared.cancel.cancel();

        for handle in handles {
            let _ = handle.await;
        }
        info!("shutdown complete");
        Ok(())
    }

    /// Cancel all loops without waiting for `Ctrl+C`. Exposed for tests
    /// and for embedding the engine in a larger process.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }
}

/// The depth cap in effect for a given gating mode: the configured `-d`
/// under `Normal`, the shorter hardcoded cap under `InputCollector`.
fn effective_max_depth(gating: Gating, configured_max_depth: u32) -> u32 {
    match gating {
        Gating::Normal => configured_max_depth,
        Gating::InputCollector => INPUT_COLLECTOR_MAX_DEPTH,
    }
}

async fn enqueue(shared: &Arc<Shared>, job: Job) -> Result<(), CrawlError> {
    shared
        .job_tx
        .send(job)
        .await
        .map_err(|_| CrawlError::Storage("job queue closed".into()))?;
    shared.queue_len.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

async fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    info!(worker_id, "worker started");
    loop {
        let job = tokio::select! {
            _ = shared.cancel.cancelled() => {
                info!(worker_id, "worker shutting down");
                break;
            }
            job = async {
                let mut rx = shared.job_rx.lock().await;
                rx.recv().await
            } => job,
        };

        let Some(job) = job else { break };
        shared.queue_len.fetch_sub(1, Ordering::SeqCst);
        shared.active_workers.fetch_add(1, Ordering::SeqCst);

        let Ok(url) = Url::parse(&job.url) else {
            shared.active_workers.fetch_sub(1, Ordering::SeqCst);
            continue;
        };
        crawl_at_depth(shared.clone(), url, 0, None, Gating::Normal).await;
        shared.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The per-worker fetch/parse/enrich pipeline, recursed in-place up to the
/// gating's depth cap; links discovered at the depth boundary cross back
/// over to the main job queue (running `Normal` from depth 0) instead of
/// being followed in-collector.
fn crawl_at_depth(
    shared: Arc<Shared>,
    url: Url,
    depth: u32,
    referer: Option<String>,
    gating: Gating,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        match gating {
            Gating::Normal => {
                if !shared.fetcher.is_fetchable(url.as_str()) {
                    return;
                }
                match shared.visited.mark_visited(url.as_str()).await {
                    Ok(false) => return,
                    Ok(true) => {}
                    Err(e) => {
                        warn!(url = %url, error = %e, "visited store check failed");
                        return;
                    }
                }
            }
            Gating::InputCollector => {
                if !shared.fetcher.passes_disallow_list(url.as_str()) {
                    return;
                }
            }
        }

        let resp = match shared.fetcher.fetch(&url, shared.max_body_bytes, referer.as_deref()).await {
            Ok(r) => r,
            Err(e) => {
                debug!(url = %url, error = %e, "fetch abandoned");
                return;
            }
        };

        let is_html = resp
            .content_type
            .as_deref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(true);
        if !is_html {
            return;
        }

        let Some(extraction) = extract(&resp) else {
            return;
        };
        let record = extraction.record;

        match shared.storage.exists_by_fingerprint(&record.fingerprint).await {
            Ok(true) => {
                debug!(url = %url, fingerprint = %record.fingerprint, "duplicate content, skipped");
            }
            Ok(false) => match shared.storage.insert(&record).await {
                Ok(_) => {
                    if let Err(e) = shared.sink.save_page(record.clone()).await {
                        warn!(url = %url, error = %e, "sink append failed");
                    }
                }
                Err(CrawlError::DuplicateContent(_)) => {}
                Err(e) => warn!(url = %url, error = %e, "insert failed"),
            },
            Err(e) => warn!(url = %url, error = %e, "fingerprint probe failed"),
        }

        if extraction.links.is_empty() {
            return;
        }

        if depth >= effective_max_depth(gating, shared.max_depth) {
            for link in extraction.links {
                let _ = enqueue(&shared, Job::new(link.to_string())).await;
            }
            return;
        }

        let mut tasks = Vec::with_capacity(extraction.links.len());
        for link in extraction.links {
            let Ok(permit) = shared.link_semaphore.clone().acquire_owned().await else { continue };
            let shared = shared.clone();
            let referer = url.to_string();
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                crawl_at_depth(shared, link, depth + 1, Some(referer), gating).await;
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
    })
}

/// True below 15% of capacity: the refill loop should pull a job from the
/// durable store to keep workers fed.
fn should_refill(queue_len: usize, queue_cap: usize) -> bool {
    (queue_len as f64) < REFILL_THRESHOLD * queue_cap as f64
}

/// True above 85% of capacity: the spill loop should move a job out to
/// the durable store to relieve backpressure.
fn should_spill(queue_len: usize, queue_cap: usize) -> bool {
    (queue_len as f64) > SPILL_THRESHOLD * queue_cap as f64
}

async fn refill_loop(shared: Arc<Shared>) {
    while !shared.cancel.is_cancelled() {
        let len = shared.queue_len.load(Ordering::SeqCst);
        if should_refill(len, shared.queue_cap) {
            match shared.jobstore.get_job().await {
                Ok(job) => {
                    let _ = enqueue(&shared, job).await;
                }
                Err(CrawlError::NoJobs) => tokio::time::sleep(LOOP_BACKOFF).await,
                Err(e) => {
                    warn!(error = %e, "refill loop error");
                }
            }
        } else {
            tokio::time::sleep(LOOP_BACKOFF).await;
        }
    }
}

async fn spill_loop(shared: Arc<Shared>) {
    while !shared.cancel.is_cancelled() {
        let len = shared.queue_len.load(Ordering::SeqCst);
        if should_spill(len, shared.queue_cap) {
            let job = {
                let mut rx = shared.job_rx.lock().await;
                rx.try_recv().ok()
            };
            if let Some(job) = job {
                shared.queue_len.fetch_sub(1, Ordering::SeqCst);
                if let Err(e) = shared.jobstore.save_job(job).await {
                    warn!(error = %e, "spill loop batch flush failed");
                }
            } else {
                tokio::time::sleep(LOOP_BACKOFF).await;
            }
        } else {
            tokio::time::sleep(LOOP_BACKOFF).await;
        }
    }
}

async fn heartbeat_loop(shared: Arc<Shared>) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    while !shared.cancel.is_cancelled() {
        ticker.tick().await;
        info!(
            queue_len = shared.queue_len.load(Ordering::SeqCst),
            active_workers = shared.active_workers.load(Ordering::SeqCst),
            "heartbeat"
        );
    }
}

#[derive(serde::Deserialize)]
struct SeedParams {
    url: Option<String>,
}

/// Drops a URL straight into the input-collector pipeline, bypassing the
/// main job queue entirely: no onion allow-list, no visited-store dedup,
/// just the disallow-list and a shorter hardcoded depth cap. This lets an
/// operator force a re-crawl of a URL the normal gating would otherwise
/// refuse to touch again.
async fn seed_handler(
    State(shared): State<Arc<Shared>>,
    Query(params): Query<SeedParams>,
) -> (StatusCode, &'static str) {
    let Some(url) = params.url.filter(|u| !u.is_empty()) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Missing url");
    };
    let Ok(parsed) = Url::parse(&url) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid url");
    };
    tokio::spawn(crawl_at_depth(shared, parsed, 0, None, Gating::InputCollector));
    (StatusCode::OK, "Oki")
}

async fn seed_server(shared: Arc<Shared>, port: u16) {
    let app = Router::new().route("/", get(seed_handler)).with_state(shared.clone());
    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!(error = %e, addr, "seed endpoint failed to bind");
            return;
        }
    };
    info!(addr, "seed endpoint listening");

    let cancel = shared.cancel.clone();
    let serve = axum::serve(listener, app);
    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                warn!(error = %e, "seed endpoint exited");
            }
        }
        _ = cancel.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_gating_uses_configured_depth() {
        assert_eq!(effective_max_depth(Gating::Normal, 2), 2);
        assert_eq!(effective_max_depth(Gating::Normal, 7), 7);
    }

    #[test]
    fn input_collector_gating_ignores_configured_depth() {
        assert_eq!(effective_max_depth(Gating::InputCollector, 2), INPUT_COLLECTOR_MAX_DEPTH);
        assert_eq!(effective_max_depth(Gating::InputCollector, 99), INPUT_COLLECTOR_MAX_DEPTH);
    }

    #[test]
    fn depth_boundary_is_inclusive_of_max_depth() {
        let max_depth = effective_max_depth(Gating::Normal, 2);
        assert!(1 < max_depth, "depth below the cap must still recurse");
        assert!(2 >= max_depth, "depth at the cap must stop recursing and enqueue instead");
    }

    #[test]
    fn refill_below_fifteen_percent() {
        assert!(should_refill(0, 1000));
        assert!(should_refill(149, 1000));
        assert!(!should_refill(150, 1000));
        assert!(!should_refill(500, 1000));
    }

    #[test]
    fn spill_above_eighty_five_percent() {
        assert!(!should_spill(850, 1000));
        assert!(should_spill(851, 1000));
        assert!(should_spill(1000, 1000));
    }

    #[test]
    fn hysteresis_gap_leaves_a_dead_band() {
        // Between the two thresholds neither loop should act, giving the
        // queue room to settle instead of refilling and spilling in the
        // same tick.
        for len in 150..=850usize {
            assert!(!should_refill(len, 1000), "len={len}");
            assert!(!should_spill(len, 1000), "len={len}");
        }
    }
}
