//! Page sink backed by Elasticsearch's bulk HTTP API. The `elasticsearch`
//! crate has been unmaintained for several major ES releases, so the sink
//! speaks the bulk wire format directly over `reqwest`, the same client
//! used elsewhere in the workspace.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, error, warn};
use url::Url;

use onioncrawl_core::{CrawlError, PageRecord};

const BUFFER_CAPACITY: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

pub struct PageSink {
    client: Client,
    base_url: Url,
    index: String,
    buffer: Arc<Mutex<Vec<PageRecord>>>,
}

impl PageSink {
    /// Connect and verify the target index exists and is reachable.
    /// Unreachable ES or a missing index is startup-fatal, same
    /// treatment as the visited store and job store.
    pub async fn connect(elastic_uri: &str, index: &str) -> Result<Self, CrawlError> {
        let base_url = Url::parse(elastic_uri)
            .map_err(|e| CrawlError::StartupFatal(format!("invalid ELASTIC_URI: {e}")))?;
        let client = Client::builder()
            .build()
            .map_err(|e| CrawlError::StartupFatal(format!("cannot build http client: {e}")))?;

        let index_url = base_url
            .join(index)
            .map_err(|e| CrawlError::StartupFatal(format!("invalid ELASTIC_INDEX: {e}")))?;
        let resp = client
            .head(index_url)
            .send()
            .await
            .map_err(|e| CrawlError::StartupFatal(format!("cannot reach elasticsearch: {e}")))?;
        if !resp.status().is_success() {
            return Err(CrawlError::StartupFatal(format!(
                "elasticsearch index {index:?} not found: {}",
                resp.status()
            )));
        }

        let sink = Self {
            client,
            base_url,
            index: index.to_string(),
            buffer: Arc::new(Mutex::new(Vec::with_capacity(BUFFER_CAPACITY))),
        };
        sink.spawn_flush_ticker();
        Ok(sink)
    }

    fn spawn_flush_ticker(&self) {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let index = self.index.clone();
        let buffer = self.buffer.clone();
        tokio::spawn(async move {
            let mut ticker = interval(FLUSH_INTERVAL);
            loop {
                ticker.tick().await;
                let batch = {
                    let mut buf = buffer.lock().await;
                    if buf.is_empty() {
                        continue;
                    }
                    std::mem::take(&mut *buf)
                };
                if let Err(e) = bulk_index(&client, &base_url, &index, &batch).await {
                    warn!(error = %e, count = batch.len(), "periodic sink flush failed");
                }
            }
        });
    }

    /// Buffer `page`, flushing the whole batch immediately once it
    /// reaches capacity. Otherwise the page waits for the periodic ticker.
    pub async fn save_page(&self, page: PageRecord) -> Result<(), CrawlError> {
        let batch = {
            let mut buf = self.buffer.lock().await;
            buf.push(page);
            if buf.len() < BUFFER_CAPACITY {
                return Ok(());
            }
            std::mem::take(&mut *buf)
        };
        bulk_index(&self.client, &self.base_url, &self.index, &batch).await
    }
}

async fn bulk_index(
    client: &Client,
    base_url: &Url,
    index: &str,
    pages: &[PageRecord],
) -> Result<(), CrawlError> {
    if pages.is_empty() {
        return Ok(());
    }
    let mut body = String::new();
    for page in pages {
        let action = serde_json::json!({ "index": { "_index": index } });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&serde_json::to_string(page).map_err(|e| CrawlError::Storage(e.to_string()))?);
        body.push('\n');
    }

    let url = base_url
        .join("_bulk")
        .map_err(|e| CrawlError::Storage(e.to_string()))?;

    let resp = client
        .post(url)
        .header("content-type", "application/x-ndjson")
        .body(body)
        .send()
        .await
        .map_err(|e| CrawlError::TransientFetch(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        error!(%status, body = %text, "elasticsearch bulk index failed");
        return Err(CrawlError::Storage(format!("bulk index returned {status}")));
    }

    debug!(count = pages.len(), "flushed pages to elasticsearch");
    Ok(())
}
