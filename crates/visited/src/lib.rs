//! Set membership for already-requested URLs, shared across workers and
//! runs. Backed by a Redis set so that multiple engine instances can
//! cooperate through shared storage, per the spec's single-process +
//! shared-storage coordination model.

use onioncrawl_core::CrawlError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

const VISITED_SET_KEY: &str = "onioncrawl:visited";

#[derive(Clone)]
pub struct VisitedStore {
    conn: ConnectionManager,
}

impl VisitedStore {
    /// Connect to Redis. Unreachable Redis is startup-fatal — the visited
    /// store has no in-process fallback.
    pub async fn connect(redis_uri: &str) -> Result<Self, CrawlError> {
        let client = redis::Client::open(redis_uri)
            .map_err(|e| CrawlError::StartupFatal(format!("invalid REDIS_URI: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CrawlError::StartupFatal(format!("cannot reach redis: {e}")))?;
        Ok(Self { conn })
    }

    /// Add `url` to the visited set. Returns `true` if this call inserted
    /// it (first sight), `false` if it was already present.
    pub async fn mark_visited(&self, url: &str) -> Result<bool, CrawlError> {
        let mut conn = self.conn.clone();
        let added: i64 = conn
            .sadd(VISITED_SET_KEY, url)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        let inserted = added > 0;
        debug!(url, inserted, "visited store mark");
        Ok(inserted)
    }

    /// Check membership without inserting.
    pub async fn is_visited(&self, url: &str) -> Result<bool, CrawlError> {
        let mut conn = self.conn.clone();
        let present: bool = conn
            .sismember(VISITED_SET_KEY, url)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(present)
    }
}
