//! Overflow/underflow persistence for the in-memory job queue. Backed by
//! MongoDB. `save_job` buffers internally (capacity 100) and bulk-flushes
//! on overflow, mirroring the original tor-spider jobs collection.

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use onioncrawl_core::{CrawlError, Job};

const BUFFER_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    _id: Option<ObjectId>,
    url: String,
}

impl From<Job> for JobDoc {
    fn from(job: Job) -> Self {
        Self { _id: None, url: job.url }
    }
}

pub struct DurableJobStore {
    collection: Collection<JobDoc>,
    buf_tx: mpsc::Sender<Job>,
    buf_rx: Mutex<mpsc::Receiver<Job>>,
}

impl DurableJobStore {
    /// Connect to MongoDB. Unreachable Mongo is startup-fatal.
    pub async fn connect(uri: &str, db: &str, collection: &str) -> Result<Self, CrawlError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| CrawlError::StartupFatal(format!("invalid MONGO_URI: {e}")))?;
        client
            .database(db)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CrawlError::StartupFatal(format!("cannot reach mongo: {e}")))?;
        let collection = client.database(db).collection::<JobDoc>(collection);
        let (buf_tx, buf_rx) = mpsc::channel(BUFFER_CAPACITY);
        Ok(Self {
            collection,
            buf_tx,
            buf_rx: Mutex::new(buf_rx),
        })
    }

    /// Buffer `job` for a later bulk write. When the internal buffer is
    /// full, the whole pending batch is flushed in one bulk-write before
    /// the new job is accepted, matching the durable store's documented
    /// overflow behavior.
    pub async fn save_job(&self, job: Job) -> Result<(), CrawlError> {
        match self.buf_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.flush().await?;
                self.buf_tx
                    .try_send(job)
                    .map_err(|e| CrawlError::Storage(e.to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(CrawlError::Storage("jobstore buffer closed".into()))
            }
        }
    }

    /// Drain the pending buffer and bulk-insert it. A flush failure
    /// propagates (batch flush failures are not swallowed, so the
    /// dispatcher can fail fast, per the spec's error handling design).
    async fn flush(&self) -> Result<(), CrawlError> {
        let mut rx = self.buf_rx.lock().await;
        let mut pending = Vec::new();
        while let Ok(job) = rx.try_recv() {
            pending.push(JobDoc::from(job));
        }
        if pending.is_empty() {
            return Ok(());
        }
        let count = pending.len();
        self.collection
            .insert_many(pending)
            .await
            .map_err(|e| CrawlError::Storage(format!("batch flush failed: {e}")))?;
        debug!(count, "flushed jobs to durable store");
        Ok(())
    }

    /// Pop one job. Selection need not be strict FIFO — a random-ish
    /// sample is acceptable. Returns `CrawlError::NoJobs` when the store
    /// is empty, a normal non-error condition handled by backoff.
    pub async fn get_job(&self) -> Result<Job, CrawlError> {
        let mut cursor = self
            .collection
            .aggregate(vec![doc! { "$sample": { "size": 1 } }])
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;

        let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?
        else {
            return Err(CrawlError::NoJobs);
        };

        let job_doc: JobDoc = mongodb::bson::from_document(doc)
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        let id = job_doc._id;

        if let Some(id) = id {
            self.collection
                .delete_one(doc! { "_id": id })
                .await
                .map_err(|e| CrawlError::Storage(e.to_string()))?;
        }

        Ok(Job::new(job_doc.url))
    }
}
