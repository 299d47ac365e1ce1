use thiserror::Error;

/// The three-kind error taxonomy the dispatch engine reasons about, plus the
/// lower-level causes each kind wraps.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Durable job store is empty. Non-fatal, handled by a fixed backoff.
    #[error("no jobs available")]
    NoJobs,

    /// Network/timeout/parse failure during a single fetch. The URL is
    /// abandoned; the worker moves on.
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    /// Fingerprint clash on insert. Treated as success by the caller.
    #[error("duplicate content fingerprint: {0}")]
    DuplicateContent(String),

    /// Missing required env var, unreachable collaborator, or unparseable
    /// proxy URL. Raised only from `Init`; the process exits.
    #[error("startup failed: {0}")]
    StartupFatal(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CrawlError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::StartupFatal(_))
    }
}
