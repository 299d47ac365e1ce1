use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tor: TorConfig,
    pub visited: VisitedConfig,
    pub jobstore: JobStoreConfig,
    pub sink: SinkConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub max_depth: u32,
    pub num_workers: usize,
    pub parallelism: usize,
    pub max_body_bytes: usize,
    pub blacklist_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            num_workers: 12,
            parallelism: 32,
            max_body_bytes: 1_000_000,
            blacklist_file: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TorConfig {
    pub proxy_uri: String,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub tls_handshake_timeout_seconds: u64,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            proxy_uri: String::new(),
            connect_timeout_seconds: 60,
            idle_timeout_seconds: 60,
            tls_handshake_timeout_seconds: 60,
        }
    }
}

/// Redis-backed visited store connection.
#[derive(Debug, Deserialize, Clone)]
pub struct VisitedConfig {
    pub redis_uri: String,
}

/// MongoDB-backed durable job store connection.
#[derive(Debug, Deserialize, Clone)]
pub struct JobStoreConfig {
    pub mongo_uri: String,
    pub mongo_db: String,
    pub mongo_col: String,
}

/// Elasticsearch-backed page sink connection.
#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    pub elastic_uri: String,
    pub elastic_index: String,
}

/// MySQL-backed relational record store.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub mysql_url: String,
}

impl AppConfig {
    /// Overlay environment variables onto config-file values, per the
    /// documented precedence (env vars win). `REDIS_URI` and `PROXY_URI`
    /// are required; missing either is a startup-fatal condition the
    /// caller should surface before `Init`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("REDIS_URI") {
            self.visited.redis_uri = v;
        }
        if let Ok(v) = std::env::var("PROXY_URI") {
            self.tor.proxy_uri = v;
        }
        if let Ok(v) = std::env::var("ELASTIC_URI") {
            self.sink.elastic_uri = v;
        }
        if let Ok(v) = std::env::var("ELASTIC_INDEX") {
            self.sink.elastic_index = v;
        }
        if let Ok(v) = std::env::var("MONGO_URI") {
            self.jobstore.mongo_uri = v;
        }
        if let Ok(v) = std::env::var("MONGO_DB") {
            self.jobstore.mongo_db = v;
        }
        if let Ok(v) = std::env::var("MONGO_COL") {
            self.jobstore.mongo_col = v;
        }

        // Original tor-spider builds the MySQL DSN from four separate env
        // vars rather than one URL; supported here for compatibility.
        if let (Ok(user), Ok(pass), Ok(host), Ok(db)) = (
            std::env::var("TOR_MYSQL_USER"),
            std::env::var("TOR_MYSQL_PASSWORD"),
            std::env::var("TOR_MYSQL_HOST"),
            std::env::var("TOR_MYSQL_DATABASE"),
        ) {
            let port = std::env::var("TOR_MYSQL_PORT").unwrap_or_else(|_| "3306".to_string());
            self.database.mysql_url = format!(
                "mysql://{user}:{pass}@{host}:{port}/{db}?charset=utf8mb4"
            );
        }
    }
}
