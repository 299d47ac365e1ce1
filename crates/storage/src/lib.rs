use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use tracing::info;

use onioncrawl_core::{CrawlError, PageRecord};

#[derive(Clone)]
pub struct Storage {
    pool: MySqlPool,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self, CrawlError> {
        Self::with_pool_size(database_url, 20).await
    }

    pub async fn with_pool_size(database_url: &str, max_connections: u32) -> Result<Self, CrawlError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CrawlError::StartupFatal(format!("cannot reach mysql: {e}")))?;

        info!(max_connections, "connected to mysql");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CrawlError> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        info!("migrations complete");
        Ok(())
    }

    /// Gate for the content-hash dedup rule: a page whose fingerprint is
    /// already on record is skipped before the insert is attempted.
    pub async fn exists_by_fingerprint(&self, fingerprint: &str) -> Result<bool, CrawlError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages WHERE fingerprint = ?")
            .bind(fingerprint)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(row.0 > 0)
    }

    /// Insert a page record. A duplicate fingerprint racing past the
    /// `exists_by_fingerprint` check surfaces as `DuplicateContent` rather
    /// than a raw MySQL error (error 1062 on the unique key).
    pub async fn insert(&self, page: &PageRecord) -> Result<i64, CrawlError> {
        let attributes_json = serde_json::to_string(&page.attributes)
            .map_err(|e| CrawlError::Storage(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO pages (url, title, summary, key_points, keywords, domain, is_home_page, status, language, lang_confidence, fingerprint, wapp, attributes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&page.url)
        .bind(&page.title)
        .bind(&page.summary)
        .bind(page.key_points_joined())
        .bind(page.keywords_joined())
        .bind(&page.domain)
        .bind(page.is_home_page)
        .bind(page.status)
        .bind(&page.language)
        .bind(page.lang_confidence)
        .bind(&page.fingerprint)
        .bind(&page.wapp)
        .bind(&attributes_json)
        .bind(page.created_at)
        .bind(page.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(res) => Ok(res.last_insert_id() as i64),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
                Err(CrawlError::DuplicateContent(page.fingerprint.clone()))
            }
            Err(e) => Err(CrawlError::Storage(e.to_string())),
        }
    }

    pub async fn get_page_count(&self) -> Result<i64, CrawlError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(row.0)
    }

    pub async fn check_connectivity(&self) -> Result<(), CrawlError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        Ok(())
    }

    pub async fn search_by_domain(&self, domain: &str, limit: i64) -> Result<Vec<PageRecord>, CrawlError> {
        let rows: Vec<PageRow> = sqlx::query_as(
            "SELECT url, title, summary, key_points, keywords, domain, is_home_page, status, language, lang_confidence, fingerprint, wapp, attributes, created_at, updated_at
             FROM pages WHERE domain = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(domain)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CrawlError::Storage(e.to_string()))?;
        rows.into_iter().map(PageRow::into_record).collect()
    }

    pub async fn all_pages(&self, limit: i64) -> Result<Vec<PageRecord>, CrawlError> {
        let rows: Vec<PageRow> = sqlx::query_as(
            "SELECT url, title, summary, key_points, keywords, domain, is_home_page, status, language, lang_confidence, fingerprint, wapp, attributes, created_at, updated_at
             FROM pages ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CrawlError::Storage(e.to_string()))?;
        rows.into_iter().map(PageRow::into_record).collect()
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct PageRow {
    url: String,
    title: Option<String>,
    summary: Option<String>,
    key_points: Option<String>,
    keywords: Option<String>,
    domain: String,
    is_home_page: bool,
    status: u16,
    language: Option<String>,
    lang_confidence: f64,
    fingerprint: String,
    wapp: Option<String>,
    attributes: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl PageRow {
    fn into_record(self) -> Result<PageRecord, CrawlError> {
        let attributes = match self.attributes {
            Some(json) => serde_json::from_str(&json).map_err(|e| CrawlError::Storage(e.to_string()))?,
            None => Vec::new(),
        };
        Ok(PageRecord {
            url: self.url,
            title: self.title.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            key_points: self
                .key_points
                .map(|s| s.split('|').map(|p| p.to_string()).filter(|p| !p.is_empty()).collect())
                .unwrap_or_default(),
            keywords: self
                .keywords
                .map(|s| s.split(',').map(|p| p.to_string()).filter(|p| !p.is_empty()).collect())
                .unwrap_or_default(),
            domain: self.domain,
            is_home_page: self.is_home_page,
            status: self.status,
            language: self.language.unwrap_or_default(),
            lang_confidence: self.lang_confidence,
            fingerprint: self.fingerprint,
            wapp: self.wapp.unwrap_or_default(),
            attributes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
