use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// A unit of crawl work: a URL to fetch. Created by the seed endpoint, by
/// the extractor emitting a discovered link, or loaded from the durable
/// job store. Jobs are not deduplicated at enqueue time — the visited
/// store deduplicates at fetch time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub url: String,
}

impl Job {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_body_size: usize,
    pub follow_redirects: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_body_size: 1_000_000,
            follow_redirects: true,
        }
    }
}

/// Raw result of one fetch, before extraction.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: u64,
}

/// An outbound identifier found on a page: email, bitcoin, or twitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// The canonical page record. Constructed wholly inside a single worker;
/// once handed to the record store it is owned by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub keywords: Vec<String>,
    pub domain: String,
    pub is_home_page: bool,
    pub status: u16,
    pub language: String,
    pub lang_confidence: f64,
    pub fingerprint: String,
    pub wapp: String,
    pub attributes: Vec<Attribute>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl PageRecord {
    /// `key_points`, pipe-joined, per the storage column contract.
    pub fn key_points_joined(&self) -> String {
        self.key_points.join("|")
    }

    /// `keywords`, comma-joined, per the storage column contract.
    pub fn keywords_joined(&self) -> String {
        self.keywords.join(",")
    }

    /// `attributes` rendered to a JSON array, mirroring the relational
    /// `attributes` rows for collaborators (the sink, export) that want a
    /// single self-contained blob instead of a join.
    pub fn attributes_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.attributes).unwrap_or(serde_json::Value::Null)
    }
}
