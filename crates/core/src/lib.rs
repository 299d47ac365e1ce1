pub mod config;
pub mod error;
pub mod helpers;
pub mod types;

pub use config::AppConfig;
pub use error::CrawlError;
pub use helpers::{dedup_sorted, escape_mysql_string, md5_fingerprint};
pub use types::*;
