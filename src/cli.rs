use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "onioncrawl", about = "Hidden-service crawler & entity extractor")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Path to a blacklist file, one regex per line
    #[arg(short = 'b', long)]
    pub blacklist: Option<String>,

    /// Maximum crawl depth
    #[arg(short = 'd', long)]
    pub depth: Option<u32>,

    /// Number of workers
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Parallelism per worker
    #[arg(short = 'p', long)]
    pub parallelism: Option<usize>,

    /// Info-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Debug-level logging
    #[arg(short = 'x', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start crawling from seed URLs
    Crawl {
        /// Seed URLs (comma-separated)
        #[arg(short, long)]
        seeds: Option<String>,

        /// Single seed URL
        #[arg(long)]
        seed: Option<String>,
    },
    /// Search crawled pages by domain
    Search {
        /// Domain to search within
        #[arg(short, long)]
        domain: Option<String>,

        /// Max results
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Show crawl status and database stats
    Status,
    /// Export crawled data
    Export {
        /// Output format (json, sql)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file
        #[arg(short, long)]
        output: String,
    },
}
