use anyhow::Result;
use onioncrawl_core::config::AppConfig;
use onioncrawl_core::escape_mysql_string;
use onioncrawl_storage::Storage;
use std::io::Write;

pub async fn run_status(config: AppConfig) -> Result<()> {
    let storage = Storage::new(&config.database.mysql_url).await?;

    match storage.check_connectivity().await {
        Ok(()) => println!("Database: connected"),
        Err(e) => {
            println!("Database: ERROR - {}", e);
            return Ok(());
        }
    }

    storage.run_migrations().await?;
    let pages = storage.get_page_count().await?;

    println!("\n╔══════════════════════════════════════════════╗");
    println!("║           onioncrawl status                  ║");
    println!("╠══════════════════════════════════════════════╣");
    println!("║ Pages crawled:      {:>20}    ║", pages);
    println!("╚══════════════════════════════════════════════╝\n");

    Ok(())
}

pub async fn run_search(config: AppConfig, domain: Option<String>, limit: i64) -> Result<()> {
    let storage = Storage::new(&config.database.mysql_url).await?;

    let pages = match domain {
        Some(d) => storage.search_by_domain(&d, limit).await?,
        None => storage.all_pages(limit).await?,
    };

    println!("Found {} pages:\n", pages.len());
    for page in pages {
        println!("  [{}] {} - {}", page.domain, page.url, page.title);
    }

    Ok(())
}

pub async fn run_export(config: AppConfig, format: &str, output: &str) -> Result<()> {
    let storage = Storage::new(&config.database.mysql_url).await?;
    let pages = storage.all_pages(i64::MAX).await?;

    let mut file = std::fs::File::create(output)?;

    match format {
        "json" => {
            for page in &pages {
                let line = serde_json::to_string(page)?;
                writeln!(file, "{line}")?;
            }
        }
        "sql" => {
            for page in &pages {
                writeln!(
                    file,
                    "INSERT INTO pages (url, title, summary, domain, fingerprint) VALUES ('{}', '{}', '{}', '{}', '{}');",
                    escape_mysql_string(&page.url),
                    escape_mysql_string(&page.title),
                    escape_mysql_string(&page.summary),
                    escape_mysql_string(&page.domain),
                    escape_mysql_string(&page.fingerprint),
                )?;
            }
        }
        other => {
            println!("Unsupported format: {other}. Use 'json' or 'sql'.");
            return Ok(());
        }
    }

    println!("Exported {} pages to {}", pages.len(), output);
    Ok(())
}
