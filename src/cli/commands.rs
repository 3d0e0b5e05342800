use anyhow::{Result, Context};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn, info_span, Instrument};
use crate::crawler::{CrawlOutcome, CrawlerController, Seeded, ShutdownHandle};
use crate::cli::config::CrawlerConfig;
use crate::storage::DedupStoreFactory;

/// Start a crawl, or resume the one a previous interrupt left behind
pub async fn crawl(urls: Vec<String>, dest: Option<PathBuf>, workers: Option<usize>, profile: Option<String>) -> Result<()> {
    let mut config = CrawlerConfig::load(profile.as_deref())?;

    // Override configuration with command line parameters if provided
    if let Some(dir) = dest {
        config.storage.pages.dest_dir = dir;
    }

    if let Some(w) = workers {
        config.crawler.workers = w;
    }

    let run_id = uuid::Uuid::new_v4();
    run_crawl(config, urls).instrument(info_span!("crawl", %run_id)).await
}

async fn run_crawl(config: CrawlerConfig, urls: Vec<String>) -> Result<()> {
    // Listen before the frontier is restored: restoring consumes the saved
    // pending list, so an early interrupt must still reach the drain
    let shutdown = ShutdownHandle::new();
    let listener = shutdown.listen_for_ctrl_c();

    let (controller, seeded) = CrawlerController::new(&config, &urls).await?;

    match seeded {
        Seeded::Resumed(n) => info!("Resuming interrupted crawl with {} pending URLs", n),
        Seeded::Fresh(0) => anyhow::bail!(
            "Nothing to crawl: no pending URLs from a previous run and no new seed URLs (try `crawler reset`)"
        ),
        Seeded::Fresh(n) => info!("Starting fresh crawl from {} seed URLs", n),
    }

    let outcome = controller.run(&shutdown).await;
    listener.abort();

    let metrics = controller.metrics().get_metrics().await;
    info!(
        fetched = metrics.pages_fetched,
        failed = metrics.fetch_failures,
        bytes = metrics.bytes_downloaded,
        admitted = metrics.links_admitted,
        mean_fetch_ms = metrics.mean_fetch_millis(),
        "Crawl summary"
    );

    match outcome? {
        CrawlOutcome::Completed { pages } => {
            println!("Crawl complete: {} URLs processed, pages in {}", pages, config.storage.pages.dest_dir.display());
        }
        CrawlOutcome::Interrupted { persisted } => {
            println!("Interrupted: {} pending URLs saved, run `crawler crawl` again to resume", persisted);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct StoreStatus {
    backend: String,
    recorded_urls: usize,
    pending_urls: usize,
}

/// Show how many URLs are recorded and how many are waiting for a resume
pub async fn status(profile: Option<String>, json: bool) -> Result<()> {
    let config = CrawlerConfig::load(profile.as_deref())?;
    let store = DedupStoreFactory::create(&config.storage.dedup).await?;

    let status = StoreStatus {
        backend: config.storage.dedup.backend.clone(),
        recorded_urls: store.seen_count().await?,
        pending_urls: store.pending_count().await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Backend: {}", status.backend);
        println!("Recorded URLs: {}", status.recorded_urls);
        println!("Pending URLs (saved for resume): {}", status.pending_urls);
    }

    Ok(())
}

/// Clear every dedup record and the saved pending list
pub async fn reset(profile: Option<String>) -> Result<()> {
    let config = CrawlerConfig::load(profile.as_deref())?;
    let store = DedupStoreFactory::create(&config.storage.dedup).await?;

    let recorded = store.seen_count().await?;
    store.clear().await.context("Failed to clear dedup store")?;

    warn!("Forgot {} recorded URLs; they may be fetched again", recorded);
    println!("Dedup store cleared");

    Ok(())
}

/// List all available configuration profiles
pub async fn list_profiles() -> Result<()> {
    let profiles = CrawlerConfig::list_profiles().await?;

    println!("Available configuration profiles:");
    for profile in profiles {
        println!("  - {}", profile);
    }

    Ok(())
}

/// Manage a specific configuration profile
pub async fn manage_profile(profile_name: String) -> Result<()> {
    match CrawlerConfig::load_profile(&profile_name) {
        Ok(config) => {
            println!("Profile: {}", profile_name);
            println!("{:#?}", config);
        },
        Err(_) => {
            // Profile doesn't exist, create a new one
            warn!("Profile '{}' does not exist. Creating a default profile.", profile_name);
            let config = CrawlerConfig::default();
            config.save_as_profile(&profile_name).await?;
            println!("Created default profile: {}", profile_name);
        }
    }

    Ok(())
}

/// Show the current configuration
pub async fn show_config() -> Result<()> {
    let config = CrawlerConfig::load_default()?;
    println!("Current configuration:");
    println!("{:#?}", config);

    Ok(())
}
