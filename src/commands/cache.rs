use super::history_store;
use crate::cli::CacheCommands;
use crate::output::UserOutput;
use mosi_controller::cache::{
    AssetCacheManager, AssetFetcher, AssetResponse, FileCacheStorage, HttpFetcher, Interception,
};
use mosi_controller::session::{InstallOutcome, ShellSession};
use mosi_controller::{Config, ConnectionOrchestrator};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Upper bound for a single asset download.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_cache(
    cmd: &CacheCommands,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let origin = config.origin_url()?;
    let fetcher = Arc::new(HttpFetcher::new(origin.clone(), FETCH_TIMEOUT)?);
    let storage = Arc::new(FileCacheStorage::new(config.cache_dir()?));
    let manager = Arc::new(AssetCacheManager::new(
        config.manifest(),
        origin,
        storage,
        fetcher.clone(),
    )?);

    match cmd {
        CacheCommands::Install => install(&manager, out).await,
        CacheCommands::Activate => activate(&manager, out).await,
        CacheCommands::Update => update(config, manager, out).await,
        CacheCommands::Status { json } => status(&manager, *json, out),
        CacheCommands::Fetch { url, output } => {
            let url = Url::parse(url)
                .map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", url, e))?;
            let response = fetch(&manager, fetcher.as_ref(), &url, out).await?;
            if let Some(path) = output {
                std::fs::write(path, &response.body)?;
                out.status(&format!("Wrote {} bytes to {}", response.body.len(), path.display()));
            }
            Ok(())
        }
    }
}

async fn install(manager: &AssetCacheManager, out: &dyn UserOutput) -> anyhow::Result<()> {
    out.progress(&format!(
        "Installing {} ({} assets)... ",
        manager.current_bucket(),
        manager.manifest().assets.len()
    ));

    match manager.install().await {
        Ok(count) => {
            out.finish_progress("done");
            out.success(&format!("Cached {} assets in {}", count, manager.current_bucket()));
            out.status("Run `mosi cache activate` to remove older generations.");
            Ok(())
        }
        Err(e) => {
            // Install failure is absorbed: warn and keep the previous generation
            out.finish_progress("failed");
            out.warning(&format!("Offline cache not updated: {}", e));
            out.status("The previous cache generation, if any, keeps serving.");
            Ok(())
        }
    }
}

async fn activate(manager: &AssetCacheManager, out: &dyn UserOutput) -> anyhow::Result<()> {
    let deleted = manager.activate().await?;
    if deleted.is_empty() {
        out.status("No stale cache generations");
    }
    for bucket in &deleted {
        out.status(&format!("Deleted {}", bucket));
    }
    out.success(&format!("Activated {}", manager.current_bucket()));
    Ok(())
}

async fn update(
    config: &Config,
    manager: Arc<AssetCacheManager>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let orchestrator = ConnectionOrchestrator::builder()
        .history(history_store(config)?)
        .probe_timeout(config.probe_timeout()?)
        .build()?;
    let session = ShellSession::new(Arc::new(orchestrator)).with_cache(manager.clone());

    if !session.capture_install_prompt() {
        out.status(&format!("{} is already active", manager.current_bucket()));
        return Ok(());
    }

    match session.accept_install_prompt().await {
        InstallOutcome::Installed { assets, removed } => {
            for bucket in &removed {
                out.status(&format!("Deleted {}", bucket));
            }
            out.success(&format!(
                "Installed {} assets and activated {}",
                assets,
                manager.current_bucket()
            ));
        }
        InstallOutcome::Failed(reason) => {
            out.warning(&format!("Offline cache not updated: {}", reason));
            out.warning("The previous cache generation, if any, keeps serving.");
        }
        InstallOutcome::NotOffered => {}
    }
    Ok(())
}

fn status(manager: &AssetCacheManager, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let status = manager.status()?;

    if json {
        out.data(&serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    out.data(&format!("State:   {}", status.state));
    out.data(&format!("Version: {}", status.version));
    match status.current_entries {
        Some(entries) => out.data(&format!(
            "Current: {} ({} entries)",
            status.current_bucket, entries
        )),
        None => out.data(&format!("Current: {} (not installed)", status.current_bucket)),
    }

    let stale: Vec<_> = status
        .buckets
        .iter()
        .filter(|b| **b != status.current_bucket)
        .collect();
    if !stale.is_empty() {
        out.data("Stale generations:");
        for bucket in stale {
            out.data(&format!("  {}", bucket));
        }
    }
    Ok(())
}

async fn fetch(
    manager: &AssetCacheManager,
    fetcher: &dyn AssetFetcher,
    url: &Url,
    out: &dyn UserOutput,
) -> anyhow::Result<AssetResponse> {
    let (response, source) = match manager.intercept(url).await? {
        Interception::Bypass => {
            out.status("Appliance traffic bypasses the cache");
            (fetcher.fetch(url).await?, "network".to_string())
        }
        Interception::Respond { response, source } => (response, source.to_string()),
    };

    out.data(&format!(
        "{} {} {} bytes ({})",
        response.status,
        response.content_type.as_deref().unwrap_or("-"),
        response.body.len(),
        source
    ));
    Ok(response)
}
