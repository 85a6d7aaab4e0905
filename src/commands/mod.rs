mod cache;
mod connect;
mod history;
mod validate;

pub use cache::run_cache;
pub use connect::run_connect;
pub use history::run_history;
pub use validate::run_validate;

use mosi_controller::{Config, FileStorage, HistoryStore};
use std::sync::Arc;

/// History store backed by the configured storage directory.
fn history_store(config: &Config) -> anyhow::Result<HistoryStore> {
    let storage = FileStorage::new(config.storage_dir()?);
    Ok(HistoryStore::new(Arc::new(storage)))
}
