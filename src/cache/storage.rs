use super::response::{cache_key, AssetResponse, ResponseKind};
use crate::error::{Error, Result};
use crate::storage::atomic_write;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Named buckets of cached responses.
///
/// Lookups are keyed by URL (see [`cache_key`]). Implementations:
///
/// - [`FileCacheStorage`] — one directory per bucket under a root directory
/// - [`MemoryCacheStorage`] — in-process maps, for tests and ephemeral use
pub trait CacheStorage: Send + Sync {
    /// Names of all existing buckets, sorted.
    fn keys(&self) -> Result<Vec<String>>;

    fn has(&self, bucket: &str) -> Result<bool> {
        Ok(self.keys()?.iter().any(|k| k == bucket))
    }

    /// Look up `url` in one bucket.
    fn lookup(&self, bucket: &str, url: &Url) -> Result<Option<AssetResponse>>;

    /// Store one response in an existing bucket, replacing any previous entry.
    fn put(&self, bucket: &str, response: &AssetResponse) -> Result<()>;

    /// Create or replace `bucket` with exactly `responses`, all or nothing.
    fn commit(&self, bucket: &str, responses: &[AssetResponse]) -> Result<()>;

    /// Delete `bucket`. Returns whether it existed.
    fn delete(&self, bucket: &str) -> Result<bool>;

    /// Look up `url` in `preferred` first, then in every other bucket.
    fn lookup_any(&self, preferred: &str, url: &Url) -> Result<Option<AssetResponse>> {
        if let Some(found) = self.lookup(preferred, url)? {
            return Ok(Some(found));
        }
        for bucket in self.keys()? {
            if bucket == preferred {
                continue;
            }
            if let Some(found) = self.lookup(&bucket, url)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Number of entries in `bucket`, `None` if it does not exist.
    fn entry_count(&self, bucket: &str) -> Result<Option<usize>>;
}

fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('.')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(Error::Cache(format!(
            "Bucket name '{}' is invalid. Only alphanumeric, '-', '_', and '.' allowed.",
            name
        )));
    }
    Ok(())
}

/// In-memory bucket storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, AssetResponse>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.buckets.lock().keys().cloned().collect())
    }

    fn lookup(&self, bucket: &str, url: &Url) -> Result<Option<AssetResponse>> {
        Ok(self
            .buckets
            .lock()
            .get(bucket)
            .and_then(|entries| entries.get(&cache_key(url)))
            .cloned())
    }

    fn put(&self, bucket: &str, response: &AssetResponse) -> Result<()> {
        let mut buckets = self.buckets.lock();
        let entries = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::Cache(format!("Bucket '{}' does not exist", bucket)))?;
        entries.insert(cache_key(&response.url), response.clone());
        Ok(())
    }

    fn commit(&self, bucket: &str, responses: &[AssetResponse]) -> Result<()> {
        validate_bucket_name(bucket)?;
        let entries = responses
            .iter()
            .map(|r| (cache_key(&r.url), r.clone()))
            .collect();
        self.buckets.lock().insert(bucket.to_string(), entries);
        Ok(())
    }

    fn delete(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.lock().remove(bucket).is_some())
    }

    fn entry_count(&self, bucket: &str) -> Result<Option<usize>> {
        Ok(self.buckets.lock().get(bucket).map(|entries| entries.len()))
    }
}

/// Index of one on-disk bucket.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BucketIndex {
    /// Entries by cache key
    entries: BTreeMap<String, IndexEntry>,
    /// Next body file number
    next_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    url: Url,
    status: u16,
    kind: ResponseKind,
    content_type: Option<String>,
    body_file: String,
    cached_at: DateTime<Utc>,
}

const INDEX_FILE: &str = "index.json";
const STAGING_PREFIX: &str = ".staging-";

/// Bucket storage on disk.
///
/// Layout: `<root>/<bucket>/index.json` plus one `<n>.body` file per entry.
/// A commit is staged in a hidden sibling directory and renamed into place.
#[derive(Debug, Clone)]
pub struct FileCacheStorage {
    root: PathBuf,
}

impl FileCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn read_index(dir: &Path) -> Result<Option<BucketIndex>> {
        let path = dir.join(INDEX_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Cache(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| Error::Cache(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn write_index(dir: &Path, index: &BucketIndex) -> Result<()> {
        let contents = serde_json::to_string_pretty(index)?;
        atomic_write(&dir.join(INDEX_FILE), contents.as_bytes())
    }

    /// Write `response` into `dir`, recording it in `index`.
    ///
    /// Returns the body file of the entry it replaced, if any.
    fn write_entry(
        dir: &Path,
        index: &mut BucketIndex,
        response: &AssetResponse,
    ) -> Result<Option<String>> {
        let body_file = format!("{:08}.body", index.next_id);
        index.next_id += 1;
        atomic_write(&dir.join(&body_file), &response.body)?;

        let previous = index.entries.insert(
            cache_key(&response.url),
            IndexEntry {
                url: response.url.clone(),
                status: response.status,
                kind: response.kind,
                content_type: response.content_type.clone(),
                body_file,
                cached_at: Utc::now(),
            },
        );

        Ok(previous.map(|old| old.body_file))
    }
}

impl CacheStorage for FileCacheStorage {
    fn keys(&self) -> Result<Vec<String>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Cache(format!(
                    "Failed to list {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut keys = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.path().join(INDEX_FILE).is_file() {
                continue;
            }
            keys.push(name);
        }
        keys.sort();
        Ok(keys)
    }

    fn lookup(&self, bucket: &str, url: &Url) -> Result<Option<AssetResponse>> {
        let dir = self.bucket_dir(bucket)?;
        let Some(index) = Self::read_index(&dir)? else {
            return Ok(None);
        };
        let Some(entry) = index.entries.get(&cache_key(url)) else {
            return Ok(None);
        };

        let body = fs::read(dir.join(&entry.body_file)).map_err(|e| {
            Error::Cache(format!(
                "Failed to read cached body for {}: {}",
                entry.url, e
            ))
        })?;

        Ok(Some(AssetResponse {
            url: entry.url.clone(),
            status: entry.status,
            kind: entry.kind,
            content_type: entry.content_type.clone(),
            body,
        }))
    }

    fn put(&self, bucket: &str, response: &AssetResponse) -> Result<()> {
        let dir = self.bucket_dir(bucket)?;
        let mut index = Self::read_index(&dir)?
            .ok_or_else(|| Error::Cache(format!("Bucket '{}' does not exist", bucket)))?;
        let replaced = Self::write_entry(&dir, &mut index, response)?;
        Self::write_index(&dir, &index)?;

        if let Some(body_file) = replaced {
            // Unreferenced once the new index is in place
            let _ = fs::remove_file(dir.join(body_file));
        }
        Ok(())
    }

    fn commit(&self, bucket: &str, responses: &[AssetResponse]) -> Result<()> {
        let dir = self.bucket_dir(bucket)?;
        let staging = self.root.join(format!("{}{}", STAGING_PREFIX, bucket));

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let mut index = BucketIndex::default();
        let staged = responses
            .iter()
            .try_for_each(|response| Self::write_entry(&staging, &mut index, response).map(|_| ()))
            .and_then(|()| Self::write_index(&staging, &index));
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::rename(&staging, &dir).map_err(|e| {
            Error::Cache(format!(
                "Failed to move staged bucket into {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(())
    }

    fn delete(&self, bucket: &str) -> Result<bool> {
        let dir = self.bucket_dir(bucket)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Cache(format!(
                "Failed to delete bucket '{}': {}",
                bucket, e
            ))),
        }
    }

    fn entry_count(&self, bucket: &str) -> Result<Option<usize>> {
        let dir = self.bucket_dir(bucket)?;
        Ok(Self::read_index(&dir)?.map(|index| index.entries.len()))
    }
}
