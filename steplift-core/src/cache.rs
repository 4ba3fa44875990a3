//! Scan cache keyed by category
//!
//! Scanning the whole corpus on every request is what the cache avoids. An
//! entry is filled on the first request for its category and then returned
//! as-is until [`ScanCache::reset`]. There is no freshness check and no TTL:
//! results can go stale relative to files edited on disk, and only an explicit
//! reset picks those edits up. Do not "fix" this with mtime checks; callers
//! rely on ids staying valid for as long as the cached result lives.
//!
//! Exclusive access comes from `&mut self`; hosts that share one cache across
//! threads must wrap it in a mutex.
//!
//! **Persistence:** one-shot hosts such as the CLI keep the cache between runs
//! as zstd-compressed JSON at `.steplift/scan-cache.json.zst` under the corpus
//! root. A missing or unreadable file is a cold start, never an error.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::error::StepError;
use crate::index::{index, ScanResult};
use crate::scanner::{Category, StepPattern};

/// Directory (under the corpus root) holding persisted state
const STATE_DIR: &str = ".steplift";

/// Category-keyed scan results
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: HashMap<Category, ScanResult>,
}

/// On-disk form: JSON maps need string keys, so entries are stored as a list
#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    category: Category,
    result: ScanResult,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `category`, scanning `corpus` on a miss
    ///
    /// `kinds` supplies the prefixes for [`Category::All`]. A hit never
    /// touches the corpus.
    pub fn get_or_scan<C: Corpus>(
        &mut self,
        category: &Category,
        kinds: &[String],
        corpus: &C,
    ) -> Result<&ScanResult, StepError> {
        match self.entries.entry(category.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!(category = category.label(), "scan cache hit");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                tracing::debug!(category = category.label(), "scan cache miss, scanning corpus");
                let pattern = StepPattern::new(category, kinds)?;
                let documents = corpus.open_documents();
                let result = index(&documents, &pattern, "")?;
                Ok(entry.insert(result))
            }
        }
    }

    /// Cached result for `category`, without scanning
    pub fn get(&self, category: &Category) -> Option<&ScanResult> {
        self.entries.get(category)
    }

    /// Drop every cached category
    pub fn reset(&mut self) {
        tracing::debug!(entries = self.entries.len(), "scan cache reset");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the persisted cache for a corpus root
    ///
    /// Returns an empty cache on cold start (file absent) or on read/decompress
    /// error (non-fatal).
    pub fn load(root: &Path) -> Self {
        let path = cache_path(root);
        if !path.exists() {
            return Self::new();
        }
        match load_compressed_json(&path) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("failed to load scan cache (proceeding cold): {e:#}");
                Self::new()
            }
        }
    }

    /// Persist the cache under a corpus root (zstd level 3)
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = cache_path(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        // Sorted by label so identical caches produce identical files
        let mut entries: Vec<PersistedEntry> = self
            .entries
            .iter()
            .map(|(category, result)| PersistedEntry {
                category: category.clone(),
                result: result.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.category.label().cmp(b.category.label()));

        let json = serde_json::to_string(&entries).context("failed to serialize scan cache")?;
        let compressed =
            zstd::encode_all(json.as_bytes(), 3).context("failed to compress scan cache")?;
        std::fs::write(&path, &compressed)
            .with_context(|| format!("failed to write scan cache: {}", path.display()))
    }

    /// Delete the persisted cache; returns whether a file was removed
    pub fn remove_persisted(root: &Path) -> Result<bool> {
        let path = cache_path(root);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove scan cache: {}", path.display()))?;
        Ok(true)
    }
}

/// Location of the persisted cache for a corpus root
pub fn cache_path(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join("scan-cache.json.zst")
}

fn load_compressed_json(path: &Path) -> Result<ScanCache> {
    let compressed = std::fs::read(path)
        .with_context(|| format!("failed to read scan cache: {}", path.display()))?;
    let bytes = zstd::decode_all(compressed.as_slice())
        .with_context(|| format!("failed to decompress scan cache: {}", path.display()))?;
    let json = std::str::from_utf8(&bytes).context("scan cache is not valid UTF-8")?;
    let entries: Vec<PersistedEntry> =
        serde_json::from_str(json).context("failed to parse scan cache JSON")?;
    Ok(ScanCache {
        entries: entries
            .into_iter()
            .map(|entry| (entry.category, entry.result))
            .collect(),
    })
}
