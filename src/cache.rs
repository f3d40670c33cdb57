use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::deal::Store;

/// Per-store sets of deal ids that have already been announced.
///
/// Backed by a JSON file of the form `{"Steam": ["42"], "Epic": []}`.
/// Entries are only ever inserted; the whole cache can be reset at once.
#[derive(Debug, Clone)]
pub struct DealCache {
    path: PathBuf,
    posted: BTreeMap<Store, BTreeSet<String>>,
}

impl DealCache {
    /// Empty cache bound to `path`, nothing read or written
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        let posted = Store::ALL
            .iter()
            .map(|store| (*store, BTreeSet::new()))
            .collect();
        Self {
            path: path.into(),
            posted,
        }
    }

    /// Load the cache from disk. A missing or unreadable file yields an
    /// empty cache so the bot always starts.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            info!("No deal cache at {}, starting empty", path.display());
            return Self::empty(path);
        }
        match Self::read(&path) {
            Ok(posted) => {
                let mut cache = Self::empty(path);
                for (store, ids) in posted {
                    cache.posted.entry(store).or_default().extend(ids);
                }
                info!(
                    "Loaded deal cache from {} ({} ids)",
                    cache.path.display(),
                    cache.len()
                );
                cache
            }
            Err(e) => {
                error!("Failed to load deal cache: {:#}", e);
                Self::empty(path)
            }
        }
    }

    fn read(path: &Path) -> Result<Vec<(Store, Vec<String>)>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deal cache: {}", path.display()))?;
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse deal cache: {}", path.display()))?;

        // unknown keys are ignored; a store whose value is not a list is empty
        let entries = Store::ALL
            .into_iter()
            .map(|store| {
                let ids: Vec<String> = match raw.get(&store.to_string()) {
                    Some(serde_json::Value::Array(values)) => values
                        .iter()
                        .map(|v| match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    Some(other) => {
                        warn!("Ignoring non-list {} entry in deal cache: {}", store, other);
                        Vec::new()
                    }
                    None => Vec::new(),
                };
                (store, ids)
            })
            .collect();
        Ok(entries)
    }

    /// Write the current sets to disk, replacing the previous file
    pub fn save(&self) -> Result<()> {
        let snapshot: BTreeMap<String, Vec<&String>> = self
            .posted
            .iter()
            .map(|(store, ids)| (store.to_string(), ids.iter().collect()))
            .collect();
        let json = serde_json::to_string(&snapshot).context("Failed to serialize deal cache")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }
        }
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write deal cache: {}", self.path.display()))?;
        Ok(())
    }

    /// Save, logging instead of failing
    pub fn persist(&self) {
        if let Err(e) = self.save() {
            error!("Failed to save deal cache: {:#}", e);
        }
    }

    /// Drop every id and persist the empty cache
    pub fn reset(&mut self) {
        for ids in self.posted.values_mut() {
            ids.clear();
        }
        self.persist();
        warn!("Deal cache has been reset");
    }

    pub fn contains(&self, store: Store, id: &str) -> bool {
        self.posted
            .get(&store)
            .map(|ids| ids.contains(id))
            .unwrap_or(false)
    }

    /// Record an id as announced. Returns false if it was already present.
    pub fn insert(&mut self, store: Store, id: impl Into<String>) -> bool {
        self.posted.entry(store).or_default().insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.posted.values().map(BTreeSet::len).sum()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
pub(crate) fn temp_cache_path() -> PathBuf {
    std::env::temp_dir().join(format!("dealbot-cache-{}.json", uuid::Uuid::new_v4()))
}
