use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One artifact entry: named output files keyed by kind ("txt", "md", ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    paths: HashMap<String, String>,
    #[serde(default)]
    meta: EntryMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EntryMeta {
    name: Option<String>,
    date: Option<String>,
}

/// Listing row for one stored artifact
#[derive(Debug, Clone)]
pub struct ArtifactSummary {
    pub id: String,
    pub name: String,
    pub date: Option<String>,
    pub paths: HashMap<String, String>,
}

/// Registry of generated artifact files, persisted as JSON.
///
/// Entry ids are fresh UUIDs and every mutation runs under one lock, so a
/// given artifact id only ever has a single writer. Entries whose files no
/// longer exist on disk are dropped at open time.
pub struct ArtifactStore {
    path: PathBuf,
    base: PathBuf,
    cache: Mutex<HashMap<String, StoredEntry>>,
}

impl ArtifactStore {
    /// Open (or create) the store at `path`; relative artifact paths are
    /// resolved against `base` when checking for stale entries
    pub fn open(path: &Path, base: &Path) -> Result<Self> {
        let mut cache: HashMap<String, StoredEntry> = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read artifact store: {:?}", path))?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        cache.retain(|_, entry| {
            match entry.paths.values().next() {
                Some(first) => base.join(first).exists(),
                None => true,
            }
        });

        let store = Self {
            path: path.to_path_buf(),
            base: base.to_path_buf(),
            cache: Mutex::new(cache),
        };
        store.persist()?;
        Ok(store)
    }

    fn persist(&self) -> Result<()> {
        let cache = self.cache.lock().expect("artifact store lock poisoned");
        let raw = serde_json::to_string_pretty(&*cache).context("Failed to encode artifact store")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write artifact store: {:?}", self.path))
    }

    /// Record a new artifact and return its id
    pub fn insert(&self, name: &str, paths: HashMap<String, String>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        {
            let mut cache = self.cache.lock().expect("artifact store lock poisoned");
            cache.insert(
                id.clone(),
                StoredEntry {
                    paths,
                    meta: EntryMeta {
                        name: Some(name.to_string()),
                        date: Some(Local::now().format("%Y-%m-%d").to_string()),
                    },
                },
            );
        }
        self.persist()?;
        Ok(id)
    }

    /// Paths for one artifact id
    pub fn get(&self, id: &str) -> Option<HashMap<String, String>> {
        let cache = self.cache.lock().expect("artifact store lock poisoned");
        cache.get(id).map(|entry| entry.paths.clone())
    }

    /// All stored artifacts
    pub fn list(&self) -> Vec<ArtifactSummary> {
        let cache = self.cache.lock().expect("artifact store lock poisoned");
        cache
            .iter()
            .map(|(id, entry)| ArtifactSummary {
                id: id.clone(),
                name: entry.meta.name.clone().unwrap_or_else(|| id.clone()),
                date: entry.meta.date.clone(),
                paths: entry.paths.clone(),
            })
            .collect()
    }

    /// Remove one artifact entry (the files themselves are left alone)
    pub fn remove(&self, id: &str) -> Result<()> {
        {
            let mut cache = self.cache.lock().expect("artifact store lock poisoned");
            cache.remove(id);
        }
        self.persist()
    }

    /// Base directory relative artifact paths resolve against
    pub fn base(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("acta.md");
        std::fs::write(&artifact, "## acta").unwrap();

        let store = ArtifactStore::open(&dir.path().join("store.json"), dir.path()).unwrap();

        let mut paths = HashMap::new();
        paths.insert("md".to_string(), "acta.md".to_string());
        let id = store.insert("comite_marzo", paths).unwrap();

        assert_eq!(store.get(&id).unwrap()["md"], "acta.md");
        let listing = store.list();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "comite_marzo");

        store.remove(&id).unwrap();
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_open_drops_entries_with_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        let artifact = dir.path().join("existe.md");
        std::fs::write(&artifact, "x").unwrap();

        {
            let store = ArtifactStore::open(&store_path, dir.path()).unwrap();
            let mut kept = HashMap::new();
            kept.insert("md".to_string(), "existe.md".to_string());
            store.insert("se_queda", kept).unwrap();
            let mut gone = HashMap::new();
            gone.insert("md".to_string(), "borrado.md".to_string());
            store.insert("se_va", gone).unwrap();
        }

        let reopened = ArtifactStore::open(&store_path, dir.path()).unwrap();
        let listing = reopened.list();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "se_queda");
    }

    #[test]
    fn test_ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(&dir.path().join("store.json"), dir.path()).unwrap();

        let a = store.insert("a", HashMap::new()).unwrap();
        let b = store.insert("b", HashMap::new()).unwrap();
        assert_ne!(a, b);
    }
}
