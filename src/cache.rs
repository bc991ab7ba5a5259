//! Caller-owned memoization of loaded datasets.
//!
//! A dataset is reloaded only when its file's modification time or length
//! changes. Loading is pure, so two caches racing on the same file can at
//! worst do redundant work.

use crate::error::LoadError;
use crate::loader::{self, LoadReport};
use crate::types::Observation;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// The long table plus what happened while building it.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub observations: Vec<Observation>,
    pub report: LoadReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self, LoadError> {
        let meta = std::fs::metadata(path).map_err(|source| LoadError::io(path, source))?;
        Ok(Fingerprint {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, (Fingerprint, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, loading it on a miss or when the
    /// file changed since it was cached.
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<Dataset>, LoadError> {
        let fingerprint = Fingerprint::of(path)?;
        if let Some((cached, dataset)) = self.entries.get(path) {
            if *cached == fingerprint {
                debug!(path = %path.display(), "dataset cache hit");
                return Ok(Arc::clone(dataset));
            }
            info!(path = %path.display(), "data file changed, reloading");
        }
        let (observations, report) = loader::load(path)?;
        let dataset = Arc::new(Dataset {
            observations,
            report,
        });
        self.entries
            .insert(path.to_path_buf(), (fingerprint, Arc::clone(&dataset)));
        Ok(dataset)
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "question_id,question_categorie,categorie_model,model A,token A,time A (sec),score A,cost A (€),electricity A (wh),co2 A (g),model B,token B,time B (sec),score B,cost B (€),electricity B (wh),co2 B (g)";
    const ROW: &str = "q1,chat,small,gpt-x,100,2,4,0.01,1,10,gpt-y,80,1,3,0.02,0.5,5";

    #[test]
    fn second_lookup_reuses_the_loaded_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, format!("{HEADER}\n{ROW}\n")).unwrap();

        let mut cache = DatasetCache::new();
        let first = cache.get_or_load(&path).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.observations.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn changed_file_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, format!("{HEADER}\n{ROW}\n")).unwrap();

        let mut cache = DatasetCache::new();
        let first = cache.get_or_load(&path).unwrap();
        fs::write(&path, format!("{HEADER}\n{ROW}\n{ROW}\n")).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.observations.len(), 4);
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, format!("{HEADER}\n{ROW}\n")).unwrap();

        let mut cache = DatasetCache::new();
        let first = cache.get_or_load(&path).unwrap();
        cache.invalidate(&path);
        assert!(cache.is_empty());
        let second = cache.get_or_load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.observations, second.observations);
    }

    #[test]
    fn missing_file_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let mut cache = DatasetCache::new();
        let err = cache.get_or_load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }));
        assert!(cache.is_empty());
    }
}
