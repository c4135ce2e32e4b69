//! Parsed-template cache.
//!
//! Each template file is read and compiled at most once per cache. The cache
//! is owned by the caller and passed by reference; there is no global
//! instance.

use super::document::Template;
use super::error::TemplateError;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<FxHashMap<PathBuf, Arc<Template>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, or return the already compiled template.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Template>, TemplateError> {
        self.get_or_insert_with(path, || Template::load(path))
    }

    /// Return the cached template for `path`, compiling it with `load` on a miss.
    ///
    /// `load` runs at most once per path, even under concurrent callers. A
    /// failed load is not cached.
    pub fn get_or_insert_with(
        &self,
        path: &Path,
        load: impl FnOnce() -> Result<Template, TemplateError>,
    ) -> Result<Arc<Template>, TemplateError> {
        // Fast path: read lock only
        if let Some(template) = self.entries.read().get(path) {
            return Ok(Arc::clone(template));
        }

        let mut entries = self.entries.write();
        // Double-check after acquiring write lock
        if let Some(template) = entries.get(path) {
            return Ok(Arc::clone(template));
        }

        let template = Arc::new(load()?);
        entries.insert(path.to_path_buf(), Arc::clone(&template));
        Ok(template)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_load_once_under_contention() {
        let cache = TemplateCache::new();
        let loads = AtomicUsize::new(0);
        let path = Path::new("virtual/item.txt");

        let templates: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| {
                cache
                    .get_or_insert_with(path, || {
                        loads.fetch_add(1, Ordering::SeqCst);
                        Ok(Template::from_text("{id}"))
                    })
                    .unwrap()
            })
            .collect();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert!(templates.iter().all(|t| Arc::ptr_eq(t, &templates[0])));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.json");
        let cache = TemplateCache::new();

        assert!(cache.get_or_load(&path).is_err());
        assert!(cache.is_empty());

        fs::write(&path, r#"{"id": "{id}"}"#).unwrap();
        let template = cache.get_or_load(&path).unwrap();
        assert_eq!(template.placeholders().len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
