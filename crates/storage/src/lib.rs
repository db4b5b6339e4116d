pub mod files;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use forge_core::CanonicalModel;
use parking_lot::RwLock;
use tracing::debug;

pub use files::{read_json, read_tree, reset_dir, write_json, write_tab_json, write_tree};

/// Source of canonical models, one per locale.
///
/// `get` may serve a cached copy; `invalidate` forces the next `get` to read
/// the backing store again.
pub trait ModelStore: Send + Sync {
    fn get(&self, locale: &str) -> Result<Arc<CanonicalModel>>;
    fn invalidate(&self, locale: &str);
    /// Whether a model exists for `locale`, valid or not.
    fn contains(&self, locale: &str) -> bool;
    fn put(&self, locale: &str, model: &CanonicalModel) -> Result<()>;
    fn locales(&self) -> Result<Vec<String>>;
}

/// Models stored as `<dir>/<locale>.json`.
#[derive(Debug)]
pub struct FsModelStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<CanonicalModel>>>,
}

impl FsModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self, locale: &str) -> PathBuf {
        self.dir.join(format!("{locale}.json"))
    }
}

impl ModelStore for FsModelStore {
    fn get(&self, locale: &str) -> Result<Arc<CanonicalModel>> {
        if let Some(model) = self.cache.read().get(locale) {
            return Ok(Arc::clone(model));
        }

        let path = self.model_path(locale);
        let document = read_json(&path)?;
        let model = CanonicalModel::from_document(document, locale)
            .with_context(|| format!("invalid model {}", path.display()))?;
        debug!(locale, path = %path.display(), "loaded canonical model");

        let model = Arc::new(model);
        self.cache
            .write()
            .insert(locale.to_string(), Arc::clone(&model));
        Ok(model)
    }

    fn invalidate(&self, locale: &str) {
        self.cache.write().remove(locale);
    }

    fn contains(&self, locale: &str) -> bool {
        self.cache.read().contains_key(locale) || self.model_path(locale).is_file()
    }

    fn put(&self, locale: &str, model: &CanonicalModel) -> Result<()> {
        let document = model.to_document()?;
        write_tab_json(&self.model_path(locale), &document)?;
        self.cache
            .write()
            .insert(locale.to_string(), Arc::new(model.clone()));
        Ok(())
    }

    fn locales(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed listing {}", self.dir.display()))?;
        let mut locales = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                locales.push(stem.to_string());
            }
        }
        locales.sort();
        Ok(locales)
    }
}

#[derive(Debug, Default)]
pub struct MemoryModelStore {
    models: RwLock<HashMap<String, Arc<CanonicalModel>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(self, locale: &str, model: CanonicalModel) -> Self {
        self.models.write().insert(locale.to_string(), Arc::new(model));
        self
    }
}

impl ModelStore for MemoryModelStore {
    fn get(&self, locale: &str) -> Result<Arc<CanonicalModel>> {
        self.models
            .read()
            .get(locale)
            .cloned()
            .ok_or_else(|| anyhow!("no model for locale {locale}"))
    }

    /// The map is the source of truth, so there is nothing to drop.
    fn invalidate(&self, _locale: &str) {}

    fn contains(&self, locale: &str) -> bool {
        self.models.read().contains_key(locale)
    }

    fn put(&self, locale: &str, model: &CanonicalModel) -> Result<()> {
        self.models
            .write()
            .insert(locale.to_string(), Arc::new(model.clone()));
        Ok(())
    }

    fn locales(&self) -> Result<Vec<String>> {
        let mut locales: Vec<_> = self.models.read().keys().cloned().collect();
        locales.sort();
        Ok(locales)
    }
}
