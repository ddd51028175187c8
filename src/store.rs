//! In-memory config store: target name -> connection parameters, in registration order.

use crate::error::AppError;
use crate::settings::ConnectionDefaults;
use crate::target::TargetConfig;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A stored config plus the store-wide revision assigned when it was written.
#[derive(Clone, Debug)]
pub struct StoredTarget {
    pub config: Arc<TargetConfig>,
    pub revision: u64,
}

#[derive(Default)]
struct StoreInner {
    order: Vec<String>,
    by_name: HashMap<String, StoredTarget>,
    next_revision: u64,
}

pub struct ConfigStore {
    defaults: ConnectionDefaults,
    inner: RwLock<StoreInner>,
}

impl ConfigStore {
    pub fn new(defaults: ConnectionDefaults) -> Self {
        ConfigStore {
            defaults,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    pub fn defaults(&self) -> &ConnectionDefaults {
        &self.defaults
    }

    /// Validate, normalize and store `config` under `name`, replacing any previous entry in place.
    pub fn put(&self, name: &str, config: TargetConfig) -> Result<StoredTarget, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(crate::error::ConfigError::MissingField("name").into());
        }
        config.validate()?;
        let config = Arc::new(config.normalized(&self.defaults)?);

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.next_revision += 1;
        let stored = StoredTarget {
            config,
            revision: inner.next_revision,
        };
        if inner.by_name.insert(name.to_string(), stored.clone()).is_none() {
            inner.order.push(name.to_string());
        }
        tracing::debug!(target_name = %name, revision = stored.revision, "target stored");
        Ok(stored)
    }

    /// Names are matched after trimming, the same way `put` stores them.
    pub fn get(&self, name: &str) -> Result<StoredTarget, AppError> {
        let name = name.trim();
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("target '{}'", name)))
    }

    pub fn list(&self) -> Vec<(String, Arc<TargetConfig>)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|name| inner.by_name.get(name).map(|s| (name.clone(), s.config.clone())))
            .collect()
    }

    pub fn remove(&self, name: &str) -> Result<(), AppError> {
        let name = name.trim();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.by_name.remove(name).is_none() {
            return Err(AppError::NotFound(format!("target '{}'", name)));
        }
        inner.order.retain(|n| n != name);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
