//! Per-caller bindings: which target each caller selected and the live handle built for it.

use crate::connection::{ConnectionFactory, TargetConnection};
use crate::error::AppError;
use crate::store::ConfigStore;
use crate::target::TargetConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Stable identity of the calling machine, as resolved by the boundary layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerKey(String);

impl CallerKey {
    pub fn new(key: impl Into<String>) -> Self {
        CallerKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<std::net::IpAddr> for CallerKey {
    fn from(ip: std::net::IpAddr) -> Self {
        CallerKey(ip.to_string())
    }
}

/// A caller's selected target and the handle opened from its config.
pub struct TenantBinding {
    pub target: String,
    /// Config snapshot the handle was opened from.
    pub config: Arc<TargetConfig>,
    /// Store revision of `config`; a re-registered target gets a new one.
    pub revision: u64,
    pub connection: Arc<dyn TargetConnection>,
}

impl fmt::Debug for TenantBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantBinding")
            .field("target", &self.target)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Already bound to the same target at the same revision; nothing was opened.
    Unchanged,
    /// A new handle was opened and installed.
    Switched,
}

#[derive(Default)]
struct TenantSlot {
    /// Serializes switches for one caller; held across the connection open.
    switching: Mutex<()>,
    binding: RwLock<Option<Arc<TenantBinding>>>,
}

impl TenantSlot {
    fn current(&self) -> Option<Arc<TenantBinding>> {
        self.binding.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn replace(&self, next: Arc<TenantBinding>) -> Option<Arc<TenantBinding>> {
        self.binding
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(next)
    }
}

/// Caller key -> binding. The map lock is only held for lookups and inserts, never across I/O.
#[derive(Default)]
pub struct TenantRegistry {
    slots: RwLock<HashMap<CallerKey, Arc<TenantSlot>>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        TenantRegistry {
            slots: RwLock::new(HashMap::new()),
        }
    }

    fn slot(&self, caller: &CallerKey) -> Option<Arc<TenantSlot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(caller)
            .cloned()
    }

    fn slot_or_insert(&self, caller: &CallerKey) -> Arc<TenantSlot> {
        if let Some(slot) = self.slot(caller) {
            return slot;
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(caller.clone())
            .or_default()
            .clone()
    }

    /// Drop a slot that never got a binding, unless another switch is already holding it.
    fn prune_if_unbound(&self, caller: &CallerKey, slot: &Arc<TenantSlot>) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let idle = slots.get(caller).is_some_and(|held| {
            Arc::ptr_eq(held, slot) && Arc::strong_count(held) == 2 && held.current().is_none()
        });
        if idle {
            slots.remove(caller);
        }
    }

    /// Callers with a slot, bound or mid-switch.
    pub fn tracked_callers(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Bind `caller` to `name`. Unknown names and failed opens leave the previous binding in place.
    pub async fn switch(
        &self,
        caller: &CallerKey,
        name: &str,
        store: &ConfigStore,
        factory: &dyn ConnectionFactory,
    ) -> Result<SwitchOutcome, AppError> {
        let name = name.trim();
        store.get(name)?;
        let slot = self.slot_or_insert(caller);
        let outcome = Self::switch_slot(&slot, caller, name, store, factory).await;
        if outcome.is_err() {
            self.prune_if_unbound(caller, &slot);
        }
        outcome
    }

    async fn switch_slot(
        slot: &TenantSlot,
        caller: &CallerKey,
        name: &str,
        store: &ConfigStore,
        factory: &dyn ConnectionFactory,
    ) -> Result<SwitchOutcome, AppError> {
        let _switching = slot.switching.lock().await;

        // Re-read under the per-caller lock so the handle matches what is stored right now.
        let stored = store.get(name)?;
        if let Some(current) = slot.current() {
            if current.target == name && current.revision == stored.revision {
                tracing::debug!(caller = %caller, target_name = %name, "already bound, switch skipped");
                return Ok(SwitchOutcome::Unchanged);
            }
        }

        let url = stored.config.connection_url(store.defaults())?;
        let connection = factory
            .open(&url, &stored.config.username, &stored.config.password)
            .await?;
        let previous = slot.replace(Arc::new(TenantBinding {
            target: name.to_string(),
            config: stored.config.clone(),
            revision: stored.revision,
            connection,
        }));
        tracing::info!(caller = %caller, target_name = %name, revision = stored.revision, "switched target");

        if let Some(previous) = previous {
            // In-flight users keep their own handle; it is released when the last one drops it.
            tracing::debug!(target_name = %previous.target, "replaced binding detached");
        }
        Ok(SwitchOutcome::Switched)
    }

    pub fn current(&self, caller: &CallerKey) -> Option<Arc<TenantBinding>> {
        self.slot(caller).and_then(|slot| slot.current())
    }

    pub fn current_name(&self, caller: &CallerKey) -> Option<String> {
        self.current(caller).map(|b| b.target.clone())
    }

    pub fn current_config(&self, caller: &CallerKey) -> Option<Arc<TargetConfig>> {
        self.current(caller).map(|b| b.config.clone())
    }

    pub fn is_bound(&self, caller: &CallerKey) -> bool {
        self.current(caller).is_some()
    }

    /// The bound handle, or `NoActiveTarget`.
    pub fn connection(&self, caller: &CallerKey) -> Result<Arc<dyn TargetConnection>, AppError> {
        self.current(caller)
            .map(|b| b.connection.clone())
            .ok_or(AppError::NoActiveTarget)
    }

    pub fn bound_callers(&self) -> usize {
        let slots: Vec<Arc<TenantSlot>> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots.iter().filter(|s| s.current().is_some()).count()
    }

    /// Drop every binding and close its handle. Used at process stop.
    pub async fn close_all(&self) {
        let slots: Vec<Arc<TenantSlot>> = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        for slot in slots {
            let taken = slot.binding.write().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(binding) = taken {
                binding.connection.close().await;
            }
        }
    }
}
