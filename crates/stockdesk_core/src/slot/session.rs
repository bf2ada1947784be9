//! One running application session: a store plus its shared-cell registry.
//!
//! # Invariants
//! - Shared slots opened through one `Session` resolve from the store once
//!   per registration; later opens return the live cell untouched.
//! - Private slots resolve from the store on every open.
//! - `teardown` releases every shared cell; writes through handles opened
//!   before it fail with `SlotError::Released`.

use super::{
    resolve_initial, PersistedSlot, SlotCell, SlotDef, SlotRegistry, SlotResult, SlotScope,
    SlotValue,
};
use crate::logging::SlotEvent;
use crate::store::{KvStore, MemoryKvStore};
use log::info;
use std::sync::Arc;

/// Binds one persistent store to one slot registry.
pub struct Session {
    store: Arc<dyn KvStore>,
    registry: SlotRegistry,
}

impl Session {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            registry: SlotRegistry::new(),
        }
    }

    /// Session over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Opens `def` according to its declared scope.
    pub fn open<T: SlotValue>(&self, def: &SlotDef<T>) -> SlotResult<PersistedSlot<T>> {
        match def.scope() {
            SlotScope::Shared => self.open_shared(def),
            SlotScope::Private => self.open_private(def),
        }
    }

    /// Opens `def` as a session singleton.
    ///
    /// The first open seeds the cell from the store; later opens return the
    /// existing cell even if the store has changed underneath.
    pub fn open_shared<T: SlotValue>(&self, def: &SlotDef<T>) -> SlotResult<PersistedSlot<T>> {
        let def = def.with_scope(SlotScope::Shared);
        let cell = self.registry.shared_cell(def.name(), || -> SlotResult<SlotCell<T>> {
            let resolved = resolve_initial(self.store.as_ref(), &def)?;
            info!(
                "{}",
                SlotEvent::new("open", def.name())
                    .field("scope", def.scope().as_str())
                    .field("origin", resolved.origin.as_str())
            );
            Ok(SlotCell::new(resolved.value, resolved.origin))
        })?;
        Ok(PersistedSlot::new(def, Arc::clone(&self.store), cell))
    }

    /// Opens `def` with a private cell seeded from the store.
    pub fn open_private<T: SlotValue>(&self, def: &SlotDef<T>) -> SlotResult<PersistedSlot<T>> {
        let def = def.with_scope(SlotScope::Private);
        let resolved = resolve_initial(self.store.as_ref(), &def)?;
        info!(
            "{}",
            SlotEvent::new("open", def.name())
                .field("scope", def.scope().as_str())
                .field("origin", resolved.origin.as_str())
        );
        let cell = Arc::new(SlotCell::new(resolved.value, resolved.origin));
        Ok(PersistedSlot::new(def, Arc::clone(&self.store), cell))
    }

    /// Ends the session: drops and releases every shared registration.
    ///
    /// Stored entries are kept. Handles opened before teardown keep their
    /// last value but reject writes with `SlotError::Released`.
    pub fn teardown(&self) {
        let released = self.registry.clear();
        info!("event=session_teardown module=slot status=ok released={released}");
    }
}
