//! Session-scoped registry of shared slot cells.
//!
//! # Responsibility
//! - Hand out exactly one live cell per slot name.
//! - Support explicit teardown instead of ambient global lookup.
//!
//! # Invariants
//! - The initializer for a name runs at most once while the name stays
//!   registered, and a failed initializer registers nothing.
//! - One name maps to one value type; reuse with another type is an error.
//! - A cell dropped from the registry is released, so handles still holding
//!   it reject writes instead of diverging from the next registration.

use super::cell::SlotCell;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidName(String),
    TypeMismatch {
        name: String,
        registered: &'static str,
        requested: &'static str,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "slot name is invalid: `{value}`"),
            Self::TypeMismatch {
                name,
                registered,
                requested,
            } => write!(
                f,
                "slot `{name}` is registered as `{registered}`, requested as `{requested}`"
            ),
        }
    }
}

impl Error for RegistryError {}

struct RegisteredCell {
    type_name: &'static str,
    cell: Arc<dyn Any + Send + Sync>,
    release: Box<dyn Fn() + Send + Sync>,
}

/// Name to shared-cell map.
#[derive(Default)]
pub struct SlotRegistry {
    cells: Mutex<BTreeMap<String, RegisteredCell>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell registered under `name`, creating it with `init` on
    /// first use.
    ///
    /// `init` runs under the registry lock and must not call back into this
    /// registry.
    ///
    /// # Errors
    /// - `InvalidName` for blank names.
    /// - `TypeMismatch` when `name` already holds a cell of another type.
    /// - Whatever `init` returns; nothing is registered in that case.
    pub fn shared_cell<T, E>(
        &self,
        name: &str,
        init: impl FnOnce() -> Result<SlotCell<T>, E>,
    ) -> Result<Arc<SlotCell<T>>, E>
    where
        T: Send + Sync + 'static,
        E: From<RegistryError>,
    {
        let name = normalize_name(name)?;
        let mut cells = self.lock();

        if let Some(registered) = cells.get(name) {
            let requested = type_name::<SlotCell<T>>();
            return Arc::clone(&registered.cell)
                .downcast::<SlotCell<T>>()
                .map_err(|_| {
                    RegistryError::TypeMismatch {
                        name: name.to_string(),
                        registered: registered.type_name,
                        requested,
                    }
                    .into()
                });
        }

        let cell = Arc::new(init()?);
        let released = Arc::clone(&cell);
        cells.insert(
            name.to_string(),
            RegisteredCell {
                type_name: type_name::<SlotCell<T>>(),
                cell: Arc::clone(&cell) as Arc<dyn Any + Send + Sync>,
                release: Box::new(move || released.release()),
            },
        );
        Ok(cell)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name.trim())
    }

    /// Removes and releases one registration. Existing handles keep reading
    /// their cell but can no longer write; the next open of `name` resolves
    /// from the store again.
    pub fn deregister(&self, name: &str) -> bool {
        let removed = self.lock().remove(name.trim());
        match removed {
            Some(registered) => {
                (registered.release)();
                true
            }
            None => false,
        }
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops and releases every registration. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.lock());
        for registered in removed.values() {
            (registered.release)();
        }
        removed.len()
    }

    // Map updates are single inserts/removes, so a poisoned map is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, RegisteredCell>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize_name(name: &str) -> Result<&str, RegistryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}
