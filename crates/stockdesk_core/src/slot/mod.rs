//! Persisted slots: named values kept coherent between a live cell and the
//! persistent store.
//!
//! # Responsibility
//! - Resolve a slot's seed value from the store with an explicit fallback
//!   policy.
//! - Expose read/set/clear handles over shared or private cells.
//!
//! # Invariants
//! - After `set` returns `Ok`, the live value and the stored text agree.
//!   Writers to one cell are serialized across the store write and the
//!   publish, so concurrent writers cannot leave the two apart.
//! - A failed store write leaves the live value untouched.
//! - A handle whose shared cell was released by session teardown rejects
//!   writes instead of diverging from later opens.
//! - Missing or undecodable stored text seeds the slot with its default and
//!   never fails the caller.
//! - `set(None)` removes the stored entry and resets to the default.

use crate::logging::SlotEvent;
use crate::store::{KvStore, StoreError};
use log::{debug, error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod cell;
pub mod codec;
pub mod registry;
pub mod session;

pub use cell::{Mutation, SlotCell, SubscriptionId};
pub use codec::{Codec, CodecError, JsonCodec, TextCodec};
pub use registry::{RegistryError, SlotRegistry};
pub use session::Session;

pub type SlotResult<T> = Result<T, SlotError>;

/// Bounds every slot value type satisfies.
pub trait SlotValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> SlotValue for T {}

/// Whether a slot's live value is shared across call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotScope {
    /// One cell per name for the session; first opener seeds it.
    Shared,
    /// A fresh cell per open, seeded from the store each time.
    Private,
}

impl SlotScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Private => "private",
        }
    }
}

/// Where a slot's seed value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOrigin {
    /// No stored entry; default applied.
    Absent,
    /// Decoded from the stored entry.
    Stored,
    /// Stored entry failed to decode; default applied.
    Fallback { reason: String },
}

impl SlotOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Stored => "stored",
            Self::Fallback { .. } => "fallback",
        }
    }
}

/// Slot-level errors.
#[derive(Debug)]
pub enum SlotError {
    /// Reading the seed value from the store failed.
    Load { name: String, source: StoreError },
    /// Writing or removing the stored entry failed; live value unchanged.
    Persist { name: String, source: StoreError },
    Encode { name: String, source: CodecError },
    /// The handle's shared cell was released by session teardown.
    Released { name: String },
    Registry(RegistryError),
}

impl SlotError {
    /// Stable machine-readable code for logs and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Load { .. } => "slot_load_failed",
            Self::Persist { .. } => "slot_persist_failed",
            Self::Encode { .. } => "slot_encode_failed",
            Self::Released { .. } => "slot_released",
            Self::Registry(RegistryError::InvalidName(_)) => "slot_invalid_name",
            Self::Registry(RegistryError::TypeMismatch { .. }) => "slot_type_mismatch",
        }
    }
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load { name, source } => write!(f, "failed to load slot `{name}`: {source}"),
            Self::Persist { name, source } => {
                write!(f, "failed to persist slot `{name}`: {source}")
            }
            Self::Encode { name, source } => write!(f, "slot `{name}`: {source}"),
            Self::Released { name } => {
                write!(f, "slot `{name}` was released; reopen it from the session")
            }
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load { source, .. } | Self::Persist { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
            Self::Released { .. } => None,
            Self::Registry(err) => Some(err),
        }
    }
}

impl From<RegistryError> for SlotError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

/// Declaration of one slot: name, scope, default and codec.
///
/// `name` is both the store key and the registry key.
pub struct SlotDef<T> {
    name: String,
    scope: SlotScope,
    default: T,
    codec: Arc<dyn Codec<T>>,
}

impl<T: SlotValue> SlotDef<T> {
    pub fn new(
        name: impl Into<String>,
        scope: SlotScope,
        default: T,
        codec: impl Codec<T> + 'static,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            scope,
            default,
            codec: Arc::new(codec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> SlotScope {
        self.scope
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn codec(&self) -> &dyn Codec<T> {
        self.codec.as_ref()
    }

    /// Same slot with a different scope.
    pub fn with_scope(&self, scope: SlotScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }
}

impl<T: Clone> Clone for SlotDef<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            scope: self.scope,
            default: self.default.clone(),
            codec: Arc::clone(&self.codec),
        }
    }
}

/// Seed value plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub origin: SlotOrigin,
}

/// Reads and decodes the stored entry for `def`, applying the default on
/// absence or decode failure.
///
/// # Errors
/// - `SlotError::Load` when the store itself cannot be read. Decode
///   failures are never errors.
pub fn resolve_initial<T: SlotValue>(
    store: &dyn KvStore,
    def: &SlotDef<T>,
) -> SlotResult<Resolved<T>> {
    let stored = store.get(def.name()).map_err(|source| {
        error!(
            "{}",
            SlotEvent::new("resolve", def.name())
                .status("error")
                .field("error_code", source.code())
        );
        SlotError::Load {
            name: def.name().to_string(),
            source,
        }
    })?;

    let Some(text) = stored else {
        return Ok(Resolved {
            value: def.default_value().clone(),
            origin: SlotOrigin::Absent,
        });
    };

    match def.codec().decode(&text) {
        Ok(value) => Ok(Resolved {
            value,
            origin: SlotOrigin::Stored,
        }),
        Err(err) => {
            warn!(
                "{}",
                SlotEvent::new("resolve", def.name())
                    .status("fallback")
                    .field("stored_len", text.len())
                    .field("error", &err)
            );
            Ok(Resolved {
                value: def.default_value().clone(),
                origin: SlotOrigin::Fallback {
                    reason: err.to_string(),
                },
            })
        }
    }
}

/// Handle to one open slot.
///
/// Cloning a handle shares its cell. Handles of a shared slot opened through
/// the same `Session` also share one cell.
pub struct PersistedSlot<T: SlotValue> {
    def: SlotDef<T>,
    store: Arc<dyn KvStore>,
    cell: Arc<SlotCell<T>>,
}

impl<T: SlotValue> Clone for PersistedSlot<T> {
    fn clone(&self) -> Self {
        Self {
            def: self.def.clone(),
            store: Arc::clone(&self.store),
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: SlotValue> PersistedSlot<T> {
    pub(crate) fn new(def: SlotDef<T>, store: Arc<dyn KvStore>, cell: Arc<SlotCell<T>>) -> Self {
        Self { def, store, cell }
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn scope(&self) -> SlotScope {
        self.def.scope()
    }

    /// Current live value. Never fails.
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Runs `f` on the current live value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.read(f)
    }

    /// Number of successful mutations seen by this slot's cell.
    pub fn revision(&self) -> u64 {
        self.cell.revision()
    }

    /// Origin of the value the cell was seeded with.
    pub fn origin(&self) -> &SlotOrigin {
        self.cell.origin()
    }

    /// Persists `Some(value)` and publishes it, or clears on `None`.
    ///
    /// # Errors
    /// - `Encode` when the value cannot be encoded.
    /// - `Persist` when the store rejects the write or removal.
    /// - `Released` when session teardown released this handle's cell.
    ///
    /// The live value only changes after the store accepted the change.
    pub fn set(&self, value: Option<T>) -> SlotResult<()> {
        match value {
            Some(value) => self.write(value),
            None => self.clear(),
        }
    }

    /// Persists and publishes `value`.
    pub fn write(&self, value: T) -> SlotResult<()> {
        let outcome = self.cell.mutate(|| -> SlotResult<T> {
            let text = self
                .def
                .codec()
                .encode(&value)
                .map_err(|source| SlotError::Encode {
                    name: self.name().to_string(),
                    source,
                })?;
            self.store
                .set(self.name(), &text)
                .map_err(|source| self.persist_error("write", source))?;
            Ok(value)
        })?;
        self.published("write", outcome)
    }

    /// Removes the stored entry and resets the live value to the default.
    pub fn clear(&self) -> SlotResult<()> {
        let outcome = self.cell.mutate(|| -> SlotResult<T> {
            self.store
                .remove(self.name())
                .map_err(|source| self.persist_error("clear", source))?;
            Ok(self.def.default_value().clone())
        })?;
        self.published("clear", outcome)
    }

    /// Runs `listener` with the new value after every successful mutation
    /// through any handle sharing this cell.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        self.cell.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }

    /// Whether both handles observe the same live cell.
    pub fn shares_cell_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    fn published(&self, op: &str, outcome: Mutation) -> SlotResult<()> {
        match outcome {
            Mutation::Committed(revision) => {
                debug!(
                    "{}",
                    SlotEvent::new(op, self.name()).field("revision", revision)
                );
                Ok(())
            }
            Mutation::Released => {
                warn!(
                    "{}",
                    SlotEvent::new(op, self.name())
                        .status("rejected")
                        .field("error_code", "slot_released")
                );
                Err(SlotError::Released {
                    name: self.name().to_string(),
                })
            }
        }
    }

    fn persist_error(&self, op: &str, source: StoreError) -> SlotError {
        error!(
            "{}",
            SlotEvent::new(op, self.name())
                .status("error")
                .field("error_code", source.code())
                .field("error", &source)
        );
        SlotError::Persist {
            name: self.name().to_string(),
            source,
        }
    }
}
