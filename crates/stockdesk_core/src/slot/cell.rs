//! Live value cell shared by every handle of one slot.
//!
//! # Invariants
//! - `revision` increases by exactly one per committed mutation.
//! - Mutations are serialized: a `mutate` commit step and the publish of its
//!   value run under one lock, so no other writer interleaves between them.
//! - Listeners run after the new value is visible and without any cell lock
//!   held, so a listener may read or write the cell it observes.
//! - A released cell accepts no further `mutate` commits.

use super::SlotOrigin;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Identifier returned by `SlotCell::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct CellState<T> {
    value: T,
    revision: u64,
}

/// Reactive value holder.
pub struct SlotCell<T> {
    state: RwLock<CellState<T>>,
    origin: SlotOrigin,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_subscription: AtomicU64,
    mutation: Mutex<()>,
    released: AtomicBool,
}

/// Outcome of `SlotCell::mutate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The commit ran and the value was published at this revision.
    Committed(u64),
    /// The cell was released before the commit could run; nothing happened.
    Released,
}

impl<T> SlotCell<T> {
    /// Marks the cell as detached from its registry.
    ///
    /// Waits for an in-flight mutation to finish, so no commit starts or
    /// publishes after this returns.
    pub fn release(&self) {
        let _mutation = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl<T: Clone> SlotCell<T> {
    /// Creates a cell seeded with `value`, remembering where it came from.
    pub fn new(value: T, origin: SlotOrigin) -> Self {
        Self {
            state: RwLock::new(CellState { value, revision: 0 }),
            origin,
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            mutation: Mutex::new(()),
            released: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.read(|value| value.clone())
    }

    /// Runs `f` against the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state.value)
    }

    pub fn revision(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision
    }

    /// Where the seed value came from when this cell was created.
    pub fn origin(&self) -> &SlotOrigin {
        &self.origin
    }

    /// Runs `commit` and publishes the value it returns, holding the cell's
    /// mutation lock across both steps.
    ///
    /// `commit` is where the caller makes the change durable. When it fails,
    /// the value, revision and listeners are untouched. Listeners run after
    /// the lock is dropped.
    pub fn mutate<E>(&self, commit: impl FnOnce() -> Result<T, E>) -> Result<Mutation, E> {
        let (value, revision) = {
            let _mutation = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
            if self.is_released() {
                return Ok(Mutation::Released);
            }
            let value = commit()?;
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.value = value.clone();
            state.revision += 1;
            (value, state.revision)
        };
        self.notify(&value);
        Ok(Mutation::Committed(revision))
    }

    /// Stores `value` and notifies listeners. No-op on a released cell.
    pub fn replace(&self, value: T) -> Mutation {
        match self.mutate(|| Ok::<T, Infallible>(value)) {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    fn notify(&self, value: &T) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(value);
        }
    }

    /// Registers `listener` to run after every `replace`.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes one listener. Returns `false` when `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
