//! Client state core for StockDesk.
//! Keeps named application state coherent between live values and the
//! local persistent store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod slot;
pub mod store;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::location::{Branch, Warehouse};
pub use model::user::{Permissions, UserProfile};
pub use service::app_slots::{
    logout, open_api_url, open_branch, open_lsu, open_user, open_warehouse, snapshot,
    AppSnapshot,
};
pub use service::route_guard::{GuardError, GuardResult, RouteDecision, RouteGuard};
pub use slot::{
    resolve_initial, Codec, CodecError, JsonCodec, Mutation, PersistedSlot, RegistryError,
    Resolved, Session, SlotDef, SlotError, SlotOrigin, SlotResult, SlotScope, SubscriptionId,
    TextCodec,
};
pub use store::{KvStore, MemoryKvStore, SqliteKvStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
