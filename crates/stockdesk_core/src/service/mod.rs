//! Application-level state services.
//!
//! # Responsibility
//! - Declare the concrete slots the app uses and open them by type.
//! - Evaluate navigation guards from persisted identity.
//!
//! # Invariants
//! - Every slot name below is unique per concern.

pub mod app_slots;
pub mod route_guard;
