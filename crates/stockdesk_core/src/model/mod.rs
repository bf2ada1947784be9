//! Value shapes held by application slots.
//!
//! # Invariants
//! - `Default` of every shape is the slot's "nothing selected" value.
//! - Shapes decode from older stored payloads missing newer fields.

pub mod location;
pub mod user;
