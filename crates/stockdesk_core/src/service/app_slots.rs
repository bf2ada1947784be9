//! Concrete application slots.
//!
//! # Responsibility
//! - Fix the store key, scope, default and codec of every app slot.
//! - Provide typed openers, the state snapshot and logout.
//!
//! # Invariants
//! - Branch, warehouse and user are shared; API URL and LSU are private.
//! - Identity, profile and permissions live in the single `user` slot.

use crate::model::location::{Branch, Warehouse};
use crate::model::user::UserProfile;
use crate::slot::{JsonCodec, PersistedSlot, Session, SlotDef, SlotResult, SlotScope, TextCodec};
use log::info;

pub const BRANCH_KEY: &str = "branch";
pub const WAREHOUSE_KEY: &str = "wh";
pub const USER_KEY: &str = "user";
pub const API_URL_KEY: &str = "api_url";
pub const LSU_KEY: &str = "lsu";

pub fn branch_slot() -> SlotDef<Branch> {
    SlotDef::new(
        BRANCH_KEY,
        SlotScope::Shared,
        Branch::default(),
        JsonCodec::new(),
    )
}

pub fn warehouse_slot() -> SlotDef<Warehouse> {
    SlotDef::new(
        WAREHOUSE_KEY,
        SlotScope::Shared,
        Warehouse::default(),
        JsonCodec::new(),
    )
}

pub fn user_slot() -> SlotDef<UserProfile> {
    SlotDef::new(
        USER_KEY,
        SlotScope::Shared,
        UserProfile::default(),
        JsonCodec::new(),
    )
}

/// API base URL, read once per call site.
pub fn api_url_slot() -> SlotDef<String> {
    SlotDef::new(API_URL_KEY, SlotScope::Private, String::new(), TextCodec)
}

pub fn lsu_slot() -> SlotDef<String> {
    SlotDef::new(LSU_KEY, SlotScope::Private, String::new(), TextCodec)
}

pub fn open_branch(session: &Session) -> SlotResult<PersistedSlot<Branch>> {
    session.open(&branch_slot())
}

pub fn open_warehouse(session: &Session) -> SlotResult<PersistedSlot<Warehouse>> {
    session.open(&warehouse_slot())
}

pub fn open_user(session: &Session) -> SlotResult<PersistedSlot<UserProfile>> {
    session.open(&user_slot())
}

pub fn open_api_url(session: &Session) -> SlotResult<PersistedSlot<String>> {
    session.open(&api_url_slot())
}

pub fn open_lsu(session: &Session) -> SlotResult<PersistedSlot<String>> {
    session.open(&lsu_slot())
}

/// Point-in-time copy of every app slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppSnapshot {
    pub branch: Branch,
    pub warehouse: Warehouse,
    pub user: UserProfile,
    pub api_url: String,
    pub lsu: String,
}

pub fn snapshot(session: &Session) -> SlotResult<AppSnapshot> {
    Ok(AppSnapshot {
        branch: open_branch(session)?.get(),
        warehouse: open_warehouse(session)?.get(),
        user: open_user(session)?.get(),
        api_url: open_api_url(session)?.get(),
        lsu: open_lsu(session)?.get(),
    })
}

/// Signs the user out by clearing the shared user slot.
///
/// Every shared cell stays registered, so handles opened before and after
/// logout keep observing one live value. Branch and warehouse selections
/// stay persisted. Use `Session::teardown` to end the session itself.
pub fn logout(session: &Session) -> SlotResult<()> {
    let user = open_user(session)?;
    user.clear()?;
    info!(
        "event=logout module=service status=ok user_revision={}",
        user.revision()
    );
    Ok(())
}
