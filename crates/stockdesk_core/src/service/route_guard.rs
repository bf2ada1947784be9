//! Navigation guard redirecting identified users away from the landing page.
//!
//! # Invariants
//! - Evaluated once per navigation; reads the store directly, never a cell.
//! - Undecodable identity data counts as "not identified".
//! - Never redirects to the route already being entered.

use crate::model::user::UserProfile;
use crate::service::app_slots::USER_KEY;
use crate::slot::{Codec, JsonCodec};
use crate::store::{KvStore, StoreError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_LANDING_PATH: &str = "/";
pub const DEFAULT_HOME_PATH: &str = "/dashboard";

pub type GuardResult<T> = Result<T, GuardError>;

#[derive(Debug)]
pub enum GuardError {
    Store(StoreError),
}

impl Display for GuardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "route guard could not read identity: {err}"),
        }
    }
}

impl Error for GuardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for GuardError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Proceed,
    Redirect(String),
}

/// Landing/home route pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    landing_path: String,
    home_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(DEFAULT_LANDING_PATH, DEFAULT_HOME_PATH)
    }
}

impl RouteGuard {
    pub fn new(landing_path: &str, home_path: &str) -> Self {
        Self {
            landing_path: normalize_path(landing_path),
            home_path: normalize_path(home_path),
        }
    }

    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    /// Decides whether navigating `from` → `to` should go to home instead.
    ///
    /// # Errors
    /// - `GuardError::Store` when the identity entry cannot be read.
    pub fn evaluate(
        &self,
        from: &str,
        to: &str,
        store: &dyn KvStore,
    ) -> GuardResult<RouteDecision> {
        if normalize_path(from) != self.landing_path || normalize_path(to) == self.home_path {
            return Ok(RouteDecision::Proceed);
        }

        if !has_identity(store)? {
            return Ok(RouteDecision::Proceed);
        }

        debug!(
            "event=route_guard module=service status=redirect to={}",
            self.home_path
        );
        Ok(RouteDecision::Redirect(self.home_path.clone()))
    }
}

/// True when the persisted user entry decodes to an identified profile.
pub fn has_identity(store: &dyn KvStore) -> GuardResult<bool> {
    let Some(text) = store.get(USER_KEY)? else {
        return Ok(false);
    };
    Ok(JsonCodec::<UserProfile>::new()
        .decode(&text)
        .map(|profile| profile.is_identified())
        .unwrap_or(false))
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
