//! Signed-in user profile and permissions.
//!
//! # Responsibility
//! - Hold identity, role and permission data in one canonical shape.
//!
//! # Invariants
//! - Missing `permissions` decodes to "no access".
//! - The encoded permissions object holds `all` exactly once, so every
//!   encoded bundle decodes back to an equal value.
//! - A profile is identified only with a non-zero id and a non-blank name.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

const ALL_KEY: &str = "all";

/// Permission bundle. `all` grants everything; other keys are per-feature
/// grants kept verbatim.
///
/// A stray `"all"` entry in `grants` is never written out; the `all` flag is
/// the only source for that key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub all: bool,
    #[serde(flatten)]
    pub grants: BTreeMap<String, Value>,
}

impl Permissions {
    /// `{"all": false}`.
    pub fn no_access() -> Self {
        Self::default()
    }

    /// `{"all": true}`.
    pub fn full_access() -> Self {
        Self {
            all: true,
            grants: BTreeMap::new(),
        }
    }

    /// Adds one boolean grant. Granting `"all"` sets the `all` flag.
    pub fn grant(mut self, feature: impl Into<String>) -> Self {
        let feature = feature.into();
        if feature == ALL_KEY {
            self.all = true;
        } else {
            self.grants.insert(feature, Value::Bool(true));
        }
        self
    }

    /// True when `all` is set or `feature` maps to `true`.
    pub fn allows(&self, feature: &str) -> bool {
        self.all || matches!(self.grants.get(feature), Some(Value::Bool(true)))
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let grants = self
            .grants
            .iter()
            .filter(|(feature, _)| feature.as_str() != ALL_KEY);
        let mut map = serializer.serialize_map(Some(1 + grants.clone().count()))?;
        map.serialize_entry(ALL_KEY, &self.all)?;
        for (feature, value) in grants {
            map.serialize_entry(feature, value)?;
        }
        map.end()
    }
}

/// Signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl UserProfile {
    pub fn new(id: i64, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
            permissions: Permissions::no_access(),
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Whether this profile carries the identity marker used for routing.
    pub fn is_identified(&self) -> bool {
        self.id != 0 && !self.name.trim().is_empty()
    }
}
