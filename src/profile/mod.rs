use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::role::RoleKey;

pub mod loader;

pub use self::loader::{LoadOutcome, ProfileLoadError, ProfileLoader, ProfileSource};

const GREEN_BADGE: &str = "green";

/// Badge colour of a profile. Only `green` has its own scheme; every other
/// value is kept verbatim and rendered with the default scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Badge {
    Green,
    Other(String),
}

impl Badge {
    pub fn is_green(&self) -> bool {
        matches!(self, Self::Green)
    }
}

impl From<String> for Badge {
    fn from(value: String) -> Self {
        if value == GREEN_BADGE {
            Self::Green
        } else {
            Self::Other(value)
        }
    }
}

impl From<Badge> for String {
    fn from(badge: Badge) -> Self {
        match badge {
            Badge::Green => GREEN_BADGE.to_owned(),
            Badge::Other(value) => value,
        }
    }
}

/// Display attributes for one authenticated role. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ProfileRecord {
    pub fn has_green_badge(&self) -> bool {
        self.badge.as_ref().is_some_and(Badge::is_green)
    }

    /// Photo URL, ignoring blank values.
    pub fn photo(&self) -> Option<&str> {
        self.photo
            .as_deref()
            .filter(|photo| !photo.trim().is_empty())
    }
}

/// Role key to profile record mapping, replaced as a whole on every load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ProfileStore {
    records: BTreeMap<RoleKey, ProfileRecord>,
}

impl<'de> Deserialize<'de> for ProfileStore {
    /// The visitor entry is dropped unread, so whatever it holds cannot
    /// invalidate the other records.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<RoleKey, serde_json::Value>::deserialize(deserializer)?;
        let mut records = BTreeMap::new();
        for (role, value) in raw {
            if role.is_visitor() {
                continue;
            }
            let record = ProfileRecord::deserialize(value)
                .map_err(|error| D::Error::custom(format!("profile `{role}`: {error}")))?;
            records.insert(role, record);
        }
        Ok(Self { records })
    }
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_record(mut self, role: impl Into<RoleKey>, record: ProfileRecord) -> Self {
        self.records.insert(role.into(), record);
        self
    }

    /// Record for `role`. The visitor never has one, even when the document lists it.
    pub fn record_for(&self, role: &RoleKey) -> Option<&ProfileRecord> {
        if role.is_visitor() {
            return None;
        }
        self.records.get(role)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
