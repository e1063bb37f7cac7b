//! Roster data model: items, named collections, and timestamped captures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One membership entry in a roster.
///
/// `external_id` is the stable identity of the underlying entity and the sole
/// key used to match items across captures. `id` identifies the membership
/// record itself and may be reassigned upstream without a content change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Item {
    pub id: String,
    pub external_id: String,
    pub title: String,
    pub description: String,
}

impl Item {
    /// Check the field invariants the upstream contract guarantees: `id`,
    /// `external_id` and `title` are never empty. Invoked at every trust
    /// boundary (source fetch, record deserialization).
    pub fn validate(&self, roster: &str) -> Result<()> {
        let fields = [
            ("id", &self.id),
            ("external_id", &self.external_id),
            ("title", &self.title),
        ];
        for (field, value) in fields {
            if value.is_empty() {
                return Err(Error::Validation {
                    context: format!("roster '{roster}'"),
                    reason: format!("item field '{field}' is empty"),
                });
            }
        }
        Ok(())
    }
}

/// A set of named rosters captured together.
///
/// Roster names iterate in sorted order so output is deterministic; the item
/// order inside each roster is preserved as fetched, for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    rosters: BTreeMap<String, Vec<Item>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, items: Vec<Item>) {
        self.rosters.insert(name.into(), items);
    }

    pub fn get(&self, name: &str) -> Option<&[Item]> {
        self.rosters.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rosters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Item])> {
        self.rosters.iter().map(|(name, items)| (name.as_str(), items.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, items) in self.iter() {
            for item in items {
                item.validate(name)?;
            }
        }
        Ok(())
    }

    /// Serialize for storage. Round-trips exactly: every field a typed string.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize a stored record, validating shape and item invariants.
    /// Never coerces: an unknown or missing field is a validation error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let collection: Collection =
            serde_json::from_slice(bytes).map_err(|e| Error::Validation {
                context: "stored capture record".to_string(),
                reason: e.to_string(),
            })?;
        collection.validate()?;
        Ok(collection)
    }
}

/// A point-in-time capture of the full collection set. Immutable once created;
/// the store only ever appends new ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub timestamp: DateTime<Utc>,
    pub collection: Collection,
}
