//! Capture comparison engine.
//!
//! Compares two captures of the same roster and classifies every item:
//! - only in the old capture: removed
//! - only in the new capture: added
//! - in both with differing fields: changed
//!
//! Unchanged items are never reported. Pure functions, no side effects; the
//! only failure mode is a duplicate external id inside one capture.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Collection, Item};

/// One reported difference for a single external id. `before` absent means
/// added, `after` absent means removed, both present means a field change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDiff {
    pub before: Option<Item>,
    pub after: Option<Item>,
}

impl ItemDiff {
    /// The external id this entry is about. At least one side is always set.
    pub fn external_id(&self) -> &str {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map(|item| item.external_id.as_str())
            .unwrap_or_default()
    }
}

/// Per-roster diffs, keyed by roster name. An empty map means no changes.
pub type DiffSet = BTreeMap<String, Vec<ItemDiff>>;

fn index_by_external_id<'a>(
    roster: &str,
    items: &'a [Item],
) -> Result<BTreeMap<&'a str, &'a Item>> {
    let mut index = BTreeMap::new();
    for item in items {
        if index.insert(item.external_id.as_str(), item).is_some() {
            return Err(Error::DuplicateIdentity {
                roster: roster.to_string(),
                external_id: item.external_id.clone(),
            });
        }
    }
    Ok(index)
}

/// Compare two captures of one roster, item by item.
///
/// Items match on `external_id` only. A matched pair is reported when `title`,
/// `description` or the membership record `id` differ. Output is sorted by
/// `external_id` so results are reproducible regardless of input order.
pub fn diff_items(roster: &str, before: &[Item], after: &[Item]) -> Result<Vec<ItemDiff>> {
    let before_index = index_by_external_id(roster, before)?;
    let after_index = index_by_external_id(roster, after)?;

    let mut diffs = Vec::new();

    for (external_id, item) in &before_index {
        if !after_index.contains_key(external_id) {
            diffs.push(ItemDiff {
                before: Some((*item).clone()),
                after: None,
            });
        }
    }

    for (external_id, item) in &after_index {
        match before_index.get(external_id) {
            None => diffs.push(ItemDiff {
                before: None,
                after: Some((*item).clone()),
            }),
            Some(before_item) => {
                if before_item.title != item.title
                    || before_item.description != item.description
                    || before_item.id != item.id
                {
                    diffs.push(ItemDiff {
                        before: Some((*before_item).clone()),
                        after: Some((*item).clone()),
                    });
                }
            }
        }
    }

    diffs.sort_by(|a, b| a.external_id().cmp(b.external_id()));
    Ok(diffs)
}

/// Compare two collection sets roster by roster.
///
/// Every roster name present on either side is diffed, with the absent side
/// treated as an empty roster. Rosters with no differences are dropped, so an
/// empty result means nothing changed anywhere.
pub fn diff_collections(before: &Collection, after: &Collection) -> Result<DiffSet> {
    let mut names: BTreeSet<&str> = before.names().collect();
    names.extend(after.names());

    let mut set = DiffSet::new();
    for name in names {
        let old_items = before.get(name).unwrap_or(&[]);
        let new_items = after.get(name).unwrap_or(&[]);
        let diffs = diff_items(name, old_items, new_items)?;
        if !diffs.is_empty() {
            set.insert(name.to_string(), diffs);
        }
    }
    Ok(set)
}
