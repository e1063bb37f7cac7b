//! External roster sources.

use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::model::Item;

/// Source of truth for one named roster.
///
/// Implementations page through their upstream internally and return items in
/// source order. Nothing here retries: a failed fetch fails the whole cycle
/// and retry policy stays with the caller's scheduler.
pub trait RosterSource {
    fn fetch(&self, name: &str) -> Result<Vec<Item>>;
}

/// Reads rosters from `<dir>/<name>.json`, each file a JSON array of items.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirSource { dir: dir.into() }
    }
}

impl RosterSource for DirSource {
    fn fetch(&self, name: &str) -> Result<Vec<Item>> {
        let path = self.dir.join(format!("{name}.json"));
        let bytes = fs::read(&path).map_err(|e| Error::Fetch {
            roster: name.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;

        let items: Vec<Item> = serde_json::from_slice(&bytes).map_err(|e| Error::Validation {
            context: format!("roster file {}", path.display()),
            reason: e.to_string(),
        })?;

        for item in &items {
            item.validate(name)?;
        }
        Ok(items)
    }
}
