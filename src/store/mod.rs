//! Versioned capture history.
//!
//! The store owns the ordered history of captures inside one persistence
//! container. Opening resolves the container named in settings (recreating it
//! transparently when the backend reports it missing) and builds an index by
//! paging through every record; appends stamp the collection with the current
//! time and never rewrite existing history.

pub mod memory;
pub mod persist;
pub mod sqlite;

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;

use crate::config::{SettingsStore, STORE_CONTAINER_ID};
use crate::error::{Error, Result};
use crate::model::{Capture, Collection};

use persist::{ContainerId, Persistence, RecordId};

const CONTAINER_NAME: &str = "rosterwatch_history";

/// One indexed capture: when it was taken and which record holds its body.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub record: RecordId,
}

#[derive(Debug)]
pub struct Store<P: Persistence> {
    backend: P,
    container: ContainerId,
    // ascending by timestamp, newest last
    index: Vec<HistoryEntry>,
}

impl<P: Persistence> Store<P> {
    /// Resolve the history container and build the capture index.
    ///
    /// The container id lives in settings. An unset id, or one the backend
    /// reports as missing, leads to a fresh container whose id is written back
    /// to settings for future opens. Any other backend failure is fatal.
    pub fn open(mut backend: P, settings: &mut SettingsStore) -> Result<Self> {
        let container = match settings.get(&STORE_CONTAINER_ID)? {
            None => Self::create_container(&mut backend, settings)?,
            Some(raw) => {
                let id = ContainerId(raw);
                match backend.probe_container(&id) {
                    Ok(()) => id,
                    Err(Error::NotFound(what)) => {
                        warn!("history container missing ({what}), recreating");
                        Self::create_container(&mut backend, settings)?
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        let index = Self::load_index(&backend, &container)?;
        Ok(Store {
            backend,
            container,
            index,
        })
    }

    fn create_container(backend: &mut P, settings: &mut SettingsStore) -> Result<ContainerId> {
        let id = backend.create_container(CONTAINER_NAME)?;
        settings.set(&STORE_CONTAINER_ID, &Some(id.0.clone()))?;
        Ok(id)
    }

    /// Page through every record under the container. A failed page discards
    /// the partial listing; a record whose name is not a timestamp is skipped
    /// with a warning instead of poisoning the whole history.
    fn load_index(backend: &P, container: &ContainerId) -> Result<Vec<HistoryEntry>> {
        let mut entries = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = backend
                .list_records(container, token.as_deref())
                .map_err(|err| match err {
                    err @ Error::Pagination { .. } => err,
                    other => Error::Pagination {
                        fetched: entries.len(),
                        reason: other.to_string(),
                    },
                })?;

            for record in page.records {
                match DateTime::parse_from_rfc3339(&record.name) {
                    Ok(timestamp) => entries.push(HistoryEntry {
                        timestamp: timestamp.with_timezone(&Utc),
                        record: record.id,
                    }),
                    Err(_) => {
                        warn!("record name is not a timestamp, skipping: {}", record.name);
                    }
                }
            }

            token = page.next_token;
            if token.is_none() {
                break;
            }
        }

        entries.sort_by_key(|entry| entry.timestamp);
        Ok(entries)
    }

    /// The most recent capture, fully materialized, or `None` on a store that
    /// has never been appended to.
    pub fn latest(&self) -> Result<Option<Capture>> {
        let Some(entry) = self.index.last() else {
            return Ok(None);
        };
        let bytes = self.backend.fetch_record(&entry.record)?;
        let collection = Collection::from_bytes(&bytes)?;
        Ok(Some(Capture {
            timestamp: entry.timestamp,
            collection,
        }))
    }

    /// Stamp `collection` with the current time and persist it as the newest
    /// capture. Fails without touching the index when the timestamp does not
    /// advance past the stored history or when serialization or the backend
    /// fail, so no partial record is ever referenced.
    pub fn append(&mut self, collection: &Collection) -> Result<()> {
        self.append_at(collection, Utc::now())
    }

    fn append_at(&mut self, collection: &Collection, timestamp: DateTime<Utc>) -> Result<()> {
        if let Some(last) = self.index.last() {
            if timestamp <= last.timestamp {
                return Err(Error::NonMonotonic {
                    last: last.timestamp,
                    next: timestamp,
                });
            }
        }

        let body = collection.to_bytes()?;
        let name = timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let record = self.backend.create_record(&self.container, &name, &body)?;
        self.index.push(HistoryEntry { timestamp, record });
        Ok(())
    }

    /// Capture index, earliest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryBackend;
    use super::persist::RecordPage;
    use super::*;
    use crate::model::Item;

    use chrono::TimeZone;

    fn settings() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        (dir, store)
    }

    fn collection(title: &str) -> Collection {
        let mut c = Collection::new();
        c.insert(
            "favorites",
            vec![Item {
                id: "m1".to_string(),
                external_id: "v1".to_string(),
                title: title.to_string(),
                description: String::new(),
            }],
        );
        c
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn fresh_store_has_no_latest() {
        let (_dir, mut settings) = settings();
        let store = Store::open(MemoryBackend::new(10), &mut settings).unwrap();
        assert!(store.latest().unwrap().is_none());
        assert!(store.history().is_empty());
    }

    #[test]
    fn open_persists_the_new_container_id() {
        let (_dir, mut settings) = settings();
        Store::open(MemoryBackend::new(10), &mut settings).unwrap();
        assert!(settings.get(&STORE_CONTAINER_ID).unwrap().is_some());
    }

    #[test]
    fn latest_returns_the_nth_of_n_appends() {
        let (_dir, mut settings) = settings();
        let mut store = Store::open(MemoryBackend::new(10), &mut settings).unwrap();

        for (i, title) in ["one", "two", "three"].iter().enumerate() {
            store
                .append_at(&collection(title), ts(1_700_000_000 + i as i64))
                .unwrap();
        }

        assert_eq!(store.history().len(), 3);
        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest.collection, collection("three"));
        assert_eq!(latest.timestamp, ts(1_700_000_002));
    }

    #[test]
    fn history_sorted_across_unordered_pages() {
        // two pages of one record each, newest listed first
        let mut backend = MemoryBackend::new(1);
        let container = backend.create_container(CONTAINER_NAME).unwrap();
        let newer = collection("newer").to_bytes().unwrap();
        let older = collection("older").to_bytes().unwrap();
        backend
            .create_record(&container, "2024-05-02T10:00:00Z", &newer)
            .unwrap();
        backend
            .create_record(&container, "2024-05-01T10:00:00Z", &older)
            .unwrap();

        let (_dir, mut settings) = settings();
        settings
            .set(&STORE_CONTAINER_ID, &Some(container.0.clone()))
            .unwrap();

        let store = Store::open(backend, &mut settings).unwrap();
        assert_eq!(store.history().len(), 2);
        assert!(store.history()[0].timestamp < store.history()[1].timestamp);
        assert_eq!(
            store.latest().unwrap().unwrap().collection,
            collection("newer")
        );
    }

    #[test]
    fn unparseable_record_names_skipped() {
        let mut backend = MemoryBackend::new(10);
        let container = backend.create_container(CONTAINER_NAME).unwrap();
        let body = collection("kept").to_bytes().unwrap();
        backend
            .create_record(&container, "not-a-timestamp", b"junk")
            .unwrap();
        backend
            .create_record(&container, "2024-05-01T10:00:00Z", &body)
            .unwrap();

        let (_dir, mut settings) = settings();
        settings
            .set(&STORE_CONTAINER_ID, &Some(container.0.clone()))
            .unwrap();

        let store = Store::open(backend, &mut settings).unwrap();
        assert_eq!(store.history().len(), 1);
        assert_eq!(
            store.latest().unwrap().unwrap().collection,
            collection("kept")
        );
    }

    #[test]
    fn missing_container_recreated_and_id_updated() {
        let (_dir, mut settings) = settings();
        settings
            .set(&STORE_CONTAINER_ID, &Some("c999".to_string()))
            .unwrap();

        let mut store = Store::open(MemoryBackend::new(10), &mut settings).unwrap();
        let new_id = settings.get(&STORE_CONTAINER_ID).unwrap();
        assert!(new_id.is_some());
        assert_ne!(new_id, Some("c999".to_string()));

        // the recreated store is immediately usable
        store.append(&collection("first")).unwrap();
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn append_reopen_append_preserves_order() {
        let (_dir, mut settings) = settings();
        let mut backend = MemoryBackend::new(1);

        {
            let mut store = Store::open(&mut backend, &mut settings).unwrap();
            store
                .append_at(&collection("first"), ts(1_700_000_000))
                .unwrap();
            store
                .append_at(&collection("second"), ts(1_700_000_010))
                .unwrap();
        }

        let store = Store::open(&mut backend, &mut settings).unwrap();
        assert_eq!(store.history().len(), 2);
        assert_eq!(
            store.latest().unwrap().unwrap().collection,
            collection("second")
        );
    }

    #[test]
    fn non_monotonic_timestamp_fails_loudly() {
        let (_dir, mut settings) = settings();
        let mut store = Store::open(MemoryBackend::new(10), &mut settings).unwrap();
        store
            .append_at(&collection("first"), ts(1_700_000_010))
            .unwrap();

        let err = store
            .append_at(&collection("stale"), ts(1_700_000_000))
            .unwrap_err();
        assert!(matches!(err, Error::NonMonotonic { .. }));
        // equal timestamps are just as wrong
        let err = store
            .append_at(&collection("same"), ts(1_700_000_010))
            .unwrap_err();
        assert!(matches!(err, Error::NonMonotonic { .. }));

        assert_eq!(store.history().len(), 1);
        assert_eq!(
            store.latest().unwrap().unwrap().collection,
            collection("first")
        );
    }

    /// Wraps the memory backend and fails on demand, for exercising the
    /// store's no-partial-append and listing-abort guarantees.
    #[derive(Debug)]
    struct FlakyBackend {
        inner: MemoryBackend,
        fail_creates: bool,
        fail_listing_after: Option<usize>,
        pages_listed: std::cell::Cell<usize>,
    }

    impl FlakyBackend {
        fn new(inner: MemoryBackend) -> Self {
            FlakyBackend {
                inner,
                fail_creates: false,
                fail_listing_after: None,
                pages_listed: std::cell::Cell::new(0),
            }
        }
    }

    impl Persistence for FlakyBackend {
        fn create_container(&mut self, name: &str) -> Result<ContainerId> {
            self.inner.create_container(name)
        }

        fn probe_container(&self, id: &ContainerId) -> Result<()> {
            self.inner.probe_container(id)
        }

        fn list_records(&self, container: &ContainerId, token: Option<&str>) -> Result<RecordPage> {
            let listed = self.pages_listed.get();
            self.pages_listed.set(listed + 1);
            if let Some(limit) = self.fail_listing_after {
                if listed >= limit {
                    return Err(Error::Pagination {
                        fetched: 0,
                        reason: "backend dropped the listing".to_string(),
                    });
                }
            }
            self.inner.list_records(container, token)
        }

        fn create_record(
            &mut self,
            container: &ContainerId,
            name: &str,
            body: &[u8],
        ) -> Result<RecordId> {
            if self.fail_creates {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "backend rejected the write",
                )));
            }
            self.inner.create_record(container, name, body)
        }

        fn fetch_record(&self, id: &RecordId) -> Result<Vec<u8>> {
            self.inner.fetch_record(id)
        }
    }

    #[test]
    fn failed_append_leaves_history_untouched() {
        let (_dir, mut settings) = settings();
        let mut store =
            Store::open(FlakyBackend::new(MemoryBackend::new(10)), &mut settings).unwrap();
        store
            .append_at(&collection("first"), ts(1_700_000_000))
            .unwrap();

        store.backend.fail_creates = true;
        let err = store
            .append_at(&collection("second"), ts(1_700_000_010))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        assert_eq!(store.history().len(), 1);
        assert_eq!(
            store.latest().unwrap().unwrap().collection,
            collection("first")
        );
    }

    #[test]
    fn failed_page_aborts_open_instead_of_truncating() {
        let mut backend = FlakyBackend::new(MemoryBackend::new(1));
        let container = backend.create_container(CONTAINER_NAME).unwrap();
        let body = collection("first").to_bytes().unwrap();
        backend
            .create_record(&container, "2024-05-01T10:00:00Z", &body)
            .unwrap();
        backend
            .create_record(&container, "2024-05-02T10:00:00Z", &body)
            .unwrap();
        backend.fail_listing_after = Some(1);

        let (_dir, mut settings) = settings();
        settings
            .set(&STORE_CONTAINER_ID, &Some(container.0.clone()))
            .unwrap();

        let err = Store::open(backend, &mut settings).unwrap_err();
        assert!(matches!(err, Error::Pagination { .. }));
    }
}
