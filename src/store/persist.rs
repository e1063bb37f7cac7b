//! Persistence capability behind the snapshot store.
//!
//! A backend owns containers (one per store) and records (one per capture).
//! Listing is page-token driven: callers must keep fetching pages until
//! `next_token` comes back absent before treating the listing as complete.

use std::fmt;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(pub String);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name and identifier of one stored record, as returned by a listing page.
#[derive(Debug, Clone)]
pub struct RecordMeta {
    pub id: RecordId,
    pub name: String,
}

/// One page of a record listing.
#[derive(Debug)]
pub struct RecordPage {
    pub records: Vec<RecordMeta>,
    pub next_token: Option<String>,
}

pub trait Persistence {
    /// Create a new container and return its identifier.
    fn create_container(&mut self, name: &str) -> Result<ContainerId>;

    /// Probe a container. Fails with `Error::NotFound` when the identifier
    /// does not resolve; any other failure propagates unchanged.
    fn probe_container(&self, id: &ContainerId) -> Result<()>;

    /// Fetch one page of record metadata under a container. `token` is the
    /// continuation token from the previous page, or `None` for the first.
    fn list_records(&self, container: &ContainerId, token: Option<&str>) -> Result<RecordPage>;

    /// Create a record under a container from serialized bytes.
    fn create_record(&mut self, container: &ContainerId, name: &str, body: &[u8])
        -> Result<RecordId>;

    /// Fetch a record's bytes. Fails with `Error::NotFound` for unknown ids.
    fn fetch_record(&self, id: &RecordId) -> Result<Vec<u8>>;
}

impl<P: Persistence + ?Sized> Persistence for &mut P {
    fn create_container(&mut self, name: &str) -> Result<ContainerId> {
        (**self).create_container(name)
    }

    fn probe_container(&self, id: &ContainerId) -> Result<()> {
        (**self).probe_container(id)
    }

    fn list_records(&self, container: &ContainerId, token: Option<&str>) -> Result<RecordPage> {
        (**self).list_records(container, token)
    }

    fn create_record(
        &mut self,
        container: &ContainerId,
        name: &str,
        body: &[u8],
    ) -> Result<RecordId> {
        (**self).create_record(container, name, body)
    }

    fn fetch_record(&self, id: &RecordId) -> Result<Vec<u8>> {
        (**self).fetch_record(id)
    }
}
