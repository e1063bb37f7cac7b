//! In-memory persistence backend.
//!
//! Exercises the same contract as the durable backends with a controllable
//! page size, which makes it the backend of choice for tests that care about
//! pagination boundaries or container loss. Also usable as a scratch backend
//! when embedding the store without durability.

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::persist::{ContainerId, Persistence, RecordId, RecordMeta, RecordPage};

#[derive(Debug)]
pub struct MemoryBackend {
    page_size: usize,
    next_id: u64,
    containers: HashMap<String, Vec<RecordMeta>>,
    bodies: HashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be positive");
        MemoryBackend {
            page_size,
            next_id: 0,
            containers: HashMap::new(),
            bodies: HashMap::new(),
        }
    }

    /// Drop a container and its records, simulating an externally deleted
    /// location.
    pub fn remove_container(&mut self, id: &ContainerId) {
        if let Some(records) = self.containers.remove(&id.0) {
            for record in records {
                self.bodies.remove(&record.id.0);
            }
        }
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

impl Persistence for MemoryBackend {
    fn create_container(&mut self, _name: &str) -> Result<ContainerId> {
        let id = self.fresh_id("c");
        self.containers.insert(id.clone(), Vec::new());
        Ok(ContainerId(id))
    }

    fn probe_container(&self, id: &ContainerId) -> Result<()> {
        if self.containers.contains_key(&id.0) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("container {id}")))
        }
    }

    fn list_records(&self, container: &ContainerId, token: Option<&str>) -> Result<RecordPage> {
        let records = self
            .containers
            .get(&container.0)
            .ok_or_else(|| Error::NotFound(format!("container {container}")))?;

        let offset: usize = match token {
            None => 0,
            Some(t) => t.parse().map_err(|_| Error::Pagination {
                fetched: 0,
                reason: format!("malformed page token '{t}'"),
            })?,
        };

        let end = (offset + self.page_size).min(records.len());
        let page = records[offset.min(records.len())..end].to_vec();
        let next_token = (end < records.len()).then(|| end.to_string());
        Ok(RecordPage {
            records: page,
            next_token,
        })
    }

    fn create_record(
        &mut self,
        container: &ContainerId,
        name: &str,
        body: &[u8],
    ) -> Result<RecordId> {
        let id = RecordId(self.fresh_id("r"));
        let records = self
            .containers
            .get_mut(&container.0)
            .ok_or_else(|| Error::NotFound(format!("container {container}")))?;
        records.push(RecordMeta {
            id: id.clone(),
            name: name.to_string(),
        });
        self.bodies.insert(id.0.clone(), body.to_vec());
        Ok(id)
    }

    fn fetch_record(&self, id: &RecordId) -> Result<Vec<u8>> {
        self.bodies
            .get(&id.0)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("record {id}")))
    }
}
