//! SQLite persistence backend.
//!
//! Containers and records live in two tables; record bodies are stored as
//! blobs. Listing pages are keyed by rowid, which stays stable while the
//! history grows because appends only ever add higher rowids.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

use super::persist::{ContainerId, Persistence, RecordId, RecordMeta, RecordPage};

const PAGE_SIZE: usize = 100;

/// Database path (~/.local/share/rosterwatch/rosterwatch.db or platform equivalent)
fn default_db_path() -> Result<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "rosterwatch")
        .ok_or_else(|| Error::NotFound("platform data directory".to_string()))?
        .data_dir()
        .to_path_buf();
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("rosterwatch.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS containers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            container_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            body BLOB NOT NULL,
            FOREIGN KEY(container_id) REFERENCES containers(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_container_id ON records(container_id)",
        [],
    )?;

    Ok(())
}

/// Database handle. Open once per command, reuse across all operations.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open the database at the platform data location.
    pub fn open_default() -> Result<Self> {
        Self::open(default_db_path()?)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, handy for embedding and tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(SqliteBackend { conn })
    }

    /// Identifiers are stringified rowids. A string that is not a number can
    /// never name an existing row, so it reads as not-found.
    fn parse_rowid(kind: &str, raw: &str) -> Result<i64> {
        raw.parse()
            .map_err(|_| Error::NotFound(format!("{kind} {raw}")))
    }
}

impl Persistence for SqliteBackend {
    fn create_container(&mut self, name: &str) -> Result<ContainerId> {
        self.conn
            .execute("INSERT INTO containers (name) VALUES (?1)", params![name])?;
        Ok(ContainerId(self.conn.last_insert_rowid().to_string()))
    }

    fn probe_container(&self, id: &ContainerId) -> Result<()> {
        let rowid = Self::parse_rowid("container", &id.0)?;
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM containers WHERE id = ?1",
                params![rowid],
                |row| row.get(0),
            )
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("container {id}"))),
        }
    }

    fn list_records(&self, container: &ContainerId, token: Option<&str>) -> Result<RecordPage> {
        let rowid = Self::parse_rowid("container", &container.0)?;
        let after: i64 = match token {
            None => 0,
            Some(t) => t.parse().map_err(|_| Error::Pagination {
                fetched: 0,
                reason: format!("malformed page token '{t}'"),
            })?,
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, name FROM records
             WHERE container_id = ?1 AND id > ?2
             ORDER BY id ASC
             LIMIT ?3",
        )?;
        let records = stmt
            .query_map(params![rowid, after, PAGE_SIZE as i64], |row| {
                let id: i64 = row.get(0)?;
                Ok(RecordMeta {
                    id: RecordId(id.to_string()),
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // a full page may have more rows behind it
        let next_token = if records.len() == PAGE_SIZE {
            records.last().map(|r| r.id.0.clone())
        } else {
            None
        };

        Ok(RecordPage {
            records,
            next_token,
        })
    }

    fn create_record(
        &mut self,
        container: &ContainerId,
        name: &str,
        body: &[u8],
    ) -> Result<RecordId> {
        self.probe_container(container)?;
        let rowid = Self::parse_rowid("container", &container.0)?;
        self.conn.execute(
            "INSERT INTO records (container_id, name, body) VALUES (?1, ?2, ?3)",
            params![rowid, name, body],
        )?;
        Ok(RecordId(self.conn.last_insert_rowid().to_string()))
    }

    fn fetch_record(&self, id: &RecordId) -> Result<Vec<u8>> {
        let rowid = Self::parse_rowid("record", &id.0)?;
        let body: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE id = ?1",
                params![rowid],
                |row| row.get(0),
            )
            .optional()?;
        body.ok_or_else(|| Error::NotFound(format!("record {id}")))
    }
}
