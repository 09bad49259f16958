//! Store entry CRUD operations.
//!
//! Provides insertion, identity lookup, bulk install writes, and
//! wholesale store deletion.

use super::connection::StoreDb;
use super::identity::request_identity;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured response stored under a request identity.
///
/// The body is an independent copy of the bytes handed to the caller;
/// storing never consumes or mutates the live response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    pub store: String,
    pub identity: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Build a stored response for `store`, deriving the identity from
    /// method and URL and stamping the capture time.
    pub fn new(
        store: impl Into<String>, method: &str, url: &str, status: u16, content_type: Option<String>,
        headers_json: Option<String>, body: Vec<u8>,
    ) -> Self {
        Self {
            store: store.into(),
            identity: request_identity(method, url),
            method: method.to_string(),
            url: url.to_string(),
            status,
            content_type,
            headers_json,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn row_to_response(row: &rusqlite::Row<'_>) -> Result<StoredResponse, rusqlite::Error> {
    Ok(StoredResponse {
        store: row.get(0)?,
        identity: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        status: row.get::<_, i64>(4)? as u16,
        content_type: row.get(5)?,
        headers_json: row.get(6)?,
        body: row.get(7)?,
        stored_at: row.get(8)?,
    })
}

const SELECT_COLUMNS: &str = "store, identity, method, url, status, content_type, headers_json, body, stored_at";

fn register_store(conn: &rusqlite::Connection, name: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, entry: &StoredResponse) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO entries (
            store, identity, method, url, status, content_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(store, identity) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            &entry.store,
            &entry.identity,
            &entry.method,
            &entry.url,
            entry.status as i64,
            &entry.content_type,
            &entry.headers_json,
            &entry.body,
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

impl StoreDb {
    /// Register a named store. Idempotent: opening a store twice leaves a
    /// single registry row.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                register_store(conn, &name)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite an entry, registering its store lazily.
    pub async fn put(&self, entry: &StoredResponse) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                register_store(conn, &entry.store)?;
                upsert_entry(conn, &entry)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Bulk insert used at install time. All entries land in one
    /// transaction; any failure leaves the store untouched.
    pub async fn put_many(&self, store: &str, entries: Vec<StoredResponse>) -> Result<(), Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                register_store(&tx, &store)?;
                for entry in &entries {
                    upsert_entry(&tx, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an identity across all stores, first hit in store-name
    /// order. Install-time and dynamically captured entries share this
    /// single lookup path.
    pub async fn match_identity(&self, identity: &str) -> Result<Option<StoredResponse>, Error> {
        let identity = identity.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM entries WHERE identity = ?1 ORDER BY store LIMIT 1",
                ))?;

                let result = stmt.query_row(params![identity], row_to_response);

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all its entries. Returns whether the store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All registered store names, sorted.
    pub async fn list_stores(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a store.
    pub async fn count_entries(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Prune oldest entries until the store holds at most `max_entries`.
    ///
    /// Returns the number of deleted entries.
    pub async fn prune_oldest(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE store = ?1 AND identity IN (
                        SELECT identity FROM entries WHERE store = ?1 ORDER BY stored_at ASC LIMIT ?2
                    )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
