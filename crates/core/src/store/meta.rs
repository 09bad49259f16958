//! Engine metadata persisted alongside the stores.
//!
//! The active deployment version lives here so the startup version check
//! survives restarts.

use super::connection::StoreDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const ACTIVE_VERSION_KEY: &str = "active_version";

impl StoreDb {
    /// Read a metadata value.
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0));
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Write a metadata value, overwriting any previous one.
    pub async fn set_meta(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The deployment version most recently activated against this
    /// database, if any.
    pub async fn active_version(&self) -> Result<Option<String>, Error> {
        self.get_meta(ACTIVE_VERSION_KEY).await
    }

    /// Record the deployment version that just activated.
    pub async fn set_active_version(&self, version: &str) -> Result<(), Error> {
        self.set_meta(ACTIVE_VERSION_KEY, version).await
    }
}
