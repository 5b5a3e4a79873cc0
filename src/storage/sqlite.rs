//! `SQLite` implementation of [`IdentityStore`].
//!
//! All data is stored locally on the device. Writes that the pipeline may
//! replay are expressed as upserts so that redelivered envelopes leave the
//! database unchanged.

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{Result, StoreError};
use super::types::{FriendLocation, FriendRelationship};
use super::IdentityStore;
use crate::comm::{DropBoxId, LocationInfo};
use crate::identity::{Identity, SenderId};

/// `SQLite`-based storage for identities, friends, and locations.
///
/// Thread-safe wrapper around a single `SQLite` connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            -- Peers we have exchanged keys with (pinned on first contact)
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id BLOB NOT NULL UNIQUE,
                username TEXT NOT NULL,
                public_key BLOB NOT NULL
            );

            -- Peers whose location we follow
            CREATE TABLE IF NOT EXISTS friends (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                receiving_box_id BLOB,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            -- Latest location per friend
            CREATE TABLE IF NOT EXISTS friend_locations (
                friend_id INTEGER PRIMARY KEY,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                time INTEGER NOT NULL,
                accuracy REAL,
                speed REAL,
                bearing REAL,
                FOREIGN KEY (friend_id) REFERENCES friends(id)
            );

            -- Pending requests for our location
            CREATE TABLE IF NOT EXISTS share_requests (
                user_id INTEGER PRIMARY KEY,
                received_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );
            ",
        )?;

        Ok(())
    }

    fn identity_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, Vec<u8>, String, Vec<u8>)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn build_identity(
        (local_id, user_id, username, public_key): (i64, Vec<u8>, String, Vec<u8>),
    ) -> Result<Identity> {
        let sender_id = SenderId::from_slice(&user_id)
            .ok_or_else(|| StoreError::InvalidData("Invalid user_id length".to_string()))?;
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| StoreError::InvalidData("Invalid public_key length".to_string()))?;

        Ok(Identity {
            local_id,
            sender_id,
            username,
            public_key,
        })
    }

    fn select_identity(conn: &Connection, sender_id: &SenderId) -> Result<Option<Identity>> {
        conn.query_row(
            "SELECT id, user_id, username, public_key FROM users WHERE user_id = ?1",
            params![sender_id.as_bytes().as_slice()],
            Self::identity_from_row,
        )
        .optional()?
        .map(Self::build_identity)
        .transpose()
    }

    /// Returns the number of known identities.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn identity_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|e| StoreError::InvalidData(e.to_string()))
    }

    /// Retrieves the stored location for a friend.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    #[allow(clippy::cast_possible_truncation)] // Optional metadata is stored as REAL.
    pub fn get_friend_location(&self, friend_id: i64) -> Result<Option<FriendLocation>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                r"
                SELECT friend_id, latitude, longitude, time, accuracy, speed, bearing
                FROM friend_locations
                WHERE friend_id = ?1
                ",
                params![friend_id],
                |row| {
                    let accuracy: Option<f64> = row.get(4)?;
                    let speed: Option<f64> = row.get(5)?;
                    let bearing: Option<f64> = row.get(6)?;

                    Ok(FriendLocation {
                        friend_local_id: row.get(0)?,
                        location: LocationInfo {
                            latitude: row.get(1)?,
                            longitude: row.get(2)?,
                            time: row.get(3)?,
                            accuracy: accuracy.map(|v| v as f32),
                            speed: speed.map(|v| v as f32),
                            bearing: bearing.map(|v| v as f32),
                        },
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Returns when the last share request from an identity was received.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_share_request(&self, identity_id: i64) -> Result<Option<i64>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT received_at FROM share_requests WHERE user_id = ?1",
                params![identity_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(result)
    }
}

impl IdentityStore for SqliteStore {
    fn get_identity(&self, sender_id: &SenderId) -> Result<Option<Identity>> {
        let conn = self.lock()?;
        Self::select_identity(&conn, sender_id)
    }

    fn create_identity(
        &self,
        sender_id: &SenderId,
        username: &str,
        public_key: &[u8; 32],
    ) -> Result<Identity> {
        let conn = self.lock()?;

        // Never overwrite a pinned key
        conn.execute(
            r"
            INSERT INTO users (user_id, username, public_key)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO NOTHING
            ",
            params![
                sender_id.as_bytes().as_slice(),
                username,
                public_key.as_slice()
            ],
        )?;

        Self::select_identity(&conn, sender_id)?.ok_or_else(|| {
            StoreError::Storage(format!("Identity {sender_id} missing after insert"))
        })
    }

    fn record_sharing_granted(&self, identity: &Identity, drop_box: &DropBoxId) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT INTO friends (user_id, receiving_box_id)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                receiving_box_id = excluded.receiving_box_id
            ",
            params![identity.local_id, drop_box.as_bytes().as_slice()],
        )?;

        Ok(())
    }

    fn record_sharing_revoked(&self, identity: &Identity) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE friends SET receiving_box_id = NULL WHERE user_id = ?1",
            params![identity.local_id],
        )?;

        Ok(())
    }

    fn get_friend_by_identity(&self, identity_id: i64) -> Result<Option<FriendRelationship>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, user_id, receiving_box_id FROM friends WHERE user_id = ?1",
                params![identity_id],
                |row| {
                    let id: i64 = row.get(0)?;
                    let user_id: i64 = row.get(1)?;
                    let box_id: Option<Vec<u8>> = row.get(2)?;
                    Ok((id, user_id, box_id))
                },
            )
            .optional()?;

        match result {
            Some((friend_local_id, identity_local_id, box_id)) => {
                let receiving_box_id = box_id
                    .map(|bytes| {
                        DropBoxId::from_slice(&bytes).ok_or_else(|| {
                            StoreError::InvalidData("Invalid receiving_box_id length".to_string())
                        })
                    })
                    .transpose()?;

                Ok(Some(FriendRelationship {
                    friend_local_id,
                    identity_local_id,
                    receiving_box_id,
                }))
            }
            None => Ok(None),
        }
    }

    fn upsert_friend_location(&self, friend_id: i64, location: &LocationInfo) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT INTO friend_locations (friend_id, latitude, longitude, time, accuracy, speed, bearing)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(friend_id) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                time = excluded.time,
                accuracy = excluded.accuracy,
                speed = excluded.speed,
                bearing = excluded.bearing
            ",
            params![
                friend_id,
                location.latitude,
                location.longitude,
                location.time,
                location.accuracy.map(f64::from),
                location.speed.map(f64::from),
                location.bearing.map(f64::from),
            ],
        )?;

        Ok(())
    }

    fn record_incoming_share_request(&self, identity_id: i64, timestamp: i64) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT INTO share_requests (user_id, received_at)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                received_at = excluded.received_at
            ",
            params![identity_id, timestamp],
        )?;

        Ok(())
    }
}
