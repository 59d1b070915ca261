//! Durable store backend: one SQLite row per engine key.
//!
//! Values are the same codec encoding the engine uses everywhere else, so
//! the schema is a single blob column and migrations are codec-level. Each
//! trait call is one statement; cross-call atomicity comes from the engine's
//! advisory locks.

use anyhow::{Context, Result};
use commonware_codec::{DecodeExt, Write as _};
use dashrun_engine::{Memory, Store};
use dashrun_types::{Key, Value};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("open sqlite database")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enable WAL")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key BLOB PRIMARY KEY, value BLOB NOT NULL)",
            [],
        )
        .context("create kv table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn encode_key(key: &Key) -> Vec<u8> {
    let mut buf = Vec::new();
    key.write(&mut buf);
    buf
}

impl Store for SqliteStore {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        let conn = self.conn.lock().expect("sqlite lock poisoned");
        let row: Option<Vec<u8>> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![encode_key(key)],
                |row| row.get(0),
            )
            .optional()
            .context("sqlite get")?;
        match row {
            Some(bytes) => {
                let value = Value::decode(bytes.as_slice()).context("decode stored value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        let mut bytes = Vec::new();
        value.write(&mut bytes);
        let conn = self.conn.lock().expect("sqlite lock poisoned");
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![encode_key(&key), bytes],
        )
        .context("sqlite upsert")?;
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        let conn = self.conn.lock().expect("sqlite lock poisoned");
        conn.execute("DELETE FROM kv WHERE key = ?1", params![encode_key(key)])
            .context("sqlite delete")?;
        Ok(())
    }
}

/// Backend selected at startup; never mixed at runtime.
pub enum ServiceStore {
    Memory(Memory),
    Sqlite(SqliteStore),
}

impl Store for ServiceStore {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        match self {
            Self::Memory(store) => store.get(key).await,
            Self::Sqlite(store) => store.get(key).await,
        }
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        match self {
            Self::Memory(store) => store.insert(key, value).await,
            Self::Sqlite(store) => store.insert(key, value).await,
        }
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        match self {
            Self::Memory(store) => store.delete(key).await,
            Self::Sqlite(store) => store.delete(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashrun_types::{
        GameSession, Identity, PlayerProfile, SessionToken, MAX_GAME_TYPE_LENGTH,
    };

    #[tokio::test]
    async fn test_sqlite_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SqliteStore::open(&dir.path().join("kv.db")).expect("open");

        let key = Key::Profile(Identity([1u8; 32]));
        assert_eq!(store.get(&key).await.expect("get"), None);

        let profile = PlayerProfile {
            club_balance: 7,
            games_played: 1,
            created_at_ms: 123,
        };
        store
            .insert(key.clone(), Value::Profile(profile.clone()))
            .await
            .expect("insert");
        assert_eq!(
            store.get(&key).await.expect("get"),
            Some(Value::Profile(profile.clone()))
        );

        let updated = PlayerProfile {
            club_balance: 9,
            ..profile
        };
        store
            .insert(key.clone(), Value::Profile(updated.clone()))
            .await
            .expect("upsert");
        assert_eq!(
            store.get(&key).await.expect("get"),
            Some(Value::Profile(updated))
        );

        store.delete(&key).await.expect("delete");
        assert_eq!(store.get(&key).await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_sqlite_round_trips_session_at_game_type_bound() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SqliteStore::open(&dir.path().join("kv.db")).expect("open");

        // The engine caps game-type strings at the codec bound; a row written
        // at exactly that length must stay decodable.
        let session = GameSession {
            token: SessionToken([3u8; 32]),
            identity: Identity([4u8; 32]),
            game_type: "g".repeat(MAX_GAME_TYPE_LENGTH),
            issued_at_ms: 1_000,
            expires_at_ms: 601_000,
            consumed: false,
        };
        let key = Key::Session(session.token);
        store
            .insert(key.clone(), Value::Session(session.clone()))
            .await
            .expect("insert");
        assert_eq!(
            store.get(&key).await.expect("get"),
            Some(Value::Session(session))
        );
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kv.db");
        let key = Key::RevenueEvent(dashrun_types::EventId([2u8; 32]));
        {
            let mut store = SqliteStore::open(&path).expect("open");
            store
                .insert(key.clone(), Value::Marker)
                .await
                .expect("insert");
        }
        let store = SqliteStore::open(&path).expect("reopen");
        assert_eq!(store.get(&key).await.expect("get"), Some(Value::Marker));
    }
}
