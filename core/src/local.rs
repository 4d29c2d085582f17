use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, params};

use crate::models::{Plan, Snapshot, decode_each};

pub const SNAPSHOT_KEY: &str = "calorieTracker";
pub const PLANS_KEY: &str = "savedPlans";
pub const USER_EMAIL_KEY: &str = "userEmail";
pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const LEGACY_TOKEN_KEY: &str = "token";

/// Durable key-value state kept on this machine: the last calculation, the
/// cached plan list, and the credential that unlocks the remote store.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let store = LocalStore { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = LocalStore { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Raw key-value access ---

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    // --- Calculation snapshot ---

    pub fn snapshot(&self) -> Result<Option<Snapshot>> {
        let Some(raw) = self.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt value under '{SNAPSHOT_KEY}'"))?;
        Ok(Some(snapshot))
    }

    pub fn set_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.set(SNAPSHOT_KEY, &serde_json::to_string(snapshot)?)
    }

    pub fn clear_snapshot(&self) -> Result<bool> {
        self.delete(SNAPSHOT_KEY)
    }

    // --- Plan cache ---

    /// The cached plan list. A value that isn't a JSON array is an error;
    /// individual records that don't parse are skipped.
    pub fn plans(&self) -> Result<Vec<Plan>> {
        let Some(raw) = self.get(PLANS_KEY)? else {
            return Ok(Vec::new());
        };
        let items: Vec<serde_json::Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt value under '{PLANS_KEY}'"))?;
        Ok(decode_each(items, "cached plan"))
    }

    pub fn set_plans(&self, plans: &[Plan]) -> Result<()> {
        self.set(PLANS_KEY, &serde_json::to_string(plans)?)
    }

    // --- Session ---

    /// The bearer credential, checking `authToken` before the older `token` key.
    pub fn auth_token(&self) -> Result<Option<String>> {
        for key in [AUTH_TOKEN_KEY, LEGACY_TOKEN_KEY] {
            if let Some(token) = self.get(key)?.filter(|t| !t.trim().is_empty()) {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }

    pub fn set_auth_token(&self, token: &str) -> Result<()> {
        self.set(AUTH_TOKEN_KEY, token.trim())
    }

    /// Forget the credential under both keys. Returns whether one was stored.
    pub fn clear_auth_token(&self) -> Result<bool> {
        let a = self.delete(AUTH_TOKEN_KEY)?;
        let b = self.delete(LEGACY_TOKEN_KEY)?;
        Ok(a || b)
    }

    pub fn user_email(&self) -> Result<Option<String>> {
        self.get(USER_EMAIL_KEY)
    }

    pub fn set_user_email(&self, email: &str) -> Result<()> {
        self.set(USER_EMAIL_KEY, email.trim())
    }
}
