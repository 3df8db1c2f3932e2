//! Persistent SQLite store for recipients and event counters.

use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database lock poisoned")]
    Poisoned,
}

/// Counted user actions. The names are what ends up in the `counters` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    GiftClicked,
    GiftSent,
    GuideDownloaded,
    CourseClicked,
    ServicesClicked,
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::GiftClicked => "gift_clicked",
            Event::GiftSent => "gift_sent",
            Event::GuideDownloaded => "guide_downloaded",
            Event::CourseClicked => "course_clicked",
            Event::ServicesClicked => "services_clicked",
        }
    }
}

/// Every statement runs in autocommit mode, so a call has been committed by
/// the time it returns.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Create a new in-memory store.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let store = Self { conn: Mutex::new(Connection::open_in_memory()?) };
        store.init_schema()?;
        Ok(store)
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;

        info!(
            "Loaded database from {:?} (journal: {}, {} recipients)",
            path,
            mode,
            store.recipient_count()?
        );
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS recipients (
                user_id INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS counters (
                event TEXT PRIMARY KEY,
                count INTEGER NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Remember a user. Returns `true` only the first time an id is seen.
    pub fn add_recipient(&self, user_id: i64) -> Result<bool, StoreError> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO recipients (user_id) VALUES (?1)",
            params![user_id],
        )?;
        Ok(inserted == 1)
    }

    /// Snapshot of every known recipient.
    pub fn recipients(&self) -> Result<Vec<i64>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT user_id FROM recipients")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn recipient_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM recipients", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Add one to a counter, creating it at 1. A single upsert, so concurrent
    /// callers never lose an increment.
    pub fn increment_event(&self, event: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO counters (event, count) VALUES (?1, 1)
             ON CONFLICT(event) DO UPDATE SET count = count + 1",
            params![event],
        )?;
        Ok(())
    }

    /// All counters, ordered by event name.
    pub fn counters(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT event, count FROM counters ORDER BY event")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    #[cfg(test)]
    pub fn counter(&self, event: Event) -> u64 {
        self.counters()
            .unwrap()
            .into_iter()
            .find(|(name, _)| name == event.as_str())
            .map(|(_, count)| count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_add_recipient_is_idempotent() {
        let store = Store::in_memory().unwrap();
        assert!(store.add_recipient(42).unwrap());
        assert!(!store.add_recipient(42).unwrap());
        assert!(store.add_recipient(43).unwrap());
        assert_eq!(store.recipient_count().unwrap(), 2);
    }

    #[test]
    fn test_recipients_snapshot() {
        let store = Store::in_memory().unwrap();
        for id in [5, 1, 3] {
            store.add_recipient(id).unwrap();
        }
        let mut ids = store.recipients().unwrap();
        ids.sort();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_increment_fresh_and_existing() {
        let store = Store::in_memory().unwrap();
        store.increment_event(Event::GiftClicked.as_str()).unwrap();
        assert_eq!(store.counter(Event::GiftClicked), 1);

        for _ in 0..4 {
            store.increment_event(Event::GiftClicked.as_str()).unwrap();
        }
        assert_eq!(store.counter(Event::GiftClicked), 5);
        assert_eq!(store.counter(Event::GiftSent), 0);
    }

    #[test]
    fn test_counters_ordered_by_name() {
        let store = Store::in_memory().unwrap();
        store.increment_event("start").unwrap();
        store.increment_event("course_clicked").unwrap();
        store.increment_event("start").unwrap();
        assert_eq!(
            store.counters().unwrap(),
            vec![("course_clicked".to_string(), 1), ("start".to_string(), 2)]
        );
    }

    #[test]
    fn test_concurrent_increments() {
        let store = Arc::new(Store::in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.increment_event("start").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.counter(Event::Start), 200);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bot.db");

        {
            let store = Store::open(&path).unwrap();
            store.add_recipient(7).unwrap();
            store.increment_event("gift_sent").unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.recipients().unwrap(), vec![7]);
        assert!(!store.add_recipient(7).unwrap());
        assert_eq!(store.counter(Event::GiftSent), 1);
    }
}
