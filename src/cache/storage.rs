//! Cache storage trait and its SQLite implementation.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::destination::types::{normalize_city, DestinationFacts};

/// Trait for cache backends.
///
/// All operations are keyed by the normalized city name. `get` treats
/// "never written" and "TTL expired" identically, and `delete` is
/// idempotent.
pub trait DestinationCache: Send + Sync {
  /// Look up the cached record for a city. `None` is a miss, not an error.
  fn get(&self, city: &str) -> Result<Option<DestinationFacts>>;

  /// Replace the cached record for a city, expiring after `ttl`.
  ///
  /// An empty record (all facts absent) is not stored; the cache never
  /// holds a sentinel for "nothing".
  fn set(&self, city: &str, facts: &DestinationFacts, ttl: Duration) -> Result<()>;

  /// Remove the cached record for a city, if any.
  fn delete(&self, city: &str) -> Result<()>;
}

impl<T: DestinationCache + ?Sized> DestinationCache for Box<T> {
  fn get(&self, city: &str) -> Result<Option<DestinationFacts>> {
    self.as_ref().get(city)
  }

  fn set(&self, city: &str, facts: &DestinationFacts, ttl: Duration) -> Result<()> {
    self.as_ref().set(city, facts, ttl)
  }

  fn delete(&self, city: &str) -> Result<()> {
    self.as_ref().delete(city)
  }
}

impl<T: DestinationCache + ?Sized> DestinationCache for std::sync::Arc<T> {
  fn get(&self, city: &str) -> Result<Option<DestinationFacts>> {
    self.as_ref().get(city)
  }

  fn set(&self, city: &str, facts: &DestinationFacts, ttl: Duration) -> Result<()> {
    self.as_ref().set(city, facts, ttl)
  }

  fn delete(&self, city: &str) -> Result<()> {
    self.as_ref().delete(city)
  }
}

/// Cache backend that doesn't cache anything.
/// Used when caching is disabled: every lookup is a miss.
pub struct NoopCache;

impl DestinationCache for NoopCache {
  fn get(&self, _city: &str) -> Result<Option<DestinationFacts>> {
    Ok(None)
  }

  fn set(&self, _city: &str, _facts: &DestinationFacts, _ttl: Duration) -> Result<()> {
    Ok(())
  }

  fn delete(&self, _city: &str) -> Result<()> {
    Ok(())
  }
}

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS destination_cache (
    city TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    expires_at TEXT NOT NULL
);
"#;

/// SQLite-backed cache implementation.
pub struct SqliteCache {
  conn: Mutex<Connection>,
}

impl SqliteCache {
  /// Open (or create) the cache database at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory cache.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl DestinationCache for SqliteCache {
  fn get(&self, city: &str) -> Result<Option<DestinationFacts>> {
    let conn = self.lock()?;

    let data: Option<Vec<u8>> = conn
      .query_row(
        "SELECT data FROM destination_cache
         WHERE city = ?1 AND expires_at > datetime('now')",
        params![normalize_city(city)],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Cache get for city {}: {}", city, e))?;

    match data {
      Some(bytes) => {
        let facts = serde_json::from_slice(&bytes)
          .map_err(|e| eyre!("Deserializing cached data for city {}: {}", city, e))?;
        Ok(Some(facts))
      }
      None => Ok(None),
    }
  }

  fn set(&self, city: &str, facts: &DestinationFacts, ttl: Duration) -> Result<()> {
    if facts.is_empty() {
      return Ok(());
    }

    let data = serde_json::to_vec(facts)
      .map_err(|e| eyre!("Serializing destination data for city {}: {}", city, e))?;

    let conn = self.lock()?;

    // Opportunistic cleanup; expired rows are already invisible to get().
    conn
      .execute(
        "DELETE FROM destination_cache WHERE expires_at <= datetime('now')",
        [],
      )
      .map_err(|e| eyre!("Cache cleanup: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO destination_cache (city, data, expires_at)
         VALUES (?1, ?2, datetime('now', ?3))",
        params![
          normalize_city(city),
          data,
          format!("+{} seconds", ttl.num_seconds())
        ],
      )
      .map_err(|e| eyre!("Cache set for city {}: {}", city, e))?;

    Ok(())
  }

  fn delete(&self, city: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "DELETE FROM destination_cache WHERE city = ?1",
        params![normalize_city(city)],
      )
      .map_err(|e| eyre!("Cache delete for city {}: {}", city, e))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::destination::types::WeatherReport;

  fn sample_facts() -> DestinationFacts {
    DestinationFacts {
      weather: Some(WeatherReport {
        temperature: 22.5,
        feels_like: 21.0,
        humidity: 60,
        description: "clear sky".into(),
        wind_speed: 3.5,
      }),
      ..Default::default()
    }
  }

  #[test]
  fn set_and_get_roundtrip() {
    let cache = SqliteCache::open_in_memory().unwrap();
    cache
      .set("Paris", &sample_facts(), Duration::hours(1))
      .unwrap();

    let got = cache.get("Paris").unwrap();
    assert_eq!(got, Some(sample_facts()));
  }

  #[test]
  fn get_miss_returns_none() {
    let cache = SqliteCache::open_in_memory().unwrap();
    assert_eq!(cache.get("nowhere").unwrap(), None);
  }

  #[test]
  fn keys_are_normalized() {
    let cache = SqliteCache::open_in_memory().unwrap();
    cache
      .set("  PARIS ", &sample_facts(), Duration::hours(1))
      .unwrap();

    assert!(cache.get("paris").unwrap().is_some());
    assert!(cache.get("Paris").unwrap().is_some());
  }

  #[test]
  fn expired_entry_is_a_miss() {
    let cache = SqliteCache::open_in_memory().unwrap();
    cache
      .set("Paris", &sample_facts(), Duration::zero())
      .unwrap();

    assert_eq!(cache.get("Paris").unwrap(), None);
  }

  #[test]
  fn empty_facts_are_not_stored() {
    let cache = SqliteCache::open_in_memory().unwrap();
    cache
      .set("Atlantis", &DestinationFacts::default(), Duration::hours(1))
      .unwrap();

    assert_eq!(cache.get("Atlantis").unwrap(), None);
  }

  #[test]
  fn delete_is_idempotent() {
    let cache = SqliteCache::open_in_memory().unwrap();
    cache
      .set("Paris", &sample_facts(), Duration::hours(1))
      .unwrap();

    cache.delete("Paris").unwrap();
    assert_eq!(cache.get("Paris").unwrap(), None);

    // Deleting a non-existent entry is not an error.
    cache.delete("Paris").unwrap();
    cache.delete("never-written").unwrap();
  }

  #[test]
  fn set_replaces_existing_entry() {
    let cache = SqliteCache::open_in_memory().unwrap();
    cache
      .set("Paris", &sample_facts(), Duration::hours(1))
      .unwrap();

    let mut updated = sample_facts();
    updated.weather.as_mut().unwrap().temperature = 5.0;
    cache.set("Paris", &updated, Duration::hours(1)).unwrap();

    assert_eq!(cache.get("Paris").unwrap(), Some(updated));
  }

  #[test]
  fn noop_cache_never_hits() {
    let cache = NoopCache;
    cache
      .set("Paris", &sample_facts(), Duration::hours(1))
      .unwrap();
    assert_eq!(cache.get("Paris").unwrap(), None);
    cache.delete("Paris").unwrap();
  }
}
