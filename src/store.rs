//! Durable destination storage over SQLite.
//!
//! One row per normalized city; the aggregated facts are stored as a JSON
//! document and replaced wholesale on every upsert (last write wins).

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

use crate::destination::types::{normalize_city, Destination, DestinationFacts};

/// Trait for the durable record repository consumed by the service.
pub trait DestinationStore: Send + Sync {
  /// Retrieve a destination by city name. `None` means not found, which is
  /// a normal outcome, not an error.
  fn get(&self, city: &str) -> Result<Option<Destination>>;

  /// Insert or replace the record for a city.
  ///
  /// Creates the row if none exists for the normalized city; otherwise
  /// replaces country, data, and fetched_at in place, preserving id and
  /// created_at. Concurrent upserts to the same city resolve last-write-wins.
  fn upsert(&self, city: &str, country: &str, facts: &DestinationFacts) -> Result<()>;

  /// List destinations whose stored document has a weather description
  /// equal to `condition`.
  fn find_by_weather(&self, condition: &str) -> Result<Vec<Destination>>;

  /// Number of stored destinations.
  fn count(&self) -> Result<u64>;
}

impl<T: DestinationStore + ?Sized> DestinationStore for std::sync::Arc<T> {
  fn get(&self, city: &str) -> Result<Option<Destination>> {
    self.as_ref().get(city)
  }

  fn upsert(&self, city: &str, country: &str, facts: &DestinationFacts) -> Result<()> {
    self.as_ref().upsert(city, country, facts)
  }

  fn find_by_weather(&self, condition: &str) -> Result<Vec<Destination>> {
    self.as_ref().find_by_weather(condition)
  }

  fn count(&self) -> Result<u64> {
    self.as_ref().count()
  }
}

/// Schema for the destinations table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS destinations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city TEXT NOT NULL UNIQUE,
    country TEXT NOT NULL,
    data TEXT NOT NULL,
    fetched_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const DESTINATION_COLUMNS: &str = "id, city, country, data, fetched_at, created_at, updated_at";

/// SQLite-backed store implementation.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the store database at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create data directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open store database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory store.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory store database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

type DestinationRow = (
  i64,
  String,
  String,
  String,
  Option<String>,
  String,
  String,
);

fn read_row(row: &Row<'_>) -> rusqlite::Result<DestinationRow> {
  Ok((
    row.get(0)?,
    row.get(1)?,
    row.get(2)?,
    row.get(3)?,
    row.get(4)?,
    row.get(5)?,
    row.get(6)?,
  ))
}

fn into_destination(row: DestinationRow) -> Result<Destination> {
  let (id, city, country, data, fetched_at, created_at, updated_at) = row;

  let facts = serde_json::from_str(&data)
    .map_err(|e| eyre!("Deserializing destination data for city {}: {}", city, e))?;

  Ok(Destination {
    id,
    city,
    country,
    facts,
    fetched_at: fetched_at.as_deref().map(parse_datetime).transpose()?,
    created_at: parse_datetime(&created_at)?,
    updated_at: parse_datetime(&updated_at)?,
  })
}

/// Parse a datetime string from SQLite format ("YYYY-MM-DD HH:MM:SS").
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

impl DestinationStore for SqliteStore {
  fn get(&self, city: &str) -> Result<Option<Destination>> {
    let conn = self.lock()?;

    let row = conn
      .query_row(
        &format!("SELECT {DESTINATION_COLUMNS} FROM destinations WHERE city = ?1"),
        params![normalize_city(city)],
        read_row,
      )
      .optional()
      .map_err(|e| eyre!("Querying destination for city {}: {}", city, e))?;

    row.map(into_destination).transpose()
  }

  fn upsert(&self, city: &str, country: &str, facts: &DestinationFacts) -> Result<()> {
    let data = serde_json::to_string(facts)
      .map_err(|e| eyre!("Serializing destination data for city {}: {}", city, e))?;

    let conn = self.lock()?;
    conn
      .execute(
        "INSERT INTO destinations (city, country, data, fetched_at, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'), datetime('now'))
         ON CONFLICT(city) DO UPDATE SET
           country    = excluded.country,
           data       = excluded.data,
           fetched_at = excluded.fetched_at,
           updated_at = excluded.updated_at",
        params![normalize_city(city), country, data],
      )
      .map_err(|e| eyre!("Upserting destination for city {}: {}", city, e))?;

    Ok(())
  }

  fn find_by_weather(&self, condition: &str) -> Result<Vec<Destination>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(&format!(
        "SELECT {DESTINATION_COLUMNS} FROM destinations
         WHERE json_extract(data, '$.weather.description') = ?1
         ORDER BY city"
      ))
      .map_err(|e| eyre!("Preparing weather query: {}", e))?;

    let rows = stmt
      .query_map(params![condition], read_row)
      .map_err(|e| eyre!("Querying destinations by weather condition: {}", e))?;

    let mut results = Vec::new();
    for row in rows {
      let row = row.map_err(|e| eyre!("Reading destination row: {}", e))?;
      results.push(into_destination(row)?);
    }

    Ok(results)
  }

  fn count(&self) -> Result<u64> {
    let conn = self.lock()?;
    conn
      .query_row("SELECT COUNT(*) FROM destinations", [], |row| row.get(0))
      .map_err(|e| eyre!("Counting destinations: {}", e))
  }
}
