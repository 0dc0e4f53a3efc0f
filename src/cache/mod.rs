//! Ephemeral, TTL-bounded caching of aggregated destination records.
//!
//! The cache is purely an accelerator in front of the durable store: an
//! entry, if present, is the serialized form of a record that was valid in
//! the store (or just produced by a fetch) at the time of writing, and it
//! disappears on explicit invalidation or TTL expiry.

mod storage;

pub use storage::{DestinationCache, NoopCache, SqliteCache};
