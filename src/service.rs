//! Cache-aside orchestration between the aggregator, the store, and the cache.
//!
//! Reads consult the cache first, fall back to the durable store, and
//! repopulate the cache on a store hit. A refresh aggregates fresh data,
//! writes it to the store, then invalidates and repopulates the cache.
//!
//! The store is the durability source of truth; the cache is only an
//! accelerator. Cache faults are therefore absorbed and logged, never
//! surfaced, since a cache outage must not degrade availability. There is no
//! per-city locking: concurrent reads and refreshes may interleave, with
//! staleness bounded by the cache TTL and the store's last-write-wins
//! upsert.

use chrono::Duration;
use color_eyre::Result;
use serde::Serialize;
use std::future::Future;
use tracing::{error, warn};

use crate::cache::DestinationCache;
use crate::destination::types::{Destination, DestinationFacts};
use crate::store::DestinationStore;

/// The aggregation capability consumed by the service.
///
/// Implemented by [`crate::destination::fetcher::Fetcher`]; test doubles
/// substitute canned or failing aggregations.
pub trait FactsSource: Send + Sync {
  fn fetch_all(
    &self,
    city: &str,
    country: &str,
  ) -> impl Future<Output = Result<DestinationFacts>> + Send;
}

/// Overall health snapshot for the `status` command.
#[derive(Debug, Serialize)]
pub struct StatusReport {
  pub status: &'static str,
  pub store: &'static str,
  pub cache: &'static str,
  pub destinations: u64,
}

/// Ties the fetcher, the store, and the cache into the read/refresh
/// operations exposed to the transport layer.
pub struct DestinationService<F, S, C> {
  fetcher: F,
  store: S,
  cache: C,
  cache_ttl: Duration,
}

impl<F, S, C> DestinationService<F, S, C>
where
  S: DestinationStore,
  C: DestinationCache,
{
  pub fn new(fetcher: F, store: S, cache: C, cache_ttl: Duration) -> Self {
    Self {
      fetcher,
      store,
      cache,
      cache_ttl,
    }
  }

  /// Look up the aggregated record for a city.
  ///
  /// Cache hit → return it. Store hit → repopulate the cache, return it.
  /// Neither → `Ok(None)`. A cache fault is treated as a miss; only a
  /// store fault fails the read.
  pub fn read(&self, city: &str) -> Result<Option<DestinationFacts>> {
    match self.cache.get(city) {
      Ok(Some(facts)) => return Ok(Some(facts)),
      Ok(None) => {}
      Err(err) => warn!(city, error = %err, "cache get failed, treating as miss"),
    }

    let Some(dest) = self.store.get(city)? else {
      return Ok(None);
    };

    if let Err(err) = self.cache.set(city, &dest.facts, self.cache_ttl) {
      warn!(city, error = %err, "cache set failed after store hit");
    }

    Ok(Some(dest.facts))
  }

  /// Fetch fresh data from all sources and persist it.
  ///
  /// `country` defaults to the city name when unspecified. The refresh is
  /// considered successful once the store upsert succeeds; the subsequent
  /// cache invalidate/repopulate is best-effort. On a store failure the
  /// cache is left untouched, so no half-applied state exists.
  pub async fn refresh(&self, city: &str, country: Option<&str>) -> Result<DestinationFacts>
  where
    F: FactsSource,
  {
    let country = country.unwrap_or(city);

    let facts = self.fetcher.fetch_all(city, country).await?;
    self.store.upsert(city, country, &facts)?;

    if let Err(err) = self.cache.delete(city) {
      warn!(city, error = %err, "cache delete failed after refresh");
    }
    if let Err(err) = self.cache.set(city, &facts, self.cache_ttl) {
      warn!(city, error = %err, "cache set failed after refresh");
    }

    Ok(facts)
  }

  /// List stored destinations matching a weather description.
  pub fn search_by_weather(&self, condition: &str) -> Result<Vec<Destination>> {
    self.store.find_by_weather(condition)
  }

  /// Check store and cache health.
  pub fn status(&self) -> StatusReport {
    let (store, destinations) = match self.store.count() {
      Ok(n) => ("ok", n),
      Err(err) => {
        error!(error = %err, "status: store check failed");
        ("error", 0)
      }
    };

    // A get on an arbitrary key exercises the cache backend end to end.
    let cache = match self.cache.get("wayfare-health-probe") {
      Ok(_) => "ok",
      Err(err) => {
        error!(error = %err, "status: cache check failed");
        "error"
      }
    };

    let status = if store == "ok" && cache == "ok" {
      "ok"
    } else {
      "degraded"
    };

    StatusReport {
      status,
      store,
      cache,
      destinations,
    }
  }
}
