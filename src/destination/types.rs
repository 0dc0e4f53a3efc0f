//! Domain types for aggregated destination data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalize a city or country name for use as a storage or cache key.
///
/// Identity is case-insensitive and whitespace-trimmed: "  Paris " and
/// "paris" denote the same destination everywhere (store, cache, lookups).
pub fn normalize_city(name: &str) -> String {
  name.trim().to_lowercase()
}

/// Current weather conditions for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
  pub temperature: f64,
  pub feels_like: f64,
  pub humidity: i64,
  pub description: String,
  pub wind_speed: f64,
}

/// A single point of interest near a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
  pub name: String,
  pub kinds: String,
  pub rate: i64,
}

/// Country-level information.
///
/// Maps are `BTreeMap` so the serialized document is deterministic; the
/// cached bytes for a record must not depend on hash ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryInfo {
  pub currencies: BTreeMap<String, String>,
  pub languages: Vec<String>,
  pub region: String,
  pub capital: String,
}

/// A single urban quality metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
  pub name: String,
  pub score_out_of_10: f64,
}

/// The aggregated result from all external sources for one destination.
///
/// Partial data is a first-class state: any subset of facts may be absent,
/// and absent facts are omitted from the serialized document entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationFacts {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub weather: Option<WeatherReport>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub points_of_interest: Vec<PointOfInterest>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<CountryInfo>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub quality_scores: Vec<QualityScore>,
}

impl DestinationFacts {
  /// True when every fact is absent.
  pub fn is_empty(&self) -> bool {
    self.weather.is_none()
      && self.points_of_interest.is_empty()
      && self.country.is_none()
      && self.quality_scores.is_empty()
  }
}

/// A stored destination record: the aggregated facts plus identity and
/// bookkeeping timestamps. At most one exists per normalized city.
#[derive(Debug, Clone, Serialize)]
pub struct Destination {
  pub id: i64,
  pub city: String,
  pub country: String,
  pub facts: DestinationFacts,
  /// When the aggregation producing this data ran. `None` if never refreshed.
  pub fetched_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
