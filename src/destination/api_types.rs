//! Serde-deserializable types matching the external providers' responses.
//!
//! These types are separate from domain types so provider quirks (nested
//! envelopes, odd field names) stay at the edge and domain types stay
//! focused on application needs.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::types::{CountryInfo, PointOfInterest, QualityScore, WeatherReport};

// ============================================================================
// OpenWeatherMap
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OwmResponse {
  pub main: OwmMain,
  #[serde(default)]
  pub weather: Vec<OwmCondition>,
  #[serde(default)]
  pub wind: OwmWind,
}

#[derive(Debug, Deserialize)]
pub struct OwmMain {
  pub temp: f64,
  pub feels_like: f64,
  pub humidity: i64,
}

#[derive(Debug, Deserialize)]
pub struct OwmCondition {
  pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OwmWind {
  #[serde(default)]
  pub speed: f64,
}

impl OwmResponse {
  pub fn into_report(self) -> WeatherReport {
    let description = self
      .weather
      .into_iter()
      .next()
      .map(|c| c.description)
      .unwrap_or_default();

    WeatherReport {
      temperature: self.main.temp,
      feels_like: self.main.feels_like,
      humidity: self.main.humidity,
      description,
      wind_speed: self.wind.speed,
    }
  }
}

// ============================================================================
// OpenTripMap (geocode step, then radius search)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OtmGeoname {
  pub lat: f64,
  pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct OtmRadiusResponse {
  #[serde(default)]
  pub features: Vec<OtmFeature>,
}

#[derive(Debug, Deserialize)]
pub struct OtmFeature {
  pub properties: OtmProperties,
}

#[derive(Debug, Default, Deserialize)]
pub struct OtmProperties {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub kinds: String,
  #[serde(default)]
  pub rate: i64,
}

impl OtmRadiusResponse {
  /// Unnamed features are noise in the radius results and are skipped.
  pub fn into_pois(self) -> Vec<PointOfInterest> {
    self
      .features
      .into_iter()
      .filter(|f| !f.properties.name.is_empty())
      .map(|f| PointOfInterest {
        name: f.properties.name,
        kinds: f.properties.kinds,
        rate: f.properties.rate,
      })
      .collect()
  }
}

// ============================================================================
// RestCountries
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CountryEntry {
  #[serde(default)]
  pub capital: Vec<String>,
  #[serde(default)]
  pub region: String,
  #[serde(default)]
  pub languages: BTreeMap<String, String>,
  #[serde(default)]
  pub currencies: BTreeMap<String, CurrencyEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CurrencyEntry {
  #[serde(default)]
  pub name: String,
}

impl CountryEntry {
  pub fn into_info(self) -> CountryInfo {
    let currencies = self
      .currencies
      .into_iter()
      .map(|(code, cur)| (code, cur.name))
      .collect();

    // Language codes are provider bookkeeping; only the names matter.
    let languages = self.languages.into_values().collect();

    let capital = self.capital.into_iter().next().unwrap_or_default();

    CountryInfo {
      currencies,
      languages,
      region: self.region,
      capital,
    }
  }
}

// ============================================================================
// Teleport urban area scores
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ScoresResponse {
  #[serde(default)]
  pub categories: Vec<ScoreCategory>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreCategory {
  pub name: String,
  pub score_out_of_10: f64,
}

impl ScoresResponse {
  pub fn into_scores(self) -> Vec<QualityScore> {
    self
      .categories
      .into_iter()
      .map(|c| QualityScore {
        name: c.name,
        score_out_of_10: c.score_out_of_10,
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn owm_response_maps_to_report() {
    let raw: OwmResponse = serde_json::from_str(
      r#"{
        "main": {"temp": 22.5, "feels_like": 21.0, "humidity": 60},
        "weather": [{"description": "clear sky"}, {"description": "ignored"}],
        "wind": {"speed": 3.5}
      }"#,
    )
    .unwrap();

    let report = raw.into_report();
    assert_eq!(report.temperature, 22.5);
    assert_eq!(report.humidity, 60);
    assert_eq!(report.description, "clear sky");
    assert_eq!(report.wind_speed, 3.5);
  }

  #[test]
  fn owm_response_without_conditions_has_empty_description() {
    let raw: OwmResponse =
      serde_json::from_str(r#"{"main": {"temp": 1.0, "feels_like": 0.0, "humidity": 80}}"#)
        .unwrap();

    let report = raw.into_report();
    assert_eq!(report.description, "");
    assert_eq!(report.wind_speed, 0.0);
  }

  #[test]
  fn otm_radius_skips_unnamed_features() {
    let raw: OtmRadiusResponse = serde_json::from_str(
      r#"{
        "features": [
          {"properties": {"name": "Eiffel Tower", "kinds": "architecture", "rate": 7}},
          {"properties": {"name": "", "kinds": "unnamed", "rate": 1}}
        ]
      }"#,
    )
    .unwrap();

    let pois = raw.into_pois();
    assert_eq!(pois.len(), 1);
    assert_eq!(pois[0].name, "Eiffel Tower");
    assert_eq!(pois[0].rate, 7);
  }

  #[test]
  fn country_entry_maps_to_info() {
    let raw: CountryEntry = serde_json::from_str(
      r#"{
        "capital": ["Paris"],
        "region": "Europe",
        "languages": {"fra": "French"},
        "currencies": {"EUR": {"name": "Euro"}}
      }"#,
    )
    .unwrap();

    let info = raw.into_info();
    assert_eq!(info.capital, "Paris");
    assert_eq!(info.region, "Europe");
    assert_eq!(info.languages, vec!["French".to_string()]);
    assert_eq!(info.currencies.get("EUR").unwrap(), "Euro");
  }

  #[test]
  fn country_entry_tolerates_missing_fields() {
    let raw: CountryEntry = serde_json::from_str("{}").unwrap();
    let info = raw.into_info();
    assert_eq!(info.capital, "");
    assert!(info.currencies.is_empty());
    assert!(info.languages.is_empty());
  }

  #[test]
  fn scores_response_maps_to_scores() {
    let raw: ScoresResponse = serde_json::from_str(
      r#"{
        "categories": [
          {"name": "Housing", "score_out_of_10": 5.5},
          {"name": "Safety", "score_out_of_10": 6.0}
        ]
      }"#,
    )
    .unwrap();

    let scores = raw.into_scores();
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].name, "Housing");
    assert_eq!(scores[1].score_out_of_10, 6.0);
  }
}
