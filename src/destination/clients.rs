//! HTTP clients for the four external data providers.
//!
//! Every client carries its own endpoint configuration so a test double can
//! be substituted per source without touching global state, and every
//! request is bounded by a 10-second timeout. A timed-out call is an
//! ordinary fetch failure like any other.

use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::api_types::{CountryEntry, OtmGeoname, OtmRadiusResponse, OwmResponse, ScoresResponse};
use super::fetcher::{CountrySource, PoiSource, ScoresSource, WeatherSource};
use super::types::{CountryInfo, PointOfInterest, QualityScore, WeatherReport};

/// Per-call timeout for every provider request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const OPENTRIPMAP_GEO_URL: &str = "https://api.opentripmap.com/0.1/en/places/geoname";
pub const OPENTRIPMAP_RADIUS_URL: &str = "https://api.opentripmap.com/0.1/en/places/radius";
pub const RESTCOUNTRIES_URL: &str = "https://restcountries.com/v3.1/name";
pub const TELEPORT_URL: &str = "https://api.teleport.org/api/urban_areas";

fn new_http_client() -> Result<Client> {
  Client::builder()
    .timeout(HTTP_TIMEOUT)
    .build()
    .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

/// Perform a GET request and decode the JSON response.
async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T> {
  let resp = client
    .get(url.clone())
    .send()
    .await
    .map_err(|e| eyre!("GET {}: {}", url, e))?;

  let status = resp.status();
  if !status.is_success() {
    return Err(eyre!("GET {} returned status {}", url, status.as_u16()));
  }

  resp
    .json::<T>()
    .await
    .map_err(|e| eyre!("Decoding response from {}: {}", url, e))
}

fn parse_with_params(base: &str, params: &[(&str, &str)]) -> Result<Url> {
  Url::parse_with_params(base, params).map_err(|e| eyre!("Invalid URL {}: {}", base, e))
}

// ============================================================================
// OpenWeatherMap
// ============================================================================

/// Fetches current weather from OpenWeatherMap.
#[derive(Clone)]
pub struct WeatherClient {
  api_key: String,
  base_url: String,
  client: Client,
}

impl WeatherClient {
  /// `base_url` is configurable so a test double can stand in for the
  /// production endpoint.
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
    Ok(Self {
      api_key: api_key.into(),
      base_url: base_url.into(),
      client: new_http_client()?,
    })
  }
}

impl WeatherSource for WeatherClient {
  async fn fetch(&self, city: &str) -> Result<WeatherReport> {
    let endpoint = parse_with_params(
      &self.base_url,
      &[("q", city), ("appid", &self.api_key), ("units", "metric")],
    )?;

    let raw: OwmResponse = get_json(&self.client, endpoint)
      .await
      .map_err(|e| eyre!("openweathermap fetch for {}: {}", city, e))?;

    Ok(raw.into_report())
  }
}

// ============================================================================
// OpenTripMap
// ============================================================================

/// Fetches points of interest from OpenTripMap.
///
/// Two-step: geocode the city name, then search for the top-rated places
/// within a 5 km radius of that position.
#[derive(Clone)]
pub struct PoiClient {
  api_key: String,
  geo_url: String,
  radius_url: String,
  client: Client,
}

impl PoiClient {
  /// Both endpoint URLs are configurable so test doubles can stand in for
  /// the production endpoints.
  pub fn new(
    geo_url: impl Into<String>,
    radius_url: impl Into<String>,
    api_key: impl Into<String>,
  ) -> Result<Self> {
    Ok(Self {
      api_key: api_key.into(),
      geo_url: geo_url.into(),
      radius_url: radius_url.into(),
      client: new_http_client()?,
    })
  }
}

impl PoiSource for PoiClient {
  async fn fetch(&self, city: &str) -> Result<Vec<PointOfInterest>> {
    let geo_endpoint =
      parse_with_params(&self.geo_url, &[("name", city), ("apikey", &self.api_key)])?;

    let geo: OtmGeoname = get_json(&self.client, geo_endpoint)
      .await
      .map_err(|e| eyre!("opentripmap geocode for {}: {}", city, e))?;

    let radius_endpoint = parse_with_params(
      &self.radius_url,
      &[
        ("radius", "5000"),
        ("lon", &geo.lon.to_string()),
        ("lat", &geo.lat.to_string()),
        ("limit", "5"),
        ("format", "geojson"),
        ("apikey", &self.api_key),
      ],
    )?;

    let raw: OtmRadiusResponse = get_json(&self.client, radius_endpoint)
      .await
      .map_err(|e| eyre!("opentripmap radius for {}: {}", city, e))?;

    Ok(raw.into_pois())
  }
}

// ============================================================================
// RestCountries
// ============================================================================

/// Fetches country info from RestCountries. No API key required.
#[derive(Clone)]
pub struct CountriesClient {
  base_url: String,
  client: Client,
}

impl CountriesClient {
  /// `base_url` is configurable so a test double can stand in for the
  /// production endpoint.
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    Ok(Self {
      base_url: base_url.into(),
      client: new_http_client()?,
    })
  }
}

impl CountrySource for CountriesClient {
  async fn fetch(&self, country: &str) -> Result<CountryInfo> {
    let mut endpoint =
      Url::parse(&self.base_url).map_err(|e| eyre!("Invalid URL {}: {}", self.base_url, e))?;
    endpoint
      .path_segments_mut()
      .map_err(|_| eyre!("restcountries URL cannot be a base: {}", self.base_url))?
      .push(country.trim());
    endpoint.query_pairs_mut().append_pair("fullText", "true");

    let raw: Vec<CountryEntry> = get_json(&self.client, endpoint)
      .await
      .map_err(|e| eyre!("restcountries fetch for {}: {}", country, e))?;

    let entry = raw
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("restcountries: no results for {}", country))?;

    Ok(entry.into_info())
  }
}

// ============================================================================
// Teleport
// ============================================================================

/// Fetches urban quality scores from the Teleport API. No API key required.
#[derive(Clone)]
pub struct ScoresClient {
  base_url: String,
  client: Client,
}

impl ScoresClient {
  /// `base_url` is configurable so a test double can stand in for the
  /// production endpoint.
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    Ok(Self {
      base_url: base_url.into(),
      client: new_http_client()?,
    })
  }
}

/// Convert a city name to a Teleport-compatible slug (lowercase, spaces to hyphens).
fn city_to_slug(city: &str) -> String {
  city.trim().to_lowercase().replace(' ', "-")
}

impl ScoresSource for ScoresClient {
  async fn fetch(&self, city: &str) -> Result<Vec<QualityScore>> {
    let endpoint = format!("{}/slug:{}/scores/", self.base_url, city_to_slug(city));
    let endpoint = Url::parse(&endpoint).map_err(|e| eyre!("Invalid URL {}: {}", endpoint, e))?;

    let raw: ScoresResponse = get_json(&self.client, endpoint)
      .await
      .map_err(|e| eyre!("teleport fetch for {}: {}", city, e))?;

    Ok(raw.into_scores())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn city_to_slug_normalizes() {
    assert_eq!(city_to_slug("New York"), "new-york");
    assert_eq!(city_to_slug("  Paris "), "paris");
  }

  #[test]
  fn weather_endpoint_encodes_query() {
    let c = WeatherClient::new("http://localhost:1/weather", "k").unwrap();
    let url = parse_with_params(
      &c.base_url,
      &[("q", "São Paulo"), ("appid", &c.api_key), ("units", "metric")],
    )
    .unwrap();
    assert!(url.as_str().contains("q=S%C3%A3o+Paulo"));
  }
}
