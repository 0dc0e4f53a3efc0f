//! Concurrent aggregation of all four sources with partial-failure tolerance.
//!
//! External data sources are unreliable and independently operated, so a
//! caller gets "best available" data, never all-or-nothing: any number of
//! source failures (including all of them) still yields a valid, possibly
//! partial, [`DestinationFacts`].

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, warn};

use crate::config::SourcesConfig;

use super::clients::{
  CountriesClient, PoiClient, ScoresClient, WeatherClient, OPENTRIPMAP_GEO_URL,
  OPENTRIPMAP_RADIUS_URL, OPENWEATHER_URL, RESTCOUNTRIES_URL, TELEPORT_URL,
};
use super::types::{CountryInfo, DestinationFacts, PointOfInterest, QualityScore, WeatherReport};

/// Upper bound on a single source fetch. Matches the per-request timeout the
/// HTTP clients use, and also covers non-HTTP source implementations.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of current weather conditions for a city.
pub trait WeatherSource: Clone + Send + Sync + 'static {
  fn fetch(&self, city: &str) -> impl Future<Output = Result<WeatherReport>> + Send;
}

/// Source of points of interest near a city.
pub trait PoiSource: Clone + Send + Sync + 'static {
  fn fetch(&self, city: &str) -> impl Future<Output = Result<Vec<PointOfInterest>>> + Send;
}

/// Source of country-level information.
pub trait CountrySource: Clone + Send + Sync + 'static {
  fn fetch(&self, country: &str) -> impl Future<Output = Result<CountryInfo>> + Send;
}

/// Source of urban quality scores for a city.
pub trait ScoresSource: Clone + Send + Sync + 'static {
  fn fetch(&self, city: &str) -> impl Future<Output = Result<Vec<QualityScore>>> + Send;
}

/// Aggregates data from all external sources in parallel.
#[derive(Clone)]
pub struct Fetcher<W, P, C, S> {
  weather: W,
  poi: P,
  countries: C,
  scores: S,
}

impl Fetcher<WeatherClient, PoiClient, CountriesClient, ScoresClient> {
  /// Construct a fetcher with the production clients, honoring endpoint
  /// overrides from the config.
  pub fn from_config(
    sources: &SourcesConfig,
    weather_key: String,
    poi_key: String,
  ) -> Result<Self> {
    let weather = WeatherClient::new(
      sources.weather_url.as_deref().unwrap_or(OPENWEATHER_URL),
      weather_key,
    )?;
    let poi = PoiClient::new(
      sources.poi_geocode_url.as_deref().unwrap_or(OPENTRIPMAP_GEO_URL),
      sources.poi_radius_url.as_deref().unwrap_or(OPENTRIPMAP_RADIUS_URL),
      poi_key,
    )?;
    let countries =
      CountriesClient::new(sources.countries_url.as_deref().unwrap_or(RESTCOUNTRIES_URL))?;
    let scores = ScoresClient::new(sources.scores_url.as_deref().unwrap_or(TELEPORT_URL))?;

    Ok(Self::with_sources(weather, poi, countries, scores))
  }
}

impl<W, P, C, S> Fetcher<W, P, C, S>
where
  W: WeatherSource,
  P: PoiSource,
  C: CountrySource,
  S: ScoresSource,
{
  /// Construct a fetcher from individual sources (injectable in tests).
  pub fn with_sources(weather: W, poi: P, countries: C, scores: S) -> Self {
    Self {
      weather,
      poi,
      countries,
      scores,
    }
  }

  /// Fetch data from all sources in parallel.
  ///
  /// Every source failure (network error, non-success status, decode
  /// error, timeout, even a panic inside the fetch) is non-fatal: the
  /// corresponding fact is simply absent from the result. Failures are
  /// logged individually for diagnostics but never aggregated into an
  /// error.
  pub async fn fetch_all(&self, city: &str, country: &str) -> Result<DestinationFacts> {
    let weather_task = spawn_fetch({
      let src = self.weather.clone();
      let city = city.to_owned();
      async move { src.fetch(&city).await }
    });
    let poi_task = spawn_fetch({
      let src = self.poi.clone();
      let city = city.to_owned();
      async move { src.fetch(&city).await }
    });
    let country_task = spawn_fetch({
      let src = self.countries.clone();
      let country = country.to_owned();
      async move { src.fetch(&country).await }
    });
    let scores_task = spawn_fetch({
      let src = self.scores.clone();
      let city = city.to_owned();
      async move { src.fetch(&city).await }
    });

    let (weather, pois, country_info, scores) =
      tokio::join!(weather_task, poi_task, country_task, scores_task);

    Ok(DestinationFacts {
      weather: fact_or_absent("weather", city, weather),
      points_of_interest: fact_or_absent("poi", city, pois).unwrap_or_default(),
      country: fact_or_absent("countries", country, country_info),
      quality_scores: fact_or_absent("scores", city, scores).unwrap_or_default(),
    })
  }
}

impl<W, P, C, S> crate::service::FactsSource for Fetcher<W, P, C, S>
where
  W: WeatherSource,
  P: PoiSource,
  C: CountrySource,
  S: ScoresSource,
{
  async fn fetch_all(&self, city: &str, country: &str) -> Result<DestinationFacts> {
    Fetcher::fetch_all(self, city, country).await
  }
}

/// Run one source fetch as its own task, bounded by [`FETCH_TIMEOUT`].
///
/// The task boundary isolates the fetch's fault domain: a panic inside one
/// source surfaces as a `JoinError` here instead of tearing down its
/// siblings or the enclosing request.
fn spawn_fetch<T, Fut>(fut: Fut) -> JoinHandle<Result<T>>
where
  T: Send + 'static,
  Fut: Future<Output = Result<T>> + Send + 'static,
{
  tokio::spawn(async move {
    match tokio::time::timeout(FETCH_TIMEOUT, fut).await {
      Ok(res) => res,
      Err(_) => Err(eyre!("fetch timed out after {}s", FETCH_TIMEOUT.as_secs())),
    }
  })
}

/// Flatten one task outcome into an optional fact.
fn fact_or_absent<T>(
  source: &str,
  subject: &str,
  joined: Result<Result<T>, JoinError>,
) -> Option<T> {
  match joined {
    Ok(Ok(fact)) => Some(fact),
    Ok(Err(err)) => {
      warn!(source, subject, error = %err, "source fetch failed");
      None
    }
    Err(join_err) => {
      error!(source, subject, error = %join_err, "source fetch task aborted");
      None
    }
  }
}
