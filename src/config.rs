use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub sources: SourcesConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub store: StoreConfig,
}

/// Per-source endpoint overrides. Unset fields use the production URLs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
  pub weather_url: Option<String>,
  pub poi_geocode_url: Option<String>,
  pub poi_radius_url: Option<String>,
  pub countries_url: Option<String>,
  pub scores_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a cached record stays valid.
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
  /// Set to false to bypass the cache entirely.
  #[serde(default = "default_cache_enabled")]
  pub enabled: bool,
  /// Cache database location (default: platform data directory)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
      enabled: default_cache_enabled(),
      path: None,
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs as i64)
  }
}

fn default_ttl_secs() -> u64 {
  3600
}

fn default_cache_enabled() -> bool {
  true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  /// Store database location (default: platform data directory)
  pub path: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./wayfare.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/wayfare/config.yaml
  ///
  /// Every setting has a default, so a missing file yields the default
  /// configuration rather than an error.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("wayfare.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("wayfare").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Location of the durable store database.
  pub fn store_path(&self) -> Result<PathBuf> {
    match &self.store.path {
      Some(p) => Ok(p.clone()),
      None => Ok(default_data_dir()?.join("destinations.db")),
    }
  }

  /// Location of the cache database.
  pub fn cache_path(&self) -> Result<PathBuf> {
    match &self.cache.path {
      Some(p) => Ok(p.clone()),
      None => Ok(default_data_dir()?.join("cache.db")),
    }
  }

  /// Get the OpenWeatherMap API key from environment variables.
  ///
  /// Checks WAYFARE_OPENWEATHER_KEY first, then OPENWEATHER_API_KEY.
  pub fn weather_api_key() -> Result<String> {
    std::env::var("WAYFARE_OPENWEATHER_KEY")
      .or_else(|_| std::env::var("OPENWEATHER_API_KEY"))
      .map_err(|_| {
        eyre!(
          "OpenWeatherMap API key not found. Set WAYFARE_OPENWEATHER_KEY or OPENWEATHER_API_KEY."
        )
      })
  }

  /// Get the OpenTripMap API key from environment variables.
  ///
  /// Checks WAYFARE_OPENTRIPMAP_KEY first, then OPENTRIPMAP_API_KEY.
  pub fn poi_api_key() -> Result<String> {
    std::env::var("WAYFARE_OPENTRIPMAP_KEY")
      .or_else(|_| std::env::var("OPENTRIPMAP_API_KEY"))
      .map_err(|_| {
        eyre!("OpenTripMap API key not found. Set WAYFARE_OPENTRIPMAP_KEY or OPENTRIPMAP_API_KEY.")
      })
  }
}

fn default_data_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|d| d.join("wayfare"))
    .ok_or_else(|| eyre!("Could not determine data directory"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_yields_defaults() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.cache.ttl_secs, 3600);
    assert!(config.cache.enabled);
    assert!(config.sources.weather_url.is_none());
    assert!(config.store.path.is_none());
  }

  #[test]
  fn overrides_are_honored() {
    let config: Config = serde_yaml::from_str(
      r#"
sources:
  weather_url: http://localhost:9001/weather
  countries_url: http://localhost:9002/name
cache:
  ttl_secs: 60
  enabled: false
store:
  path: /tmp/dest.db
"#,
    )
    .unwrap();

    assert_eq!(
      config.sources.weather_url.as_deref(),
      Some("http://localhost:9001/weather")
    );
    assert_eq!(config.cache.ttl_secs, 60);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.ttl(), chrono::Duration::seconds(60));
    assert_eq!(config.store_path().unwrap(), PathBuf::from("/tmp/dest.db"));
  }
}
