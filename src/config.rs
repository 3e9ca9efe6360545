use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub endpoint: EndpointConfig,
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
  /// Published-to-web URL of the content API. Optional: without it the
  /// tool serves cached and bundled data only.
  pub url: Option<String>,
  pub timeout_secs: u64,
}

impl Default for EndpointConfig {
  fn default() -> Self {
    Self {
      url: None,
      timeout_secs: 15,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Entries older than this many minutes are refetched on read
  pub max_age_minutes: i64,
  /// Database location override
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      max_age_minutes: 60,
      path: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./foliosync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/foliosync/config.yaml
  /// 4. ~/.config/foliosync/config.yaml
  ///
  /// Defaults apply when no file is found; the tool still runs offline
  /// from cached and bundled data.
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
    // Check current directory
    let local = PathBuf::from("foliosync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("foliosync").join("config.yaml");
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

    // A duration this size panics chrono; reject it as a config error.
    if chrono::Duration::try_minutes(config.cache.max_age_minutes).is_none() {
      return Err(eyre!(
        "Invalid cache.max_age_minutes {} in {}: out of range",
        config.cache.max_age_minutes,
        path.display()
      ));
    }

    Ok(config)
  }

  /// Endpoint URL for fetches.
  ///
  /// The FOLIOSYNC_ENDPOINT environment variable takes precedence over the
  /// config file.
  pub fn endpoint_url(&self) -> Option<String> {
    std::env::var("FOLIOSYNC_ENDPOINT")
      .ok()
      .filter(|v| !v.is_empty())
      .or_else(|| self.endpoint.url.clone())
  }

  pub fn request_timeout(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.endpoint.timeout_secs)
  }

  pub fn max_age(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.cache.max_age_minutes)
  }
}
