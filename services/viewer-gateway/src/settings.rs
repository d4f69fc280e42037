//! Gateway settings, read from `VIEWER_*` environment variables

use std::path::PathBuf;

use adsb_viewer::format::DisplayUnits;
use serde::Deserialize;

fn default_data_source() -> String {
    "http://localhost:8080/data".to_string()
}

fn default_reaper_interval() -> u64 {
    60
}

fn default_banner_after() -> u32 {
    3
}

fn default_stats_interval() -> u64 {
    10
}

fn default_http_port() -> u16 {
    8888
}

fn default_static_dir() -> String {
    "/app/static".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_source")]
    pub data_source: String,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
    #[serde(default)]
    pub site_lat: Option<f64>,
    #[serde(default)]
    pub site_lon: Option<f64>,
    #[serde(default)]
    pub db_dir: Option<PathBuf>,
    #[serde(default = "default_banner_after")]
    pub fetch_failure_banner_after: u32,
    #[serde(default)]
    pub filter_state_path: Option<PathBuf>,
    #[serde(default)]
    pub display_units: DisplayUnits,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix("VIEWER"))
    }

    fn from_environment(env: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Tracker part of the settings
    pub fn tracker_config(&self) -> adsb_viewer::Config {
        adsb_viewer::Config {
            data_source: self.data_source.clone(),
            poll_interval_ms: self.poll_interval_ms.filter(|ms| *ms > 0),
            reaper_interval_secs: self.reaper_interval_secs.max(1),
            site_lat: self.site_lat,
            site_lon: self.site_lon,
            db_dir: self.db_dir.clone(),
            fetch_failure_banner_after: self.fetch_failure_banner_after,
            filter_state_path: self.filter_state_path.clone(),
            display_units: self.display_units,
            stats_interval_secs: self.stats_interval_secs.max(1),
        }
    }
}
