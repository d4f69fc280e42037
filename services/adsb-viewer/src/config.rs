//! Configuration loaded from environment variables

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::format::DisplayUnits;
use crate::geo::LatLon;
use crate::source::ReceiverInfo;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    var(key).and_then(|s| s.trim().parse().ok())
}

/// Tracker configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Receiver JSON location: an http(s) URL or a directory
    pub data_source: String,

    /// Poll interval in milliseconds; the receiver's advertised refresh when unset
    pub poll_interval_ms: Option<u64>,

    /// How often aircraft silent for five minutes are removed
    pub reaper_interval_secs: u64,

    /// Receiver site; overrides the position in receiver.json
    pub site_lat: Option<f64>,
    pub site_lon: Option<f64>,

    /// Metadata database directory (dump1090 `db/` layout)
    pub db_dir: Option<PathBuf>,

    /// Consecutive fetch failures before the status shows a warning
    pub fetch_failure_banner_after: u32,

    /// Where the filter list is saved between runs
    pub filter_state_path: Option<PathBuf>,

    pub display_units: DisplayUnits,

    /// Tracker statistics logging interval
    pub stats_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: "http://localhost:8080/data".to_string(),
            poll_interval_ms: None,
            reaper_interval_secs: 60,
            site_lat: None,
            site_lon: None,
            db_dir: None,
            fetch_failure_banner_after: 3,
            filter_state_path: None,
            display_units: DisplayUnits::default(),
            stats_interval_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup; unparsable
    /// values fall back to their defaults
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            data_source: var("DATA_SOURCE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.data_source),

            poll_interval_ms: parse_var(&var, "POLL_INTERVAL_MS").filter(|ms: &u64| *ms > 0),

            reaper_interval_secs: parse_var(&var, "REAPER_INTERVAL_SECS")
                .filter(|s: &u64| *s > 0)
                .unwrap_or(defaults.reaper_interval_secs),

            site_lat: parse_var(&var, "SITE_LAT"),
            site_lon: parse_var(&var, "SITE_LON"),

            db_dir: var("DB_DIR").map(PathBuf::from),

            fetch_failure_banner_after: parse_var(&var, "FETCH_FAILURE_BANNER_AFTER")
                .unwrap_or(defaults.fetch_failure_banner_after),

            filter_state_path: var("FILTER_STATE_PATH").map(PathBuf::from),

            display_units: parse_var(&var, "DISPLAY_UNITS").unwrap_or_default(),

            stats_interval_secs: parse_var(&var, "STATS_INTERVAL_SECS")
                .filter(|s: &u64| *s > 0)
                .unwrap_or(defaults.stats_interval_secs),
        }
    }

    /// Configured site, else the one the receiver advertises
    pub fn site(&self, receiver: &ReceiverInfo) -> Option<LatLon> {
        match (self.site_lat, self.site_lon) {
            (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)),
            _ => receiver.site(),
        }
    }

    /// Configured poll interval, else the receiver's refresh, else one second
    pub fn poll_interval(&self, receiver: &ReceiverInfo) -> Duration {
        let ms = self
            .poll_interval_ms
            .or(receiver.refresh.filter(|ms| *ms > 0))
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}
