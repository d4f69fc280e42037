//! Snapshot sources
//!
//! The receiver publishes `receiver.json`, `aircraft.json` and a ring of
//! `history_<n>.json` chunks, either over HTTP or as files in a directory
//! (dump1090 `--write-json`). [`SnapshotSource`] hides which.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SourceError;
use crate::geo::LatLon;
use crate::snapshot::Snapshot;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Contents of `receiver.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverInfo {
    #[serde(default)]
    pub version: Option<String>,
    /// Suggested poll interval in milliseconds
    #[serde(default)]
    pub refresh: Option<u64>,
    /// Number of history chunks available
    #[serde(default)]
    pub history: Option<u32>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl ReceiverInfo {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SourceError> {
        serde_json::from_slice(bytes).map_err(SourceError::ReceiverInfo)
    }

    /// Receiver location, when advertised and plausible
    pub fn site(&self) -> Option<LatLon> {
        let (lat, lon) = (self.lat?, self.lon?);
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return None;
        }
        Some(LatLon::new(lat, lon))
    }
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn receiver(&self) -> Result<ReceiverInfo, SourceError>;

    /// The current `aircraft.json`
    async fn snapshot(&self) -> Result<Snapshot, SourceError>;

    /// History chunk `history_<chunk>.json`
    async fn history(&self, chunk: u32) -> Result<Snapshot, SourceError>;

    /// Where snapshots come from, for logging
    fn location(&self) -> String;
}

/// Pick a source for `location`: an http(s) URL or a directory path
pub fn from_location(location: &str) -> Result<Box<dyn SnapshotSource>, SourceError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpSource::new(location)?))
    } else {
        Ok(Box::new(DirSource::new(location)))
    }
}

/// Reads the receiver's JSON over HTTP
pub struct HttpSource {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn receiver(&self) -> Result<ReceiverInfo, SourceError> {
        ReceiverInfo::from_slice(&self.fetch("receiver.json").await?)
    }

    async fn snapshot(&self) -> Result<Snapshot, SourceError> {
        Ok(Snapshot::from_slice(&self.fetch("aircraft.json").await?)?)
    }

    async fn history(&self, chunk: u32) -> Result<Snapshot, SourceError> {
        let name = format!("history_{}.json", chunk);
        Ok(Snapshot::from_slice(&self.fetch(&name).await?)?)
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }
}

/// Reads the JSON files dump1090 writes to disk
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.root.join(name);
        tokio::fs::read(&path)
            .await
            .map_err(|source| SourceError::Io { path, source })
    }
}

#[async_trait]
impl SnapshotSource for DirSource {
    async fn receiver(&self) -> Result<ReceiverInfo, SourceError> {
        ReceiverInfo::from_slice(&self.read("receiver.json").await?)
    }

    async fn snapshot(&self) -> Result<Snapshot, SourceError> {
        Ok(Snapshot::from_slice(&self.read("aircraft.json").await?)?)
    }

    async fn history(&self, chunk: u32) -> Result<Snapshot, SourceError> {
        let name = format!("history_{}.json", chunk);
        Ok(Snapshot::from_slice(&self.read(&name).await?)?)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
