//! History backfill
//!
//! At startup every advertised `history_<n>.json` chunk is fetched, at most
//! [`FETCH_CONCURRENCY`] at a time. Replay happens exactly once: when the
//! last chunk arrives, or at the first failure with whatever had arrived by
//! then.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::error::SourceError;
use crate::registry::AircraftRegistry;
use crate::render::MapLayer;
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;

/// dump1090 keeps at most this many history chunks; larger counts are clamped
pub const MAX_HISTORY_CHUNKS: u32 = 120;

/// Chunk fetches in flight at once
pub const FETCH_CONCURRENCY: usize = 8;

/// Counts chunk results and releases them once
#[derive(Debug)]
pub struct HistoryCollector {
    expected: u32,
    returned: u32,
    chunks: Vec<Snapshot>,
    done: bool,
}

impl HistoryCollector {
    pub fn new(expected: u32) -> Self {
        Self {
            expected,
            returned: 0,
            chunks: Vec::new(),
            done: expected == 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Record one chunk result. Returns the chunks, oldest first, the one
    /// time backfill completes; results after that are ignored.
    pub fn record(&mut self, result: Result<Snapshot, SourceError>) -> Option<Vec<Snapshot>> {
        if self.done {
            return None;
        }

        match result {
            Ok(chunk) => {
                self.chunks.push(chunk);
                self.returned += 1;
                if self.returned < self.expected {
                    return None;
                }
            }
            Err(e) => {
                warn!(
                    "History chunk failed ({}), replaying {} of {} chunks",
                    e, self.returned, self.expected
                );
            }
        }

        self.done = true;
        let mut chunks = std::mem::take(&mut self.chunks);
        chunks.sort_by(|a, b| a.now.total_cmp(&b.now));
        Some(chunks)
    }
}

/// Fetch the first `count` history chunks, [`FETCH_CONCURRENCY`] at a time
pub async fn load_history(source: Arc<dyn SnapshotSource>, count: u32) -> Vec<Snapshot> {
    if count > MAX_HISTORY_CHUNKS {
        warn!(
            "Receiver advertises {} history chunks, loading only {}",
            count, MAX_HISTORY_CHUNKS
        );
    }
    let count = count.min(MAX_HISTORY_CHUNKS);
    let mut collector = HistoryCollector::new(count);
    if collector.is_done() {
        return Vec::new();
    }

    info!("Loading {} history chunks from {}", count, source.location());
    let permits = Arc::new(Semaphore::new(FETCH_CONCURRENCY));
    let (tx, mut rx) = mpsc::channel(FETCH_CONCURRENCY);
    for chunk in 0..count {
        let source = source.clone();
        let permits = permits.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            // closed once backfill has finished
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let result = source.history(chunk).await;
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut chunks = Vec::new();
    while let Some(result) = rx.recv().await {
        if let Some(done) = collector.record(result) {
            chunks = done;
            break;
        }
    }
    permits.close();
    chunks
}

/// Feed backfilled chunks through the registry in time order
pub fn replay<L: MapLayer>(registry: &mut AircraftRegistry<L>, chunks: &[Snapshot]) -> usize {
    let mut applied = 0;
    for chunk in chunks {
        if registry.update(chunk) {
            applied += 1;
        }
    }
    if applied > 0 {
        registry.refresh();
        registry.resort();
        info!(
            "Replayed {} history chunks, {} aircraft known",
            applied,
            registry.len()
        );
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DisplayUnits;
    use crate::render::DrawBuffer;
    use crate::source::{DirSource, ReceiverInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(now: f64) -> Snapshot {
        Snapshot::from_slice(format!(r#"{{"now":{},"aircraft":[]}}"#, now).as_bytes()).unwrap()
    }

    fn failure() -> SourceError {
        SourceError::Io {
            path: "history_9.json".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    #[test]
    fn test_collector_completes_once() {
        let mut collector = HistoryCollector::new(3);
        assert!(collector.record(Ok(chunk(30.0))).is_none());
        assert!(collector.record(Ok(chunk(10.0))).is_none());
        let chunks = collector.record(Ok(chunk(20.0))).unwrap();
        let times: Vec<f64> = chunks.iter().map(|c| c.now).collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);

        assert!(collector.record(Ok(chunk(40.0))).is_none());
    }

    #[test]
    fn test_failure_finishes_early() {
        let mut collector = HistoryCollector::new(3);
        assert!(collector.record(Ok(chunk(10.0))).is_none());
        let chunks = collector.record(Err(failure())).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(collector.is_done());

        // later results are ignored
        assert!(collector.record(Ok(chunk(20.0))).is_none());
        assert!(collector.record(Err(failure())).is_none());
    }

    #[tokio::test]
    async fn test_load_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        for (n, now) in [(0, 20.0), (1, 10.0)] {
            let body = format!(
                r#"{{"now":{},"aircraft":[{{"hex":"4840d6","lat":52.0,"lon":{}}}]}}"#,
                now,
                4.0 + now / 100.0
            );
            std::fs::write(dir.path().join(format!("history_{}.json", n)), body).unwrap();
        }

        let source: Arc<dyn SnapshotSource> = Arc::new(DirSource::new(dir.path()));
        let chunks = load_history(source, 2).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].now, 10.0);

        let mut registry = AircraftRegistry::new(DrawBuffer::new(), None, DisplayUnits::Nautical);
        assert_eq!(replay(&mut registry, &chunks), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.now(), 20.0);
    }

    #[tokio::test]
    async fn test_load_with_missing_chunk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("history_0.json"), r#"{"now":5,"aircraft":[]}"#).unwrap();

        let source: Arc<dyn SnapshotSource> = Arc::new(DirSource::new(dir.path()));
        let chunks = load_history(source, 3).await;
        assert!(chunks.len() <= 1);
    }

    /// Serves empty chunks and records how many fetches overlap
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for CountingSource {
        async fn receiver(&self) -> Result<ReceiverInfo, SourceError> {
            Ok(ReceiverInfo::default())
        }

        async fn snapshot(&self) -> Result<Snapshot, SourceError> {
            Ok(chunk(0.0))
        }

        async fn history(&self, n: u32) -> Result<Snapshot, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(chunk(f64::from(n)))
        }

        fn location(&self) -> String {
            "counting".to_string()
        }
    }

    #[tokio::test]
    async fn test_advertised_count_is_bounded() {
        let source = Arc::new(CountingSource::default());
        let chunks = load_history(source.clone(), u32::MAX).await;

        assert_eq!(chunks.len(), MAX_HISTORY_CHUNKS as usize);
        assert_eq!(source.calls.load(Ordering::SeqCst), MAX_HISTORY_CHUNKS as usize);
        assert!(source.peak.load(Ordering::SeqCst) <= FETCH_CONCURRENCY);
        assert_eq!(chunks[0].now, 0.0);
    }

    #[tokio::test]
    async fn test_no_history() {
        let dir = tempfile::tempdir().unwrap();
        let source: Arc<dyn SnapshotSource> = Arc::new(DirSource::new(dir.path()));
        assert!(load_history(source, 0).await.is_empty());
    }
}
