//! Tracker runtime
//!
//! [`TrackerService`] is the single owner of the [`AircraftRegistry`]. It
//! backfills history once, then runs one `select!` loop over the poll and
//! reaper timers, finished metadata lookups and commands from the
//! [`TrackerHandle`]. Every poll ends with a JSON [`UpdateFrame`] on the
//! broadcast channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::aircraft::track::Segment;
use crate::aircraft::Aircraft;
use crate::backfill;
use crate::config::Config;
use crate::error::{FilterError, ServiceStopped, SourceError};
use crate::filter::{Filter, FilterSet};
use crate::format::{self, DisplayUnits};
use crate::geo::{BoundingBox, LatLon};
use crate::metadata::{self, AircraftRecord, JsonDb, LookupOutcome, MetadataStore};
use crate::registry::rows::{RowOp, TableRow};
use crate::registry::sort::SortColumn;
use crate::registry::{AircraftRegistry, TrackerStats};
use crate::render::{DrawBuffer, DrawOp};
use crate::snapshot::Address;
use crate::source::{self, ReceiverInfo, SnapshotSource};

const COMMAND_QUEUE: usize = 64;
const FRAME_QUEUE: usize = 256;
const LOOKUP_QUEUE: usize = 1024;

/// Requests answered by the tracker task
#[derive(Debug)]
pub enum TrackerCommand {
    Table {
        reply: oneshot::Sender<TableView>,
    },
    Aircraft {
        address: Address,
        reply: oneshot::Sender<Option<Aircraft>>,
    },
    Track {
        address: Address,
        reply: oneshot::Sender<Option<TrackView>>,
    },
    Sort {
        column: SortColumn,
        reply: oneshot::Sender<(SortColumn, bool)>,
    },
    Filters {
        reply: oneshot::Sender<FilterSet>,
    },
    AddFilter {
        filter: Filter,
        reply: oneshot::Sender<Result<usize, FilterError>>,
    },
    RemoveFilter {
        index: usize,
        reply: oneshot::Sender<Result<Filter, FilterError>>,
    },
    ReplaceFilter {
        index: usize,
        filter: Filter,
        reply: oneshot::Sender<Result<(), FilterError>>,
    },
    Highlight {
        on: bool,
        reply: oneshot::Sender<()>,
    },
    Click {
        address: Option<Address>,
        reply: oneshot::Sender<bool>,
    },
    DoubleClick {
        address: Address,
        reply: oneshot::Sender<bool>,
    },
    SelectAll {
        on: bool,
        reply: oneshot::Sender<()>,
    },
    EditMetadata {
        address: Address,
        record: AircraftRecord,
        reply: oneshot::Sender<bool>,
    },
    Viewport {
        viewport: Option<BoundingBox>,
        only_in_view: Option<bool>,
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<ServiceStatus>,
    },
}

/// The listed rows in table order
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub stats: TrackerStats,
    pub sort_column: SortColumn,
    pub ascending: bool,
    pub units: DisplayUnits,
    /// Altitude, speed and distance unit labels
    pub labels: (&'static str, &'static str, &'static str),
    pub rows: Vec<TableRow>,
}

/// Committed trail plus the live edge of one aircraft
#[derive(Debug, Clone, Serialize)]
pub struct TrackView {
    pub address: Address,
    pub segments: Vec<Segment>,
    pub elastic: Option<[LatLon; 2]>,
}

/// Outcome of recent snapshot fetches
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchHealth {
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

impl FetchHealth {
    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_error = None;
        self.last_success = Some(Utc::now());
    }

    fn record_failure(&mut self, error: &SourceError) {
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
    }

    /// Warning shown once `threshold` fetches in a row have failed
    pub fn banner(&self, threshold: u32) -> Option<String> {
        if threshold == 0 || self.consecutive_failures < threshold {
            return None;
        }
        Some(format!(
            "Problem fetching data from the receiver: {}. The displayed map data will be out of date.",
            self.last_error.as_deref().unwrap_or("unknown error")
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub source: String,
    pub receiver: ReceiverInfo,
    pub site: Option<LatLon>,
    pub poll_interval_ms: u64,
    pub health: FetchHealth,
    pub banner: Option<String>,
    /// Set when the metadata database could not be opened
    pub metadata_notice: Option<String>,
    pub stats: TrackerStats,
    pub receiver_now: f64,
    pub units: DisplayUnits,
    pub sort_column: SortColumn,
    pub sort_ascending: bool,
    pub selected: Option<Address>,
    pub following: Option<Address>,
    pub select_all: bool,
    pub filters: FilterSet,
}

/// Broadcast after every poll and every user action
#[derive(Debug, Clone, Serialize)]
pub struct UpdateFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub now: f64,
    pub stats: TrackerStats,
    pub draw: Vec<DrawOp>,
    pub rows: Vec<RowOp>,
    /// Rows whose contents changed
    pub updated: Vec<TableRow>,
    pub banner: Option<String>,
}

/// Cloneable client side of the tracker task
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    frames: broadcast::Sender<String>,
}

impl TrackerHandle {
    /// Receive every [`UpdateFrame`] as JSON
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.frames.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> TrackerCommand,
    ) -> Result<T, ServiceStopped> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| ServiceStopped)?;
        rx.await.map_err(|_| ServiceStopped)
    }

    pub async fn table(&self) -> Result<TableView, ServiceStopped> {
        self.request(|reply| TrackerCommand::Table { reply }).await
    }

    pub async fn aircraft(&self, address: Address) -> Result<Option<Aircraft>, ServiceStopped> {
        self.request(|reply| TrackerCommand::Aircraft { address, reply })
            .await
    }

    pub async fn track(&self, address: Address) -> Result<Option<TrackView>, ServiceStopped> {
        self.request(|reply| TrackerCommand::Track { address, reply })
            .await
    }

    pub async fn sort_by(&self, column: SortColumn) -> Result<(SortColumn, bool), ServiceStopped> {
        self.request(|reply| TrackerCommand::Sort { column, reply })
            .await
    }

    pub async fn filters(&self) -> Result<FilterSet, ServiceStopped> {
        self.request(|reply| TrackerCommand::Filters { reply }).await
    }

    pub async fn add_filter(&self, filter: Filter) -> Result<Result<usize, FilterError>, ServiceStopped> {
        self.request(|reply| TrackerCommand::AddFilter { filter, reply })
            .await
    }

    pub async fn remove_filter(
        &self,
        index: usize,
    ) -> Result<Result<Filter, FilterError>, ServiceStopped> {
        self.request(|reply| TrackerCommand::RemoveFilter { index, reply })
            .await
    }

    pub async fn replace_filter(
        &self,
        index: usize,
        filter: Filter,
    ) -> Result<Result<(), FilterError>, ServiceStopped> {
        self.request(|reply| TrackerCommand::ReplaceFilter { index, filter, reply })
            .await
    }

    pub async fn set_highlight(&self, on: bool) -> Result<(), ServiceStopped> {
        self.request(|reply| TrackerCommand::Highlight { on, reply })
            .await
    }

    pub async fn click(&self, address: Option<Address>) -> Result<bool, ServiceStopped> {
        self.request(|reply| TrackerCommand::Click { address, reply })
            .await
    }

    pub async fn double_click(&self, address: Address) -> Result<bool, ServiceStopped> {
        self.request(|reply| TrackerCommand::DoubleClick { address, reply })
            .await
    }

    pub async fn select_all(&self, on: bool) -> Result<(), ServiceStopped> {
        self.request(|reply| TrackerCommand::SelectAll { on, reply })
            .await
    }

    pub async fn edit_metadata(
        &self,
        address: Address,
        record: AircraftRecord,
    ) -> Result<bool, ServiceStopped> {
        self.request(|reply| TrackerCommand::EditMetadata { address, record, reply })
            .await
    }

    pub async fn set_viewport(
        &self,
        viewport: Option<BoundingBox>,
        only_in_view: Option<bool>,
    ) -> Result<(), ServiceStopped> {
        self.request(|reply| TrackerCommand::Viewport {
            viewport,
            only_in_view,
            reply,
        })
        .await
    }

    pub async fn status(&self) -> Result<ServiceStatus, ServiceStopped> {
        self.request(|reply| TrackerCommand::Status { reply }).await
    }
}

pub struct TrackerService {
    config: Config,
    source: Arc<dyn SnapshotSource>,
    store: Option<Arc<dyn MetadataStore>>,
    metadata_notice: Option<String>,
    registry: AircraftRegistry<DrawBuffer>,
    receiver: ReceiverInfo,
    poll_interval: Duration,
    health: FetchHealth,
    commands: mpsc::Receiver<TrackerCommand>,
    frames: broadcast::Sender<String>,
    lookup_tx: mpsc::Sender<LookupOutcome>,
    lookup_rx: mpsc::Receiver<LookupOutcome>,
}

impl TrackerService {
    pub fn new(
        config: Config,
        source: Arc<dyn SnapshotSource>,
        store: Option<Arc<dyn MetadataStore>>,
        metadata_notice: Option<String>,
    ) -> (Self, TrackerHandle) {
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (frames, _) = broadcast::channel(FRAME_QUEUE);
        let (lookup_tx, lookup_rx) = mpsc::channel(LOOKUP_QUEUE);

        let registry = AircraftRegistry::new(DrawBuffer::new(), None, config.display_units);
        let poll_interval = config.poll_interval(&ReceiverInfo::default());

        let handle = TrackerHandle {
            commands: command_tx,
            frames: frames.clone(),
        };
        let service = Self {
            config,
            source,
            store,
            metadata_notice,
            registry,
            receiver: ReceiverInfo::default(),
            poll_interval,
            health: FetchHealth::default(),
            commands,
            frames,
            lookup_tx,
            lookup_rx,
        };
        (service, handle)
    }

    /// Build the source, metadata store and saved filters named by `config`
    pub async fn open(config: Config) -> Result<(Self, TrackerHandle)> {
        let source: Arc<dyn SnapshotSource> = Arc::from(source::from_location(&config.data_source)?);

        let (store, notice) = match &config.db_dir {
            Some(dir) => match JsonDb::open(dir).await {
                Ok(db) => {
                    info!("Metadata database: {}", dir.display());
                    (Some(Arc::new(db) as Arc<dyn MetadataStore>), None)
                }
                Err(e) => {
                    error!("{}; aircraft metadata lookups are disabled", e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        let filters = match &config.filter_state_path {
            Some(path) => FilterSet::load(path).await.unwrap_or_else(|e| {
                warn!("Ignoring saved filters: {}", e);
                FilterSet::default()
            }),
            None => FilterSet::default(),
        };

        let (mut service, handle) = Self::new(config, source, store, notice);
        service.registry.set_filters(filters);
        Ok((service, handle))
    }

    /// Run until `shutdown` resolves
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        self.start().await;

        info!(
            "Polling {} every {} ms",
            self.source.location(),
            self.poll_interval.as_millis()
        );
        let mut poll = interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reaper = interval(self.config.reaper_interval());
        reaper.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = interval(self.config.stats_interval());
        stats.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = poll.tick() => self.poll().await,
                _ = reaper.tick() => self.reap(),
                _ = stats.tick() => info!("[Tracker] {}", self.registry.stats()),
                Some(outcome) = self.lookup_rx.recv() => {
                    self.registry.apply_lookup(outcome);
                    self.dispatch_lookups();
                }
                Some(command) = self.commands.recv() => self.handle(command).await,
                _ = &mut shutdown => {
                    info!("Tracker shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Read receiver.json and replay the advertised history
    async fn start(&mut self) {
        match self.source.receiver().await {
            Ok(receiver) => {
                info!(
                    "Receiver {} ({} history chunks)",
                    receiver.version.as_deref().unwrap_or("unknown version"),
                    receiver.history.unwrap_or(0)
                );
                self.receiver = receiver;
            }
            Err(e) => warn!("Failed to read receiver info from {}: {}", self.source.location(), e),
        }

        let site = self.config.site(&self.receiver);
        if let Some(site) = site {
            info!("Receiver site: {:.4}, {:.4}", site.lat, site.lon);
        }
        self.registry.set_site(site);
        self.poll_interval = self.config.poll_interval(&self.receiver);

        let history = self.receiver.history.unwrap_or(0);
        if history > 0 {
            let chunks = backfill::load_history(self.source.clone(), history).await;
            backfill::replay(&mut self.registry, &chunks);
            self.dispatch_lookups();
        }
        self.publish();
    }

    async fn poll(&mut self) {
        match self.source.snapshot().await {
            Ok(snapshot) => {
                if self.banner().is_some() {
                    info!("Receiver data is available again");
                }
                self.health.record_success();
                if self.registry.update(&snapshot) {
                    self.registry.refresh();
                    self.registry.resort();
                }
                self.dispatch_lookups();
            }
            Err(e) => {
                self.health.record_failure(&e);
                warn!(
                    "Failed to fetch aircraft data from {}: {} ({} in a row)",
                    self.source.location(),
                    e,
                    self.health.consecutive_failures
                );
            }
        }
        self.publish();
    }

    fn reap(&mut self) {
        if self.registry.clean() > 0 {
            self.registry.refresh();
            self.publish();
        }
    }

    fn banner(&self) -> Option<String> {
        self.health.banner(self.config.fetch_failure_banner_after)
    }

    /// Spawn a task per queued metadata request; results come back on the
    /// lookup channel
    fn dispatch_lookups(&mut self) {
        let requests = self.registry.take_lookups();
        let Some(store) = &self.store else {
            return;
        };
        for request in requests {
            debug!("Metadata lookup {:?} for {}", request.kind, request.address);
            let store = store.clone();
            let tx = self.lookup_tx.clone();
            tokio::spawn(async move {
                let outcome = metadata::resolve(store.as_ref(), request).await;
                let _ = tx.send(outcome).await;
            });
        }
    }

    /// Drain pending draw ops and row changes into one frame
    fn publish(&mut self) {
        let draw = self.registry.layer_mut().drain();
        let rows = self.registry.reconcile_rows();
        let updated: Vec<TableRow> = self
            .registry
            .take_changed_rows()
            .iter()
            .filter_map(|address| self.registry.get(address))
            .map(|a| a.row.clone())
            .collect();

        if self.frames.receiver_count() == 0 {
            return;
        }
        let frame = UpdateFrame {
            kind: "update",
            now: self.registry.now(),
            stats: self.registry.stats(),
            draw,
            rows,
            updated,
            banner: self.banner(),
        };
        match serde_json::to_string(&frame) {
            Ok(json) => {
                let _ = self.frames.send(json);
            }
            Err(e) => warn!("Failed to encode update frame: {}", e),
        }
    }

    async fn filters_changed(&mut self) {
        self.registry.refresh();
        self.publish();
        if let Some(path) = &self.config.filter_state_path {
            if let Err(e) = self.registry.filters().save(path).await {
                warn!("Failed to save filters: {}", e);
            }
        }
    }

    fn table_view(&self) -> TableView {
        let (sort_column, ascending) = self.registry.sort_state();
        let units = self.registry.units();
        TableView {
            stats: self.registry.stats(),
            sort_column,
            ascending,
            units,
            labels: format::unit_labels(units),
            rows: self.registry.table().into_iter().map(|a| a.row.clone()).collect(),
        }
    }

    fn track_view(&self, address: Address) -> Option<TrackView> {
        let aircraft = self.registry.get(&address)?;
        Some(TrackView {
            address,
            segments: aircraft.track_log.segments().to_vec(),
            elastic: aircraft.position.and_then(|p| aircraft.track_log.elastic(p)),
        })
    }

    fn status(&self) -> ServiceStatus {
        let (sort_column, sort_ascending) = self.registry.sort_state();
        ServiceStatus {
            source: self.source.location(),
            receiver: self.receiver.clone(),
            site: self.config.site(&self.receiver),
            poll_interval_ms: self.poll_interval.as_millis() as u64,
            health: self.health.clone(),
            banner: self.banner(),
            metadata_notice: self.metadata_notice.clone(),
            stats: self.registry.stats(),
            receiver_now: self.registry.now(),
            units: self.registry.units(),
            sort_column,
            sort_ascending,
            selected: self.registry.selected(),
            following: self.registry.following(),
            select_all: self.registry.select_all(),
            filters: self.registry.filters().clone(),
        }
    }

    async fn handle(&mut self, command: TrackerCommand) {
        match command {
            TrackerCommand::Table { reply } => {
                let _ = reply.send(self.table_view());
            }
            TrackerCommand::Aircraft { address, reply } => {
                let _ = reply.send(self.registry.get(&address).cloned());
            }
            TrackerCommand::Track { address, reply } => {
                let _ = reply.send(self.track_view(address));
            }
            TrackerCommand::Sort { column, reply } => {
                self.registry.sort_by(column);
                self.publish();
                let _ = reply.send(self.registry.sort_state());
            }
            TrackerCommand::Filters { reply } => {
                let _ = reply.send(self.registry.filters().clone());
            }
            TrackerCommand::AddFilter { filter, reply } => {
                let result = self.registry.add_filter(filter);
                if result.is_ok() {
                    self.filters_changed().await;
                }
                let _ = reply.send(result);
            }
            TrackerCommand::RemoveFilter { index, reply } => {
                let result = self.registry.remove_filter(index);
                if result.is_ok() {
                    self.filters_changed().await;
                }
                let _ = reply.send(result);
            }
            TrackerCommand::ReplaceFilter { index, filter, reply } => {
                let result = self.registry.replace_filter(index, filter);
                if result.is_ok() {
                    self.filters_changed().await;
                }
                let _ = reply.send(result);
            }
            TrackerCommand::Highlight { on, reply } => {
                self.registry.set_highlight(on);
                self.filters_changed().await;
                let _ = reply.send(());
            }
            TrackerCommand::Click { address, reply } => {
                let known = self.registry.click(address);
                self.registry.refresh();
                self.publish();
                let _ = reply.send(known);
            }
            TrackerCommand::DoubleClick { address, reply } => {
                let known = self.registry.double_click(address);
                self.registry.refresh();
                self.publish();
                let _ = reply.send(known);
            }
            TrackerCommand::SelectAll { on, reply } => {
                self.registry.set_select_all(on);
                self.registry.refresh();
                self.publish();
                let _ = reply.send(());
            }
            TrackerCommand::EditMetadata { address, record, reply } => {
                let known = self.registry.edit_metadata(address, record);
                if known {
                    self.dispatch_lookups();
                    self.registry.refresh();
                    self.publish();
                }
                let _ = reply.send(known);
            }
            TrackerCommand::Viewport {
                viewport,
                only_in_view,
                reply,
            } => {
                self.registry.set_viewport(viewport);
                if let Some(on) = only_in_view {
                    self.registry.set_only_in_view(on);
                }
                self.registry.refresh();
                self.publish();
                let _ = reply.send(());
            }
            TrackerCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }
}
