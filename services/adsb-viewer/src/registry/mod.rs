//! Aircraft registry
//!
//! Owns every tracked [`Aircraft`] and the state that spans them: the
//! insertion-ordered address list, selection and follow mode, the sort
//! column, the filter set, the map layer and the table row mirror.
//! All mutation happens on the task that owns the registry.

pub mod rows;
pub mod sort;
mod stats;

pub use stats::TrackerStats;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::aircraft::marker::IconCache;
use crate::aircraft::{Aircraft, LookupState, TickContext};
use crate::error::FilterError;
use crate::filter::{Filter, FilterSet, FilterVerdict};
use crate::format::DisplayUnits;
use crate::geo::{BoundingBox, LatLon};
use crate::metadata::{AircraftRecord, LookupKind, LookupOutcome, LookupReply, LookupRequest};
use crate::render::MapLayer;
use crate::snapshot::{Address, Snapshot};

use self::rows::{RowMirror, RowOp, TableRow};
use self::sort::SortColumn;

/// Silence after which an aircraft is destroyed by [`AircraftRegistry::clean`]
pub const REAP_AFTER_SECS: f64 = 300.0;

pub struct AircraftRegistry<L: MapLayer> {
    order: Vec<Address>,
    aircraft: HashMap<Address, Aircraft>,
    selected: Option<Address>,
    select_all: bool,
    follow: Option<Address>,
    last_center: Option<LatLon>,
    sort_column: SortColumn,
    sort_ascending: bool,
    filters: FilterSet,
    layer: L,
    icons: IconCache,
    rows: RowMirror,
    changed_rows: Vec<Address>,
    lookups: Vec<LookupRequest>,
    site: Option<LatLon>,
    units: DisplayUnits,
    viewport: Option<BoundingBox>,
    only_in_view: bool,
    now: f64,
    last_now: f64,
    next_serial: u64,
    stats: TrackerStats,
}

impl<L: MapLayer> AircraftRegistry<L> {
    pub fn new(layer: L, site: Option<LatLon>, units: DisplayUnits) -> Self {
        Self {
            order: Vec::new(),
            aircraft: HashMap::new(),
            selected: None,
            select_all: false,
            follow: None,
            last_center: None,
            sort_column: SortColumn::Altitude,
            sort_ascending: true,
            filters: FilterSet::default(),
            layer,
            icons: IconCache::new(),
            rows: RowMirror::default(),
            changed_rows: Vec::new(),
            lookups: Vec::new(),
            site,
            units,
            viewport: None,
            only_in_view: false,
            now: 0.0,
            last_now: 0.0,
            next_serial: 0,
            stats: TrackerStats::default(),
        }
    }

    /// Apply one snapshot. Snapshots older than the last one applied are
    /// ignored; returns whether this one was used.
    pub fn update(&mut self, snapshot: &Snapshot) -> bool {
        if snapshot.now < self.now {
            debug!(
                "Ignoring out-of-order snapshot ({} < {})",
                snapshot.now, self.now
            );
            return false;
        }
        self.last_now = self.now;
        self.now = snapshot.now;

        for record in snapshot.records() {
            let Some(address) = record.hex().and_then(Address::parse) else {
                debug!("Skipping record with invalid address {:?}", record.hex());
                continue;
            };
            if address.is_null() {
                continue;
            }

            if !self.aircraft.contains_key(&address) {
                let serial = self.next_serial;
                self.next_serial += 1;
                let mut aircraft = Aircraft::new(address, serial, &mut self.lookups);
                aircraft.selected = self.select_all;
                self.aircraft.insert(address, aircraft);
                self.order.push(address);
                debug!("New aircraft tracked: {}", address);
            }

            if let Some(aircraft) = self.aircraft.get_mut(&address) {
                aircraft.update_data(self.now, &record, self.site, &mut self.lookups);
            }
        }

        self.tick_all();
        true
    }

    /// Re-run the tick with the current receiver time, e.g. after the
    /// selection or the filters changed
    pub fn retick(&mut self) {
        self.tick_all();
    }

    fn tick_all(&mut self) {
        let mut lost = Vec::new();

        for address in &self.order {
            let Some(aircraft) = self.aircraft.get_mut(address) else {
                continue;
            };

            let singly_selected = !self.select_all && self.selected == Some(*address);
            aircraft.selected = singly_selected || (self.select_all && aircraft.selected);

            let verdict = self.filters.verdict(aircraft, singly_selected);
            aircraft.highlighted = verdict == FilterVerdict::Highlight;

            let out_of_view = self.only_in_view
                && self.viewport.map_or(false, |viewport| {
                    aircraft.position.map_or(true, |p| !viewport.contains(&p))
                });

            let ctx = TickContext {
                filtered: verdict == FilterVerdict::Exclude,
                out_of_view,
                select_all: self.select_all,
            };
            let outcome =
                aircraft.update_tick(self.now, self.last_now, &ctx, &mut self.layer, &mut self.icons);
            if outcome.lost_selection {
                lost.push(*address);
            }
            if self.select_all {
                aircraft.selected = aircraft.is_visible();
            }
        }

        for address in lost {
            debug!("Selected aircraft {} is no longer shown", address);
            if self.selected == Some(address) {
                self.selected = None;
            }
            if self.follow == Some(address) {
                self.follow = None;
            }
        }

        self.follow_selected();
    }

    fn follow_selected(&mut self) {
        let position = self
            .follow
            .and_then(|address| self.aircraft.get(&address))
            .filter(|a| a.is_visible())
            .and_then(|a| a.position);
        match position {
            Some(p) if self.last_center != Some(p) => {
                self.layer.center_on(p);
                self.last_center = Some(p);
            }
            Some(_) => {}
            None => self.last_center = None,
        }
    }

    /// Recompute counters and re-render the rows of listed aircraft
    pub fn refresh(&mut self) -> TrackerStats {
        let mut stats = TrackerStats {
            tracked: self.aircraft.len(),
            ..Default::default()
        };

        for address in &self.order {
            let Some(aircraft) = self.aircraft.get_mut(address) else {
                continue;
            };
            if aircraft.is_visible() {
                stats.with_position += 1;
            }
            if aircraft.civilian.is_none() {
                stats.unknown_classification += 1;
            }
            stats.history_points += aircraft.track_log.point_count();

            if !aircraft.is_listed() {
                continue;
            }
            let row = TableRow::render(aircraft, self.units);
            if row != aircraft.row {
                aircraft.row = row;
                self.changed_rows.push(*address);
            }
        }

        self.stats = stats;
        stats
    }

    /// Rows re-rendered since the last call
    pub fn take_changed_rows(&mut self) -> Vec<Address> {
        std::mem::take(&mut self.changed_rows)
    }

    /// Reorder the address list by the active column
    pub fn resort(&mut self) {
        let column = self.sort_column;
        for (pos, address) in self.order.iter().enumerate() {
            if let Some(aircraft) = self.aircraft.get_mut(address) {
                aircraft.sort_pos = pos;
                aircraft.sort_value = column.value(aircraft);
            }
        }

        let ascending = self.sort_ascending;
        let mut entries: Vec<&Aircraft> = self
            .order
            .iter()
            .filter_map(|address| self.aircraft.get(address))
            .collect();
        entries.sort_unstable_by(|a, b| sort::compare(a, b, ascending));
        self.order = entries.iter().map(|a| a.address).collect();
    }

    /// Sort by `column`; choosing the active column again flips the direction
    pub fn sort_by(&mut self, column: SortColumn) {
        if column == self.sort_column {
            self.order.reverse();
            self.sort_ascending = !self.sort_ascending;
        } else {
            self.sort_column = column;
            self.sort_ascending = true;
        }
        self.resort();
    }

    pub fn sort_state(&self) -> (SortColumn, bool) {
        (self.sort_column, self.sort_ascending)
    }

    /// Bring the table rows in line with the sorted list of listed aircraft
    pub fn reconcile_rows(&mut self) -> Vec<RowOp> {
        let target: Vec<Address> = self
            .order
            .iter()
            .copied()
            .filter(|address| self.aircraft.get(address).map_or(false, |a| a.is_listed()))
            .collect();
        self.rows.reconcile(&target)
    }

    /// Destroy aircraft not heard from in [`REAP_AFTER_SECS`]; their rows
    /// disappear on the next [`reconcile_rows`](Self::reconcile_rows)
    pub fn clean(&mut self) -> usize {
        let mut reaped = Vec::new();
        for address in &self.order {
            if let Some(aircraft) = self.aircraft.get(address) {
                if aircraft.seen > REAP_AFTER_SECS {
                    reaped.push(*address);
                }
            }
        }

        for address in &reaped {
            if let Some(mut aircraft) = self.aircraft.remove(address) {
                aircraft.clear_drawing(&mut self.layer);
                debug!("Removed aircraft {} after {:.0}s", address, aircraft.seen);
            }
            if self.selected == Some(*address) {
                self.selected = None;
            }
            if self.follow == Some(*address) {
                self.follow = None;
            }
        }
        self.order.retain(|address| self.aircraft.contains_key(address));

        if !reaped.is_empty() {
            info!("Reaped {} aircraft, {} remaining", reaped.len(), self.aircraft.len());
        }
        reaped.len()
    }

    /// Single click: toggle selection of `address`, or clear it with `None`.
    /// Leaves select-all mode. Returns false for an unknown address.
    pub fn click(&mut self, address: Option<Address>) -> bool {
        if let Some(address) = address {
            if !self.aircraft.contains_key(&address) {
                return false;
            }
        }
        if self.select_all {
            self.set_select_all(false);
        }

        let target = if address == self.selected { None } else { address };
        if let Some(previous) = self.selected.and_then(|a| self.aircraft.get_mut(&a)) {
            previous.selected = false;
        }
        self.selected = target;
        if self.follow != target {
            self.follow = None;
        }
        self.retick();
        true
    }

    /// Double click: select `address` and keep the map centred on it
    pub fn double_click(&mut self, address: Address) -> bool {
        if !self.aircraft.contains_key(&address) {
            return false;
        }
        if self.select_all {
            self.set_select_all(false);
        }
        if let Some(previous) = self.selected.and_then(|a| self.aircraft.get_mut(&a)) {
            previous.selected = false;
        }
        self.selected = Some(address);
        self.follow = Some(address);
        self.last_center = None;
        self.retick();
        true
    }

    /// Select (or deselect) every aircraft currently on the map
    pub fn set_select_all(&mut self, on: bool) {
        self.select_all = on;
        self.selected = None;
        self.follow = None;
        for aircraft in self.aircraft.values_mut() {
            aircraft.selected = on && aircraft.is_visible();
        }
        self.retick();
    }

    pub fn selected(&self) -> Option<Address> {
        self.selected
    }

    pub fn following(&self) -> Option<Address> {
        self.follow
    }

    pub fn select_all(&self) -> bool {
        self.select_all
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Replace the whole filter set, e.g. with one restored from disk
    pub fn set_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
        self.retick();
    }

    pub fn add_filter(&mut self, filter: Filter) -> Result<usize, FilterError> {
        let index = self.filters.add(filter)?;
        self.retick();
        Ok(index)
    }

    pub fn remove_filter(&mut self, index: usize) -> Result<Filter, FilterError> {
        let removed = self.filters.remove(index)?;
        self.retick();
        Ok(removed)
    }

    pub fn replace_filter(&mut self, index: usize, filter: Filter) -> Result<(), FilterError> {
        self.filters.replace(index, filter)?;
        self.retick();
        Ok(())
    }

    pub fn set_highlight(&mut self, on: bool) {
        self.filters.highlight = on;
        self.retick();
    }

    /// Apply a finished metadata lookup. Results for an entity that has
    /// since been destroyed (or re-created) are dropped.
    pub fn apply_lookup(&mut self, outcome: LookupOutcome) {
        let Some(aircraft) = self.aircraft.get_mut(&outcome.address) else {
            debug!("Dropping lookup result for departed aircraft {}", outcome.address);
            return;
        };
        if aircraft.serial != outcome.serial {
            debug!("Dropping stale lookup result for {}", outcome.address);
            return;
        }

        match outcome.reply {
            // a manual edit settles the aircraft entry before the database answers
            LookupReply::Aircraft(_) if aircraft.aircraft_lookup != LookupState::Pending => {
                debug!("Dropping database entry for edited aircraft {}", outcome.address);
            }
            LookupReply::Aircraft(Some(record)) => {
                if let Some(follow_up) = aircraft.apply_aircraft_record(&record) {
                    self.lookups.push(follow_up);
                }
            }
            LookupReply::Aircraft(None) => aircraft.aircraft_lookup = LookupState::Done,
            LookupReply::Type(Some(record)) => aircraft.apply_type_record(&record),
            LookupReply::Type(None) => aircraft.type_lookup = LookupState::Done,
            LookupReply::Operator(Some(record)) => aircraft.apply_operator_record(&record),
            LookupReply::Operator(None) => aircraft.operator_lookup = LookupState::Done,
            LookupReply::Stored => {}
        }
    }

    /// Apply a manual metadata edit and queue it for the store
    pub fn edit_metadata(&mut self, address: Address, record: AircraftRecord) -> bool {
        let Some(aircraft) = self.aircraft.get_mut(&address) else {
            return false;
        };
        let follow_up = aircraft.apply_aircraft_record(&record);
        self.lookups.push(aircraft.lookup(LookupKind::Store(record)));
        self.lookups.extend(follow_up);
        true
    }

    /// Metadata requests queued since the last call
    pub fn take_lookups(&mut self) -> Vec<LookupRequest> {
        std::mem::take(&mut self.lookups)
    }

    pub fn set_viewport(&mut self, viewport: Option<BoundingBox>) {
        self.viewport = viewport;
        if self.only_in_view {
            self.retick();
        }
    }

    pub fn set_only_in_view(&mut self, on: bool) {
        self.only_in_view = on;
        self.retick();
    }

    pub fn set_site(&mut self, site: Option<LatLon>) {
        self.site = site;
    }

    pub fn get(&self, address: &Address) -> Option<&Aircraft> {
        self.aircraft.get(address)
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    /// Every tracked address in sort order
    pub fn order(&self) -> &[Address] {
        &self.order
    }

    /// Aircraft currently listed in the table, in sort order
    pub fn table(&self) -> Vec<&Aircraft> {
        self.order
            .iter()
            .filter_map(|address| self.aircraft.get(address))
            .filter(|a| a.is_listed())
            .collect()
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn units(&self) -> DisplayUnits {
        self.units
    }

    pub fn layer_mut(&mut self) -> &mut L {
        &mut self.layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::{PositionSource, Visibility};
    use crate::filter::{FilterKind, RangeCondition, RangeOperand};
    use crate::geo::Altitude;
    use crate::metadata::TypeRecord;
    use crate::render::{DrawBuffer, DrawOp};
    use serde_json::{json, Value};

    fn registry() -> AircraftRegistry<DrawBuffer> {
        AircraftRegistry::new(DrawBuffer::new(), None, DisplayUnits::Nautical)
    }

    fn snapshot(now: f64, aircraft: Value) -> Snapshot {
        let body = json!({ "now": now, "aircraft": aircraft });
        Snapshot::from_slice(body.to_string().as_bytes()).unwrap()
    }

    fn addr(hex: &str) -> Address {
        Address::parse(hex).unwrap()
    }

    fn altitude_between(min: f64, max: f64) -> Filter {
        Filter::new(FilterKind::Altitude(RangeOperand {
            condition: RangeCondition::Between,
            min,
            max,
        }))
    }

    #[test]
    fn test_new_aircraft_positioned() {
        let mut reg = registry();
        assert!(reg.update(&snapshot(
            100.0,
            json!([{"hex": "4840d6", "alt_baro": 35000, "lat": 52.3, "lon": 4.8, "seen": 0.2, "seen_pos": 0.5}])
        )));

        assert_eq!(reg.len(), 1);
        let a = reg.get(&addr("4840d6")).unwrap();
        assert_eq!(a.altitude, Some(Altitude::Feet(35000)));
        assert_eq!(a.position, Some(LatLon::new(52.3, 4.8)));
        assert!(!a.is_mlat());
        assert_eq!(a.position_source, PositionSource::Adsb);
        assert!(a.is_visible());

        let lookups = reg.take_lookups();
        assert_eq!(lookups.len(), 1);
        assert_eq!(lookups[0].kind, LookupKind::Aircraft);
        assert!(reg.take_lookups().is_empty());
    }

    #[test]
    fn test_silent_aircraft_hidden() {
        let mut reg = registry();
        reg.update(&snapshot(100.0, json!([{"hex": "4840d6", "lat": 52.3, "lon": 4.8}])));
        reg.layer_mut().drain();

        reg.update(&snapshot(159.0, json!([])));
        let a = reg.get(&addr("4840d6")).unwrap();
        assert_eq!(a.seen, 59.0);
        assert_eq!(a.visibility, Visibility::Expired);
        assert!(reg
            .layer_mut()
            .drain()
            .contains(&DrawOp::RemoveMarker { address: addr("4840d6") }));
        assert!(reg.table().is_empty());
    }

    #[test]
    fn test_emergency_first_and_never_filtered() {
        let mut reg = registry();
        reg.add_filter(altitude_between(30_000.0, 40_000.0)).unwrap();
        reg.update(&snapshot(
            100.0,
            json!([
                {"hex": "000001", "alt_baro": 35000, "lat": 50.0, "lon": 4.0},
                {"hex": "000002", "alt_baro": 5000, "lat": 50.1, "lon": 4.1, "squawk": "7700"},
                {"hex": "000003", "alt_baro": 5000, "lat": 50.2, "lon": 4.2}
            ]),
        ));
        reg.resort();

        assert_eq!(reg.order()[0], addr("000002"));
        let emergency = reg.get(&addr("000002")).unwrap();
        assert_eq!(emergency.special_squawk().unwrap().name, "General Emergency");
        assert!(emergency.is_visible());
        assert!(!reg.get(&addr("000003")).unwrap().is_listed());
    }

    #[test]
    fn test_highlight_mode_keeps_everyone() {
        let mut reg = registry();
        reg.add_filter(altitude_between(30_000.0, 40_000.0)).unwrap();
        reg.set_highlight(true);
        reg.update(&snapshot(
            100.0,
            json!([
                {"hex": "000001", "alt_baro": 35000, "lat": 50.0, "lon": 4.0},
                {"hex": "000003", "alt_baro": 5000, "lat": 50.2, "lon": 4.2}
            ]),
        ));
        let low = reg.get(&addr("000003")).unwrap();
        assert!(low.is_visible());
        assert!(low.highlighted);
        assert!(!reg.get(&addr("000001")).unwrap().highlighted);
    }

    #[test]
    fn test_resort_deterministic_with_ties() {
        let mut reg = registry();
        reg.update(&snapshot(
            100.0,
            json!([
                {"hex": "000003", "alt_baro": 10000},
                {"hex": "000001", "alt_baro": 10000},
                {"hex": "000002", "alt_baro": 10000},
                {"hex": "000004", "alt_baro": 2000}
            ]),
        ));
        reg.resort();
        let first: Vec<Address> = reg.order().to_vec();
        assert_eq!(
            first,
            vec![addr("000004"), addr("000003"), addr("000001"), addr("000002")]
        );
        reg.resort();
        assert_eq!(reg.order(), &first[..]);
    }

    #[test]
    fn test_interesting_sorts_first() {
        let mut reg = registry();
        reg.update(&snapshot(
            100.0,
            json!([
                {"hex": "000001", "alt_baro": 1000},
                {"hex": "000002", "alt_baro": 40000, "squawk": "7600"},
                {"hex": "000003", "alt_baro": 20000}
            ]),
        ));
        let serial = reg.get(&addr("000003")).unwrap().serial;
        reg.apply_lookup(LookupOutcome {
            address: addr("000003"),
            serial,
            reply: LookupReply::Aircraft(Some(AircraftRecord {
                flags: Some("01".into()),
                ..Default::default()
            })),
        });
        reg.resort();
        assert_eq!(
            reg.order(),
            &[addr("000003"), addr("000002"), addr("000001")][..]
        );
    }

    #[test]
    fn test_sort_by_toggles_direction() {
        let mut reg = registry();
        reg.update(&snapshot(
            100.0,
            json!([
                {"hex": "000001", "alt_baro": 1000},
                {"hex": "000002"},
                {"hex": "000003", "alt_baro": 3000}
            ]),
        ));
        reg.sort_by(SortColumn::Altitude);
        assert_eq!(reg.sort_state(), (SortColumn::Altitude, false));
        // unknown altitude stays last
        assert_eq!(
            reg.order(),
            &[addr("000003"), addr("000001"), addr("000002")][..]
        );

        reg.sort_by(SortColumn::Icao);
        assert_eq!(reg.sort_state(), (SortColumn::Icao, true));
        assert_eq!(reg.order()[0], addr("000001"));
    }

    #[test]
    fn test_reaper_threshold() {
        let mut reg = registry();
        reg.update(&snapshot(0.0, json!([{"hex": "000001", "lat": 50.0, "lon": 4.0}])));
        reg.click(Some(addr("000001")));

        reg.update(&snapshot(299.0, json!([])));
        assert_eq!(reg.clean(), 0);
        assert_eq!(reg.len(), 1);

        reg.update(&snapshot(301.0, json!([])));
        assert_eq!(reg.clean(), 1);
        assert!(reg.is_empty());
        assert!(reg.order().is_empty());
        assert_eq!(reg.selected(), None);
    }

    #[test]
    fn test_rows_follow_listing() {
        let mut reg = registry();
        reg.update(&snapshot(
            100.0,
            json!([{"hex": "000001", "alt_baro": 1000}, {"hex": "000002", "alt_baro": 2000}]),
        ));
        reg.refresh();
        reg.resort();
        let ops = reg.reconcile_rows();
        assert_eq!(ops.len(), 2);
        assert_eq!(reg.take_changed_rows().len(), 2);

        // nothing changed: refresh and reconcile are silent
        reg.refresh();
        assert!(reg.take_changed_rows().is_empty());
        assert!(reg.reconcile_rows().is_empty());

        reg.update(&snapshot(170.0, json!([{"hex": "000002", "alt_baro": 2000}])));
        let ops = reg.reconcile_rows();
        assert_eq!(ops, vec![RowOp::Remove { address: addr("000001") }]);
    }

    #[test]
    fn test_refresh_stats() {
        let mut reg = registry();
        reg.update(&snapshot(
            100.0,
            json!([{"hex": "000001", "lat": 50.0, "lon": 4.0}, {"hex": "000002"}]),
        ));
        let stats = reg.refresh();
        assert_eq!(stats.tracked, 2);
        assert_eq!(stats.with_position, 1);
        assert_eq!(stats.unknown_classification, 2);
        assert_eq!(stats.history_points, 1);
    }

    #[test]
    fn test_select_all_tracks_visible() {
        let mut reg = registry();
        reg.update(&snapshot(
            100.0,
            json!([{"hex": "000001", "lat": 50.0, "lon": 4.0}, {"hex": "000002"}]),
        ));
        reg.set_select_all(true);
        assert!(reg.get(&addr("000001")).unwrap().selected);
        assert!(!reg.get(&addr("000002")).unwrap().selected);

        // idempotent
        reg.set_select_all(true);
        assert!(reg.get(&addr("000001")).unwrap().selected);

        reg.update(&snapshot(101.0, json!([{"hex": "000003", "lat": 51.0, "lon": 4.0}])));
        assert!(reg.get(&addr("000003")).unwrap().selected);

        reg.click(Some(addr("000003")));
        assert!(!reg.select_all());
        assert_eq!(reg.selected(), Some(addr("000003")));
        assert!(!reg.get(&addr("000001")).unwrap().selected);
    }

    #[test]
    fn test_click_toggles_and_double_click_follows() {
        let mut reg = registry();
        reg.update(&snapshot(100.0, json!([{"hex": "000001", "lat": 50.0, "lon": 4.0}])));
        assert!(!reg.click(Some(addr("00000f"))));

        reg.click(Some(addr("000001")));
        assert_eq!(reg.selected(), Some(addr("000001")));
        reg.click(Some(addr("000001")));
        assert_eq!(reg.selected(), None);

        reg.layer_mut().drain();
        reg.double_click(addr("000001"));
        assert_eq!(reg.following(), Some(addr("000001")));
        assert!(reg.layer_mut().drain().contains(&DrawOp::Center {
            position: LatLon::new(50.0, 4.0)
        }));

        reg.update(&snapshot(101.0, json!([{"hex": "000001", "lat": 50.0, "lon": 4.0}])));
        assert!(!reg
            .layer_mut()
            .drain()
            .iter()
            .any(|op| matches!(op, DrawOp::Center { .. })));
    }

    #[test]
    fn test_late_lookup_ignored() {
        let mut reg = registry();
        reg.update(&snapshot(0.0, json!([{"hex": "000001"}])));
        let stale_serial = reg.get(&addr("000001")).unwrap().serial;

        reg.update(&snapshot(400.0, json!([])));
        reg.clean();
        reg.update(&snapshot(401.0, json!([{"hex": "000001"}])));
        assert_ne!(reg.get(&addr("000001")).unwrap().serial, stale_serial);

        reg.apply_lookup(LookupOutcome {
            address: addr("000001"),
            serial: stale_serial,
            reply: LookupReply::Type(Some(TypeRecord {
                desc: Some("L2J".into()),
                wtc: Some("M".into()),
            })),
        });
        assert!(reg.get(&addr("000001")).unwrap().species.is_none());
    }

    #[test]
    fn test_lookup_chain_and_edit() {
        let mut reg = registry();
        reg.update(&snapshot(100.0, json!([{"hex": "4840d6"}])));
        let request = reg.take_lookups().remove(0);

        reg.apply_lookup(LookupOutcome {
            address: request.address,
            serial: request.serial,
            reply: LookupReply::Aircraft(Some(AircraftRecord {
                registration: Some("PH-BXA".into()),
                icao_type: Some("B738".into()),
                ..Default::default()
            })),
        });
        let follow_up = reg.take_lookups();
        assert_eq!(follow_up[0].kind, LookupKind::Type("B738".into()));

        let edit = AircraftRecord {
            registration: Some("PH-XXX".into()),
            ..Default::default()
        };
        assert!(reg.edit_metadata(addr("4840d6"), edit.clone()));
        assert_eq!(
            reg.get(&addr("4840d6")).unwrap().registration.as_deref(),
            Some("PH-XXX")
        );
        let queued = reg.take_lookups();
        assert_eq!(queued[0].kind, LookupKind::Store(edit));
    }

    #[test]
    fn test_edit_wins_over_pending_lookup() {
        let mut reg = registry();
        reg.update(&snapshot(100.0, json!([{"hex": "4840d6"}])));
        let request = reg.take_lookups().remove(0);
        assert_eq!(request.kind, LookupKind::Aircraft);

        let edit = AircraftRecord {
            registration: Some("PH-XXX".into()),
            icao_type: Some("A20N".into()),
            ..Default::default()
        };
        assert!(reg.edit_metadata(addr("4840d6"), edit));
        reg.take_lookups();

        reg.apply_lookup(LookupOutcome {
            address: request.address,
            serial: request.serial,
            reply: LookupReply::Aircraft(Some(AircraftRecord {
                registration: Some("PH-BXA".into()),
                icao_type: Some("B738".into()),
                flags: Some("10".into()),
                ..Default::default()
            })),
        });

        let a = reg.get(&addr("4840d6")).unwrap();
        assert_eq!(a.registration.as_deref(), Some("PH-XXX"));
        assert_eq!(a.icao_type.as_deref(), Some("A20N"));
        assert!(reg.take_lookups().is_empty());
    }

    #[test]
    fn test_out_of_order_and_null_address() {
        let mut reg = registry();
        reg.update(&snapshot(100.0, json!([{"hex": "000000"}, {"hex": "zzzzzz"}, {"hex": "000001"}])));
        assert_eq!(reg.len(), 1);

        assert!(!reg.update(&snapshot(90.0, json!([{"hex": "000002"}]))));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.now(), 100.0);
    }

    #[test]
    fn test_only_in_view() {
        let mut reg = registry();
        reg.update(&snapshot(
            100.0,
            json!([{"hex": "000001", "lat": 50.0, "lon": 4.0}, {"hex": "000002", "lat": 10.0, "lon": 4.0}]),
        ));
        reg.set_viewport(Some(BoundingBox {
            south: 45.0,
            west: 0.0,
            north: 55.0,
            east: 10.0,
        }));
        assert!(reg.get(&addr("000002")).unwrap().is_visible());

        reg.set_only_in_view(true);
        assert!(reg.get(&addr("000001")).unwrap().is_visible());
        assert!(!reg.get(&addr("000002")).unwrap().is_listed());
    }
}
