//! Per-aircraft state
//!
//! One [`Aircraft`] exists per tracked address. Snapshot records are merged
//! in by [`Aircraft::update_data`] (see `merge`), after which
//! [`Aircraft::update_tick`] (see `tick`) recomputes ages, decides whether
//! the aircraft is shown and pushes any changed geometry to the map layer.

pub mod colors;
pub mod marker;
mod merge;
mod tick;
pub mod track;

pub use tick::{TickContext, TickOutcome};

use serde::Serialize;

use crate::geo::{Altitude, LatLon};
use crate::identity::{self, CountryInfo};
use crate::metadata::{AircraftRecord, LookupKind, LookupRequest, OperatorRecord, TypeRecord};
use crate::registry::rows::TableRow;
use crate::registry::sort::SortValue;
use crate::render::{LineStyle, MarkerPlacement};
use crate::snapshot::Address;
use crate::squawks;

use self::track::Track;

/// Where the current position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    Adsb,
    Mlat,
    /// No position; identity and altitude only
    ModeS,
}

/// Field the displayed speed was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSource {
    Ground,
    True,
    Indicated,
}

/// Outcome of the last tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Not heard recently, filtered out or outside the viewport; row hidden
    #[default]
    Expired,
    /// Marker and trail drawn
    Positioned,
    /// Listed in the table but nothing drawn
    NoPosition,
}

/// Progress of a one-shot metadata lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupState {
    #[default]
    NotRequested,
    Pending,
    Done,
}

/// What is currently on the map for this aircraft
#[derive(Debug, Clone, Default)]
pub(crate) struct Drawn {
    pub marker: Option<MarkerPlacement>,
    pub elastic: Option<([LatLon; 2], LineStyle)>,
    pub trail: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Aircraft {
    pub address: Address,
    /// Registry-wide creation counter; distinguishes re-created entities
    pub serial: u64,

    // identity
    pub flight: Option<String>,
    pub squawk: Option<String>,
    pub category: Option<String>,
    /// Address type as reported by the receiver (`adsb_icao`, `mlat`, ...)
    pub addr_type: Option<String>,

    // kinematics
    pub position: Option<LatLon>,
    pub prev_position: Option<LatLon>,
    pub altitude: Option<Altitude>,
    pub alt_baro: Option<Altitude>,
    pub alt_geom: Option<i32>,
    pub speed: Option<f64>,
    pub speed_source: Option<SpeedSource>,
    pub gs: Option<f64>,
    pub ias: Option<f64>,
    pub tas: Option<f64>,
    pub track: Option<f64>,
    pub track_rate: Option<f64>,
    pub mag_heading: Option<f64>,
    pub true_heading: Option<f64>,
    pub mach: Option<f64>,
    pub roll: Option<f64>,
    pub vert_rate: Option<i32>,
    pub baro_rate: Option<i32>,
    pub geom_rate: Option<i32>,
    pub nav_altitude: Option<i32>,
    pub nav_heading: Option<f64>,
    pub nav_modes: Option<Vec<String>>,
    pub nav_qnh: Option<f64>,
    pub nac_p: Option<u32>,
    pub nac_v: Option<u32>,
    pub nic_baro: Option<u32>,
    pub sil: Option<u32>,
    pub sil_type: Option<String>,
    pub rc: Option<u32>,
    pub version: Option<u32>,
    pub alert: Option<bool>,
    pub spi: Option<bool>,
    pub rssi: Option<f64>,
    pub messages: Option<u64>,
    /// Great-circle distance to the receiver site in metres
    pub site_dist: Option<f64>,

    // provenance
    pub position_source: PositionSource,
    pub last_message_time: f64,
    pub last_position_time: Option<f64>,
    pub seen: f64,
    pub seen_pos: Option<f64>,

    // enrichment
    pub registration: Option<String>,
    pub icao_type: Option<String>,
    pub type_description: Option<String>,
    pub species: Option<String>,
    pub wtc: Option<String>,
    /// `None` until the database says whether this is a civil airframe
    pub civilian: Option<bool>,
    pub interesting: bool,
    pub operator: Option<String>,
    pub callsign: Option<String>,
    pub country: Option<CountryInfo>,

    // presentation
    pub visibility: Visibility,
    pub selected: bool,
    pub highlighted: bool,
    #[serde(skip)]
    pub track_log: Track,
    #[serde(skip)]
    pub row: TableRow,
    #[serde(skip)]
    pub(crate) sort_value: Option<SortValue>,
    #[serde(skip)]
    pub(crate) sort_pos: usize,
    #[serde(skip)]
    pub(crate) drawn: Drawn,
    #[serde(skip)]
    pub(crate) aircraft_lookup: LookupState,
    #[serde(skip)]
    pub(crate) type_lookup: LookupState,
    #[serde(skip)]
    pub(crate) operator_lookup: LookupState,
}

impl Aircraft {
    /// Create a new entity and queue its database lookup
    pub fn new(address: Address, serial: u64, lookups: &mut Vec<LookupRequest>) -> Self {
        let (country, registration) = if address.is_non_icao() {
            (None, None)
        } else {
            (
                identity::country_for(address.icao()),
                identity::n_number_registration(address.icao()),
            )
        };

        let mut aircraft = Self {
            address,
            serial,
            flight: None,
            squawk: None,
            category: None,
            addr_type: None,
            position: None,
            prev_position: None,
            altitude: None,
            alt_baro: None,
            alt_geom: None,
            speed: None,
            speed_source: None,
            gs: None,
            ias: None,
            tas: None,
            track: None,
            track_rate: None,
            mag_heading: None,
            true_heading: None,
            mach: None,
            roll: None,
            vert_rate: None,
            baro_rate: None,
            geom_rate: None,
            nav_altitude: None,
            nav_heading: None,
            nav_modes: None,
            nav_qnh: None,
            nac_p: None,
            nac_v: None,
            nic_baro: None,
            sil: None,
            sil_type: None,
            rc: None,
            version: None,
            alert: None,
            spi: None,
            rssi: None,
            messages: None,
            site_dist: None,
            position_source: PositionSource::ModeS,
            last_message_time: 0.0,
            last_position_time: None,
            seen: 0.0,
            seen_pos: None,
            registration,
            icao_type: None,
            type_description: None,
            species: None,
            wtc: None,
            civilian: None,
            interesting: false,
            operator: None,
            callsign: None,
            country,
            visibility: Visibility::Expired,
            selected: false,
            highlighted: false,
            track_log: Track::new(),
            row: TableRow::default(),
            sort_value: None,
            sort_pos: 0,
            drawn: Drawn::default(),
            aircraft_lookup: LookupState::NotRequested,
            type_lookup: LookupState::NotRequested,
            operator_lookup: LookupState::NotRequested,
        };

        if !address.is_non_icao() {
            aircraft.aircraft_lookup = LookupState::Pending;
            lookups.push(aircraft.lookup(LookupKind::Aircraft));
        }
        aircraft
    }

    pub(crate) fn lookup(&self, kind: LookupKind) -> LookupRequest {
        LookupRequest {
            address: self.address,
            serial: self.serial,
            kind,
        }
    }

    /// Shown in the table (possibly without a marker)
    pub fn is_listed(&self) -> bool {
        self.visibility != Visibility::Expired
    }

    /// Marker and trail are on the map
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Positioned
    }

    pub fn is_mlat(&self) -> bool {
        self.position_source == PositionSource::Mlat
    }

    pub fn special_squawk(&self) -> Option<&'static squawks::SpecialSquawk> {
        squawks::lookup(self.squawk.as_deref())
    }

    pub fn has_emergency_squawk(&self) -> bool {
        squawks::is_emergency(self.squawk.as_deref())
    }

    pub fn military(&self) -> bool {
        self.civilian == Some(false)
    }

    /// Airframe class, engine count and engine type from the species code
    pub fn species_char(&self, index: usize) -> Option<char> {
        self.species.as_deref()?.chars().nth(index)
    }

    /// Apply a database (or edited) aircraft entry; returns a follow-up type
    /// lookup when a new designator was learned
    pub fn apply_aircraft_record(&mut self, record: &AircraftRecord) -> Option<LookupRequest> {
        self.aircraft_lookup = LookupState::Done;

        if let Some(reg) = &record.registration {
            self.registration = Some(reg.clone());
        }
        if let Some(desc) = &record.type_description {
            self.type_description = Some(desc.clone());
        }
        if record.flags.is_some() {
            self.civilian = Some(!record.military());
            self.interesting = record.interesting();
        }

        let designator = record.icao_type.as_ref()?;
        if self.icao_type.as_ref() == Some(designator) && self.type_lookup != LookupState::NotRequested {
            return None;
        }
        self.icao_type = Some(designator.clone());
        self.type_lookup = LookupState::Pending;
        Some(self.lookup(LookupKind::Type(designator.clone())))
    }

    pub fn apply_type_record(&mut self, record: &TypeRecord) {
        self.type_lookup = LookupState::Done;
        if let Some(desc) = &record.desc {
            self.species = Some(desc.clone());
        }
        if let Some(wtc) = &record.wtc {
            self.wtc = Some(wtc.clone());
        }
    }

    pub fn apply_operator_record(&mut self, record: &OperatorRecord) {
        self.operator_lookup = LookupState::Done;
        if let Some(name) = &record.name {
            self.operator = Some(name.clone());
        }
        if let Some(callsign) = &record.callsign {
            self.callsign = Some(callsign.clone());
        }
    }
}
