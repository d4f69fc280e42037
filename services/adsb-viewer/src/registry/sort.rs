//! Table ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aircraft::{Aircraft, PositionSource};
use crate::geo::Altitude;

/// Sort key used for aircraft on the ground so they sort below any altitude
const GROUND_SORT_ALTITUDE: f64 = -1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Icao,
    Country,
    Flight,
    Registration,
    AircraftType,
    Squawk,
    Altitude,
    Speed,
    VertRate,
    Distance,
    Track,
    Messages,
    Seen,
    Rssi,
    Lat,
    Lon,
    DataSource,
}

impl SortColumn {
    pub const ALL: [SortColumn; 17] = [
        SortColumn::Icao,
        SortColumn::Country,
        SortColumn::Flight,
        SortColumn::Registration,
        SortColumn::AircraftType,
        SortColumn::Squawk,
        SortColumn::Altitude,
        SortColumn::Speed,
        SortColumn::VertRate,
        SortColumn::Distance,
        SortColumn::Track,
        SortColumn::Messages,
        SortColumn::Seen,
        SortColumn::Rssi,
        SortColumn::Lat,
        SortColumn::Lon,
        SortColumn::DataSource,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SortColumn::Icao => "icao",
            SortColumn::Country => "country",
            SortColumn::Flight => "flight",
            SortColumn::Registration => "registration",
            SortColumn::AircraftType => "aircraft_type",
            SortColumn::Squawk => "squawk",
            SortColumn::Altitude => "altitude",
            SortColumn::Speed => "speed",
            SortColumn::VertRate => "vert_rate",
            SortColumn::Distance => "distance",
            SortColumn::Track => "track",
            SortColumn::Messages => "messages",
            SortColumn::Seen => "seen",
            SortColumn::Rssi => "rssi",
            SortColumn::Lat => "lat",
            SortColumn::Lon => "lon",
            SortColumn::DataSource => "data_source",
        }
    }

    /// Value this column sorts an aircraft by; `None` sorts last
    pub fn value(&self, a: &Aircraft) -> Option<SortValue> {
        // text compares case-insensitively
        let text = |s: Option<&str>| s.map(|s| SortValue::Text(s.to_lowercase()));
        let number = |n: Option<f64>| n.map(SortValue::Number);

        match self {
            SortColumn::Icao => text(Some(a.address.to_string().as_str())),
            SortColumn::Country => text(a.country.as_ref().map(|c| c.country)),
            SortColumn::Flight => text(a.flight.as_deref()),
            SortColumn::Registration => text(a.registration.as_deref()),
            SortColumn::AircraftType => text(a.icao_type.as_deref()),
            SortColumn::Squawk => text(a.squawk.as_deref()),
            SortColumn::Altitude => number(a.altitude.map(|alt| match alt {
                Altitude::Ground => GROUND_SORT_ALTITUDE,
                Altitude::Feet(ft) => f64::from(ft),
            })),
            SortColumn::Speed => number(a.speed),
            SortColumn::VertRate => number(a.vert_rate.map(f64::from)),
            SortColumn::Distance => number(a.site_dist),
            SortColumn::Track => number(a.track),
            SortColumn::Messages => number(a.messages.map(|m| m as f64)),
            SortColumn::Seen => number(Some(a.seen)),
            SortColumn::Rssi => number(a.rssi),
            SortColumn::Lat => number(a.position.map(|p| p.lat)),
            SortColumn::Lon => number(a.position.map(|p| p.lon)),
            SortColumn::DataSource => text(Some(match a.position_source {
                PositionSource::Adsb => "adsb",
                PositionSource::Mlat => "mlat",
                PositionSource::ModeS => "mode_s",
            })),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortColumn::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown sort column {:?}", s))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    Number(f64),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        }
    }
}

/// Interesting aircraft first, then special squawks, then everyone else
fn group(a: &Aircraft) -> u8 {
    if a.interesting {
        0
    } else if a.special_squawk().is_some() {
        1
    } else {
        2
    }
}

/// Full ordering over prepared `sort_value`/`sort_pos`. Missing values sort
/// last in either direction; ties keep their previous relative order.
pub(crate) fn compare(a: &Aircraft, b: &Aircraft, ascending: bool) -> Ordering {
    group(a)
        .cmp(&group(b))
        .then_with(|| match (&a.sort_value, &b.sort_value) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = x.compare(y);
                if ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        })
        .then_with(|| a.sort_pos.cmp(&b.sort_pos))
}
