//! Merging one snapshot record into an [`Aircraft`]

use crate::geo::LatLon;
use crate::metadata::{LookupKind, LookupRequest};
use crate::snapshot::Record;

use super::{Aircraft, LookupState, PositionSource, SpeedSource};

/// How a field behaves when a record does not carry it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retention {
    /// Absent means "no longer known"
    Reset,
    /// Once learned the value is kept until replaced
    Sticky,
}

pub(crate) fn merge<T>(slot: &mut Option<T>, incoming: Option<T>, retention: Retention) {
    match (incoming, retention) {
        (Some(value), _) => *slot = Some(value),
        (None, Retention::Reset) => *slot = None,
        (None, Retention::Sticky) => {}
    }
}

/// Three-letter ICAO airline designator at the start of a flight id, when
/// followed by a flight number
fn operator_code(flight: &str) -> Option<String> {
    let bytes = flight.as_bytes();
    if bytes.len() < 4 {
        return None;
    }
    let (code, rest) = bytes.split_at(3);
    if code.iter().all(u8::is_ascii_alphabetic) && rest[0].is_ascii_digit() {
        Some(String::from_utf8_lossy(code).to_ascii_uppercase())
    } else {
        None
    }
}

impl Aircraft {
    /// Merge one snapshot record taken at receiver time `now`
    pub fn update_data(
        &mut self,
        now: f64,
        record: &Record<'_>,
        site: Option<LatLon>,
        lookups: &mut Vec<LookupRequest>,
    ) {
        use Retention::{Reset, Sticky};

        self.messages = record.u64("messages");
        self.rssi = record.f64("rssi");
        self.last_message_time = now - record.f64("seen").unwrap_or(0.0);

        merge(&mut self.alt_baro, record.altitude("alt_baro"), Reset);
        merge(&mut self.alt_geom, record.i32("alt_geom"), Reset);
        merge(&mut self.gs, record.f64("gs"), Reset);
        merge(&mut self.ias, record.f64("ias"), Reset);
        merge(&mut self.tas, record.f64("tas"), Reset);
        merge(&mut self.track, record.f64("track"), Reset);
        merge(&mut self.track_rate, record.f64("track_rate"), Reset);
        merge(&mut self.mag_heading, record.f64("mag_heading"), Reset);
        merge(&mut self.true_heading, record.f64("true_heading"), Reset);
        merge(&mut self.mach, record.f64("mach"), Reset);
        merge(&mut self.roll, record.f64("roll"), Reset);
        merge(&mut self.nav_heading, record.f64("nav_heading"), Reset);
        merge(&mut self.nav_modes, record.list("nav_modes"), Reset);
        merge(&mut self.nav_qnh, record.f64("nav_qnh"), Reset);
        merge(&mut self.nac_p, record.u32("nac_p"), Reset);
        merge(&mut self.nac_v, record.u32("nac_v"), Reset);
        merge(&mut self.nic_baro, record.u32("nic_baro"), Reset);
        merge(&mut self.sil, record.u32("sil"), Reset);
        merge(&mut self.sil_type, record.text("sil_type"), Reset);
        merge(&mut self.baro_rate, record.i32("baro_rate"), Reset);
        merge(&mut self.geom_rate, record.i32("geom_rate"), Reset);
        merge(&mut self.rc, record.u32("rc"), Reset);
        merge(&mut self.squawk, record.text("squawk"), Reset);
        merge(&mut self.category, record.text("category"), Reset);
        merge(&mut self.version, record.u32("version"), Reset);
        merge(&mut self.addr_type, record.text("type"), Reset);
        merge(&mut self.alert, record.flag("alert"), Reset);
        merge(&mut self.spi, record.flag("spi"), Reset);

        // identity is never forgotten
        let was_unnamed = self.flight.is_none();
        merge(&mut self.flight, record.text("flight"), Sticky);

        self.altitude = self
            .alt_baro
            .or(self.alt_geom.map(crate::geo::Altitude::Feet));
        self.vert_rate = self.geom_rate.or(self.baro_rate);
        self.nav_altitude = record
            .i32("nav_altitude_fms")
            .or_else(|| record.i32("nav_altitude_mcp"));

        (self.speed, self.speed_source) = match (self.gs, self.tas, self.ias) {
            (Some(gs), _, _) => (Some(gs), Some(SpeedSource::Ground)),
            (None, Some(tas), _) => (Some(tas), Some(SpeedSource::True)),
            (None, None, Some(ias)) => (Some(ias), Some(SpeedSource::Indicated)),
            (None, None, None) => (None, None),
        };

        if was_unnamed {
            self.queue_operator_lookup(lookups);
        }

        match record.lat_lon() {
            Some((lat, lon)) => {
                let position = LatLon::new(lat, lon);
                if self.position != Some(position) {
                    self.prev_position = self.position;
                }
                self.position = Some(position);
                self.last_position_time = Some(now - record.f64("seen_pos").unwrap_or(0.0));
                self.site_dist = site.map(|s| s.distance_to(&position));

                let mlat = record.list_contains("mlat", "lat") || record.list_contains("mlat", "lon");
                self.position_source = if mlat {
                    PositionSource::Mlat
                } else {
                    PositionSource::Adsb
                };
            }
            None if self.position.is_none() => {
                self.position_source = PositionSource::ModeS;
            }
            // a previous fix is kept and ages out through seen_pos
            None => {}
        }
    }

    /// Queue the one operator lookup an aircraft ever gets, the first time a
    /// flight id is known and nothing else has named the operator
    fn queue_operator_lookup(&mut self, lookups: &mut Vec<LookupRequest>) {
        if self.operator_lookup != LookupState::NotRequested
            || self.callsign.is_some()
            || self.operator.is_some()
        {
            return;
        }
        let Some(flight) = self.flight.as_deref() else {
            return;
        };

        match operator_code(flight) {
            Some(code) => {
                self.operator_lookup = LookupState::Pending;
                lookups.push(self.lookup(LookupKind::Operator(code)));
            }
            None => self.operator_lookup = LookupState::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Altitude;
    use crate::snapshot::Address;
    use serde_json::{json, Value};

    fn aircraft() -> (Aircraft, Vec<LookupRequest>) {
        let mut lookups = Vec::new();
        let a = Aircraft::new(Address::parse("4840d6").unwrap(), 1, &mut lookups);
        lookups.clear();
        (a, lookups)
    }

    fn apply(a: &mut Aircraft, now: f64, value: Value, lookups: &mut Vec<LookupRequest>) {
        let record = Record::from_value(&value).unwrap();
        a.update_data(now, &record, None, lookups);
    }

    #[test]
    fn test_absent_fields_reset() {
        let (mut a, mut lookups) = aircraft();
        apply(
            &mut a,
            100.0,
            json!({"hex": "4840d6", "flight": "KLM1023 ", "gs": 420.5, "squawk": "1000"}),
            &mut lookups,
        );
        assert_eq!(a.speed, Some(420.5));
        assert_eq!(a.squawk.as_deref(), Some("1000"));

        apply(&mut a, 101.0, json!({"hex": "4840d6"}), &mut lookups);
        assert_eq!(a.gs, None);
        assert_eq!(a.speed, None);
        assert_eq!(a.squawk, None);
        // flight id persists
        assert_eq!(a.flight.as_deref(), Some("KLM1023"));
    }

    #[test]
    fn test_altitude_precedence() {
        let (mut a, mut lookups) = aircraft();
        apply(&mut a, 1.0, json!({"alt_baro": 35_000, "alt_geom": 35_600}), &mut lookups);
        assert_eq!(a.altitude, Some(Altitude::Feet(35_000)));

        apply(&mut a, 2.0, json!({"alt_geom": 35_600}), &mut lookups);
        assert_eq!(a.altitude, Some(Altitude::Feet(35_600)));

        apply(&mut a, 3.0, json!({"alt_baro": "ground", "alt_geom": 35_600}), &mut lookups);
        assert_eq!(a.altitude, Some(Altitude::Ground));

        apply(&mut a, 4.0, json!({}), &mut lookups);
        assert_eq!(a.altitude, None);
    }

    #[test]
    fn test_rate_and_speed_precedence() {
        let (mut a, mut lookups) = aircraft();
        apply(
            &mut a,
            1.0,
            json!({"baro_rate": -640, "geom_rate": -600, "ias": 250, "tas": 280,
                   "nav_altitude_mcp": 12000, "nav_altitude_fms": 11000}),
            &mut lookups,
        );
        assert_eq!(a.vert_rate, Some(-600));
        assert_eq!(a.speed, Some(280.0));
        assert_eq!(a.speed_source, Some(SpeedSource::True));
        assert_eq!(a.nav_altitude, Some(11_000));

        apply(&mut a, 2.0, json!({"baro_rate": -640, "ias": 250, "nav_altitude_mcp": 12000}), &mut lookups);
        assert_eq!(a.vert_rate, Some(-640));
        assert_eq!(a.speed_source, Some(SpeedSource::Indicated));
        assert_eq!(a.nav_altitude, Some(12_000));
    }

    #[test]
    fn test_position_and_mlat() {
        let (mut a, mut lookups) = aircraft();
        let site = Some(LatLon::new(52.0, 4.0));
        let value = json!({"lat": 52.1, "lon": 4.1, "seen_pos": 2.5, "seen": 0.5, "mlat": ["lat", "lon"]});
        let record = Record::from_value(&value).unwrap();
        a.update_data(1000.0, &record, site, &mut lookups);

        assert_eq!(a.position, Some(LatLon::new(52.1, 4.1)));
        assert_eq!(a.last_position_time, Some(997.5));
        assert_eq!(a.last_message_time, 999.5);
        assert!(a.is_mlat());
        let dist = a.site_dist.unwrap();
        assert!(dist > 13_000.0 && dist < 14_000.0, "got {dist}");

        // the fix survives a record without position
        apply(&mut a, 1001.0, json!({"mlat": []}), &mut lookups);
        assert_eq!(a.position, Some(LatLon::new(52.1, 4.1)));
        assert!(a.is_mlat());

        apply(&mut a, 1002.0, json!({"lat": 52.2, "lon": 4.2}), &mut lookups);
        assert_eq!(a.position_source, PositionSource::Adsb);
        assert_eq!(a.prev_position, Some(LatLon::new(52.1, 4.1)));
    }

    #[test]
    fn test_malformed_values_absent() {
        let (mut a, mut lookups) = aircraft();
        apply(
            &mut a,
            1.0,
            json!({"gs": "fast", "lat": 123.0, "lon": 4.0, "alt_baro": [1], "squawk": 7700}),
            &mut lookups,
        );
        assert_eq!(a.gs, None);
        assert_eq!(a.position, None);
        assert_eq!(a.altitude, None);
        assert_eq!(a.squawk, None);
        assert_eq!(a.position_source, PositionSource::ModeS);
    }

    #[test]
    fn test_operator_lookup_once() {
        let (mut a, mut lookups) = aircraft();
        apply(&mut a, 1.0, json!({"flight": "KLM1023"}), &mut lookups);
        assert_eq!(lookups.len(), 1);
        assert_eq!(lookups[0].kind, LookupKind::Operator("KLM".into()));

        apply(&mut a, 2.0, json!({"flight": "KLM1023"}), &mut lookups);
        apply(&mut a, 3.0, json!({"flight": "KLM1024"}), &mut lookups);
        assert_eq!(lookups.len(), 1);
    }

    #[test]
    fn test_operator_code() {
        assert_eq!(operator_code("KLM1023").as_deref(), Some("KLM"));
        assert_eq!(operator_code("PHBXA"), None);
        assert_eq!(operator_code("N123AB"), None);
        assert_eq!(operator_code("BAW"), None);
    }
}
