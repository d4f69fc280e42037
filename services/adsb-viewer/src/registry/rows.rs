//! Table rows and their reconciliation against the sorted aircraft list

use std::collections::HashSet;

use serde::Serialize;

use crate::aircraft::{Aircraft, PositionSource};
use crate::format::{self, DisplayUnits};
use crate::snapshot::Address;

/// Display strings and classes of one table row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub address: String,
    pub flag_image: Option<String>,
    pub country: String,
    pub flight: String,
    pub registration: String,
    pub icao_type: String,
    pub squawk: String,
    pub altitude: String,
    pub speed: String,
    pub vert_rate: String,
    pub distance: String,
    pub track: String,
    pub messages: String,
    pub seen: String,
    pub rssi: String,
    pub lat: String,
    pub lon: String,
    pub data_source: String,
    pub classes: Vec<&'static str>,
}

fn opt(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

impl TableRow {
    pub fn render(a: &Aircraft, units: DisplayUnits) -> Self {
        let mut classes = vec!["plane_table_row"];
        if a.is_mlat() {
            classes.push("mlat");
        }
        if a.is_visible() {
            classes.push("position");
        }
        if a.interesting {
            classes.push("interesting");
        }
        if a.selected {
            classes.push("selected");
        }
        if a.highlighted {
            classes.push("highlighted");
        }
        if let Some(special) = a.special_squawk() {
            classes.push(special.css_class);
        }

        Self {
            address: a.address.to_string(),
            flag_image: a.country.as_ref().map(|c| c.flag_image.clone()),
            country: opt(a.country.as_ref().map(|c| c.country)),
            flight: opt(a.flight.as_deref()),
            registration: opt(a.registration.as_deref()),
            icao_type: opt(a.icao_type.as_deref()),
            squawk: opt(a.squawk.as_deref()),
            altitude: format::altitude(a.altitude, units),
            speed: format::speed(a.speed, units),
            vert_rate: format::vert_rate(a.vert_rate, units),
            distance: format::distance(a.site_dist, units),
            track: format::track(a.track),
            messages: a.messages.map(|m| m.to_string()).unwrap_or_default(),
            seen: format!("{:.0}", a.seen),
            rssi: a.rssi.map(|r| format!("{:.1}", r)).unwrap_or_default(),
            lat: a.position.map(|p| format!("{:.4}", p.lat)).unwrap_or_default(),
            lon: a.position.map(|p| format!("{:.4}", p.lon)).unwrap_or_default(),
            data_source: match a.position_source {
                PositionSource::Adsb => "ADS-B",
                PositionSource::Mlat => "MLAT",
                PositionSource::ModeS => "Mode S",
            }
            .to_string(),
            classes,
        }
    }
}

/// One table mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RowOp {
    Insert { address: Address, index: usize },
    /// Existing row moved to `index`
    Move { address: Address, index: usize },
    Remove { address: Address },
}

/// Mirror of the rows currently in the table widget
#[derive(Debug, Default)]
pub struct RowMirror {
    order: Vec<Address>,
}

impl RowMirror {
    #[cfg(test)]
    pub fn rows(&self) -> &[Address] {
        &self.order
    }

    /// Bring the table in line with `target`, emitting only the operations
    /// for rows whose listing or position changed
    pub fn reconcile(&mut self, target: &[Address]) -> Vec<RowOp> {
        let mut ops = Vec::new();

        let wanted: HashSet<Address> = target.iter().copied().collect();
        self.order.retain(|address| {
            let keep = wanted.contains(address);
            if !keep {
                ops.push(RowOp::Remove { address: *address });
            }
            keep
        });

        for (index, address) in target.iter().enumerate() {
            if self.order.get(index) == Some(address) {
                continue;
            }
            let existing = self.order[index.min(self.order.len())..]
                .iter()
                .position(|a| a == address)
                .map(|p| p + index);
            match existing {
                Some(from) => {
                    self.order.remove(from);
                    self.order.insert(index, *address);
                    ops.push(RowOp::Move { address: *address, index });
                }
                None => {
                    self.order.insert(index, *address);
                    ops.push(RowOp::Insert { address: *address, index });
                }
            }
        }

        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Altitude;

    fn addrs(hexes: &[&str]) -> Vec<Address> {
        hexes.iter().map(|h| Address::parse(h).unwrap()).collect()
    }

    #[test]
    fn test_reconcile_inserts_then_idles() {
        let mut mirror = RowMirror::default();
        let target = addrs(&["000001", "000002"]);
        let ops = mirror.reconcile(&target);
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], RowOp::Insert { index: 0, .. }));
        assert_eq!(mirror.rows(), &target[..]);

        assert!(mirror.reconcile(&target).is_empty());
    }

    #[test]
    fn test_reconcile_move_and_remove() {
        let all = addrs(&["000001", "000002", "000003"]);
        let mut mirror = RowMirror::default();
        mirror.reconcile(&all);

        let target = vec![all[2], all[0]];
        let ops = mirror.reconcile(&target);
        assert_eq!(
            ops,
            vec![
                RowOp::Remove { address: all[1] },
                RowOp::Move { address: all[2], index: 0 },
            ]
        );
        assert_eq!(mirror.rows(), &target[..]);
    }

    #[test]
    fn test_render_row() {
        let mut a = Aircraft::new(Address::parse("4840d6").unwrap(), 1, &mut Vec::new());
        a.flight = Some("KLM1023".into());
        a.altitude = Some(Altitude::Feet(35_000));
        a.squawk = Some("7700".into());
        a.interesting = true;

        let row = TableRow::render(&a, DisplayUnits::Nautical);
        assert_eq!(row.address, "4840d6");
        assert_eq!(row.country, "Netherlands");
        assert_eq!(row.altitude, "35000");
        assert!(row.classes.contains(&"interesting"));
        assert!(row.classes.contains(&"squawk7700"));
        assert!(!row.classes.contains(&"position"));
    }
}
