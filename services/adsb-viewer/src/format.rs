//! Display strings for table cells

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geo::Altitude;

/// Unit system used for displayed values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnits {
    #[default]
    Nautical,
    Metric,
    Imperial,
}

impl FromStr for DisplayUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nautical" => Ok(Self::Nautical),
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            other => Err(format!("unknown display units {:?}", other)),
        }
    }
}

impl fmt::Display for DisplayUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nautical => "nautical",
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        };
        f.write_str(name)
    }
}

const FEET_TO_METRES: f64 = 0.3048;
const KNOTS_TO_KMH: f64 = 1.852;
const KNOTS_TO_MPH: f64 = 1.150_779;
const FPM_TO_MPS: f64 = 0.005_08;
const METRES_PER_NM: f64 = 1852.0;
const METRES_PER_MILE: f64 = 1609.344;

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub fn altitude(alt: Option<Altitude>, units: DisplayUnits) -> String {
    match alt {
        None => String::new(),
        Some(Altitude::Ground) => "ground".to_string(),
        Some(Altitude::Feet(ft)) => match units {
            DisplayUnits::Metric => format!("{:.0}", f64::from(ft) * FEET_TO_METRES),
            _ => ft.to_string(),
        },
    }
}

/// Speed given in knots
pub fn speed(knots: Option<f64>, units: DisplayUnits) -> String {
    let Some(kt) = knots else {
        return String::new();
    };
    let value = match units {
        DisplayUnits::Nautical => kt,
        DisplayUnits::Metric => kt * KNOTS_TO_KMH,
        DisplayUnits::Imperial => kt * KNOTS_TO_MPH,
    };
    format!("{:.0}", value)
}

/// Vertical rate given in ft/min
pub fn vert_rate(fpm: Option<i32>, units: DisplayUnits) -> String {
    match (fpm, units) {
        (None, _) => String::new(),
        (Some(v), DisplayUnits::Metric) => format!("{:.1}", f64::from(v) * FPM_TO_MPS),
        (Some(v), _) => v.to_string(),
    }
}

/// Distance given in metres
pub fn distance(metres: Option<f64>, units: DisplayUnits) -> String {
    let Some(m) = metres else {
        return String::new();
    };
    let value = match units {
        DisplayUnits::Nautical => m / METRES_PER_NM,
        DisplayUnits::Metric => m / 1000.0,
        DisplayUnits::Imperial => m / METRES_PER_MILE,
    };
    format!("{:.1}", value)
}

/// Heading with its 16-point compass name, e.g. `"273° W"`
pub fn track(degrees: Option<f64>) -> String {
    let Some(deg) = degrees else {
        return String::new();
    };
    let deg = deg.rem_euclid(360.0);
    let point = ((deg + 11.25) / 22.5) as usize % COMPASS.len();
    format!("{:.0}\u{b0} {}", deg, COMPASS[point])
}

pub fn unit_labels(units: DisplayUnits) -> (&'static str, &'static str, &'static str) {
    match units {
        DisplayUnits::Nautical => ("ft", "kt", "NM"),
        DisplayUnits::Metric => ("m", "km/h", "km"),
        DisplayUnits::Imperial => ("ft", "mph", "mi"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_parse() {
        assert_eq!("Metric".parse::<DisplayUnits>().unwrap(), DisplayUnits::Metric);
        assert!("furlongs".parse::<DisplayUnits>().is_err());
    }

    #[test]
    fn test_altitude_strings() {
        assert_eq!(altitude(Some(Altitude::Feet(35_000)), DisplayUnits::Nautical), "35000");
        assert_eq!(altitude(Some(Altitude::Feet(35_000)), DisplayUnits::Metric), "10668");
        assert_eq!(altitude(Some(Altitude::Ground), DisplayUnits::Metric), "ground");
        assert_eq!(altitude(None, DisplayUnits::Nautical), "");
    }

    #[test]
    fn test_speed_and_distance() {
        assert_eq!(speed(Some(100.0), DisplayUnits::Metric), "185");
        assert_eq!(distance(Some(18_520.0), DisplayUnits::Nautical), "10.0");
        assert_eq!(distance(None, DisplayUnits::Nautical), "");
        assert_eq!(vert_rate(Some(-1000), DisplayUnits::Metric), "-5.1");
    }

    #[test]
    fn test_track_compass() {
        assert_eq!(track(Some(0.0)), "0\u{b0} N");
        assert_eq!(track(Some(273.0)), "273\u{b0} W");
        assert_eq!(track(Some(355.0)), "355\u{b0} N");
        assert_eq!(track(None), "");
    }
}
