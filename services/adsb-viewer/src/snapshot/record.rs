//! Lenient access to one aircraft record
//!
//! Receivers omit fields they have no data for and occasionally publish values
//! of the wrong JSON type. Every accessor here returns `None` for both cases so
//! the merge logic only ever deals with "present and well-formed" or "absent".

use serde_json::{Map, Value};

use crate::geo::Altitude;

/// Borrowed view over one JSON object in `aircraft[]`
#[derive(Debug, Clone, Copy)]
pub struct Record<'a>(&'a Map<String, Value>);

impl<'a> Record<'a> {
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(Record)
    }

    pub fn hex(&self) -> Option<&'a str> {
        self.str("hex")
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.0.get(key)?.as_str()
    }

    /// Trimmed string, `None` when blank
    pub fn text(&self, key: &str) -> Option<String> {
        let s = self.str(key)?.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.0.get(key)?.as_f64().filter(|v| v.is_finite())
    }

    pub fn i32(&self, key: &str) -> Option<i32> {
        let v = self.f64(key)?.round();
        if v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) {
            Some(v as i32)
        } else {
            None
        }
    }

    pub fn u32(&self, key: &str) -> Option<u32> {
        let v = self.f64(key)?.round();
        if v >= 0.0 && v <= f64::from(u32::MAX) {
            Some(v as u32)
        } else {
            None
        }
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        let v = self.f64(key)?.round();
        if v >= 0.0 {
            Some(v as u64)
        } else {
            None
        }
    }

    /// Accepts JSON booleans as well as the 0/1 integers some receivers emit
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            _ => None,
        }
    }

    /// String array; non-string members are dropped
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        let items = self.0.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn list_contains(&self, key: &str, needle: &str) -> bool {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map_or(false, |items| items.iter().any(|v| v.as_str() == Some(needle)))
    }

    /// Altitude in feet, or the literal `"ground"`
    pub fn altitude(&self, key: &str) -> Option<Altitude> {
        match self.0.get(key)? {
            Value::String(s) if s.eq_ignore_ascii_case("ground") => Some(Altitude::Ground),
            Value::Number(_) => self.i32(key).map(Altitude::Feet),
            _ => None,
        }
    }

    /// Latitude/longitude pair, only when both are present and in range
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        let lat = self.f64("lat")?;
        let lon = self.f64("lon")?;
        if lat.abs() <= 90.0 && lon.abs() <= 180.0 {
            Some((lat, lon))
        } else {
            None
        }
    }
}
