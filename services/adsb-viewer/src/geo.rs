//! Positions, distances and map viewports

use serde::{Deserialize, Serialize};

/// Mean earth radius in metres
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in metres (haversine)
    pub fn distance_to(&self, other: &LatLon) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// Midpoint between two nearby fixes; consecutive fixes are close enough
    /// that averaging the coordinates is indistinguishable on a map
    pub fn midpoint(&self, other: &LatLon) -> LatLon {
        let mut dlon = other.lon - self.lon;
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }
        let mut lon = self.lon + dlon / 2.0;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        LatLon::new((self.lat + other.lat) / 2.0, lon)
    }
}

/// Reported altitude: feet, or on the ground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Altitude {
    Ground,
    Feet(i32),
}

impl Altitude {
    pub fn is_ground(&self) -> bool {
        matches!(self, Altitude::Ground)
    }

    /// Feet, with the ground counted as zero
    pub fn feet(&self) -> i32 {
        match self {
            Altitude::Ground => 0,
            Altitude::Feet(ft) => *ft,
        }
    }

    /// Bucketed altitude used to decide when a trail changes colour:
    /// nearest 1000 ft above 8000 ft, nearest 500 ft below
    pub fn discretized(&self) -> Altitude {
        match self {
            Altitude::Ground => Altitude::Ground,
            Altitude::Feet(ft) => {
                let step = if *ft > 8000 { 1000.0 } else { 500.0 };
                Altitude::Feet(((*ft as f64 / step).round() * step) as i32)
            }
        }
    }
}

/// Currently displayed map extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: &LatLon) -> bool {
        if p.lat < self.south || p.lat > self.north {
            return false;
        }
        if self.west <= self.east {
            p.lon >= self.west && p.lon <= self.east
        } else {
            // viewport spans the antimeridian
            p.lon >= self.west || p.lon <= self.east
        }
    }
}
