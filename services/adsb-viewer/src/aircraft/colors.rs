//! Altitude colour ramp for markers and trails

use crate::geo::Altitude;

/// Hue control points: (altitude ft, hue)
const AIR_HUE_POINTS: [(f64, f64); 3] = [(2_000.0, 20.0), (10_000.0, 140.0), (40_000.0, 300.0)];
const AIR_SATURATION: f64 = 85.0;
const AIR_LIGHTNESS: f64 = 50.0;

const UNKNOWN: Hsl = Hsl { h: 0.0, s: 0.0, l: 40.0 };
const GROUND: Hsl = Hsl { h: 15.0, s: 80.0, l: 20.0 };

/// Adjustment for a position that has not been refreshed for a while
pub const STALE_DELTA: Hsl = Hsl { h: 0.0, s: -10.0, l: 30.0 };
/// Adjustment for the (singly) selected aircraft
pub const SELECTED_DELTA: Hsl = Hsl { h: 0.0, s: -10.0, l: 20.0 };
/// Adjustment for multilaterated positions
pub const MLAT_DELTA: Hsl = Hsl { h: 0.0, s: -10.0, l: -10.0 };

/// Colour used for estimated (dashed) trail stretches
pub const ESTIMATED_TRAIL_COLOR: &str = "#808080";

/// Hue/saturation/lightness colour; hue in degrees, s and l in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn shifted(self, delta: Hsl) -> Hsl {
        Hsl {
            h: self.h + delta.h,
            s: self.s + delta.s,
            l: self.l + delta.l,
        }
    }

    /// Wrap hue into [0, 360) and clamp saturation/lightness into [5, 95]
    pub fn normalized(self) -> Hsl {
        let mut h = self.h % 360.0;
        if h < 0.0 {
            h += 360.0;
        }
        Hsl {
            h,
            s: self.s.clamp(5.0, 95.0),
            l: self.l.clamp(5.0, 95.0),
        }
    }

    /// Round every component to a multiple of 5 so that near-identical
    /// colours share one marker icon
    pub fn quantized(self) -> Hsl {
        let q = |v: f64| (v / 5.0).round() * 5.0;
        let n = self.normalized();
        Hsl {
            h: q(n.h),
            s: q(n.s),
            l: q(n.l),
        }
    }

    pub fn css(&self) -> String {
        format!("hsl({:.0},{:.0}%,{:.0}%)", self.h, self.s, self.l)
    }
}

/// Base colour for an altitude, before any state adjustment
pub fn altitude_color(altitude: Option<Altitude>) -> Hsl {
    let feet = match altitude {
        None => return UNKNOWN,
        Some(Altitude::Ground) => return GROUND,
        Some(Altitude::Feet(ft)) => f64::from(ft),
    };

    // find the pair of control points the altitude lies between and
    // interpolate the hue between them
    let mut hue = AIR_HUE_POINTS[0].1;
    for i in (0..AIR_HUE_POINTS.len()).rev() {
        let (alt, val) = AIR_HUE_POINTS[i];
        if feet > alt {
            hue = match AIR_HUE_POINTS.get(i + 1) {
                None => val,
                Some(&(next_alt, next_val)) => {
                    val + (next_val - val) * (feet - alt) / (next_alt - alt)
                }
            };
            break;
        }
    }

    Hsl {
        h: hue,
        s: AIR_SATURATION,
        l: AIR_LIGHTNESS,
    }
    .normalized()
}

/// Which adjustments apply to a marker
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerTint {
    pub stale: bool,
    pub selected: bool,
    pub mlat: bool,
}

/// Final quantized marker colour
pub fn marker_color(altitude: Option<Altitude>, tint: MarkerTint) -> Hsl {
    let mut color = altitude_color(altitude);
    if tint.stale {
        color = color.shifted(STALE_DELTA);
    }
    if tint.selected {
        color = color.shifted(SELECTED_DELTA);
    }
    if tint.mlat {
        color = color.shifted(MLAT_DELTA);
    }
    color.quantized()
}
