//! Marker shapes and the memoized icon cache

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

/// Outline for ordinary ADS-B markers
pub const OUTLINE_ADSB: &str = "#000000";
/// Outline for multilaterated markers
pub const OUTLINE_MLAT: &str = "#4040FF";
/// Outline for aircraft flagged by highlight-mode filtering
pub const OUTLINE_HIGHLIGHT: &str = "#FF00FF";

/// Silhouette drawn for an aircraft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Airliner,
    HeavyJet,
    Jet,
    Turboprop,
    Cessna,
    Helicopter,
    HighPerformance,
    Glider,
    Balloon,
    GroundVehicle,
    Obstacle,
    Unknown,
}

/// Type designators that get a specific silhouette regardless of category
const TYPE_SHAPES: &[(&str, MarkerShape)] = &[
    ("A388", MarkerShape::HeavyJet),
    ("B744", MarkerShape::HeavyJet),
    ("B748", MarkerShape::HeavyJet),
    ("B77W", MarkerShape::HeavyJet),
    ("A35K", MarkerShape::HeavyJet),
    ("C172", MarkerShape::Cessna),
    ("C152", MarkerShape::Cessna),
    ("PA28", MarkerShape::Cessna),
    ("SR22", MarkerShape::Cessna),
    ("DH8D", MarkerShape::Turboprop),
    ("AT76", MarkerShape::Turboprop),
    ("F16", MarkerShape::HighPerformance),
    ("EUFI", MarkerShape::HighPerformance),
    ("BALL", MarkerShape::Balloon),
    ("GLID", MarkerShape::Glider),
];

/// Pick a silhouette from the type designator, the species code
/// (e.g. `L2J`) and the ADS-B emitter category, most specific first
pub fn shape_for(
    icao_type: Option<&str>,
    species: Option<&str>,
    category: Option<&str>,
) -> MarkerShape {
    if let Some(t) = icao_type {
        if let Some((_, shape)) = TYPE_SHAPES.iter().find(|(d, _)| d.eq_ignore_ascii_case(t)) {
            return *shape;
        }
    }

    if let Some(species) = species {
        let mut chars = species.chars();
        let class = chars.next();
        let engine = chars.nth(1);
        match (class, engine) {
            (Some('H'), _) | (Some('G'), _) => return MarkerShape::Helicopter,
            (Some('L'), Some('J')) => {
                let engines = species.chars().nth(1).and_then(|c| c.to_digit(10));
                return if engines.map_or(false, |n| n >= 4) {
                    MarkerShape::HeavyJet
                } else {
                    MarkerShape::Airliner
                };
            }
            (Some('L'), Some('T')) => return MarkerShape::Turboprop,
            (Some('L'), Some('P')) => return MarkerShape::Cessna,
            _ => {}
        }
    }

    match category.map(|c| c.to_ascii_uppercase()).as_deref() {
        Some("A1") => MarkerShape::Cessna,
        Some("A2") => MarkerShape::Jet,
        Some("A3") | Some("A4") => MarkerShape::Airliner,
        Some("A5") => MarkerShape::HeavyJet,
        Some("A6") => MarkerShape::HighPerformance,
        Some("A7") => MarkerShape::Helicopter,
        Some("B1") => MarkerShape::Glider,
        Some("B2") => MarkerShape::Balloon,
        Some("C1") | Some("C2") => MarkerShape::GroundVehicle,
        Some("C3") | Some("C4") | Some("C5") => MarkerShape::Obstacle,
        _ => MarkerShape::Unknown,
    }
}

/// A generated marker icon; identical-looking aircraft share one instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerIcon {
    pub key: String,
    pub shape: MarkerShape,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

/// Icon memo keyed by the visual-state signature
#[derive(Debug, Default)]
pub struct IconCache {
    icons: HashMap<String, Arc<MarkerIcon>>,
    created: u64,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the icon for this look, generating it only on first use
    pub fn icon(
        &mut self,
        shape: MarkerShape,
        fill: &str,
        stroke: &str,
        stroke_width: f64,
    ) -> Arc<MarkerIcon> {
        let key = format!("{:?}|{}|{}|{:.1}", shape, fill, stroke, stroke_width);
        if let Some(icon) = self.icons.get(&key) {
            return Arc::clone(icon);
        }

        self.created += 1;
        let icon = Arc::new(MarkerIcon {
            key: key.clone(),
            shape,
            fill: fill.to_string(),
            stroke: stroke.to_string(),
            stroke_width,
        });
        self.icons.insert(key, Arc::clone(&icon));
        icon
    }

    /// Number of icons generated so far
    #[cfg(test)]
    pub fn created(&self) -> u64 {
        self.created
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.icons.len()
    }
}
