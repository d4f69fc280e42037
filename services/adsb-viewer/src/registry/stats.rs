use serde::Serialize;

/// Counters computed by each refresh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub tracked: usize,
    /// Aircraft with a marker on the map
    pub with_position: usize,
    /// Aircraft the database has not yet classified as civil or military
    pub unknown_classification: usize,
    /// Points held across every aircraft's trail
    pub history_points: usize,
}

impl std::fmt::Display for TrackerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Aircraft: {} tracked, {} with position, {} unclassified, {} trail points",
            self.tracked, self.with_position, self.unknown_classification, self.history_points
        )
    }
}
