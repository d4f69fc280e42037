//! Trail segmentation
//!
//! Turns the stream of position fixes for one aircraft into a handful of
//! polylines. A new segment starts whenever the data quality changes
//! (estimated vs. solid), the aircraft lands or takes off, or the altitude
//! bucket changes. Inside a steady segment only one point per
//! [`THIN_INTERVAL_SECS`] is committed; the live edge is covered by the
//! elastic segment, which is rebuilt on every tick and never stored.

use serde::Serialize;

use crate::geo::{Altitude, LatLon};

/// Gap (seconds of data time) after which an ADS-B stretch is estimated
pub const STALE_SECS_ADSB: f64 = 5.0;
/// MLAT fixes legitimately arrive less often
pub const STALE_SECS_MLAT: f64 = 30.0;
/// Minimum spacing between committed points of a steady segment
pub const THIN_INTERVAL_SECS: f64 = 5.0;

/// One committed polyline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub points: Vec<LatLon>,
    /// Discretized altitude the segment is coloured by; `None` when unknown
    /// or for estimated segments
    pub altitude: Option<Altitude>,
    pub ground: bool,
    pub estimated: bool,
    /// Receiver time of the last committed sample
    pub update_time: f64,
}

impl Segment {
    fn solid(start: LatLon, altitude: Option<Altitude>, time: f64) -> Self {
        Self {
            points: vec![start],
            altitude: altitude.map(|a| a.discretized()),
            ground: altitude.map_or(false, |a| a.is_ground()),
            estimated: false,
            update_time: time,
        }
    }

    fn estimated(start: LatLon, time: f64) -> Self {
        Self {
            points: vec![start],
            altitude: None,
            ground: false,
            estimated: true,
            update_time: time,
        }
    }

    pub fn last_point(&self) -> Option<LatLon> {
        self.points.last().copied()
    }

    /// Append `point` unless the segment already ends there
    fn extend_to(&mut self, point: LatLon) {
        if self.last_point() != Some(point) {
            self.points.push(point);
        }
    }
}

/// A position fix fed into the segmenter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub position: LatLon,
    /// Receiver time at which the position was measured
    pub time: f64,
    pub mlat: bool,
    pub altitude: Option<Altitude>,
}

/// Committed trail of one aircraft
#[derive(Debug, Clone, Default)]
pub struct Track {
    segments: Vec<Segment>,
    prev: Option<TrackSample>,
    /// First segment index whose geometry changed since the last draw
    dirty_from: Option<usize>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Committed points across all segments
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    /// Feed one fix. Returns `false` when the position did not move.
    pub fn push(&mut self, sample: TrackSample, receiver_now: f64, last_receiver_timestamp: f64) -> bool {
        if let Some(prev) = &self.prev {
            if prev.position == sample.position {
                return false;
            }
        }

        let prev = match self.prev.replace(sample) {
            None => {
                self.segments
                    .push(Segment::solid(sample.position, sample.altitude, sample.time));
                self.mark_dirty(0);
                return true;
            }
            Some(prev) => prev,
        };

        let last_index = match self.segments.len().checked_sub(1) {
            Some(i) => i,
            None => {
                self.segments
                    .push(Segment::solid(sample.position, sample.altitude, sample.time));
                self.mark_dirty(0);
                return true;
            }
        };

        // Gap between the two fixes measured in data time: subtracting the
        // polling interval removes receiver jitter.
        let time_difference =
            (sample.time - prev.time) - (receiver_now - last_receiver_timestamp);
        let stale_threshold = if sample.mlat { STALE_SECS_MLAT } else { STALE_SECS_ADSB };
        let estimated = time_difference > stale_threshold
            || (receiver_now - sample.time) > stale_threshold;

        let last = &mut self.segments[last_index];

        if estimated {
            last.extend_to(prev.position);
            if last.estimated {
                last.update_time = prev.time;
            } else {
                self.segments
                    .push(Segment::estimated(prev.position, prev.time));
            }
            self.mark_dirty(last_index);
            return true;
        }

        if last.estimated {
            // back to good data
            last.extend_to(prev.position);
            self.segments
                .push(Segment::solid(prev.position, sample.altitude, prev.time));
            self.mark_dirty(last_index);
            return true;
        }

        let ground = sample.altitude.map_or(false, |a| a.is_ground());
        let bucket = sample.altitude.map(|a| a.discretized());
        if last.ground != ground || last.altitude != bucket {
            // the transition happened somewhere between the two fixes
            let midpoint = prev.position.midpoint(&sample.position);
            last.points.push(midpoint);
            let mut next = Segment::solid(midpoint, sample.altitude, prev.time);
            next.points.push(sample.position);
            self.segments.push(next);
            self.mark_dirty(last_index);
            return true;
        }

        if prev.time - last.update_time >= THIN_INTERVAL_SECS {
            last.points.push(sample.position);
            last.update_time = sample.time;
            self.mark_dirty(last_index);
        }

        true
    }

    /// Two-point live edge from the last committed point to `live`
    pub fn elastic(&self, live: LatLon) -> Option<[LatLon; 2]> {
        let from = self.segments.last()?.last_point()?;
        if from == live {
            None
        } else {
            Some([from, live])
        }
    }

    /// Whether the live edge should be drawn dashed
    pub fn elastic_estimated(&self) -> bool {
        self.segments.last().map_or(false, |s| s.estimated)
    }

    /// Force a full redraw on the next [`Track::take_dirty`]
    pub fn mark_all_dirty(&mut self) {
        if !self.segments.is_empty() {
            self.dirty_from = Some(0);
        }
    }

    /// Index of the first segment needing a redraw, clearing the mark
    pub fn take_dirty(&mut self) -> Option<usize> {
        self.dirty_from.take()
    }

    fn mark_dirty(&mut self, index: usize) {
        self.dirty_from = Some(self.dirty_from.map_or(index, |d| d.min(index)));
    }
}
