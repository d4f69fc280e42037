//! Per-tick visibility decision and map drawing

use crate::render::{LineStyle, MapLayer, MarkerPlacement, TrailPart};

use super::colors::{self, MarkerTint, ESTIMATED_TRAIL_COLOR};
use super::marker::{self, IconCache, OUTLINE_ADSB, OUTLINE_HIGHLIGHT, OUTLINE_MLAT};
use super::track::{Segment, TrackSample};
use super::{Aircraft, Visibility};

/// Longest silence before an aircraft is dropped from display
pub const EXPIRE_AFTER_SECS: f64 = 58.0;
/// Longest position age for a marker to be drawn
pub const POSITION_TIMEOUT_SECS: f64 = 60.0;
/// Position age after which the marker is drawn faded
pub const STALE_POSITION_SECS: f64 = 15.0;

const TRAIL_WIDTH: f64 = 1.5;

/// Registry-level facts the tick needs
#[derive(Debug, Clone, Copy, Default)]
pub struct TickContext {
    /// An active filter excludes this aircraft
    pub filtered: bool,
    /// "Only show in view" is on and the aircraft is outside the viewport
    pub out_of_view: bool,
    pub select_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub visibility: Visibility,
    /// The aircraft was singly selected and has just been hidden
    pub lost_selection: bool,
}

fn segment_style(segment: &Segment) -> LineStyle {
    if segment.estimated {
        LineStyle {
            color: ESTIMATED_TRAIL_COLOR.to_string(),
            dashed: true,
            width: TRAIL_WIDTH,
        }
    } else {
        LineStyle {
            color: colors::altitude_color(segment.altitude).css(),
            dashed: false,
            width: TRAIL_WIDTH,
        }
    }
}

impl Aircraft {
    fn singly_selected(&self, ctx: &TickContext) -> bool {
        self.selected && !ctx.select_all
    }

    /// Recompute ages and decide what is shown. Repeating a tick with the
    /// same inputs issues no draw calls.
    pub fn update_tick(
        &mut self,
        now: f64,
        last_now: f64,
        ctx: &TickContext,
        layer: &mut dyn MapLayer,
        icons: &mut IconCache,
    ) -> TickOutcome {
        self.seen = (now - self.last_message_time).max(0.0);
        self.seen_pos = self.last_position_time.map(|t| (now - t).max(0.0));

        let mut lost_selection = false;

        if self.seen > EXPIRE_AFTER_SECS || ctx.filtered || ctx.out_of_view {
            self.clear_drawing(layer);
            self.visibility = Visibility::Expired;
            if self.singly_selected(ctx) {
                self.selected = false;
                lost_selection = true;
            }
        } else {
            let fresh = self.seen_pos.map_or(false, |age| age < POSITION_TIMEOUT_SECS);
            match self.position {
                Some(position) if fresh || self.singly_selected(ctx) => {
                    self.visibility = Visibility::Positioned;
                    if let Some(time) = self.last_position_time {
                        self.track_log.push(
                            TrackSample {
                                position,
                                time,
                                mlat: self.is_mlat(),
                                altitude: self.altitude,
                            },
                            now,
                            last_now,
                        );
                    }
                    self.draw_trail(layer);
                    self.draw_marker(ctx, layer, icons);
                }
                _ => {
                    self.clear_drawing(layer);
                    self.visibility = Visibility::NoPosition;
                }
            }
        }

        TickOutcome {
            visibility: self.visibility,
            lost_selection,
        }
    }

    pub(crate) fn clear_drawing(&mut self, layer: &mut dyn MapLayer) {
        if self.drawn.marker.take().is_some() {
            layer.remove_marker(self.address);
        }
        if self.drawn.trail || self.drawn.elastic.is_some() {
            layer.remove_trail(self.address);
            self.drawn.trail = false;
            self.drawn.elastic = None;
            self.track_log.mark_all_dirty();
        }
    }

    fn draw_trail(&mut self, layer: &mut dyn MapLayer) {
        if let Some(from) = self.track_log.take_dirty() {
            for (index, segment) in self.track_log.segments().iter().enumerate().skip(from) {
                layer.upsert_segment(
                    self.address,
                    TrailPart::Fixed(index),
                    &segment.points,
                    &segment_style(segment),
                );
            }
            self.drawn.trail = true;
        }

        let Some(position) = self.position else {
            return;
        };
        let elastic = self.track_log.elastic(position).map(|points| {
            let style = if self.track_log.elastic_estimated() {
                LineStyle {
                    color: ESTIMATED_TRAIL_COLOR.to_string(),
                    dashed: true,
                    width: TRAIL_WIDTH,
                }
            } else {
                LineStyle {
                    color: colors::altitude_color(self.altitude).css(),
                    dashed: false,
                    width: TRAIL_WIDTH,
                }
            };
            (points, style)
        });

        if elastic == self.drawn.elastic {
            return;
        }
        match &elastic {
            Some((points, style)) => {
                layer.upsert_segment(self.address, TrailPart::Elastic, points, style)
            }
            None => layer.remove_segment(self.address, TrailPart::Elastic),
        }
        self.drawn.elastic = elastic;
    }

    fn draw_marker(&mut self, ctx: &TickContext, layer: &mut dyn MapLayer, icons: &mut IconCache) {
        let Some(position) = self.position else {
            return;
        };

        let fill = match self.special_squawk() {
            Some(special) => special.marker_color.to_string(),
            None => colors::marker_color(
                self.altitude,
                MarkerTint {
                    stale: self.seen_pos.map_or(false, |age| age > STALE_POSITION_SECS),
                    selected: self.singly_selected(ctx),
                    mlat: self.is_mlat(),
                },
            )
            .css(),
        };
        let stroke = if self.highlighted {
            OUTLINE_HIGHLIGHT
        } else if self.is_mlat() {
            OUTLINE_MLAT
        } else {
            OUTLINE_ADSB
        };
        let stroke_width = if self.singly_selected(ctx) { 2.0 } else { 1.0 };
        let shape = marker::shape_for(
            self.icao_type.as_deref(),
            self.species.as_deref(),
            self.category.as_deref(),
        );

        let placement = MarkerPlacement {
            position,
            rotation: self
                .track
                .or(self.true_heading)
                .or(self.mag_heading)
                .unwrap_or(0.0),
            icon: icons.icon(shape, &fill, stroke, stroke_width),
        };

        if self.drawn.marker.as_ref() != Some(&placement) {
            layer.upsert_marker(self.address, &placement);
            self.drawn.marker = Some(placement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Altitude, LatLon};
    use crate::metadata::LookupRequest;
    use crate::render::{DrawBuffer, DrawOp};
    use crate::snapshot::{Address, Record};
    use serde_json::{json, Value};

    fn aircraft() -> Aircraft {
        let mut lookups: Vec<LookupRequest> = Vec::new();
        Aircraft::new(Address::parse("4840d6").unwrap(), 1, &mut lookups)
    }

    fn feed(a: &mut Aircraft, now: f64, value: Value) {
        let record = Record::from_value(&value).unwrap();
        a.update_data(now, &record, None, &mut Vec::new());
    }

    fn positioned() -> Value {
        json!({"hex": "4840d6", "alt_baro": 35_000, "lat": 52.0, "lon": 4.0, "seen": 0, "seen_pos": 0, "track": 90.0})
    }

    #[test]
    fn test_positioned_draws_marker() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();

        feed(&mut a, 100.0, positioned());
        let outcome = a.update_tick(100.0, 0.0, &TickContext::default(), &mut layer, &mut icons);

        assert_eq!(outcome.visibility, Visibility::Positioned);
        assert!(a.is_visible());
        assert_eq!(a.altitude, Some(Altitude::Feet(35_000)));
        let ops = layer.drain();
        let marker = ops.iter().find_map(|op| match op {
            DrawOp::Marker { marker, .. } => Some(marker.clone()),
            _ => None,
        });
        let marker = marker.unwrap();
        assert_eq!(marker.position, LatLon::new(52.0, 4.0));
        assert_eq!(marker.rotation, 90.0);
        assert_eq!(marker.icon.stroke, OUTLINE_ADSB);
        assert_eq!(marker.icon.fill, "hsl(275,85%,50%)");
    }

    #[test]
    fn test_identical_tick_is_silent() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();

        feed(&mut a, 100.0, positioned());
        a.update_tick(100.0, 0.0, &TickContext::default(), &mut layer, &mut icons);
        layer.drain();
        a.update_tick(100.0, 0.0, &TickContext::default(), &mut layer, &mut icons);
        assert!(layer.ops().is_empty());
        assert_eq!(icons.created(), 1);
    }

    #[test]
    fn test_expired_after_58s() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();

        feed(&mut a, 100.0, positioned());
        a.update_tick(100.0, 0.0, &TickContext::default(), &mut layer, &mut icons);
        layer.drain();

        let outcome = a.update_tick(159.0, 158.0, &TickContext::default(), &mut layer, &mut icons);
        assert_eq!(a.seen, 59.0);
        assert_eq!(outcome.visibility, Visibility::Expired);
        assert!(!a.is_listed());
        let ops = layer.drain();
        assert!(ops.contains(&DrawOp::RemoveMarker { address: a.address }));
        assert!(ops.contains(&DrawOp::RemoveTrail { address: a.address }));
        // trail data is retained
        assert_eq!(a.track_log.segments().len(), 1);
    }

    #[test]
    fn test_no_position_listed() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();

        feed(&mut a, 100.0, json!({"hex": "4840d6", "alt_baro": 12_000}));
        let outcome = a.update_tick(100.0, 0.0, &TickContext::default(), &mut layer, &mut icons);
        assert_eq!(outcome.visibility, Visibility::NoPosition);
        assert!(a.is_listed());
        assert!(layer.ops().is_empty());
    }

    #[test]
    fn test_old_position_shown_only_when_selected() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();

        feed(&mut a, 100.0, json!({"lat": 52.0, "lon": 4.0, "seen_pos": 61.0}));
        a.update_tick(100.0, 99.0, &TickContext::default(), &mut layer, &mut icons);
        assert_eq!(a.visibility, Visibility::NoPosition);

        a.selected = true;
        a.update_tick(100.0, 99.0, &TickContext::default(), &mut layer, &mut icons);
        assert_eq!(a.visibility, Visibility::Positioned);

        // in select-all mode the aircraft is not singly selected
        let ctx = TickContext { select_all: true, ..Default::default() };
        a.update_tick(100.0, 99.0, &ctx, &mut layer, &mut icons);
        assert_eq!(a.visibility, Visibility::NoPosition);
    }

    #[test]
    fn test_filtered_drops_selection() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();
        feed(&mut a, 100.0, positioned());
        a.selected = true;

        let ctx = TickContext { filtered: true, ..Default::default() };
        let outcome = a.update_tick(100.0, 99.0, &ctx, &mut layer, &mut icons);
        assert!(outcome.lost_selection);
        assert!(!a.selected);
        assert_eq!(a.visibility, Visibility::Expired);
    }

    #[test]
    fn test_emergency_marker_colour() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();
        let mut value = positioned();
        value["squawk"] = json!("7700");
        feed(&mut a, 100.0, value);
        a.update_tick(100.0, 99.0, &TickContext::default(), &mut layer, &mut icons);
        assert_eq!(a.drawn.marker.as_ref().unwrap().icon.fill, "rgb(255, 255, 0)");
    }

    #[test]
    fn test_redisplay_redraws_trail() {
        let mut a = aircraft();
        let mut layer = DrawBuffer::new();
        let mut icons = IconCache::new();
        feed(&mut a, 100.0, positioned());
        a.update_tick(100.0, 99.0, &TickContext::default(), &mut layer, &mut icons);

        let hidden = TickContext { filtered: true, ..Default::default() };
        a.update_tick(101.0, 100.0, &hidden, &mut layer, &mut icons);
        layer.drain();

        a.update_tick(102.0, 101.0, &TickContext::default(), &mut layer, &mut icons);
        let ops = layer.drain();
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Segment { part: TrailPart::Fixed(0), .. }
        )));
    }
}
