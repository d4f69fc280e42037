//! Map layer collaborator
//!
//! The engine never talks to a map library directly. Everything it wants
//! drawn goes through [`MapLayer`]; the runtime uses [`DrawBuffer`] to turn
//! those calls into JSON draw ops for connected clients.

use std::sync::Arc;

use serde::Serialize;

use crate::aircraft::marker::MarkerIcon;
use crate::geo::LatLon;
use crate::snapshot::Address;

/// Which part of an aircraft's trail a polyline represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum TrailPart {
    /// Committed segment at this index
    Fixed(usize),
    /// Live edge from the last committed point to the current position
    Elastic,
}

/// Stroke of one trail polyline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: String,
    pub dashed: bool,
    pub width: f64,
}

/// A positioned marker as drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerPlacement {
    pub position: LatLon,
    /// Degrees clockwise from north
    pub rotation: f64,
    pub icon: Arc<MarkerIcon>,
}

/// Drawing surface the registry renders into
pub trait MapLayer {
    fn upsert_marker(&mut self, address: Address, marker: &MarkerPlacement);
    fn remove_marker(&mut self, address: Address);
    fn upsert_segment(&mut self, address: Address, part: TrailPart, points: &[LatLon], style: &LineStyle);
    fn remove_segment(&mut self, address: Address, part: TrailPart);
    /// Drop every trail polyline of the aircraft
    fn remove_trail(&mut self, address: Address);
    fn center_on(&mut self, position: LatLon);
}

/// Serializable form of one [`MapLayer`] call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Marker {
        address: Address,
        #[serde(flatten)]
        marker: MarkerPlacement,
    },
    RemoveMarker {
        address: Address,
    },
    Segment {
        address: Address,
        part: TrailPart,
        points: Vec<LatLon>,
        style: LineStyle,
    },
    RemoveSegment {
        address: Address,
        part: TrailPart,
    },
    RemoveTrail {
        address: Address,
    },
    Center {
        position: LatLon,
    },
}

/// Records draw calls until drained
#[derive(Debug, Default)]
pub struct DrawBuffer {
    ops: Vec<DrawOp>,
}

impl DrawBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn drain(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }
}

impl MapLayer for DrawBuffer {
    fn upsert_marker(&mut self, address: Address, marker: &MarkerPlacement) {
        self.ops.push(DrawOp::Marker {
            address,
            marker: marker.clone(),
        });
    }

    fn remove_marker(&mut self, address: Address) {
        self.ops.push(DrawOp::RemoveMarker { address });
    }

    fn upsert_segment(&mut self, address: Address, part: TrailPart, points: &[LatLon], style: &LineStyle) {
        self.ops.push(DrawOp::Segment {
            address,
            part,
            points: points.to_vec(),
            style: style.clone(),
        });
    }

    fn remove_segment(&mut self, address: Address, part: TrailPart) {
        self.ops.push(DrawOp::RemoveSegment { address, part });
    }

    fn remove_trail(&mut self, address: Address) {
        self.ops.push(DrawOp::RemoveTrail { address });
    }

    fn center_on(&mut self, position: LatLon) {
        self.ops.push(DrawOp::Center { position });
    }
}
