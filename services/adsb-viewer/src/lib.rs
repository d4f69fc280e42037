//! ADS-B map viewer engine
//!
//! Ingests the periodic `aircraft.json` snapshots published by a dump1090
//! style receiver, keeps rolling per-aircraft state and trails, and renders
//! them through a [`render::MapLayer`] and a sortable, filterable table.

pub mod aircraft;
pub mod backfill;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod geo;
pub mod identity;
pub mod metadata;
pub mod registry;
pub mod render;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod squawks;

pub use config::Config;
pub use service::{TrackerHandle, TrackerService};
