//! Aircraft metadata database
//!
//! Registration, type and operator details come from a static key/value
//! database. Lookups are asynchronous: the registry only queues
//! [`LookupRequest`]s, the runtime resolves them against a
//! [`MetadataStore`] and feeds the [`LookupOutcome`]s back.

mod json_db;

pub use json_db::JsonDb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MetadataError;
use crate::snapshot::Address;

/// Per-aircraft database entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftRecord {
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,

    /// ICAO type designator, e.g. `B738`
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub icao_type: Option<String>,

    /// Two flag characters: military, interesting
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,

    #[serde(rename = "desc", default, skip_serializing_if = "Option::is_none")]
    pub type_description: Option<String>,
}

impl AircraftRecord {
    fn flag(&self, index: usize) -> bool {
        self.flags
            .as_deref()
            .and_then(|f| f.chars().nth(index))
            .map_or(false, |c| c == '1')
    }

    pub fn military(&self) -> bool {
        self.flag(0)
    }

    pub fn interesting(&self) -> bool {
        self.flag(1)
    }

    /// Entries from an override layer fill gaps in the database entry
    pub fn overlaid_on(self, base: AircraftRecord) -> AircraftRecord {
        AircraftRecord {
            registration: self.registration.or(base.registration),
            icao_type: self.icao_type.or(base.icao_type),
            flags: self.flags.or(base.flags),
            type_description: self.type_description.or(base.type_description),
        }
    }
}

/// Type designator entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    /// Species code: airframe class, engine count, engine type (`L2J`)
    #[serde(default)]
    pub desc: Option<String>,

    /// Wake turbulence category
    #[serde(default)]
    pub wtc: Option<String>,
}

/// Airline operator entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRecord {
    #[serde(rename = "n", default)]
    pub name: Option<String>,

    #[serde(rename = "c", default)]
    pub country: Option<String>,

    /// Radio telephony callsign
    #[serde(rename = "r", default)]
    pub callsign: Option<String>,
}

/// Async key/value metadata lookups
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn aircraft(&self, key: &str) -> Result<Option<AircraftRecord>, MetadataError>;

    async fn aircraft_type(&self, designator: &str) -> Result<Option<TypeRecord>, MetadataError>;

    async fn operator(&self, code: &str) -> Result<Option<OperatorRecord>, MetadataError>;

    /// Persist a manual override for one aircraft
    async fn store_aircraft(&self, key: &str, record: AircraftRecord) -> Result<(), MetadataError>;
}

/// What a request asks the store for
#[derive(Debug, Clone, PartialEq)]
pub enum LookupKind {
    Aircraft,
    Type(String),
    Operator(String),
    Store(AircraftRecord),
}

/// One queued metadata request, tagged with the entity that issued it
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub address: Address,
    /// Creation serial of the issuing entity
    pub serial: u64,
    pub kind: LookupKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupReply {
    Aircraft(Option<AircraftRecord>),
    Type(Option<TypeRecord>),
    Operator(Option<OperatorRecord>),
    Stored,
}

/// Result of a resolved [`LookupRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOutcome {
    pub address: Address,
    pub serial: u64,
    pub reply: LookupReply,
}

/// Run one request against the store. Failures are logged and reported as
/// "no entry" so nothing propagates back into the tick loop.
pub async fn resolve(store: &dyn MetadataStore, request: LookupRequest) -> LookupOutcome {
    let LookupRequest { address, serial, kind } = request;

    let reply = match kind {
        LookupKind::Aircraft => {
            let key = address.db_key();
            LookupReply::Aircraft(store.aircraft(&key).await.unwrap_or_else(|e| {
                warn!("Aircraft lookup for {} failed: {}", address, e);
                None
            }))
        }
        LookupKind::Type(designator) => {
            LookupReply::Type(store.aircraft_type(&designator).await.unwrap_or_else(|e| {
                warn!("Type lookup for {} failed: {}", designator, e);
                None
            }))
        }
        LookupKind::Operator(code) => {
            LookupReply::Operator(store.operator(&code).await.unwrap_or_else(|e| {
                warn!("Operator lookup for {} failed: {}", code, e);
                None
            }))
        }
        LookupKind::Store(record) => {
            if let Err(e) = store.store_aircraft(&address.db_key(), record).await {
                warn!("Failed to store metadata for {}: {}", address, e);
            }
            LookupReply::Stored
        }
    };

    LookupOutcome { address, serial, reply }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_flags() {
        let rec: AircraftRecord =
            serde_json::from_str(r#"{"r":"PH-BXA","t":"B738","f":"10","desc":"BOEING 737-800"}"#).unwrap();
        assert_eq!(rec.registration.as_deref(), Some("PH-BXA"));
        assert!(rec.military());
        assert!(!rec.interesting());

        let bare = AircraftRecord::default();
        assert!(!bare.military());
        assert!(!bare.interesting());
    }

    #[test]
    fn test_override_overlay() {
        let base = AircraftRecord {
            registration: Some("PH-BXA".into()),
            icao_type: Some("B738".into()),
            ..Default::default()
        };
        let edit = AircraftRecord {
            registration: Some("PH-XXX".into()),
            flags: Some("01".into()),
            ..Default::default()
        };
        let merged = edit.overlaid_on(base);
        assert_eq!(merged.registration.as_deref(), Some("PH-XXX"));
        assert_eq!(merged.icao_type.as_deref(), Some("B738"));
        assert!(merged.interesting());
    }

    #[test]
    fn test_operator_record() {
        let op: OperatorRecord =
            serde_json::from_str(r#"{"n":"KLM Royal Dutch Airlines","c":"Netherlands","r":"KLM"}"#).unwrap();
        assert_eq!(op.callsign.as_deref(), Some("KLM"));
    }
}
