//! Receiver snapshot decoding
//!
//! A snapshot is the `aircraft.json` document published by the receiver on
//! every poll: a receiver timestamp plus one loosely-typed record per aircraft.

mod address;
mod record;

pub use address::Address;
pub use record::Record;

use serde::Deserialize;
use serde_json::Value;

use crate::error::SnapshotError;

/// One periodic receiver snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    /// Receiver clock, seconds since the epoch
    pub now: f64,

    /// Raw aircraft records, decoded lazily through [`Record`]
    #[serde(default)]
    pub aircraft: Vec<Value>,
}

impl Snapshot {
    /// Decode a snapshot from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        if !snapshot.now.is_finite() {
            return Err(SnapshotError::InvalidTimestamp(snapshot.now));
        }
        Ok(snapshot)
    }

    /// Iterate over the records that are JSON objects; anything else is ignored
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.aircraft.iter().filter_map(Record::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_decode() {
        let json = br#"{"now":100.5,"messages":42,"aircraft":[{"hex":"4840d6","alt_baro":35000},17,{"hex":"~abc123"}]}"#;
        let snapshot = Snapshot::from_slice(json).unwrap();
        assert_eq!(snapshot.now, 100.5);
        // the bare number is not a record
        assert_eq!(snapshot.records().count(), 2);
    }

    #[test]
    fn test_snapshot_requires_now() {
        assert!(Snapshot::from_slice(br#"{"aircraft":[]}"#).is_err());
        assert!(Snapshot::from_slice(b"not json").is_err());
    }

    #[test]
    fn test_snapshot_without_aircraft() {
        let snapshot = Snapshot::from_slice(br#"{"now":5}"#).unwrap();
        assert_eq!(snapshot.records().count(), 0);
    }
}
