//! ICAO 24-bit addresses as they appear in snapshots

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::SnapshotError;

/// Aircraft address: 24-bit ICAO value plus the non-ICAO (`~`) marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    icao: u32,
    non_icao: bool,
}

impl Address {
    /// Parse `"4840d6"` or `"~4840d6"`; returns `None` for anything else
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (digits, non_icao) = match text.strip_prefix('~') {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        if digits.len() != 6 {
            return None;
        }

        let bytes = hex::decode(digits).ok()?;
        let icao = bytes
            .iter()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
        Some(Self { icao, non_icao })
    }

    pub fn icao(&self) -> u32 {
        self.icao
    }

    pub fn is_non_icao(&self) -> bool {
        self.non_icao
    }

    /// The reserved `000000` address never denotes a real aircraft
    pub fn is_null(&self) -> bool {
        self.icao == 0 && !self.non_icao
    }

    /// Upper-case six digit key used by the metadata database
    pub fn db_key(&self) -> String {
        format!("{:06X}", self.icao)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.non_icao {
            write!(f, "~{:06x}", self.icao)
        } else {
            write!(f, "{:06x}", self.icao)
        }
    }
}

impl FromStr for Address {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SnapshotError::InvalidAddress(s.to_string()))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_icao() {
        let addr = Address::parse("4840d6").unwrap();
        assert_eq!(addr.icao(), 0x4840D6);
        assert!(!addr.is_non_icao());
        assert_eq!(addr.to_string(), "4840d6");
        assert_eq!(addr.db_key(), "4840D6");
    }

    #[test]
    fn test_parse_non_icao() {
        let addr = Address::parse("~ABC123").unwrap();
        assert_eq!(addr.icao(), 0xABC123);
        assert!(addr.is_non_icao());
        assert_eq!(addr.to_string(), "~abc123");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Address::parse("4840d").is_none());
        assert!(Address::parse("4840d6a").is_none());
        assert!(Address::parse("zz40d6").is_none());
        assert!(Address::parse("").is_none());
        assert!("xyz".parse::<Address>().is_err());
    }

    #[test]
    fn test_null_address() {
        assert!(Address::parse("000000").unwrap().is_null());
        assert!(!Address::parse("~000000").unwrap().is_null());
    }
}
