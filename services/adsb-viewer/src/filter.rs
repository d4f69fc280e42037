//! Aircraft filters
//!
//! Every filter is an independent predicate; an aircraft is excluded when
//! any active filter excludes it. In highlight mode nothing is excluded and
//! would-be-excluded aircraft are flagged instead.

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aircraft::Aircraft;
use crate::error::FilterError;

const METRES_PER_NM: f64 = 1852.0;

const ALTITUDE_DOMAIN_FT: (f64, f64) = (-2_000.0, 60_000.0);
const DISTANCE_DOMAIN_NM: (f64, f64) = (0.0, 1_000.0);

const SPECIES_CLASSES: &str = "LSAHGTW";
const ENGINE_TYPES: &str = "JTPER";
const WAKE_CATEGORIES: &str = "LMHJ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeCondition {
    Between,
    NotBetween,
}

/// Numeric range, inclusive at both ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeOperand {
    pub condition: RangeCondition,
    pub min: f64,
    pub max: f64,
}

impl RangeOperand {
    fn normalize(&mut self, (low, high): (f64, f64)) -> Result<(), FilterError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(FilterError::NotFinite);
        }
        self.min = self.min.clamp(low, high);
        self.max = self.max.clamp(low, high);
        if self.min > self.max {
            std::mem::swap(&mut self.min, &mut self.max);
        }
        Ok(())
    }

    fn excludes(&self, value: Option<f64>) -> bool {
        let Some(v) = value else {
            return true;
        };
        let inside = v >= self.min && v <= self.max;
        match self.condition {
            RangeCondition::Between => !inside,
            RangeCondition::NotBetween => inside,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCondition {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
}

/// Case-insensitive string match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOperand {
    pub condition: TextCondition,
    pub value: String,
}

impl TextOperand {
    fn normalize(&mut self) -> Result<(), FilterError> {
        self.value = self.value.trim().to_uppercase();
        if self.value.is_empty() {
            return Err(FilterError::EmptyOperand);
        }
        Ok(())
    }

    fn excludes(&self, haystack: Option<&str>) -> bool {
        let Some(haystack) = haystack else {
            return true;
        };
        let haystack = haystack.trim().to_uppercase();
        let needle = self.value.as_str();
        let matches = match self.condition {
            TextCondition::Equals => haystack == needle,
            TextCondition::NotEquals => haystack != needle,
            TextCondition::Contains => haystack.contains(needle),
            TextCondition::NotContains => !haystack.contains(needle),
            TextCondition::StartsWith => haystack.starts_with(needle),
            TextCondition::NotStartsWith => !haystack.starts_with(needle),
            TextCondition::EndsWith => haystack.ends_with(needle),
            TextCondition::NotEndsWith => !haystack.ends_with(needle),
        };
        !matches
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Match {
    Is,
    IsNot,
}

/// Membership in a set of single-character codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeOperand {
    pub condition: Match,
    pub codes: Vec<char>,
}

impl CodeOperand {
    fn normalize(&mut self, valid: &str) -> Result<(), FilterError> {
        if self.codes.is_empty() {
            return Err(FilterError::EmptyOperand);
        }
        for code in self.codes.iter_mut() {
            *code = code.to_ascii_uppercase();
            if !valid.contains(*code) {
                return Err(FilterError::InvalidCode(*code));
            }
        }
        self.codes.sort_unstable();
        self.codes.dedup();
        Ok(())
    }

    fn excludes(&self, code: Option<char>) -> bool {
        let Some(code) = code else {
            return true;
        };
        let member = self.codes.contains(&code.to_ascii_uppercase());
        match self.condition {
            Match::Is => !member,
            Match::IsNot => member,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagOperand {
    pub condition: Match,
}

impl FlagOperand {
    fn excludes(&self, value: bool) -> bool {
        match self.condition {
            Match::Is => !value,
            Match::IsNot => value,
        }
    }
}

/// One filter predicate with its operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    /// Feet; the ground counts as zero
    Altitude(RangeOperand),
    /// Nautical miles from the receiver site
    Distance(RangeOperand),
    /// Flight id
    Ident(TextOperand),
    Registration(TextOperand),
    AircraftType(TextOperand),
    Country(TextOperand),
    /// Airframe class, first character of the species code
    Species(CodeOperand),
    /// Engine type, third character of the species code
    EngineType(CodeOperand),
    Wtc(CodeOperand),
    Military(FlagOperand),
    Interesting(FlagOperand),
    NoPosition(FlagOperand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default = "default_active")]
    pub active: bool,
    pub kind: FilterKind,
}

fn default_active() -> bool {
    true
}

impl Filter {
    pub fn new(kind: FilterKind) -> Self {
        Self { active: true, kind }
    }

    /// Check the operands and bring them into canonical form
    pub fn validate(&mut self) -> Result<(), FilterError> {
        match &mut self.kind {
            FilterKind::Altitude(range) => range.normalize(ALTITUDE_DOMAIN_FT),
            FilterKind::Distance(range) => range.normalize(DISTANCE_DOMAIN_NM),
            FilterKind::Ident(text)
            | FilterKind::Registration(text)
            | FilterKind::AircraftType(text)
            | FilterKind::Country(text) => text.normalize(),
            FilterKind::Species(codes) => codes.normalize(SPECIES_CLASSES),
            FilterKind::EngineType(codes) => codes.normalize(ENGINE_TYPES),
            FilterKind::Wtc(codes) => codes.normalize(WAKE_CATEGORIES),
            FilterKind::Military(_) | FilterKind::Interesting(_) | FilterKind::NoPosition(_) => Ok(()),
        }
    }

    /// Whether this filter on its own excludes the aircraft
    pub fn is_filtered(&self, aircraft: &Aircraft) -> bool {
        if !self.active {
            return false;
        }
        match &self.kind {
            FilterKind::Altitude(range) => {
                range.excludes(aircraft.altitude.map(|a| f64::from(a.feet())))
            }
            FilterKind::Distance(range) => {
                range.excludes(aircraft.site_dist.map(|m| m / METRES_PER_NM))
            }
            FilterKind::Ident(text) => text.excludes(aircraft.flight.as_deref()),
            FilterKind::Registration(text) => text.excludes(aircraft.registration.as_deref()),
            FilterKind::AircraftType(text) => text.excludes(aircraft.icao_type.as_deref()),
            FilterKind::Country(text) => {
                text.excludes(aircraft.country.as_ref().map(|c| c.country))
            }
            FilterKind::Species(codes) => codes.excludes(aircraft.species_char(0)),
            FilterKind::EngineType(codes) => codes.excludes(aircraft.species_char(2)),
            FilterKind::Wtc(codes) => {
                codes.excludes(aircraft.wtc.as_deref().and_then(|w| w.chars().next()))
            }
            FilterKind::Military(flag) => flag.excludes(aircraft.military()),
            FilterKind::Interesting(flag) => flag.excludes(aircraft.interesting),
            FilterKind::NoPosition(flag) => flag.excludes(aircraft.position.is_none()),
        }
    }
}

/// Result of running every filter over one aircraft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    Exclude,
    /// Would be excluded, but highlight mode is on
    Highlight,
}

/// The user's filter list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub highlight: bool,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        !self.filters.iter().any(|f| f.active)
    }

    /// Validate and append; returns the new filter's index
    pub fn add(&mut self, mut filter: Filter) -> Result<usize, FilterError> {
        filter.validate()?;
        self.filters.push(filter);
        Ok(self.filters.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Result<Filter, FilterError> {
        if index >= self.filters.len() {
            return Err(FilterError::NoSuchFilter(index));
        }
        Ok(self.filters.remove(index))
    }

    pub fn replace(&mut self, index: usize, mut filter: Filter) -> Result<(), FilterError> {
        filter.validate()?;
        let slot = self
            .filters
            .get_mut(index)
            .ok_or(FilterError::NoSuchFilter(index))?;
        *slot = filter;
        Ok(())
    }

    /// Emergencies and the singly selected aircraft are never filtered out
    pub fn verdict(&self, aircraft: &Aircraft, singly_selected: bool) -> FilterVerdict {
        if singly_selected || aircraft.has_emergency_squawk() {
            return FilterVerdict::Pass;
        }
        if !self.filters.iter().any(|f| f.is_filtered(aircraft)) {
            return FilterVerdict::Pass;
        }
        if self.highlight {
            FilterVerdict::Highlight
        } else {
            FilterVerdict::Exclude
        }
    }

    /// Restore a saved filter list; a missing file yields an empty set.
    /// Entries that no longer validate are dropped.
    pub async fn load(path: &Path) -> Result<Self, FilterError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(FilterError::Persist {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut set: FilterSet = serde_json::from_slice(&bytes)?;
        set.filters.retain_mut(|f| f.validate().is_ok());
        info!("Restored {} filters from {}", set.filters.len(), path.display());
        Ok(set)
    }

    pub async fn save(&self, path: &Path) -> Result<(), FilterError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| FilterError::Persist {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Altitude, LatLon};
    use crate::snapshot::Address;

    fn aircraft(hex: &str) -> Aircraft {
        Aircraft::new(Address::parse(hex).unwrap(), 1, &mut Vec::new())
    }

    fn altitude_between(min: f64, max: f64) -> Filter {
        Filter::new(FilterKind::Altitude(RangeOperand {
            condition: RangeCondition::Between,
            min,
            max,
        }))
    }

    #[test]
    fn test_range_normalized() {
        let mut f = altitude_between(90_000.0, 10_000.0);
        f.validate().unwrap();
        match f.kind {
            FilterKind::Altitude(r) => {
                assert_eq!(r.min, 10_000.0);
                assert_eq!(r.max, 60_000.0);
            }
            _ => unreachable!(),
        }

        let mut bad = altitude_between(f64::NAN, 1.0);
        assert!(matches!(bad.validate(), Err(FilterError::NotFinite)));
    }

    #[test]
    fn test_altitude_range() {
        let f = altitude_between(10_000.0, 20_000.0);
        let mut a = aircraft("4840d6");
        assert!(f.is_filtered(&a), "unknown altitude is excluded");
        a.altitude = Some(Altitude::Feet(15_000));
        assert!(!f.is_filtered(&a));
        a.altitude = Some(Altitude::Ground);
        assert!(f.is_filtered(&a));
    }

    #[test]
    fn test_text_conditions() {
        let mut a = aircraft("4840d6");
        a.flight = Some("KLM1023".into());

        let mut f = Filter::new(FilterKind::Ident(TextOperand {
            condition: TextCondition::StartsWith,
            value: "  klm ".into(),
        }));
        f.validate().unwrap();
        assert!(!f.is_filtered(&a));

        f.kind = FilterKind::Ident(TextOperand {
            condition: TextCondition::NotContains,
            value: "102".into(),
        });
        assert!(f.is_filtered(&a));

        // a missing haystack always excludes, even for negated conditions
        a.flight = None;
        assert!(f.is_filtered(&a));

        let mut empty = Filter::new(FilterKind::Ident(TextOperand {
            condition: TextCondition::Equals,
            value: "   ".into(),
        }));
        assert!(matches!(empty.validate(), Err(FilterError::EmptyOperand)));
    }

    #[test]
    fn test_species_codes() {
        let mut a = aircraft("4840d6");
        a.species = Some("L2J".into());

        let mut engine = Filter::new(FilterKind::EngineType(CodeOperand {
            condition: Match::Is,
            codes: vec!['j', 'T'],
        }));
        engine.validate().unwrap();
        assert!(!engine.is_filtered(&a));

        let class = Filter::new(FilterKind::Species(CodeOperand {
            condition: Match::IsNot,
            codes: vec!['L'],
        }));
        assert!(class.is_filtered(&a));

        let mut invalid = Filter::new(FilterKind::Wtc(CodeOperand {
            condition: Match::Is,
            codes: vec!['X'],
        }));
        assert!(matches!(invalid.validate(), Err(FilterError::InvalidCode('X'))));
    }

    #[test]
    fn test_or_semantics_and_highlight() {
        let mut set = FilterSet::default();
        set.add(altitude_between(30_000.0, 40_000.0)).unwrap();
        set.add(Filter::new(FilterKind::NoPosition(FlagOperand { condition: Match::IsNot })))
            .unwrap();

        let mut a = aircraft("4840d6");
        a.altitude = Some(Altitude::Feet(35_000));
        a.position = Some(LatLon::new(52.0, 4.0));
        assert_eq!(set.verdict(&a, false), FilterVerdict::Pass);

        // failing either filter is enough
        a.position = None;
        assert_eq!(set.verdict(&a, false), FilterVerdict::Exclude);
        a.position = Some(LatLon::new(52.0, 4.0));
        a.altitude = Some(Altitude::Feet(5_000));
        assert_eq!(set.verdict(&a, false), FilterVerdict::Exclude);

        set.highlight = true;
        assert_eq!(set.verdict(&a, false), FilterVerdict::Highlight);

        // inactive filters never filter
        set.highlight = false;
        set.filters[0].active = false;
        assert_eq!(set.verdict(&a, false), FilterVerdict::Pass);
    }

    #[test]
    fn test_exemptions() {
        let mut set = FilterSet::default();
        set.add(altitude_between(30_000.0, 40_000.0)).unwrap();

        let mut a = aircraft("4840d6");
        a.altitude = Some(Altitude::Feet(1_000));
        assert_eq!(set.verdict(&a, true), FilterVerdict::Pass);

        a.squawk = Some("7700".into());
        assert_eq!(set.verdict(&a, false), FilterVerdict::Pass);
        a.squawk = Some("7400".into());
        assert_eq!(set.verdict(&a, false), FilterVerdict::Exclude);
    }

    #[test]
    fn test_index_errors() {
        let mut set = FilterSet::default();
        assert!(matches!(set.remove(0), Err(FilterError::NoSuchFilter(0))));
        assert!(set
            .replace(3, altitude_between(0.0, 1.0))
            .is_err());
    }

    #[tokio::test]
    async fn test_persist_roundtrip_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("filters.json");

        assert_eq!(FilterSet::load(&path).await.unwrap(), FilterSet::default());

        let mut set = FilterSet::default();
        set.add(Filter::new(FilterKind::Country(TextOperand {
            condition: TextCondition::Equals,
            value: "netherlands".into(),
        })))
        .unwrap();
        set.highlight = true;
        set.save(&path).await.unwrap();

        let restored = FilterSet::load(&path).await.unwrap();
        assert_eq!(restored, set);
        match &restored.filters[0].kind {
            FilterKind::Country(t) => assert_eq!(t.value, "NETHERLANDS"),
            _ => unreachable!(),
        }
    }
}
