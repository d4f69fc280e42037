//! Special transponder codes

/// A squawk code that gets special treatment in the table and on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialSquawk {
    pub code: &'static str,
    pub name: &'static str,
    /// Row class applied in the table
    pub css_class: &'static str,
    /// Marker fill overriding the altitude colour
    pub marker_color: &'static str,
    /// Emergencies are exempt from filtering
    pub emergency: bool,
}

pub const SPECIAL_SQUAWKS: &[SpecialSquawk] = &[
    SpecialSquawk {
        code: "7400",
        name: "UAV Lost Link",
        css_class: "squawk7400",
        marker_color: "rgb(255, 170, 0)",
        emergency: false,
    },
    SpecialSquawk {
        code: "7500",
        name: "Aircraft Hijacking",
        css_class: "squawk7500",
        marker_color: "rgb(255, 85, 85)",
        emergency: true,
    },
    SpecialSquawk {
        code: "7600",
        name: "Radio Failure",
        css_class: "squawk7600",
        marker_color: "rgb(0, 255, 255)",
        emergency: true,
    },
    SpecialSquawk {
        code: "7700",
        name: "General Emergency",
        css_class: "squawk7700",
        marker_color: "rgb(255, 255, 0)",
        emergency: true,
    },
];

/// Look up a squawk in the special table
pub fn lookup(squawk: Option<&str>) -> Option<&'static SpecialSquawk> {
    let squawk = squawk?;
    SPECIAL_SQUAWKS.iter().find(|s| s.code == squawk)
}

pub fn is_emergency(squawk: Option<&str>) -> bool {
    lookup(squawk).map_or(false, |s| s.emergency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(Some("7700")).unwrap().name, "General Emergency");
        assert!(lookup(Some("1200")).is_none());
        assert!(lookup(None).is_none());
    }

    #[test]
    fn test_emergency_codes() {
        assert!(is_emergency(Some("7500")));
        assert!(is_emergency(Some("7600")));
        assert!(is_emergency(Some("7700")));
        assert!(!is_emergency(Some("7400")));
        assert!(!is_emergency(Some("2000")));
    }
}
