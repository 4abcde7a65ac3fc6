//! Unit conversion for volumes, weights, and counts
//!
//! Units are string tags ("gal", "mL", "lb", "each"); their meaning comes
//! entirely from the conversion table below. Conversion between two units of
//! the same family multiplies by the ratio of their base factors. Unknown
//! units and cross-family pairs (e.g. gallons to pounds) fall back to a 1:1
//! ratio: historical records carry free-form unit strings, and a no-op beats
//! a crash or a silently wrong physical conversion. The fallback is a known
//! precision risk, not a bug.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimension family a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    Volume,
    Weight,
    Count,
}

/// Known units with their family and base factor.
///
/// Base units: millilitres for volume, grams for weight, 1 for count.
/// Factors are the exact legal definitions (1 US gal = 3.785411784 L,
/// 1 lb = 453.59237 g).
const CONVERSIONS: &[(&str, UnitFamily, f64)] = &[
    // Volume
    ("fl oz", UnitFamily::Volume, 29.5735295625),
    ("cup", UnitFamily::Volume, 236.5882365),
    ("gal", UnitFamily::Volume, 3785.411784),
    ("ml", UnitFamily::Volume, 1.0),
    ("l", UnitFamily::Volume, 1000.0),
    // Weight
    ("oz", UnitFamily::Weight, 28.349523125),
    ("lb", UnitFamily::Weight, 453.59237),
    ("g", UnitFamily::Weight, 1.0),
    ("kg", UnitFamily::Weight, 1000.0),
    // Count (all mutually 1:1)
    ("each", UnitFamily::Count, 1.0),
    ("count", UnitFamily::Count, 1.0),
    ("bottle", UnitFamily::Count, 1.0),
];

/// A measurement unit tag
///
/// Carries the original string verbatim; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(String);

impl Unit {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the raw unit string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the tag is empty/unset
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the family and base factor for a known unit
    fn lookup(&self) -> Option<(UnitFamily, f64)> {
        let normalized = self.0.trim().to_lowercase();
        CONVERSIONS
            .iter()
            .find(|(tag, _, _)| *tag == normalized)
            .map(|(_, family, factor)| (*family, *factor))
    }

    /// Returns the dimension family, or None for unknown units
    pub fn family(&self) -> Option<UnitFamily> {
        self.lookup().map(|(family, _)| family)
    }

    /// Returns true if the unit appears in the conversion table
    pub fn is_known(&self) -> bool {
        self.lookup().is_some()
    }

    /// Returns all known unit tags
    pub fn known_tags() -> impl Iterator<Item = &'static str> {
        CONVERSIONS.iter().map(|(tag, _, _)| *tag)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Unit {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for Unit {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

/// Returns the multiplier converting an amount in `from` into `to`:
/// `amount_in_to = amount_in_from * ratio(from, to)`.
///
/// Identity (1.0) when the units match, when either unit is unknown, and
/// when the units belong to different families.
pub fn ratio(from: &Unit, to: &Unit) -> f64 {
    if from.0.trim().eq_ignore_ascii_case(to.0.trim()) {
        return 1.0;
    }

    match (from.lookup(), to.lookup()) {
        (Some((from_family, from_factor)), Some((to_family, to_factor)))
            if from_family == to_family =>
        {
            from_factor / to_factor
        }
        _ => 1.0,
    }
}

/// Converts an amount from one unit into another
pub fn convert(amount: f64, from: &Unit, to: &Unit) -> f64 {
    amount * ratio(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn same_unit_is_identity() {
        assert_eq!(ratio(&Unit::from("gal"), &Unit::from("gal")), 1.0);
        assert_eq!(ratio(&Unit::from("mL"), &Unit::from("mL")), 1.0);
    }

    #[test]
    fn empty_units_are_identity() {
        assert_eq!(ratio(&Unit::from(""), &Unit::from("")), 1.0);
    }

    #[test]
    fn unknown_unit_falls_back_to_identity() {
        assert_eq!(ratio(&Unit::from("unknown-unit"), &Unit::from("gal")), 1.0);
        assert_eq!(ratio(&Unit::from("gal"), &Unit::from("hogshead")), 1.0);
    }

    #[test]
    fn cross_family_falls_back_to_identity() {
        // No physical conversion is implied by the unit strings alone
        assert_eq!(ratio(&Unit::from("gal"), &Unit::from("lb")), 1.0);
        assert_eq!(ratio(&Unit::from("kg"), &Unit::from("L")), 1.0);
        assert_eq!(ratio(&Unit::from("each"), &Unit::from("mL")), 1.0);
    }

    #[test]
    fn volume_conversions() {
        assert!(close(ratio(&Unit::from("L"), &Unit::from("mL")), 1000.0));
        assert!(close(ratio(&Unit::from("gal"), &Unit::from("L")), 3.785411784));
        assert!(close(ratio(&Unit::from("cup"), &Unit::from("fl oz")), 8.0));
        assert!(close(ratio(&Unit::from("gal"), &Unit::from("fl oz")), 128.0));
    }

    #[test]
    fn weight_conversions() {
        assert!(close(ratio(&Unit::from("kg"), &Unit::from("g")), 1000.0));
        assert!(close(ratio(&Unit::from("lb"), &Unit::from("oz")), 16.0));
        assert!(close(ratio(&Unit::from("lb"), &Unit::from("g")), 453.59237));
    }

    #[test]
    fn count_units_are_mutually_one_to_one() {
        assert_eq!(ratio(&Unit::from("each"), &Unit::from("count")), 1.0);
        assert_eq!(ratio(&Unit::from("bottle"), &Unit::from("each")), 1.0);
    }

    #[test]
    fn conversions_invert() {
        let forward = ratio(&Unit::from("gal"), &Unit::from("mL"));
        let back = ratio(&Unit::from("mL"), &Unit::from("gal"));
        assert!(close(forward * back, 1.0));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(close(ratio(&Unit::from("GAL"), &Unit::from("l")), 3.785411784));
        assert!(close(ratio(&Unit::from("Ml"), &Unit::from("L")), 0.001));
    }

    #[test]
    fn convert_applies_ratio() {
        assert!(close(convert(2.0, &Unit::from("L"), &Unit::from("mL")), 2000.0));
        assert!(close(convert(53.0, &Unit::from("gal"), &Unit::from("gal")), 53.0));
    }

    #[test]
    fn family_classification() {
        assert_eq!(Unit::from("gal").family(), Some(UnitFamily::Volume));
        assert_eq!(Unit::from("lb").family(), Some(UnitFamily::Weight));
        assert_eq!(Unit::from("bottle").family(), Some(UnitFamily::Count));
        assert_eq!(Unit::from("parsec").family(), None);
    }

    #[test]
    fn serde_is_transparent_string() {
        let unit = Unit::from("gal");
        let json = serde_json::to_string(&unit).unwrap();
        assert_eq!(json, "\"gal\"");

        let parsed: Unit = serde_json::from_str("\"mL\"").unwrap();
        assert_eq!(parsed.as_str(), "mL");
    }

    #[test]
    fn construction_paths_agree() {
        assert_eq!(Unit::new("gal"), Unit::from("gal"));
        assert_eq!(Unit::new(String::from("mL")), Unit::from("mL"));
        assert_eq!(Unit::new("gal").as_str(), "gal");
    }

    #[test]
    fn known_tags_cover_the_table() {
        let tags: Vec<_> = Unit::known_tags().collect();
        assert_eq!(tags.len(), 12);
        assert!(tags.contains(&"gal"));
        assert!(tags.contains(&"kg"));
        assert!(tags.contains(&"bottle"));
    }
}
