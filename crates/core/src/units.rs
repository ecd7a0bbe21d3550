//! The unit bridge (§4.3): parses unit names and converts a scalar or
//! integer between two commensurable units via a linear map `y = a*x + b`.
//!
//! A real HELICS deployment delegates this to a UDUNITS-derived unit
//! library (explicitly out of scope here — see Non-goals). This module
//! only needs to be *a* correct source of commensurable units to exercise
//! §4.3 and the round-trip property in §8; its unit tables are grounded in
//! the teacher pack's per-category unit parsers (`formats/units/length.rs`,
//! `weight.rs`, `angle.rs`, `temperature.rs`), condensed into one registry
//! instead of one file per category.

use crate::error::HelicsError;

/// A family of mutually commensurable units. Cross-category conversion is
/// always a configuration error, regardless of scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Length,
    Mass,
    Time,
    Angle,
    Temperature,
}

/// A unit resolved from a name: its category and the affine map to that
/// category's base unit (`to_base(x) = scale * x + offset`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub category: UnitCategory,
    scale: f64,
    offset: f64,
}

impl Unit {
    fn to_base(&self, x: f64) -> f64 {
        self.scale * x + self.offset
    }

    fn from_base(&self, y: f64) -> f64 {
        (y - self.offset) / self.scale
    }
}

/// `(aliases, category, scale to base, offset to base)`.
const UNIT_TABLE: &[(&[&str], UnitCategory, f64, f64)] = &[
    (&["m", "meter", "meters", "metre", "metres"], UnitCategory::Length, 1.0, 0.0),
    (&["km", "kilometer", "kilometers"], UnitCategory::Length, 1000.0, 0.0),
    (&["cm", "centimeter", "centimeters"], UnitCategory::Length, 0.01, 0.0),
    (&["mm", "millimeter", "millimeters"], UnitCategory::Length, 0.001, 0.0),
    (&["mi", "mile", "miles"], UnitCategory::Length, 1609.344, 0.0),
    (&["ft", "foot", "feet"], UnitCategory::Length, 0.3048, 0.0),
    (&["in", "inch", "inches"], UnitCategory::Length, 0.0254, 0.0),
    (&["g", "gram", "grams"], UnitCategory::Mass, 1.0, 0.0),
    (&["kg", "kilogram", "kilograms"], UnitCategory::Mass, 1000.0, 0.0),
    (&["mg", "milligram", "milligrams"], UnitCategory::Mass, 0.001, 0.0),
    (&["lb", "pound", "pounds"], UnitCategory::Mass, 453.59237, 0.0),
    (&["oz", "ounce", "ounces"], UnitCategory::Mass, 28.349523125, 0.0),
    (&["s", "sec", "second", "seconds"], UnitCategory::Time, 1.0, 0.0),
    (&["ms", "millisecond", "milliseconds"], UnitCategory::Time, 0.001, 0.0),
    (&["min", "minute", "minutes"], UnitCategory::Time, 60.0, 0.0),
    (&["h", "hr", "hour", "hours"], UnitCategory::Time, 3600.0, 0.0),
    (&["deg", "degree", "degrees"], UnitCategory::Angle, 1.0, 0.0),
    (
        &["rad", "radian", "radians"],
        UnitCategory::Angle,
        180.0 / std::f64::consts::PI,
        0.0,
    ),
    (&["k", "kelvin"], UnitCategory::Temperature, 1.0, 0.0),
    (&["c", "celsius"], UnitCategory::Temperature, 1.0, 273.15),
    (
        &["f", "fahrenheit"],
        UnitCategory::Temperature,
        5.0 / 9.0,
        273.15 - 32.0 * 5.0 / 9.0,
    ),
];

/// Parse a unit name (case-insensitive). Returns `None` for an unrecognised
/// name.
pub fn parse(name: &str) -> Option<Unit> {
    let lower = name.trim().to_ascii_lowercase();
    UNIT_TABLE
        .iter()
        .find(|(aliases, ..)| aliases.iter().any(|a| *a == lower))
        .map(|(_, category, scale, offset)| Unit {
            category: *category,
            scale: *scale,
            offset: *offset,
        })
}

/// Resolve the optional input/output unit pair declared on an input,
/// validating commensurability per the invariant in §3: both absent, or
/// commensurable.
pub fn resolve_pair(
    input_name: &str,
    input_units: Option<&str>,
    output_units: Option<&str>,
) -> crate::error::Result<Option<(Unit, Unit)>> {
    match (input_units, output_units) {
        (None, None) => Ok(None),
        (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => Ok(None),
        (Some(a), Some(b)) => {
            let from = parse(a).ok_or_else(|| HelicsError::Configuration {
                input: input_name.to_string(),
                reason: format!("unrecognised input unit '{a}'"),
            })?;
            let to = parse(b).ok_or_else(|| HelicsError::Configuration {
                input: input_name.to_string(),
                reason: format!("unrecognised output unit '{b}'"),
            })?;
            if from.category != to.category {
                return Err(HelicsError::Configuration {
                    input: input_name.to_string(),
                    reason: format!("units '{a}' and '{b}' are not commensurable"),
                });
            }
            Ok(Some((from, to)))
        }
        (Some(a), None) | (None, Some(a)) => Err(HelicsError::Configuration {
            input: input_name.to_string(),
            reason: format!("unit '{a}' has no commensurable counterpart"),
        }),
    }
}

/// Apply the linear map from `from` to `to` to a single scalar.
pub fn bridge_f64(pair: Option<(Unit, Unit)>, x: f64) -> f64 {
    match pair {
        None => x,
        Some((from, to)) => to.from_base(from.to_base(x)),
    }
}

/// Apply the linear map element-wise to a vector.
pub fn bridge_vector(pair: Option<(Unit, Unit)>, xs: &[f64]) -> Vec<f64> {
    xs.iter().map(|x| bridge_f64(pair, *x)).collect()
}

/// Apply the linear map to an integer value: converted via double and
/// rounded half-to-even when stored back. Returns the saturated result
/// together with the pre-saturation double, so callers can detect and
/// optionally report an out-of-range conversion (§7).
pub fn bridge_i64_checked(pair: Option<(Unit, Unit)>, x: i64) -> (i64, f64) {
    let converted = bridge_f64(pair, x as f64);
    let rounded = round_half_to_even(converted);
    (saturate_rounded_to_i64(rounded), rounded)
}

/// Apply the linear map to an integer value, discarding saturation info.
pub fn bridge_i64(pair: Option<(Unit, Unit)>, x: i64) -> i64 {
    bridge_i64_checked(pair, x).0
}

fn saturate_rounded_to_i64(rounded: f64) -> i64 {
    if rounded.is_nan() {
        0
    } else if rounded >= i64::MAX as f64 {
        i64::MAX
    } else if rounded <= i64::MIN as f64 {
        i64::MIN
    } else {
        rounded as i64
    }
}

fn round_half_to_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_conversion_meters_to_kilometers() {
        let pair = resolve_pair("in1", Some("m"), Some("km")).unwrap();
        assert_eq!(bridge_f64(pair, 1500.0), 1.5);
    }

    #[test]
    fn identity_when_both_units_absent() {
        let pair = resolve_pair("in1", None, None).unwrap();
        assert_eq!(bridge_f64(pair, 42.0), 42.0);
    }

    #[test]
    fn identity_when_units_equal() {
        let pair = resolve_pair("in1", Some("m"), Some("m")).unwrap();
        assert_eq!(bridge_f64(pair, 42.0), 42.0);
    }

    #[test]
    fn non_commensurable_units_are_a_configuration_error() {
        let err = resolve_pair("in1", Some("m"), Some("kg")).unwrap_err();
        assert!(matches!(err, HelicsError::Configuration { .. }));
    }

    #[test]
    fn lone_unit_without_counterpart_is_an_error() {
        let err = resolve_pair("in1", Some("m"), None).unwrap_err();
        assert!(matches!(err, HelicsError::Configuration { .. }));
    }

    #[test]
    fn temperature_is_affine() {
        let pair = resolve_pair("in1", Some("c"), Some("f")).unwrap();
        let f = bridge_f64(pair, 0.0);
        assert!((f - 32.0).abs() < 1e-9);
        let f2 = bridge_f64(pair, 100.0);
        assert!((f2 - 212.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_within_one_ulp_scale() {
        let forward = resolve_pair("in1", Some("mi"), Some("km")).unwrap();
        let backward = resolve_pair("in1", Some("km"), Some("mi")).unwrap();
        let x = 3.14159;
        let there = bridge_f64(forward, x);
        let back = bridge_f64(backward, there);
        assert!((back - x).abs() < 1e-9);
    }

    #[test]
    fn integer_conversion_rounds_half_to_even() {
        assert_eq!(round_half_to_even(2.5), 2.0);
        assert_eq!(round_half_to_even(3.5), 4.0);
        assert_eq!(round_half_to_even(2.4), 2.0);
    }

    #[test]
    fn integer_bridge_reports_saturation_via_checked_variant() {
        let (saturated, rounded) = bridge_i64_checked(None, i64::MAX);
        assert_eq!(saturated, i64::MAX);
        assert_eq!(rounded, i64::MAX as f64);
    }

    #[test]
    fn vector_bridge_is_elementwise() {
        let pair = resolve_pair("in1", Some("m"), Some("km")).unwrap();
        assert_eq!(bridge_vector(pair, &[1000.0, 2000.0]), vec![1.0, 2.0]);
    }
}
