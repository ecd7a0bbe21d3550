//! The change detector (§4.4): decides whether a newly decoded value
//! differs "enough" from the one currently stored on an input.

use crate::value::Value;

/// Evaluate the change-detection rule for an already-converted candidate
/// value against the previously stored value, given a non-negative delta.
///
/// Callers are responsible for the "change detection disabled" case (every
/// publication is observable) — this function always assumes detection is
/// enabled, i.e. `delta >= 0`.
pub fn changed(previous: &Value, candidate: &Value, delta: f64) -> bool {
    debug_assert!(delta >= 0.0, "change detector delta must be non-negative");

    if previous.primary_type() != candidate.primary_type() {
        return true;
    }

    match candidate {
        Value::String(_) | Value::NamedPoint(_) | Value::Boolean(_) => previous != candidate,
        Value::Double(_) | Value::Int(_) | Value::Time(_) | Value::Complex(_)
        | Value::Vector(_) | Value::ComplexVector(_) => {
            previous.l_inf_distance(candidate) > delta
        }
    }
}
