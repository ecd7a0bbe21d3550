//! Error types for the value-federate input layer.

use crate::value::PrimaryType;

/// Errors raised by this layer.
///
/// Configuration and lifecycle errors are raised synchronously at the
/// offending call and leave no partial effect. Decode errors are recorded
/// per-input during a registry scan and surfaced at the next read; they
/// never abort the scan for other inputs.
#[derive(Debug, thiserror::Error)]
pub enum HelicsError {
    /// Declared target type is not recognised, units are not commensurable,
    /// or a callback signature doesn't match the input's declared type.
    #[error("configuration error on input {input}: {reason}")]
    Configuration { input: String, reason: String },

    /// Attempt to mutate input shape after initialization, or set a default
    /// after execution has begun.
    #[error("lifecycle error on input {input}: {reason}")]
    Lifecycle { input: String, reason: String },

    /// A raw buffer did not decode under its claimed injection type.
    #[error("decode error on input {input}: {bytes_len} bytes did not decode as {claimed_type}")]
    Decode {
        input: String,
        claimed_type: PrimaryType,
        bytes_len: usize,
    },

    /// Integer saturation occurred during unit conversion, and the
    /// reporting option was enabled for this input.
    #[error("arithmetic domain error on input {input}: {value} saturated to {saturated}")]
    ArithmeticDomain {
        input: String,
        value: f64,
        saturated: i64,
    },
}

pub type Result<T> = std::result::Result<T, HelicsError>;
