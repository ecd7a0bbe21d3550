//! Custom (non-primary) type support (§9).
//!
//! Custom types never pass through the tagged [`Value`](crate::value::Value)
//! container — the raw buffer is handed to a user-supplied codec and
//! stored opaquely. Change detection is disabled for custom types unless
//! the caller supplies a comparator. [`crate::input::Input`] attaches a
//! codec via `set_custom_codec` and routes any `TargetType::Custom` input
//! through an opaque-bytes ingest path instead of [`crate::codec`].
//!
//! Modeled as a small, object-safe, id-addressed trait, grounded in the
//! teacher pack's `Format` trait (`format.rs`): one object per type,
//! registered by id, looked up by name rather than downcast.

/// A user-supplied codec for one non-primary type.
pub trait CustomTypeCodec {
    /// The type name this codec handles (matched case-insensitively against
    /// an input's declared target type).
    fn type_name(&self) -> &str;

    /// Opaque equality check for change detection. `None` means this codec
    /// offers no comparator, so change detection stays disabled for this
    /// type regardless of the input's configured delta.
    fn equals(&self, _a: &[u8], _b: &[u8]) -> Option<bool> {
        None
    }
}

/// The stored state for a custom-typed input: the raw bytes as handed back
/// by the codec's owner, opaque to this layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomValue {
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoCodec;
    impl CustomTypeCodec for EchoCodec {
        fn type_name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn codec_without_comparator_disables_change_detection() {
        let codec = EchoCodec;
        assert_eq!(codec.equals(&[1], &[2]), None);
    }
}
