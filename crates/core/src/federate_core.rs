//! The `FederateCore` collaborator (§6): everything this layer consumes
//! from the underlying federate core. The wire transport, time-barrier
//! algorithm, and message routing behind this trait are all non-goals —
//! this crate only defines and consumes the interface.

use crate::time::SimTime;

/// An opaque, stable identifier assigned by the federate core. Never
/// constructed by this layer — only handed back.
pub type InputHandle = u64;

/// A small non-negative integer identifying an opaque option. This layer
/// is agnostic to the meaning of any code beyond "forward to the core";
/// the constants below document well-known codes without restricting the
/// type to them.
pub type OptionCode = i32;

pub const ONLY_UPDATE_ON_CHANGE: OptionCode = 1;
pub const CONNECTION_REQUIRED: OptionCode = 2;
pub const CONNECTION_OPTIONAL: OptionCode = 3;
pub const SINGLE_CONNECTION_ONLY: OptionCode = 4;
pub const MULTIPLE_CONNECTIONS_ALLOWED: OptionCode = 5;
pub const BUFFER_DATA: OptionCode = 6;
/// When set (as an [`OptionValue::Flag(true)`]), integer saturation during
/// unit conversion (§7) is recorded as an [`ArithmeticDomain`] error instead
/// of passing silently.
///
/// [`ArithmeticDomain`]: crate::error::HelicsError::ArithmeticDomain
pub const REPORT_ARITHMETIC_DOMAIN_ERRORS: OptionCode = 7;

/// The value half of an opaque `set-option`/`get-option` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue {
    Int(i64),
    Flag(bool),
}

/// Everything the value-federate input layer needs from the federate core.
///
/// Implementations are expected to be cheap to clone (a handle into shared
/// state) since the registry and every input it owns hold one. The
/// contract is synchronous: by the time a `FederateCore` method returns,
/// any concurrency the implementation performs internally is already
/// resolved for the purposes of this call (§5).
pub trait FederateCore {
    /// Handles whose raw buffer was replaced since the last time-advance
    /// return. Drives step 1 of the registry scan (§4.6).
    fn pending_updates(&self) -> Vec<InputHandle>;

    /// All raw buffers delivered to this handle since the last scan, in
    /// the order their publications were registered as targets. An input
    /// bound to several publications (§4.5, multi-input) may see more than
    /// one buffer in a single cycle; an empty vector means nothing arrived.
    fn get_raw(&self, handle: InputHandle) -> Vec<Vec<u8>>;

    fn is_updated(&self, handle: InputHandle) -> bool;

    fn get_injection_type(&self, handle: InputHandle) -> Option<String>;
    fn get_injection_units(&self, handle: InputHandle) -> Option<String>;
    fn get_extraction_type(&self, handle: InputHandle) -> Option<String>;
    fn get_extraction_units(&self, handle: InputHandle) -> Option<String>;

    fn get_last_update_time(&self, handle: InputHandle) -> SimTime;

    fn add_target(&self, handle: InputHandle, name: &str);
    fn remove_target(&self, handle: InputHandle, name: &str);

    fn set_option(&self, handle: InputHandle, code: OptionCode, value: OptionValue);
    fn get_option(&self, handle: InputHandle, code: OptionCode) -> Option<OptionValue>;

    fn set_default_raw(&self, handle: InputHandle, bytes: Vec<u8>);

    /// Registers a push-style notification hook on the core. This layer's
    /// registry drives the scan itself by polling [`pending_updates`], so
    /// the default implementation is a no-op; a core that prefers to push
    /// wakeups may override it.
    ///
    /// [`pending_updates`]: FederateCore::pending_updates
    fn set_input_notification(&self, _handle: InputHandle) {}

    fn close_interface(&self, handle: InputHandle);
}
