//! Value-federate input layer for co-simulation runtimes.
//!
//! This crate sits between a co-simulation federate core (wire transport,
//! time-barrier negotiation, message routing — all out of scope here, see
//! [`federate_core`]) and the federate's own code: it gives typed,
//! unit-aware, change-detected access to whatever a federate's inputs are
//! bound to, and dispatches callbacks when a new value is observed.
//!
//! A typical federate wires this crate up as:
//!
//! 1. implement [`FederateCore`](federate_core::FederateCore) over its real
//!    core (or use [`testing::MockFederateCore`] in tests), wrapped in an
//!    `Rc`;
//! 2. build an [`InputRegistry`](registry::InputRegistry) from that `Rc` and
//!    call [`create_input`](registry::InputRegistry::create_input) once per
//!    subscription;
//! 3. call [`InputRegistry::scan`](registry::InputRegistry::scan) once per
//!    time advance.

pub mod change;
pub mod codec;
pub mod custom;
pub mod error;
pub mod federate_core;
pub mod input;
pub mod registry;
pub mod testing;
pub mod time;
pub mod units;
pub mod value;

pub use custom::{CustomTypeCodec, CustomValue};
pub use error::{HelicsError, Result};
pub use federate_core::{FederateCore, InputHandle, OptionCode, OptionValue};
pub use input::{Input, MultiInputPolicy, NotificationCallback, TargetType, TypedCallback};
pub use registry::InputRegistry;
pub use time::SimTime;
pub use value::{Complex, NamedPoint, PrimaryType, Value};
