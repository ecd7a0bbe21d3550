//! An in-memory [`FederateCore`] implementation for exercising the input
//! layer without a real HELICS core attached. Used by this crate's own
//! tests and exported for downstream crates (e.g. the demo binary) to use
//! in their own test suites.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::codec;
use crate::federate_core::{FederateCore, InputHandle, OptionCode, OptionValue};
use crate::time::SimTime;
use crate::value::Value;

#[derive(Default)]
struct HandleState {
    raw: Vec<Vec<u8>>,
    injection_type: Option<String>,
    injection_units: Option<String>,
    extraction_type: Option<String>,
    extraction_units: Option<String>,
    targets: Vec<String>,
    options: HashMap<OptionCode, OptionValue>,
    last_update_time: SimTime,
    closed: bool,
}

/// A scriptable, in-process stand-in for the federate core, for tests and
/// demos. Not thread-safe — matches the single-threaded cooperative model
/// this layer assumes (§5).
#[derive(Default)]
pub struct MockFederateCore {
    handles: RefCell<HashMap<InputHandle, HandleState>>,
}

impl MockFederateCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a handle's injection type/units ahead of any publication,
    /// mirroring a publication that is already connected at startup.
    pub fn declare_injection(&self, handle: InputHandle, type_name: &str, units: Option<&str>) {
        let mut handles = self.handles.borrow_mut();
        let state = handles.entry(handle).or_default();
        state.injection_type = Some(type_name.to_string());
        state.injection_units = units.map(str::to_string);
    }

    /// Delivers one raw publication to a handle, as if a publisher had just
    /// sent a new value. Multiple calls before the next [`scan`] accumulate,
    /// modeling a multi-input target set.
    ///
    /// [`scan`]: crate::registry::InputRegistry::scan
    pub fn publish(&self, handle: InputHandle, value: &Value) {
        let mut handles = self.handles.borrow_mut();
        let state = handles.entry(handle).or_default();
        state.raw.push(codec::encode(value));
    }

    pub fn advance_time(&self, handle: InputHandle, time: SimTime) {
        let mut handles = self.handles.borrow_mut();
        handles.entry(handle).or_default().last_update_time = time;
    }
}

impl FederateCore for MockFederateCore {
    fn pending_updates(&self) -> Vec<InputHandle> {
        self.handles
            .borrow()
            .iter()
            .filter(|(_, state)| !state.raw.is_empty())
            .map(|(handle, _)| *handle)
            .collect()
    }

    fn get_raw(&self, handle: InputHandle) -> Vec<Vec<u8>> {
        self.handles
            .borrow_mut()
            .get_mut(&handle)
            .map(|state| std::mem::take(&mut state.raw))
            .unwrap_or_default()
    }

    fn is_updated(&self, handle: InputHandle) -> bool {
        self.handles
            .borrow()
            .get(&handle)
            .map(|state| !state.raw.is_empty())
            .unwrap_or(false)
    }

    fn get_injection_type(&self, handle: InputHandle) -> Option<String> {
        self.handles.borrow().get(&handle)?.injection_type.clone()
    }

    fn get_injection_units(&self, handle: InputHandle) -> Option<String> {
        self.handles.borrow().get(&handle)?.injection_units.clone()
    }

    fn get_extraction_type(&self, handle: InputHandle) -> Option<String> {
        self.handles.borrow().get(&handle)?.extraction_type.clone()
    }

    fn get_extraction_units(&self, handle: InputHandle) -> Option<String> {
        self.handles
            .borrow()
            .get(&handle)?
            .extraction_units
            .clone()
    }

    fn get_last_update_time(&self, handle: InputHandle) -> SimTime {
        self.handles
            .borrow()
            .get(&handle)
            .map(|state| state.last_update_time)
            .unwrap_or(SimTime::ZERO)
    }

    fn add_target(&self, handle: InputHandle, name: &str) {
        self.handles
            .borrow_mut()
            .entry(handle)
            .or_default()
            .targets
            .push(name.to_string());
    }

    fn remove_target(&self, handle: InputHandle, name: &str) {
        if let Some(state) = self.handles.borrow_mut().get_mut(&handle) {
            state.targets.retain(|t| t != name);
        }
    }

    fn set_option(&self, handle: InputHandle, code: OptionCode, value: OptionValue) {
        self.handles
            .borrow_mut()
            .entry(handle)
            .or_default()
            .options
            .insert(code, value);
    }

    fn get_option(&self, handle: InputHandle, code: OptionCode) -> Option<OptionValue> {
        self.handles.borrow().get(&handle)?.options.get(&code).copied()
    }

    fn set_default_raw(&self, _handle: InputHandle, _bytes: Vec<u8>) {}

    fn close_interface(&self, handle: InputHandle) {
        self.handles.borrow_mut().entry(handle).or_default().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TargetType;
    use crate::registry::InputRegistry;
    use crate::value::PrimaryType;
    use std::rc::Rc;

    #[test]
    fn mock_core_delivers_a_published_value_through_a_scan() {
        let core = Rc::new(MockFederateCore::new());
        core.declare_injection(1, "double", None);
        let mut registry = InputRegistry::new(core.clone());
        registry.create_input(
            1,
            "in1",
            TargetType::Primary(PrimaryType::Double),
            Value::Double(0.0),
        );

        core.publish(1, &Value::Double(7.0));
        let updated = registry.scan(SimTime::from_seconds(1.0));
        assert_eq!(updated, vec!["in1".to_string()]);
        assert_eq!(registry.value_of("in1"), Some(Value::Double(7.0)));
    }

    #[test]
    fn close_interface_marks_handle_closed() {
        let core = MockFederateCore::new();
        core.close_interface(1);
        assert!(core.handles.borrow().get(&1).unwrap().closed);
    }
}
