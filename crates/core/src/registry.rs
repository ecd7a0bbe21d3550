//! The Input registry (§4.6): owns every [`Input`] belonging to one
//! federate and drives the per-cycle scan-and-dispatch sequence the
//! registry's owner calls once per time advance.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::federate_core::{FederateCore, InputHandle};
use crate::input::{Input, TargetType};
use crate::time::SimTime;
use crate::value::Value;

/// Owns every input registered by one federate, indexed by handle and by
/// display name, and drives the scan described in §4.6.
///
/// Holds the one `Rc<dyn FederateCore>` shared by every `Input` it creates
/// (§9) — the registry is the sole owner of the federate-core handle; each
/// `Input` only ever holds a clone of it.
pub struct InputRegistry {
    core: Rc<dyn FederateCore>,
    inputs: HashMap<InputHandle, Input>,
    by_name: HashMap<String, InputHandle>,
}

impl InputRegistry {
    pub fn new(core: Rc<dyn FederateCore>) -> Self {
        Self {
            core,
            inputs: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn core(&self) -> &Rc<dyn FederateCore> {
        &self.core
    }

    /// Creates an input wired to this registry's federate core and
    /// registers it, returning a mutable reference for further
    /// configuration. Panics if the handle or display name is already
    /// registered — both are expected to be unique per federate.
    pub fn create_input(
        &mut self,
        handle: InputHandle,
        display_name: impl Into<String>,
        target: TargetType,
        default: Value,
    ) -> &mut Input {
        let input = Input::new(self.core.clone(), handle, display_name, target, default);
        self.insert(input);
        self.inputs
            .get_mut(&handle)
            .expect("just inserted this handle")
    }

    /// Registers an input already wired to this registry's core (or one
    /// built via [`create_input`](Self::create_input) elsewhere).
    pub fn insert(&mut self, input: Input) {
        let handle = input.handle();
        let name = input.display_name().to_string();
        assert!(
            !self.inputs.contains_key(&handle),
            "input handle {handle} registered twice"
        );
        assert!(
            !self.by_name.contains_key(&name),
            "input display name '{name}' registered twice"
        );
        self.by_name.insert(name, handle);
        self.inputs.insert(handle, input);
    }

    pub fn get(&self, handle: InputHandle) -> Option<&Input> {
        self.inputs.get(&handle)
    }

    pub fn get_mut(&mut self, handle: InputHandle) -> Option<&mut Input> {
        self.inputs.get_mut(&handle)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Input> {
        self.by_name.get(name).and_then(|h| self.inputs.get(h))
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Input> {
        let handle = *self.by_name.get(name)?;
        self.inputs.get_mut(&handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = InputHandle> + '_ {
        self.inputs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Runs one full scan-and-dispatch cycle (§4.6):
    ///
    /// 1. Ask the core which handles have a pending update.
    /// 2. For each, ingest its raw buffers (decoding, unit-bridging and
    ///    change detection happen inside [`Input::check_update`]).
    /// 3. Dispatch callbacks only for handles whose update was observable
    ///    *this cycle*, in registration order — a notification callback
    ///    always fires after any typed callback for the same input in the
    ///    same cycle. An input with no publication this cycle, or whose
    ///    candidate value didn't clear change detection, is not dispatched
    ///    even though its `has_update` flag may still be set from an
    ///    earlier cycle the caller hasn't consumed via `clear_update` yet.
    ///
    /// Returns the display names of inputs whose stored value changed.
    /// A decode or configuration error on one input is recorded on that
    /// input (via [`Input::take_last_error`]) and logged; the scan
    /// continues for every other input (§7).
    pub fn scan(&mut self, time: SimTime) -> Vec<String> {
        let pending = self.core.pending_updates();
        let mut updated_names = Vec::new();
        let mut dirty: Vec<InputHandle> = Vec::new();

        for handle in &pending {
            let Some(input) = self.inputs.get_mut(handle) else {
                warn!(handle, "pending update for an unregistered input handle");
                continue;
            };
            let did_update = input.check_update(true);
            if let Some(err) = input.take_last_error() {
                warn!(input = input.display_name(), %err, "input scan error");
            }
            if did_update {
                debug!(input = input.display_name(), "input updated");
                updated_names.push(input.display_name().to_string());
                dirty.push(*handle);
            }
        }

        dirty.sort_unstable();
        for handle in dirty {
            if let Some(input) = self.inputs.get_mut(&handle) {
                input.dispatch(time);
            }
        }

        updated_names
    }

    /// Reads the current stored value of an input by display name without
    /// running a scan, for callers that poll rather than subscribe.
    pub fn value_of(&self, name: &str) -> Option<Value> {
        self.get_by_name(name).map(Input::get_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federate_core::{OptionCode, OptionValue};
    use crate::input::TargetType;
    use crate::value::PrimaryType;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap as Map;

    #[derive(Default)]
    struct StubCore {
        raw: RefCell<Map<InputHandle, Vec<Vec<u8>>>>,
        injection_type: RefCell<Map<InputHandle, String>>,
    }

    impl StubCore {
        fn publish(&self, handle: InputHandle, value: &Value) {
            self.raw
                .borrow_mut()
                .entry(handle)
                .or_default()
                .push(crate::codec::encode(value));
        }
    }

    impl FederateCore for StubCore {
        fn pending_updates(&self) -> Vec<InputHandle> {
            self.raw
                .borrow()
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(h, _)| *h)
                .collect()
        }
        fn get_raw(&self, handle: InputHandle) -> Vec<Vec<u8>> {
            self.raw.borrow_mut().remove(&handle).unwrap_or_default()
        }
        fn is_updated(&self, handle: InputHandle) -> bool {
            self.raw
                .borrow()
                .get(&handle)
                .map(|v| !v.is_empty())
                .unwrap_or(false)
        }
        fn get_injection_type(&self, handle: InputHandle) -> Option<String> {
            self.injection_type.borrow().get(&handle).cloned()
        }
        fn get_injection_units(&self, _handle: InputHandle) -> Option<String> {
            None
        }
        fn get_extraction_type(&self, _handle: InputHandle) -> Option<String> {
            None
        }
        fn get_extraction_units(&self, _handle: InputHandle) -> Option<String> {
            None
        }
        fn get_last_update_time(&self, _handle: InputHandle) -> SimTime {
            SimTime::ZERO
        }
        fn add_target(&self, _handle: InputHandle, _name: &str) {}
        fn remove_target(&self, _handle: InputHandle, _name: &str) {}
        fn set_option(&self, _handle: InputHandle, _code: OptionCode, _value: OptionValue) {}
        fn get_option(&self, _handle: InputHandle, _code: OptionCode) -> Option<OptionValue> {
            None
        }
        fn set_default_raw(&self, _handle: InputHandle, _bytes: Vec<u8>) {}
        fn close_interface(&self, _handle: InputHandle) {}
    }

    #[test]
    fn scan_collects_updated_names_and_dispatches() {
        let core = Rc::new(StubCore::default());
        core.injection_type.borrow_mut().insert(1, "double".into());
        core.injection_type.borrow_mut().insert(2, "double".into());

        let mut registry = InputRegistry::new(core.clone());
        registry.create_input(1, "in1", TargetType::Primary(PrimaryType::Double), Value::Double(0.0));
        registry.create_input(2, "in2", TargetType::Primary(PrimaryType::Double), Value::Double(0.0));

        core.publish(1, &Value::Double(1.0));
        let updated = registry.scan(SimTime::from_seconds(1.0));
        assert_eq!(updated, vec!["in1".to_string()]);
        assert_eq!(registry.value_of("in1"), Some(Value::Double(1.0)));
        assert_eq!(registry.value_of("in2"), Some(Value::Double(0.0)));
    }

    #[test]
    fn scan_continues_past_an_unregistered_handle() {
        let core = Rc::new(StubCore::default());
        core.injection_type.borrow_mut().insert(1, "double".into());
        let mut registry = InputRegistry::new(core.clone());
        registry.create_input(1, "in1", TargetType::Primary(PrimaryType::Double), Value::Double(0.0));

        core.publish(1, &Value::Double(2.0));
        core.publish(99, &Value::Double(5.0));
        let updated = registry.scan(SimTime::ZERO);
        assert_eq!(updated, vec!["in1".to_string()]);
    }

    #[test]
    fn typed_callback_fires_before_notification_callback() {
        use std::rc::Rc as StdRc;
        let core = Rc::new(StubCore::default());
        core.injection_type.borrow_mut().insert(1, "double".into());
        let mut registry = InputRegistry::new(core.clone());
        let input = registry.create_input(
            1,
            "in1",
            TargetType::Primary(PrimaryType::Double),
            Value::Double(0.0),
        );

        let order: StdRc<RefCell<Vec<&'static str>>> = StdRc::new(RefCell::new(Vec::new()));
        let o1 = order.clone();
        input
            .set_callback(crate::input::TypedCallback::Double(Box::new(move |_, _| {
                o1.borrow_mut().push("typed");
            })))
            .unwrap();
        let o2 = order.clone();
        input.register_notification_callback(Box::new(move |_| {
            o2.borrow_mut().push("notify");
        }));

        core.publish(1, &Value::Double(1.0));
        registry.scan(SimTime::ZERO);

        assert_eq!(*order.borrow(), vec!["typed", "notify"]);
    }

    #[test]
    fn decode_error_is_recorded_and_scan_continues() {
        let core = Rc::new(StubCore::default());
        core.injection_type.borrow_mut().insert(1, "double".into());
        core.injection_type.borrow_mut().insert(2, "double".into());
        let mut registry = InputRegistry::new(core.clone());
        registry.create_input(1, "bad", TargetType::Primary(PrimaryType::Double), Value::Double(0.0));
        registry.create_input(2, "good", TargetType::Primary(PrimaryType::Double), Value::Double(0.0));

        core.raw.borrow_mut().insert(1, vec![vec![0xff; 30]]);
        core.publish(2, &Value::Double(9.0));

        let updated = registry.scan(SimTime::ZERO);
        assert_eq!(updated, vec!["good".to_string()]);
    }
}
