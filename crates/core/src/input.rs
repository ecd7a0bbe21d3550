//! The input object (§4.5): per-subscription state, conversion policy and
//! callback dispatch. The largest component by design (§2 gives it 40% of
//! the budget) because it is where every other component — the tagged
//! value, the codec, the unit bridge and the change detector — gets
//! composed into one call sequence.

use std::collections::HashMap;
use std::rc::Rc;

use crate::change;
use crate::codec;
use crate::custom::{CustomTypeCodec, CustomValue};
use crate::error::{HelicsError, Result};
use crate::federate_core::{FederateCore, InputHandle, OptionCode, OptionValue};
use crate::time::SimTime;
use crate::units::{self, Unit};
use crate::value::{Complex, NamedPoint, PrimaryType, Value};

/// The type an input's owner intends to read. `Unknown` defers to whatever
/// the connected publication turns out to be; `Custom` names a
/// non-primary type handled by a user-supplied [`crate::custom::CustomTypeCodec`]
/// instead of the tagged [`Value`] container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    Primary(PrimaryType),
    Unknown,
    Custom(String),
}

impl TargetType {
    /// Parse a declaration string (§6 type names), case-insensitive.
    /// `"def"` and `"unknown"` both mean "infer from publication"; any
    /// other unrecognised name is assumed to name a custom type.
    pub fn from_declaration(name: &str) -> TargetType {
        let lower = name.to_ascii_lowercase();
        if lower == "def" || lower == "unknown" {
            return TargetType::Unknown;
        }
        match PrimaryType::parse(&lower) {
            Some(t) => TargetType::Primary(t),
            None => TargetType::Custom(lower),
        }
    }
}

/// How multiple simultaneously connected publications are reduced to one
/// value for a single input (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiInputPolicy {
    /// Only the most recently arrived publication is used (the last one
    /// wins), the implicit default for a single-target input.
    Passthrough,
    And,
    Or,
    Sum,
    Diff,
    Max,
    Min,
    Average,
    Vectorize,
}

/// One of the nine typed callback signatures. Exactly one may be installed
/// at a time; invocation converts the stored tagged value to the
/// callback's own type via §4.1 regardless of the input's declared target.
pub enum TypedCallback {
    Double(Box<dyn FnMut(f64, SimTime)>),
    Int(Box<dyn FnMut(i64, SimTime)>),
    String(Box<dyn FnMut(&str, SimTime)>),
    Complex(Box<dyn FnMut(Complex, SimTime)>),
    Vector(Box<dyn FnMut(&[f64], SimTime)>),
    ComplexVector(Box<dyn FnMut(&[Complex], SimTime)>),
    NamedPoint(Box<dyn FnMut(&NamedPoint, SimTime)>),
    Boolean(Box<dyn FnMut(bool, SimTime)>),
    Time(Box<dyn FnMut(SimTime, SimTime)>),
}

impl TypedCallback {
    fn primary_type(&self) -> PrimaryType {
        match self {
            TypedCallback::Double(_) => PrimaryType::Double,
            TypedCallback::Int(_) => PrimaryType::Int,
            TypedCallback::String(_) => PrimaryType::String,
            TypedCallback::Complex(_) => PrimaryType::Complex,
            TypedCallback::Vector(_) => PrimaryType::Vector,
            TypedCallback::ComplexVector(_) => PrimaryType::ComplexVector,
            TypedCallback::NamedPoint(_) => PrimaryType::NamedPoint,
            TypedCallback::Boolean(_) => PrimaryType::Boolean,
            TypedCallback::Time(_) => PrimaryType::Time,
        }
    }

    fn invoke(&mut self, value: &Value, time: SimTime) {
        let converted = value.convert_to(self.primary_type());
        match (self, converted) {
            (TypedCallback::Double(f), Value::Double(d)) => f(d, time),
            (TypedCallback::Int(f), Value::Int(i)) => f(i, time),
            (TypedCallback::String(f), Value::String(s)) => f(&s, time),
            (TypedCallback::Complex(f), Value::Complex(c)) => f(c, time),
            (TypedCallback::Vector(f), Value::Vector(v)) => f(&v, time),
            (TypedCallback::ComplexVector(f), Value::ComplexVector(v)) => f(&v, time),
            (TypedCallback::NamedPoint(f), Value::NamedPoint(p)) => f(&p, time),
            (TypedCallback::Boolean(f), Value::Boolean(b)) => f(b, time),
            (TypedCallback::Time(f), Value::Time(t)) => f(t, time),
            _ => unreachable!("convert_to always yields the callback's own primary type"),
        }
    }
}

pub type NotificationCallback = Box<dyn FnMut(SimTime)>;

/// A federate-local endpoint that receives typed values from one or more
/// publications.
///
/// Holds a clone of the registry's `Rc<dyn FederateCore>` (§9) rather than
/// an owning reference back to the registry — an input never outlives its
/// federate core, but many inputs share it, and the model is single-
/// threaded cooperative (§5) so `Rc` rather than `Arc` is the right cost.
pub struct Input {
    core: Rc<dyn FederateCore>,
    handle: InputHandle,
    display_name: String,
    local_name: String,
    info: String,

    target: TargetType,
    injection_type: Option<PrimaryType>,
    injection_units: Option<String>,
    output_units: Option<String>,
    unit_pair: Option<(Unit, Unit)>,
    /// Set when the resolved input/output units turn out non-commensurable
    /// (§4.3, §7). A sticky configuration error: once set, every
    /// subsequent `ingest` is refused rather than silently falling back to
    /// an identity unit map.
    units_configuration_error: Option<String>,
    source_info_loaded: bool,

    stored: Value,
    has_update: bool,
    change_detection_enabled: bool,
    min_delta: f64,

    /// Only populated for `TargetType::Custom` inputs (§9): the codec that
    /// owns the opaque byte representation and, optionally, a comparator
    /// for change detection.
    custom_codec: Option<Rc<dyn CustomTypeCodec>>,
    /// The stored opaque value for a custom-typed input. Never touched for
    /// primary-typed inputs, which store through `stored` instead.
    custom_value: CustomValue,

    multi_input_policy: MultiInputPolicy,
    targets: Vec<String>,

    typed_callback: Option<TypedCallback>,
    notification_callback: Option<NotificationCallback>,

    options: HashMap<OptionCode, OptionValue>,
    closed: bool,
    executing: bool,
    last_error: Option<HelicsError>,
}

impl Input {
    /// Create a new input during the federate's startup phase. `target`
    /// is the declared type the owner intends to read; `default` is the
    /// value returned before any publication arrives.
    pub fn new(
        core: Rc<dyn FederateCore>,
        handle: InputHandle,
        display_name: impl Into<String>,
        target: TargetType,
        default: Value,
    ) -> Self {
        Self {
            core,
            handle,
            display_name: display_name.into(),
            local_name: String::new(),
            info: String::new(),
            target,
            injection_type: None,
            injection_units: None,
            output_units: None,
            unit_pair: None,
            units_configuration_error: None,
            source_info_loaded: false,
            stored: default,
            has_update: false,
            change_detection_enabled: false,
            min_delta: -1.0,
            custom_codec: None,
            custom_value: CustomValue::default(),
            multi_input_policy: MultiInputPolicy::Passthrough,
            targets: Vec::new(),
            typed_callback: None,
            notification_callback: None,
            options: HashMap::new(),
            closed: false,
            executing: false,
            last_error: None,
        }
    }

    pub fn handle(&self) -> InputHandle {
        self.handle
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn set_local_name(&mut self, name: impl Into<String>) {
        self.local_name = name.into();
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn target(&self) -> &TargetType {
        &self.target
    }

    /// Marks the federate as having left initialization; after this call
    /// `set_default` is a lifecycle error and the input's shape is frozen.
    pub fn enter_executing(&mut self) {
        self.executing = true;
    }

    fn require_not_executing(&self, reason: &str) -> Result<()> {
        if self.executing {
            Err(HelicsError::Lifecycle {
                input: self.display_name.clone(),
                reason: reason.to_string(),
            })
        } else {
            Ok(())
        }
    }

    // -- §4.5 operations -----------------------------------------------

    /// Installs an initial tagged value returned by readers before any
    /// publication arrives. Only callable before the federate leaves
    /// initialization.
    pub fn set_default(&mut self, value: Value) -> Result<()> {
        self.require_not_executing("set-default called after execution began")?;
        self.stored = value;
        Ok(())
    }

    /// Enables change detection if `d >= 0`; disables it and wipes the
    /// remembered delta if `d < 0`.
    pub fn set_minimum_change(&mut self, d: f64) {
        if d < 0.0 {
            self.change_detection_enabled = false;
            self.min_delta = -1.0;
        } else {
            self.change_detection_enabled = true;
            self.min_delta = d;
        }
    }

    /// Toggles change detection while preserving the remembered delta.
    pub fn enable_change_detection(&mut self, flag: bool) {
        self.change_detection_enabled = flag;
        if flag && self.min_delta < 0.0 {
            self.min_delta = 0.0;
        }
    }

    pub fn change_detection_enabled(&self) -> bool {
        self.change_detection_enabled
    }

    pub fn minimum_change(&self) -> f64 {
        self.min_delta
    }

    pub fn set_multi_input_policy(&mut self, policy: MultiInputPolicy) {
        self.multi_input_policy = policy;
    }

    /// Installs exactly one typed callback. Only callable before the
    /// federate leaves initialization — §3 Lifecycles lists the callback
    /// slot alongside target/name/units as reconfigurable only up to that
    /// point. A custom (non-primary) target cannot carry a typed callback
    /// since custom values never populate the tagged container — this is
    /// the one case §3 invariant 4 rejects.
    pub fn set_callback(&mut self, callback: TypedCallback) -> Result<()> {
        self.require_not_executing("callback changed after execution began")?;
        if let TargetType::Custom(name) = &self.target {
            return Err(HelicsError::Configuration {
                input: self.display_name.clone(),
                reason: format!(
                    "cannot install a typed callback on custom-typed input (type '{name}')"
                ),
            });
        }
        self.typed_callback = Some(callback);
        Ok(())
    }

    pub fn clear_callback(&mut self) {
        self.typed_callback = None;
    }

    pub fn register_notification_callback(&mut self, callback: NotificationCallback) {
        self.notification_callback = Some(callback);
    }

    /// Attaches a codec for a `Custom`-targeted input (§9). The codec's
    /// declared type name must match the target's; a custom-typed input
    /// with no codec attached ingests nothing (raw buffers accumulate on
    /// the core and are dropped unread on the next ingest).
    pub fn set_custom_codec(&mut self, codec: Rc<dyn CustomTypeCodec>) -> Result<()> {
        self.require_not_executing("custom codec changed after execution began")?;
        match &self.target {
            TargetType::Custom(name) if codec.type_name().eq_ignore_ascii_case(name) => {
                self.custom_codec = Some(codec);
                Ok(())
            }
            TargetType::Custom(name) => Err(HelicsError::Configuration {
                input: self.display_name.clone(),
                reason: format!(
                    "custom codec '{}' does not match declared target type '{name}'",
                    codec.type_name()
                ),
            }),
            _ => Err(HelicsError::Configuration {
                input: self.display_name.clone(),
                reason: "custom codec can only be attached to a custom-targeted input".to_string(),
            }),
        }
    }

    /// The stored opaque bytes for a `Custom`-targeted input. Empty (and
    /// meaningless) for any other target.
    pub fn get_custom_value(&self) -> &[u8] {
        &self.custom_value.bytes
    }

    /// Attaches a publication by symbolic name; a single input may bind
    /// multiple publications, reduced by the configured multi-input policy.
    pub fn add_target(&mut self, name: &str) {
        if !self.targets.iter().any(|t| t == name) {
            self.targets.push(name.to_string());
        }
        self.core.add_target(self.handle, name);
    }

    pub fn remove_target(&mut self, name: &str) {
        self.targets.retain(|t| t != name);
        self.core.remove_target(self.handle, name);
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn set_option(&mut self, code: OptionCode, value: OptionValue) {
        self.options.insert(code, value);
        self.core.set_option(self.handle, code, value);
    }

    pub fn get_option(&self, code: OptionCode) -> Option<OptionValue> {
        self.options.get(&code).copied()
    }

    pub fn set_input_units(&mut self, units: Option<String>) {
        self.injection_units = units;
    }

    pub fn set_output_units(&mut self, units: Option<String>) -> Result<()> {
        self.require_not_executing("output units changed after execution began")?;
        self.output_units = units;
        Ok(())
    }

    /// Loads injection type/units from the core the first time a value
    /// arrives (§9, lazy source info), resolving the unit bridge. A
    /// non-commensurable pair is recorded as a sticky configuration error
    /// (`units_configuration_error`) rather than aborting the scan — §4.3
    /// requires the bridge to never silently drop a bad pairing, so
    /// `ingest` refuses to store or dispatch on this input for as long as
    /// the error stands, instead of falling back to an identity map.
    fn ensure_source_info_loaded(&mut self) {
        if self.source_info_loaded {
            return;
        }
        let injection_type_name = self.core.get_injection_type(self.handle);
        let injection_units = self.core.get_injection_units(self.handle);

        if injection_type_name.is_none() {
            // Publication hasn't connected yet; try again next cycle.
            return;
        }

        self.injection_type = injection_type_name.as_deref().and_then(PrimaryType::parse);
        self.injection_units = injection_units;
        self.source_info_loaded = true;

        match units::resolve_pair(
            &self.display_name,
            self.injection_units.as_deref(),
            self.output_units.as_deref(),
        ) {
            Ok(pair) => self.unit_pair = pair,
            Err(HelicsError::Configuration { reason, .. }) => {
                self.units_configuration_error = Some(reason.clone());
                self.last_error = Some(HelicsError::Configuration {
                    input: self.display_name.clone(),
                    reason,
                });
            }
            Err(other) => self.last_error = Some(other),
        }
    }

    /// Only reached for `Primary`/`Unknown` targets — `ingest` routes
    /// `Custom` targets to `ingest_custom` before this is ever called.
    fn effective_target(&self, decoded: PrimaryType) -> PrimaryType {
        match &self.target {
            TargetType::Primary(t) => *t,
            TargetType::Unknown | TargetType::Custom(_) => decoded,
        }
    }

    fn apply_units(&mut self, value: Value) -> Value {
        match value {
            Value::Double(d) => Value::Double(units::bridge_f64(self.unit_pair, d)),
            Value::Int(i) => {
                let (saturated, rounded) = units::bridge_i64_checked(self.unit_pair, i);
                if saturated as f64 != rounded && self.reports_arithmetic_domain_errors() {
                    self.last_error = Some(HelicsError::ArithmeticDomain {
                        input: self.display_name.clone(),
                        value: rounded,
                        saturated,
                    });
                }
                Value::Int(saturated)
            }
            Value::Vector(v) => Value::Vector(units::bridge_vector(self.unit_pair, &v)),
            other => other,
        }
    }

    fn reports_arithmetic_domain_errors(&self) -> bool {
        matches!(
            self.options
                .get(&crate::federate_core::REPORT_ARITHMETIC_DOMAIN_ERRORS),
            Some(OptionValue::Flag(true))
        )
    }

    fn decode_one(&mut self, raw: &[u8]) -> Option<Value> {
        match codec::decode(raw) {
            Some(v) => Some(v),
            None => {
                self.last_error = Some(HelicsError::Decode {
                    input: self.display_name.clone(),
                    claimed_type: self.injection_type.unwrap_or(PrimaryType::String),
                    bytes_len: raw.len(),
                });
                None
            }
        }
    }

    fn reduce(&mut self, values: Vec<Value>) -> Option<Value> {
        if values.is_empty() {
            return None;
        }
        match self.multi_input_policy {
            MultiInputPolicy::Passthrough => values.into_iter().last(),
            MultiInputPolicy::And => Some(Value::Boolean(values.iter().all(Value::as_bool))),
            MultiInputPolicy::Or => Some(Value::Boolean(values.iter().any(Value::as_bool))),
            MultiInputPolicy::Sum => {
                Some(Value::Double(values.iter().map(Value::as_f64).sum()))
            }
            MultiInputPolicy::Diff => {
                let mut iter = values.iter().map(Value::as_f64);
                let first = iter.next().unwrap_or(0.0);
                Some(Value::Double(iter.fold(first, |acc, x| acc - x)))
            }
            MultiInputPolicy::Max => Some(Value::Double(
                values
                    .iter()
                    .map(Value::as_f64)
                    .fold(f64::NEG_INFINITY, f64::max),
            )),
            MultiInputPolicy::Min => Some(Value::Double(
                values
                    .iter()
                    .map(Value::as_f64)
                    .fold(f64::INFINITY, f64::min),
            )),
            MultiInputPolicy::Average => {
                let n = values.len() as f64;
                Some(Value::Double(
                    values.iter().map(Value::as_f64).sum::<f64>() / n,
                ))
            }
            MultiInputPolicy::Vectorize => {
                Some(Value::Vector(values.iter().map(Value::as_f64).collect()))
            }
        }
    }

    /// Ingests all raw buffers delivered to this input this cycle: decode,
    /// convert to the effective target type, apply the unit bridge, run
    /// change detection, and store. Returns whether a new value is now
    /// observable. Does not itself fetch raw buffers — callers (the
    /// registry, or `check_update`) supply them.
    fn ingest(&mut self, raws: Vec<Vec<u8>>) -> bool {
        if raws.is_empty() {
            return false;
        }
        self.ensure_source_info_loaded();

        if let TargetType::Custom(_) = &self.target {
            return self.ingest_custom(raws);
        }

        if let Some(reason) = self.units_configuration_error.clone() {
            // §4.3/§7: a non-commensurable unit pair is fatal to this call;
            // re-surface the error every cycle instead of storing a value
            // converted under a silent identity fallback.
            self.last_error = Some(HelicsError::Configuration {
                input: self.display_name.clone(),
                reason,
            });
            return false;
        }

        let decoded: Vec<Value> = raws.iter().filter_map(|r| self.decode_one(r)).collect();
        let Some(reduced) = self.reduce(decoded) else {
            return false;
        };

        let target = self.effective_target(reduced.primary_type());
        let converted = reduced.convert_to(target);
        let converted = self.apply_units(converted);

        if !self.change_detection_enabled {
            self.stored = converted;
            self.has_update = true;
            return true;
        }

        if change::changed(&self.stored, &converted, self.min_delta) {
            self.stored = converted;
            self.has_update = true;
            true
        } else {
            // §3 invariant 2: a publication that doesn't clear the change
            // threshold retains the stored value and clears has-update.
            self.has_update = false;
            false
        }
    }

    /// Ingests raw buffers for a `Custom`-targeted input (§9): the bytes
    /// never pass through the tagged container or the unit bridge. The
    /// multi-input policies defined for primary types don't apply to
    /// opaque bytes, so — as with `Passthrough` — the last buffer
    /// delivered this cycle wins. Change detection stays disabled (every
    /// buffer is observable) unless a codec with a comparator is attached.
    fn ingest_custom(&mut self, raws: Vec<Vec<u8>>) -> bool {
        let Some(candidate) = raws.into_iter().last() else {
            return false;
        };
        let changed = match self
            .custom_codec
            .as_ref()
            .and_then(|codec| codec.equals(&self.custom_value.bytes, &candidate))
        {
            Some(equal) => !equal,
            None => true,
        };
        if changed {
            self.custom_value = CustomValue { bytes: candidate };
            self.has_update = true;
            true
        } else {
            self.has_update = false;
            false
        }
    }

    /// Returns true iff a new value is observable under the current
    /// change-detection policy. With `assume = false` this first consults
    /// the federate core for a pending raw buffer; with `assume = true`
    /// (used by the registry, which has already polled `pending_updates`)
    /// it skips that check. Either way, a positive result eagerly
    /// materialises the new value into the stored tagged value.
    pub fn check_update(&mut self, assume: bool) -> bool {
        if self.closed {
            return false;
        }
        if !assume && !self.core.is_updated(self.handle) {
            return self.has_update;
        }
        let raws = self.core.get_raw(self.handle);
        self.ingest(raws)
    }

    /// Side-effect-free check of the has-update flag. Per the spec's open
    /// question, this may return true for a value that would still be
    /// filtered by change detection if it turns out undecodable —
    /// `check_update` is the authoritative, mutating form.
    pub fn is_updated(&self) -> bool {
        self.has_update
    }

    /// Clears the has-update flag without consuming the stored value.
    pub fn clear_update(&mut self) {
        self.has_update = false;
    }

    pub fn take_last_error(&mut self) -> Option<HelicsError> {
        self.last_error.take()
    }

    // -- value readers ---------------------------------------------------

    pub fn value_ref(&self) -> &Value {
        &self.stored
    }

    pub fn get_value(&self) -> Value {
        self.stored.clone()
    }

    pub fn get_value_f64(&self) -> f64 {
        self.stored.as_f64()
    }

    pub fn get_value_i64(&self) -> i64 {
        self.stored.as_i64()
    }

    pub fn get_value_string(&self) -> String {
        self.stored.as_string()
    }

    pub fn get_value_bool(&self) -> bool {
        self.stored.as_bool()
    }

    pub fn get_value_complex(&self) -> Complex {
        self.stored.as_complex()
    }

    pub fn get_value_vector(&self) -> Vec<f64> {
        self.stored.as_vector()
    }

    pub fn get_value_complex_vector(&self) -> Vec<Complex> {
        self.stored.as_complex_vector()
    }

    pub fn get_value_named_point(&self) -> NamedPoint {
        self.stored.as_named_point()
    }

    pub fn get_value_char(&self) -> u8 {
        self.stored.as_char()
    }

    pub fn get_raw_value(&self) -> Vec<u8> {
        if self.closed {
            return codec::encode(&self.stored);
        }
        let mut raws = self.core.get_raw(self.handle);
        raws.pop().unwrap_or_else(|| codec::encode(&self.stored))
    }

    pub fn get_raw_size(&self) -> usize {
        self.get_raw_value().len()
    }

    pub fn get_string_size(&self) -> usize {
        self.stored.as_string().len()
    }

    pub fn get_vector_size(&self) -> usize {
        self.stored.as_vector().len()
    }

    /// Severs the input from the federate core; subsequent reads return
    /// the last stored value and updates stop. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.core.close_interface(self.handle);
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Dispatches the typed callback (if installed and a value is
    /// observable) followed by the notification callback, per the
    /// registry's ordering guarantees (§5): both fire strictly after the
    /// stored value was updated, and the notification callback fires after
    /// the typed one.
    pub(crate) fn dispatch(&mut self, time: SimTime) {
        if !self.has_update {
            return;
        }
        if let Some(callback) = self.typed_callback.as_mut() {
            callback.invoke(&self.stored, time);
        }
        if let Some(notify) = self.notification_callback.as_mut() {
            notify(time);
        }
    }
}
