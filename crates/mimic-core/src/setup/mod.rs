//! Registered expectations.
//!
//! One setup type per member kind. Each is assembled by a builder and
//! becomes immutable in identity once registered; only its dispatch counters
//! and, for properties, the stored value change afterwards.
//!
//! ```
//! use mimic_core::{Matcher, MethodSetup, prelude::*};
//!
//! let setup = MethodSetup::builder("Add")
//!     .args([Matcher::any::<i32>(), Matcher::eq(1_i32)])
//!     .returns(10_i32)
//!     .returns(20_i32)
//!     .build();
//! assert_eq!(setup.describe(), "Add(Any<i32>(), 1)");
//! ```

mod behavior;

use std::sync::Arc;

use parking_lot::Mutex;

pub use self::behavior::{Behavior, Configure};
use crate::{
    error::MockError,
    event::Subscription,
    matcher::ArgMatchers,
    value::{ArgValue, Value},
};

type SetCallback = Arc<dyn Fn(&Value) + Send + Sync>;
type IndexerSetCallback = Arc<dyn Fn(&[Value], &Value) + Send + Sync>;
type IndexerInitializer = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
type SubscriptionCallback = Arc<dyn Fn(&Subscription) + Send + Sync>;

/// Expectation for a method call.
#[derive(Debug)]
pub struct MethodSetup {
    /// Method name
    pub name: String,
    /// Argument matchers
    pub args: ArgMatchers,
    /// Callbacks and result sequence
    pub behavior: Behavior,
}

impl MethodSetup {
    /// Start a setup for `name` taking no arguments.
    pub fn builder(name: impl Into<String>) -> MethodSetupBuilder {
        MethodSetupBuilder {
            setup: Self { name: name.into(), args: ArgMatchers::default(), behavior: Behavior::default() },
        }
    }

    /// Whether this setup accepts a call to `name` with `args`.
    pub fn accepts(&self, name: &str, args: &[Value]) -> bool {
        self.name == name && self.args.matches(args)
    }

    /// `Name(matchers)`.
    pub fn describe(&self) -> String {
        format!("{}({})", self.name, self.args.describe())
    }
}

/// Builder for [`MethodSetup`].
#[derive(Debug)]
pub struct MethodSetupBuilder {
    setup: MethodSetup,
}

impl MethodSetupBuilder {
    /// Replace the argument matchers.
    pub fn args(mut self, args: impl Into<ArgMatchers>) -> Self {
        self.setup.args = args.into();
        self
    }

    /// Accept any arguments of any arity.
    pub fn any_args(self) -> Self {
        self.args(ArgMatchers::Any)
    }

    /// Finish the setup.
    pub fn build(self) -> MethodSetup {
        self.setup
    }
}

impl Configure for MethodSetupBuilder {
    fn behavior_mut(&mut self) -> &mut Behavior {
        &mut self.setup.behavior
    }
}

impl From<MethodSetupBuilder> for MethodSetup {
    fn from(builder: MethodSetupBuilder) -> Self {
        builder.build()
    }
}

/// Expectation for a property, doubling as its backing storage.
///
/// The getter runs [`PropertySetup::behavior`]; without a producer it returns
/// the stored value. The setter fires the `on_set` callbacks and stores.
pub struct PropertySetup {
    /// Property name
    pub name: String,
    /// Getter callbacks and result sequence
    pub behavior: Behavior,
    on_set: Vec<SetCallback>,
    value: Mutex<Option<Value>>,
    passive: bool,
}

impl PropertySetup {
    /// Start a setup for property `name`.
    pub fn builder(name: impl Into<String>) -> PropertySetupBuilder {
        PropertySetupBuilder {
            setup: Self {
                name: name.into(),
                behavior: Behavior::default(),
                on_set: Vec::new(),
                value: Mutex::new(None),
                passive: false,
            },
        }
    }

    /// Storage-only setup materialised on first access of an unstubbed
    /// property.
    pub(crate) fn passive(name: &str, initial: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::default(),
            on_set: Vec::new(),
            value: Mutex::new(initial),
            passive: true,
        }
    }

    /// Whether this setup was created implicitly rather than registered.
    pub fn is_passive(&self) -> bool {
        self.passive
    }

    /// Currently stored value.
    pub fn value(&self) -> Option<Value> {
        self.value.lock().clone()
    }

    /// Getter: produced value if a producer applies, stored value otherwise.
    pub(crate) fn get(&self) -> Result<Option<Value>, MockError> {
        match self.behavior.run(&[])? {
            Some(value) => Ok(Some(value)),
            None => Ok(self.value()),
        }
    }

    /// Setter: fire `on_set` callbacks, then store.
    pub(crate) fn set(&self, value: Value) {
        for callback in &self.on_set {
            callback(&value);
        }
        *self.value.lock() = Some(value);
    }

    /// `property Name`.
    pub fn describe(&self) -> String {
        format!("property {}", self.name)
    }
}

impl std::fmt::Debug for PropertySetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySetup")
            .field("name", &self.name)
            .field("behavior", &self.behavior)
            .field("value", &self.value())
            .field("passive", &self.passive)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PropertySetup`].
#[derive(Debug)]
pub struct PropertySetupBuilder {
    setup: PropertySetup,
}

impl PropertySetupBuilder {
    /// Initial stored value.
    pub fn initialize_with<T: ArgValue>(self, value: T) -> Self {
        self.initialize_with_value(Value::new(value))
    }

    /// Initial stored value, already boxed.
    pub fn initialize_with_value(mut self, value: Value) -> Self {
        self.setup.value = Mutex::new(Some(value));
        self
    }

    /// Callback fired with every written value, before it is stored.
    pub fn on_set(mut self, callback: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.setup.on_set.push(Arc::new(callback));
        self
    }

    /// Finish the setup.
    pub fn build(self) -> PropertySetup {
        self.setup
    }
}

impl Configure for PropertySetupBuilder {
    fn behavior_mut(&mut self) -> &mut Behavior {
        &mut self.setup.behavior
    }
}

impl From<PropertySetupBuilder> for PropertySetup {
    fn from(builder: PropertySetupBuilder) -> Self {
        builder.build()
    }
}

/// Expectation layered on top of the indexer value store.
pub struct IndexerSetup {
    /// Index argument matchers
    pub args: ArgMatchers,
    /// Getter callbacks and forced results
    pub behavior: Behavior,
    on_set: Vec<IndexerSetCallback>,
    initial: Option<IndexerInitializer>,
}

impl IndexerSetup {
    /// Start a setup for index arguments matching `args`.
    pub fn builder(args: impl Into<ArgMatchers>) -> IndexerSetupBuilder {
        IndexerSetupBuilder {
            setup: Self {
                args: args.into(),
                behavior: Behavior::default(),
                on_set: Vec::new(),
                initial: None,
            },
        }
    }

    /// Whether this setup accepts index arguments `args`.
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.args.matches(args)
    }

    /// Initial value for a key tuple on first access, if configured.
    pub(crate) fn initial_value(&self, args: &[Value]) -> Option<Value> {
        self.initial.as_ref().map(|init| init(args))
    }

    pub(crate) fn fire_on_set(&self, args: &[Value], value: &Value) {
        for callback in &self.on_set {
            callback(args, value);
        }
    }

    /// `indexer [matchers]`.
    pub fn describe(&self) -> String {
        format!("indexer [{}]", self.args.describe())
    }
}

impl std::fmt::Debug for IndexerSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerSetup")
            .field("args", &self.args)
            .field("behavior", &self.behavior)
            .field("initialized", &self.initial.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`IndexerSetup`].
#[derive(Debug)]
pub struct IndexerSetupBuilder {
    setup: IndexerSetup,
}

impl IndexerSetupBuilder {
    /// Initial value for each key tuple, computed from the index arguments on
    /// first access.
    pub fn initialize_with<T: ArgValue>(
        mut self,
        init: impl Fn(&[Value]) -> T + Send + Sync + 'static,
    ) -> Self {
        self.setup.initial = Some(Arc::new(move |args| Value::new(init(args))));
        self
    }

    /// Callback fired with the index arguments and written value.
    pub fn on_set(mut self, callback: impl Fn(&[Value], &Value) + Send + Sync + 'static) -> Self {
        self.setup.on_set.push(Arc::new(callback));
        self
    }

    /// Finish the setup.
    pub fn build(self) -> IndexerSetup {
        self.setup
    }
}

impl Configure for IndexerSetupBuilder {
    fn behavior_mut(&mut self) -> &mut Behavior {
        &mut self.setup.behavior
    }
}

impl From<IndexerSetupBuilder> for IndexerSetup {
    fn from(builder: IndexerSetupBuilder) -> Self {
        builder.build()
    }
}

/// Expectation for event subscription changes.
pub struct EventSetup {
    /// Event name
    pub name: String,
    on_subscribe: Vec<SubscriptionCallback>,
    on_unsubscribe: Vec<SubscriptionCallback>,
}

impl EventSetup {
    /// Start a setup for event `name`.
    pub fn builder(name: impl Into<String>) -> EventSetupBuilder {
        EventSetupBuilder {
            setup: Self { name: name.into(), on_subscribe: Vec::new(), on_unsubscribe: Vec::new() },
        }
    }

    pub(crate) fn subscribed(&self, subscription: &Subscription) {
        for callback in &self.on_subscribe {
            callback(subscription);
        }
    }

    pub(crate) fn unsubscribed(&self, subscription: &Subscription) {
        for callback in &self.on_unsubscribe {
            callback(subscription);
        }
    }

    /// `event Name`.
    pub fn describe(&self) -> String {
        format!("event {}", self.name)
    }
}

impl std::fmt::Debug for EventSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSetup")
            .field("name", &self.name)
            .field("on_subscribe", &self.on_subscribe.len())
            .field("on_unsubscribe", &self.on_unsubscribe.len())
            .finish()
    }
}

/// Builder for [`EventSetup`].
#[derive(Debug)]
pub struct EventSetupBuilder {
    setup: EventSetup,
}

impl EventSetupBuilder {
    /// Callback fired when a handler subscribes.
    pub fn on_subscribe(mut self, callback: impl Fn(&Subscription) + Send + Sync + 'static) -> Self {
        self.setup.on_subscribe.push(Arc::new(callback));
        self
    }

    /// Callback fired when a handler unsubscribes.
    pub fn on_unsubscribe(
        mut self,
        callback: impl Fn(&Subscription) + Send + Sync + 'static,
    ) -> Self {
        self.setup.on_unsubscribe.push(Arc::new(callback));
        self
    }

    /// Finish the setup.
    pub fn build(self) -> EventSetup {
        self.setup
    }
}

impl From<EventSetupBuilder> for EventSetup {
    fn from(builder: EventSetupBuilder) -> Self {
        builder.build()
    }
}
