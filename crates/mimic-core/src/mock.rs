//! The mock instance and the entry points a proxy calls into.
//!
//! Every entry point records its interaction first and only then resolves a
//! setup, so verification sees unstubbed calls and calls that fail in strict
//! mode as well.

use std::{any::Any, fmt, sync::Arc};

use dashmap::DashSet;

use crate::{
    config::MockConfig,
    dispatch::{Dispatch, dispatch_method},
    error::MockError,
    event::{EventHandler, EventHandlers, Subscription},
    indexer_store::IndexerStore,
    interaction::{Access, Interaction},
    ledger::Ledger,
    matcher::{ArgMatchers, Matcher},
    registry::{SetupRegistry, UnusedSetup},
    setup::{EventSetup, IndexerSetup, MethodSetup, PropertySetup},
    value::{ArgValue, TypeKey, Value, short_type_name},
    verify::VerificationResult,
};

const INDEXER_MEMBER: &str = "indexer";

/// A mock object: setups, the interaction ledger and indexer/event state.
///
/// `Send + Sync`; share it with `Arc` across threads.
///
/// ```
/// use mimic_core::{Matcher, MethodSetup, Mock, args, prelude::*};
///
/// let mock = Mock::default();
/// mock.setup_method(MethodSetup::builder("Double").args([Matcher::any::<i32>()]).returns_with(
///     |args| args[0].cast::<i32>().unwrap_or_default() * 2,
/// ));
///
/// assert_eq!(mock.invoke_method::<i32>("Double", args![21_i32]).ok(), Some(42));
/// assert!(mock.verify_method("Double", [Matcher::eq(21_i32)]).once().is_ok());
/// ```
pub struct Mock {
    config: MockConfig,
    ledger: Ledger,
    setups: SetupRegistry,
    indexers: IndexerStore,
    events: EventHandlers,
    verified: DashSet<u64>,
}

impl Default for Mock {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl Mock {
    /// Create a mock with `config`.
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            ledger: Ledger::new(),
            setups: SetupRegistry::new(),
            indexers: IndexerStore::new(),
            events: EventHandlers::default(),
            verified: DashSet::new(),
        }
    }

    /// Create a mock that fails on every unstubbed member.
    pub fn strict() -> Self {
        Self::new(MockConfig::strict())
    }

    /// Active configuration.
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// The interaction ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The setup registry.
    pub fn setups(&self) -> &SetupRegistry {
        &self.setups
    }

    fn not_set_up(&self, member: &str, args: &[Value]) -> Result<(), MockError> {
        if self.config.throw_when_not_setup {
            Err(MockError::not_set_up(member, args))
        } else {
            Ok(())
        }
    }

    /// Cast a produced value to `R`, falling back to the default policy.
    fn typed<R: Any + Clone>(&self, value: Option<Value>) -> Result<R, MockError> {
        if let Some(value) = value {
            if let Some(typed) = value.cast::<R>() {
                return Ok(typed);
            }
            if !value.is_null() {
                tracing::warn!(
                    expected = std::any::type_name::<R>(),
                    actual = value.type_name(),
                    "configured value has another type, using default value"
                );
            }
        }

        let key = TypeKey::of::<R>();
        self.config
            .default_value(&key)
            .and_then(|value| value.cast::<R>())
            .ok_or_else(|| MockError::NoDefaultValue { type_name: short_type_name(key.name) })
    }

    // Methods

    /// Record and dispatch a method call, returning the raw outcome.
    pub fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Dispatch, MockError> {
        let interaction =
            self.ledger.register(Access::MethodInvocation { name: name.to_string(), args });
        let args = interaction.access.args();
        let setup = self.setups.resolve_method(name, args);
        dispatch_method(setup.as_deref(), name, args, &self.config)
    }

    /// Record and dispatch a value-returning method call.
    pub fn invoke_method<R: Any + Clone>(&self, name: &str, args: Vec<Value>) -> Result<R, MockError> {
        let dispatch = self.invoke(name, args)?;
        self.typed(dispatch.value)
    }

    /// Record and dispatch a void method call. Any produced value is dropped.
    pub fn invoke_void(&self, name: &str, args: Vec<Value>) -> Result<Dispatch, MockError> {
        let mut dispatch = self.invoke(name, args)?;
        dispatch.value = None;
        Ok(dispatch)
    }

    // Properties

    /// Read property `name`.
    pub fn get_property<R: Any + Clone>(&self, name: &str) -> Result<R, MockError> {
        let value = self.property_value(name, || None)?;
        self.typed(value)
    }

    /// Read property `name`; an unstubbed property is initialised from
    /// `default_factory` on its first access.
    pub fn get_property_or<R: ArgValue + Clone>(
        &self,
        name: &str,
        default_factory: impl FnOnce() -> R,
    ) -> Result<R, MockError> {
        let value = self.property_value(name, || Some(Value::new(default_factory())))?;
        self.typed(value)
    }

    fn property_value(
        &self,
        name: &str,
        initial: impl FnOnce() -> Option<Value>,
    ) -> Result<Option<Value>, MockError> {
        self.ledger.register(Access::PropertyGetterAccess { name: name.to_string() });

        let setup = match self.setups.resolve_property(name) {
            Some(setup) => setup,
            None => {
                self.not_set_up(name, &[])?;
                self.setups.resolve_property_or_insert(name, initial)
            },
        };
        setup.get()
    }

    /// Write property `name`. Returns whether the proxy should also write
    /// through to the base implementation.
    pub fn set_property(&self, name: &str, value: Value) -> Result<bool, MockError> {
        let interaction = self
            .ledger
            .register(Access::PropertySetterAccess { name: name.to_string(), value });

        let setup = match self.setups.resolve_property(name) {
            Some(setup) => setup,
            None => {
                self.not_set_up(name, &[])?;
                self.setups.resolve_property_or_insert(name, || None)
            },
        };

        if let Some(value) = interaction.access.value() {
            setup.set(value.clone());
        }
        Ok(setup.behavior.call_base_class().unwrap_or(self.config.call_base_class_default))
    }

    // Indexers

    /// Read the indexer at `args`.
    ///
    /// A setup's producer forces the result without touching the stored
    /// state; otherwise the persisted value is returned, initialised from the
    /// setup or the default policy on first access.
    pub fn get_indexer<R: Any + Clone>(&self, args: Vec<Value>) -> Result<R, MockError> {
        let interaction = self.ledger.register(Access::IndexerGetterAccess { args });
        let args = interaction.access.args();

        let setup = self.setups.resolve_indexer(args);
        if setup.is_none() {
            self.not_set_up(INDEXER_MEMBER, args)?;
        }

        let forced = match &setup {
            Some(setup) => {
                setup.args.notify(args);
                setup.behavior.run(args)?
            },
            None => None,
        };

        let value = match forced {
            Some(value) => Some(value),
            None => self.indexers.get_or_create(args, || {
                setup
                    .as_ref()
                    .and_then(|s| s.initial_value(args))
                    .or_else(|| self.config.default_value(&TypeKey::of::<R>()))
            }),
        };
        self.typed(value)
    }

    /// Write `value` to the indexer at `args`. Returns whether the proxy
    /// should also write through to the base implementation.
    pub fn set_indexer(&self, value: Value, args: Vec<Value>) -> Result<bool, MockError> {
        let interaction = self.ledger.register(Access::IndexerSetterAccess { args, value });
        let (args, value) = match &interaction.access {
            Access::IndexerSetterAccess { args, value } => (args.as_slice(), value),
            _ => return Ok(self.config.call_base_class_default),
        };

        let setup = self.setups.resolve_indexer(args);
        if setup.is_none() {
            self.not_set_up(INDEXER_MEMBER, args)?;
        }

        if let Some(setup) = &setup {
            setup.args.notify(args);
            setup.fire_on_set(args, value);
        }
        self.indexers.update(args, value.clone());

        Ok(setup
            .and_then(|s| s.behavior.call_base_class())
            .unwrap_or(self.config.call_base_class_default))
    }

    // Events

    /// Subscribe `handler` to event `name`, optionally bound to `target`.
    pub fn add_event(&self, name: &str, target: Option<Value>, handler: EventHandler) {
        self.ledger.register(Access::EventSubscription {
            name: name.to_string(),
            target: target.clone(),
            handler: handler.clone(),
        });

        let subscription = Subscription { target, handler };
        if let Some(setup) = self.setups.resolve_event(name) {
            setup.subscribed(&subscription);
        }
        self.events.add(name, subscription.target, subscription.handler);
    }

    /// Remove the most recent subscription of `handler` for `target`.
    /// `false` if it was not subscribed.
    pub fn remove_event(&self, name: &str, target: Option<Value>, handler: EventHandler) -> bool {
        self.ledger.register(Access::EventUnsubscription {
            name: name.to_string(),
            target: target.clone(),
            handler: handler.clone(),
        });

        let removed = self.events.remove(name, target.as_ref(), &handler);
        if removed && let Some(setup) = self.setups.resolve_event(name) {
            setup.unsubscribed(&Subscription { target, handler });
        }
        removed
    }

    /// Invoke every handler subscribed to `name`, in subscription order.
    /// Returns the number of handlers called. Not recorded as an interaction.
    pub fn raise_event(&self, name: &str, args: &[Value]) -> usize {
        self.events.raise(name, args)
    }

    /// Live subscriptions of event `name`, in subscription order.
    pub fn subscriptions(&self, name: &str) -> Vec<Subscription> {
        self.events.subscriptions(name)
    }

    // Setup registration

    /// Register a method setup.
    pub fn setup_method(&self, setup: impl Into<MethodSetup>) -> Arc<MethodSetup> {
        self.setups.register_method(setup.into())
    }

    /// Register a property setup.
    pub fn setup_property(&self, setup: impl Into<PropertySetup>) -> Arc<PropertySetup> {
        self.setups.register_property(setup.into())
    }

    /// Register an indexer setup.
    pub fn setup_indexer(&self, setup: impl Into<IndexerSetup>) -> Arc<IndexerSetup> {
        self.setups.register_indexer(setup.into())
    }

    /// Register an event setup.
    pub fn setup_event(&self, setup: impl Into<EventSetup>) -> Arc<EventSetup> {
        self.setups.register_event(setup.into())
    }

    // Verification

    fn verification(
        &self,
        description: String,
        accepts: impl Fn(&Access) -> bool,
    ) -> VerificationResult<'_> {
        VerificationResult::new(&self.verified, description, self.ledger.filter(|i| accepts(&i.access)))
    }

    /// Calls to method `name` whose arguments satisfy `matchers`.
    pub fn verify_method(&self, name: &str, matchers: impl Into<ArgMatchers>) -> VerificationResult<'_> {
        let matchers = matchers.into();
        self.verification(format!("invoked method {name}({})", matchers.describe()), |access| {
            matches!(access, Access::MethodInvocation { name: n, args } if n == name && matchers.matches(args))
        })
    }

    /// Reads of property `name`.
    pub fn verify_property_get(&self, name: &str) -> VerificationResult<'_> {
        self.verification(format!("got property {name}"), |access| {
            matches!(access, Access::PropertyGetterAccess { name: n } if n == name)
        })
    }

    /// Writes to property `name` whose value satisfies `matcher`.
    pub fn verify_property_set(&self, name: &str, matcher: Matcher) -> VerificationResult<'_> {
        self.verification(format!("set property {name} to {}", matcher.describe()), |access| {
            matches!(
                access,
                Access::PropertySetterAccess { name: n, value } if n == name && matcher.matches(value)
            )
        })
    }

    /// Indexer reads whose arguments satisfy `matchers`.
    pub fn verify_indexer_get(&self, matchers: impl Into<ArgMatchers>) -> VerificationResult<'_> {
        let matchers = matchers.into();
        self.verification(format!("got indexer [{}]", matchers.describe()), |access| {
            matches!(access, Access::IndexerGetterAccess { args } if matchers.matches(args))
        })
    }

    /// Indexer writes whose arguments satisfy `matchers` and whose value
    /// satisfies `value`.
    pub fn verify_indexer_set(
        &self,
        matchers: impl Into<ArgMatchers>,
        value: Matcher,
    ) -> VerificationResult<'_> {
        let matchers = matchers.into();
        let description = format!("set indexer [{}] to {}", matchers.describe(), value.describe());
        self.verification(description, |access| {
            matches!(
                access,
                Access::IndexerSetterAccess { args, value: v } if matchers.matches(args) && value.matches(v)
            )
        })
    }

    /// Subscriptions to event `name`.
    pub fn verify_event_subscribed(&self, name: &str) -> VerificationResult<'_> {
        self.verification(format!("subscribed to event {name}"), |access| {
            matches!(access, Access::EventSubscription { name: n, .. } if n == name)
        })
    }

    /// Unsubscriptions from event `name`.
    pub fn verify_event_unsubscribed(&self, name: &str) -> VerificationResult<'_> {
        self.verification(format!("unsubscribed from event {name}"), |access| {
            matches!(access, Access::EventUnsubscription { name: n, .. } if n == name)
        })
    }

    // Reporting

    /// Registered setups no recorded interaction matched.
    pub fn unused_setups(&self) -> Vec<UnusedSetup> {
        self.setups.unused_setups(&self.ledger)
    }

    /// Recorded interactions not covered by a passing count assertion.
    pub fn unverified_interactions(&self) -> Vec<Interaction> {
        self.ledger.filter(|i| !self.verified.contains(&i.index))
    }

    /// Snapshot of every recorded interaction.
    pub fn interactions(&self) -> Vec<Interaction> {
        self.ledger.all()
    }

    /// Drop all setups, persisted indexer values and event subscriptions.
    pub fn clear_setups(&self) {
        tracing::debug!(setups = ?self.setups, "clearing setups");
        self.setups.clear();
        self.indexers.clear();
        self.events.clear();
    }

    /// Drop recorded interactions and verification marks. Ledger indices
    /// keep increasing.
    pub fn clear_interactions(&self) {
        self.ledger.clear();
        self.verified.clear();
    }
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("config", &self.config)
            .field("interactions", &self.ledger.len())
            .field("setups", &self.setups)
            .field("verified", &self.verified.len())
            .finish_non_exhaustive()
    }
}
