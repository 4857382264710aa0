//! Setup storage and match resolution.
//!
//! Setups are kept per member kind as stacks: resolution scans from the most
//! recently registered setup down and returns the first that accepts the
//! access. Registering a narrower or updated setup therefore shadows earlier
//! ones without removing them.
//!
//! Setups are fully built before they are pushed, and pushed as `Arc`s under
//! a write lock, so resolution never observes a partially constructed setup.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use crate::{
    interaction::Access,
    ledger::Ledger,
    setup::{EventSetup, IndexerSetup, MethodSetup, PropertySetup},
    value::Value,
};

/// Member kind a setup is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupKind {
    /// Method setup
    Method,
    /// Property setup
    Property,
    /// Indexer setup
    Indexer,
    /// Event setup
    Event,
}

impl fmt::Display for SetupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Method => "method",
            Self::Property => "property",
            Self::Indexer => "indexer",
            Self::Event => "event",
        };
        f.write_str(name)
    }
}

/// A registered setup that no recorded interaction ever matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedSetup {
    /// Member kind
    pub kind: SetupKind,
    /// Setup description, e.g. `Foo(42, Any<i32>())`
    pub description: String,
}

impl fmt::Display for UnusedSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Last-registered-first-tried stack of one setup kind.
struct SetupStack<S> {
    setups: RwLock<Vec<Arc<S>>>,
}

impl<S> Default for SetupStack<S> {
    fn default() -> Self {
        Self { setups: RwLock::new(Vec::new()) }
    }
}

impl<S> SetupStack<S> {
    fn push(&self, setup: S) -> Arc<S> {
        let setup = Arc::new(setup);
        self.setups.write().push(Arc::clone(&setup));
        setup
    }

    fn resolve(&self, accepts: impl Fn(&S) -> bool) -> Option<Arc<S>> {
        self.setups.read().iter().rev().find(|s| accepts(s)).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<S>> {
        self.setups.read().clone()
    }

    fn len(&self) -> usize {
        self.setups.read().len()
    }

    fn clear(&self) {
        self.setups.write().clear();
    }
}

/// All setups of one mock, partitioned by member kind.
#[derive(Default)]
pub struct SetupRegistry {
    methods: SetupStack<MethodSetup>,
    properties: SetupStack<PropertySetup>,
    indexers: SetupStack<IndexerSetup>,
    events: SetupStack<EventSetup>,
}

impl SetupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a method setup.
    pub fn register_method(&self, setup: MethodSetup) -> Arc<MethodSetup> {
        tracing::debug!(setup = %setup.describe(), "registered method setup");
        self.methods.push(setup)
    }

    /// Push a property setup.
    pub fn register_property(&self, setup: PropertySetup) -> Arc<PropertySetup> {
        tracing::debug!(setup = %setup.describe(), "registered property setup");
        self.properties.push(setup)
    }

    /// Push an indexer setup.
    pub fn register_indexer(&self, setup: IndexerSetup) -> Arc<IndexerSetup> {
        tracing::debug!(setup = %setup.describe(), "registered indexer setup");
        self.indexers.push(setup)
    }

    /// Push an event setup.
    pub fn register_event(&self, setup: EventSetup) -> Arc<EventSetup> {
        tracing::debug!(setup = %setup.describe(), "registered event setup");
        self.events.push(setup)
    }

    /// Latest method setup accepting `name(args)`.
    pub fn resolve_method(&self, name: &str, args: &[Value]) -> Option<Arc<MethodSetup>> {
        let resolved = self.methods.resolve(|s| s.accepts(name, args));
        if resolved.is_none() {
            tracing::debug!(member = name, arity = args.len(), "no method setup matched");
        }
        resolved
    }

    /// Latest setup for property `name`, explicit or passive.
    pub fn resolve_property(&self, name: &str) -> Option<Arc<PropertySetup>> {
        self.properties.resolve(|s| s.name == name)
    }

    /// Latest setup for property `name`, materialising a passive one from
    /// `initial` if none exists.
    ///
    /// `initial` runs before the write lock is taken, so it may read other
    /// members of the same mock. The existence check is repeated under the
    /// lock: concurrent first accesses share one passive setup and the losing
    /// initial values are dropped.
    pub fn resolve_property_or_insert(
        &self,
        name: &str,
        initial: impl FnOnce() -> Option<Value>,
    ) -> Arc<PropertySetup> {
        if let Some(setup) = self.resolve_property(name) {
            return setup;
        }

        let value = initial();
        let mut setups = self.properties.setups.write();
        if let Some(setup) = setups.iter().rev().find(|s| s.name == name) {
            return Arc::clone(setup);
        }

        tracing::debug!(member = name, "materialising passive property setup");
        let setup = Arc::new(PropertySetup::passive(name, value));
        setups.push(Arc::clone(&setup));
        setup
    }

    /// Latest indexer setup accepting `args`.
    pub fn resolve_indexer(&self, args: &[Value]) -> Option<Arc<IndexerSetup>> {
        let resolved = self.indexers.resolve(|s| s.accepts(args));
        if resolved.is_none() {
            tracing::debug!(arity = args.len(), "no indexer setup matched");
        }
        resolved
    }

    /// Latest setup for event `name`.
    pub fn resolve_event(&self, name: &str) -> Option<Arc<EventSetup>> {
        self.events.resolve(|s| s.name == name)
    }

    /// Registered setups that no interaction in `ledger` matches, in
    /// registration order per kind: methods, properties, indexers, events.
    ///
    /// Passive property setups are not reported.
    pub fn unused_setups(&self, ledger: &Ledger) -> Vec<UnusedSetup> {
        let mut unused = Vec::new();

        for setup in self.methods.snapshot() {
            let used = ledger.any(|i| match &i.access {
                Access::MethodInvocation { name, args } => setup.accepts(name, args),
                _ => false,
            });
            if !used {
                unused.push(UnusedSetup { kind: SetupKind::Method, description: setup.describe() });
            }
        }

        for setup in self.properties.snapshot().into_iter().filter(|s| !s.is_passive()) {
            let used = ledger.any(|i| match &i.access {
                Access::PropertyGetterAccess { name } | Access::PropertySetterAccess { name, .. } => {
                    *name == setup.name
                },
                _ => false,
            });
            if !used {
                unused.push(UnusedSetup { kind: SetupKind::Property, description: setup.describe() });
            }
        }

        for setup in self.indexers.snapshot() {
            let used = ledger.any(|i| match &i.access {
                Access::IndexerGetterAccess { args } | Access::IndexerSetterAccess { args, .. } => {
                    setup.accepts(args)
                },
                _ => false,
            });
            if !used {
                unused.push(UnusedSetup { kind: SetupKind::Indexer, description: setup.describe() });
            }
        }

        for setup in self.events.snapshot() {
            let used = ledger.any(|i| match &i.access {
                Access::EventSubscription { name, .. } | Access::EventUnsubscription { name, .. } => {
                    *name == setup.name
                },
                _ => false,
            });
            if !used {
                unused.push(UnusedSetup { kind: SetupKind::Event, description: setup.describe() });
            }
        }

        unused
    }

    /// Number of registered setups of `kind`, passive ones included.
    pub fn len(&self, kind: SetupKind) -> usize {
        match kind {
            SetupKind::Method => self.methods.len(),
            SetupKind::Property => self.properties.len(),
            SetupKind::Indexer => self.indexers.len(),
            SetupKind::Event => self.events.len(),
        }
    }

    /// Drop every setup of every kind.
    pub fn clear(&self) {
        self.methods.clear();
        self.properties.clear();
        self.indexers.clear();
        self.events.clear();
    }
}

impl fmt::Debug for SetupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupRegistry")
            .field("methods", &self.methods.len())
            .field("properties", &self.properties.len())
            .field("indexers", &self.indexers.len())
            .field("events", &self.events.len())
            .finish()
    }
}
