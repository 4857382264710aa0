//! Recorded interactions.
//!
//! Every entry-point call against a mock produces exactly one
//! [`Interaction`]: an [`Access`] stamped with the ledger index assigned at
//! registration time. Interactions are immutable once recorded.

use std::fmt;

use crate::{event::EventHandler, value::Value};

/// Discriminant of an [`Access`], used to filter the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionKind {
    /// Method call
    Method,
    /// Property read
    PropertyGet,
    /// Property write
    PropertySet,
    /// Indexer read
    IndexerGet,
    /// Indexer write
    IndexerSet,
    /// Event handler added
    EventSubscribe,
    /// Event handler removed
    EventUnsubscribe,
}

impl InteractionKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Method,
        Self::PropertyGet,
        Self::PropertySet,
        Self::IndexerGet,
        Self::IndexerSet,
        Self::EventSubscribe,
        Self::EventUnsubscribe,
    ];
}

/// What the caller did, before the ledger assigns an index.
#[derive(Debug, Clone)]
pub enum Access {
    /// A method call
    MethodInvocation {
        /// Method name
        name: String,
        /// Actual arguments
        args: Vec<Value>,
    },
    /// A property read
    PropertyGetterAccess {
        /// Property name
        name: String,
    },
    /// A property write
    PropertySetterAccess {
        /// Property name
        name: String,
        /// Value written
        value: Value,
    },
    /// An indexer read
    IndexerGetterAccess {
        /// Index arguments
        args: Vec<Value>,
    },
    /// An indexer write
    IndexerSetterAccess {
        /// Index arguments
        args: Vec<Value>,
        /// Value written
        value: Value,
    },
    /// An event handler was added
    EventSubscription {
        /// Event name
        name: String,
        /// Object the handler is bound to, if any
        target: Option<Value>,
        /// The handler
        handler: EventHandler,
    },
    /// An event handler was removed
    EventUnsubscription {
        /// Event name
        name: String,
        /// Object the handler is bound to, if any
        target: Option<Value>,
        /// The handler
        handler: EventHandler,
    },
}

impl Access {
    /// Kind of this access.
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::MethodInvocation { .. } => InteractionKind::Method,
            Self::PropertyGetterAccess { .. } => InteractionKind::PropertyGet,
            Self::PropertySetterAccess { .. } => InteractionKind::PropertySet,
            Self::IndexerGetterAccess { .. } => InteractionKind::IndexerGet,
            Self::IndexerSetterAccess { .. } => InteractionKind::IndexerSet,
            Self::EventSubscription { .. } => InteractionKind::EventSubscribe,
            Self::EventUnsubscription { .. } => InteractionKind::EventUnsubscribe,
        }
    }

    /// Member name. `None` for indexers.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::MethodInvocation { name, .. }
            | Self::PropertyGetterAccess { name }
            | Self::PropertySetterAccess { name, .. }
            | Self::EventSubscription { name, .. }
            | Self::EventUnsubscription { name, .. } => Some(name),
            Self::IndexerGetterAccess { .. } | Self::IndexerSetterAccess { .. } => None,
        }
    }

    /// Positional arguments (method arguments or index arguments).
    pub fn args(&self) -> &[Value] {
        match self {
            Self::MethodInvocation { args, .. }
            | Self::IndexerGetterAccess { args }
            | Self::IndexerSetterAccess { args, .. } => args,
            _ => &[],
        }
    }

    /// Written value for setters.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::PropertySetterAccess { value, .. } | Self::IndexerSetterAccess { value, .. } => {
                Some(value)
            },
            _ => None,
        }
    }
}

fn join(args: &[Value]) -> String {
    args.iter().map(|a| format!("{a:?}")).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MethodInvocation { name, args } => write!(f, "invoke method {name}({})", join(args)),
            Self::PropertyGetterAccess { name } => write!(f, "get property {name}"),
            Self::PropertySetterAccess { name, value } => {
                write!(f, "set property {name} to {value:?}")
            },
            Self::IndexerGetterAccess { args } => write!(f, "get indexer [{}]", join(args)),
            Self::IndexerSetterAccess { args, value } => {
                write!(f, "set indexer [{}] to {value:?}", join(args))
            },
            Self::EventSubscription { name, .. } => write!(f, "subscribe to event {name}"),
            Self::EventUnsubscription { name, .. } => write!(f, "unsubscribe from event {name}"),
        }
    }
}

/// An [`Access`] stamped with its ledger index.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Globally unique, strictly increasing sequence number
    pub index: u64,
    /// What happened
    pub access: Access,
}

impl Interaction {
    /// Kind of the underlying access.
    pub fn kind(&self) -> InteractionKind {
        self.access.kind()
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.access)
    }
}
