//! Operations for model-based testing.
//!
//! Operations represent every action a test can take against a mock. They
//! are generated randomly by proptest (or `arbitrary` in fuzzing) and
//! applied to both the model and the real implementation.

use arbitrary::Arbitrary;

/// Member identifier, folded onto [`super::MEMBER_COUNT`] names.
pub type MemberId = u8;

/// Single small argument, keeps collisions between setups and calls likely.
pub type SmallArg = u8;

/// Operations that can be applied to a mock.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Register a method setup returning `values` in round-robin order
    SetupReturns {
        /// Method to set up
        member: MemberId,
        /// Exact argument to match; `None` matches any `u8`
        arg: Option<SmallArg>,
        /// Return sequence. Empty means no producer
        values: Vec<i32>,
    },

    /// Call a method with one argument
    Invoke {
        /// Method to call
        member: MemberId,
        /// Argument
        arg: SmallArg,
    },

    /// Write a property
    SetProperty {
        /// Property to write
        member: MemberId,
        /// Value written
        value: i32,
    },

    /// Read a property
    GetProperty {
        /// Property to read
        member: MemberId,
    },

    /// Write the indexer at `key`
    SetIndexer {
        /// Index argument
        key: SmallArg,
        /// Value written
        value: i32,
    },

    /// Read the indexer at `key`
    GetIndexer {
        /// Index argument
        key: SmallArg,
    },

    /// Subscribe the shared handler to an event
    Subscribe {
        /// Event
        member: MemberId,
    },

    /// Unsubscribe the shared handler from an event
    Unsubscribe {
        /// Event
        member: MemberId,
    },

    /// Raise an event
    Raise {
        /// Event
        member: MemberId,
    },

    /// Drop recorded interactions
    ClearInteractions,
}

/// Result of applying an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation completed without a value
    Ok,
    /// Value produced by a read or call
    Value(i32),
    /// Whether an unsubscription found a subscription
    Removed(bool),
    /// Number of handlers a raise invoked
    Raised(usize),
    /// The real mock returned an error the model never produces
    Failed(String),
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}
