//! Invariant checking over interaction ledgers.
//!
//! Invariants are properties that must always hold for a mock's ledger,
//! whatever sequence of calls produced it and however many threads made
//! them.
//!
//! # Architecture
//!
//! The ledger of a mock is captured into a [`LedgerSnapshot`], optionally
//! annotated with what the driver expects to find, then every registered
//! [`Invariant`] is checked against it.
//!
//! # Usage
//!
//! ```
//! use mimic_core::{Mock, args};
//! use mimic_harness::{InvariantRegistry, LedgerSnapshot};
//!
//! let mock = Mock::default();
//! let _ = mock.invoke("Foo", args![1]);
//!
//! let snapshot = LedgerSnapshot::capture(&mock).with_expected_len(1);
//! assert!(InvariantRegistry::standard().check_all(&snapshot).is_ok());
//! ```

mod checks;
mod snapshot;

pub use checks::{IndexMonotonicity, KindAccounting, LedgerCompleteness};
pub use snapshot::{EntrySnapshot, LedgerSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against a ledger snapshot.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &LedgerSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the ledger invariants.
    ///
    /// Includes:
    /// - [`IndexMonotonicity`]: indices strictly increase and were issued
    /// - [`LedgerCompleteness`]: one entry per driven interaction
    /// - [`KindAccounting`]: per-kind counts match what was driven
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(IndexMonotonicity);
        registry.add(LedgerCompleteness);
        registry.add(KindAccounting);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given snapshot.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &LedgerSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &LedgerSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
