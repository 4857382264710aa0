//! Test harness for the mimic engine.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of a small mock
//! surface. Operations are applied to both the model and a real
//! [`mimic_core::Mock`], and their results and observable ledger state are
//! compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties of the interaction ledger that
//! must hold after any sequence of operations, from any number of threads.
//! Use [`InvariantRegistry::standard()`] for the ledger invariants.
//!
//! # Concurrent Workloads
//!
//! [`Workload`] drives one shared mock from several threads with seeded
//! random operations and reports what it did, so the ledger can be checked
//! against the tally afterwards.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod logging;
pub mod model;
pub mod workload;

pub use invariants::{
    EntrySnapshot, IndexMonotonicity, Invariant, InvariantRegistry, InvariantResult,
    KindAccounting, LedgerCompleteness, LedgerSnapshot, Violation,
};
pub use logging::init_test_logging;
pub use model::{
    MemberId, ModelMock, ObservableState, Operation, OperationResult, SmallArg, kind_name,
    member_name,
};
pub use workload::{Workload, WorkloadConfig, WorkloadReport};
