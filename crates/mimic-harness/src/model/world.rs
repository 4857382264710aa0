//! Model mock - the reference implementation.
//!
//! Keeps plain maps and counters, no concurrency, no matchers beyond
//! "exact byte or anything". It is the oracle against which the real mock is
//! verified.

use std::collections::{BTreeMap, HashMap};

use mimic_core::InteractionKind;

use super::{
    kind_name, member_name,
    operation::{Operation, OperationResult, SmallArg},
};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Index the ledger will issue next
    pub next_index: u64,
    /// Recorded interactions per kind name since the last clear
    pub kinds: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
struct ModelSetup {
    member: String,
    arg: Option<SmallArg>,
    values: Vec<i32>,
    cursor: usize,
}

/// Reference mock.
#[derive(Debug, Clone, Default)]
pub struct ModelMock {
    setups: Vec<ModelSetup>,
    properties: HashMap<String, i32>,
    indexer: HashMap<SmallArg, i32>,
    subscriptions: HashMap<String, usize>,
    kinds: BTreeMap<String, usize>,
    next_index: u64,
}

impl ModelMock {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, kind: InteractionKind) {
        *self.kinds.entry(kind_name(kind).to_string()).or_default() += 1;
        self.next_index += 1;
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::SetupReturns { member, arg, values } => {
                self.setups.push(ModelSetup {
                    member: member_name(*member),
                    arg: *arg,
                    values: values.clone(),
                    cursor: 0,
                });
                OperationResult::Ok
            },
            Operation::Invoke { member, arg } => self.apply_invoke(&member_name(*member), *arg),
            Operation::SetProperty { member, value } => {
                self.record(InteractionKind::PropertySet);
                self.properties.insert(member_name(*member), *value);
                OperationResult::Ok
            },
            Operation::GetProperty { member } => {
                self.record(InteractionKind::PropertyGet);
                OperationResult::Value(
                    self.properties.get(&member_name(*member)).copied().unwrap_or_default(),
                )
            },
            Operation::SetIndexer { key, value } => {
                self.record(InteractionKind::IndexerSet);
                self.indexer.insert(*key, *value);
                OperationResult::Ok
            },
            Operation::GetIndexer { key } => {
                self.record(InteractionKind::IndexerGet);
                OperationResult::Value(*self.indexer.entry(*key).or_default())
            },
            Operation::Subscribe { member } => {
                self.record(InteractionKind::EventSubscribe);
                *self.subscriptions.entry(member_name(*member)).or_default() += 1;
                OperationResult::Ok
            },
            Operation::Unsubscribe { member } => {
                self.record(InteractionKind::EventUnsubscribe);
                let count = self.subscriptions.entry(member_name(*member)).or_default();
                let removed = *count > 0;
                if removed {
                    *count -= 1;
                }
                OperationResult::Removed(removed)
            },
            Operation::Raise { member } => OperationResult::Raised(
                self.subscriptions.get(&member_name(*member)).copied().unwrap_or_default(),
            ),
            Operation::ClearInteractions => {
                self.kinds.clear();
                OperationResult::Ok
            },
        }
    }

    fn apply_invoke(&mut self, member: &str, arg: SmallArg) -> OperationResult {
        self.record(InteractionKind::Method);

        let setup = self
            .setups
            .iter_mut()
            .rev()
            .find(|s| s.member == member && s.arg.is_none_or(|a| a == arg));

        let value = match setup {
            Some(setup) if !setup.values.is_empty() => {
                let value = setup.values[setup.cursor % setup.values.len()];
                setup.cursor += 1;
                value
            },
            _ => 0,
        };
        OperationResult::Value(value)
    }

    /// Observable state for comparison with the real mock.
    pub fn observable(&self) -> ObservableState {
        ObservableState { next_index: self.next_index, kinds: self.kinds.clone() }
    }

    /// Number of registered setups.
    pub fn setup_count(&self) -> usize {
        self.setups.len()
    }
}
