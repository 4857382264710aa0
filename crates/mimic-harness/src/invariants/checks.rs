//! Standard ledger invariants.
//!
//! These capture what must hold for any ledger, not specific scenarios.

use super::{Invariant, InvariantResult, LedgerSnapshot, Violation};

/// Indices strictly increase in ledger order and were all issued.
///
/// A repeated or out-of-order index means two writers raced on the counter
/// or an entry became visible before a lower one.
pub struct IndexMonotonicity;

impl Invariant for IndexMonotonicity {
    fn name(&self) -> &'static str {
        "index_monotonicity"
    }

    fn check(&self, state: &LedgerSnapshot) -> InvariantResult {
        for window in state.entries.windows(2) {
            if window[1].index <= window[0].index {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "index {} recorded after index {}",
                        window[1].index, window[0].index
                    ),
                });
            }
        }

        if let Some(last) = state.entries.last()
            && last.index >= state.next_index
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!("entry {} was never issued (next {})", last.index, state.next_index),
            });
        }
        Ok(())
    }
}

/// Every driven interaction is in the ledger, matched or not.
pub struct LedgerCompleteness;

impl Invariant for LedgerCompleteness {
    fn name(&self) -> &'static str {
        "ledger_completeness"
    }

    fn check(&self, state: &LedgerSnapshot) -> InvariantResult {
        match state.expected_len {
            Some(expected) if expected != state.entries.len() => Err(Violation {
                invariant: self.name(),
                message: format!("expected {expected} entries, found {}", state.entries.len()),
            }),
            _ => Ok(()),
        }
    }
}

/// Per-kind entry counts match what the driver performed.
pub struct KindAccounting;

impl Invariant for KindAccounting {
    fn name(&self) -> &'static str {
        "kind_accounting"
    }

    fn check(&self, state: &LedgerSnapshot) -> InvariantResult {
        let Some(expected) = &state.expected_kinds else {
            return Ok(());
        };

        let mut expected = expected.clone();
        expected.retain(|_, count| *count > 0);
        let actual = state.kind_counts();

        if actual != expected {
            return Err(Violation {
                invariant: self.name(),
                message: format!("expected kinds {expected:?}, found {actual:?}"),
            });
        }
        Ok(())
    }
}
