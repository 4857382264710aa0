//! Append-only interaction ledger with total ordering.
//!
//! Assigns a monotonic index to every interaction, enforcing a total order
//! across all threads calling into one mock. The index is taken while the
//! append lock is held, so the order entries become visible in always
//! agrees with index order.
//!
//! `clear` drops the recorded entries but never rewinds the counter: an
//! index, once issued, is never issued again.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::interaction::{Access, Interaction, InteractionKind};

/// Thread-safe log of every interaction against one mock.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: RwLock<Vec<Interaction>>,
    next_index: AtomicU64,
}

impl Ledger {
    /// Create an empty ledger starting at index 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access and return it stamped with its index.
    ///
    /// # Invariants
    ///
    /// - Post: the returned index is greater than every previously issued one
    /// - Post: the entry is visible to readers after all lower indices
    pub fn register(&self, access: Access) -> Interaction {
        let mut entries = self.entries.write();
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);

        debug_assert!(entries.last().is_none_or(|last| last.index < index));

        let interaction = Interaction { index, access };
        tracing::trace!(index, kind = ?interaction.kind(), "recorded interaction");
        entries.push(interaction.clone());
        interaction
    }

    /// Index the next registration will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index.load(Ordering::SeqCst)
    }

    /// Snapshot of all recorded interactions in index order.
    pub fn all(&self) -> Vec<Interaction> {
        self.entries.read().clone()
    }

    /// Snapshot of recorded interactions of one kind, in index order.
    pub fn of_kind(&self, kind: InteractionKind) -> Vec<Interaction> {
        self.entries.read().iter().filter(|i| i.kind() == kind).cloned().collect()
    }

    /// Recorded interactions accepted by `predicate`, in index order.
    pub fn filter(&self, predicate: impl Fn(&Interaction) -> bool) -> Vec<Interaction> {
        self.entries.read().iter().filter(|i| predicate(i)).cloned().collect()
    }

    /// Whether any recorded interaction satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&Interaction) -> bool) -> bool {
        self.entries.read().iter().any(predicate)
    }

    /// Number of recorded interactions.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been recorded since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop all recorded interactions. Issued indices are not reused.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        tracing::debug!(dropped = entries.len(), next_index = self.next_index(), "clearing ledger");
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::{args, value::Value};

    fn call(name: &str) -> Access {
        Access::MethodInvocation { name: name.to_string(), args: args![1] }
    }

    #[test]
    fn indices_are_sequential() {
        let ledger = Ledger::new();
        for i in 0..3 {
            let recorded = ledger.register(call("Foo"));
            assert_eq!(recorded.index, i);
        }
        assert_eq!(ledger.next_index(), 3);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn of_kind_filters() {
        let ledger = Ledger::new();
        ledger.register(call("Foo"));
        ledger.register(Access::PropertyGetterAccess { name: "Bar".to_string() });
        ledger.register(call("Baz"));

        let methods = ledger.of_kind(InteractionKind::Method);
        assert_eq!(methods.iter().map(|i| i.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(ledger.of_kind(InteractionKind::PropertyGet).len(), 1);
        assert!(ledger.of_kind(InteractionKind::IndexerSet).is_empty());
    }

    #[test]
    fn clear_does_not_reuse_indices() {
        let ledger = Ledger::new();
        ledger.register(call("Foo"));
        ledger.register(call("Foo"));
        ledger.clear();

        assert!(ledger.is_empty());
        let recorded = ledger.register(Access::IndexerGetterAccess { args: vec![Value::new(1)] });
        assert_eq!(recorded.index, 2);
    }

    #[test]
    fn concurrent_writers_get_unique_ordered_indices() {
        let ledger = Arc::new(Ledger::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..250 {
                        ledger.register(call("Foo"));
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().expect("writer thread panicked");
        }

        let all = ledger.all();
        assert_eq!(all.len(), 2000);
        assert!(all.windows(2).all(|w| w[0].index < w[1].index));
        assert_eq!(all.last().map(|i| i.index), Some(1999));
    }
}
