//! Ledger snapshots for invariant checking.
//!
//! A snapshot copies the observable part of a mock's ledger at one point in
//! time, so invariants run against a consistent view while other threads
//! may still be calling into the mock. Snapshots serialise to JSON for
//! snapshot tests.

use std::collections::BTreeMap;

use mimic_core::{Interaction, Mock};
use serde::Serialize;

use crate::model::kind_name;

/// One recorded interaction, reduced to what invariants look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    /// Ledger index
    pub index: u64,
    /// Interaction kind name, e.g. `method`
    pub kind: String,
    /// Member name. `None` for indexers
    pub member: Option<String>,
    /// Display form of the access
    pub access: String,
}

impl From<&Interaction> for EntrySnapshot {
    fn from(interaction: &Interaction) -> Self {
        Self {
            index: interaction.index,
            kind: kind_name(interaction.kind()).to_string(),
            member: interaction.access.name().map(str::to_string),
            access: interaction.access.to_string(),
        }
    }
}

/// Snapshot of a ledger plus what the driver expects it to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    /// Recorded entries in ledger order
    pub entries: Vec<EntrySnapshot>,
    /// Index the ledger will issue next
    pub next_index: u64,
    /// Number of interactions the driver performed since the last clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_len: Option<usize>,
    /// Interactions per kind the driver performed since the last clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_kinds: Option<BTreeMap<String, usize>>,
}

impl LedgerSnapshot {
    /// Capture the ledger of `mock`.
    ///
    /// `next_index` is read after the entries, so it is never behind them.
    pub fn capture(mock: &Mock) -> Self {
        let entries = mock.interactions().iter().map(EntrySnapshot::from).collect();
        Self { entries, next_index: mock.ledger().next_index(), ..Self::default() }
    }

    /// Expect exactly `len` entries.
    pub fn with_expected_len(mut self, len: usize) -> Self {
        self.expected_len = Some(len);
        self
    }

    /// Expect these per-kind counts. Kinds not listed are expected to be
    /// absent.
    pub fn with_expected_kinds(mut self, kinds: BTreeMap<String, usize>) -> Self {
        self.expected_kinds = Some(kinds);
        self
    }

    /// Entry count per kind name.
    pub fn kind_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.kind.clone()).or_default() += 1;
        }
        counts
    }
}
