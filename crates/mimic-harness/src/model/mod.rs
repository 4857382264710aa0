//! Reference model for model-based testing.
//!
//! [`ModelMock`] is a deliberately naive re-implementation of a small mock
//! surface: methods returning `i32` with round-robin sequences, `i32`
//! properties and indexers keyed by one byte, and event subscriptions.
//! Operations are applied to both the model and a real mock, and their
//! results and observable state must agree.

mod operation;
mod world;

use mimic_core::InteractionKind;

pub use operation::{MemberId, Operation, OperationResult, SmallArg};
pub use world::{ModelMock, ObservableState};

/// Number of distinct member names the model uses.
pub const MEMBER_COUNT: u8 = 4;

/// Member name for a model member id, e.g. `M2`.
pub fn member_name(member: MemberId) -> String {
    format!("M{}", member % MEMBER_COUNT)
}

/// Stable snake-case name of an interaction kind.
pub fn kind_name(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Method => "method",
        InteractionKind::PropertyGet => "property_get",
        InteractionKind::PropertySet => "property_set",
        InteractionKind::IndexerGet => "indexer_get",
        InteractionKind::IndexerSet => "indexer_set",
        InteractionKind::EventSubscribe => "event_subscribe",
        InteractionKind::EventUnsubscribe => "event_unsubscribe",
    }
}
