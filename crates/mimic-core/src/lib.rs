//! Mock-object engine.
//!
//! Proxies (hand-written or generated) forward every member access of a
//! simulated type to a [`Mock`]. The mock records the access in its
//! [`Ledger`], resolves the most recently registered setup that accepts it
//! and dispatches that setup's callbacks and return/throw sequence. Tests
//! then verify what happened by querying the ledger.
//!
//! # Architecture
//!
//! - [`value`]: type-erased arguments ([`Value`])
//! - [`matcher`]: predicates over one argument ([`Matcher`]) or a whole
//!   argument vector ([`ArgMatchers`])
//! - [`ledger`]: append-only, totally ordered interaction log
//! - [`setup`] and [`registry`]: expectations and last-match-wins resolution
//! - [`dispatch`]: execution of a matched method setup
//! - [`indexer_store`]: persistent indexer state, keyed by argument tuple
//! - [`verify`]: count and order assertions over recorded interactions
//!
//! Everything is synchronous and `Send + Sync`. A mock may be shared across
//! threads and invoked concurrently.

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod indexer_store;
pub mod interaction;
pub mod ledger;
pub mod matcher;
pub mod mock;
pub mod registry;
pub mod setup;
pub mod value;
pub mod verify;

pub use config::{DefaultValuePolicy, DefaultValues, MockConfig};
pub use dispatch::Dispatch;
pub use error::{BoxError, MockError};
pub use event::{EventHandler, Subscription};
pub use indexer_store::IndexerStore;
pub use interaction::{Access, Interaction, InteractionKind};
pub use ledger::Ledger;
pub use matcher::{ArgMatchers, Matcher, PatternOptions};
pub use mock::Mock;
pub use registry::{SetupKind, SetupRegistry, UnusedSetup};
pub use setup::{
    Behavior, Configure, EventSetup, EventSetupBuilder, IndexerSetup, IndexerSetupBuilder,
    MethodSetup, MethodSetupBuilder, PropertySetup, PropertySetupBuilder,
};
pub use value::{ArgValue, TypeKey, Value};
pub use verify::{Times, VerificationResult};

/// Traits needed to configure setups.
pub mod prelude {
    pub use crate::setup::Configure;
}
