//! Vault storage and ledger query for the scrip protocol
//!
//! The vault holds each participant's view of the ledger: live descriptors
//! and units, the consumed set, and an append-only log of committed
//! transitions. The protocol core consumes it through the [`LedgerQuery`] and
//! [`TransitionStore`] traits; [`InMemoryVault`] is the reference
//! implementation used in tests and single-process deployments.

pub mod balance;
pub mod memory;
pub mod traits;

pub use balance::BalanceEngine;
pub use memory::{CommittedTransition, InMemoryVault};
pub use traits::{LedgerQuery, TransitionStore};
