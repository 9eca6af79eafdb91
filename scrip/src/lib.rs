//! Asset-backed fungible token transfers with multi-party authorization
//!
//! scrip is a ledger protocol for issuing, moving and redeeming fungible
//! units denominated against on-ledger asset descriptors. Every update is an
//! atomic transition that must be authorized by all affected parties and
//! arbitrated by a notarizing authority before it commits.
//!
//! The workspace splits into four layers, re-exported here:
//!
//! - [`core`]: the data model, ids, and the pure contract rules
//! - [`vault`]: per-party ledger storage, queries and balances
//! - [`notary`]: the consumption arbiter that prevents double spends
//! - [`flows`]: the transaction builder and the signing protocol

pub use scrip_core as core;
pub use scrip_flows as flows;
pub use scrip_notary as notary;
pub use scrip_vault as vault;

pub use scrip_core::contract::{verify, LedgerView};
pub use scrip_core::descriptor::AssetDescriptor;
pub use scrip_core::error::LedgerError;
pub use scrip_core::id::{PartyId, RecordId, RunId};
pub use scrip_core::transition::{
    Authorization, Intent, SignedTransition, Transition, TransitionHash,
};
pub use scrip_core::unit::Unit;
pub use scrip_flows::{
    FlowDriver, FlowRun, FlowState, Keyring, LocalTransport, Responder, TransitionBuilder,
};
pub use scrip_notary::{InMemoryNotary, Notary, Verdict};
pub use scrip_vault::{BalanceEngine, InMemoryVault, LedgerQuery, TransitionStore};
