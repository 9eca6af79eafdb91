//! Notary (arbiter) interface for the scrip protocol
//!
//! The notary is the sole shared-mutation authority over the "is this record
//! consumed" predicate and therefore the single point of total ordering
//! across concurrently running transitions.

pub mod registry;

pub use registry::{ConsumptionEntry, InMemoryNotary, Notary, Verdict};
