pub mod contract;
pub mod descriptor;
pub mod error;
pub mod id;
pub mod transition;
pub mod unit;

// Re-export the main types for convenience
pub use contract::{verify, LedgerView};
pub use descriptor::AssetDescriptor;
pub use error::LedgerError;
pub use id::{PartyId, RecordId, RunId};
pub use transition::{Authorization, Intent, SignedTransition, Transition, TransitionHash};
pub use unit::Unit;
