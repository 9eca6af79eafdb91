//! Transaction assembly and the multi-party signing protocol
//!
//! This crate turns intents into transitions and drives them through the
//! propose, counter-sign, notarize, record handshake:
//!
//! - [`builder`]: assembles candidate transitions against a ledger view
//! - [`keys`]: party identities and authorization signing
//! - [`transport`]: point-to-point sessions between participants
//! - [`protocol`]: the flow state machine from `Built` to `Committed`

pub mod builder;
pub mod keys;
pub mod protocol;
pub mod transport;

pub use builder::TransitionBuilder;
pub use keys::{verify_authorization, IdentityService, Keyring};
pub use protocol::{FlowDriver, FlowRun, FlowState};
pub use transport::{
    LocalTransport, Responder, ResponderPolicy, RespondingParty, SessionTransport, SignResponse,
};
