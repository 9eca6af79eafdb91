use crate::keys::{verify_authorization, IdentityService, Keyring};
use log::{debug, warn};
use scrip_core::contract::{self, LedgerView};
use scrip_core::error::LedgerError;
use scrip_core::id::PartyId;
use scrip_core::transition::{Authorization, SignedTransition, Transition};
use scrip_vault::TransitionStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A counterparty's answer to a signature request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignResponse {
    /// The counterparty validated the proposal and counter-signed it
    Signed(Authorization),
    /// The counterparty declined, with its reason
    Refused(String),
}

/// Point-to-point session transport between protocol participants
///
/// Reliable and ordered per pair; used only while collecting
/// counter-signatures and distributing the finalized transition. Transport
/// failures surface as `CounterpartyUnavailable` and are the caller's
/// responsibility to retry with a freshly built transition.
pub trait SessionTransport {
    /// Ask a required signer to validate and counter-sign the proposal
    fn request_signature(
        &self,
        party: &PartyId,
        proposal: &SignedTransition,
    ) -> Result<SignResponse, LedgerError>;

    /// Hand the finalized, notarized transition to a participant for
    /// recording
    fn distribute(
        &self,
        party: &PartyId,
        finalized: &SignedTransition,
    ) -> Result<(), LedgerError>;
}

/// A party reachable over a [`LocalTransport`]
pub trait RespondingParty: Send + Sync {
    fn party(&self) -> PartyId;

    /// Validate a proposal against this party's own ledger view and either
    /// counter-sign or refuse
    fn handle_proposal(&self, proposal: &SignedTransition) -> SignResponse;

    /// Record a finalized transition in this party's vault
    fn record_finalized(&self, finalized: &SignedTransition) -> Result<(), LedgerError>;
}

/// Local policy hook consulted by a responder after contract validation
pub type ResponderPolicy = dyn Fn(&Transition) -> Result<(), String> + Send + Sync;

/// Standard counterparty behavior for the signing handshake
///
/// Re-runs contract validation against the responder's own vault, checks
/// every already-attached authorization, applies the local policy, and only
/// then signs. No party signs a transition it has not independently
/// re-validated.
pub struct Responder<V> {
    party: PartyId,
    vault: Arc<V>,
    keys: Arc<Keyring>,
    policy: Option<Box<ResponderPolicy>>,
}

impl<V: LedgerView + TransitionStore> Responder<V> {
    pub fn new(party: PartyId, vault: Arc<V>, keys: Arc<Keyring>) -> Self {
        Self {
            party,
            vault,
            keys,
            policy: None,
        }
    }

    /// Attach a local policy consulted before signing
    pub fn with_policy(
        mut self,
        policy: impl Fn(&Transition) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }
}

impl<V: LedgerView + TransitionStore + Send + Sync> RespondingParty for Responder<V> {
    fn party(&self) -> PartyId {
        self.party
    }

    fn handle_proposal(&self, proposal: &SignedTransition) -> SignResponse {
        let tx = proposal.transition();

        if let Err(e) = contract::verify(tx, self.vault.as_ref()) {
            warn!("{} refusing proposal: {}", self.party, e);
            return SignResponse::Refused(e.to_string());
        }

        for auth in proposal.authorizations() {
            if !verify_authorization(auth, &auth.party, tx.hash()) {
                warn!(
                    "{} refusing proposal: bad authorization from {}",
                    self.party, auth.party
                );
                return SignResponse::Refused(format!(
                    "authorization from {} does not verify",
                    auth.party
                ));
            }
        }

        if let Some(policy) = &self.policy {
            if let Err(reason) = policy(tx) {
                warn!("{} refusing proposal on policy: {}", self.party, reason);
                return SignResponse::Refused(reason);
            }
        }

        match self.keys.sign(&self.party, tx.hash()) {
            Ok(auth) => {
                debug!("{} counter-signed transition", self.party);
                SignResponse::Signed(auth)
            }
            Err(e) => SignResponse::Refused(e.to_string()),
        }
    }

    fn record_finalized(&self, finalized: &SignedTransition) -> Result<(), LedgerError> {
        self.vault.record(finalized)
    }
}

/// In-process transport routing proposals to registered responders
///
/// Stands in for the network layer in tests and single-process deployments;
/// an unregistered party behaves exactly like an unreachable one.
#[derive(Default)]
pub struct LocalTransport {
    peers: Mutex<HashMap<PartyId, Arc<dyn RespondingParty>>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a responder as reachable
    pub fn register(&self, responder: Arc<dyn RespondingParty>) {
        self.lock().insert(responder.party(), responder);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PartyId, Arc<dyn RespondingParty>>> {
        self.peers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn peer(&self, party: &PartyId) -> Result<Arc<dyn RespondingParty>, LedgerError> {
        self.lock()
            .get(party)
            .cloned()
            .ok_or_else(|| LedgerError::CounterpartyUnavailable {
                party: *party,
                reason: "no session with party".to_string(),
            })
    }
}

impl SessionTransport for LocalTransport {
    fn request_signature(
        &self,
        party: &PartyId,
        proposal: &SignedTransition,
    ) -> Result<SignResponse, LedgerError> {
        Ok(self.peer(party)?.handle_proposal(proposal))
    }

    fn distribute(
        &self,
        party: &PartyId,
        finalized: &SignedTransition,
    ) -> Result<(), LedgerError> {
        self.peer(party)?.record_finalized(finalized)
    }
}
