use crate::descriptor::AssetDescriptor;
use crate::error::LedgerError;
use crate::id::{PartyId, RecordId};
use crate::unit::Unit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Transition hash type (32-byte array)
pub type TransitionHash = [u8; 32];

/// The intent command carried by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Bring a new asset descriptor on ledger
    CreateDescriptor,
    /// Supersede the live descriptor version with the next one on the same id
    UpdateDescriptor,
    /// Mint new units against a live descriptor
    Issue,
    /// Transfer units between holders, conserving the total amount
    Move,
    /// Terminally consume units with no replacement
    Redeem,
}

/// A proposed or committed atomic ledger update
///
/// A transition is immutable once constructed: its hash is computed over all
/// of its fields at construction time and is the payload every required
/// signer authorizes. It is either wholly committed (all consumed records
/// become spent, all produced records become live) or wholly rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    /// Records consumed by this transition, in input order
    pub consumed: Vec<RecordId>,

    /// Units produced by this transition, in output order
    pub produced_units: Vec<Unit>,

    /// Descriptor version produced by this transition, if any
    pub produced_descriptor: Option<AssetDescriptor>,

    /// What this transition intends to do
    pub intent: Intent,

    /// Every party whose authorization is required before notarization
    pub required_signers: BTreeSet<PartyId>,

    /// The notarizing authority that will arbitrate consumption
    pub notary: PartyId,

    /// Hash over all fields above, fixed at construction
    hash: TransitionHash,
}

impl Transition {
    /// Construct a transition and fix its hash
    pub fn new(
        consumed: Vec<RecordId>,
        produced_units: Vec<Unit>,
        produced_descriptor: Option<AssetDescriptor>,
        intent: Intent,
        required_signers: BTreeSet<PartyId>,
        notary: PartyId,
    ) -> Result<Self, LedgerError> {
        let hash = Self::compute_hash(
            &consumed,
            &produced_units,
            &produced_descriptor,
            &intent,
            &required_signers,
            &notary,
        )?;
        Ok(Self {
            consumed,
            produced_units,
            produced_descriptor,
            intent,
            required_signers,
            notary,
            hash,
        })
    }

    fn compute_hash(
        consumed: &[RecordId],
        produced_units: &[Unit],
        produced_descriptor: &Option<AssetDescriptor>,
        intent: &Intent,
        required_signers: &BTreeSet<PartyId>,
        notary: &PartyId,
    ) -> Result<TransitionHash, LedgerError> {
        let payload = bincode::serialize(&(
            consumed,
            produced_units,
            produced_descriptor,
            intent,
            required_signers,
            notary,
        ))?;
        Ok(*blake3::hash(&payload).as_bytes())
    }

    /// The hash every required signer authorizes
    pub fn hash(&self) -> &TransitionHash {
        &self.hash
    }

    /// Whether the given party must sign before notarization
    pub fn requires_signer(&self, party: &PartyId) -> bool {
        self.required_signers.contains(party)
    }

    /// Sum of produced unit amounts, or `None` when the sum overflows
    pub fn produced_total(&self) -> Option<u64> {
        self.produced_units
            .iter()
            .try_fold(0u64, |acc, u| acc.checked_add(u.amount))
    }
}

/// A single party's cryptographic authorization over a transition hash
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authorization {
    /// The party that produced this authorization
    pub party: PartyId,

    /// Signature bytes over the transition hash
    pub signature: Vec<u8>,
}

/// A transition together with the authorizations collected so far
///
/// Starts with the initiator's signature and grows as counterparties return
/// theirs; counterparties may respond in any order. Fully signed once every
/// party in `required_signers` is covered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedTransition {
    transition: Transition,
    authorizations: Vec<Authorization>,
}

impl SignedTransition {
    /// Wrap an unsigned transition
    pub fn new(transition: Transition) -> Self {
        Self {
            transition,
            authorizations: Vec::new(),
        }
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    pub fn authorizations(&self) -> &[Authorization] {
        &self.authorizations
    }

    /// Attach an authorization, replacing any earlier one from the same party
    pub fn add_authorization(&mut self, auth: Authorization) {
        self.authorizations.retain(|a| a.party != auth.party);
        self.authorizations.push(auth);
    }

    /// Whether the given party has already signed
    pub fn is_signed_by(&self, party: &PartyId) -> bool {
        self.authorizations.iter().any(|a| a.party == *party)
    }

    /// Required signers with no authorization attached yet
    pub fn missing_signers(&self) -> Vec<PartyId> {
        self.transition
            .required_signers
            .iter()
            .filter(|p| !self.is_signed_by(p))
            .copied()
            .collect()
    }

    /// Whether every required signer has authorized the transition
    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }
}
