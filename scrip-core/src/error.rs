use crate::id::{PartyId, RecordId};
use thiserror::Error;

/// Represents all possible errors raised by the scrip protocol
///
/// The validation variants (structural rules, amounts, signatures) are always
/// fail-fast: once one is raised no network or notary interaction happens for
/// that transition. The transport variants are retryable by the caller, but
/// only with a freshly rebuilt transition against a current ledger view.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The transition's shape violates the contract rules for its intent
    #[error("structural violation: {0}")]
    StructuralViolation(String),

    /// A unit amount was not strictly positive
    #[error("unit amount must be positive, got {0}")]
    InvalidAmount(u64),

    /// A descriptor pointer or symbol did not resolve to a live descriptor
    #[error("unknown descriptor: {0}")]
    UnknownDescriptor(String),

    /// More than one live descriptor matched a symbol
    ///
    /// Symbols are unique at write time, so this indicates a prior invariant
    /// violation. It is fatal and never retried.
    #[error("ambiguous record: more than one live descriptor for symbol \"{0}\"")]
    AmbiguousRecord(String),

    /// A required party is absent from the collected signatures
    #[error("missing signature from {0}")]
    MissingSignature(PartyId),

    /// Consumed and produced totals differ on a conserving transition
    #[error("amount mismatch: consumed {consumed}, produced {produced}")]
    AmountMismatch { consumed: u64, produced: u64 },

    /// The holder's live units do not cover the requested amount
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    /// A counterparty validated the proposal and declined to sign it
    #[error("counterparty {party} refused to sign: {reason}")]
    CounterpartyRefused { party: PartyId, reason: String },

    /// The notary saw a consumed input already spent by an earlier transition
    ///
    /// This verdict is authoritative; no participant may override it.
    #[error("double-spend conflict on {0}")]
    DoubleSpendConflict(RecordId),

    /// A counterparty could not be reached during signature collection
    #[error("counterparty {party} unavailable: {reason}")]
    CounterpartyUnavailable { party: PartyId, reason: String },

    /// The notary could not be reached
    #[error("arbiter unavailable: {0}")]
    ArbiterUnavailable(String),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Key lookup or signature construction errors
    #[error("signature error: {0}")]
    Signature(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl LedgerError {
    /// Whether the caller may retry after rebuilding the transition
    ///
    /// Only transport failures qualify. Validation failures require changed
    /// inputs and the notary's double-spend verdict is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::CounterpartyUnavailable { .. } | LedgerError::ArbiterUnavailable(_)
        )
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let party = PartyId::from_bytes([7; 32]);

        assert!(LedgerError::CounterpartyUnavailable {
            party,
            reason: "timeout".to_string(),
        }
        .is_retryable());
        assert!(LedgerError::ArbiterUnavailable("timeout".to_string()).is_retryable());

        assert!(!LedgerError::MissingSignature(party).is_retryable());
        assert!(!LedgerError::DoubleSpendConflict(RecordId::default()).is_retryable());
        assert!(!LedgerError::InvalidAmount(0).is_retryable());
    }
}
