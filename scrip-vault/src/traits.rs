use scrip_core::descriptor::AssetDescriptor;
use scrip_core::error::LedgerError;
use scrip_core::id::{PartyId, RecordId};
use scrip_core::transition::SignedTransition;
use scrip_core::unit::Unit;

/// Indexed query interface over a participant's ledger view
///
/// Implementations index descriptors by symbol and units by
/// (holder, descriptor), with symbol uniqueness enforced at write time.
pub trait LedgerQuery {
    /// Find the live descriptor for a symbol
    ///
    /// Returns `Ok(None)` when the symbol has never been created.
    /// Implementations must detect a corrupt index and return
    /// `AmbiguousRecord` when more than one live descriptor matches;
    /// symbols are unique at write time, so a duplicate indicates a prior
    /// invariant violation and is fatal, not retried.
    fn find_live_descriptor(&self, symbol: &str) -> Result<Option<AssetDescriptor>, LedgerError>;

    /// All live units held by `owner` against the given descriptor,
    /// oldest first
    fn find_live_units(
        &self,
        owner: &PartyId,
        descriptor_id: &RecordId,
    ) -> Result<Vec<Unit>, LedgerError>;

    /// Whether the symbol has ever had a descriptor, live or superseded
    fn symbol_exists(&self, symbol: &str) -> Result<bool, LedgerError>;
}

/// Durable sink for committed transitions
pub trait TransitionStore {
    /// Apply a committed transition to this participant's view
    ///
    /// Consumed records become spent, produced records become live, and the
    /// transition is appended to the log. The application is atomic: on any
    /// error the view is unchanged. Recording the same transition twice is a
    /// no-op.
    fn record(&self, signed: &SignedTransition) -> Result<(), LedgerError>;
}
