use crate::traits::LedgerQuery;
use scrip_core::error::LedgerError;
use scrip_core::id::PartyId;

/// Aggregates live units into per-owner, per-descriptor balances
pub struct BalanceEngine<'a, Q: LedgerQuery + ?Sized> {
    query: &'a Q,
}

impl<'a, Q: LedgerQuery + ?Sized> BalanceEngine<'a, Q> {
    pub fn new(query: &'a Q) -> Self {
        Self { query }
    }

    /// Sum of all live units held by `owner` whose descriptor matches
    /// `symbol`
    ///
    /// Returns 0 (not an error) when no matching units exist. Fails with
    /// `UnknownDescriptor` only if the symbol itself has never existed.
    pub fn balance_of(&self, owner: &PartyId, symbol: &str) -> Result<u64, LedgerError> {
        match self.query.find_live_descriptor(symbol)? {
            Some(descriptor) => self
                .query
                .find_live_units(owner, &descriptor.id)?
                .iter()
                .try_fold(0u64, |acc, u| acc.checked_add(u.amount))
                .ok_or_else(|| {
                    LedgerError::StructuralViolation("holdings overflow".to_string())
                }),
            None if self.query.symbol_exists(symbol)? => Ok(0),
            None => Err(LedgerError::UnknownDescriptor(symbol.to_string())),
        }
    }
}
