use log::debug;
use scrip_core::descriptor::AssetDescriptor;
use scrip_core::error::LedgerError;
use scrip_core::id::PartyId;
use scrip_core::transition::{Intent, Transition};
use scrip_core::unit::Unit;
use scrip_vault::LedgerQuery;
use std::collections::BTreeSet;

/// Assembles candidate transitions against the current ledger view
///
/// The builder resolves live records through the ledger query collaborator,
/// composes the input/output sequences per the contract rules, and attaches
/// the network's notarizing authority. The result is an unsigned transition;
/// it has not been validated or shown to anyone yet.
pub struct TransitionBuilder<'a, Q: LedgerQuery + ?Sized> {
    query: &'a Q,
    notary: PartyId,
}

impl<'a, Q: LedgerQuery + ?Sized> TransitionBuilder<'a, Q> {
    pub fn new(query: &'a Q, notary: PartyId) -> Self {
        Self { query, notary }
    }

    fn require_live_descriptor(&self, symbol: &str) -> Result<AssetDescriptor, LedgerError> {
        self.query
            .find_live_descriptor(symbol)?
            .ok_or_else(|| LedgerError::UnknownDescriptor(symbol.to_string()))
    }

    /// Bring a new asset descriptor on ledger
    pub fn create_descriptor(
        &self,
        symbol: &str,
        valuation: u64,
        maintainer: PartyId,
    ) -> Result<Transition, LedgerError> {
        if self.query.find_live_descriptor(symbol)?.is_some() {
            return Err(LedgerError::StructuralViolation(format!(
                "symbol \"{}\" already has a live descriptor",
                symbol
            )));
        }
        let descriptor = AssetDescriptor::new(maintainer, valuation, symbol);
        let signers: BTreeSet<PartyId> = [maintainer].into_iter().collect();
        Transition::new(
            vec![],
            vec![],
            Some(descriptor),
            Intent::CreateDescriptor,
            signers,
            self.notary,
        )
    }

    /// Supersede the live descriptor version with a new valuation
    pub fn update_valuation(
        &self,
        symbol: &str,
        valuation: u64,
    ) -> Result<Transition, LedgerError> {
        let prior = self.require_live_descriptor(symbol)?;
        let signers: BTreeSet<PartyId> = [prior.maintainer].into_iter().collect();
        Transition::new(
            vec![prior.version_ref()],
            vec![],
            Some(prior.next_version(valuation)),
            Intent::UpdateDescriptor,
            signers,
            self.notary,
        )
    }

    /// Mint new units of a live descriptor to a holder
    pub fn issue(
        &self,
        symbol: &str,
        amount: u64,
        issuer: PartyId,
        holder: PartyId,
    ) -> Result<Transition, LedgerError> {
        let descriptor = self.require_live_descriptor(symbol)?;
        let unit = Unit::new(descriptor.id, issuer, holder, amount)?;
        let signers: BTreeSet<PartyId> = [issuer, holder].into_iter().collect();
        Transition::new(
            vec![],
            vec![unit],
            None,
            Intent::Issue,
            signers,
            self.notary,
        )
    }

    /// Transfer `amount` from `sender` to `recipient`, with change back to
    /// the sender when the selected inputs overshoot
    pub fn move_units(
        &self,
        symbol: &str,
        amount: u64,
        sender: PartyId,
        recipient: PartyId,
    ) -> Result<Transition, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let descriptor = self.require_live_descriptor(symbol)?;
        let (selected, selected_total) =
            self.select_units(&sender, &descriptor, amount)?;

        let issuer = selected[0].issuer;
        let mut produced = vec![Unit::new(descriptor.id, issuer, recipient, amount)?];
        if selected_total > amount {
            produced.push(Unit::new(
                descriptor.id,
                issuer,
                sender,
                selected_total - amount,
            )?);
        }
        debug!(
            "move of {} \"{}\" selects {} unit(s) totalling {}",
            amount,
            symbol,
            selected.len(),
            selected_total
        );

        let consumed = selected.iter().map(|u| u.id).collect();
        let signers: BTreeSet<PartyId> = [sender, recipient].into_iter().collect();
        Transition::new(consumed, produced, None, Intent::Move, signers, self.notary)
    }

    /// Terminally consume every unit the holder has on the descriptor
    pub fn redeem(&self, symbol: &str, holder: PartyId) -> Result<Transition, LedgerError> {
        let descriptor = self.require_live_descriptor(symbol)?;
        let units = self.query.find_live_units(&holder, &descriptor.id)?;
        let Some(first) = units.first() else {
            return Err(LedgerError::StructuralViolation(format!(
                "{} holds no live units of \"{}\" to redeem",
                holder, symbol
            )));
        };

        // Consumed units must share an issuer; units of a descriptor only
        // differ in issuer when the maintainer changed between issues.
        let issuer = first.issuer;
        let consumed = units
            .iter()
            .filter(|u| u.issuer == issuer)
            .map(|u| u.id)
            .collect();
        let signers: BTreeSet<PartyId> = [holder, issuer].into_iter().collect();
        Transition::new(consumed, vec![], None, Intent::Redeem, signers, self.notary)
    }

    /// Select the sender's units oldest-first until the amount is covered
    fn select_units(
        &self,
        sender: &PartyId,
        descriptor: &AssetDescriptor,
        amount: u64,
    ) -> Result<(Vec<Unit>, u64), LedgerError> {
        let units = self.query.find_live_units(sender, &descriptor.id)?;
        let issuer = units.first().map(|u| u.issuer);

        let mut selected = Vec::new();
        let mut selected_total = 0u64;
        let mut available = 0u64;
        for unit in units {
            if Some(unit.issuer) != issuer {
                continue;
            }
            available = available.checked_add(unit.amount).ok_or_else(|| {
                LedgerError::StructuralViolation("unit amounts overflow".to_string())
            })?;
            if selected_total < amount {
                // Bounded by `available`, which was just checked
                selected_total += unit.amount;
                selected.push(unit);
            }
        }
        if selected_total < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        Ok((selected, selected_total))
    }
}
