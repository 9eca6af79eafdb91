use crate::descriptor::AssetDescriptor;
use crate::error::LedgerError;
use crate::id::{PartyId, RecordId};
use crate::transition::{Intent, Transition};
use crate::unit::Unit;

/// Read-only view over the live records of a ledger
///
/// "Live" means committed and not yet consumed. Every party validates a
/// transition against its own view; the view supplies resolution only, all
/// judgement lives in [`verify`].
pub trait LedgerView {
    /// Resolve a descriptor id to its live version
    fn descriptor(&self, id: &RecordId) -> Option<AssetDescriptor>;

    /// Resolve a symbol to its live descriptor
    fn descriptor_by_symbol(&self, symbol: &str) -> Option<AssetDescriptor>;

    /// Resolve a unit id to the live unit record
    fn unit(&self, id: &RecordId) -> Option<Unit>;
}

/// Determine the structural validity of a transition, independent of any
/// party's consent
///
/// Pure and deterministic: the same transition checked against the same
/// ledger view always yields the same verdict. It runs once locally before
/// the signing handshake and again, identically, by every counterparty asked
/// to sign; no party signs a transition it has not independently re-validated.
pub fn verify(tx: &Transition, view: &dyn LedgerView) -> Result<(), LedgerError> {
    match tx.intent {
        Intent::CreateDescriptor => verify_create_descriptor(tx, view),
        Intent::UpdateDescriptor => verify_update_descriptor(tx, view),
        Intent::Issue => verify_issue(tx, view),
        Intent::Move => verify_move(tx, view),
        Intent::Redeem => verify_redeem(tx, view),
    }
}

fn require_signer(tx: &Transition, party: &PartyId) -> Result<(), LedgerError> {
    if tx.requires_signer(party) {
        Ok(())
    } else {
        Err(LedgerError::MissingSignature(*party))
    }
}

fn require_no_descriptor_output(tx: &Transition) -> Result<(), LedgerError> {
    if tx.produced_descriptor.is_some() {
        return Err(LedgerError::StructuralViolation(format!(
            "{:?} transition must not produce a descriptor",
            tx.intent
        )));
    }
    Ok(())
}

/// Resolve the consumed inputs of a unit-consuming transition and check that
/// they form one coherent group: same descriptor, same holder, same issuer.
fn resolve_consumed_units(
    tx: &Transition,
    view: &dyn LedgerView,
) -> Result<Vec<Unit>, LedgerError> {
    if tx.consumed.is_empty() {
        return Err(LedgerError::StructuralViolation(format!(
            "{:?} transition must consume at least one unit",
            tx.intent
        )));
    }

    let mut units = Vec::with_capacity(tx.consumed.len());
    for id in &tx.consumed {
        let unit = view.unit(id).ok_or_else(|| {
            LedgerError::StructuralViolation(format!("consumed unit {} is not live", id))
        })?;
        units.push(unit);
    }

    let first = &units[0];
    for unit in &units[1..] {
        if unit.descriptor_ref != first.descriptor_ref {
            return Err(LedgerError::StructuralViolation(
                "consumed units reference different descriptors".to_string(),
            ));
        }
        if unit.holder != first.holder {
            return Err(LedgerError::StructuralViolation(
                "consumed units have different holders".to_string(),
            ));
        }
        if unit.issuer != first.issuer {
            return Err(LedgerError::StructuralViolation(
                "consumed units have different issuers".to_string(),
            ));
        }
    }
    Ok(units)
}

fn verify_create_descriptor(tx: &Transition, view: &dyn LedgerView) -> Result<(), LedgerError> {
    if !tx.consumed.is_empty() || !tx.produced_units.is_empty() {
        return Err(LedgerError::StructuralViolation(
            "CreateDescriptor consumes nothing and produces no units".to_string(),
        ));
    }
    let desc = tx.produced_descriptor.as_ref().ok_or_else(|| {
        LedgerError::StructuralViolation(
            "CreateDescriptor must produce exactly one descriptor".to_string(),
        )
    })?;
    if desc.schema_version != 0 {
        return Err(LedgerError::StructuralViolation(
            "new descriptor must start at schema version 0".to_string(),
        ));
    }
    // At most one live descriptor per symbol, checked again at write time
    if view.descriptor_by_symbol(&desc.symbol).is_some() {
        return Err(LedgerError::StructuralViolation(format!(
            "symbol \"{}\" already has a live descriptor",
            desc.symbol
        )));
    }
    if tx.required_signers.len() != 1 {
        return Err(LedgerError::StructuralViolation(
            "CreateDescriptor requires exactly one signer".to_string(),
        ));
    }
    require_signer(tx, &desc.maintainer)
}

fn verify_update_descriptor(tx: &Transition, view: &dyn LedgerView) -> Result<(), LedgerError> {
    if tx.consumed.len() != 1 || !tx.produced_units.is_empty() {
        return Err(LedgerError::StructuralViolation(
            "UpdateDescriptor consumes one descriptor and produces no units".to_string(),
        ));
    }
    let produced = tx.produced_descriptor.as_ref().ok_or_else(|| {
        LedgerError::StructuralViolation(
            "UpdateDescriptor must produce the successor descriptor".to_string(),
        )
    })?;
    let prior = view
        .descriptor(&produced.id)
        .ok_or_else(|| LedgerError::UnknownDescriptor(produced.id.to_string()))?;

    // The consumed input is the prior version's ref, not the chain id; the
    // chain id stays live across every update.
    if tx.consumed[0] != prior.version_ref() {
        return Err(LedgerError::StructuralViolation(
            "descriptor update must consume the live version".to_string(),
        ));
    }
    if produced.symbol != prior.symbol || produced.maintainer != prior.maintainer {
        return Err(LedgerError::StructuralViolation(
            "descriptor symbol and maintainer are fixed across versions".to_string(),
        ));
    }
    if produced.schema_version != prior.schema_version + 1 {
        return Err(LedgerError::StructuralViolation(
            "descriptor update must increment the schema version by one".to_string(),
        ));
    }
    require_signer(tx, &prior.maintainer)
}

fn verify_issue(tx: &Transition, view: &dyn LedgerView) -> Result<(), LedgerError> {
    if !tx.consumed.is_empty() {
        return Err(LedgerError::StructuralViolation(
            "Issue consumes no inputs".to_string(),
        ));
    }
    require_no_descriptor_output(tx)?;
    if tx.produced_units.len() != 1 {
        return Err(LedgerError::StructuralViolation(
            "Issue produces exactly one unit".to_string(),
        ));
    }
    let unit = &tx.produced_units[0];
    if unit.amount == 0 {
        return Err(LedgerError::InvalidAmount(unit.amount));
    }
    let desc = view
        .descriptor(&unit.descriptor_ref)
        .ok_or_else(|| LedgerError::UnknownDescriptor(unit.descriptor_ref.to_string()))?;
    // An issuer other than the descriptor maintainer has no right to mint;
    // this is a hard failure, never a warning.
    if unit.issuer != desc.maintainer {
        return Err(LedgerError::StructuralViolation(format!(
            "{} is not authorized to issue units of \"{}\"",
            unit.issuer, desc.symbol
        )));
    }
    require_signer(tx, &unit.issuer)?;
    require_signer(tx, &unit.holder)
}

fn verify_move(tx: &Transition, view: &dyn LedgerView) -> Result<(), LedgerError> {
    require_no_descriptor_output(tx)?;
    let consumed = resolve_consumed_units(tx, view)?;

    if tx.produced_units.is_empty() {
        return Err(LedgerError::StructuralViolation(
            "Move must produce at least one unit".to_string(),
        ));
    }
    for unit in &tx.produced_units {
        if unit.amount == 0 {
            return Err(LedgerError::InvalidAmount(unit.amount));
        }
        if unit.descriptor_ref != consumed[0].descriptor_ref {
            return Err(LedgerError::StructuralViolation(
                "produced units must reference the consumed descriptor".to_string(),
            ));
        }
        if unit.issuer != consumed[0].issuer {
            return Err(LedgerError::StructuralViolation(
                "a move cannot change the issuer of a unit".to_string(),
            ));
        }
    }

    let consumed_total = consumed
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.amount))
        .ok_or_else(|| {
            LedgerError::StructuralViolation("consumed amounts overflow".to_string())
        })?;
    let produced_total = tx.produced_total().ok_or_else(|| {
        LedgerError::StructuralViolation("produced amounts overflow".to_string())
    })?;
    if consumed_total != produced_total {
        return Err(LedgerError::AmountMismatch {
            consumed: consumed_total,
            produced: produced_total,
        });
    }

    require_signer(tx, &consumed[0].holder)?;
    for unit in &tx.produced_units {
        require_signer(tx, &unit.holder)?;
    }
    Ok(())
}

fn verify_redeem(tx: &Transition, view: &dyn LedgerView) -> Result<(), LedgerError> {
    require_no_descriptor_output(tx)?;
    let consumed = resolve_consumed_units(tx, view)?;

    if !tx.produced_units.is_empty() {
        return Err(LedgerError::StructuralViolation(
            "Redeem produces no replacement units".to_string(),
        ));
    }
    // Redemption needs both the holder giving the units up and the issuer
    // taking them back.
    require_signer(tx, &consumed[0].holder)?;
    require_signer(tx, &consumed[0].issuer)
}
