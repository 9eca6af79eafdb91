use crate::traits::{LedgerQuery, TransitionStore};
use chrono::{DateTime, Utc};
use log::{debug, info};
use scrip_core::contract::LedgerView;
use scrip_core::descriptor::AssetDescriptor;
use scrip_core::error::LedgerError;
use scrip_core::id::{PartyId, RecordId};
use scrip_core::transition::{Intent, SignedTransition};
use scrip_core::unit::Unit;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A committed transition as recorded by one participant
#[derive(Debug, Clone)]
pub struct CommittedTransition {
    /// The fully signed, notarized transition
    pub signed: SignedTransition,

    /// When this participant recorded it
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct VaultInner {
    /// Live descriptor version per id chain
    descriptors: HashMap<RecordId, AssetDescriptor>,

    /// Live symbol index; at most one live descriptor per symbol
    symbols: HashMap<String, RecordId>,

    /// Every symbol ever created, live or superseded
    known_symbols: HashSet<String>,

    /// Live units by id
    units: HashMap<RecordId, Unit>,

    /// (holder, descriptor) index over live units, insertion ordered
    holdings: HashMap<(PartyId, RecordId), Vec<RecordId>>,

    /// Ids consumed by some committed transition
    consumed: HashSet<RecordId>,

    /// Append-only log of committed transitions
    log: Vec<CommittedTransition>,
}

/// In-memory reference vault
///
/// All reads and writes go through one mutex, so a recorded transition is
/// visible in full or not at all.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    inner: Mutex<VaultInner>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VaultInner> {
        // A poisoned vault mutex only means another thread panicked while
        // holding it; the data itself is guarded by the two-phase apply.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of transitions this participant has recorded
    pub fn committed_count(&self) -> usize {
        self.lock().log.len()
    }

    /// Snapshot of the committed transition log
    pub fn committed_transitions(&self) -> Vec<CommittedTransition> {
        self.lock().log.clone()
    }

    /// Whether the record id has been consumed by a committed transition
    pub fn is_consumed(&self, id: &RecordId) -> bool {
        self.lock().consumed.contains(id)
    }
}

impl VaultInner {
    /// First phase: check the transition applies cleanly, mutating nothing
    fn check(&self, signed: &SignedTransition) -> Result<(), LedgerError> {
        let tx = signed.transition();
        match tx.intent {
            Intent::CreateDescriptor => {
                let desc = required_descriptor(signed)?;
                // Symbol uniqueness is enforced here, at write time
                if self.symbols.contains_key(&desc.symbol) {
                    return Err(LedgerError::StructuralViolation(format!(
                        "symbol \"{}\" already has a live descriptor",
                        desc.symbol
                    )));
                }
            }
            Intent::UpdateDescriptor => {
                let desc = required_descriptor(signed)?;
                let prior = self
                    .descriptors
                    .get(&desc.id)
                    .ok_or_else(|| LedgerError::UnknownDescriptor(desc.id.to_string()))?;
                // The consumed ref must name the live version; a stale ref
                // was already spent by the update that superseded it.
                match tx.consumed.first() {
                    Some(id) if *id == prior.version_ref() => {}
                    Some(id) if self.consumed.contains(id) => {
                        return Err(LedgerError::DoubleSpendConflict(*id));
                    }
                    _ => {
                        return Err(LedgerError::StructuralViolation(
                            "descriptor update does not consume the live version".to_string(),
                        ));
                    }
                }
            }
            Intent::Issue | Intent::Move | Intent::Redeem => {
                for id in &tx.consumed {
                    if self.units.contains_key(id) {
                        continue;
                    }
                    if self.consumed.contains(id) {
                        return Err(LedgerError::DoubleSpendConflict(*id));
                    }
                    return Err(LedgerError::StructuralViolation(format!(
                        "consumed record {} is not live",
                        id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Second phase: apply, infallibly, after `check` has passed
    fn apply(&mut self, signed: &SignedTransition, recorded_at: DateTime<Utc>) {
        let tx = signed.transition();
        match tx.intent {
            Intent::CreateDescriptor | Intent::UpdateDescriptor => {
                for id in &tx.consumed {
                    self.consumed.insert(*id);
                }
                if let Some(desc) = &tx.produced_descriptor {
                    self.symbols.insert(desc.symbol.clone(), desc.id);
                    self.known_symbols.insert(desc.symbol.clone());
                    self.descriptors.insert(desc.id, desc.clone());
                }
            }
            Intent::Issue | Intent::Move | Intent::Redeem => {
                for id in &tx.consumed {
                    if let Some(unit) = self.units.remove(id) {
                        let key = (unit.holder, unit.descriptor_ref);
                        if let Some(ids) = self.holdings.get_mut(&key) {
                            ids.retain(|held| held != id);
                        }
                    }
                    self.consumed.insert(*id);
                }
                for unit in &tx.produced_units {
                    self.units.insert(unit.id, unit.clone());
                    self.holdings
                        .entry((unit.holder, unit.descriptor_ref))
                        .or_default()
                        .push(unit.id);
                }
            }
        }
        self.log.push(CommittedTransition {
            signed: signed.clone(),
            recorded_at,
        });
    }
}

fn required_descriptor(signed: &SignedTransition) -> Result<&AssetDescriptor, LedgerError> {
    signed
        .transition()
        .produced_descriptor
        .as_ref()
        .ok_or_else(|| {
            LedgerError::StructuralViolation(
                "descriptor transition carries no descriptor".to_string(),
            )
        })
}

impl TransitionStore for InMemoryVault {
    fn record(&self, signed: &SignedTransition) -> Result<(), LedgerError> {
        let mut inner = self.lock();

        // Participants of the same transition may share a vault; recording
        // twice is a no-op.
        if inner
            .log
            .iter()
            .any(|c| c.signed.transition().hash() == signed.transition().hash())
        {
            debug!("transition already recorded, skipping");
            return Ok(());
        }

        inner.check(signed)?;
        inner.apply(signed, Utc::now());
        info!(
            "recorded {:?} transition ({} consumed, {} produced)",
            signed.transition().intent,
            signed.transition().consumed.len(),
            signed.transition().produced_units.len()
        );
        Ok(())
    }
}

impl LedgerQuery for InMemoryVault {
    fn find_live_descriptor(&self, symbol: &str) -> Result<Option<AssetDescriptor>, LedgerError> {
        let inner = self.lock();
        let id = match inner.symbols.get(symbol) {
            Some(id) => *id,
            None => return Ok(None),
        };
        // Symbols are unique at write time; a second live chain carrying
        // this symbol means the index is corrupt.
        if inner.descriptors.values().filter(|d| d.symbol == symbol).count() > 1 {
            return Err(LedgerError::AmbiguousRecord(symbol.to_string()));
        }
        Ok(inner.descriptors.get(&id).cloned())
    }

    fn find_live_units(
        &self,
        owner: &PartyId,
        descriptor_id: &RecordId,
    ) -> Result<Vec<Unit>, LedgerError> {
        let inner = self.lock();
        let ids = match inner.holdings.get(&(*owner, *descriptor_id)) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| inner.units.get(id).cloned())
            .collect())
    }

    fn symbol_exists(&self, symbol: &str) -> Result<bool, LedgerError> {
        Ok(self.lock().known_symbols.contains(symbol))
    }
}

impl LedgerView for InMemoryVault {
    fn descriptor(&self, id: &RecordId) -> Option<AssetDescriptor> {
        self.lock().descriptors.get(id).cloned()
    }

    fn descriptor_by_symbol(&self, symbol: &str) -> Option<AssetDescriptor> {
        let inner = self.lock();
        inner
            .symbols
            .get(symbol)
            .and_then(|id| inner.descriptors.get(id))
            .cloned()
    }

    fn unit(&self, id: &RecordId) -> Option<Unit> {
        self.lock().units.get(id).cloned()
    }
}
