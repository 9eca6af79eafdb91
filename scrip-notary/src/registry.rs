use log::{debug, info};
use scrip_core::error::LedgerError;
use scrip_core::id::RecordId;
use scrip_core::transition::{Transition, TransitionHash};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// The notary's verdict on a submitted transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No consumed input has been spent before; all are now marked consumed
    Accepted,
    /// The named input was already consumed by an earlier transition
    Conflict(RecordId),
}

/// Record of who consumed a ledger record, and when
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionEntry {
    /// The record that was consumed
    pub record_id: RecordId,

    /// The hash of the transition that consumed it
    pub consumed_by: TransitionHash,

    /// When the consumption was registered (Unix timestamp, seconds)
    pub registered_at: u64,
}

/// Arbiter over record consumption
///
/// `notarize` must be linearizable: of any set of transitions racing to
/// consume the same record, exactly one is accepted. Participants treat the
/// verdict as final.
pub trait Notary {
    fn notarize(&self, transition: &Transition) -> Result<Verdict, LedgerError>;
}

/// Helper function to get the current timestamp in seconds
pub fn current_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// In-memory notary backed by a mutex-guarded consumption registry
///
/// The check-and-mark of all consumed inputs happens under one lock
/// acquisition, which is what makes the accept/refuse decision linearizable.
#[derive(Debug, Default)]
pub struct InMemoryNotary {
    consumed: Mutex<HashMap<RecordId, ConsumptionEntry>>,
}

impl InMemoryNotary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the consumption entry for a record, if any
    pub fn consumption_of(&self, id: &RecordId) -> Result<Option<ConsumptionEntry>, LedgerError> {
        let consumed = self
            .consumed
            .lock()
            .map_err(|e| LedgerError::ArbiterUnavailable(e.to_string()))?;
        Ok(consumed.get(id).cloned())
    }
}

impl Notary for InMemoryNotary {
    fn notarize(&self, transition: &Transition) -> Result<Verdict, LedgerError> {
        let mut consumed = self
            .consumed
            .lock()
            .map_err(|e| LedgerError::ArbiterUnavailable(e.to_string()))?;

        // Check every input before marking any, so a refusal has no effect
        for id in &transition.consumed {
            if let Some(entry) = consumed.get(id) {
                // Resubmission of the same transition is not a conflict
                if entry.consumed_by != *transition.hash() {
                    debug!(
                        "notary refusing transition: input {} already consumed",
                        id
                    );
                    return Ok(Verdict::Conflict(*id));
                }
            }
        }

        let now = current_time_secs();
        for id in &transition.consumed {
            consumed.insert(
                *id,
                ConsumptionEntry {
                    record_id: *id,
                    consumed_by: *transition.hash(),
                    registered_at: now,
                },
            );
        }
        info!(
            "notarized transition consuming {} record(s)",
            transition.consumed.len()
        );
        Ok(Verdict::Accepted)
    }
}
