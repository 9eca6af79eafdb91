use crate::keys::{verify_authorization, IdentityService};
use crate::transport::{SessionTransport, SignResponse};
use log::{debug, info, warn};
use scrip_core::contract::{self, LedgerView};
use scrip_core::error::LedgerError;
use scrip_core::id::{PartyId, RunId};
use scrip_core::transition::{SignedTransition, Transition};
use scrip_notary::{Notary, Verdict};
use scrip_vault::TransitionStore;

/// Named states of the signing handshake
///
/// `Rejected` is terminal and reachable from every non-terminal state; the
/// rejection reason and the state the run was in when it failed live on the
/// [`FlowRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Built,
    LocallySigned,
    AwaitingCounterSignatures,
    FullySigned,
    Notarized,
    Committed,
    Rejected,
}

/// One protocol run: a transition being driven from `Built` to `Committed`
///
/// Many runs may be in flight concurrently within a party and across the
/// network; each carries its own id. A run blocks at exactly two points,
/// awaiting counter-signatures and awaiting the notary's verdict. Abandoning
/// a run before `Notarized` leaves no state visible to anyone else; once
/// `Notarized`, commitment is unconditional.
#[derive(Debug)]
pub struct FlowRun {
    run_id: RunId,
    initiator: PartyId,
    signed: SignedTransition,
    state: FlowState,
    rejected_at: Option<FlowState>,
    reason: Option<LedgerError>,
}

impl FlowRun {
    pub fn new(initiator: PartyId, transition: Transition) -> Self {
        Self {
            run_id: RunId::from_bytes(rand::random()),
            initiator,
            signed: SignedTransition::new(transition),
            state: FlowState::Built,
            rejected_at: None,
            reason: None,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn initiator(&self) -> PartyId {
        self.initiator
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn transition(&self) -> &Transition {
        self.signed.transition()
    }

    pub fn signed(&self) -> &SignedTransition {
        &self.signed
    }

    /// The state the run was in when it was rejected, if it was
    pub fn rejected_at(&self) -> Option<FlowState> {
        self.rejected_at
    }

    /// The rejection reason, if the run was rejected
    pub fn reason(&self) -> Option<&LedgerError> {
        self.reason.as_ref()
    }

    pub fn is_committed(&self) -> bool {
        self.state == FlowState::Committed
    }

    /// Consume the run, yielding the committed transition or the rejection
    /// reason
    pub fn into_outcome(self) -> Result<SignedTransition, LedgerError> {
        match (self.state, self.reason) {
            (FlowState::Committed, _) => Ok(self.signed),
            (_, Some(reason)) => Err(reason),
            (state, None) => Err(LedgerError::Context(anyhow::anyhow!(
                "flow run ended in non-terminal state {:?}",
                state
            ))),
        }
    }

    fn reject(&mut self, reason: LedgerError) {
        self.rejected_at = Some(self.state);
        self.state = FlowState::Rejected;
        self.reason = Some(reason);
    }

    fn counterparties(&self) -> Vec<PartyId> {
        self.transition()
            .required_signers
            .iter()
            .filter(|p| **p != self.initiator)
            .copied()
            .collect()
    }
}

/// Drives flow runs through the signing handshake
///
/// Generic over the vault, notary and transport collaborators so tests can
/// substitute any of them. The driver performs no implicit retries: a
/// transport failure is surfaced to the caller, who must rebuild the
/// transition against a fresh ledger view before trying again.
pub struct FlowDriver<'a, V, N, T> {
    vault: &'a V,
    notary: &'a N,
    transport: &'a T,
    keys: &'a dyn IdentityService,
}

impl<'a, V, N, T> FlowDriver<'a, V, N, T>
where
    V: LedgerView + TransitionStore,
    N: Notary,
    T: SessionTransport,
{
    pub fn new(
        vault: &'a V,
        notary: &'a N,
        transport: &'a T,
        keys: &'a dyn IdentityService,
    ) -> Self {
        Self {
            vault,
            notary,
            transport,
            keys,
        }
    }

    /// Drive a transition through the whole handshake
    ///
    /// Returns the run in its terminal state, `Committed` or `Rejected`,
    /// never panicking on protocol failures.
    pub fn execute(&self, initiator: PartyId, transition: Transition) -> FlowRun {
        let mut run = FlowRun::new(initiator, transition);
        debug!("{} starting {:?} run", run.run_id(), run.transition().intent);
        let result = self
            .sign_locally(&mut run)
            .and_then(|_| self.collect_signatures(&mut run))
            .and_then(|_| self.finalize(&mut run));
        if let Err(reason) = result {
            warn!("{} rejected: {}", run.run_id(), reason);
            run.reject(reason);
        }
        run
    }

    /// `Built → LocallySigned`: validate against the local view and attach
    /// the initiator's authorization
    ///
    /// Fails fast with no network interaction; an invalid proposal is never
    /// sent to a counterparty.
    pub fn sign_locally(&self, run: &mut FlowRun) -> Result<(), LedgerError> {
        self.expect_state(run, FlowState::Built)?;
        contract::verify(run.transition(), self.vault)?;
        if !run.transition().requires_signer(&run.initiator) {
            return Err(LedgerError::MissingSignature(run.initiator));
        }
        let auth = self.keys.sign(&run.initiator, run.transition().hash())?;
        run.signed.add_authorization(auth);
        run.state = FlowState::LocallySigned;
        Ok(())
    }

    /// `LocallySigned → AwaitingCounterSignatures → FullySigned`: gather
    /// authorizations from every other required signer
    ///
    /// Counterparties may respond in any order; the handshake is satisfied
    /// once the required-signer set is covered.
    pub fn collect_signatures(&self, run: &mut FlowRun) -> Result<(), LedgerError> {
        self.expect_state(run, FlowState::LocallySigned)?;
        run.state = FlowState::AwaitingCounterSignatures;

        for party in run.counterparties() {
            debug!("{} requesting signature from {}", run.run_id(), party);
            match self.transport.request_signature(&party, &run.signed)? {
                SignResponse::Signed(auth) => {
                    if !verify_authorization(&auth, &party, run.transition().hash()) {
                        return Err(LedgerError::CounterpartyRefused {
                            party,
                            reason: "returned an invalid counter-signature".to_string(),
                        });
                    }
                    run.signed.add_authorization(auth);
                }
                SignResponse::Refused(reason) => {
                    return Err(LedgerError::CounterpartyRefused { party, reason });
                }
            }
        }

        if let Some(missing) = run.signed.missing_signers().into_iter().next() {
            return Err(LedgerError::MissingSignature(missing));
        }
        run.state = FlowState::FullySigned;
        Ok(())
    }

    /// `FullySigned → Notarized → Committed`: submit to the arbiter, then
    /// record everywhere
    ///
    /// The notary's verdict is final. Once notarized, commitment is
    /// unconditional: a participant that cannot be reached for recording is
    /// logged and left to catch up, not rolled back.
    pub fn finalize(&self, run: &mut FlowRun) -> Result<(), LedgerError> {
        self.expect_state(run, FlowState::FullySigned)?;
        match self.notary.notarize(run.transition())? {
            Verdict::Accepted => run.state = FlowState::Notarized,
            Verdict::Conflict(record_id) => {
                return Err(LedgerError::DoubleSpendConflict(record_id));
            }
        }

        self.vault.record(&run.signed)?;
        for party in run.counterparties() {
            if let Err(e) = self.transport.distribute(&party, &run.signed) {
                warn!(
                    "{} could not distribute finalized transition to {}: {}",
                    run.run_id(),
                    party,
                    e
                );
            }
        }
        run.state = FlowState::Committed;
        info!(
            "{} committed {:?} transition",
            run.run_id(),
            run.transition().intent
        );
        Ok(())
    }

    fn expect_state(&self, run: &FlowRun, expected: FlowState) -> Result<(), LedgerError> {
        if run.state != expected {
            return Err(LedgerError::Context(anyhow::anyhow!(
                "flow step requires state {:?}, run is in {:?}",
                expected,
                run.state
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TransitionBuilder;
    use crate::keys::Keyring;
    use crate::transport::{LocalTransport, Responder};
    use scrip_notary::InMemoryNotary;
    use scrip_vault::{InMemoryVault, LedgerQuery};
    use std::sync::Arc;

    struct Network {
        vault: Arc<InMemoryVault>,
        notary: InMemoryNotary,
        transport: LocalTransport,
        keys: Arc<Keyring>,
        notary_party: PartyId,
    }

    impl Network {
        fn new() -> Self {
            let keys = Arc::new(Keyring::new());
            Self {
                vault: Arc::new(InMemoryVault::new()),
                notary: InMemoryNotary::new(),
                transport: LocalTransport::new(),
                notary_party: PartyId::from_bytes([9; 32]),
                keys,
            }
        }

        fn party(&self) -> PartyId {
            let party = self.keys.generate_party();
            self.transport.register(Arc::new(Responder::new(
                party,
                Arc::clone(&self.vault),
                Arc::clone(&self.keys),
            )));
            party
        }

        fn driver(&self) -> FlowDriver<'_, InMemoryVault, InMemoryNotary, LocalTransport> {
            FlowDriver::new(
                self.vault.as_ref(),
                &self.notary,
                &self.transport,
                self.keys.as_ref(),
            )
        }

        fn builder(&self) -> TransitionBuilder<'_, InMemoryVault> {
            TransitionBuilder::new(self.vault.as_ref(), self.notary_party)
        }
    }

    #[test]
    fn test_issue_flow_commits() {
        let net = Network::new();
        let issuer = net.party();
        let holder = net.party();

        let create = net
            .builder()
            .create_descriptor("HSE1", 100_000, issuer)
            .unwrap();
        let run = net.driver().execute(issuer, create);
        assert!(run.is_committed());

        let issue = net.builder().issue("HSE1", 50, issuer, holder).unwrap();
        let run = net.driver().execute(issuer, issue);
        assert_eq!(run.state(), FlowState::Committed);
        assert!(run.signed().is_fully_signed());
    }

    #[test]
    fn test_invalid_proposal_rejected_before_any_network_io() {
        let net = Network::new();
        let issuer = net.party();
        let holder = net.party();

        let create = net
            .builder()
            .create_descriptor("HSE1", 100_000, issuer)
            .unwrap();
        net.driver().execute(issuer, create);

        // Hand-build an issue transition whose signer set omits the holder
        let desc = net.vault.find_live_descriptor("HSE1").unwrap().unwrap();
        let unit = scrip_core::unit::Unit::new(desc.id, issuer, holder, 10).unwrap();
        let signers = [issuer].into_iter().collect();
        let tx = Transition::new(
            vec![],
            vec![unit],
            None,
            scrip_core::transition::Intent::Issue,
            signers,
            net.notary_party,
        )
        .unwrap();

        let run = net.driver().execute(issuer, tx);
        assert_eq!(run.state(), FlowState::Rejected);
        // Failed while still Built: it never reached AwaitingCounterSignatures
        assert_eq!(run.rejected_at(), Some(FlowState::Built));
        assert!(matches!(
            run.reason(),
            Some(LedgerError::MissingSignature(p)) if *p == holder
        ));
    }

    #[test]
    fn test_unreachable_counterparty() {
        let net = Network::new();
        let issuer = net.party();
        // Holder has a key but is never registered on the transport
        let holder = net.keys.generate_party();

        let create = net
            .builder()
            .create_descriptor("HSE1", 100_000, issuer)
            .unwrap();
        net.driver().execute(issuer, create);

        let issue = net.builder().issue("HSE1", 50, issuer, holder).unwrap();
        let run = net.driver().execute(issuer, issue);
        assert_eq!(run.rejected_at(), Some(FlowState::AwaitingCounterSignatures));
        let reason = run.into_outcome().unwrap_err();
        assert!(reason.is_retryable());
        assert!(matches!(
            reason,
            LedgerError::CounterpartyUnavailable { party, .. } if party == holder
        ));
    }

    #[test]
    fn test_counterparty_refusal_is_terminal() {
        let net = Network::new();
        let issuer = net.party();

        // The holder validates against its own, empty vault and refuses
        let holder = net.keys.generate_party();
        let empty_vault = Arc::new(InMemoryVault::new());
        net.transport.register(Arc::new(Responder::new(
            holder,
            empty_vault,
            Arc::clone(&net.keys),
        )));

        let create = net
            .builder()
            .create_descriptor("HSE1", 100_000, issuer)
            .unwrap();
        net.driver().execute(issuer, create);

        let issue = net.builder().issue("HSE1", 50, issuer, holder).unwrap();
        let run = net.driver().execute(issuer, issue);
        assert_eq!(run.state(), FlowState::Rejected);
        let reason = run.into_outcome().unwrap_err();
        assert!(!reason.is_retryable());
        assert!(matches!(
            reason,
            LedgerError::CounterpartyRefused { party, .. } if party == holder
        ));
    }

    #[test]
    fn test_arbiter_verdict_is_final() {
        let net = Network::new();
        let issuer = net.party();
        let holder = net.party();
        let recipient = net.party();

        let create = net
            .builder()
            .create_descriptor("HSE1", 100_000, issuer)
            .unwrap();
        assert!(net.driver().execute(issuer, create).is_committed());
        let issue = net.builder().issue("HSE1", 100, issuer, holder).unwrap();
        assert!(net.driver().execute(issuer, issue).is_committed());

        // Two fully signed transitions racing over the same input
        let driver = net.driver();
        let mut first = FlowRun::new(
            holder,
            net.builder()
                .move_units("HSE1", 100, holder, recipient)
                .unwrap(),
        );
        let mut second = FlowRun::new(
            holder,
            net.builder()
                .move_units("HSE1", 100, holder, recipient)
                .unwrap(),
        );
        for run in [&mut first, &mut second] {
            driver.sign_locally(run).unwrap();
            driver.collect_signatures(run).unwrap();
            assert_eq!(run.state(), FlowState::FullySigned);
        }

        driver.finalize(&mut first).unwrap();
        assert!(first.is_committed());

        let err = driver.finalize(&mut second).unwrap_err();
        assert!(matches!(err, LedgerError::DoubleSpendConflict(_)));
    }
}
