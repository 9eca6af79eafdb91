use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use scrip_core::error::LedgerError;
use scrip_core::id::PartyId;
use scrip_core::transition::Authorization;
use std::collections::HashMap;
use std::sync::Mutex;

/// Identity and key service consumed by the signing protocol
///
/// Verification needs no private material: a `PartyId` is the party's
/// ed25519 verifying key, so any participant can check any authorization.
pub trait IdentityService {
    /// Produce an authorization over `payload` with the party's key
    fn sign(&self, party: &PartyId, payload: &[u8]) -> Result<Authorization, LedgerError>;

    /// Check an authorization against a party and payload
    fn verify(&self, auth: &Authorization, party: &PartyId, payload: &[u8]) -> bool {
        verify_authorization(auth, party, payload)
    }
}

/// Verify an authorization using only the party's id (its verifying key)
pub fn verify_authorization(auth: &Authorization, party: &PartyId, payload: &[u8]) -> bool {
    if auth.party != *party {
        return false;
    }
    let Ok(verifying_key) = VerifyingKey::from_bytes(&party.to_bytes()) else {
        return false;
    };
    let Ok(bytes) = <[u8; 64]>::try_from(auth.signature.as_slice()) else {
        return false;
    };
    let signature = Signature::from_bytes(&bytes);
    verifying_key.verify(payload, &signature).is_ok()
}

/// In-memory keyring holding the signing keys of local parties
#[derive(Debug, Default)]
pub struct Keyring {
    keys: Mutex<HashMap<PartyId, SigningKey>>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh party identity and keep its signing key
    pub fn generate_party(&self) -> PartyId {
        let signing_key = SigningKey::generate(&mut OsRng);
        let party = PartyId::from_bytes(signing_key.verifying_key().to_bytes());
        self.lock().insert(party, signing_key);
        party
    }

    /// Whether this keyring holds the signing key for the party
    pub fn holds_key_for(&self, party: &PartyId) -> bool {
        self.lock().contains_key(party)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PartyId, SigningKey>> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl IdentityService for Keyring {
    fn sign(&self, party: &PartyId, payload: &[u8]) -> Result<Authorization, LedgerError> {
        let keys = self.lock();
        let signing_key = keys
            .get(party)
            .ok_or_else(|| LedgerError::Signature(format!("no signing key for {}", party)))?;
        let signature = signing_key.sign(payload);
        Ok(Authorization {
            party: *party,
            signature: signature.to_bytes().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let keyring = Keyring::new();
        let party = keyring.generate_party();

        let payload = b"transition hash stand-in";
        let auth = keyring.sign(&party, payload).unwrap();

        assert!(verify_authorization(&auth, &party, payload));
        assert!(!verify_authorization(&auth, &party, b"different payload"));
    }

    #[test]
    fn test_verification_rejects_wrong_party() {
        let keyring = Keyring::new();
        let signer = keyring.generate_party();
        let other = keyring.generate_party();

        let payload = b"payload";
        let auth = keyring.sign(&signer, payload).unwrap();
        assert!(!verify_authorization(&auth, &other, payload));
    }

    #[test]
    fn test_sign_with_unknown_key_fails() {
        let keyring = Keyring::new();
        let stranger = PartyId::from_bytes([7; 32]);

        let err = keyring.sign(&stranger, b"payload").unwrap_err();
        assert!(matches!(err, LedgerError::Signature(_)));
    }

    #[test]
    fn test_generated_parties_are_distinct() {
        let keyring = Keyring::new();
        let a = keyring.generate_party();
        let b = keyring.generate_party();
        assert_ne!(a, b);
        assert!(keyring.holds_key_for(&a));
        assert!(keyring.holds_key_for(&b));
    }
}
