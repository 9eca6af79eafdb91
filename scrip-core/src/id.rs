use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

// RecordId uniquely identifies a ledger record (an asset descriptor or a
// fungible unit). It is a 32 byte identifier derived off the ed25519 curve so
// that it can never collide with a party's public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId([u8; 32]);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format as a hex string with a prefix of the first 6 bytes
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "rec:{}", prefix)
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId([0; 32])
    }
}

impl Deref for RecordId {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl RecordId {
    pub fn new(id: [u8; 32]) -> Self {
        RecordId(id)
    }

    /// Create a RecordId from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        RecordId(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derive a fresh RecordId from the given seeds plus the current time
    ///
    /// Two calls with identical seeds yield distinct ids, which is what
    /// record creation wants: ids name instances, not contents.
    pub fn fresh(seeds: &[&[u8]]) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .to_le_bytes();

        let mut all: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        all.extend_from_slice(seeds);
        all.push(&now);

        let (id, _) = Self::find_record_id(&all);
        id
    }

    pub fn derive_record_id(seeds: &[&[u8]], bump: u8) -> [u8; 32] {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"SCRIP_Record");

        // Add all seeds
        for seed in seeds {
            hasher.update(seed);
        }

        // Add bump
        hasher.update([bump]);

        hasher.finalize().into()
    }

    /// Verify that a 32-byte array is not a valid point on the ed25519 curve
    ///
    /// Returns true if the bytes do not represent a valid curve point.
    /// Returns false if the bytes do represent a valid curve point.
    pub fn is_off_curve(bytes: &[u8; 32]) -> bool {
        let Ok(compressed_edwards_y) = CompressedEdwardsY::from_slice(bytes.as_ref()) else {
            return true; // Cannot even parse as a point format, so it's off-curve
        };
        compressed_edwards_y.decompress().is_none() // If we can't decompress it, it's off-curve
    }

    /// Try to find an off-curve RecordId for the given seeds
    pub fn try_find_record_id(seeds: &[&[u8]]) -> Option<(RecordId, u8)> {
        for bump in 0..255 {
            let id = RecordId::derive_record_id(seeds, bump);
            if RecordId::is_off_curve(&id) {
                return Some((RecordId(id), bump));
            }
        }
        None
    }

    /// Find an off-curve RecordId for the given seeds
    pub fn find_record_id(seeds: &[&[u8]]) -> (RecordId, u8) {
        RecordId::try_find_record_id(seeds).expect("Failed to find a valid RecordId")
    }
}

/// PartyId identifies a protocol participant
///
/// The bytes are the party's ed25519 verifying key, so holding a PartyId is
/// enough to verify that party's authorizations without any key registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId([u8; 32]);

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "party:{}", prefix)
    }
}

impl Ord for PartyId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PartyId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Deref for PartyId {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartyId {
    /// Create a PartyId from verifying key bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PartyId(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the internal bytes by value
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

/// Unique identifier for one protocol run (one flow invocation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId([u8; 16]);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run:{}", hex::encode(self.0))
    }
}

impl RunId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        RunId(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Generate a unique RecordId for testing purposes
    pub fn unique_id() -> RecordId {
        RecordId::fresh(&[b"test"])
    }

    #[test]
    fn test_fresh_ids_are_unique() {
        let id1 = RecordId::fresh(&[b"seed"]);
        let id2 = RecordId::fresh(&[b"seed"]);

        // Two consecutive calls should produce different IDs
        assert_ne!(id1, id2);

        // Fresh IDs should not be default
        assert_ne!(id1, RecordId::default());
        assert_ne!(id2, RecordId::default());
    }

    #[test]
    fn test_default_id() {
        let default_id = RecordId::default();
        assert_eq!(*default_id, [0u8; 32]);
    }

    #[test]
    fn test_derive_record_id() {
        let seed1 = b"test_seed_1";
        let seed2 = b"test_seed_2";
        let bump = 5;

        let id = RecordId::derive_record_id(&[seed1, seed2], bump);

        // Deterministic for the same seeds and bump
        let id2 = RecordId::derive_record_id(&[seed1, seed2], bump);
        assert_eq!(id, id2);

        // Changing bump creates a different ID
        let id3 = RecordId::derive_record_id(&[seed1, seed2], bump + 1);
        assert_ne!(id, id3);

        // Changing seed order creates a different ID
        let id4 = RecordId::derive_record_id(&[seed2, seed1], bump);
        assert_ne!(id, id4);
    }

    #[test]
    fn test_is_off_curve() {
        let seed = b"curve_test_seed";
        let (id, _) = RecordId::find_record_id(&[seed]);

        // find_record_id only returns off-curve ids
        assert!(RecordId::is_off_curve(&id));
    }

    #[test]
    fn test_find_record_id() {
        let seed1 = b"unique_seed_1";
        let seed2 = b"unique_seed_2";

        let (id, bump) = RecordId::find_record_id(&[seed1, seed2]);

        // Recreating with the found bump yields the same bytes
        let raw_id = RecordId::derive_record_id(&[seed1, seed2], bump);
        assert_eq!(*id, raw_id);

        // Different seeds produce different IDs
        let (id2, _) = RecordId::find_record_id(&[seed2, seed1]);
        assert_ne!(id, id2);
    }

    #[test]
    fn test_party_id_ordering() {
        let a = PartyId::from_bytes([1; 32]);
        let b = PartyId::from_bytes([2; 32]);
        assert!(a < b);
        assert_eq!(a, PartyId::from_bytes([1; 32]));
    }
}
