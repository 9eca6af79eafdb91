use crate::id::{PartyId, RecordId};
use serde::{Deserialize, Serialize};

/// Mutable record describing the real-world asset backing a token line
///
/// A descriptor is owned by its maintainer and is only ever mutated by a
/// transition that consumes the prior version and produces a new version
/// carrying the same id. It is never deleted, only superseded. Units point at
/// the descriptor by id and never copy its fields, so a valuation update does
/// not touch any outstanding unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Identifier shared by every version of this descriptor
    pub id: RecordId,

    /// The party with authority over this descriptor and its issuance
    pub maintainer: PartyId,

    /// Current valuation of the backing asset, in minor currency units
    pub valuation: u64,

    /// Short unique symbol naming the token line (e.g. "HSE1")
    pub symbol: String,

    /// Version counter, incremented by each update transition
    pub schema_version: u32,
}

impl AssetDescriptor {
    /// Create the first version of a descriptor with a freshly derived id
    pub fn new(maintainer: PartyId, valuation: u64, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let id = RecordId::fresh(&[b"descriptor", symbol.as_bytes(), maintainer.bytes()]);
        Self {
            id,
            maintainer,
            valuation,
            symbol,
            schema_version: 0,
        }
    }

    /// Produce the successor version with an updated valuation
    ///
    /// The id and symbol are carried over unchanged; only the valuation and
    /// the version counter move.
    pub fn next_version(&self, valuation: u64) -> Self {
        Self {
            id: self.id,
            maintainer: self.maintainer,
            valuation,
            symbol: self.symbol.clone(),
            schema_version: self.schema_version + 1,
        }
    }

    /// The consumable reference naming this particular version
    ///
    /// The id names the whole version chain and stays live forever; an
    /// update transition consumes the version ref of the version it
    /// supersedes, so each version can be spent exactly once while the
    /// chain keeps evolving. Derivation is deterministic, so every party
    /// computes the same ref from the same version.
    pub fn version_ref(&self) -> RecordId {
        let version = self.schema_version.to_le_bytes();
        let (id, _) =
            RecordId::find_record_id(&[b"descriptor-version", self.id.bytes(), &version]);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_descriptor() {
        let maintainer = PartyId::from_bytes([1; 32]);
        let desc = AssetDescriptor::new(maintainer, 100_000, "HSE1");

        assert_eq!(desc.maintainer, maintainer);
        assert_eq!(desc.valuation, 100_000);
        assert_eq!(desc.symbol, "HSE1");
        assert_eq!(desc.schema_version, 0);
        assert_ne!(desc.id, RecordId::default());
    }

    #[test]
    fn test_next_version_keeps_id_chain() {
        let maintainer = PartyId::from_bytes([1; 32]);
        let v0 = AssetDescriptor::new(maintainer, 100_000, "HSE1");
        let v1 = v0.next_version(150_000);

        assert_eq!(v1.id, v0.id);
        assert_eq!(v1.symbol, v0.symbol);
        assert_eq!(v1.maintainer, v0.maintainer);
        assert_eq!(v1.valuation, 150_000);
        assert_eq!(v1.schema_version, 1);
    }

    #[test]
    fn test_version_refs_are_deterministic_and_version_specific() {
        let maintainer = PartyId::from_bytes([1; 32]);
        let v0 = AssetDescriptor::new(maintainer, 100_000, "HSE1");
        let v1 = v0.next_version(150_000);

        // Same version, same ref, regardless of who derives it
        assert_eq!(v0.version_ref(), v0.clone().version_ref());

        // Each version gets its own ref, and none of them is the chain id
        assert_ne!(v0.version_ref(), v1.version_ref());
        assert_ne!(v0.version_ref(), v0.id);
        assert_ne!(v1.version_ref(), v1.id);
    }

    #[test]
    fn test_distinct_descriptors_get_distinct_ids() {
        let maintainer = PartyId::from_bytes([1; 32]);
        let a = AssetDescriptor::new(maintainer, 1, "HSE1");
        let b = AssetDescriptor::new(maintainer, 1, "HSE1");
        assert_ne!(a.id, b.id);
    }
}
