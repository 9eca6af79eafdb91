use crate::error::LedgerError;
use crate::id::{PartyId, RecordId};
use serde::{Deserialize, Serialize};

/// A fungible value record backed by an asset descriptor
///
/// `descriptor_ref` is a pointer to the descriptor's id chain, never a copy
/// of its fields. Units sharing a `descriptor_ref` are interchangeable and
/// summable regardless of which transition created them. A unit is held by
/// exactly one party at a time and its amount is strictly positive for its
/// whole lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    /// Unique identifier for this unit record
    pub id: RecordId,

    /// Pointer to the backing AssetDescriptor id
    pub descriptor_ref: RecordId,

    /// The party that issued this unit
    pub issuer: PartyId,

    /// The party currently holding this unit
    pub holder: PartyId,

    /// Quantity of value, always > 0
    pub amount: u64,
}

impl Unit {
    /// Create a new unit with a freshly derived id
    ///
    /// Fails with `InvalidAmount` when `amount` is zero; a unit is never
    /// partially valid.
    pub fn new(
        descriptor_ref: RecordId,
        issuer: PartyId,
        holder: PartyId,
        amount: u64,
    ) -> Result<Self, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let id = RecordId::fresh(&[b"unit", descriptor_ref.bytes(), holder.bytes()]);
        Ok(Self {
            id,
            descriptor_ref,
            issuer,
            holder,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit() {
        let descriptor = RecordId::new([1; 32]);
        let issuer = PartyId::from_bytes([2; 32]);
        let holder = PartyId::from_bytes([3; 32]);

        let unit = Unit::new(descriptor, issuer, holder, 50).unwrap();
        assert_eq!(unit.descriptor_ref, descriptor);
        assert_eq!(unit.issuer, issuer);
        assert_eq!(unit.holder, holder);
        assert_eq!(unit.amount, 50);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let descriptor = RecordId::new([1; 32]);
        let issuer = PartyId::from_bytes([2; 32]);
        let holder = PartyId::from_bytes([3; 32]);

        let err = Unit::new(descriptor, issuer, holder, 0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(0)));
    }

    #[test]
    fn test_units_get_distinct_ids() {
        let descriptor = RecordId::new([1; 32]);
        let issuer = PartyId::from_bytes([2; 32]);
        let holder = PartyId::from_bytes([3; 32]);

        let a = Unit::new(descriptor, issuer, holder, 10).unwrap();
        let b = Unit::new(descriptor, issuer, holder, 10).unwrap();
        assert_ne!(a.id, b.id);
    }
}
