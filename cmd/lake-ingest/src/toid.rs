use std::fmt::Display;

/// Total Order IDs (TOIDs) from
/// [SEP-35](https://stellar.org/protocol/sep-35): a 64-bit id packing
/// `(ledger_sequence, transaction_order, operation_order)`.
/// `transaction_order` and `operation_order` are 1-based; 0 means "the
/// ledger itself" / "the transaction itself".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Toid {
    ledger_sequence: u32,
    transaction_order: u32,
    operation_order: u32,
}

const LEDGER_MASK: u64 = (1 << 32) - 1;
const TRANSACTION_MASK: u64 = (1 << 20) - 1;
const OPERATION_MASK: u64 = (1 << 12) - 1;
const LEDGER_SHIFT: u64 = 32;
const TRANSACTION_SHIFT: u64 = 12;
const OPERATION_SHIFT: u64 = 0;

impl Toid {
    pub fn new(ledger: u32, tx_order: u32, op_order: u32) -> Toid {
        Toid {
            ledger_sequence: ledger,
            transaction_order: tx_order,
            operation_order: op_order,
        }
    }

    pub fn to_paging_token(self) -> String {
        let u: u64 = self.into();
        format!("{u:019}")
    }
}

impl From<u64> for Toid {
    fn from(item: u64) -> Self {
        let ledger: u32 = ((item >> LEDGER_SHIFT) & LEDGER_MASK).try_into().unwrap();
        let tx_order: u32 = ((item >> TRANSACTION_SHIFT) & TRANSACTION_MASK)
            .try_into()
            .unwrap();
        let op_order: u32 = ((item >> OPERATION_SHIFT) & OPERATION_MASK)
            .try_into()
            .unwrap();

        Toid::new(ledger, tx_order, op_order)
    }
}

impl From<Toid> for u64 {
    fn from(item: Toid) -> Self {
        let l: u64 = item.ledger_sequence.into();
        let t: u64 = item.transaction_order.into();
        let o: u64 = item.operation_order.into();

        let mut result: u64 = 0;
        result |= (l & LEDGER_MASK) << LEDGER_SHIFT;
        result |= (t & TRANSACTION_MASK) << TRANSACTION_SHIFT;
        result |= (o & OPERATION_MASK) << OPERATION_SHIFT;

        result
    }
}

impl From<Toid> for i64 {
    fn from(item: Toid) -> Self {
        let u: u64 = item.into();
        u as i64
    }
}

impl Display for Toid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let u: u64 = (*self).into();
        write!(f, "{u}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_in_ledger_tx_op_order() {
        let a: u64 = Toid::new(100, 1, 1).into();
        let b: u64 = Toid::new(100, 1, 2).into();
        let c: u64 = Toid::new(100, 2, 1).into();
        let d: u64 = Toid::new(101, 1, 1).into();
        assert!(a < b && b < c && c < d);
    }

    #[test]
    fn round_trips() {
        let toid = Toid::new(123_456, 42, 7);
        let packed: u64 = toid.into();
        assert_eq!(Toid::from(packed), toid);
    }

    #[test]
    fn ledger_only_toid_is_sequence_shifted() {
        let packed: u64 = Toid::new(5, 0, 0).into();
        assert_eq!(packed, 5u64 << 32);
    }
}
