use crate::xdr;

/// A closed ledger as delivered by the source: the raw close meta plus the
/// accessors every consumer needs. The V0/V1/V2 variant stays inside this
/// type and the extractors; nothing downstream sees the tag.
#[derive(Debug, Clone)]
pub struct ClosedLedger(pub xdr::LedgerCloseMeta);

impl ClosedLedger {
    pub fn header_entry(&self) -> &xdr::LedgerHeaderHistoryEntry {
        match &self.0 {
            xdr::LedgerCloseMeta::V0(m) => &m.ledger_header,
            xdr::LedgerCloseMeta::V1(m) => &m.ledger_header,
            xdr::LedgerCloseMeta::V2(m) => &m.ledger_header,
        }
    }

    pub fn header(&self) -> &xdr::LedgerHeader {
        &self.header_entry().header
    }

    pub fn sequence(&self) -> u32 {
        self.header().ledger_seq
    }

    pub fn closed_at(&self) -> i64 {
        self.header().scp_value.close_time.0 as i64
    }

    pub fn protocol_version(&self) -> u32 {
        self.header().ledger_version
    }

    pub fn ledger_hash(&self) -> String {
        hex::encode(self.header_entry().hash.0)
    }

    pub fn previous_ledger_hash(&self) -> String {
        hex::encode(self.header().previous_ledger_hash.0)
    }
}

impl From<xdr::LedgerCloseMeta> for ClosedLedger {
    fn from(meta: xdr::LedgerCloseMeta) -> Self {
        Self(meta)
    }
}
