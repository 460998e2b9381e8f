use std::time::{Duration, Instant};

use crate::{
    extract::LedgerExtraction,
    model::{rows, TableStat, DATASETS},
};

/// Per-worker in-memory accumulator: one insertion-ordered vector per
/// dataset. All buffered rows belong to the contiguous ledger range
/// reported by [`WorkerBuffer::ledger_bounds`]. Never shared across workers.
pub struct WorkerBuffer {
    pub ledgers: Vec<rows::LedgerRow>,
    pub transactions: Vec<rows::TransactionRow>,
    pub operations: Vec<rows::OperationRow>,
    pub native_balances: Vec<rows::NativeBalanceRow>,
    pub effects: Vec<rows::EffectRow>,
    pub trades: Vec<rows::TradeRow>,
    pub accounts: Vec<rows::AccountRow>,
    pub trustlines: Vec<rows::TrustlineRow>,
    pub offers: Vec<rows::OfferRow>,
    pub claimable_balances: Vec<rows::ClaimableBalanceRow>,
    pub liquidity_pools: Vec<rows::LiquidityPoolRow>,
    pub contract_events: Vec<rows::ContractEventRow>,
    pub contract_data: Vec<rows::ContractDataRow>,
    pub contract_code: Vec<rows::ContractCodeRow>,
    pub config_settings: Vec<rows::ConfigSettingRow>,
    pub ttl: Vec<rows::TtlRow>,
    pub evicted_keys: Vec<rows::EvictedKeyRow>,
    pub restored_keys: Vec<rows::RestoredKeyRow>,
    pub account_signers: Vec<rows::AccountSignerRow>,
    first_sequence: Option<u32>,
    last_sequence: Option<u32>,
    last_commit: Instant,
}

impl Default for WorkerBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerBuffer {
    pub fn new() -> Self {
        Self {
            ledgers: Vec::new(),
            transactions: Vec::new(),
            operations: Vec::new(),
            native_balances: Vec::new(),
            effects: Vec::new(),
            trades: Vec::new(),
            accounts: Vec::new(),
            trustlines: Vec::new(),
            offers: Vec::new(),
            claimable_balances: Vec::new(),
            liquidity_pools: Vec::new(),
            contract_events: Vec::new(),
            contract_data: Vec::new(),
            contract_code: Vec::new(),
            config_settings: Vec::new(),
            ttl: Vec::new(),
            evicted_keys: Vec::new(),
            restored_keys: Vec::new(),
            account_signers: Vec::new(),
            first_sequence: None,
            last_sequence: None,
            last_commit: Instant::now(),
        }
    }

    pub fn append_ledger(&mut self, mut extraction: LedgerExtraction) {
        let sequence = extraction.ledger.sequence;
        debug_assert!(
            self.last_sequence.map_or(true, |last| sequence == last + 1),
            "buffer must stay contiguous"
        );
        if self.first_sequence.is_none() {
            self.first_sequence = Some(sequence);
        }
        self.last_sequence = Some(sequence);

        self.ledgers.push(extraction.ledger);
        self.transactions.append(&mut extraction.transactions);
        self.operations.append(&mut extraction.operations);
        self.native_balances.append(&mut extraction.native_balances);
        self.effects.append(&mut extraction.effects);
        self.trades.append(&mut extraction.trades);
        self.accounts.append(&mut extraction.accounts);
        self.trustlines.append(&mut extraction.trustlines);
        self.offers.append(&mut extraction.offers);
        self.claimable_balances
            .append(&mut extraction.claimable_balances);
        self.liquidity_pools.append(&mut extraction.liquidity_pools);
        self.contract_events.append(&mut extraction.contract_events);
        self.contract_data.append(&mut extraction.contract_data);
        self.contract_code.append(&mut extraction.contract_code);
        self.config_settings.append(&mut extraction.config_settings);
        self.ttl.append(&mut extraction.ttl);
        self.evicted_keys.append(&mut extraction.evicted_keys);
        self.restored_keys.append(&mut extraction.restored_keys);
        self.account_signers.append(&mut extraction.account_signers);
    }

    pub fn len_ledgers(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    /// `(first, last)` buffered ledger sequences.
    pub fn ledger_bounds(&self) -> Option<(u32, u32)> {
        Some((self.first_sequence?, self.last_sequence?))
    }

    /// The flush predicate: size trigger or commit-interval trigger.
    pub fn should_flush(&self, batch_size: usize, commit_interval: Duration) -> bool {
        if self.is_empty() {
            return false;
        }
        self.len_ledgers() >= batch_size || self.last_commit.elapsed() >= commit_interval
    }

    /// Row counts per dataset, in flush order, empty datasets included.
    pub fn table_stats(&self) -> Vec<TableStat> {
        let counts = [
            self.ledgers.len(),
            self.transactions.len(),
            self.operations.len(),
            self.native_balances.len(),
            self.effects.len(),
            self.trades.len(),
            self.accounts.len(),
            self.trustlines.len(),
            self.offers.len(),
            self.claimable_balances.len(),
            self.liquidity_pools.len(),
            self.contract_events.len(),
            self.contract_data.len(),
            self.contract_code.len(),
            self.config_settings.len(),
            self.ttl.len(),
            self.evicted_keys.len(),
            self.restored_keys.len(),
            self.account_signers.len(),
        ];
        DATASETS
            .iter()
            .zip(counts)
            .map(|(dataset, count)| TableStat {
                table: dataset.table.to_string(),
                row_count: count as u64,
            })
            .collect()
    }

    pub fn total_rows(&self) -> u64 {
        self.table_stats().iter().map(|s| s.row_count).sum()
    }

    /// Clears every dataset and restarts the commit-interval clock. Called
    /// only after the whole flush protocol succeeded.
    pub fn mark_committed(&mut self) {
        self.ledgers.clear();
        self.transactions.clear();
        self.operations.clear();
        self.native_balances.clear();
        self.effects.clear();
        self.trades.clear();
        self.accounts.clear();
        self.trustlines.clear();
        self.offers.clear();
        self.claimable_balances.clear();
        self.liquidity_pools.clear();
        self.contract_events.clear();
        self.contract_data.clear();
        self.config_settings.clear();
        self.contract_code.clear();
        self.ttl.clear();
        self.evicted_keys.clear();
        self.restored_keys.clear();
        self.account_signers.clear();
        self.first_sequence = None;
        self.last_sequence = None;
        self.last_commit = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils;

    #[test]
    fn tracks_contiguous_bounds() {
        let mut buffer = WorkerBuffer::new();
        assert!(buffer.ledger_bounds().is_none());
        buffer.append_ledger(testutils::extraction(100, 1));
        buffer.append_ledger(testutils::extraction(101, 2));
        assert_eq!(buffer.ledger_bounds(), Some((100, 101)));
        assert_eq!(buffer.len_ledgers(), 2);
        assert_eq!(buffer.transactions.len(), 3);
    }

    #[test]
    fn size_trigger_fires_at_batch_size() {
        let mut buffer = WorkerBuffer::new();
        let hour = Duration::from_secs(3600);
        for seq in 100..102 {
            buffer.append_ledger(testutils::extraction(seq, 0));
        }
        assert!(!buffer.should_flush(3, hour));
        buffer.append_ledger(testutils::extraction(102, 0));
        assert!(buffer.should_flush(3, hour));
    }

    #[test]
    fn interval_trigger_fires_only_with_content() {
        let buffer = WorkerBuffer::new();
        assert!(!buffer.should_flush(100, Duration::ZERO));
    }

    #[test]
    fn commit_resets_state() {
        let mut buffer = WorkerBuffer::new();
        buffer.append_ledger(testutils::extraction(100, 1));
        buffer.mark_committed();
        assert!(buffer.is_empty());
        assert!(buffer.ledger_bounds().is_none());
        assert_eq!(buffer.total_rows(), 0);
    }

    #[test]
    fn table_stats_cover_all_datasets() {
        let mut buffer = WorkerBuffer::new();
        buffer.append_ledger(testutils::extraction(100, 2));
        let stats = buffer.table_stats();
        assert_eq!(stats.len(), 19);
        assert_eq!(stats[0].table, "ledgers_row_v2");
        assert_eq!(stats[0].row_count, 1);
        assert_eq!(stats[1].row_count, 2);
    }
}
