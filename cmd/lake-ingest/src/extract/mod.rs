//! Per-ledger decomposition. Every extractor is a pure function over the
//! shared [`view::LedgerView`]; the close-meta variant tag never escapes
//! this module.

use tracing::warn;

use crate::model::{self, rows, ClosedLedger};

pub mod common;
pub mod effects;
pub mod ledgers;
pub mod operations;
pub mod result_codes;
pub mod snapshots;
pub mod soroban;
pub mod trades;
pub mod transactions;
pub mod view;

/// Extraction context fixed for the lifetime of a worker.
pub struct Ctx {
    pub network_passphrase: String,
    pub network_id: [u8; 32],
}

impl Ctx {
    pub fn new(network_passphrase: &str) -> Self {
        Self {
            network_passphrase: network_passphrase.to_string(),
            network_id: view::network_id(network_passphrase),
        }
    }
}

/// Row-stamp context for one ledger: partition key and timestamps shared by
/// every row the ledger produces.
#[derive(Debug, Clone, Copy)]
pub struct RowCtx {
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

impl RowCtx {
    fn new(ledger: &ClosedLedger) -> Self {
        let sequence = ledger.sequence();
        Self {
            ledger_sequence: sequence,
            ledger_range: model::ledger_range(sequence),
            closed_at: ledger.closed_at(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Everything one closed ledger decomposes into.
#[derive(Debug)]
pub struct LedgerExtraction {
    pub ledger: rows::LedgerRow,
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
}

/// Decompose one closed ledger into all 19 datasets.
pub fn extract_ledger(ledger: &ClosedLedger, ctx: &Ctx) -> LedgerExtraction {
    let rc = RowCtx::new(ledger);
    let view = view::LedgerView::build(ledger, &ctx.network_id);

    let snapshots = snapshots::extract(&view, &rc);
    let soroban = soroban::extract(&view, &rc);

    LedgerExtraction {
        ledger: ledgers::extract(&view, &rc),
        transactions: transactions::extract(&view, ctx, &rc),
        operations: operations::extract(&view, &rc),
        effects: effects::extract(&view, &rc),
        trades: trades::extract(&view, &rc),
        native_balances: snapshots.native_balances,
        accounts: snapshots.accounts,
        trustlines: snapshots.trustlines,
        offers: snapshots.offers,
        claimable_balances: snapshots.claimable_balances,
        liquidity_pools: snapshots.liquidity_pools,
        account_signers: snapshots.account_signers,
        contract_events: soroban.contract_events,
        contract_data: soroban.contract_data,
        contract_code: soroban.contract_code,
        config_settings: soroban.config_settings,
        ttl: soroban.ttl,
        evicted_keys: soroban.evicted_keys,
        restored_keys: soroban.restored_keys,
    }
}

/// Runs one per-entry decode step, converting a panic inside the XDR
/// traversal into a skipped entry so a single malformed record cannot lose
/// the batch.
pub(crate) fn guard_entry<T>(
    what: &str,
    sequence: u32,
    f: impl FnOnce() -> Option<T>,
) -> Option<T> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            warn!(sequence, what, "panic while decoding entry; entry skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::ledger_range, testutils, xdr};

    #[test]
    fn one_ledger_row_with_consistent_counts() {
        let extraction = testutils::extraction(123_456, 3);
        let ledger = &extraction.ledger;
        assert_eq!(ledger.sequence, 123_456);
        assert_eq!(ledger.successful_transaction_count, 3);
        assert_eq!(ledger.failed_transaction_count, 0);
        assert_eq!(ledger.operation_count, 3);
        assert_eq!(ledger.tx_set_operation_count, 3);
        assert_eq!(extraction.transactions.len(), 3);
        assert_eq!(extraction.operations.len(), 3);
    }

    #[test]
    fn every_row_carries_the_partition_key() {
        let extraction = testutils::extraction(123_456, 2);
        let expected = ledger_range(123_456);
        assert_eq!(expected, 120_000);
        assert_eq!(extraction.ledger.ledger_range, expected);
        assert!(extraction
            .transactions
            .iter()
            .all(|t| t.ledger_range == expected));
        assert!(extraction
            .operations
            .iter()
            .all(|o| o.ledger_range == expected));
        assert!(extraction.effects.iter().all(|e| e.ledger_range == expected));
    }

    #[test]
    fn hashes_and_accounts_use_canonical_formats() {
        let extraction = testutils::extraction(100, 2);
        assert!(crate::quality::is_hex_hash(&extraction.ledger.ledger_hash));
        for tx in &extraction.transactions {
            assert!(crate::quality::is_hex_hash(&tx.transaction_hash));
            assert!(crate::quality::is_account_id(&tx.source_account));
        }
    }

    #[test]
    fn operation_indices_are_contiguous_from_zero() {
        let extraction = testutils::extraction(100, 2);
        for tx in &extraction.transactions {
            let mut indices: Vec<u32> = extraction
                .operations
                .iter()
                .filter(|o| o.transaction_hash == tx.transaction_hash)
                .map(|o| o.operation_index)
                .collect();
            indices.sort_unstable();
            assert_eq!(indices, (0..indices.len() as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn operations_carry_distinct_result_and_trace_codes() {
        let extraction = testutils::extraction(100, 1);
        let op = &extraction.operations[0];
        assert_eq!(op.operation_type, "payment");
        assert_eq!(op.operation_result_code, "op_inner");
        assert_eq!(op.operation_trace_code, "PaymentSuccess");
        assert!(op.successful);
    }

    #[test]
    fn payment_produces_credit_and_debit_effects() {
        let extraction = testutils::extraction(100, 1);
        let types: Vec<&str> = extraction
            .effects
            .iter()
            .map(|e| e.effect_type.as_str())
            .collect();
        assert_eq!(types, vec!["account_credited", "account_debited"]);
        assert_eq!(extraction.effects[0].effect_index, 0);
        assert_eq!(extraction.effects[1].effect_index, 1);
        assert_eq!(
            extraction.effects[0].amount.as_deref(),
            Some("5000000")
        );
    }

    #[test]
    fn last_write_wins_within_a_ledger() {
        let ledger = testutils::closed_ledger_with_changes(
            100,
            vec![
                xdr::LedgerEntryChange::Created(testutils::account_entry(9, 1_000, 100)),
                xdr::LedgerEntryChange::Updated(testutils::account_entry(9, 2_500, 100)),
            ],
        );
        let extraction = extract_ledger(&ledger, &testutils::test_ctx());
        assert_eq!(extraction.accounts.len(), 1);
        assert_eq!(extraction.accounts[0].balance, 2_500);
        assert_eq!(extraction.native_balances.len(), 1);
        assert!(!extraction.accounts[0].deleted);
    }

    #[test]
    fn distinct_natural_keys_produce_distinct_rows() {
        let ledger = testutils::closed_ledger_with_changes(
            100,
            vec![
                xdr::LedgerEntryChange::Created(testutils::account_entry(9, 1_000, 100)),
                xdr::LedgerEntryChange::Created(testutils::account_entry(10, 2_000, 100)),
            ],
        );
        let extraction = extract_ledger(&ledger, &testutils::test_ctx());
        assert_eq!(extraction.accounts.len(), 2);
    }

    #[test]
    fn removal_emits_a_deleted_snapshot_row() {
        let ledger = testutils::closed_ledger_with_changes(
            100,
            vec![
                xdr::LedgerEntryChange::Created(testutils::account_entry(9, 1_000, 100)),
                xdr::LedgerEntryChange::Removed(xdr::LedgerKey::Account(
                    xdr::LedgerKeyAccount {
                        account_id: testutils::account_id(9),
                    },
                )),
            ],
        );
        let extraction = extract_ledger(&ledger, &testutils::test_ctx());
        assert_eq!(extraction.accounts.len(), 1);
        assert!(extraction.accounts[0].deleted);
        assert_eq!(extraction.accounts[0].balance, 0);
    }

    #[test]
    fn panicking_entry_is_skipped_not_fatal() {
        let skipped: Option<()> = guard_entry("test entry", 1, || panic!("malformed"));
        assert_eq!(skipped, None);
        let kept = guard_entry("test entry", 1, || Some(7));
        assert_eq!(kept, Some(7));
    }
}
