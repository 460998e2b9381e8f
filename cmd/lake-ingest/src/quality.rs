//! Per-batch invariant checks over the worker buffer. Failures are
//! recorded in `_meta_quality` and logged; they never abort a flush.

use std::collections::{HashMap, HashSet};
use std::fmt;

use itertools::Itertools;

use crate::buffer::WorkerBuffer;

const MIN_BASE_FEE: i64 = 100;
const MAX_FEE_CHARGED: i64 = 1_000_000_000;
const MAX_BALANCE: i64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    Completeness,
    Consistency,
    Validity,
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckType::Completeness => f.write_str("completeness"),
            CheckType::Consistency => f.write_str("consistency"),
            CheckType::Validity => f.write_str("validity"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QualityResult {
    pub check_name: &'static str,
    pub check_type: CheckType,
    pub dataset: &'static str,
    pub passed: bool,
    pub failure_count: u64,
    pub details: Option<String>,
}

impl QualityResult {
    fn new(
        check_name: &'static str,
        check_type: CheckType,
        dataset: &'static str,
        failure_count: u64,
        details: Option<String>,
    ) -> Self {
        Self {
            check_name,
            check_type,
            dataset,
            passed: failure_count == 0,
            failure_count,
            details,
        }
    }
}

pub fn is_hex_hash(value: &str) -> bool {
    value.len() == 64
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

pub fn is_account_id(value: &str) -> bool {
    stellar_strkey::ed25519::PublicKey::from_string(value).is_ok()
}

/// Runs all 19 checks against the buffered batch.
pub fn run_checks(buffer: &WorkerBuffer) -> Vec<QualityResult> {
    let ledger_sequences: HashSet<u32> = buffer.ledgers.iter().map(|l| l.sequence).collect();
    let transaction_hashes: HashSet<&str> = buffer
        .transactions
        .iter()
        .map(|t| t.transaction_hash.as_str())
        .collect();

    let mut results = Vec::with_capacity(19);

    // Ledgers.
    results.push(sequence_monotonicity(buffer));
    results.push(check_rows(
        "ledger_hash_format",
        CheckType::Validity,
        "ledgers",
        buffer.ledgers.iter(),
        |l| is_hex_hash(&l.ledger_hash) && is_hex_hash(&l.previous_ledger_hash),
    ));
    results.push(transaction_count_consistency(buffer));
    results.push(timestamp_ordering(buffer));
    results.push(check_rows(
        "required_fields",
        CheckType::Completeness,
        "ledgers",
        buffer.ledgers.iter(),
        |l| !l.ledger_hash.is_empty() && l.closed_at != 0 && l.sequence != 0,
    ));

    // Transactions.
    results.push(check_rows(
        "transaction_hash_format",
        CheckType::Validity,
        "transactions",
        buffer.transactions.iter(),
        |t| is_hex_hash(&t.transaction_hash),
    ));
    results.push(check_rows(
        "source_account_format",
        CheckType::Validity,
        "transactions",
        buffer.transactions.iter(),
        |t| is_account_id(&t.source_account),
    ));
    results.push(check_rows(
        "transaction_fee_range",
        CheckType::Validity,
        "transactions",
        buffer.transactions.iter(),
        |t| (MIN_BASE_FEE..=MAX_FEE_CHARGED).contains(&t.fee_charged),
    ));
    results.push(check_rows(
        "transaction_ledger_consistency",
        CheckType::Consistency,
        "transactions",
        buffer.transactions.iter(),
        |t| ledger_sequences.contains(&t.ledger_sequence),
    ));

    // Operations.
    results.push(operation_index_ordering(buffer));
    results.push(check_rows(
        "operation_transaction_hash",
        CheckType::Consistency,
        "operations",
        buffer.operations.iter(),
        |o| transaction_hashes.contains(o.transaction_hash.as_str()),
    ));
    results.push(check_rows(
        "operation_ledger_consistency",
        CheckType::Consistency,
        "operations",
        buffer.operations.iter(),
        |o| ledger_sequences.contains(&o.ledger_sequence),
    ));
    results.push(check_rows(
        "operation_required_fields",
        CheckType::Completeness,
        "operations",
        buffer.operations.iter(),
        |o| o.operation_id != 0 && !o.operation_type.is_empty() && !o.transaction_hash.is_empty(),
    ));

    // Native balances.
    results.push(check_rows(
        "balance_account_id_format",
        CheckType::Validity,
        "native_balances",
        buffer.native_balances.iter(),
        |b| is_account_id(&b.account_id),
    ));
    results.push(check_rows(
        "balance_range",
        CheckType::Validity,
        "native_balances",
        buffer.native_balances.iter(),
        |b| (0..=MAX_BALANCE).contains(&b.balance),
    ));
    results.push(check_rows(
        "liabilities_validation",
        CheckType::Validity,
        "native_balances",
        buffer.native_balances.iter(),
        |b| {
            b.buying_liabilities >= 0
                && b.selling_liabilities >= 0
                && i128::from(b.buying_liabilities) + i128::from(b.selling_liabilities)
                    <= 2 * i128::from(b.balance)
        },
    ));
    results.push(check_rows(
        "balance_ledger_consistency",
        CheckType::Consistency,
        "native_balances",
        buffer.native_balances.iter(),
        |b| ledger_sequences.contains(&b.ledger_sequence),
    ));
    results.push(check_rows(
        "balance_required_fields",
        CheckType::Completeness,
        "native_balances",
        buffer.native_balances.iter(),
        |b| !b.account_id.is_empty() && b.ledger_sequence != 0,
    ));
    results.push(check_rows(
        "sequence_number_validity",
        CheckType::Validity,
        "native_balances",
        buffer.native_balances.iter(),
        |b| b.sequence_number >= 0,
    ));

    results
}

fn check_rows<'a, T: 'a>(
    check_name: &'static str,
    check_type: CheckType,
    dataset: &'static str,
    rows: impl Iterator<Item = &'a T>,
    ok: impl Fn(&T) -> bool,
) -> QualityResult {
    let failure_count = rows.filter(|row| !ok(row)).count() as u64;
    QualityResult::new(check_name, check_type, dataset, failure_count, None)
}

/// No gaps and no duplicates once sorted by sequence.
fn sequence_monotonicity(buffer: &WorkerBuffer) -> QualityResult {
    let mut sequences: Vec<u32> = buffer.ledgers.iter().map(|l| l.sequence).collect();
    sequences.sort_unstable();
    let failures = sequences
        .windows(2)
        .filter(|w| w[1] != w[0] + 1)
        .count() as u64;
    let details = (failures > 0).then(|| {
        format!(
            "{} discontinuities in [{}, {}]",
            failures,
            sequences.first().copied().unwrap_or_default(),
            sequences.last().copied().unwrap_or_default()
        )
    });
    QualityResult::new(
        "sequence_monotonicity",
        CheckType::Consistency,
        "ledgers",
        failures,
        details,
    )
}

/// Each ledger's transaction count must equal the transaction rows the
/// batch holds for that sequence.
fn transaction_count_consistency(buffer: &WorkerBuffer) -> QualityResult {
    let mut observed: HashMap<u32, u32> = HashMap::new();
    for tx in &buffer.transactions {
        *observed.entry(tx.ledger_sequence).or_default() += 1;
    }
    let failures = buffer
        .ledgers
        .iter()
        .filter(|l| {
            let expected = l.successful_transaction_count + l.failed_transaction_count;
            observed.get(&l.sequence).copied().unwrap_or_default() != expected
        })
        .count() as u64;
    QualityResult::new(
        "transaction_count_consistency",
        CheckType::Consistency,
        "ledgers",
        failures,
        None,
    )
}

/// Close times must be non-decreasing in sequence order.
fn timestamp_ordering(buffer: &WorkerBuffer) -> QualityResult {
    let failures = buffer
        .ledgers
        .iter()
        .sorted_by_key(|l| l.sequence)
        .tuple_windows()
        .filter(|(a, b)| b.closed_at < a.closed_at)
        .count() as u64;
    QualityResult::new(
        "timestamp_ordering",
        CheckType::Consistency,
        "ledgers",
        failures,
        None,
    )
}

/// Per transaction, operation indices must be contiguous from the first
/// observed index.
fn operation_index_ordering(buffer: &WorkerBuffer) -> QualityResult {
    let mut by_tx: HashMap<&str, Vec<u32>> = HashMap::new();
    for op in &buffer.operations {
        by_tx
            .entry(op.transaction_hash.as_str())
            .or_default()
            .push(op.operation_index);
    }
    let mut failures = 0u64;
    for indices in by_tx.values_mut() {
        indices.sort_unstable();
        if indices.windows(2).any(|w| w[1] != w[0] + 1) {
            failures += 1;
        }
    }
    let failures = failures;
    QualityResult::new(
        "operation_index_ordering",
        CheckType::Consistency,
        "operations",
        failures,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::WorkerBuffer, testutils};

    fn buffer_for(range: std::ops::RangeInclusive<u32>) -> WorkerBuffer {
        let mut buffer = WorkerBuffer::new();
        for seq in range {
            buffer.append_ledger(testutils::extraction(seq, 1));
        }
        buffer
    }

    #[test]
    fn clean_batch_passes_all_checks() {
        let buffer = buffer_for(100..=104);
        let results = run_checks(&buffer);
        assert_eq!(results.len(), 19);
        for result in &results {
            assert!(
                result.passed,
                "check {} failed: {:?}",
                result.check_name, result.details
            );
        }
    }

    #[test]
    fn gap_in_sequences_is_reported() {
        let mut buffer = buffer_for(100..=102);
        buffer.ledgers[1].sequence = 200;
        let results = run_checks(&buffer);
        let monotonicity = results
            .iter()
            .find(|r| r.check_name == "sequence_monotonicity")
            .unwrap();
        assert!(!monotonicity.passed);
        assert_eq!(monotonicity.failure_count, 2);
    }

    #[test]
    fn missing_transaction_row_breaks_count_consistency() {
        let mut buffer = buffer_for(100..=101);
        buffer.transactions.pop();
        let results = run_checks(&buffer);
        let count = results
            .iter()
            .find(|r| r.check_name == "transaction_count_consistency")
            .unwrap();
        assert!(!count.passed);
        assert_eq!(count.failure_count, 1);
    }

    #[test]
    fn malformed_source_account_is_reported() {
        let mut buffer = buffer_for(100..=100);
        buffer.transactions[0].source_account = "not-an-account".to_string();
        let results = run_checks(&buffer);
        let format = results
            .iter()
            .find(|r| r.check_name == "source_account_format")
            .unwrap();
        assert_eq!(format.failure_count, 1);
    }

    #[test]
    fn hash_format_rejects_uppercase_and_short_values() {
        assert!(is_hex_hash(&"a".repeat(64)));
        assert!(!is_hex_hash(&"A".repeat(64)));
        assert!(!is_hex_hash("abc123"));
    }

    #[test]
    fn fee_out_of_range_is_reported() {
        let mut buffer = buffer_for(100..=100);
        buffer.transactions[0].fee_charged = 1;
        let results = run_checks(&buffer);
        let fee = results
            .iter()
            .find(|r| r.check_name == "transaction_fee_range")
            .unwrap();
        assert_eq!(fee.failure_count, 1);
    }

    #[test]
    fn liabilities_cannot_exceed_twice_balance() {
        let mut buffer = buffer_for(100..=100);
        buffer.native_balances.push(crate::model::rows::NativeBalanceRow {
            account_id: "GA7QYNF7SOWQ3GLR2BGMZEHXAVIRZA4KVWLTJJFC7MGXUA74P7UJVSGZ".to_string(),
            balance: 100,
            buying_liabilities: 150,
            selling_liabilities: 100,
            sequence_number: 1,
            num_sub_entries: 0,
            last_modified_ledger: 100,
            deleted: false,
            ledger_sequence: 100,
            ledger_range: 0,
            closed_at: 1,
            created_at: 1,
        });
        let results = run_checks(&buffer);
        let liabilities = results
            .iter()
            .find(|r| r.check_name == "liabilities_validation")
            .unwrap();
        assert_eq!(liabilities.failure_count, 1);
    }
}
