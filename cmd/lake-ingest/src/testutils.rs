//! Synthetic closed ledgers for tests: a V0 close meta with one native
//! payment per transaction, hashed against the test network so envelope
//! pairing works end to end.

use sha2::{Digest, Sha256};

use crate::{
    extract::{self, view, Ctx, LedgerExtraction},
    model::ClosedLedger,
    xdr,
};

pub const TEST_PASSPHRASE: &str = "Test SDF Network ; September 2015";

pub fn test_ctx() -> Ctx {
    Ctx::new(TEST_PASSPHRASE)
}

fn hash_of(seed: u64) -> xdr::Hash {
    xdr::Hash(Sha256::digest(seed.to_be_bytes()).into())
}

fn payment_tx(seq: u32, tx_order: usize) -> xdr::Transaction {
    xdr::Transaction {
        source_account: xdr::MuxedAccount::Ed25519(xdr::Uint256([1; 32])),
        fee: 100,
        seq_num: xdr::SequenceNumber(i64::from(seq) * 1000 + tx_order as i64),
        cond: xdr::Preconditions::None,
        memo: xdr::Memo::None,
        operations: vec![xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::Payment(xdr::PaymentOp {
                destination: xdr::MuxedAccount::Ed25519(xdr::Uint256([2; 32])),
                asset: xdr::Asset::Native,
                amount: 5_000_000,
            }),
        }]
        .try_into()
        .unwrap(),
        ext: xdr::TransactionExt::V0,
    }
}

fn success_result(hash: [u8; 32]) -> xdr::TransactionResultMeta {
    success_result_with_changes(hash, Vec::new())
}

fn success_result_with_changes(
    hash: [u8; 32],
    changes: Vec<xdr::LedgerEntryChange>,
) -> xdr::TransactionResultMeta {
    xdr::TransactionResultMeta {
        result: xdr::TransactionResultPair {
            transaction_hash: xdr::Hash(hash),
            result: xdr::TransactionResult {
                fee_charged: 100,
                result: xdr::TransactionResultResult::TxSuccess(
                    vec![xdr::OperationResult::OpInner(
                        xdr::OperationResultTr::Payment(xdr::PaymentResult::Success),
                    )]
                    .try_into()
                    .unwrap(),
                ),
                ext: xdr::TransactionResultExt::V0,
            },
        },
        fee_processing: xdr::LedgerEntryChanges(xdr::VecM::default()),
        tx_apply_processing: xdr::TransactionMeta::V1(xdr::TransactionMetaV1 {
            tx_changes: xdr::LedgerEntryChanges(xdr::VecM::default()),
            operations: vec![xdr::OperationMeta {
                changes: xdr::LedgerEntryChanges(changes.try_into().unwrap()),
            }]
            .try_into()
            .unwrap(),
        }),
    }
}

pub fn account_id(seed: u8) -> xdr::AccountId {
    xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(
        [seed; 32],
    )))
}

pub fn account_entry(seed: u8, balance: i64, seq: u32) -> xdr::LedgerEntry {
    xdr::LedgerEntry {
        last_modified_ledger_seq: seq,
        data: xdr::LedgerEntryData::Account(xdr::AccountEntry {
            account_id: account_id(seed),
            balance,
            seq_num: xdr::SequenceNumber(1),
            num_sub_entries: 0,
            inflation_dest: None,
            flags: 0,
            home_domain: xdr::String32(Default::default()),
            thresholds: xdr::Thresholds([1, 0, 0, 0]),
            signers: xdr::VecM::default(),
            ext: xdr::AccountEntryExt::V0,
        }),
        ext: xdr::LedgerEntryExt::V0,
    }
}

/// An account entry whose signer list and V2 sponsoring descriptors
/// disagree in length: representable on the wire, invalid per protocol,
/// and panics mid-decode in the signer extraction.
pub fn malformed_account_entry(seed: u8, seq: u32) -> xdr::LedgerEntry {
    xdr::LedgerEntry {
        last_modified_ledger_seq: seq,
        data: xdr::LedgerEntryData::Account(xdr::AccountEntry {
            account_id: account_id(seed),
            balance: 1_000,
            seq_num: xdr::SequenceNumber(1),
            num_sub_entries: 1,
            inflation_dest: None,
            flags: 0,
            home_domain: xdr::String32(Default::default()),
            thresholds: xdr::Thresholds([1, 0, 0, 0]),
            signers: vec![xdr::Signer {
                key: xdr::SignerKey::Ed25519(xdr::Uint256([seed.wrapping_add(1); 32])),
                weight: 1,
            }]
            .try_into()
            .unwrap(),
            ext: xdr::AccountEntryExt::V1(xdr::AccountEntryExtensionV1 {
                liabilities: xdr::Liabilities {
                    buying: 0,
                    selling: 0,
                },
                ext: xdr::AccountEntryExtensionV1Ext::V2(xdr::AccountEntryExtensionV2 {
                    num_sponsored: 0,
                    num_sponsoring: 0,
                    signer_sponsoring_i_ds: xdr::VecM::default(),
                    ext: xdr::AccountEntryExtensionV2Ext::V0,
                }),
            }),
        }),
        ext: xdr::LedgerEntryExt::V0,
    }
}

/// One single-payment transaction whose op meta carries the given entry
/// changes; used to exercise the snapshot extractors.
pub fn closed_ledger_with_changes(
    seq: u32,
    changes: Vec<xdr::LedgerEntryChange>,
) -> ClosedLedger {
    let network_id = view::network_id(TEST_PASSPHRASE);
    let envelope = xdr::TransactionEnvelope::Tx(xdr::TransactionV1Envelope {
        tx: payment_tx(seq, 0),
        signatures: xdr::VecM::default(),
    });
    let hash = view::transaction_hash(&envelope, &network_id).unwrap();

    ClosedLedger(xdr::LedgerCloseMeta::V0(xdr::LedgerCloseMetaV0 {
        ledger_header: header(seq),
        tx_set: xdr::TransactionSet {
            previous_ledger_hash: hash_of(u64::from(seq) - 1),
            txs: vec![envelope].try_into().unwrap(),
        },
        tx_processing: vec![success_result_with_changes(hash, changes)]
            .try_into()
            .unwrap(),
        upgrades_processing: xdr::VecM::default(),
        scp_info: xdr::VecM::default(),
    }))
}

fn header(seq: u32) -> xdr::LedgerHeaderHistoryEntry {
    xdr::LedgerHeaderHistoryEntry {
        hash: hash_of(u64::from(seq)),
        header: xdr::LedgerHeader {
            ledger_version: 21,
            previous_ledger_hash: hash_of(u64::from(seq) - 1),
            scp_value: xdr::StellarValue {
                tx_set_hash: xdr::Hash([0; 32]),
                close_time: xdr::TimePoint(1_700_000_000 + u64::from(seq) * 5),
                upgrades: xdr::VecM::default(),
                ext: xdr::StellarValueExt::Basic,
            },
            tx_set_result_hash: xdr::Hash([0; 32]),
            bucket_list_hash: xdr::Hash([0; 32]),
            ledger_seq: seq,
            total_coins: 1_000_000_000_000,
            fee_pool: 0,
            inflation_seq: 0,
            id_pool: 0,
            base_fee: 100,
            base_reserve: 5_000_000,
            max_tx_set_size: 1000,
            skip_list: [
                xdr::Hash([0; 32]),
                xdr::Hash([0; 32]),
                xdr::Hash([0; 32]),
                xdr::Hash([0; 32]),
            ],
            ext: xdr::LedgerHeaderExt::V0,
        },
        ext: xdr::LedgerHeaderHistoryEntryExt::V0,
    }
}

/// A V0 close meta for `seq` carrying `n_txs` single-payment transactions.
pub fn closed_ledger(seq: u32, n_txs: usize) -> ClosedLedger {
    let network_id = view::network_id(TEST_PASSPHRASE);

    let mut envelopes = Vec::new();
    let mut processing = Vec::new();
    for tx_order in 0..n_txs {
        let envelope = xdr::TransactionEnvelope::Tx(xdr::TransactionV1Envelope {
            tx: payment_tx(seq, tx_order),
            signatures: xdr::VecM::default(),
        });
        let hash = view::transaction_hash(&envelope, &network_id).unwrap();
        processing.push(success_result(hash));
        envelopes.push(envelope);
    }

    ClosedLedger(xdr::LedgerCloseMeta::V0(xdr::LedgerCloseMetaV0 {
        ledger_header: header(seq),
        tx_set: xdr::TransactionSet {
            previous_ledger_hash: hash_of(u64::from(seq) - 1),
            txs: envelopes.try_into().unwrap(),
        },
        tx_processing: processing.try_into().unwrap(),
        upgrades_processing: xdr::VecM::default(),
        scp_info: xdr::VecM::default(),
    }))
}

/// The decomposition of a synthetic ledger, through the real extractors.
pub fn extraction(seq: u32, n_txs: usize) -> LedgerExtraction {
    extract::extract_ledger(&closed_ledger(seq, n_txs), &test_ctx())
}
