//! Shared per-ledger traversal state: transaction packs pairing each applied
//! result with its envelope, and the post-state entry deltas accumulated
//! across the whole ledger. Built once, consumed by every extractor.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{
    model::ClosedLedger,
    xdr::{self, Limits, WriteXdr},
};

/// One applied transaction: result, fee changes and apply meta in
/// application order, paired with its envelope out of the transaction set.
pub struct TxPack<'a> {
    /// 1-based application order within the ledger.
    pub apply_order: u32,
    pub hash_hex: String,
    /// None when the envelope could not be located in the transaction set;
    /// envelope-derived columns then fall back to defaults.
    pub envelope: Option<&'a xdr::TransactionEnvelope>,
    pub result: &'a xdr::TransactionResultPair,
    pub fee_changes: &'a xdr::LedgerEntryChanges,
    pub meta: &'a xdr::TransactionMeta,
}

/// The post-state of one ledger entry after every write in the ledger was
/// applied, keyed by the entry's natural ledger key. `entry == None` means
/// the last write removed it.
pub struct EntryDelta {
    pub key: xdr::LedgerKey,
    pub entry: Option<xdr::LedgerEntry>,
}

pub struct LedgerView<'a> {
    pub ledger: &'a ClosedLedger,
    pub packs: Vec<TxPack<'a>>,
    pub deltas: Vec<EntryDelta>,
    pub tx_set_operation_count: u32,
}

impl<'a> LedgerView<'a> {
    pub fn build(ledger: &'a ClosedLedger, network_id: &[u8; 32]) -> Self {
        let envelopes = set_envelopes(ledger);
        let tx_set_operation_count = envelopes
            .iter()
            .map(|e| envelope_operations(e).len() as u32)
            .sum();

        let mut by_hash: HashMap<[u8; 32], &xdr::TransactionEnvelope> = HashMap::new();
        for envelope in envelopes {
            match transaction_hash(envelope, network_id) {
                Ok(hash) => {
                    by_hash.insert(hash, envelope);
                }
                Err(e) => {
                    warn!(
                        sequence = ledger.sequence(),
                        "hashing envelope in transaction set: {e}"
                    );
                }
            }
        }

        let mut packs = Vec::new();
        {
            let mut push_pack = |result: &'a xdr::TransactionResultPair,
                                 fee_changes: &'a xdr::LedgerEntryChanges,
                                 meta: &'a xdr::TransactionMeta| {
                let apply_order = packs.len() as u32 + 1;
                let hash = result.transaction_hash.0;
                let envelope = by_hash.get(&hash).copied();
                if envelope.is_none() {
                    warn!(
                        sequence = ledger.sequence(),
                        tx = %hex::encode(hash),
                        "transaction result has no envelope in the transaction set"
                    );
                }
                packs.push(TxPack {
                    apply_order,
                    hash_hex: hex::encode(hash),
                    envelope,
                    result,
                    fee_changes,
                    meta,
                });
            };

            match &ledger.0 {
                xdr::LedgerCloseMeta::V0(m) => {
                    for t in m.tx_processing.iter() {
                        push_pack(&t.result, &t.fee_processing, &t.tx_apply_processing);
                    }
                }
                xdr::LedgerCloseMeta::V1(m) => {
                    for t in m.tx_processing.iter() {
                        push_pack(&t.result, &t.fee_processing, &t.tx_apply_processing);
                    }
                }
                xdr::LedgerCloseMeta::V2(m) => {
                    for t in m.tx_processing.iter() {
                        push_pack(&t.result, &t.fee_processing, &t.tx_apply_processing);
                    }
                }
            }
        }

        let deltas = post_state_deltas(ledger, &packs);

        Self {
            ledger,
            packs,
            deltas,
            tx_set_operation_count,
        }
    }

    /// Evicted-key records; populated only by V2 close metas.
    pub fn evicted_keys(&self) -> &'a [xdr::LedgerKey] {
        match &self.ledger.0 {
            xdr::LedgerCloseMeta::V2(m) => m.evicted_keys.as_slice(),
            _ => &[],
        }
    }
}

/// Envelopes of the transaction set in set order. Set order is not apply
/// order; callers pair through the result hashes.
fn set_envelopes(ledger: &ClosedLedger) -> Vec<&xdr::TransactionEnvelope> {
    match &ledger.0 {
        xdr::LedgerCloseMeta::V0(m) => m.tx_set.txs.iter().collect(),
        xdr::LedgerCloseMeta::V1(m) => generalized_envelopes(&m.tx_set),
        xdr::LedgerCloseMeta::V2(m) => generalized_envelopes(&m.tx_set),
    }
}

fn generalized_envelopes(set: &xdr::GeneralizedTransactionSet) -> Vec<&xdr::TransactionEnvelope> {
    let xdr::GeneralizedTransactionSet::V1(set) = set;
    let mut envelopes = Vec::new();
    for phase in set.phases.iter() {
        match phase {
            xdr::TransactionPhase::V0(components) => {
                for component in components.iter() {
                    let xdr::TxSetComponent::TxsetCompTxsMaybeDiscountedFee(c) = component;
                    envelopes.extend(c.txs.iter());
                }
            }
            xdr::TransactionPhase::V1(parallel) => {
                for stage in parallel.execution_stages.iter() {
                    for cluster in stage.0.iter() {
                        envelopes.extend(cluster.0.iter());
                    }
                }
            }
        }
    }
    envelopes
}

/// Operations of the operative transaction: the inner transaction for fee
/// bumps, the transaction itself otherwise.
pub fn envelope_operations(envelope: &xdr::TransactionEnvelope) -> &[xdr::Operation] {
    match envelope {
        xdr::TransactionEnvelope::TxV0(e) => e.tx.operations.as_slice(),
        xdr::TransactionEnvelope::Tx(e) => e.tx.operations.as_slice(),
        xdr::TransactionEnvelope::TxFeeBump(e) => {
            let xdr::FeeBumpTransactionInnerTx::Tx(inner) = &e.tx.inner_tx;
            inner.tx.operations.as_slice()
        }
    }
}

/// Source of the operative transaction.
pub fn envelope_source(envelope: &xdr::TransactionEnvelope) -> xdr::MuxedAccount {
    match envelope {
        xdr::TransactionEnvelope::TxV0(e) => {
            xdr::MuxedAccount::Ed25519(e.tx.source_account_ed25519.clone())
        }
        xdr::TransactionEnvelope::Tx(e) => e.tx.source_account.clone(),
        xdr::TransactionEnvelope::TxFeeBump(e) => {
            let xdr::FeeBumpTransactionInnerTx::Tx(inner) = &e.tx.inner_tx;
            inner.tx.source_account.clone()
        }
    }
}

pub fn envelope_seq_num(envelope: &xdr::TransactionEnvelope) -> i64 {
    match envelope {
        xdr::TransactionEnvelope::TxV0(e) => e.tx.seq_num.0,
        xdr::TransactionEnvelope::Tx(e) => e.tx.seq_num.0,
        xdr::TransactionEnvelope::TxFeeBump(e) => {
            let xdr::FeeBumpTransactionInnerTx::Tx(inner) = &e.tx.inner_tx;
            inner.tx.seq_num.0
        }
    }
}

/// Declared max fee of the envelope as submitted; the outer fee for bumps.
pub fn envelope_max_fee(envelope: &xdr::TransactionEnvelope) -> i64 {
    match envelope {
        xdr::TransactionEnvelope::TxV0(e) => e.tx.fee.into(),
        xdr::TransactionEnvelope::Tx(e) => e.tx.fee.into(),
        xdr::TransactionEnvelope::TxFeeBump(e) => e.tx.fee,
    }
}

pub fn envelope_memo(envelope: &xdr::TransactionEnvelope) -> &xdr::Memo {
    match envelope {
        xdr::TransactionEnvelope::TxV0(e) => &e.tx.memo,
        xdr::TransactionEnvelope::Tx(e) => &e.tx.memo,
        xdr::TransactionEnvelope::TxFeeBump(e) => {
            let xdr::FeeBumpTransactionInnerTx::Tx(inner) = &e.tx.inner_tx;
            &inner.tx.memo
        }
    }
}

/// Fee-bump plumbing: `(fee_account, inner_hash)` when the envelope is a
/// fee bump.
pub fn fee_bump_parts(
    envelope: &xdr::TransactionEnvelope,
    network_id: &[u8; 32],
) -> Option<(xdr::MuxedAccount, Option<String>)> {
    match envelope {
        xdr::TransactionEnvelope::TxFeeBump(e) => {
            let xdr::FeeBumpTransactionInnerTx::Tx(inner) = &e.tx.inner_tx;
            let inner_hash = inner_transaction_hash(&inner.tx, network_id)
                .map(hex::encode)
                .ok();
            Some((e.tx.fee_source.clone(), inner_hash))
        }
        _ => None,
    }
}

pub fn transaction_hash(
    envelope: &xdr::TransactionEnvelope,
    network_id: &[u8; 32],
) -> Result<[u8; 32], xdr::Error> {
    let tagged = match envelope {
        xdr::TransactionEnvelope::TxV0(e) => {
            xdr::TransactionSignaturePayloadTaggedTransaction::Tx(tx_from_v0(&e.tx)?)
        }
        xdr::TransactionEnvelope::Tx(e) => {
            xdr::TransactionSignaturePayloadTaggedTransaction::Tx(e.tx.clone())
        }
        xdr::TransactionEnvelope::TxFeeBump(e) => {
            xdr::TransactionSignaturePayloadTaggedTransaction::TxFeeBump(e.tx.clone())
        }
    };
    payload_hash(tagged, network_id)
}

fn inner_transaction_hash(
    tx: &xdr::Transaction,
    network_id: &[u8; 32],
) -> Result<[u8; 32], xdr::Error> {
    payload_hash(
        xdr::TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
        network_id,
    )
}

fn payload_hash(
    tagged_transaction: xdr::TransactionSignaturePayloadTaggedTransaction,
    network_id: &[u8; 32],
) -> Result<[u8; 32], xdr::Error> {
    let payload = xdr::TransactionSignaturePayload {
        network_id: xdr::Hash(*network_id),
        tagged_transaction,
    };
    Ok(Sha256::digest(payload.to_xdr(Limits::none())?).into())
}

/// V0 envelopes hash as their V1 upgrade, per the classic protocol rules.
fn tx_from_v0(tx: &xdr::TransactionV0) -> Result<xdr::Transaction, xdr::Error> {
    Ok(xdr::Transaction {
        source_account: xdr::MuxedAccount::Ed25519(tx.source_account_ed25519.clone()),
        fee: tx.fee,
        seq_num: tx.seq_num.clone(),
        cond: match tx.time_bounds.clone() {
            Some(time_bounds) => xdr::Preconditions::Time(time_bounds),
            None => xdr::Preconditions::None,
        },
        memo: tx.memo.clone(),
        operations: tx.operations.clone(),
        ext: xdr::TransactionExt::V0,
    })
}

pub fn network_id(passphrase: &str) -> [u8; 32] {
    Sha256::digest(passphrase.as_bytes()).into()
}

fn post_state_deltas(ledger: &ClosedLedger, packs: &[TxPack]) -> Vec<EntryDelta> {
    // Last write wins within the ledger; first-seen order is kept so the
    // emitted rows stay deterministic.
    let mut order: Vec<xdr::LedgerKey> = Vec::new();
    let mut state: HashMap<xdr::LedgerKey, Option<xdr::LedgerEntry>> = HashMap::new();

    let mut apply = |change: &xdr::LedgerEntryChange| {
        let (key, entry) = match change {
            xdr::LedgerEntryChange::Created(e)
            | xdr::LedgerEntryChange::Updated(e)
            | xdr::LedgerEntryChange::Restored(e) => match ledger_entry_key(e) {
                Some(key) => (key, Some(e.clone())),
                None => return,
            },
            xdr::LedgerEntryChange::Removed(k) => (k.clone(), None),
            xdr::LedgerEntryChange::State(_) => return,
        };
        if !state.contains_key(&key) {
            order.push(key.clone());
        }
        state.insert(key, entry);
    };

    for pack in packs {
        for change in pack.fee_changes.iter() {
            apply(change);
        }
    }
    for pack in packs {
        for change in meta_changes(pack.meta) {
            apply(change);
        }
    }
    for upgrade in upgrades_processing(ledger) {
        for change in upgrade.changes.iter() {
            apply(change);
        }
    }

    order
        .into_iter()
        .map(|key| {
            let entry = state.remove(&key).flatten();
            EntryDelta { key, entry }
        })
        .collect()
}

fn upgrades_processing(ledger: &ClosedLedger) -> &[xdr::UpgradeEntryMeta] {
    match &ledger.0 {
        xdr::LedgerCloseMeta::V0(m) => m.upgrades_processing.as_slice(),
        xdr::LedgerCloseMeta::V1(m) => m.upgrades_processing.as_slice(),
        xdr::LedgerCloseMeta::V2(m) => m.upgrades_processing.as_slice(),
    }
}

/// Every ledger-entry change inside a transaction's apply meta, in apply
/// order.
pub fn meta_changes(meta: &xdr::TransactionMeta) -> Vec<&xdr::LedgerEntryChange> {
    let mut changes = Vec::new();
    match meta {
        xdr::TransactionMeta::V0(ops) => {
            for op in ops.iter() {
                changes.extend(op.changes.iter());
            }
        }
        xdr::TransactionMeta::V1(m) => {
            changes.extend(m.tx_changes.iter());
            for op in m.operations.iter() {
                changes.extend(op.changes.iter());
            }
        }
        xdr::TransactionMeta::V2(m) => {
            changes.extend(m.tx_changes_before.iter());
            for op in m.operations.iter() {
                changes.extend(op.changes.iter());
            }
            changes.extend(m.tx_changes_after.iter());
        }
        xdr::TransactionMeta::V3(m) => {
            changes.extend(m.tx_changes_before.iter());
            for op in m.operations.iter() {
                changes.extend(op.changes.iter());
            }
            changes.extend(m.tx_changes_after.iter());
        }
        xdr::TransactionMeta::V4(m) => {
            changes.extend(m.tx_changes_before.iter());
            for op in m.operations.iter() {
                changes.extend(op.changes.iter());
            }
            changes.extend(m.tx_changes_after.iter());
        }
    }
    changes
}

/// Per-operation change lists, index-aligned with the transaction's
/// operations.
pub fn operation_changes(meta: &xdr::TransactionMeta) -> Vec<&xdr::LedgerEntryChanges> {
    match meta {
        xdr::TransactionMeta::V0(ops) => ops.iter().map(|op| &op.changes).collect(),
        xdr::TransactionMeta::V1(m) => m.operations.iter().map(|op| &op.changes).collect(),
        xdr::TransactionMeta::V2(m) => m.operations.iter().map(|op| &op.changes).collect(),
        xdr::TransactionMeta::V3(m) => m.operations.iter().map(|op| &op.changes).collect(),
        xdr::TransactionMeta::V4(m) => m.operations.iter().map(|op| &op.changes).collect(),
    }
}

/// The natural ledger key of an entry.
pub fn ledger_entry_key(entry: &xdr::LedgerEntry) -> Option<xdr::LedgerKey> {
    let key = match &entry.data {
        xdr::LedgerEntryData::Account(e) => xdr::LedgerKey::Account(xdr::LedgerKeyAccount {
            account_id: e.account_id.clone(),
        }),
        xdr::LedgerEntryData::Trustline(e) => xdr::LedgerKey::Trustline(xdr::LedgerKeyTrustLine {
            account_id: e.account_id.clone(),
            asset: e.asset.clone(),
        }),
        xdr::LedgerEntryData::Offer(e) => xdr::LedgerKey::Offer(xdr::LedgerKeyOffer {
            seller_id: e.seller_id.clone(),
            offer_id: e.offer_id,
        }),
        xdr::LedgerEntryData::Data(e) => xdr::LedgerKey::Data(xdr::LedgerKeyData {
            account_id: e.account_id.clone(),
            data_name: e.data_name.clone(),
        }),
        xdr::LedgerEntryData::ClaimableBalance(e) => {
            xdr::LedgerKey::ClaimableBalance(xdr::LedgerKeyClaimableBalance {
                balance_id: e.balance_id.clone(),
            })
        }
        xdr::LedgerEntryData::LiquidityPool(e) => {
            xdr::LedgerKey::LiquidityPool(xdr::LedgerKeyLiquidityPool {
                liquidity_pool_id: e.liquidity_pool_id.clone(),
            })
        }
        xdr::LedgerEntryData::ContractData(e) => {
            xdr::LedgerKey::ContractData(xdr::LedgerKeyContractData {
                contract: e.contract.clone(),
                key: e.key.clone(),
                durability: e.durability.clone(),
            })
        }
        xdr::LedgerEntryData::ContractCode(e) => {
            xdr::LedgerKey::ContractCode(xdr::LedgerKeyContractCode {
                hash: e.hash.clone(),
            })
        }
        xdr::LedgerEntryData::ConfigSetting(e) => {
            xdr::LedgerKey::ConfigSetting(xdr::LedgerKeyConfigSetting {
                config_setting_id: e.discriminant(),
            })
        }
        xdr::LedgerEntryData::Ttl(e) => xdr::LedgerKey::Ttl(xdr::LedgerKeyTtl {
            key_hash: e.key_hash.clone(),
        }),
    };
    Some(key)
}
