//! Soroban-side datasets: contract state snapshots out of the entry deltas,
//! contract events out of the apply metas, and the eviction/restoration
//! bookkeeping introduced with the archival protocol.

use base64::Engine;

use crate::{
    extract::{
        common::{
            contract_id_to_strkey, ledger_key_contract, ledger_key_hash, ledger_key_type,
            sc_address_to_strkey, tx_was_successful,
        },
        guard_entry,
        view::{envelope_operations, EntryDelta, LedgerView, TxPack},
        RowCtx,
    },
    model::rows::{
        ConfigSettingRow, ContractCodeRow, ContractDataRow, ContractEventRow, EvictedKeyRow,
        RestoredKeyRow, TtlRow,
    },
    xdr::{self, Limits, WriteXdr},
};

#[derive(Default)]
pub struct SorobanRows {
    pub contract_events: Vec<ContractEventRow>,
    pub contract_data: Vec<ContractDataRow>,
    pub contract_code: Vec<ContractCodeRow>,
    pub config_settings: Vec<ConfigSettingRow>,
    pub ttl: Vec<TtlRow>,
    pub evicted_keys: Vec<EvictedKeyRow>,
    pub restored_keys: Vec<RestoredKeyRow>,
}

pub fn extract(view: &LedgerView, rc: &RowCtx) -> SorobanRows {
    let mut rows = SorobanRows::default();

    for delta in &view.deltas {
        guard_entry("soroban entry", rc.ledger_sequence, || {
            apply_delta(&mut rows, delta, rc);
            Some(())
        });
    }

    for pack in &view.packs {
        contract_events(&mut rows, pack, rc);
        restored_keys(&mut rows, pack, rc);
    }

    for key in view.evicted_keys() {
        let row = guard_entry("evicted key", rc.ledger_sequence, || {
            Some(EvictedKeyRow {
                key_hash: ledger_key_hash(key).ok()?,
                key_type: ledger_key_type(key).to_string(),
                contract_id: ledger_key_contract(key),
                ledger_sequence: rc.ledger_sequence,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            })
        });
        rows.evicted_keys.extend(row);
    }

    rows
}

fn base64_xdr(value: &impl WriteXdr) -> Option<String> {
    value
        .to_xdr(Limits::none())
        .ok()
        .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn apply_delta(rows: &mut SorobanRows, delta: &EntryDelta, rc: &RowCtx) {
    let last_modified = delta
        .entry
        .as_ref()
        .map_or(rc.ledger_sequence, |e| e.last_modified_ledger_seq);

    match &delta.key {
        xdr::LedgerKey::ContractData(key) => {
            let entry = delta.entry.as_ref().and_then(|e| match &e.data {
                xdr::LedgerEntryData::ContractData(d) => Some(d),
                _ => None,
            });
            let durability = match key.durability {
                xdr::ContractDataDurability::Temporary => "temporary",
                xdr::ContractDataDurability::Persistent => "persistent",
            };
            rows.contract_data.push(ContractDataRow {
                contract_id: sc_address_to_strkey(&key.contract),
                key_hash: ledger_key_hash(&delta.key).unwrap_or_default(),
                durability: durability.to_string(),
                key_xdr: base64_xdr(&key.key).unwrap_or_default(),
                val_xdr: entry
                    .and_then(|e| base64_xdr(&e.val))
                    .unwrap_or_default(),
                deleted: entry.is_none(),
                last_modified_ledger: last_modified,
                ledger_sequence: rc.ledger_sequence,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            });
        }
        xdr::LedgerKey::ContractCode(key) => {
            let entry = delta.entry.as_ref().and_then(|e| match &e.data {
                xdr::LedgerEntryData::ContractCode(c) => Some(c),
                _ => None,
            });
            rows.contract_code.push(ContractCodeRow {
                contract_code_hash: hex::encode(key.hash.0),
                code_size: entry.map_or(0, |c| c.code.len() as u32),
                deleted: entry.is_none(),
                last_modified_ledger: last_modified,
                ledger_sequence: rc.ledger_sequence,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            });
        }
        xdr::LedgerKey::ConfigSetting(key) => {
            let entry = delta.entry.as_ref().and_then(|e| match &e.data {
                xdr::LedgerEntryData::ConfigSetting(s) => Some(s),
                _ => None,
            });
            rows.config_settings.push(ConfigSettingRow {
                config_setting_id: key.config_setting_id as i32,
                setting_xdr: entry.and_then(base64_xdr).unwrap_or_default(),
                deleted: entry.is_none(),
                last_modified_ledger: last_modified,
                ledger_sequence: rc.ledger_sequence,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            });
        }
        xdr::LedgerKey::Ttl(key) => {
            let entry = delta.entry.as_ref().and_then(|e| match &e.data {
                xdr::LedgerEntryData::Ttl(t) => Some(t),
                _ => None,
            });
            rows.ttl.push(TtlRow {
                key_hash: hex::encode(key.key_hash.0),
                live_until_ledger_seq: entry.map_or(0, |t| t.live_until_ledger_seq),
                deleted: entry.is_none(),
                last_modified_ledger: last_modified,
                ledger_sequence: rc.ledger_sequence,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            });
        }
        _ => {}
    }
}

/// Events out of the transaction apply meta. Pre-V4 metas carry them on the
/// Soroban sidecar (one-operation transactions, so `op_index` is 0); V4
/// metas carry them per operation.
fn contract_events(rows: &mut SorobanRows, pack: &TxPack, rc: &RowCtx) {
    let successful = tx_was_successful(&pack.result.result.result);

    let mut push_events = |op_index: u32, events: &mut dyn Iterator<Item = &xdr::ContractEvent>| {
        let mut event_index = 0u32;
        for event in events {
            let Some(row) = guard_entry("contract event", rc.ledger_sequence, || {
                event_row(pack, op_index, event_index, event, successful, rc)
            }) else {
                continue;
            };
            rows.contract_events.push(row);
            event_index += 1;
        }
    };

    match pack.meta {
        xdr::TransactionMeta::V3(m) => {
            if let Some(soroban) = &m.soroban_meta {
                push_events(0, &mut soroban.events.iter());
            }
        }
        xdr::TransactionMeta::V4(m) => {
            for (op_index, op) in m.operations.iter().enumerate() {
                push_events(op_index as u32, &mut op.events.iter());
            }
        }
        _ => {}
    }
}

fn event_row(
    pack: &TxPack,
    op_index: u32,
    event_index: u32,
    event: &xdr::ContractEvent,
    in_successful_contract_call: bool,
    rc: &RowCtx,
) -> Option<ContractEventRow> {
    let event_type = match event.type_ {
        xdr::ContractEventType::Contract => "contract",
        xdr::ContractEventType::System => "system",
        // Diagnostics are debug-only output, not part of the stream.
        xdr::ContractEventType::Diagnostic => return None,
    };
    let xdr::ContractEventBody::V0(body) = &event.body;
    let topics: Vec<String> = body.topics.iter().filter_map(|t| base64_xdr(t)).collect();

    Some(ContractEventRow {
        event_id: format!("{}:{op_index}:{event_index}", pack.hash_hex),
        transaction_hash: pack.hash_hex.clone(),
        ledger_sequence: rc.ledger_sequence,
        operation_index: op_index,
        event_index,
        contract_id: event.contract_id.as_ref().map(contract_id_to_strkey),
        event_type: event_type.to_string(),
        topics: serde_json::json!(topics).to_string(),
        data_xdr: base64_xdr(&body.data).unwrap_or_default(),
        in_successful_contract_call,
        ledger_range: rc.ledger_range,
        closed_at: rc.closed_at,
        created_at: rc.created_at,
    })
}

/// RestoreFootprint operations bring evicted keys back to live state. The
/// restored keys are the transaction's read-write Soroban footprint.
/// `restored_from_ledger` stays unset: locating the eviction point needs
/// archival history this pipeline does not read.
fn restored_keys(rows: &mut SorobanRows, pack: &TxPack, rc: &RowCtx) {
    if !tx_was_successful(&pack.result.result.result) {
        return;
    }
    let Some(envelope) = pack.envelope else {
        return;
    };
    let has_restore = envelope_operations(envelope)
        .iter()
        .any(|op| matches!(op.body, xdr::OperationBody::RestoreFootprint(_)));
    if !has_restore {
        return;
    }
    let Some(footprint) = soroban_footprint(envelope) else {
        return;
    };

    for key in footprint.read_write.iter() {
        let row = guard_entry("restored key", rc.ledger_sequence, || {
            Some(RestoredKeyRow {
                key_hash: ledger_key_hash(key).ok()?,
                key_type: ledger_key_type(key).to_string(),
                contract_id: ledger_key_contract(key),
                transaction_hash: pack.hash_hex.clone(),
                restored_from_ledger: None,
                ledger_sequence: rc.ledger_sequence,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            })
        });
        rows.restored_keys.extend(row);
    }
}

fn soroban_footprint(envelope: &xdr::TransactionEnvelope) -> Option<&xdr::LedgerFootprint> {
    let ext = match envelope {
        xdr::TransactionEnvelope::Tx(e) => &e.tx.ext,
        xdr::TransactionEnvelope::TxFeeBump(e) => {
            let xdr::FeeBumpTransactionInnerTx::Tx(inner) = &e.tx.inner_tx;
            &inner.tx.ext
        }
        xdr::TransactionEnvelope::TxV0(_) => return None,
    };
    match ext {
        xdr::TransactionExt::V1(data) => Some(&data.resources.footprint),
        xdr::TransactionExt::V0 => None,
    }
}
