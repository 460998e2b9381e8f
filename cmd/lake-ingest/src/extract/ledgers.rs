use base64::Engine;

use crate::{
    extract::{
        common::{node_id_to_strkey, operation_results, tx_was_successful},
        view::{envelope_operations, LedgerView},
        RowCtx,
    },
    model::rows::LedgerRow,
    xdr::{self, Limits, WriteXdr},
};

/// Exactly one row per closed ledger.
pub fn extract(view: &LedgerView, rc: &RowCtx) -> LedgerRow {
    let ledger = view.ledger;
    let header = ledger.header();

    let mut successful_transaction_count = 0u32;
    let mut failed_transaction_count = 0u32;
    let mut operation_count = 0u32;
    for pack in &view.packs {
        let successful = tx_was_successful(&pack.result.result.result);
        if successful {
            successful_transaction_count += 1;
            // Applied operation count: per-operation results when the
            // result carries them, the envelope otherwise.
            operation_count += match operation_results(&pack.result.result.result) {
                Some(results) => results.len() as u32,
                None => pack
                    .envelope
                    .map_or(0, |e| envelope_operations(e).len() as u32),
            };
        } else {
            failed_transaction_count += 1;
        }
    }

    let (soroban_fee_write_1kb, total_byte_size_of_live_soroban_state) = match &ledger.0 {
        xdr::LedgerCloseMeta::V0(_) => (None, None),
        xdr::LedgerCloseMeta::V1(m) => (
            close_meta_ext_fee(&m.ext),
            Some(m.total_byte_size_of_live_soroban_state),
        ),
        xdr::LedgerCloseMeta::V2(m) => (
            close_meta_ext_fee(&m.ext),
            Some(m.total_byte_size_of_live_soroban_state),
        ),
    };

    // node_id, signature and the raw header are only known when consensus
    // produced a signed close value.
    let (node_id, signature, ledger_header_xdr) = match &header.scp_value.ext {
        xdr::StellarValueExt::Signed(sig) => (
            Some(node_id_to_strkey(&sig.node_id)),
            Some(base64::engine::general_purpose::STANDARD.encode(sig.signature.0.as_slice())),
            ledger
                .header_entry()
                .to_xdr_base64(Limits::none())
                .ok(),
        ),
        xdr::StellarValueExt::Basic => (None, None, None),
    };

    LedgerRow {
        sequence: rc.ledger_sequence,
        ledger_hash: ledger.ledger_hash(),
        previous_ledger_hash: ledger.previous_ledger_hash(),
        closed_at: rc.closed_at,
        protocol_version: header.ledger_version,
        total_coins: header.total_coins,
        fee_pool: header.fee_pool,
        base_fee: header.base_fee,
        base_reserve: header.base_reserve,
        max_tx_set_size: header.max_tx_set_size,
        successful_transaction_count,
        failed_transaction_count,
        operation_count,
        tx_set_operation_count: view.tx_set_operation_count,
        soroban_fee_write_1kb,
        total_byte_size_of_live_soroban_state,
        node_id,
        signature,
        ledger_header_xdr,
        ledger_range: rc.ledger_range,
        created_at: rc.created_at,
    }
}

fn close_meta_ext_fee(ext: &xdr::LedgerCloseMetaExt) -> Option<i64> {
    match ext {
        xdr::LedgerCloseMetaExt::V0 => None,
        xdr::LedgerCloseMetaExt::V1(v1) => Some(v1.soroban_fee_write1_kb),
    }
}
