use tracing::warn;

use crate::{
    extract::{
        common::{memo_parts, muxed_account_to_strkey, tx_result_code, tx_was_successful},
        view::{
            envelope_max_fee, envelope_memo, envelope_operations, envelope_seq_num,
            envelope_source, fee_bump_parts, LedgerView,
        },
        Ctx, RowCtx,
    },
    model::rows::TransactionRow,
    xdr,
};

/// One row per applied transaction, in application order.
pub fn extract(view: &LedgerView, ctx: &Ctx, rc: &RowCtx) -> Vec<TransactionRow> {
    view.packs
        .iter()
        .map(|pack| {
            let result = &pack.result.result;
            let mut row = TransactionRow {
                transaction_hash: pack.hash_hex.clone(),
                ledger_sequence: rc.ledger_sequence,
                application_order: pack.apply_order,
                source_account: String::new(),
                account_sequence: 0,
                max_fee: 0,
                fee_charged: result.fee_charged,
                operation_count: 0,
                successful: tx_was_successful(&result.result),
                result_code: tx_result_code(&result.result).to_string(),
                memo_type: "none".to_string(),
                memo: None,
                fee_account: None,
                inner_transaction_hash: None,
                new_max_fee: None,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            };

            let Some(envelope) = pack.envelope else {
                warn!(
                    tx = %row.transaction_hash,
                    "emitting transaction row without envelope columns"
                );
                return row;
            };

            row.source_account = muxed_account_to_strkey(&envelope_source(envelope));
            row.account_sequence = envelope_seq_num(envelope);
            row.operation_count = envelope_operations(envelope).len() as u32;
            let (memo_type, memo) = memo_parts(envelope_memo(envelope));
            row.memo_type = memo_type;
            row.memo = memo;

            if let Some((fee_source, inner_hash)) = fee_bump_parts(envelope, &ctx.network_id) {
                row.fee_account = Some(muxed_account_to_strkey(&fee_source));
                row.inner_transaction_hash = inner_hash;
                row.new_max_fee = Some(envelope_max_fee(envelope));
                // max_fee reports the inner transaction's declared fee.
                if let xdr::TransactionEnvelope::TxFeeBump(e) = envelope {
                    let xdr::FeeBumpTransactionInnerTx::Tx(inner) = &e.tx.inner_tx;
                    row.max_fee = inner.tx.fee.into();
                }
            } else {
                row.max_fee = envelope_max_fee(envelope);
            }

            row
        })
        .collect()
}
