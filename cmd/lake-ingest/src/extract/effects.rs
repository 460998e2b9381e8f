use serde_json::{json, Value};

use crate::{
    extract::{
        common::{
            account_id_to_strkey, asset_parts, claimable_balance_id_to_hex,
            muxed_account_to_strkey, operation_results, pool_id_to_hex, tx_was_successful,
        },
        guard_entry,
        view::{envelope_operations, envelope_source, operation_changes, LedgerView, TxPack},
        RowCtx,
    },
    model::rows::EffectRow,
    toid::Toid,
    xdr,
};

/// Observable state changes per operation. Only successful transactions
/// produce effects; `effect_index` is 0-based and contiguous per operation.
pub fn extract(view: &LedgerView, rc: &RowCtx) -> Vec<EffectRow> {
    let mut out = Vec::new();
    for pack in &view.packs {
        if !tx_was_successful(&pack.result.result.result) {
            continue;
        }
        let Some(envelope) = pack.envelope else {
            continue;
        };
        let results = operation_results(&pack.result.result.result);
        let op_changes = operation_changes(pack.meta);
        let tx_source = envelope_source(envelope);

        for (index, op) in envelope_operations(envelope).iter().enumerate() {
            let mut effects = guard_entry("effect", rc.ledger_sequence, || {
                let mut builder = Builder {
                    rows: Vec::new(),
                    operation_id: Toid::new(rc.ledger_sequence, pack.apply_order, index as u32 + 1)
                        .into(),
                    pack,
                    rc,
                };
                let source = op.source_account.as_ref().unwrap_or(&tx_source);
                operation_effects(
                    &mut builder,
                    &op.body,
                    source,
                    results.and_then(|r| r.get(index)),
                    op_changes.get(index).copied(),
                );
                Some(builder.rows)
            })
            .unwrap_or_default();
            out.append(&mut effects);
        }
    }
    out
}

struct Builder<'a> {
    rows: Vec<EffectRow>,
    operation_id: i64,
    pack: &'a TxPack<'a>,
    rc: &'a RowCtx,
}

impl Builder<'_> {
    fn push(
        &mut self,
        effect_type: &str,
        account: Option<String>,
        amount: Option<i64>,
        asset: Option<&xdr::Asset>,
        details: Value,
    ) {
        let effect_index = self.rows.len() as u32;
        let (asset_type, asset_code, asset_issuer) = match asset {
            Some(asset) => {
                let (t, c, i) = asset_parts(asset);
                (Some(t), c, i)
            }
            None => (None, None, None),
        };
        self.rows.push(EffectRow {
            effect_id: format!("{}-{effect_index}", self.operation_id),
            operation_id: self.operation_id,
            transaction_hash: self.pack.hash_hex.clone(),
            ledger_sequence: self.rc.ledger_sequence,
            effect_index,
            effect_type: effect_type.to_string(),
            account,
            amount: amount.map(|a| a.to_string()),
            asset_type,
            asset_code,
            asset_issuer,
            details: details.to_string(),
            ledger_range: self.rc.ledger_range,
            closed_at: self.rc.closed_at,
            created_at: self.rc.created_at,
        });
    }
}

const NATIVE: xdr::Asset = xdr::Asset::Native;

#[allow(clippy::too_many_lines)]
fn operation_effects(
    b: &mut Builder,
    body: &xdr::OperationBody,
    source: &xdr::MuxedAccount,
    result: Option<&xdr::OperationResult>,
    changes: Option<&xdr::LedgerEntryChanges>,
) {
    use xdr::OperationBody as B;
    let source_key = muxed_account_to_strkey(source);
    match body {
        B::CreateAccount(op) => {
            b.push(
                "account_created",
                Some(account_id_to_strkey(&op.destination)),
                Some(op.starting_balance),
                Some(&NATIVE),
                json!({ "funder": source_key }),
            );
            b.push(
                "account_debited",
                Some(source_key),
                Some(op.starting_balance),
                Some(&NATIVE),
                json!({}),
            );
        }
        B::Payment(op) => {
            b.push(
                "account_credited",
                Some(muxed_account_to_strkey(&op.destination)),
                Some(op.amount),
                Some(&op.asset),
                json!({ "from": source_key }),
            );
            b.push(
                "account_debited",
                Some(source_key),
                Some(op.amount),
                Some(&op.asset),
                json!({}),
            );
        }
        B::PathPaymentStrictReceive(op) => {
            b.push(
                "account_credited",
                Some(muxed_account_to_strkey(&op.destination)),
                Some(op.dest_amount),
                Some(&op.dest_asset),
                json!({ "from": source_key }),
            );
        }
        B::PathPaymentStrictSend(op) => {
            b.push(
                "account_debited",
                Some(source_key.clone()),
                Some(op.send_amount),
                Some(&op.send_asset),
                json!({}),
            );
            if let Some(amount) = strict_send_received(result) {
                b.push(
                    "account_credited",
                    Some(muxed_account_to_strkey(&op.destination)),
                    Some(amount),
                    Some(&op.dest_asset),
                    json!({ "from": source_key }),
                );
            }
        }
        B::AccountMerge(destination) => {
            b.push("account_merged", Some(source_key), None, None, json!({}));
            if let Some(balance) = merged_balance(result) {
                b.push(
                    "account_credited",
                    Some(muxed_account_to_strkey(destination)),
                    Some(balance),
                    Some(&NATIVE),
                    json!({}),
                );
            }
        }
        B::ChangeTrust(op) => {
            let effect_type = match trustline_change_kind(changes) {
                Some(ChangeKind::Created) => "trustline_created",
                Some(ChangeKind::Removed) => "trustline_removed",
                _ => "trustline_updated",
            };
            b.push(
                effect_type,
                Some(source_key),
                None,
                None,
                json!({ "limit": op.limit.to_string() }),
            );
        }
        B::AllowTrust(op) => {
            b.push(
                "trustline_flags_updated",
                Some(account_id_to_strkey(&op.trustor)),
                None,
                None,
                json!({ "authorize": op.authorize }),
            );
        }
        B::SetTrustLineFlags(op) => {
            b.push(
                "trustline_flags_updated",
                Some(account_id_to_strkey(&op.trustor)),
                None,
                Some(&op.asset),
                json!({ "set_flags": op.set_flags, "clear_flags": op.clear_flags }),
            );
        }
        B::ManageData(op) => {
            let effect_type = match data_change_kind(changes) {
                Some(ChangeKind::Created) => "data_created",
                Some(ChangeKind::Removed) => "data_removed",
                _ => "data_updated",
            };
            b.push(
                effect_type,
                Some(source_key),
                None,
                None,
                json!({ "name": op.data_name.0.to_utf8_string_lossy() }),
            );
        }
        B::BumpSequence(op) => {
            b.push(
                "sequence_bumped",
                Some(source_key),
                None,
                None,
                json!({ "bump_to": op.bump_to.0.to_string() }),
            );
        }
        B::CreateClaimableBalance(op) => {
            let balance_id = created_balance_id(result);
            b.push(
                "claimable_balance_created",
                Some(source_key),
                Some(op.amount),
                Some(&op.asset),
                json!({ "balance_id": balance_id }),
            );
        }
        B::ClaimClaimableBalance(op) => {
            b.push(
                "claimable_balance_claimed",
                Some(source_key),
                None,
                None,
                json!({ "balance_id": claimable_balance_id_to_hex(&op.balance_id) }),
            );
        }
        B::Clawback(op) => {
            b.push(
                "account_debited",
                Some(muxed_account_to_strkey(&op.from)),
                Some(op.amount),
                Some(&op.asset),
                json!({ "clawback": true }),
            );
        }
        B::ClawbackClaimableBalance(op) => {
            b.push(
                "claimable_balance_clawed_back",
                Some(source_key),
                None,
                None,
                json!({ "balance_id": claimable_balance_id_to_hex(&op.balance_id) }),
            );
        }
        B::Inflation => {
            if let Some(xdr::OperationResult::OpInner(xdr::OperationResultTr::Inflation(
                xdr::InflationResult::Success(payouts),
            ))) = result
            {
                for payout in payouts.iter() {
                    b.push(
                        "account_credited",
                        Some(account_id_to_strkey(&payout.destination)),
                        Some(payout.amount),
                        Some(&NATIVE),
                        json!({ "inflation": true }),
                    );
                }
            }
        }
        B::SetOptions(op) => {
            if op.set_flags.is_some() || op.clear_flags.is_some() {
                b.push(
                    "account_flags_updated",
                    Some(source_key.clone()),
                    None,
                    None,
                    json!({ "set_flags": op.set_flags, "clear_flags": op.clear_flags }),
                );
            }
            if op.home_domain.is_some() {
                b.push(
                    "home_domain_updated",
                    Some(source_key.clone()),
                    None,
                    None,
                    json!({ "home_domain": op.home_domain.as_ref().map(|d| d.0.to_utf8_string_lossy()) }),
                );
            }
            if op.signer.is_some() {
                b.push("signer_updated", Some(source_key), None, None, json!({}));
            }
        }
        B::LiquidityPoolDeposit(op) => {
            b.push(
                "liquidity_pool_deposited",
                Some(source_key),
                None,
                None,
                json!({ "liquidity_pool_id": pool_id_to_hex(&op.liquidity_pool_id) }),
            );
        }
        B::LiquidityPoolWithdraw(op) => {
            b.push(
                "liquidity_pool_withdrew",
                Some(source_key),
                None,
                None,
                json!({ "liquidity_pool_id": pool_id_to_hex(&op.liquidity_pool_id) }),
            );
        }
        // Offer placement surfaces through the trades dataset; Soroban state
        // changes surface through contract events and snapshots.
        _ => {}
    }
}

enum ChangeKind {
    Created,
    Updated,
    Removed,
}

fn trustline_change_kind(changes: Option<&xdr::LedgerEntryChanges>) -> Option<ChangeKind> {
    change_kind(
        changes,
        |data| matches!(data, xdr::LedgerEntryData::Trustline(_)),
        |key| matches!(key, xdr::LedgerKey::Trustline(_)),
    )
}

fn data_change_kind(changes: Option<&xdr::LedgerEntryChanges>) -> Option<ChangeKind> {
    change_kind(
        changes,
        |data| matches!(data, xdr::LedgerEntryData::Data(_)),
        |key| matches!(key, xdr::LedgerKey::Data(_)),
    )
}

fn change_kind(
    changes: Option<&xdr::LedgerEntryChanges>,
    matches_entry: impl Fn(&xdr::LedgerEntryData) -> bool,
    matches_key: impl Fn(&xdr::LedgerKey) -> bool,
) -> Option<ChangeKind> {
    for change in changes?.iter() {
        match change {
            xdr::LedgerEntryChange::Created(e) if matches_entry(&e.data) => {
                return Some(ChangeKind::Created)
            }
            xdr::LedgerEntryChange::Updated(e) if matches_entry(&e.data) => {
                return Some(ChangeKind::Updated)
            }
            xdr::LedgerEntryChange::Removed(key) if matches_key(key) => {
                return Some(ChangeKind::Removed)
            }
            _ => {}
        }
    }
    None
}

fn strict_send_received(result: Option<&xdr::OperationResult>) -> Option<i64> {
    if let Some(xdr::OperationResult::OpInner(xdr::OperationResultTr::PathPaymentStrictSend(
        xdr::PathPaymentStrictSendResult::Success(success),
    ))) = result
    {
        return Some(success.last.amount);
    }
    None
}

fn merged_balance(result: Option<&xdr::OperationResult>) -> Option<i64> {
    if let Some(xdr::OperationResult::OpInner(xdr::OperationResultTr::AccountMerge(
        xdr::AccountMergeResult::Success(balance),
    ))) = result
    {
        return Some(*balance);
    }
    None
}

fn created_balance_id(result: Option<&xdr::OperationResult>) -> Option<String> {
    if let Some(xdr::OperationResult::OpInner(xdr::OperationResultTr::CreateClaimableBalance(
        xdr::CreateClaimableBalanceResult::Success(id),
    ))) = result
    {
        return Some(claimable_balance_id_to_hex(id));
    }
    None
}
