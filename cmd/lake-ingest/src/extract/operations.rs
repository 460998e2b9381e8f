use serde_json::{json, Value};

use crate::{
    extract::{
        common::{
            account_id_to_strkey, asset_code_to_string, asset_parts,
            claimable_balance_id_to_hex, muxed_account_to_strkey, pool_id_to_hex,
            sc_address_to_strkey, tx_result_code, tx_was_successful,
        },
        guard_entry,
        result_codes::{op_result_code, op_trace_code, op_was_successful},
        view::{envelope_operations, envelope_source, LedgerView},
        RowCtx,
    },
    model::rows::OperationRow,
    toid::Toid,
    xdr,
};

/// One row per operation, ordered by `(application_order, operation_index)`.
pub fn extract(view: &LedgerView, rc: &RowCtx) -> Vec<OperationRow> {
    let mut out = Vec::new();
    for pack in &view.packs {
        let Some(envelope) = pack.envelope else {
            continue;
        };
        let tx_successful = tx_was_successful(&pack.result.result.result);
        let results = super::common::operation_results(&pack.result.result.result);
        let tx_source = envelope_source(envelope);

        for (index, op) in envelope_operations(envelope).iter().enumerate() {
            let row = guard_entry("operation", rc.ledger_sequence, || {
                let result = results.and_then(|r| r.get(index));
                let (result_code, trace_code, successful) = match result {
                    Some(result) => (
                        op_result_code(result).to_string(),
                        op_trace_code(result),
                        tx_successful && op_was_successful(result),
                    ),
                    None => (
                        tx_result_code(&pack.result.result.result).to_string(),
                        String::new(),
                        tx_successful,
                    ),
                };
                let source = op
                    .source_account
                    .as_ref()
                    .unwrap_or(&tx_source);
                Some(OperationRow {
                    operation_id: Toid::new(
                        rc.ledger_sequence,
                        pack.apply_order,
                        index as u32 + 1,
                    )
                    .into(),
                    transaction_hash: pack.hash_hex.clone(),
                    ledger_sequence: rc.ledger_sequence,
                    application_order: pack.apply_order,
                    operation_index: index as u32,
                    operation_type: type_name(&op.body).to_string(),
                    source_account: muxed_account_to_strkey(source),
                    successful,
                    operation_result_code: result_code,
                    operation_trace_code: trace_code,
                    details: details(&op.body).to_string(),
                    ledger_range: rc.ledger_range,
                    closed_at: rc.closed_at,
                    created_at: rc.created_at,
                })
            });
            out.extend(row);
        }
    }
    out
}

pub fn type_name(body: &xdr::OperationBody) -> &'static str {
    use xdr::OperationBody as B;
    match body {
        B::CreateAccount(_) => "create_account",
        B::Payment(_) => "payment",
        B::PathPaymentStrictReceive(_) => "path_payment_strict_receive",
        B::ManageSellOffer(_) => "manage_sell_offer",
        B::CreatePassiveSellOffer(_) => "create_passive_sell_offer",
        B::SetOptions(_) => "set_options",
        B::ChangeTrust(_) => "change_trust",
        B::AllowTrust(_) => "allow_trust",
        B::AccountMerge(_) => "account_merge",
        B::Inflation => "inflation",
        B::ManageData(_) => "manage_data",
        B::BumpSequence(_) => "bump_sequence",
        B::ManageBuyOffer(_) => "manage_buy_offer",
        B::PathPaymentStrictSend(_) => "path_payment_strict_send",
        B::CreateClaimableBalance(_) => "create_claimable_balance",
        B::ClaimClaimableBalance(_) => "claim_claimable_balance",
        B::BeginSponsoringFutureReserves(_) => "begin_sponsoring_future_reserves",
        B::EndSponsoringFutureReserves => "end_sponsoring_future_reserves",
        B::RevokeSponsorship(_) => "revoke_sponsorship",
        B::Clawback(_) => "clawback",
        B::ClawbackClaimableBalance(_) => "clawback_claimable_balance",
        B::SetTrustLineFlags(_) => "set_trust_line_flags",
        B::LiquidityPoolDeposit(_) => "liquidity_pool_deposit",
        B::LiquidityPoolWithdraw(_) => "liquidity_pool_withdraw",
        B::InvokeHostFunction(_) => "invoke_host_function",
        B::ExtendFootprintTtl(_) => "extend_footprint_ttl",
        B::RestoreFootprint(_) => "restore_footprint",
    }
}

fn asset_json(asset: &xdr::Asset) -> Value {
    let (asset_type, code, issuer) = asset_parts(asset);
    json!({
        "asset_type": asset_type,
        "asset_code": code,
        "asset_issuer": issuer,
    })
}

fn price_json(price: &xdr::Price) -> Value {
    json!({ "n": price.n, "d": price.d })
}

/// Type-specific operation details, serialized into the row's JSON column.
#[allow(clippy::too_many_lines)]
fn details(body: &xdr::OperationBody) -> Value {
    use xdr::OperationBody as B;
    match body {
        B::CreateAccount(op) => json!({
            "account": account_id_to_strkey(&op.destination),
            "starting_balance": op.starting_balance.to_string(),
        }),
        B::Payment(op) => json!({
            "to": muxed_account_to_strkey(&op.destination),
            "asset": asset_json(&op.asset),
            "amount": op.amount.to_string(),
        }),
        B::PathPaymentStrictReceive(op) => json!({
            "to": muxed_account_to_strkey(&op.destination),
            "send_asset": asset_json(&op.send_asset),
            "send_max": op.send_max.to_string(),
            "dest_asset": asset_json(&op.dest_asset),
            "dest_amount": op.dest_amount.to_string(),
            "path_length": op.path.len(),
        }),
        B::PathPaymentStrictSend(op) => json!({
            "to": muxed_account_to_strkey(&op.destination),
            "send_asset": asset_json(&op.send_asset),
            "send_amount": op.send_amount.to_string(),
            "dest_asset": asset_json(&op.dest_asset),
            "dest_min": op.dest_min.to_string(),
            "path_length": op.path.len(),
        }),
        B::ManageSellOffer(op) => json!({
            "selling": asset_json(&op.selling),
            "buying": asset_json(&op.buying),
            "amount": op.amount.to_string(),
            "price": price_json(&op.price),
            "offer_id": op.offer_id,
        }),
        B::ManageBuyOffer(op) => json!({
            "selling": asset_json(&op.selling),
            "buying": asset_json(&op.buying),
            "buy_amount": op.buy_amount.to_string(),
            "price": price_json(&op.price),
            "offer_id": op.offer_id,
        }),
        B::CreatePassiveSellOffer(op) => json!({
            "selling": asset_json(&op.selling),
            "buying": asset_json(&op.buying),
            "amount": op.amount.to_string(),
            "price": price_json(&op.price),
        }),
        B::SetOptions(op) => json!({
            "inflation_dest": op.inflation_dest.as_ref().map(account_id_to_strkey),
            "master_weight": op.master_weight,
            "low_threshold": op.low_threshold,
            "med_threshold": op.med_threshold,
            "high_threshold": op.high_threshold,
            "home_domain": op.home_domain.as_ref().map(|d| d.0.to_utf8_string_lossy()),
            "set_flags": op.set_flags,
            "clear_flags": op.clear_flags,
        }),
        B::ChangeTrust(op) => {
            let line = match &op.line {
                xdr::ChangeTrustAsset::Native => json!({ "asset_type": "native" }),
                xdr::ChangeTrustAsset::CreditAlphanum4(a) => json!({
                    "asset_type": "credit_alphanum4",
                    "asset_code": asset_code_to_string(&a.asset_code.0),
                    "asset_issuer": account_id_to_strkey(&a.issuer),
                }),
                xdr::ChangeTrustAsset::CreditAlphanum12(a) => json!({
                    "asset_type": "credit_alphanum12",
                    "asset_code": asset_code_to_string(&a.asset_code.0),
                    "asset_issuer": account_id_to_strkey(&a.issuer),
                }),
                xdr::ChangeTrustAsset::PoolShare(_) => {
                    json!({ "asset_type": "liquidity_pool_shares" })
                }
            };
            json!({ "line": line, "limit": op.limit.to_string() })
        }
        B::AllowTrust(op) => {
            let code = match &op.asset {
                xdr::AssetCode::CreditAlphanum4(code) => asset_code_to_string(&code.0),
                xdr::AssetCode::CreditAlphanum12(code) => asset_code_to_string(&code.0),
            };
            json!({
                "trustor": account_id_to_strkey(&op.trustor),
                "asset_code": code,
                "authorize": op.authorize,
            })
        }
        B::AccountMerge(destination) => json!({
            "into": muxed_account_to_strkey(destination),
        }),
        B::Inflation => json!({}),
        B::ManageData(op) => json!({
            "name": op.data_name.0.to_utf8_string_lossy(),
            "value_set": op.data_value.is_some(),
        }),
        B::BumpSequence(op) => json!({ "bump_to": op.bump_to.0.to_string() }),
        B::CreateClaimableBalance(op) => json!({
            "asset": asset_json(&op.asset),
            "amount": op.amount.to_string(),
            "claimant_count": op.claimants.len(),
        }),
        B::ClaimClaimableBalance(op) => json!({
            "balance_id": claimable_balance_id_to_hex(&op.balance_id),
        }),
        B::BeginSponsoringFutureReserves(op) => json!({
            "sponsored_id": account_id_to_strkey(&op.sponsored_id),
        }),
        B::EndSponsoringFutureReserves => json!({}),
        B::RevokeSponsorship(op) => match op {
            xdr::RevokeSponsorshipOp::LedgerEntry(key) => json!({
                "revoke_type": "ledger_entry",
                "key_type": super::common::ledger_key_type(key),
            }),
            xdr::RevokeSponsorshipOp::Signer(signer) => json!({
                "revoke_type": "signer",
                "account_id": account_id_to_strkey(&signer.account_id),
            }),
        },
        B::Clawback(op) => json!({
            "from": muxed_account_to_strkey(&op.from),
            "asset": asset_json(&op.asset),
            "amount": op.amount.to_string(),
        }),
        B::ClawbackClaimableBalance(op) => json!({
            "balance_id": claimable_balance_id_to_hex(&op.balance_id),
        }),
        B::SetTrustLineFlags(op) => json!({
            "trustor": account_id_to_strkey(&op.trustor),
            "asset": asset_json(&op.asset),
            "set_flags": op.set_flags,
            "clear_flags": op.clear_flags,
        }),
        B::LiquidityPoolDeposit(op) => json!({
            "liquidity_pool_id": pool_id_to_hex(&op.liquidity_pool_id),
            "max_amount_a": op.max_amount_a.to_string(),
            "max_amount_b": op.max_amount_b.to_string(),
            "min_price": price_json(&op.min_price),
            "max_price": price_json(&op.max_price),
        }),
        B::LiquidityPoolWithdraw(op) => json!({
            "liquidity_pool_id": pool_id_to_hex(&op.liquidity_pool_id),
            "amount": op.amount.to_string(),
            "min_amount_a": op.min_amount_a.to_string(),
            "min_amount_b": op.min_amount_b.to_string(),
        }),
        B::InvokeHostFunction(op) => match &op.host_function {
            xdr::HostFunction::InvokeContract(args) => json!({
                "function": "invoke_contract",
                "contract_id": sc_address_to_strkey(&args.contract_address),
                "function_name": args.function_name.0.to_utf8_string_lossy(),
                "parameter_count": args.args.len(),
            }),
            xdr::HostFunction::UploadContractWasm(code) => json!({
                "function": "upload_contract_wasm",
                "wasm_size": code.len(),
            }),
            other => json!({
                "function": "create_contract",
                "detail": format!("{other:?}").split('(').next().unwrap_or_default(),
            }),
        },
        B::ExtendFootprintTtl(op) => json!({ "extend_to": op.extend_to }),
        B::RestoreFootprint(_) => json!({}),
    }
}
