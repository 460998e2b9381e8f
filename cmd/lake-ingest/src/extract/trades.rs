use crate::{
    extract::{
        common::{account_id_to_strkey, asset_parts, muxed_account_to_strkey, tx_was_successful},
        guard_entry,
        view::{envelope_operations, envelope_source, LedgerView},
        RowCtx,
    },
    model::rows::TradeRow,
    toid::Toid,
    xdr,
};

/// Order-book fills and AMM swaps, read out of the operation results' claim
/// atoms. `trade_index` is 0-based and contiguous per operation; amounts are
/// from the seller's perspective (`sold_*` is what the matched party gave).
pub fn extract(view: &LedgerView, rc: &RowCtx) -> Vec<TradeRow> {
    let mut out = Vec::new();
    for pack in &view.packs {
        if !tx_was_successful(&pack.result.result.result) {
            continue;
        }
        let Some(envelope) = pack.envelope else {
            continue;
        };
        let results = super::common::operation_results(&pack.result.result.result);
        let tx_source = envelope_source(envelope);

        for (index, op) in envelope_operations(envelope).iter().enumerate() {
            let Some(result) = results.and_then(|r| r.get(index)) else {
                continue;
            };
            let mut rows = guard_entry("trade", rc.ledger_sequence, || {
                let operation_id: i64 =
                    Toid::new(rc.ledger_sequence, pack.apply_order, index as u32 + 1).into();
                let buyer = muxed_account_to_strkey(
                    op.source_account.as_ref().unwrap_or(&tx_source),
                );
                let atoms = claim_atoms(result);
                Some(
                    atoms
                        .iter()
                        .enumerate()
                        .map(|(trade_index, atom)| {
                            build_trade(
                                operation_id,
                                &pack.hash_hex,
                                trade_index as u32,
                                &buyer,
                                atom,
                                rc,
                            )
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .unwrap_or_default();
            out.append(&mut rows);
        }
    }
    out
}

/// The claim atoms of any trading operation result.
fn claim_atoms(result: &xdr::OperationResult) -> &[xdr::ClaimAtom] {
    use xdr::{OperationResult as R, OperationResultTr as Tr};
    let R::OpInner(tr) = result else {
        return &[];
    };
    match tr {
        Tr::ManageSellOffer(xdr::ManageSellOfferResult::Success(s))
        | Tr::CreatePassiveSellOffer(xdr::ManageSellOfferResult::Success(s)) => {
            s.offers_claimed.as_slice()
        }
        Tr::ManageBuyOffer(xdr::ManageBuyOfferResult::Success(s)) => s.offers_claimed.as_slice(),
        Tr::PathPaymentStrictReceive(xdr::PathPaymentStrictReceiveResult::Success(s)) => {
            s.offers.as_slice()
        }
        Tr::PathPaymentStrictSend(xdr::PathPaymentStrictSendResult::Success(s)) => {
            s.offers.as_slice()
        }
        _ => &[],
    }
}

fn build_trade(
    operation_id: i64,
    tx_hash: &str,
    trade_index: u32,
    buyer: &str,
    atom: &xdr::ClaimAtom,
    rc: &RowCtx,
) -> TradeRow {
    struct Atom {
        trade_type: &'static str,
        seller: Option<String>,
        offer_id: Option<i64>,
        liquidity_pool_id: Option<String>,
        asset_sold: xdr::Asset,
        amount_sold: i64,
        asset_bought: xdr::Asset,
        amount_bought: i64,
    }

    let atom = match atom {
        xdr::ClaimAtom::V0(a) => Atom {
            trade_type: "orderbook",
            seller: Some(
                stellar_strkey::ed25519::PublicKey(a.seller_ed25519.0).to_string(),
            ),
            offer_id: Some(a.offer_id),
            liquidity_pool_id: None,
            asset_sold: a.asset_sold.clone(),
            amount_sold: a.amount_sold,
            asset_bought: a.asset_bought.clone(),
            amount_bought: a.amount_bought,
        },
        xdr::ClaimAtom::OrderBook(a) => Atom {
            trade_type: "orderbook",
            seller: Some(account_id_to_strkey(&a.seller_id)),
            offer_id: Some(a.offer_id),
            liquidity_pool_id: None,
            asset_sold: a.asset_sold.clone(),
            amount_sold: a.amount_sold,
            asset_bought: a.asset_bought.clone(),
            amount_bought: a.amount_bought,
        },
        xdr::ClaimAtom::LiquidityPool(a) => Atom {
            trade_type: "liquidity_pool",
            seller: None,
            offer_id: None,
            liquidity_pool_id: Some(hex::encode(a.liquidity_pool_id.0 .0)),
            asset_sold: a.asset_sold.clone(),
            amount_sold: a.amount_sold,
            asset_bought: a.asset_bought.clone(),
            amount_bought: a.amount_bought,
        },
    };

    let (sold_asset_type, sold_asset_code, sold_asset_issuer) = asset_parts(&atom.asset_sold);
    let (bought_asset_type, bought_asset_code, bought_asset_issuer) =
        asset_parts(&atom.asset_bought);

    TradeRow {
        trade_id: format!("{operation_id}-{trade_index}"),
        operation_id,
        transaction_hash: tx_hash.to_string(),
        ledger_sequence: rc.ledger_sequence,
        trade_index,
        trade_type: atom.trade_type.to_string(),
        seller: atom.seller,
        buyer: buyer.to_string(),
        sold_asset_type,
        sold_asset_code,
        sold_asset_issuer,
        sold_amount: atom.amount_sold,
        bought_asset_type,
        bought_asset_code,
        bought_asset_issuer,
        bought_amount: atom.amount_bought,
        offer_id: atom.offer_id,
        liquidity_pool_id: atom.liquidity_pool_id,
        ledger_range: rc.ledger_range,
        closed_at: rc.closed_at,
        created_at: rc.created_at,
    }
}
