//! Ledger-entry-change snapshots: the post-state of every classic entry
//! touched by the ledger, deduplicated by natural key with the last write
//! winning (the [`super::view`] walker already enforces that).

use serde_json::json;

use crate::{
    extract::{
        common::{account_id_to_strkey, asset_parts, claimable_balance_id_to_hex, pool_id_to_hex,
            signer_key_to_strkey},
        guard_entry,
        view::{EntryDelta, LedgerView},
        RowCtx,
    },
    model::rows::{
        AccountRow, AccountSignerRow, ClaimableBalanceRow, LiquidityPoolRow, NativeBalanceRow,
        OfferRow, TrustlineRow,
    },
    xdr,
};

#[derive(Default)]
pub struct SnapshotRows {
    pub accounts: Vec<AccountRow>,
    pub native_balances: Vec<NativeBalanceRow>,
    pub trustlines: Vec<TrustlineRow>,
    pub offers: Vec<OfferRow>,
    pub claimable_balances: Vec<ClaimableBalanceRow>,
    pub liquidity_pools: Vec<LiquidityPoolRow>,
    pub account_signers: Vec<AccountSignerRow>,
}

impl SnapshotRows {
    fn merge(&mut self, mut other: SnapshotRows) {
        self.accounts.append(&mut other.accounts);
        self.native_balances.append(&mut other.native_balances);
        self.trustlines.append(&mut other.trustlines);
        self.offers.append(&mut other.offers);
        self.claimable_balances.append(&mut other.claimable_balances);
        self.liquidity_pools.append(&mut other.liquidity_pools);
        self.account_signers.append(&mut other.account_signers);
    }
}

pub fn extract(view: &LedgerView, rc: &RowCtx) -> SnapshotRows {
    let mut rows = SnapshotRows::default();
    for delta in &view.deltas {
        // Each entry decodes into its own fragment; a panicking entry is
        // dropped whole, never half-emitted.
        let fragment = guard_entry("snapshot entry", rc.ledger_sequence, || {
            let mut fragment = SnapshotRows::default();
            apply_delta(&mut fragment, delta, rc);
            Some(fragment)
        });
        if let Some(fragment) = fragment {
            rows.merge(fragment);
        }
    }
    rows
}

fn apply_delta(rows: &mut SnapshotRows, delta: &EntryDelta, rc: &RowCtx) {
    match &delta.key {
        xdr::LedgerKey::Account(key) => account_rows(rows, key, delta, rc),
        xdr::LedgerKey::Trustline(key) => trustline_row(rows, key, delta, rc),
        xdr::LedgerKey::Offer(key) => offer_row(rows, key, delta, rc),
        xdr::LedgerKey::ClaimableBalance(key) => claimable_balance_row(rows, key, delta, rc),
        xdr::LedgerKey::LiquidityPool(key) => liquidity_pool_row(rows, key, delta, rc),
        // Data entries have no dataset; Soroban entries are handled by the
        // soroban extractor over the same deltas.
        _ => {}
    }
}

fn last_modified(delta: &EntryDelta, rc: &RowCtx) -> u32 {
    delta
        .entry
        .as_ref()
        .map_or(rc.ledger_sequence, |e| e.last_modified_ledger_seq)
}

fn account_rows(
    rows: &mut SnapshotRows,
    key: &xdr::LedgerKeyAccount,
    delta: &EntryDelta,
    rc: &RowCtx,
) {
    let account_id = account_id_to_strkey(&key.account_id);
    let last_modified = last_modified(delta, rc);

    let entry = delta.entry.as_ref().and_then(|e| match &e.data {
        xdr::LedgerEntryData::Account(account) => Some(account),
        _ => None,
    });

    let Some(account) = entry else {
        rows.accounts.push(AccountRow {
            account_id: account_id.clone(),
            balance: 0,
            sequence_number: 0,
            sequence_ledger: None,
            sequence_time: None,
            num_sub_entries: 0,
            inflation_destination: None,
            flags: 0,
            home_domain: String::new(),
            master_weight: 0,
            threshold_low: 0,
            threshold_medium: 0,
            threshold_high: 0,
            buying_liabilities: 0,
            selling_liabilities: 0,
            num_sponsored: None,
            num_sponsoring: None,
            num_signers: 0,
            deleted: true,
            last_modified_ledger: last_modified,
            ledger_sequence: rc.ledger_sequence,
            ledger_range: rc.ledger_range,
            closed_at: rc.closed_at,
            created_at: rc.created_at,
        });
        rows.native_balances.push(NativeBalanceRow {
            account_id,
            balance: 0,
            buying_liabilities: 0,
            selling_liabilities: 0,
            sequence_number: 0,
            num_sub_entries: 0,
            last_modified_ledger: last_modified,
            deleted: true,
            ledger_sequence: rc.ledger_sequence,
            ledger_range: rc.ledger_range,
            closed_at: rc.closed_at,
            created_at: rc.created_at,
        });
        return;
    };

    let mut buying_liabilities = 0;
    let mut selling_liabilities = 0;
    let mut num_sponsored = None;
    let mut num_sponsoring = None;
    let mut sequence_ledger = None;
    let mut sequence_time = None;
    let mut signer_sponsoring: Option<&[xdr::SponsorshipDescriptor]> = None;
    if let xdr::AccountEntryExt::V1(v1) = &account.ext {
        buying_liabilities = v1.liabilities.buying;
        selling_liabilities = v1.liabilities.selling;
        if let xdr::AccountEntryExtensionV1Ext::V2(v2) = &v1.ext {
            num_sponsored = Some(v2.num_sponsored);
            num_sponsoring = Some(v2.num_sponsoring);
            signer_sponsoring = Some(v2.signer_sponsoring_i_ds.as_slice());
            if let xdr::AccountEntryExtensionV2Ext::V3(v3) = &v2.ext {
                sequence_ledger = Some(v3.seq_ledger);
                sequence_time = Some(v3.seq_time.0 as i64);
            }
        }
    }

    let thresholds = account.thresholds.0;
    rows.accounts.push(AccountRow {
        account_id: account_id.clone(),
        balance: account.balance,
        sequence_number: account.seq_num.0,
        sequence_ledger,
        sequence_time,
        num_sub_entries: account.num_sub_entries,
        inflation_destination: account.inflation_dest.as_ref().map(account_id_to_strkey),
        flags: account.flags,
        home_domain: account.home_domain.0.to_utf8_string_lossy(),
        master_weight: thresholds[0].into(),
        threshold_low: thresholds[1].into(),
        threshold_medium: thresholds[2].into(),
        threshold_high: thresholds[3].into(),
        buying_liabilities,
        selling_liabilities,
        num_sponsored,
        num_sponsoring,
        num_signers: account.signers.len() as u32,
        deleted: false,
        last_modified_ledger: last_modified,
        ledger_sequence: rc.ledger_sequence,
        ledger_range: rc.ledger_range,
        closed_at: rc.closed_at,
        created_at: rc.created_at,
    });

    rows.native_balances.push(NativeBalanceRow {
        account_id: account_id.clone(),
        balance: account.balance,
        buying_liabilities,
        selling_liabilities,
        sequence_number: account.seq_num.0,
        num_sub_entries: account.num_sub_entries,
        last_modified_ledger: last_modified,
        deleted: false,
        ledger_sequence: rc.ledger_sequence,
        ledger_range: rc.ledger_range,
        closed_at: rc.closed_at,
        created_at: rc.created_at,
    });

    for (index, signer) in account.signers.iter().enumerate() {
        // The sponsoring descriptors are index-aligned with the signer
        // list when the V2 extension is present.
        let sponsor = signer_sponsoring
            .map(|ids| ids[index].0.as_ref().map(account_id_to_strkey))
            .unwrap_or(None);
        rows.account_signers.push(AccountSignerRow {
            account_id: account_id.clone(),
            signer: signer_key_to_strkey(&signer.key),
            weight: signer.weight,
            sponsor,
            deleted: false,
            last_modified_ledger: last_modified,
            ledger_sequence: rc.ledger_sequence,
            ledger_range: rc.ledger_range,
            closed_at: rc.closed_at,
            created_at: rc.created_at,
        });
    }
}

fn trustline_asset_parts(
    asset: &xdr::TrustLineAsset,
) -> (String, Option<String>, Option<String>, Option<String>) {
    match asset {
        xdr::TrustLineAsset::Native => ("native".to_string(), None, None, None),
        xdr::TrustLineAsset::CreditAlphanum4(a) => {
            let (t, c, i) = asset_parts(&xdr::Asset::CreditAlphanum4(a.clone()));
            (t, c, i, None)
        }
        xdr::TrustLineAsset::CreditAlphanum12(a) => {
            let (t, c, i) = asset_parts(&xdr::Asset::CreditAlphanum12(a.clone()));
            (t, c, i, None)
        }
        xdr::TrustLineAsset::PoolShare(pool_id) => (
            "liquidity_pool_shares".to_string(),
            None,
            None,
            Some(pool_id_to_hex(pool_id)),
        ),
    }
}

fn trustline_row(
    rows: &mut SnapshotRows,
    key: &xdr::LedgerKeyTrustLine,
    delta: &EntryDelta,
    rc: &RowCtx,
) {
    let (asset_type, asset_code, asset_issuer, liquidity_pool_id) =
        trustline_asset_parts(&key.asset);
    let entry = delta.entry.as_ref().and_then(|e| match &e.data {
        xdr::LedgerEntryData::Trustline(t) => Some(t),
        _ => None,
    });

    let (balance, trust_limit, flags, buying, selling) = match entry {
        Some(t) => {
            let (buying, selling) = match &t.ext {
                xdr::TrustLineEntryExt::V1(v1) => (v1.liabilities.buying, v1.liabilities.selling),
                xdr::TrustLineEntryExt::V0 => (0, 0),
            };
            (t.balance, t.limit, t.flags, buying, selling)
        }
        None => (0, 0, 0, 0, 0),
    };

    rows.trustlines.push(TrustlineRow {
        account_id: account_id_to_strkey(&key.account_id),
        asset_type,
        asset_code,
        asset_issuer,
        liquidity_pool_id,
        balance,
        trust_limit,
        buying_liabilities: buying,
        selling_liabilities: selling,
        flags,
        deleted: entry.is_none(),
        last_modified_ledger: last_modified(delta, rc),
        ledger_sequence: rc.ledger_sequence,
        ledger_range: rc.ledger_range,
        closed_at: rc.closed_at,
        created_at: rc.created_at,
    });
}

fn offer_row(rows: &mut SnapshotRows, key: &xdr::LedgerKeyOffer, delta: &EntryDelta, rc: &RowCtx) {
    let entry = delta.entry.as_ref().and_then(|e| match &e.data {
        xdr::LedgerEntryData::Offer(o) => Some(o),
        _ => None,
    });

    let (selling, buying, amount, price_n, price_d, flags) = match entry {
        Some(o) => (
            asset_parts(&o.selling),
            asset_parts(&o.buying),
            o.amount,
            o.price.n,
            o.price.d,
            o.flags,
        ),
        None => (
            ("native".to_string(), None, None),
            ("native".to_string(), None, None),
            0,
            0,
            0,
            0,
        ),
    };

    rows.offers.push(OfferRow {
        seller_id: account_id_to_strkey(&key.seller_id),
        offer_id: key.offer_id,
        selling_asset_type: selling.0,
        selling_asset_code: selling.1,
        selling_asset_issuer: selling.2,
        buying_asset_type: buying.0,
        buying_asset_code: buying.1,
        buying_asset_issuer: buying.2,
        amount,
        price_n,
        price_d,
        flags,
        deleted: entry.is_none(),
        last_modified_ledger: last_modified(delta, rc),
        ledger_sequence: rc.ledger_sequence,
        ledger_range: rc.ledger_range,
        closed_at: rc.closed_at,
        created_at: rc.created_at,
    });
}

fn claimable_balance_row(
    rows: &mut SnapshotRows,
    key: &xdr::LedgerKeyClaimableBalance,
    delta: &EntryDelta,
    rc: &RowCtx,
) {
    let entry = delta.entry.as_ref().and_then(|e| match &e.data {
        xdr::LedgerEntryData::ClaimableBalance(b) => Some(b),
        _ => None,
    });

    let (asset, amount, claimants, flags) = match entry {
        Some(b) => {
            let claimants: Vec<String> = b
                .claimants
                .iter()
                .map(|c| {
                    let xdr::Claimant::ClaimantTypeV0(v0) = c;
                    account_id_to_strkey(&v0.destination)
                })
                .collect();
            let flags = match &b.ext {
                xdr::ClaimableBalanceEntryExt::V1(v1) => v1.flags,
                xdr::ClaimableBalanceEntryExt::V0 => 0,
            };
            (asset_parts(&b.asset), b.amount, claimants, flags)
        }
        None => (("native".to_string(), None, None), 0, Vec::new(), 0),
    };

    rows.claimable_balances.push(ClaimableBalanceRow {
        balance_id: claimable_balance_id_to_hex(&key.balance_id),
        asset_type: asset.0,
        asset_code: asset.1,
        asset_issuer: asset.2,
        amount,
        claimants: json!(claimants).to_string(),
        flags,
        deleted: entry.is_none(),
        last_modified_ledger: last_modified(delta, rc),
        ledger_sequence: rc.ledger_sequence,
        ledger_range: rc.ledger_range,
        closed_at: rc.closed_at,
        created_at: rc.created_at,
    });
}

fn liquidity_pool_row(
    rows: &mut SnapshotRows,
    key: &xdr::LedgerKeyLiquidityPool,
    delta: &EntryDelta,
    rc: &RowCtx,
) {
    let entry = delta.entry.as_ref().and_then(|e| match &e.data {
        xdr::LedgerEntryData::LiquidityPool(p) => Some(p),
        _ => None,
    });

    let row = match entry {
        Some(pool) => {
            let xdr::LiquidityPoolEntryBody::LiquidityPoolConstantProduct(cp) = &pool.body;
            let asset_a = asset_parts(&cp.params.asset_a);
            let asset_b = asset_parts(&cp.params.asset_b);
            LiquidityPoolRow {
                liquidity_pool_id: pool_id_to_hex(&key.liquidity_pool_id),
                pool_type: "constant_product".to_string(),
                fee: cp.params.fee,
                trustline_count: cp.pool_shares_trust_line_count,
                total_pool_shares: cp.total_pool_shares,
                asset_a_type: asset_a.0,
                asset_a_code: asset_a.1,
                asset_a_issuer: asset_a.2,
                reserve_a: cp.reserve_a,
                asset_b_type: asset_b.0,
                asset_b_code: asset_b.1,
                asset_b_issuer: asset_b.2,
                reserve_b: cp.reserve_b,
                deleted: false,
                last_modified_ledger: last_modified(delta, rc),
                ledger_sequence: rc.ledger_sequence,
                ledger_range: rc.ledger_range,
                closed_at: rc.closed_at,
                created_at: rc.created_at,
            }
        }
        None => LiquidityPoolRow {
            liquidity_pool_id: pool_id_to_hex(&key.liquidity_pool_id),
            pool_type: "constant_product".to_string(),
            fee: 0,
            trustline_count: 0,
            total_pool_shares: 0,
            asset_a_type: "native".to_string(),
            asset_a_code: None,
            asset_a_issuer: None,
            reserve_a: 0,
            asset_b_type: "native".to_string(),
            asset_b_code: None,
            asset_b_issuer: None,
            reserve_b: 0,
            deleted: true,
            last_modified_ledger: last_modified(delta, rc),
            ledger_sequence: rc.ledger_sequence,
            ledger_range: rc.ledger_range,
            closed_at: rc.closed_at,
            created_at: rc.created_at,
        },
    };
    rows.liquidity_pools.push(row);
}
