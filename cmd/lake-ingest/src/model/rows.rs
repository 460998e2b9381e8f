//! The 19 normalized row schemas. Every row carries its source
//! `ledger_sequence`, the coarse `ledger_range` partition key, the ledger
//! `closed_at` time and a `created_at` extraction stamp, all epoch seconds.
//!
//! Nullable lake columns are `Option<T>` here; the sink maps `None` to SQL
//! NULL. Amount-like columns are `i64` stroops unless noted.

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub sequence: u32,
    pub ledger_hash: String,
    pub previous_ledger_hash: String,
    pub closed_at: i64,
    pub protocol_version: u32,
    pub total_coins: i64,
    pub fee_pool: i64,
    pub base_fee: u32,
    pub base_reserve: u32,
    pub max_tx_set_size: u32,
    pub successful_transaction_count: u32,
    pub failed_transaction_count: u32,
    pub operation_count: u32,
    pub tx_set_operation_count: u32,
    pub soroban_fee_write_1kb: Option<i64>,
    pub total_byte_size_of_live_soroban_state: Option<u64>,
    pub node_id: Option<String>,
    pub signature: Option<String>,
    pub ledger_header_xdr: Option<String>,
    pub ledger_range: u32,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub transaction_hash: String,
    pub ledger_sequence: u32,
    pub application_order: u32,
    pub source_account: String,
    pub account_sequence: i64,
    pub max_fee: i64,
    pub fee_charged: i64,
    pub operation_count: u32,
    pub successful: bool,
    pub result_code: String,
    pub memo_type: String,
    pub memo: Option<String>,
    /// Set when this row describes the outer envelope of a fee bump.
    pub fee_account: Option<String>,
    pub inner_transaction_hash: Option<String>,
    pub new_max_fee: Option<i64>,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationRow {
    /// SEP-35 TOID.
    pub operation_id: i64,
    pub transaction_hash: String,
    pub ledger_sequence: u32,
    pub application_order: u32,
    pub operation_index: u32,
    pub operation_type: String,
    pub source_account: String,
    pub successful: bool,
    /// Category code of the enclosing result, e.g. `op_inner`.
    pub operation_result_code: String,
    /// Operation-specific result variant, e.g. `PaymentSuccess`.
    pub operation_trace_code: String,
    pub details: String,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectRow {
    /// `"{operation_toid}-{effect_index}"`.
    pub effect_id: String,
    pub operation_id: i64,
    pub transaction_hash: String,
    pub ledger_sequence: u32,
    pub effect_index: u32,
    pub effect_type: String,
    pub account: Option<String>,
    pub amount: Option<String>,
    pub asset_type: Option<String>,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub details: String,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    /// `"{operation_toid}-{trade_index}"`.
    pub trade_id: String,
    pub operation_id: i64,
    pub transaction_hash: String,
    pub ledger_sequence: u32,
    pub trade_index: u32,
    pub trade_type: String,
    pub seller: Option<String>,
    pub buyer: String,
    pub sold_asset_type: String,
    pub sold_asset_code: Option<String>,
    pub sold_asset_issuer: Option<String>,
    pub sold_amount: i64,
    pub bought_asset_type: String,
    pub bought_asset_code: Option<String>,
    pub bought_asset_issuer: Option<String>,
    pub bought_amount: i64,
    pub offer_id: Option<i64>,
    pub liquidity_pool_id: Option<String>,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeBalanceRow {
    pub account_id: String,
    pub balance: i64,
    pub buying_liabilities: i64,
    pub selling_liabilities: i64,
    pub sequence_number: i64,
    pub num_sub_entries: u32,
    pub last_modified_ledger: u32,
    pub deleted: bool,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub account_id: String,
    pub balance: i64,
    pub sequence_number: i64,
    pub sequence_ledger: Option<u32>,
    pub sequence_time: Option<i64>,
    pub num_sub_entries: u32,
    pub inflation_destination: Option<String>,
    pub flags: u32,
    pub home_domain: String,
    pub master_weight: u32,
    pub threshold_low: u32,
    pub threshold_medium: u32,
    pub threshold_high: u32,
    pub buying_liabilities: i64,
    pub selling_liabilities: i64,
    pub num_sponsored: Option<u32>,
    pub num_sponsoring: Option<u32>,
    pub num_signers: u32,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustlineRow {
    pub account_id: String,
    pub asset_type: String,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub liquidity_pool_id: Option<String>,
    pub balance: i64,
    pub trust_limit: i64,
    pub buying_liabilities: i64,
    pub selling_liabilities: i64,
    pub flags: u32,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfferRow {
    pub seller_id: String,
    pub offer_id: i64,
    pub selling_asset_type: String,
    pub selling_asset_code: Option<String>,
    pub selling_asset_issuer: Option<String>,
    pub buying_asset_type: String,
    pub buying_asset_code: Option<String>,
    pub buying_asset_issuer: Option<String>,
    pub amount: i64,
    pub price_n: i32,
    pub price_d: i32,
    pub flags: u32,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimableBalanceRow {
    pub balance_id: String,
    pub asset_type: String,
    pub asset_code: Option<String>,
    pub asset_issuer: Option<String>,
    pub amount: i64,
    pub claimants: String,
    pub flags: u32,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityPoolRow {
    pub liquidity_pool_id: String,
    pub pool_type: String,
    pub fee: i32,
    pub trustline_count: i64,
    pub total_pool_shares: i64,
    pub asset_a_type: String,
    pub asset_a_code: Option<String>,
    pub asset_a_issuer: Option<String>,
    pub reserve_a: i64,
    pub asset_b_type: String,
    pub asset_b_code: Option<String>,
    pub asset_b_issuer: Option<String>,
    pub reserve_b: i64,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractEventRow {
    /// `"{tx_hash}:{op_index}:{event_index}"`.
    pub event_id: String,
    pub transaction_hash: String,
    pub ledger_sequence: u32,
    pub operation_index: u32,
    pub event_index: u32,
    pub contract_id: Option<String>,
    pub event_type: String,
    pub topics: String,
    pub data_xdr: String,
    pub in_successful_contract_call: bool,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractDataRow {
    pub contract_id: String,
    pub key_hash: String,
    pub durability: String,
    pub key_xdr: String,
    pub val_xdr: String,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractCodeRow {
    pub contract_code_hash: String,
    pub code_size: u32,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSettingRow {
    pub config_setting_id: i32,
    pub setting_xdr: String,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TtlRow {
    pub key_hash: String,
    pub live_until_ledger_seq: u32,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvictedKeyRow {
    /// SHA-256 over the canonical XDR of the evicted ledger key.
    pub key_hash: String,
    pub key_type: String,
    pub contract_id: Option<String>,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestoredKeyRow {
    pub key_hash: String,
    pub key_type: String,
    pub contract_id: Option<String>,
    pub transaction_hash: String,
    /// None when the archival history needed to locate the eviction point
    /// is unavailable.
    pub restored_from_ledger: Option<u32>,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSignerRow {
    pub account_id: String,
    pub signer: String,
    pub weight: u32,
    pub sponsor: Option<String>,
    pub deleted: bool,
    pub last_modified_ledger: u32,
    pub ledger_sequence: u32,
    pub ledger_range: u32,
    pub closed_at: i64,
    pub created_at: i64,
}
