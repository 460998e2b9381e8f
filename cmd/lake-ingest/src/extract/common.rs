use sha2::{Digest, Sha256};

use crate::xdr::{self, Limits, WriteXdr};

pub fn account_id_to_strkey(id: &xdr::AccountId) -> String {
    let xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(bytes))) = id;
    stellar_strkey::ed25519::PublicKey(*bytes).to_string()
}

pub fn muxed_account_to_strkey(account: &xdr::MuxedAccount) -> String {
    match account {
        xdr::MuxedAccount::Ed25519(xdr::Uint256(bytes)) => {
            stellar_strkey::ed25519::PublicKey(*bytes).to_string()
        }
        xdr::MuxedAccount::MuxedEd25519(m) => {
            stellar_strkey::ed25519::PublicKey(m.ed25519.0).to_string()
        }
    }
}

pub fn node_id_to_strkey(node_id: &xdr::NodeId) -> String {
    let xdr::NodeId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(bytes))) = &node_id;
    stellar_strkey::ed25519::PublicKey(*bytes).to_string()
}

pub fn contract_id_to_strkey(id: &xdr::ContractId) -> String {
    stellar_strkey::Contract(id.0 .0).to_string()
}

pub fn sc_address_to_strkey(address: &xdr::ScAddress) -> String {
    match address {
        xdr::ScAddress::Account(id) => account_id_to_strkey(id),
        xdr::ScAddress::Contract(contract) => contract_id_to_strkey(contract),
        other => format!("{other:?}"),
    }
}

pub fn signer_key_to_strkey(key: &xdr::SignerKey) -> String {
    match key {
        xdr::SignerKey::Ed25519(xdr::Uint256(bytes)) => {
            stellar_strkey::ed25519::PublicKey(*bytes).to_string()
        }
        xdr::SignerKey::PreAuthTx(xdr::Uint256(bytes)) => {
            stellar_strkey::PreAuthTx(*bytes).to_string()
        }
        xdr::SignerKey::HashX(xdr::Uint256(bytes)) => stellar_strkey::HashX(*bytes).to_string(),
        xdr::SignerKey::Ed25519SignedPayload(p) => stellar_strkey::ed25519::SignedPayload {
            ed25519: p.ed25519.0,
            payload: p.payload.to_vec(),
        }
        .to_string(),
    }
}

/// `(asset_type, code, issuer)` in the horizon vocabulary.
pub fn asset_parts(asset: &xdr::Asset) -> (String, Option<String>, Option<String>) {
    match asset {
        xdr::Asset::Native => ("native".to_string(), None, None),
        xdr::Asset::CreditAlphanum4(a) => (
            "credit_alphanum4".to_string(),
            Some(asset_code_to_string(&a.asset_code.0)),
            Some(account_id_to_strkey(&a.issuer)),
        ),
        xdr::Asset::CreditAlphanum12(a) => (
            "credit_alphanum12".to_string(),
            Some(asset_code_to_string(&a.asset_code.0)),
            Some(account_id_to_strkey(&a.issuer)),
        ),
    }
}

pub fn asset_code_to_string(code: &[u8]) -> String {
    String::from_utf8_lossy(code)
        .trim_end_matches('\0')
        .to_string()
}

pub fn pool_id_to_hex(id: &xdr::PoolId) -> String {
    hex::encode(id.0 .0)
}

pub fn claimable_balance_id_to_hex(id: &xdr::ClaimableBalanceId) -> String {
    match id {
        xdr::ClaimableBalanceId::ClaimableBalanceIdTypeV0(hash) => hex::encode(hash.0),
    }
}

/// SHA-256 over the canonical binary form of a ledger key; the stable
/// identity used for TTL, eviction and restoration rows.
pub fn ledger_key_hash(key: &xdr::LedgerKey) -> Result<String, xdr::Error> {
    let bytes = key.to_xdr(Limits::none())?;
    Ok(hex::encode(Sha256::digest(bytes)))
}

/// Short vocabulary name for a ledger key's entry type.
pub fn ledger_key_type(key: &xdr::LedgerKey) -> &'static str {
    match key {
        xdr::LedgerKey::Account(_) => "account",
        xdr::LedgerKey::Trustline(_) => "trustline",
        xdr::LedgerKey::Offer(_) => "offer",
        xdr::LedgerKey::Data(_) => "data",
        xdr::LedgerKey::ClaimableBalance(_) => "claimable_balance",
        xdr::LedgerKey::LiquidityPool(_) => "liquidity_pool",
        xdr::LedgerKey::ContractData(_) => "contract_data",
        xdr::LedgerKey::ContractCode(_) => "contract_code",
        xdr::LedgerKey::ConfigSetting(_) => "config_setting",
        xdr::LedgerKey::Ttl(_) => "ttl",
    }
}

/// The contract a ledger key belongs to, when it names one.
pub fn ledger_key_contract(key: &xdr::LedgerKey) -> Option<String> {
    match key {
        xdr::LedgerKey::ContractData(k) => Some(sc_address_to_strkey(&k.contract)),
        _ => None,
    }
}

pub fn memo_parts(memo: &xdr::Memo) -> (String, Option<String>) {
    match memo {
        xdr::Memo::None => ("none".to_string(), None),
        xdr::Memo::Text(text) => ("text".to_string(), Some(text.to_utf8_string_lossy())),
        xdr::Memo::Id(id) => ("id".to_string(), Some(id.to_string())),
        xdr::Memo::Hash(hash) => ("hash".to_string(), Some(hex::encode(hash.0))),
        xdr::Memo::Return(hash) => ("return".to_string(), Some(hex::encode(hash.0))),
    }
}

/// Category code for the whole-transaction result, `tx_*` vocabulary.
pub fn tx_result_code(result: &xdr::TransactionResultResult) -> &'static str {
    use xdr::TransactionResultResult as R;
    match result {
        R::TxFeeBumpInnerSuccess(_) => "tx_fee_bump_inner_success",
        R::TxFeeBumpInnerFailed(_) => "tx_fee_bump_inner_failed",
        R::TxSuccess(_) => "tx_success",
        R::TxFailed(_) => "tx_failed",
        R::TxTooEarly => "tx_too_early",
        R::TxTooLate => "tx_too_late",
        R::TxMissingOperation => "tx_missing_operation",
        R::TxBadSeq => "tx_bad_seq",
        R::TxBadAuth => "tx_bad_auth",
        R::TxInsufficientBalance => "tx_insufficient_balance",
        R::TxNoAccount => "tx_no_account",
        R::TxInsufficientFee => "tx_insufficient_fee",
        R::TxBadAuthExtra => "tx_bad_auth_extra",
        R::TxInternalError => "tx_internal_error",
        R::TxNotSupported => "tx_not_supported",
        R::TxBadSponsorship => "tx_bad_sponsorship",
        R::TxBadMinSeqAgeOrGap => "tx_bad_min_seq_age_or_gap",
        R::TxMalformed => "tx_malformed",
        R::TxSorobanInvalid => "tx_soroban_invalid",
    }
}

pub fn tx_was_successful(result: &xdr::TransactionResultResult) -> bool {
    matches!(
        result,
        xdr::TransactionResultResult::TxSuccess(_)
            | xdr::TransactionResultResult::TxFeeBumpInnerSuccess(_)
    )
}

/// Per-operation results out of the transaction result, when present.
/// V0 envelopes on old ledgers surface no per-operation results.
pub fn operation_results(
    result: &xdr::TransactionResultResult,
) -> Option<&[xdr::OperationResult]> {
    use xdr::TransactionResultResult as R;
    match result {
        R::TxSuccess(ops) | R::TxFailed(ops) => Some(ops.as_slice()),
        R::TxFeeBumpInnerSuccess(inner) | R::TxFeeBumpInnerFailed(inner) => {
            use xdr::InnerTransactionResultResult as I;
            match &inner.result.result {
                I::TxSuccess(ops) | I::TxFailed(ops) => Some(ops.as_slice()),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_asset_has_no_code_or_issuer() {
        let (asset_type, code, issuer) = asset_parts(&xdr::Asset::Native);
        assert_eq!(asset_type, "native");
        assert_eq!(code, None);
        assert_eq!(issuer, None);
    }

    #[test]
    fn asset_codes_trim_trailing_nuls() {
        assert_eq!(asset_code_to_string(b"USDC"), "USDC");
        assert_eq!(asset_code_to_string(b"EUR\0"), "EUR");
    }
}
