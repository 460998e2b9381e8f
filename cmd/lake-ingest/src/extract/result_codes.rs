//! Operation result vocabulary: the `op_*` category code of the outer
//! result, and the specific trace code built from the operation kind and
//! its per-operation result variant.

use crate::xdr;

/// Category code for one operation result, `op_*` vocabulary.
pub fn op_result_code(result: &xdr::OperationResult) -> &'static str {
    use xdr::OperationResult as R;
    match result {
        R::OpInner(_) => "op_inner",
        R::OpBadAuth => "op_bad_auth",
        R::OpNoAccount => "op_no_account",
        R::OpNotSupported => "op_not_supported",
        R::OpTooManySubentries => "op_too_many_subentries",
        R::OpExceededWorkLimit => "op_exceeded_work_limit",
        R::OpTooManySponsoring => "op_too_many_sponsoring",
    }
}

/// Specific trace code: the operation kind and its result variant glued
/// together, e.g. `PaymentSuccess`, `ManageSellOfferLowReserve`.
pub fn op_trace_code(result: &xdr::OperationResult) -> String {
    match result {
        xdr::OperationResult::OpInner(tr) => {
            let (kind, variant, _) = inner_result_parts(tr);
            format!("{kind}{variant}")
        }
        other => op_result_code(other).to_string(),
    }
}

pub fn op_was_successful(result: &xdr::OperationResult) -> bool {
    match result {
        xdr::OperationResult::OpInner(tr) => inner_result_parts(tr).2,
        _ => false,
    }
}

/// `(kind, result variant, success)` for every operation kind.
fn inner_result_parts(tr: &xdr::OperationResultTr) -> (&'static str, &'static str, bool) {
    use xdr::OperationResultTr as Tr;
    let (kind, (variant, success)) = match tr {
        Tr::CreateAccount(r) => ("CreateAccount", create_account(r)),
        Tr::Payment(r) => ("Payment", payment(r)),
        Tr::PathPaymentStrictReceive(r) => {
            ("PathPaymentStrictReceive", path_payment_strict_receive(r))
        }
        Tr::ManageSellOffer(r) => ("ManageSellOffer", manage_sell_offer(r)),
        Tr::CreatePassiveSellOffer(r) => ("CreatePassiveSellOffer", manage_sell_offer(r)),
        Tr::SetOptions(r) => ("SetOptions", set_options(r)),
        Tr::ChangeTrust(r) => ("ChangeTrust", change_trust(r)),
        Tr::AllowTrust(r) => ("AllowTrust", allow_trust(r)),
        Tr::AccountMerge(r) => ("AccountMerge", account_merge(r)),
        Tr::Inflation(r) => ("Inflation", inflation(r)),
        Tr::ManageData(r) => ("ManageData", manage_data(r)),
        Tr::BumpSequence(r) => ("BumpSequence", bump_sequence(r)),
        Tr::ManageBuyOffer(r) => ("ManageBuyOffer", manage_buy_offer(r)),
        Tr::PathPaymentStrictSend(r) => ("PathPaymentStrictSend", path_payment_strict_send(r)),
        Tr::CreateClaimableBalance(r) => ("CreateClaimableBalance", create_claimable_balance(r)),
        Tr::ClaimClaimableBalance(r) => ("ClaimClaimableBalance", claim_claimable_balance(r)),
        Tr::BeginSponsoringFutureReserves(r) => (
            "BeginSponsoringFutureReserves",
            begin_sponsoring_future_reserves(r),
        ),
        Tr::EndSponsoringFutureReserves(r) => (
            "EndSponsoringFutureReserves",
            end_sponsoring_future_reserves(r),
        ),
        Tr::RevokeSponsorship(r) => ("RevokeSponsorship", revoke_sponsorship(r)),
        Tr::Clawback(r) => ("Clawback", clawback(r)),
        Tr::ClawbackClaimableBalance(r) => {
            ("ClawbackClaimableBalance", clawback_claimable_balance(r))
        }
        Tr::SetTrustLineFlags(r) => ("SetTrustLineFlags", set_trust_line_flags(r)),
        Tr::LiquidityPoolDeposit(r) => ("LiquidityPoolDeposit", liquidity_pool_deposit(r)),
        Tr::LiquidityPoolWithdraw(r) => ("LiquidityPoolWithdraw", liquidity_pool_withdraw(r)),
        Tr::InvokeHostFunction(r) => ("InvokeHostFunction", invoke_host_function(r)),
        Tr::ExtendFootprintTtl(r) => ("ExtendFootprintTtl", extend_footprint_ttl(r)),
        Tr::RestoreFootprint(r) => ("RestoreFootprint", restore_footprint(r)),
    };
    (kind, variant, success)
}

fn create_account(r: &xdr::CreateAccountResult) -> (&'static str, bool) {
    use xdr::CreateAccountResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::Underfunded => ("Underfunded", false),
        R::LowReserve => ("LowReserve", false),
        R::AlreadyExist => ("AlreadyExist", false),
    }
}

fn payment(r: &xdr::PaymentResult) -> (&'static str, bool) {
    use xdr::PaymentResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::Underfunded => ("Underfunded", false),
        R::SrcNoTrust => ("SrcNoTrust", false),
        R::SrcNotAuthorized => ("SrcNotAuthorized", false),
        R::NoDestination => ("NoDestination", false),
        R::NoTrust => ("NoTrust", false),
        R::NotAuthorized => ("NotAuthorized", false),
        R::LineFull => ("LineFull", false),
        R::NoIssuer => ("NoIssuer", false),
    }
}

fn path_payment_strict_receive(
    r: &xdr::PathPaymentStrictReceiveResult,
) -> (&'static str, bool) {
    use xdr::PathPaymentStrictReceiveResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::Underfunded => ("Underfunded", false),
        R::SrcNoTrust => ("SrcNoTrust", false),
        R::SrcNotAuthorized => ("SrcNotAuthorized", false),
        R::NoDestination => ("NoDestination", false),
        R::NoTrust => ("NoTrust", false),
        R::NotAuthorized => ("NotAuthorized", false),
        R::LineFull => ("LineFull", false),
        R::NoIssuer(_) => ("NoIssuer", false),
        R::TooFewOffers => ("TooFewOffers", false),
        R::OfferCrossSelf => ("OfferCrossSelf", false),
        R::OverSendmax => ("OverSendmax", false),
    }
}

fn manage_sell_offer(r: &xdr::ManageSellOfferResult) -> (&'static str, bool) {
    use xdr::ManageSellOfferResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::SellNoTrust => ("SellNoTrust", false),
        R::BuyNoTrust => ("BuyNoTrust", false),
        R::SellNotAuthorized => ("SellNotAuthorized", false),
        R::BuyNotAuthorized => ("BuyNotAuthorized", false),
        R::LineFull => ("LineFull", false),
        R::Underfunded => ("Underfunded", false),
        R::CrossSelf => ("CrossSelf", false),
        R::SellNoIssuer => ("SellNoIssuer", false),
        R::BuyNoIssuer => ("BuyNoIssuer", false),
        R::NotFound => ("NotFound", false),
        R::LowReserve => ("LowReserve", false),
    }
}

fn manage_buy_offer(r: &xdr::ManageBuyOfferResult) -> (&'static str, bool) {
    use xdr::ManageBuyOfferResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::SellNoTrust => ("SellNoTrust", false),
        R::BuyNoTrust => ("BuyNoTrust", false),
        R::SellNotAuthorized => ("SellNotAuthorized", false),
        R::BuyNotAuthorized => ("BuyNotAuthorized", false),
        R::LineFull => ("LineFull", false),
        R::Underfunded => ("Underfunded", false),
        R::CrossSelf => ("CrossSelf", false),
        R::SellNoIssuer => ("SellNoIssuer", false),
        R::BuyNoIssuer => ("BuyNoIssuer", false),
        R::NotFound => ("NotFound", false),
        R::LowReserve => ("LowReserve", false),
    }
}

fn set_options(r: &xdr::SetOptionsResult) -> (&'static str, bool) {
    use xdr::SetOptionsResult as R;
    match r {
        R::Success => ("Success", true),
        R::LowReserve => ("LowReserve", false),
        R::TooManySigners => ("TooManySigners", false),
        R::BadFlags => ("BadFlags", false),
        R::InvalidInflation => ("InvalidInflation", false),
        R::CantChange => ("CantChange", false),
        R::UnknownFlag => ("UnknownFlag", false),
        R::ThresholdOutOfRange => ("ThresholdOutOfRange", false),
        R::BadSigner => ("BadSigner", false),
        R::InvalidHomeDomain => ("InvalidHomeDomain", false),
        R::AuthRevocableRequired => ("AuthRevocableRequired", false),
    }
}

fn change_trust(r: &xdr::ChangeTrustResult) -> (&'static str, bool) {
    use xdr::ChangeTrustResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::NoIssuer => ("NoIssuer", false),
        R::InvalidLimit => ("InvalidLimit", false),
        R::LowReserve => ("LowReserve", false),
        R::SelfNotAllowed => ("SelfNotAllowed", false),
        R::TrustLineMissing => ("TrustLineMissing", false),
        R::CannotDelete => ("CannotDelete", false),
        R::NotAuthMaintainLiabilities => ("NotAuthMaintainLiabilities", false),
    }
}

fn allow_trust(r: &xdr::AllowTrustResult) -> (&'static str, bool) {
    use xdr::AllowTrustResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::NoTrustLine => ("NoTrustLine", false),
        R::TrustNotRequired => ("TrustNotRequired", false),
        R::CantRevoke => ("CantRevoke", false),
        R::SelfNotAllowed => ("SelfNotAllowed", false),
        R::LowReserve => ("LowReserve", false),
    }
}

fn account_merge(r: &xdr::AccountMergeResult) -> (&'static str, bool) {
    use xdr::AccountMergeResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::NoAccount => ("NoAccount", false),
        R::ImmutableSet => ("ImmutableSet", false),
        R::HasSubEntries => ("HasSubEntries", false),
        R::SeqnumTooFar => ("SeqnumTooFar", false),
        R::DestFull => ("DestFull", false),
        R::IsSponsor => ("IsSponsor", false),
    }
}

fn inflation(r: &xdr::InflationResult) -> (&'static str, bool) {
    use xdr::InflationResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::NotTime => ("NotTime", false),
    }
}

fn manage_data(r: &xdr::ManageDataResult) -> (&'static str, bool) {
    use xdr::ManageDataResult as R;
    match r {
        R::Success => ("Success", true),
        R::NotSupportedYet => ("NotSupportedYet", false),
        R::NameNotFound => ("NameNotFound", false),
        R::LowReserve => ("LowReserve", false),
        R::InvalidName => ("InvalidName", false),
    }
}

fn bump_sequence(r: &xdr::BumpSequenceResult) -> (&'static str, bool) {
    use xdr::BumpSequenceResult as R;
    match r {
        R::Success => ("Success", true),
        R::BadSeq => ("BadSeq", false),
    }
}

fn path_payment_strict_send(r: &xdr::PathPaymentStrictSendResult) -> (&'static str, bool) {
    use xdr::PathPaymentStrictSendResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::Underfunded => ("Underfunded", false),
        R::SrcNoTrust => ("SrcNoTrust", false),
        R::SrcNotAuthorized => ("SrcNotAuthorized", false),
        R::NoDestination => ("NoDestination", false),
        R::NoTrust => ("NoTrust", false),
        R::NotAuthorized => ("NotAuthorized", false),
        R::LineFull => ("LineFull", false),
        R::NoIssuer(_) => ("NoIssuer", false),
        R::TooFewOffers => ("TooFewOffers", false),
        R::OfferCrossSelf => ("OfferCrossSelf", false),
        R::UnderDestmin => ("UnderDestmin", false),
    }
}

fn create_claimable_balance(r: &xdr::CreateClaimableBalanceResult) -> (&'static str, bool) {
    use xdr::CreateClaimableBalanceResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::LowReserve => ("LowReserve", false),
        R::NoTrust => ("NoTrust", false),
        R::NotAuthorized => ("NotAuthorized", false),
        R::Underfunded => ("Underfunded", false),
    }
}

fn claim_claimable_balance(r: &xdr::ClaimClaimableBalanceResult) -> (&'static str, bool) {
    use xdr::ClaimClaimableBalanceResult as R;
    match r {
        R::Success => ("Success", true),
        R::DoesNotExist => ("DoesNotExist", false),
        R::CannotClaim => ("CannotClaim", false),
        R::LineFull => ("LineFull", false),
        R::NoTrust => ("NoTrust", false),
        R::NotAuthorized => ("NotAuthorized", false),
    }
}

fn begin_sponsoring_future_reserves(
    r: &xdr::BeginSponsoringFutureReservesResult,
) -> (&'static str, bool) {
    use xdr::BeginSponsoringFutureReservesResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::AlreadySponsored => ("AlreadySponsored", false),
        R::Recursive => ("Recursive", false),
    }
}

fn end_sponsoring_future_reserves(
    r: &xdr::EndSponsoringFutureReservesResult,
) -> (&'static str, bool) {
    use xdr::EndSponsoringFutureReservesResult as R;
    match r {
        R::Success => ("Success", true),
        R::NotSponsored => ("NotSponsored", false),
    }
}

fn revoke_sponsorship(r: &xdr::RevokeSponsorshipResult) -> (&'static str, bool) {
    use xdr::RevokeSponsorshipResult as R;
    match r {
        R::Success => ("Success", true),
        R::DoesNotExist => ("DoesNotExist", false),
        R::NotSponsor => ("NotSponsor", false),
        R::LowReserve => ("LowReserve", false),
        R::OnlyTransferable => ("OnlyTransferable", false),
        R::Malformed => ("Malformed", false),
    }
}

fn clawback(r: &xdr::ClawbackResult) -> (&'static str, bool) {
    use xdr::ClawbackResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::NotClawbackEnabled => ("NotClawbackEnabled", false),
        R::NoTrust => ("NoTrust", false),
        R::Underfunded => ("Underfunded", false),
    }
}

fn clawback_claimable_balance(
    r: &xdr::ClawbackClaimableBalanceResult,
) -> (&'static str, bool) {
    use xdr::ClawbackClaimableBalanceResult as R;
    match r {
        R::Success => ("Success", true),
        R::DoesNotExist => ("DoesNotExist", false),
        R::NotIssuer => ("NotIssuer", false),
        R::NotClawbackEnabled => ("NotClawbackEnabled", false),
    }
}

fn set_trust_line_flags(r: &xdr::SetTrustLineFlagsResult) -> (&'static str, bool) {
    use xdr::SetTrustLineFlagsResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::NoTrustLine => ("NoTrustLine", false),
        R::CantRevoke => ("CantRevoke", false),
        R::InvalidState => ("InvalidState", false),
        R::LowReserve => ("LowReserve", false),
    }
}

fn liquidity_pool_deposit(r: &xdr::LiquidityPoolDepositResult) -> (&'static str, bool) {
    use xdr::LiquidityPoolDepositResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::NoTrust => ("NoTrust", false),
        R::NotAuthorized => ("NotAuthorized", false),
        R::Underfunded => ("Underfunded", false),
        R::LineFull => ("LineFull", false),
        R::BadPrice => ("BadPrice", false),
        R::PoolFull => ("PoolFull", false),
    }
}

fn liquidity_pool_withdraw(r: &xdr::LiquidityPoolWithdrawResult) -> (&'static str, bool) {
    use xdr::LiquidityPoolWithdrawResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::NoTrust => ("NoTrust", false),
        R::Underfunded => ("Underfunded", false),
        R::LineFull => ("LineFull", false),
        R::UnderMinimum => ("UnderMinimum", false),
    }
}

fn invoke_host_function(r: &xdr::InvokeHostFunctionResult) -> (&'static str, bool) {
    use xdr::InvokeHostFunctionResult as R;
    match r {
        R::Success(_) => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::Trapped => ("Trapped", false),
        R::ResourceLimitExceeded => ("ResourceLimitExceeded", false),
        R::EntryArchived => ("EntryArchived", false),
        R::InsufficientRefundableFee => ("InsufficientRefundableFee", false),
    }
}

fn extend_footprint_ttl(r: &xdr::ExtendFootprintTtlResult) -> (&'static str, bool) {
    use xdr::ExtendFootprintTtlResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::ResourceLimitExceeded => ("ResourceLimitExceeded", false),
        R::InsufficientRefundableFee => ("InsufficientRefundableFee", false),
    }
}

fn restore_footprint(r: &xdr::RestoreFootprintResult) -> (&'static str, bool) {
    use xdr::RestoreFootprintResult as R;
    match r {
        R::Success => ("Success", true),
        R::Malformed => ("Malformed", false),
        R::ResourceLimitExceeded => ("ResourceLimitExceeded", false),
        R::InsufficientRefundableFee => ("InsufficientRefundableFee", false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_code_merges_kind_and_variant() {
        let result = xdr::OperationResult::OpInner(xdr::OperationResultTr::Inflation(
            xdr::InflationResult::NotTime,
        ));
        assert_eq!(op_trace_code(&result), "InflationNotTime");
        assert!(!op_was_successful(&result));
    }

    #[test]
    fn successful_payment_is_detected() {
        let result = xdr::OperationResult::OpInner(xdr::OperationResultTr::Payment(
            xdr::PaymentResult::Success,
        ));
        assert_eq!(op_trace_code(&result), "PaymentSuccess");
        assert!(op_was_successful(&result));
    }

    #[test]
    fn failed_offer_keeps_its_variant_name() {
        let result = xdr::OperationResult::OpInner(xdr::OperationResultTr::ManageSellOffer(
            xdr::ManageSellOfferResult::LowReserve,
        ));
        assert_eq!(op_trace_code(&result), "ManageSellOfferLowReserve");
        assert!(!op_was_successful(&result));
    }

    #[test]
    fn bad_auth_maps_to_category_code() {
        let result = xdr::OperationResult::OpBadAuth;
        assert_eq!(op_result_code(&result), "op_bad_auth");
        assert_eq!(op_trace_code(&result), "op_bad_auth");
        assert!(!op_was_successful(&result));
    }
}
