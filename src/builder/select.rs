// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Coin selection under the relayer fee model.
//!
//! Greedy accumulation in the order the candidates are given — callers
//! order them (committed inputs first, then descending by amount) so the
//! ordering policy stays out of the selector. Selection and fee are pure
//! functions of the candidate list and target: no randomness, no clock.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::utxo::{safe_number, UnspentOutput};
use crate::error::RelayError;

/// Floor fee rate per kilobyte, coin units.
pub const MIN_FEE_PER_KB: Decimal = dec!(0.0001);

/// Per-input fee weight, as a fraction of [`MIN_FEE_PER_KB`].
///
/// The fee is a linear function of input count only — not of byte size.
/// Good enough for a testnet relayer; a production deployment should swap
/// in a vsize-aware estimator behind the same signature.
const FEE_WEIGHT_PER_INPUT: Decimal = dec!(0.2);

/// Fee for spending `count` inputs. `fee(0) == 0` and the fee is
/// non-decreasing in `count`.
pub fn input_fee(count: usize) -> Decimal {
    safe_number(FEE_WEIGHT_PER_INPUT * MIN_FEE_PER_KB * Decimal::from(count as u64))
}

/// The selector's output: inputs in selection order plus the fee they owe.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendPlan {
    pub inputs: Vec<UnspentOutput>,
    pub fee: Decimal,
}

impl SpendPlan {
    /// Total value of the selected inputs, coin units.
    pub fn input_sum(&self) -> Decimal {
        safe_number(self.inputs.iter().map(|u| u.amount).sum())
    }
}

/// Select enough of `candidates`, in order, to cover `target` plus the fee
/// of the resulting input count.
///
/// A candidate is appended while the running sum is still below
/// `target + fee(selected + 1)` — the fee of the set it would join. Fails
/// with [`RelayError::InsufficientFunds`] when even the full candidate
/// list cannot cover `target + fee(len)`.
pub fn select(candidates: &[UnspentOutput], target: Decimal) -> Result<SpendPlan, RelayError> {
    let mut selected: Vec<UnspentOutput> = Vec::new();
    let mut sum = Decimal::ZERO;

    for candidate in candidates {
        let needed = safe_number(target + input_fee(selected.len() + 1));
        if sum < needed {
            sum = safe_number(sum + candidate.amount);
            selected.push(candidate.clone());
        }
    }

    let fee = input_fee(selected.len());
    let required = safe_number(target + fee);
    if selected.is_empty() || sum < required {
        return Err(RelayError::InsufficientFunds {
            available: sum,
            required,
        });
    }

    Ok(SpendPlan {
        inputs: selected,
        fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(amount: Decimal) -> UnspentOutput {
        UnspentOutput {
            txid: "00".repeat(32),
            vout: 0,
            amount,
            confirmations: 1,
            script_pub_key: String::new(),
            redeem_script: None,
            pubkey: None,
        }
    }

    #[test]
    fn fee_is_zero_at_zero_and_monotone() {
        assert_eq!(input_fee(0), Decimal::ZERO);
        let mut previous = Decimal::ZERO;
        for n in 1..32 {
            let fee = input_fee(n);
            assert!(fee >= previous, "fee({n}) regressed");
            previous = fee;
        }
    }

    #[test]
    fn fee_is_linear_in_input_count() {
        assert_eq!(input_fee(1), dec!(0.00002));
        assert_eq!(input_fee(5), dec!(0.0001));
    }

    #[test]
    fn selects_first_two_of_three_for_spec_scenario() {
        let candidates = vec![utxo(dec!(0.5)), utxo(dec!(0.3)), utxo(dec!(0.1))];
        let plan = select(&candidates, dec!(0.6)).unwrap();

        assert_eq!(plan.inputs.len(), 2);
        assert_eq!(plan.fee, input_fee(2));
        assert_eq!(plan.input_sum(), dec!(0.8));
        // change the builder will emit
        assert_eq!(
            safe_number(plan.input_sum() - dec!(0.6) - plan.fee),
            dec!(0.19996)
        );
    }

    #[test]
    fn plan_covers_target_plus_fee() {
        let candidates = vec![utxo(dec!(0.4)), utxo(dec!(0.05)), utxo(dec!(0.2))];
        let target = dec!(0.44);
        let plan = select(&candidates, target).unwrap();
        assert!(plan.input_sum() >= safe_number(target + plan.fee));
    }

    #[test]
    fn stops_adding_once_threshold_crossed() {
        // First input alone already covers target + fee(2); the greedy rule
        // must not pull in more.
        let candidates = vec![utxo(dec!(1)), utxo(dec!(0.9)), utxo(dec!(0.8))];
        let plan = select(&candidates, dec!(0.5)).unwrap();
        assert_eq!(plan.inputs.len(), 1);
    }

    #[test]
    fn preserves_candidate_order() {
        let candidates = vec![utxo(dec!(0.1)), utxo(dec!(0.9))];
        let plan = select(&candidates, dec!(0.5)).unwrap();
        assert_eq!(plan.inputs[0].amount, dec!(0.1));
        assert_eq!(plan.inputs[1].amount, dec!(0.9));
    }

    #[test]
    fn insufficient_candidates_fail_instead_of_underfunding() {
        let candidates = vec![utxo(dec!(0.1)), utxo(dec!(0.2))];
        let err = select(&candidates, dec!(0.5)).unwrap_err();
        match err {
            RelayError::InsufficientFunds {
                available,
                required,
            } => {
                assert_eq!(available, dec!(0.3));
                assert_eq!(required, safe_number(dec!(0.5) + input_fee(2)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_candidate_list_is_insufficient() {
        assert!(matches!(
            select(&[], dec!(0.1)),
            Err(RelayError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn exact_cover_with_fee_succeeds() {
        let target = dec!(0.1);
        let candidates = vec![utxo(safe_number(target + input_fee(1)))];
        let plan = select(&candidates, target).unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.input_sum(), safe_number(target + plan.fee));
    }

    #[test]
    fn selection_is_deterministic() {
        let candidates = vec![utxo(dec!(0.33)), utxo(dec!(0.25)), utxo(dec!(0.11))];
        let a = select(&candidates, dec!(0.5)).unwrap();
        let b = select(&candidates, dec!(0.5)).unwrap();
        assert_eq!(a, b);
    }
}
