// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Transaction-building engine.
//!
//! One build request is one sequential pipeline: fetch candidate UTXOs,
//! select inputs and fee, assemble the raw transaction, optionally wrap it
//! in a PSBT. Requests share nothing but the RPC connection pool, so any
//! number can run concurrently.
//!
//! Selection does not reserve UTXOs: two simultaneous builds against the
//! same address can pick the same coin, and the race is resolved by the
//! node/mempool at broadcast time. Known limitation, not handled here.

pub mod psbt;
pub mod select;
pub mod tx;
pub mod utxo;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::audit::{AuditKind, AuditLog};
use crate::error::RelayError;
use crate::explorer::ExplorerClient;
use crate::networks::params_for;
use crate::rpc::RpcClient;

use self::select::SpendPlan;
use self::utxo::{safe_number, UnspentOutput, UtxoAdapter, UtxoQuery};

/// Smallest destination value accepted without a payload. With a payload
/// the OP_RETURN output carries the economic signal and the floor is
/// waived down to this same dust reference.
pub const MIN_REFERENCE_AMOUNT: Decimal = dec!(0.0000546);

const DEFAULT_MIN_CONF: u64 = 0;
const DEFAULT_MAX_CONF: u64 = 999_999_999;

/// Address plus optional owner pubkey.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyRef {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
}

/// Configuration of a generic build request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildTxConfig {
    pub from_key_pair: KeyRef,
    pub to_key_pair: KeyRef,
    /// Coin units. Required unless a payload is given.
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    /// Protocol payload to embed as OP_RETURN. Opaque here.
    #[serde(default)]
    pub payload: Option<String>,
    /// Externally supplied inputs, consumed ahead of fresh UTXOs.
    #[serde(default)]
    pub inputs: Vec<UnspentOutput>,
    /// Also return a PSBT wrapping of the result.
    #[serde(default)]
    pub add_psbt: bool,
    /// Network name; falls back to the configured default.
    #[serde(default)]
    pub network: Option<String>,
}

/// Configuration of a two-party trade build.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TradeTxConfig {
    pub buyer_key_pair: KeyRef,
    pub seller_key_pair: KeyRef,
    /// Trade amount in coin units.
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub payload: String,
    /// Pre-reserved funds (e.g. locked in a channel), consumed first.
    #[serde(default, rename = "commitUTXOs", alias = "commitUtxos")]
    pub commit_utxos: Vec<UnspentOutput>,
    pub network: String,
}

/// Result of a generic build.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuiltTransaction {
    pub rawtx: String,
    pub inputs: Vec<UnspentOutput>,
    #[schema(value_type = f64)]
    pub fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psbt_hex: Option<String>,
}

/// Result of a trade build: one transaction settling both legs.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TradeTransaction {
    pub rawtx: String,
    pub inputs: Vec<UnspentOutput>,
    pub psbt_hex: String,
    #[schema(value_type = f64)]
    pub fee: Decimal,
    #[schema(value_type = f64)]
    pub seller_amount: Decimal,
    #[schema(value_type = f64)]
    pub buyer_amount: Decimal,
}

/// The engine. Borrows its collaborators from the application state for
/// the duration of one request.
pub struct TxBuilder<'a> {
    rpc: &'a RpcClient,
    explorer: &'a ExplorerClient,
    audit: &'a AuditLog,
    default_network: &'a str,
}

impl<'a> TxBuilder<'a> {
    pub fn new(
        rpc: &'a RpcClient,
        explorer: &'a ExplorerClient,
        audit: &'a AuditLog,
        default_network: &'a str,
    ) -> Self {
        Self {
            rpc,
            explorer,
            audit,
            default_network,
        }
    }

    /// Build a generic transaction: destination output, change, optional
    /// payload, optional PSBT.
    pub async fn build_tx(
        &self,
        config: BuildTxConfig,
        api_mode: bool,
    ) -> Result<BuiltTransaction, RelayError> {
        let net = params_for(config.network.as_deref().unwrap_or(self.default_network))?;
        let target = generic_target(config.amount, config.payload.as_deref())?;

        self.ensure_valid_address(&config.from_key_pair.address, api_mode, "from")
            .await?;
        self.ensure_valid_address(&config.to_key_pair.address, api_mode, "to")
            .await?;

        let fresh = self.fetch_candidates(&config.from_key_pair).await?;
        let mut candidates = config.inputs.clone();
        candidates.extend(fresh);

        let plan = select::select(&candidates, target)?;
        let change = safe_number(plan.input_sum() - target - plan.fee);

        let mut legs = vec![(config.to_key_pair.address.clone(), target)];
        if change > Decimal::ZERO {
            legs.push((config.from_key_pair.address.clone(), change));
        }

        let rawtx =
            tx::build_raw_transaction(&plan.inputs, &legs, config.payload.as_deref(), net)?;
        verify_conservation(&plan, &legs)?;

        let psbt_hex = if config.add_psbt {
            Some(psbt::assemble(&rawtx, &plan.inputs, net)?)
        } else {
            None
        };

        tracing::info!(
            from = %config.from_key_pair.address,
            to = %config.to_key_pair.address,
            inputs = plan.inputs.len(),
            fee = %plan.fee,
            "built transaction"
        );

        Ok(BuiltTransaction {
            rawtx,
            inputs: plan.inputs,
            fee: plan.fee,
            psbt_hex,
        })
    }

    /// Build an atomic two-leg trade settlement: buyer and seller outputs
    /// plus the trade payload, in one transaction.
    pub async fn build_trade_tx(
        &self,
        config: TradeTxConfig,
    ) -> Result<TradeTransaction, RelayError> {
        let net = params_for(&config.network)?;

        self.ensure_valid_address(&config.buyer_key_pair.address, false, "buyer")
            .await?;
        self.ensure_valid_address(&config.seller_key_pair.address, false, "seller")
            .await?;
        if config.payload.is_empty() {
            return Err(RelayError::MalformedPayload(
                "a trade build requires a payload".into(),
            ));
        }

        // Committed inputs take priority over freshly fetched buyer UTXOs.
        let fresh = self.fetch_candidates(&config.buyer_key_pair).await?;
        let mut candidates = config.commit_utxos.clone();
        candidates.extend(fresh);

        let plan = select::select(&candidates, config.amount)?;
        let (seller_amount, buyer_amount) =
            trade_split(plan.input_sum(), config.amount, plan.fee)?;

        let mut legs = Vec::with_capacity(2);
        if buyer_amount > Decimal::ZERO {
            legs.push((config.buyer_key_pair.address.clone(), buyer_amount));
        }
        legs.push((config.seller_key_pair.address.clone(), seller_amount));

        let rawtx =
            tx::build_raw_transaction(&plan.inputs, &legs, Some(&config.payload), net)?;
        let psbt_hex = psbt::assemble(&rawtx, &plan.inputs, net)?;

        tracing::info!(
            buyer = %config.buyer_key_pair.address,
            seller = %config.seller_key_pair.address,
            inputs = plan.inputs.len(),
            fee = %plan.fee,
            "built trade transaction"
        );

        Ok(TradeTransaction {
            rawtx,
            inputs: plan.inputs,
            psbt_hex,
            fee: plan.fee,
            seller_amount,
            buyer_amount,
        })
    }

    /// Look up a transaction record on the node.
    pub async fn get_transaction(&self, txid: &str) -> Result<Value, RelayError> {
        self.rpc.call("tl_gettransaction", &[json!(txid)]).await
    }

    /// Broadcast a signed transaction. The node's rejection reason, if any,
    /// surfaces verbatim. No retry: a blind resend of `sendrawtransaction`
    /// creates duplicate-broadcast ambiguity.
    pub async fn broadcast(&self, raw_hex: &str) -> Result<String, RelayError> {
        match self.rpc.call("sendrawtransaction", &[json!(raw_hex)]).await {
            Ok(value) => {
                let txid = value
                    .as_str()
                    .ok_or_else(|| {
                        RelayError::Node("sendrawtransaction: unexpected response".into())
                    })?
                    .to_string();
                self.audit.append(AuditKind::Txids, &txid);
                tracing::info!(txid, "transaction broadcast");
                Ok(txid)
            }
            Err(RelayError::Node(reason)) => Err(RelayError::BroadcastRejected(reason)),
            Err(other) => Err(other),
        }
    }

    async fn ensure_valid_address(
        &self,
        address: &str,
        api_mode: bool,
        role: &str,
    ) -> Result<(), RelayError> {
        let info = self.rpc.validate_address(address, api_mode).await?;
        if !info.isvalid {
            return Err(RelayError::InvalidAddress(format!("{role}: {address}")));
        }
        Ok(())
    }

    /// Fetch and order fresh candidates for one party: adapter chain, then
    /// descending by amount to minimize input count.
    async fn fetch_candidates(&self, key: &KeyRef) -> Result<Vec<UnspentOutput>, RelayError> {
        let adapter = UtxoAdapter::new(self.rpc, self.audit, self.explorer);
        let query = UtxoQuery {
            address: &key.address,
            pubkey: key.pubkey.as_deref(),
            min_conf: DEFAULT_MIN_CONF,
            max_conf: DEFAULT_MAX_CONF,
        };
        let mut utxos = adapter.fetch_utxos(&query).await?;
        utxos.sort_by(|a, b| b.amount.cmp(&a.amount));
        Ok(utxos)
    }
}

/// Spend target of a generic build. Without a payload the destination
/// must carry at least the reference amount; with one, the floor is the
/// dust reference itself (the OP_RETURN output carries the signal).
fn generic_target(
    amount: Option<Decimal>,
    payload: Option<&str>,
) -> Result<Decimal, RelayError> {
    let amount = amount.unwrap_or(Decimal::ZERO);
    if payload.is_none() && amount < MIN_REFERENCE_AMOUNT {
        return Err(RelayError::MalformedPayload(format!(
            "amount {amount} is below the minimum reference amount \
             {MIN_REFERENCE_AMOUNT} and no payload was given"
        )));
    }
    Ok(amount.max(MIN_REFERENCE_AMOUNT))
}

/// Split selected value between the two trade legs. Each leg bears the
/// input fee once. A negative buyer leg is a hard error, never clamped.
fn trade_split(
    input_sum: Decimal,
    trade_amount: Decimal,
    fee: Decimal,
) -> Result<(Decimal, Decimal), RelayError> {
    let seller = safe_number(trade_amount - fee);
    let buyer = safe_number(input_sum - trade_amount - fee);

    if seller <= Decimal::ZERO {
        return Err(RelayError::InsufficientFunds {
            available: trade_amount,
            required: fee,
        });
    }
    if buyer < Decimal::ZERO {
        return Err(RelayError::InsufficientFunds {
            available: input_sum,
            required: safe_number(trade_amount + fee),
        });
    }
    Ok((seller, buyer))
}

/// Re-validate that outputs plus fee never exceed the selected input value.
/// The builder's arithmetic is best-effort; this is the authoritative check
/// before the result leaves the engine.
fn verify_conservation(plan: &SpendPlan, legs: &[tx::OutputLeg]) -> Result<(), RelayError> {
    let outputs: Decimal = legs.iter().map(|(_, amount)| *amount).sum();
    let total = safe_number(outputs + plan.fee);
    if total > plan.input_sum() {
        return Err(RelayError::Assembly(format!(
            "outputs plus fee {total} exceed input value {}",
            plan.input_sum()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::select::input_fee;

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
    fn zero_amount_without_payload_is_rejected() {
        assert!(matches!(
            generic_target(Some(Decimal::ZERO), None),
            Err(RelayError::MalformedPayload(_))
        ));
        assert!(matches!(
            generic_target(None, None),
            Err(RelayError::MalformedPayload(_))
        ));
    }

    #[test]
    fn zero_amount_with_payload_targets_dust_reference() {
        assert_eq!(
            generic_target(Some(Decimal::ZERO), Some("tl20;x;1;1;0")).unwrap(),
            MIN_REFERENCE_AMOUNT
        );
        assert_eq!(
            generic_target(Some(dec!(0.5)), None).unwrap(),
            dec!(0.5)
        );
    }

    #[test]
    fn trade_split_charges_each_leg_once() {
        let fee = input_fee(2);
        let (seller, buyer) = trade_split(dec!(1.1), dec!(0.25), fee).unwrap();
        assert_eq!(seller, safe_number(dec!(0.25) - fee));
        assert_eq!(buyer, safe_number(dec!(1.1) - dec!(0.25) - fee));
        assert!(seller > Decimal::ZERO && buyer > Decimal::ZERO);
    }

    #[test]
    fn trade_split_rejects_negative_buyer_leg() {
        assert!(matches!(
            trade_split(dec!(0.2), dec!(0.25), input_fee(1)),
            Err(RelayError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn trade_split_rejects_fee_swallowing_trade() {
        assert!(matches!(
            trade_split(dec!(1), dec!(0.00001), input_fee(1)),
            Err(RelayError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn committed_inputs_selected_ahead_of_buyer_funds() {
        // Candidate order is commit ++ fresh; a committed coin that covers
        // the target keeps the buyer's own UTXOs untouched.
        let candidates = vec![utxo(dec!(0.2)), utxo(dec!(0.9))];
        let plan = select::select(&candidates, dec!(0.15)).unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.inputs[0].amount, dec!(0.2));

        let (seller, buyer) =
            trade_split(plan.input_sum(), dec!(0.15), plan.fee).unwrap();
        assert_eq!(seller, safe_number(dec!(0.15) - plan.fee));
        assert_eq!(buyer, safe_number(dec!(0.2) - dec!(0.15) - plan.fee));
    }

    #[test]
    fn trade_pulls_buyer_funds_when_commit_is_short() {
        let candidates = vec![utxo(dec!(0.2)), utxo(dec!(0.9))];
        let plan = select::select(&candidates, dec!(0.25)).unwrap();
        assert_eq!(plan.inputs.len(), 2);

        let (seller, buyer) =
            trade_split(plan.input_sum(), dec!(0.25), plan.fee).unwrap();
        assert_eq!(seller, safe_number(dec!(0.25) - input_fee(2)));
        assert_eq!(buyer, safe_number(dec!(1.1) - dec!(0.25) - input_fee(2)));
    }

    #[test]
    fn conservation_check_rejects_overspending_legs() {
        let plan = SpendPlan {
            inputs: vec![utxo(dec!(0.5))],
            fee: input_fee(1),
        };
        let legs = vec![("addr".to_string(), dec!(0.51))];
        assert!(verify_conservation(&plan, &legs).is_err());

        let legs = vec![("addr".to_string(), dec!(0.49))];
        assert!(verify_conservation(&plan, &legs).is_ok());
    }
}
