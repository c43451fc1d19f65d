// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! UTXO set adapter: canonical unspent-output representation and the
//! ordered provider chain that produces it.
//!
//! Candidates come from the node's `listunspent` when the address is
//! locally tracked, falling back to the block explorer otherwise. The
//! fallback order is a first-class list of named sources, iterated until
//! one succeeds — not a nest of catch blocks.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::audit::{AuditKind, AuditLog};
use crate::error::RelayError;
use crate::explorer::ExplorerClient;
use crate::rpc::RpcClient;

/// Satoshis per coin.
pub const COIN: Decimal = dec!(100000000);

/// Round to 8 decimal places, half away from zero. Applied at every
/// arithmetic boundary so amounts stay within coin-unit precision.
pub fn safe_number(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(8, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a coin-unit amount to satoshis.
pub fn to_sats(amount: Decimal) -> Result<u64, RelayError> {
    use rust_decimal::prelude::ToPrimitive;

    let sats = (amount * COIN).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    sats.to_u64()
        .ok_or_else(|| RelayError::Assembly(format!("amount out of range: {amount}")))
}

/// A spendable coin record. Amounts are coin units, never satoshis.
///
/// Immutable once constructed: the selector copies entries into a plan
/// instead of mutating the candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    /// Creating transaction id (display order hex).
    pub txid: String,
    /// Output index within the creating transaction.
    pub vout: u32,
    /// Value in coin units.
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[serde(default)]
    pub confirmations: u64,
    /// Hex-encoded output script.
    pub script_pub_key: String,
    /// Witness/redeem script for script-path spends (multisig).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeem_script: Option<String>,
    /// Owner public key, when known. Enables watch-only import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
}

/// Parameters of one UTXO lookup.
#[derive(Debug, Clone, Copy)]
pub struct UtxoQuery<'a> {
    pub address: &'a str,
    /// Owner public key, used for the idempotent watch-only import.
    pub pubkey: Option<&'a str>,
    pub min_conf: u64,
    pub max_conf: u64,
}

/// Node `listunspent` entry, pre-normalization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeUnspent {
    txid: String,
    vout: u32,
    amount: Decimal,
    #[serde(default)]
    confirmations: u64,
    #[serde(default)]
    script_pub_key: String,
    #[serde(default)]
    redeem_script: Option<String>,
}

/// One named provider in the fallback chain.
pub enum UtxoSource<'a> {
    Node {
        rpc: &'a RpcClient,
        audit: &'a AuditLog,
    },
    Explorer(&'a ExplorerClient),
}

impl UtxoSource<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            UtxoSource::Node { .. } => "node",
            UtxoSource::Explorer(_) => "explorer",
        }
    }

    async fn fetch(&self, query: &UtxoQuery<'_>) -> Result<Vec<UnspentOutput>, RelayError> {
        match self {
            UtxoSource::Node { rpc, audit } => fetch_from_node(rpc, audit, query).await,
            UtxoSource::Explorer(explorer) => fetch_from_explorer(explorer, query).await,
        }
    }
}

/// Ordered provider chain. Sources are tried in order; the first success
/// wins and the last failure propagates when all are exhausted.
pub struct UtxoAdapter<'a> {
    sources: Vec<UtxoSource<'a>>,
}

impl<'a> UtxoAdapter<'a> {
    /// Standard chain: node first, explorer fallback.
    pub fn new(rpc: &'a RpcClient, audit: &'a AuditLog, explorer: &'a ExplorerClient) -> Self {
        Self {
            sources: vec![
                UtxoSource::Node { rpc, audit },
                UtxoSource::Explorer(explorer),
            ],
        }
    }

    pub async fn fetch_utxos(
        &self,
        query: &UtxoQuery<'_>,
    ) -> Result<Vec<UnspentOutput>, RelayError> {
        let mut last_error: Option<RelayError> = None;
        for source in &self.sources {
            match source.fetch(query).await {
                Ok(utxos) => {
                    tracing::debug!(
                        source = source.name(),
                        address = query.address,
                        count = utxos.len(),
                        "fetched unspent outputs"
                    );
                    return Ok(utxos);
                }
                Err(e) => {
                    tracing::warn!(
                        source = source.name(),
                        address = query.address,
                        error = %e,
                        "UTXO source failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| RelayError::UpstreamUnavailable("no UTXO source configured".into())))
    }
}

async fn fetch_from_node(
    rpc: &RpcClient,
    audit: &AuditLog,
    query: &UtxoQuery<'_>,
) -> Result<Vec<UnspentOutput>, RelayError> {
    let info = rpc.validate_address(query.address, false).await?;
    if !info.isvalid {
        return Err(RelayError::InvalidAddress(query.address.to_string()));
    }

    let tracked = info.pubkey.is_some()
        || info.ismine.unwrap_or(false)
        || info.iswatchonly.unwrap_or(false);
    if !tracked {
        match query.pubkey {
            Some(pubkey) => ensure_watched(rpc, audit, query.address, pubkey).await?,
            None => {
                return Err(RelayError::Node(format!(
                    "address {} not tracked by node",
                    query.address
                )))
            }
        }
    }

    let listing = rpc
        .list_unspent(query.min_conf, query.max_conf, query.address)
        .await?;
    let entries: Vec<NodeUnspent> = serde_json::from_value(listing)
        .map_err(|e| RelayError::Node(format!("listunspent: {e}")))?;

    Ok(entries
        .into_iter()
        .map(|u| UnspentOutput {
            txid: u.txid,
            vout: u.vout,
            amount: safe_number(u.amount),
            confirmations: u.confirmations,
            script_pub_key: u.script_pub_key,
            redeem_script: u.redeem_script,
            pubkey: query.pubkey.map(str::to_string),
        })
        .collect())
}

/// Import the owner pubkey as watch-only so future `listunspent` calls
/// succeed locally. Idempotent: existing label membership short-circuits,
/// and re-importing a known key is a node-side no-op.
async fn ensure_watched(
    rpc: &RpcClient,
    audit: &AuditLog,
    address: &str,
    pubkey: &str,
) -> Result<(), RelayError> {
    if let Ok(labelled) = rpc.call("getaddressesbylabel", &[json!("")]).await {
        if labelled.get(address).is_some() {
            return Ok(());
        }
    }

    rpc.call("importpubkey", &[json!(pubkey), json!(""), json!(false)])
        .await?;
    audit.append(AuditKind::Pubkeys, pubkey);
    tracing::info!(address, "imported watch-only pubkey");
    Ok(())
}

async fn fetch_from_explorer(
    explorer: &ExplorerClient,
    query: &UtxoQuery<'_>,
) -> Result<Vec<UnspentOutput>, RelayError> {
    use std::str::FromStr;

    let listing = explorer.unspent_outputs(query.address).await?;
    let mut utxos = Vec::with_capacity(listing.len());
    for entry in listing {
        if entry.confirmations < query.min_conf || entry.confirmations > query.max_conf {
            continue;
        }
        let sats = Decimal::from_str(&entry.value).map_err(|e| {
            RelayError::UpstreamUnavailable(format!("explorer value {}: {e}", entry.value))
        })?;
        utxos.push(UnspentOutput {
            txid: entry.txid,
            vout: entry.output_no,
            amount: safe_number(sats / COIN),
            confirmations: entry.confirmations,
            script_pub_key: entry.script_hex,
            redeem_script: None,
            pubkey: query.pubkey.map(str::to_string),
        });
    }
    Ok(utxos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_number_rounds_to_8_places() {
        assert_eq!(safe_number(dec!(0.123456789)), dec!(0.12345679));
        assert_eq!(safe_number(dec!(0.100000004)), dec!(0.1));
        assert_eq!(safe_number(dec!(1)), dec!(1));
    }

    #[test]
    fn to_sats_converts_coin_units() {
        assert_eq!(to_sats(dec!(1)).unwrap(), 100_000_000);
        assert_eq!(to_sats(dec!(0.0000546)).unwrap(), 5460);
        assert_eq!(to_sats(dec!(0)).unwrap(), 0);
    }

    #[test]
    fn to_sats_rejects_negative_amounts() {
        assert!(to_sats(dec!(-0.1)).is_err());
    }

    #[test]
    fn unspent_output_serde_uses_wire_names() {
        let raw = r#"{
            "txid": "ab",
            "vout": 1,
            "amount": 0.5,
            "confirmations": 3,
            "scriptPubKey": "0014aa",
            "redeemScript": "52ae"
        }"#;
        let utxo: UnspentOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(utxo.vout, 1);
        assert_eq!(utxo.amount, dec!(0.5));
        assert_eq!(utxo.script_pub_key, "0014aa");
        assert_eq!(utxo.redeem_script.as_deref(), Some("52ae"));

        let round = serde_json::to_value(&utxo).unwrap();
        assert!(round.get("scriptPubKey").is_some());
        assert!(round.get("pubkey").is_none());
    }

    #[test]
    fn node_listing_entry_tolerates_missing_fields() {
        let raw = r#"{"txid": "ab", "vout": 0, "amount": 0.25}"#;
        let entry: NodeUnspent = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.confirmations, 0);
        assert!(entry.redeem_script.is_none());
    }
}
