// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Generic RPC passthrough and payload encoding.
//!
//! The passthrough exposes an allowlisted subset of node methods.
//! `listunspent` is routed through the UTXO adapter so the explorer
//! fallback applies, and accepted `sendrawtransaction` ids land in the
//! audit log.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    audit::AuditKind,
    builder::utxo::{UtxoAdapter, UtxoQuery},
    encoder::{self, PayloadRequest},
    error::ApiError,
    models::{DataEnvelope, RpcParams},
    state::AppState,
};

/// Node methods callable through the passthrough.
const ALLOWED_METHODS: [&str; 33] = [
    "tl_getallbalancesforaddress",
    "tl_getproperty",
    "tl_list_attestation",
    "tl_getbalance",
    "tl_getinfo",
    "tl_createrawtx_opreturn",
    "tl_createrawtx_reference",
    "tl_check_kyc",
    "tl_check_commits",
    "tl_listnodereward_addresses",
    "tl_getfullposition",
    "tl_decodetransaction",
    "tl_tokenTradeHistoryForAddress",
    "tl_contractTradeHistoryForAddress",
    "tl_channelBalanceForCommiter",
    "tl_getMaxSynth",
    "tl_createpayload_commit_tochannel",
    "tl_createpayload_withdrawal_fromchannel",
    "tl_createpayload_simplesend",
    "tl_createpayload_attestation",
    "tl_createpayload_instant_ltc_trade",
    "tl_createpayload_instant_trade",
    "tl_createpayload_contract_instant_trade",
    "tl_createpayload_sendactivation",
    "tl_totalTradeHistoryForAddress",
    "tl_getChannel",
    "tl_getInitMargin",
    "tl_getContractInfo",
    "createrawtransaction",
    "sendrawtransaction",
    "decoderawtransaction",
    "validateaddress",
    "getrawmempool",
];

/// Encode a protocol payload from a tagged request.
#[utoipa::path(
    post,
    path = "/rpc/payload",
    tag = "RPC",
    responses(
        (status = 200, description = "Encoded payload string"),
        (status = 400, description = "Unknown or malformed encoder request")
    )
)]
pub async fn encode_payload(Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    // Accept both `{ "params": {...} }` and the bare request object.
    let raw = body.get("params").cloned().unwrap_or(body);
    let request: PayloadRequest = serde_json::from_value(raw)
        .map_err(|e| ApiError::bad_request(format!("Missing or invalid params.type: {e}")))?;
    let payload = encoder::encode(&request)?;
    Ok(Json(json!({ "payload": payload })))
}

/// Allowlisted passthrough to the node.
#[utoipa::path(
    post,
    path = "/rpc/{method}",
    tag = "RPC",
    params(("method" = String, Path, description = "Node RPC method")),
    request_body = RpcParams,
    responses(
        (status = 200, description = "Node response"),
        (status = 400, description = "Method not allowed")
    )
)]
pub async fn generic_rpc(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Json(body): Json<RpcParams>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    // listunspent goes through the adapter so the explorer fallback and
    // watch-only import apply.
    if method == "listunspent" {
        return list_unspent(&state, &body.params).await;
    }

    if !ALLOWED_METHODS.contains(&method.as_str()) {
        return Err(ApiError::bad_request(format!("{method} not allowed")));
    }

    let result = state.rpc.call(&method, &body.params).await?;

    if method == "sendrawtransaction" {
        if let Some(txid) = result.as_str() {
            state.audit.append(AuditKind::Txids, txid);
        }
    }

    Ok(Json(DataEnvelope::new(result)))
}

async fn list_unspent(
    state: &AppState,
    params: &[Value],
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    let min_conf = params.first().and_then(Value::as_u64).unwrap_or(0);
    let max_conf = params
        .get(1)
        .and_then(Value::as_u64)
        .unwrap_or(999_999_999);
    let address = params
        .get(2)
        .and_then(|v| v.get(0))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("Error with getting UTXOs. Code: 0"))?;

    let adapter = UtxoAdapter::new(&state.rpc, &state.audit, &state.explorer);
    let utxos = adapter
        .fetch_utxos(&UtxoQuery {
            address,
            pubkey: None,
            min_conf,
            max_conf,
        })
        .await?;

    let value =
        serde_json::to_value(utxos).map_err(|e| ApiError::bad_gateway(e.to_string()))?;
    Ok(Json(DataEnvelope::new(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_covers_build_critical_methods() {
        for method in [
            "createrawtransaction",
            "sendrawtransaction",
            "validateaddress",
            "tl_createrawtx_opreturn",
        ] {
            assert!(ALLOWED_METHODS.contains(&method), "{method} missing");
        }
        assert!(!ALLOWED_METHODS.contains(&"stop"));
        assert!(!ALLOWED_METHODS.contains(&"importprivkey"));
    }
}
