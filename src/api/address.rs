// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Address validation, balance lookup and the testnet faucet.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    models::{DataEnvelope, FundRequest},
    state::AppState,
};

/// Validate an address against the node.
#[utoipa::path(
    get,
    path = "/address/validate/{address}",
    tag = "Address",
    params(("address" = String, Path, description = "Address to validate")),
    responses((status = 200, description = "Node validation result"))
)]
pub async fn validate_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    let result = state.rpc.call("validateaddress", &[json!(address)]).await?;
    Ok(Json(DataEnvelope::new(result)))
}

/// All token balances held by an address.
#[utoipa::path(
    get,
    path = "/address/balance/{address}",
    tag = "Address",
    params(("address" = String, Path, description = "Address to query")),
    responses((status = 200, description = "Token balances for the address"))
)]
pub async fn address_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    let result = state
        .rpc
        .call("tl_getallbalancesforaddress", &[json!(address)])
        .await?;
    Ok(Json(DataEnvelope::new(result)))
}

/// Faucet: send one coin to the address. Testnet only.
#[utoipa::path(
    post,
    path = "/address/fund",
    tag = "Address",
    request_body = FundRequest,
    responses(
        (status = 200, description = "Funding transaction id"),
        (status = 400, description = "Faucet disabled outside testnet")
    )
)]
pub async fn fund_address(
    State(state): State<AppState>,
    Json(request): Json<FundRequest>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    if !state.config.network.to_ascii_uppercase().ends_with("TEST") {
        return Err(ApiError::bad_request("Faucet is allowed only in TESTNET"));
    }
    let result = state
        .rpc
        .call("sendtoaddress", &[json!(request.address), json!(1)])
        .await?;
    Ok(Json(DataEnvelope::new(result)))
}
