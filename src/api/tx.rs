// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Transaction endpoints: build, trade build, multisig, finalize, lookup
//! and broadcast.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::{
    builder::{psbt, BuiltTransaction, TradeTransaction, TradeTxConfig},
    error::ApiError,
    models::{
        BroadcastRequest, BroadcastResponse, BuildTxRequest, DataEnvelope, FinalizeRequest,
        FinalizedTx, MultisigRequest,
    },
    networks::params_for,
    state::AppState,
};

/// Retrieve a transaction record from the node.
#[utoipa::path(
    get,
    path = "/tx/{txid}",
    tag = "Transactions",
    params(("txid" = String, Path, description = "Transaction id")),
    responses((status = 200, description = "Transaction record"))
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    let record = state.tx_builder().get_transaction(&txid).await?;
    Ok(Json(DataEnvelope::new(record)))
}

/// Build a generic transaction: UTXO selection, fee, change, optional
/// payload and PSBT. Nothing is signed or broadcast.
#[utoipa::path(
    post,
    path = "/tx/build",
    tag = "Transactions",
    request_body = BuildTxRequest,
    responses(
        (status = 200, description = "Unsigned transaction and selected inputs"),
        (status = 400, description = "Invalid address or amount/payload invariant violated"),
        (status = 422, description = "Insufficient funds")
    )
)]
pub async fn build_tx(
    State(state): State<AppState>,
    Json(request): Json<BuildTxRequest>,
) -> Result<Json<DataEnvelope<BuiltTransaction>>, ApiError> {
    let BuildTxRequest {
        config,
        use_public_api_fallback,
    } = request;
    let built = state
        .tx_builder()
        .build_tx(config, use_public_api_fallback)
        .await?;
    Ok(Json(DataEnvelope::new(built)))
}

/// Build an atomic two-party trade transaction from committed inputs plus
/// the buyer's own UTXOs.
#[utoipa::path(
    post,
    path = "/tx/build-trade",
    tag = "Transactions",
    request_body = TradeTxConfig,
    responses(
        (status = 200, description = "Unsigned trade transaction with PSBT"),
        (status = 422, description = "Insufficient funds for either leg")
    )
)]
pub async fn build_trade_tx(
    State(state): State<AppState>,
    Json(config): Json<TradeTxConfig>,
) -> Result<Json<DataEnvelope<TradeTransaction>>, ApiError> {
    let built = state.tx_builder().build_trade_tx(config).await?;
    Ok(Json(DataEnvelope::new(built)))
}

/// Derive an m-of-n multisig witness script and address.
#[utoipa::path(
    post,
    path = "/tx/multisig",
    tag = "Transactions",
    request_body = MultisigRequest,
    responses(
        (status = 200, description = "Multisig address and redeem script"),
        (status = 400, description = "Invalid threshold or keys")
    )
)]
pub async fn build_multisig(
    State(state): State<AppState>,
    Json(request): Json<MultisigRequest>,
) -> Result<Json<DataEnvelope<psbt::MultisigSpec>>, ApiError> {
    let net = params_for(
        request
            .network
            .as_deref()
            .unwrap_or(&state.config.network),
    )?;
    let spec = psbt::compute_multisig(request.threshold, &request.pubkeys, net)?;
    Ok(Json(DataEnvelope::new(spec)))
}

/// Finalize a PSBT and extract the fully signed raw transaction.
#[utoipa::path(
    post,
    path = "/tx/finalize",
    tag = "Transactions",
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Fully signed raw transaction"),
        (status = 422, description = "Missing signature data")
    )
)]
pub async fn finalize_psbt(
    State(state): State<AppState>,
    Json(request): Json<FinalizeRequest>,
) -> Result<Json<DataEnvelope<FinalizedTx>>, ApiError> {
    let net = params_for(
        request
            .network
            .as_deref()
            .unwrap_or(&state.config.network),
    )?;
    let rawtx = psbt::finalize(&request.psbt, net)?;
    Ok(Json(DataEnvelope::new(FinalizedTx { rawtx })))
}

/// Broadcast a signed transaction. The node's rejection reason surfaces
/// verbatim; no automatic retry.
#[utoipa::path(
    post,
    path = "/tx/broadcast",
    tag = "Transactions",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Accepted transaction id"),
        (status = 422, description = "Node rejected the transaction")
    )
)]
pub async fn broadcast_tx(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<DataEnvelope<BroadcastResponse>>, ApiError> {
    let txid = state.tx_builder().broadcast(&request.rawtx).await?;
    Ok(Json(DataEnvelope::new(BroadcastResponse { txid })))
}
