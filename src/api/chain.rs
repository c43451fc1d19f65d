// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Chain status endpoint.

use axum::{extract::State, Json};
use serde_json::Value;

use crate::{error::ApiError, models::DataEnvelope, state::AppState};

/// Blockchain info straight from the node.
#[utoipa::path(
    get,
    path = "/chain/info",
    tag = "Chain",
    responses((status = 200, description = "Node blockchain info"))
)]
pub async fn chain_info(
    State(state): State<AppState>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    let result = state.rpc.call("getblockchaininfo", &[]).await?;
    Ok(Json(DataEnvelope::new(result)))
}
