// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Token/property metadata endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{error::ApiError, models::DataEnvelope, state::AppState};

/// List all known properties.
#[utoipa::path(
    get,
    path = "/token/list",
    tag = "Tokens",
    responses((status = 200, description = "All properties"))
)]
pub async fn list_tokens(
    State(state): State<AppState>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    let result = state.rpc.call("tl_listproperties", &[]).await?;
    Ok(Json(DataEnvelope::new(result)))
}

/// Metadata of one property.
#[utoipa::path(
    get,
    path = "/token/{propid}",
    tag = "Tokens",
    params(("propid" = u64, Path, description = "Property id")),
    responses((status = 200, description = "Property metadata"))
)]
pub async fn token_info(
    State(state): State<AppState>,
    Path(propid): Path<u64>,
) -> Result<Json<DataEnvelope<Value>>, ApiError> {
    let result = state.rpc.call("tl_getproperty", &[json!(propid)]).await?;
    Ok(Json(DataEnvelope::new(result)))
}
