// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! # API Data Models
//!
//! Request and response structures for the REST API. Build configurations
//! and results live with the engine in `builder`; this module holds the
//! remaining wire shapes and the `{ "data": ... }` success envelope that
//! pairs with `ApiError`'s `{ "error": ... }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::builder::BuildTxConfig;

/// Success envelope: every endpoint resolves to `{data}` or `{error}`.
#[derive(Debug, Clone, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Body of `POST /tx/build`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildTxRequest {
    #[serde(flatten)]
    pub config: BuildTxConfig,
    /// Route node calls through the public relayer API instead of the
    /// locally configured node.
    #[serde(default)]
    pub use_public_api_fallback: bool,
}

/// Body of `POST /tx/multisig`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MultisigRequest {
    pub threshold: usize,
    pub pubkeys: Vec<String>,
    #[serde(default)]
    pub network: Option<String>,
}

/// Body of `POST /tx/finalize`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FinalizeRequest {
    /// PSBT, hex or base64.
    pub psbt: String,
    #[serde(default)]
    pub network: Option<String>,
}

/// Result of `POST /tx/finalize`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinalizedTx {
    pub rawtx: String,
}

/// Body of `POST /tx/broadcast`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    pub rawtx: String,
}

/// Result of `POST /tx/broadcast`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BroadcastResponse {
    pub txid: String,
}

/// Body of `POST /address/fund`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FundRequest {
    pub address: String,
}

/// Positional parameters of a generic RPC passthrough call.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RpcParams {
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub params: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_request_flattens_config() {
        let raw = r#"{
            "fromKeyPair": { "address": "tltc1qfrom" },
            "toKeyPair": { "address": "tltc1qto", "pubkey": "02ab" },
            "amount": 0.25,
            "addPsbt": true,
            "usePublicApiFallback": true
        }"#;
        let request: BuildTxRequest = serde_json::from_str(raw).unwrap();
        assert!(request.use_public_api_fallback);
        assert!(request.config.add_psbt);
        assert_eq!(request.config.to_key_pair.pubkey.as_deref(), Some("02ab"));
        assert!(request.config.payload.is_none());
    }

    #[test]
    fn rpc_params_default_to_empty() {
        let params: RpcParams = serde_json::from_str("{}").unwrap();
        assert!(params.params.is_empty());
    }
}
