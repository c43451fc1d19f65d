// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! JSON-RPC client for the TradeLayer-enabled Litecoin node.
//!
//! Thin transport: every call carries an explicit timeout and resolves to a
//! value or a [`RelayError`] — a timed-out call never hangs the build
//! pipeline. The underlying `reqwest` client pools connections, so multiple
//! build/broadcast requests can be in flight concurrently.
//!
//! [`RpcClient::smart_call`] optionally routes through a public relayer API
//! (`{api}/rpc/{method}`) instead of the node, mirroring the wallet-facing
//! fallback used when no direct node credentials are available.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::RelayError;

/// Node JSON-RPC client with optional public-API routing.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
    api_url: Option<String>,
    timeout: Duration,
}

/// Wire shape of a JSON-RPC 1.0 response.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[allow(dead_code)]
    code: Option<i64>,
    message: String,
}

/// `{data}` / `{error}` envelope returned by a public relayer API.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    data: Option<Value>,
    error: Option<String>,
}

/// Subset of `validateaddress` output the relayer cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInfo {
    #[serde(default)]
    pub isvalid: bool,
    #[serde(default)]
    pub pubkey: Option<String>,
    #[serde(default)]
    pub ismine: Option<bool>,
    #[serde(default)]
    pub iswatchonly: Option<bool>,
}

impl RpcClient {
    /// Build a client from the runtime configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("http://{}:{}", config.rpc_host, config.rpc_port),
            username: config.rpc_user.clone(),
            password: config.rpc_pass.clone(),
            api_url: config.relayer_api_url.clone(),
            timeout: Duration::from_millis(config.rpc_timeout_ms),
        }
    }

    /// Call the node directly.
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RelayError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "tradelayer-relay",
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::UpstreamUnavailable(format!("rpc {method}: timed out"))
                } else {
                    RelayError::UpstreamUnavailable(format!("rpc {method}: {e}"))
                }
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RelayError::UpstreamUnavailable(
                "rpc: unauthorized (check RPC_USER/RPC_PASS)".into(),
            ));
        }

        let decoded: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable(format!("rpc {method}: {e}")))?;

        if let Some(err) = decoded.error {
            return Err(RelayError::Node(err.message));
        }
        decoded
            .result
            .ok_or_else(|| RelayError::Node(format!("rpc {method}: empty response")))
    }

    /// Route a call through the public relayer API instead of the node.
    pub async fn call_via_api(&self, method: &str, params: &[Value]) -> Result<Value, RelayError> {
        let base = self.api_url.as_deref().ok_or_else(|| {
            RelayError::UpstreamUnavailable("relayer API url not configured".into())
        })?;
        let url = format!("{}/rpc/{method}", base.trim_end_matches('/'));

        let envelope: ApiEnvelope = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&json!({ "params": params }))
            .send()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable(format!("api {method}: {e}")))?
            .json()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable(format!("api {method}: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(RelayError::Node(err));
        }
        envelope
            .data
            .ok_or_else(|| RelayError::Node(format!("api {method}: empty response")))
    }

    /// Call the node, or the public API when `api_mode` is requested.
    pub async fn smart_call(
        &self,
        method: &str,
        params: &[Value],
        api_mode: bool,
    ) -> Result<Value, RelayError> {
        if api_mode {
            self.call_via_api(method, params).await
        } else {
            self.call(method, params).await
        }
    }

    /// `validateaddress`, decoded into [`AddressInfo`].
    pub async fn validate_address(
        &self,
        address: &str,
        api_mode: bool,
    ) -> Result<AddressInfo, RelayError> {
        let value = self
            .smart_call("validateaddress", &[json!(address)], api_mode)
            .await?;
        serde_json::from_value(value)
            .map_err(|e| RelayError::Node(format!("validateaddress: {e}")))
    }

    /// `listunspent` for a single address over a confirmation window.
    pub async fn list_unspent(
        &self,
        min_conf: u64,
        max_conf: u64,
        address: &str,
    ) -> Result<Value, RelayError> {
        self.call(
            "listunspent",
            &[json!(min_conf), json!(max_conf), json!([address])],
        )
        .await
    }

    /// Liveness probe used at startup: the relayer refuses to start without
    /// a reachable node.
    pub async fn probe(&self) -> Result<Value, RelayError> {
        self.call("getblockchaininfo", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success_response() {
        let raw = r#"{"result": {"blocks": 123}, "error": null, "id": "x"}"#;
        let decoded: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert!(decoded.error.is_none());
        assert_eq!(decoded.result.unwrap()["blocks"], 123);
    }

    #[test]
    fn decodes_error_response() {
        let raw = r#"{"result": null, "error": {"code": -5, "message": "Invalid address"}}"#;
        let decoded: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(decoded.error.unwrap().message, "Invalid address");
    }

    #[test]
    fn decodes_address_info_with_missing_fields() {
        let raw = r#"{"isvalid": true}"#;
        let info: AddressInfo = serde_json::from_str(raw).unwrap();
        assert!(info.isvalid);
        assert!(info.pubkey.is_none());
    }

    #[test]
    fn decodes_api_envelope_error() {
        let raw = r#"{"error": "listunspent Error: unknown"}"#;
        let envelope: ApiEnvelope = serde_json::from_str(raw).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.as_deref(), Some("listunspent Error: unknown"));
    }
}
