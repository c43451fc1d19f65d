// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Block-explorer client used as the UTXO fallback source.
//!
//! Queried when the node does not track an address locally. The explorer
//! reports values in satoshis; the UTXO adapter converts them to coin units.

use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::error::RelayError;

/// Explorer request timeout. The explorer is a third-party service and can
/// be slower than the local node.
const EXPLORER_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the explorer's unspent-output listing.
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
    network: String,
}

/// One unspent output as reported by the explorer. Values are satoshis.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerUnspent {
    pub txid: String,
    /// Satoshi value, serialized as a string by the explorer.
    pub value: String,
    pub confirmations: u64,
    pub script_hex: String,
    pub output_no: u32,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    data: Option<ExplorerData>,
}

#[derive(Debug, Deserialize)]
struct ExplorerData {
    txs: Vec<ExplorerUnspent>,
}

impl ExplorerClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.explorer_url.trim_end_matches('/').to_string(),
            network: config.network.clone(),
        }
    }

    /// Fetch the unspent outputs for an address. No confirmation filtering
    /// happens here — the adapter applies the caller's window.
    pub async fn unspent_outputs(
        &self,
        address: &str,
    ) -> Result<Vec<ExplorerUnspent>, RelayError> {
        let url = format!(
            "{}/get_tx_unspent/{}/{address}",
            self.base_url, self.network
        );

        let response: ExplorerResponse = self
            .http
            .get(&url)
            .timeout(EXPLORER_TIMEOUT)
            .send()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable(format!("explorer: {e}")))?
            .json()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable(format!("explorer: {e}")))?;

        if response.status != "success" {
            return Err(RelayError::UpstreamUnavailable(format!(
                "explorer: error fetching UTXOs for {address}"
            )));
        }
        Ok(response.data.map(|d| d.txs).unwrap_or_default())
    }
}
