// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup into a
//! [`Config`] value and shared through `AppState` — there are no ambient
//! globals.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `NETWORK` | Network name (`LTC` or `LTCTEST`) | `LTCTEST` |
//! | `RPC_HOST` | Node RPC host | `127.0.0.1` |
//! | `RPC_PORT` | Node RPC port | `18332` |
//! | `RPC_USER` | Node RPC username | Required |
//! | `RPC_PASS` | Node RPC password | Required |
//! | `RPC_TIMEOUT_MS` | Per-call RPC timeout | `3000` |
//! | `RELAYER_API_URL` | Public relayer API for api-mode routing | Optional |
//! | `EXPLORER_URL` | Explorer base URL for the UTXO fallback | `https://chain.so/api/v2` |
//! | `CRIMINAL_IP_API_KEY` | CriminalIP key for IP attestation | Optional |
//! | `IPINFO_TOKEN` | ipinfo token for the attestation fallback | Optional |
//! | `CORS_ORIGIN` | Allowed CORS origin | permissive when unset |
//! | `LOG_DIR` | Directory for txid/pubkey audit logs | `logs` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;

/// Runtime configuration, read from the environment once in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Network name, resolved against `networks::params_for`.
    pub network: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub rpc_user: String,
    pub rpc_pass: String,
    pub rpc_timeout_ms: u64,
    pub relayer_api_url: Option<String>,
    pub explorer_url: String,
    pub criminal_ip_api_key: Option<String>,
    pub ipinfo_token: Option<String>,
    pub cors_origin: Option<String>,
    pub log_dir: PathBuf,
}

impl Config {
    /// Load the configuration, failing with a description of the first
    /// missing or malformed variable.
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8000)?,
            network: env::var("NETWORK").unwrap_or_else(|_| "LTCTEST".to_string()),
            rpc_host: env::var("RPC_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            rpc_port: parse_var("RPC_PORT", 18332)?,
            rpc_user: env::var("RPC_USER").map_err(|_| "RPC_USER is required".to_string())?,
            rpc_pass: env::var("RPC_PASS").map_err(|_| "RPC_PASS is required".to_string())?,
            rpc_timeout_ms: parse_var("RPC_TIMEOUT_MS", 3000)?,
            relayer_api_url: env::var("RELAYER_API_URL").ok().filter(|v| !v.is_empty()),
            explorer_url: env::var("EXPLORER_URL")
                .unwrap_or_else(|_| "https://chain.so/api/v2".to_string()),
            criminal_ip_api_key: env::var("CRIMINAL_IP_API_KEY").ok().filter(|v| !v.is_empty()),
            ipinfo_token: env::var("IPINFO_TOKEN").ok().filter(|v| !v.is_empty()),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            log_dir: PathBuf::from(env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string())),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{name} is not a valid value: {raw}")),
        Err(_) => Ok(default),
    }
}
