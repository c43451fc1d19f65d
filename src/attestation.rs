// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! IP reputation checks backing the faucet/compliance attestation flow.
//!
//! Sequential provider chain: CriminalIP when a key is configured, ipinfo
//! as fallback. An IP is blocked when any provider flags VPN/proxy/darkweb
//! usage or a banned origin country. When no provider succeeds the result
//! says so instead of erroring — the caller decides what an unknown IP
//! means.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::config::Config;

/// Reputation providers have generous timeouts; they are slow third
/// parties.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// Countries whose IPs are refused attestation.
const BANNED_COUNTRIES: [&str; 6] = ["US", "KP", "SY", "SD", "RU", "IR"];

/// Which provider produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttestationSource {
    Criminalip,
    Ipinfo,
    Unknown,
}

/// Outcome of an IP reputation check.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpAttestation {
    pub success: bool,
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_vpn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_proxy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_darkweb: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_anonymous_vpn: Option<bool>,
    pub is_blocked: bool,
    pub source: AttestationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// IP reputation service.
pub struct AttestationService {
    http: reqwest::Client,
    criminal_ip_api_key: Option<String>,
    ipinfo_token: Option<String>,
}

impl AttestationService {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            criminal_ip_api_key: config.criminal_ip_api_key.clone(),
            ipinfo_token: config.ipinfo_token.clone(),
        }
    }

    /// Run the provider chain for one IP.
    pub async fn check_ip(&self, ip: &str) -> IpAttestation {
        if let Some(key) = &self.criminal_ip_api_key {
            match self.check_criminal_ip(ip, key).await {
                Ok(result) => return result,
                Err(e) => {
                    tracing::warn!(ip, error = %e, "CriminalIP lookup failed, falling back");
                }
            }
        }

        if let Some(token) = &self.ipinfo_token {
            match self.check_ipinfo(ip, token).await {
                Ok(result) => return result,
                Err(e) => {
                    tracing::warn!(ip, error = %e, "ipinfo lookup failed");
                }
            }
        }

        IpAttestation {
            success: false,
            ip: ip.to_string(),
            country_code: None,
            is_vpn: None,
            is_proxy: None,
            is_darkweb: None,
            is_anonymous_vpn: None,
            is_blocked: false,
            source: AttestationSource::Unknown,
            message: Some("No IP reputation provider succeeded".into()),
            error: Some(
                "Both primary and fallback IP reputation APIs failed or are not configured."
                    .into(),
            ),
        }
    }

    async fn check_criminal_ip(&self, ip: &str, key: &str) -> Result<IpAttestation, String> {
        let url = format!("https://api.criminalip.io/v1/asset/ip/report?ip={ip}");
        let data: Value = self
            .http
            .get(&url)
            .header("x-api-key", key)
            .timeout(PROVIDER_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        Ok(evaluate_criminal_ip(ip, &data))
    }

    async fn check_ipinfo(&self, ip: &str, token: &str) -> Result<IpAttestation, String> {
        let url = format!("https://ipinfo.io/{ip}?token={token}");
        let data: Value = self
            .http
            .get(&url)
            .timeout(PROVIDER_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        Ok(evaluate_ipinfo(ip, &data))
    }
}

fn is_banned_country(code: &str) -> bool {
    BANNED_COUNTRIES.contains(&code.to_ascii_uppercase().as_str())
}

fn evaluate_criminal_ip(ip: &str, data: &Value) -> IpAttestation {
    let issues = &data["issues"];
    let whois_entries = data["whois"]["data"].as_array().cloned().unwrap_or_default();

    let country_code = whois_entries
        .first()
        .and_then(|entry| {
            entry["org_country_code"]
                .as_str()
                .or_else(|| entry["country_code"].as_str())
        })
        .unwrap_or("Unknown")
        .to_string();

    let from_banned_country = whois_entries.iter().any(|entry| {
        entry["org_country_code"]
            .as_str()
            .or_else(|| entry["country_code"].as_str())
            .map(is_banned_country)
            .unwrap_or(false)
    });

    let is_vpn = issues["is_vpn"].as_bool().unwrap_or(false);
    let is_proxy = issues["is_proxy"].as_bool().unwrap_or(false);
    let is_darkweb = issues["is_darkweb"].as_bool().unwrap_or(false);
    let is_anonymous_vpn = issues["is_anonymous_vpn"].as_bool().unwrap_or(false);

    let is_blocked = is_vpn || is_proxy || is_darkweb || is_anonymous_vpn || from_banned_country;
    let message = if is_blocked {
        "Suspicious IP detected or originating from a banned country (CriminalIP)."
    } else {
        "IP is clean and trusted (CriminalIP)."
    };

    IpAttestation {
        success: true,
        ip: ip.to_string(),
        country_code: Some(country_code),
        is_vpn: Some(is_vpn),
        is_proxy: Some(is_proxy),
        is_darkweb: Some(is_darkweb),
        is_anonymous_vpn: Some(is_anonymous_vpn),
        is_blocked,
        source: AttestationSource::Criminalip,
        message: Some(message.into()),
        error: None,
    }
}

fn evaluate_ipinfo(ip: &str, data: &Value) -> IpAttestation {
    let resolved_ip = data["ip"].as_str().unwrap_or(ip).to_string();
    let country = data["country"].as_str().unwrap_or("Unknown").to_string();
    let privacy = &data["privacy"];

    let is_vpn = privacy["vpn"].as_bool().unwrap_or(false);
    let is_proxy = privacy["proxy"].as_bool().unwrap_or(false);
    let is_blocked = is_vpn || is_banned_country(&country);

    let message = if is_blocked {
        "Fallback: Suspicious IP (VPN) or banned country (ipinfo)."
    } else {
        "Fallback API: IP is clean and trusted (ipinfo)."
    };

    IpAttestation {
        success: true,
        ip: resolved_ip,
        country_code: Some(country),
        is_vpn: Some(is_vpn),
        is_proxy: Some(is_proxy),
        is_darkweb: Some(false),
        is_anonymous_vpn: Some(false),
        is_blocked,
        source: AttestationSource::Ipinfo,
        message: Some(message.into()),
        error: None,
    }
}
