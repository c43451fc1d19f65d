// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Geographic/VPN attestation endpoint.

use axum::{extract::State, http::HeaderMap, Json};

use crate::{attestation::IpAttestation, error::ApiError, state::AppState};

/// Check the caller's IP reputation.
#[utoipa::path(
    get,
    path = "/attestation/ip",
    tag = "Attestation",
    responses(
        (status = 200, description = "Reputation verdict", body = IpAttestation),
        (status = 400, description = "Client IP could not be determined")
    )
)]
pub async fn check_ip(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<IpAttestation>, ApiError> {
    let ip = extract_client_ip(&headers)
        .ok_or_else(|| ApiError::bad_request("Unable to determine client IP"))?;
    Ok(Json(state.attestation.check_ip(&ip).await))
}

/// Client IP from proxy headers: Cloudflare first, then nginx real-ip,
/// then the first `x-forwarded-for` hop.
fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    for name in ["cf-connecting-ip", "x-real-ip"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn cloudflare_header_wins() {
        let map = headers(&[
            ("cf-connecting-ip", "1.1.1.1"),
            ("x-real-ip", "2.2.2.2"),
            ("x-forwarded-for", "3.3.3.3, 4.4.4.4"),
        ]);
        assert_eq!(extract_client_ip(&map).as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let map = headers(&[("x-forwarded-for", " 3.3.3.3 , 4.4.4.4")]);
        assert_eq!(extract_client_ip(&map).as_deref(), Some("3.3.3.3"));
    }

    #[test]
    fn missing_headers_yield_none() {
        assert!(extract_client_ip(&HeaderMap::new()).is_none());
    }
}
