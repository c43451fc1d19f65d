// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Error taxonomy for the relayer core and its HTTP mapping.
//!
//! Every public build/broadcast operation returns a `Result` — no panic or
//! unwrap crosses the API boundary. [`RelayError`] is the domain taxonomy;
//! [`ApiError`] is the axum-facing wrapper that serializes as
//! `{ "error": <message> }` with an appropriate status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Domain errors raised by the transaction-building core and its
/// collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Address fails node or local script-layer validation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Candidate UTXOs cannot cover the target amount plus fee.
    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    /// Node RPC or companion service unreachable or timed out.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Payload missing or invalid for a build that requires one, or the
    /// amount-or-payload invariant is violated.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Threshold/public-key-count mismatch or unparseable key material.
    #[error("invalid multisig parameters: {0}")]
    InvalidMultisigParams(String),

    /// PSBT missing required signature data at finalize time.
    #[error("finalization failed: {0}")]
    Finalization(String),

    /// Node rejected the raw transaction (fee, double-spend, policy).
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// Error reported by the node for a non-broadcast call.
    #[error("node error: {0}")]
    Node(String),

    /// Local transaction/PSBT assembly failed (bad hex, missing input
    /// metadata, value overflow).
    #[error("transaction assembly failed: {0}")]
    Assembly(String),
}

/// API error with status code and JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status = match &err {
            RelayError::InvalidAddress(_)
            | RelayError::MalformedPayload(_)
            | RelayError::InvalidMultisigParams(_) => StatusCode::BAD_REQUEST,
            RelayError::InsufficientFunds { .. }
            | RelayError::Finalization(_)
            | RelayError::BroadcastRejected(_)
            | RelayError::Assembly(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Node(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rust_decimal_macros::dec;

    #[test]
    fn relay_errors_map_to_statuses() {
        let cases: Vec<(RelayError, StatusCode)> = vec![
            (
                RelayError::InvalidAddress("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RelayError::InsufficientFunds {
                    available: dec!(0.1),
                    required: dec!(0.2),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                RelayError::UpstreamUnavailable("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RelayError::BroadcastRejected("66: min relay fee not met".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (RelayError::Node("unknown".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn insufficient_funds_message_carries_amounts() {
        let err = RelayError::InsufficientFunds {
            available: dec!(0.5),
            required: dec!(0.60004),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.5"));
        assert!(msg.contains("0.60004"));
    }
}
