// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    attestation::{AttestationSource, IpAttestation},
    builder::{
        psbt::MultisigSpec, utxo::UnspentOutput, BuildTxConfig, BuiltTransaction, KeyRef,
        TradeTransaction, TradeTxConfig,
    },
    models::{
        BroadcastRequest, BroadcastResponse, BuildTxRequest, FinalizeRequest, FinalizedTx,
        FundRequest, MultisigRequest, RpcParams,
    },
    state::AppState,
};

pub mod address;
pub mod attestation;
pub mod chain;
pub mod rpc;
pub mod token;
pub mod tx;

pub fn router(state: AppState) -> Router {
    let cors = match &state.config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .expect("CORS_ORIGIN is not a valid header value"),
            )
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let routes = Router::new()
        .route("/address/validate/{address}", get(address::validate_address))
        .route("/address/balance/{address}", get(address::address_balance))
        .route("/address/fund", post(address::fund_address))
        .route("/tx/build", post(tx::build_tx))
        .route("/tx/build-trade", post(tx::build_trade_tx))
        .route("/tx/multisig", post(tx::build_multisig))
        .route("/tx/finalize", post(tx::finalize_psbt))
        .route("/tx/broadcast", post(tx::broadcast_tx))
        .route("/tx/{txid}", get(tx::get_transaction))
        .route("/token/list", get(token::list_tokens))
        .route("/token/{propid}", get(token::token_info))
        .route("/chain/info", get(chain::chain_info))
        .route("/rpc/payload", post(rpc::encode_payload))
        .route("/rpc/{method}", post(rpc::generic_rpc))
        .route("/attestation/ip", get(attestation::check_ip))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        address::validate_address,
        address::address_balance,
        address::fund_address,
        tx::get_transaction,
        tx::build_tx,
        tx::build_trade_tx,
        tx::build_multisig,
        tx::finalize_psbt,
        tx::broadcast_tx,
        token::list_tokens,
        token::token_info,
        chain::chain_info,
        rpc::encode_payload,
        rpc::generic_rpc,
        attestation::check_ip
    ),
    components(
        schemas(
            UnspentOutput,
            KeyRef,
            BuildTxConfig,
            BuildTxRequest,
            TradeTxConfig,
            BuiltTransaction,
            TradeTransaction,
            MultisigRequest,
            MultisigSpec,
            FinalizeRequest,
            FinalizedTx,
            BroadcastRequest,
            BroadcastResponse,
            FundRequest,
            RpcParams,
            IpAttestation,
            AttestationSource
        )
    ),
    tags(
        (name = "Address", description = "Address validation, balances, faucet"),
        (name = "Transactions", description = "Build, finalize and broadcast transactions"),
        (name = "Tokens", description = "Token/property metadata"),
        (name = "Chain", description = "Chain status"),
        (name = "RPC", description = "Payload encoding and allowlisted passthrough"),
        (name = "Attestation", description = "IP/VPN reputation checks")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 0,
            network: "LTCTEST".into(),
            rpc_host: "127.0.0.1".into(),
            rpc_port: 18332,
            rpc_user: "user".into(),
            rpc_pass: "pass".into(),
            rpc_timeout_ms: 100,
            relayer_api_url: None,
            explorer_url: "https://chain.so/api/v2".into(),
            criminal_ip_api_key: None,
            ipinfo_token: None,
            cors_origin: Some("https://www.layerwallet.com".into()),
            log_dir: PathBuf::from("logs"),
        }
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::new(test_config()));
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
