// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use tradelayer_relay::{api, config::Config, state::AppState};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("failed to parse bind address");

    let state = AppState::new(config);

    // The relayer is useless without its node: probe before serving.
    match state.rpc.probe().await {
        Ok(info) => tracing::info!(
            network = %state.config.network,
            blocks = info.get("blocks").and_then(|b| b.as_u64()),
            "connected to node"
        ),
        Err(e) => {
            tracing::error!(error = %e, "RPC connection failed");
            std::process::exit(1);
        }
    }

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    tracing::info!("relayer listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
