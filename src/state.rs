// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

use std::sync::Arc;

use crate::attestation::AttestationService;
use crate::audit::AuditLog;
use crate::builder::TxBuilder;
use crate::config::Config;
use crate::explorer::ExplorerClient;
use crate::rpc::RpcClient;

/// Shared application state: one configuration and one client per
/// collaborator, constructed once in `main` and borrowed everywhere else.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rpc: Arc<RpcClient>,
    pub explorer: Arc<ExplorerClient>,
    pub attestation: Arc<AttestationService>,
    pub audit: Arc<AuditLog>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let rpc = Arc::new(RpcClient::new(&config));
        let explorer = Arc::new(ExplorerClient::new(&config));
        let attestation = Arc::new(AttestationService::new(&config));
        let audit = Arc::new(AuditLog::new(config.log_dir.clone()));
        Self {
            config: Arc::new(config),
            rpc,
            explorer,
            attestation,
            audit,
        }
    }

    /// A transaction-building engine borrowing this state's collaborators.
    pub fn tx_builder(&self) -> TxBuilder<'_> {
        TxBuilder::new(
            &self.rpc,
            &self.explorer,
            &self.audit,
            &self.config.network,
        )
    }
}
