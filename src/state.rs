use std::sync::Arc;

use anyhow::Result;

use crate::{
    backend::LedgerGateway,
    config::{Config, LedgerKind},
    translator::EthService,
};

pub struct AppState {
    pub config: Config,
    pub service: EthService,
    pub ledger_name: &'static str,
}

impl AppState {
    pub fn init(config: Config) -> Result<Self> {
        let ledger: Arc<dyn LedgerGateway> = match config.ledger.clone() {
            LedgerKind::Mock => Arc::new(crate::backend::mock::MockLedger::new()),
            LedgerKind::Rest(rest) => Arc::new(crate::backend::rest::RestGateway::new(rest)?),
        };
        let ledger_name = ledger.name();

        tracing::info!(
            "Using {ledger_name} ledger gateway on channel {}",
            config.server.channel_id
        );

        let service = EthService::new(ledger, config.ledger_context());

        Ok(Self {
            config,
            service,
            ledger_name,
        })
    }
}
