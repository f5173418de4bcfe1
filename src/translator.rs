use std::sync::Arc;

use scopeguard::ScopeGuard;
use tracing::instrument;

use crate::{
    address,
    backend::{ChannelClient, LedgerGateway},
    error::ProxyError,
    receipt,
    tx::{CallParams, TxReceipt},
};

/// Channel identity and chaincode names every ledger call is made with.
#[derive(Debug, Clone)]
pub struct LedgerContext {
    pub channel_id: String,
    pub user: String,
    pub evm_chaincode: String,
    pub system_chaincode: String,
}

/// A channel client that is closed when dropped.
type Session = ScopeGuard<Box<dyn ChannelClient>, fn(Box<dyn ChannelClient>)>;

fn release(client: Box<dyn ChannelClient>) {
    client.close();
}

/// Maps the supported `eth_*` methods onto ledger queries and invocations.
///
/// Every method opens its own channel client and closes it before returning,
/// whatever the outcome. No retries.
pub struct EthService {
    ledger: Arc<dyn LedgerGateway>,
    ctx: LedgerContext,
}

impl EthService {
    pub fn new(ledger: Arc<dyn LedgerGateway>, ctx: LedgerContext) -> Self {
        Self { ledger, ctx }
    }

    async fn session(&self) -> Result<Session, ProxyError> {
        let client = self
            .ledger
            .open_channel(&self.ctx.channel_id, &self.ctx.user)
            .await
            .map_err(ProxyError::Connection)?;

        Ok(scopeguard::guard(
            client,
            release as fn(Box<dyn ChannelClient>),
        ))
    }

    /// Returns the code stored at `contract` as the chaincode returns it, without a
    /// "0x" prefix.
    #[instrument(skip(self))]
    pub async fn get_code(&self, contract: &str) -> Result<String, ProxyError> {
        tracing::info!("Received a request for getCode");
        let client = self.session().await?;

        let args = [address::strip_prefix(contract).as_bytes().to_vec()];
        let code = client
            .query(&self.ctx.evm_chaincode, "getCode", &args)
            .await
            .map_err(ProxyError::Query)?;

        Ok(String::from_utf8_lossy(&code).into_owned())
    }

    /// Read-only contract call. The callee address is used as the chaincode function.
    #[instrument(skip_all, fields(to = ?params.to))]
    pub async fn call(&self, params: &CallParams) -> Result<String, ProxyError> {
        tracing::info!("Received a request for call");
        tracing::debug!("Call data: {}", params.data);
        let client = self.session().await?;

        let to = params.to.as_deref().unwrap_or_default();
        let args = [address::strip_prefix(&params.data).as_bytes().to_vec()];
        let value = client
            .query(&self.ctx.evm_chaincode, address::strip_prefix(to), &args)
            .await
            .map_err(ProxyError::Query)?;

        Ok(address::to_display(&value))
    }

    /// Submits a transaction and returns its id without waiting for it to be committed.
    /// A missing `to` requests a contract creation.
    #[instrument(skip_all, fields(to = ?params.to))]
    pub async fn send_transaction(&self, params: &CallParams) -> Result<String, ProxyError> {
        tracing::info!("Received a request for sendTransaction");
        tracing::debug!("Transaction data: {}", params.data);
        let client = self.session().await?;

        let to = match params.callee() {
            Some(to) => to.to_owned(),
            None => address::zero_address_hex(),
        };
        let args = [address::strip_prefix(&params.data).as_bytes().to_vec()];
        let tx_id = client
            .invoke(&self.ctx.evm_chaincode, address::strip_prefix(&to), &args)
            .await
            .map_err(ProxyError::Invoke)?;

        tracing::info!("Submitted transaction {tx_id}");

        Ok(tx_id)
    }

    #[instrument(skip(self))]
    pub async fn get_transaction_receipt(&self, tx_id: &str) -> Result<TxReceipt, ProxyError> {
        tracing::info!("Received a request for getTransactionReceipt");
        let client = self.session().await?;

        let receipt = receipt::fetch_receipt(&**client, &self.ctx, tx_id).await?;
        tracing::debug!("Receipt: {receipt:?}");

        Ok(receipt)
    }

    /// The identity the proxy acts as. Always exactly one account.
    #[instrument(skip(self))]
    pub async fn accounts(&self) -> Result<Vec<String>, ProxyError> {
        tracing::info!("Received a request for accounts");
        let client = self.session().await?;

        let account = client
            .query(&self.ctx.evm_chaincode, "account", &[])
            .await
            .map_err(ProxyError::Query)?;

        Ok(vec![format!(
            "0x{}",
            String::from_utf8_lossy(&account).to_lowercase()
        )])
    }
}
