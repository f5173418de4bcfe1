use anyhow::Result;
use axum::async_trait;

pub mod mock;
pub mod rest;

pub type TxId = String;

/// Entry point to the ledger network. Only knows how to hand out channel clients.
#[async_trait]
pub trait LedgerGateway: Sync + Send {
    fn name(&self) -> &'static str;

    /// Open a client bound to `channel_id` acting as `user`. The caller must `close` it.
    async fn open_channel(&self, channel_id: &str, user: &str) -> Result<Box<dyn ChannelClient>>;
}

#[async_trait]
pub trait ChannelClient: Sync + Send {
    /// Evaluate a chaincode function without submitting a transaction.
    async fn query(&self, chaincode_id: &str, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>>;

    /// Submit a transaction for ordering. Returns once the ledger accepted it, not
    /// once it is committed.
    async fn invoke(&self, chaincode_id: &str, function: &str, args: &[Vec<u8>]) -> Result<TxId>;

    /// Release the resources held by this client.
    fn close(&self);
}
