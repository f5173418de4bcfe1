use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, bail, Result};
use axum::async_trait;
use tokio::sync::Mutex;

use crate::{
    address,
    backend::{ChannelClient, LedgerGateway, TxId},
    records::fixtures::{block, processed_transaction, ActionBuilder},
};

/// Account every mock channel reports.
pub const MOCK_ACCOUNT: &str = "5c1f0e7ab3d24b6f8e9a0c4d2e6f7a8b9c0d1e2f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Invoke,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCall {
    pub kind: CallKind,
    pub channel_id: String,
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<Vec<u8>>,
}

#[cfg(test)]
#[derive(Clone)]
enum Reply {
    Payload(Vec<u8>),
    Failure(String),
}

/// A transaction accepted by `invoke`, committed immediately in its own block.
struct MockTx {
    function: String,
    args: Vec<Vec<u8>>,
    created: Option<String>,
    block_number: u64,
}

#[derive(Default)]
struct World {
    txs: HashMap<TxId, MockTx>,
    code: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
struct Inner {
    #[cfg(test)]
    replies: Mutex<HashMap<(String, String), Reply>>,
    #[cfg(test)]
    calls: Mutex<Vec<LedgerCall>>,
    world: Mutex<World>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    refuse_channels: AtomicBool,
    tx_counter: AtomicU64,
}

/// In-memory ledger.
///
/// Invocations are committed at once: a creation (callee is the zero address)
/// deploys its call data as the code of a fresh contract, `getCode` returns that
/// code, `account` answers with [`MOCK_ACCOUNT`], any other query echoes its first
/// argument, and the system chaincode lookups return records synthesized from the
/// stored transaction. Tests can override single replies and inspect the call log.
#[derive(Clone, Default)]
pub struct MockLedger {
    inner: Arc<Inner>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn set_reply(&self, chaincode_id: &str, function: &str, payload: impl Into<Vec<u8>>) {
        self.inner.replies.lock().await.insert(
            (chaincode_id.to_owned(), function.to_owned()),
            Reply::Payload(payload.into()),
        );
    }

    #[cfg(test)]
    pub async fn set_failure(&self, chaincode_id: &str, function: &str, message: &str) {
        self.inner.replies.lock().await.insert(
            (chaincode_id.to_owned(), function.to_owned()),
            Reply::Failure(message.to_owned()),
        );
    }

    /// Make every subsequent `open_channel` fail.
    #[cfg(test)]
    pub fn refuse_channels(&self, refuse: bool) {
        self.inner.refuse_channels.store(refuse, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub async fn calls(&self) -> Vec<LedgerCall> {
        self.inner.calls.lock().await.clone()
    }

    #[cfg(test)]
    pub fn opened_sessions(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Sessions opened but not yet closed.
    #[cfg(test)]
    pub fn open_sessions(&self) -> usize {
        self.opened_sessions() - self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn open_channel(&self, channel_id: &str, user: &str) -> Result<Box<dyn ChannelClient>> {
        if self.inner.refuse_channels.load(Ordering::SeqCst) {
            bail!("channel {channel_id} is unavailable for {user}");
        }

        self.inner.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockChannel {
            inner: self.inner.clone(),
            channel_id: channel_id.to_owned(),
        }))
    }
}

struct MockChannel {
    inner: Arc<Inner>,
    channel_id: String,
}

impl MockChannel {
    async fn record(&self, kind: CallKind, chaincode_id: &str, function: &str, args: &[Vec<u8>]) {
        let call = LedgerCall {
            kind,
            channel_id: self.channel_id.clone(),
            chaincode_id: chaincode_id.to_owned(),
            function: function.to_owned(),
            args: args.to_vec(),
        };
        tracing::debug!("Mock ledger call: {call:?}");

        #[cfg(test)]
        self.inner.calls.lock().await.push(call);
    }

    #[cfg(test)]
    async fn reply(&self, chaincode_id: &str, function: &str) -> Option<Reply> {
        self.inner
            .replies
            .lock()
            .await
            .get(&(chaincode_id.to_owned(), function.to_owned()))
            .cloned()
    }

    /// Answers a query from the committed transactions.
    async fn answer(&self, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        let world = self.inner.world.lock().await;
        let arg = |i: usize| -> Result<String> {
            args.get(i)
                .map(|arg| String::from_utf8_lossy(arg).into_owned())
                .ok_or_else(|| anyhow!("{function} expects argument {i}"))
        };

        let payload = match function {
            "account" => MOCK_ACCOUNT.as_bytes().to_vec(),
            "getCode" => world.code.get(&arg(0)?).cloned().unwrap_or_default(),
            "GetTransactionByID" => {
                let tx = lookup(&world, &arg(1)?)?;
                let mut tx_args = vec![tx.function.as_bytes().to_vec()];
                tx_args.extend(tx.args.iter().cloned());

                let action = ActionBuilder {
                    args: tx_args,
                    response_payload: tx.created.clone().unwrap_or_default().into_bytes(),
                    response_message: vec![],
                    endorsed: true,
                    extension: true,
                };
                processed_transaction(vec![action.build()])
            }
            "GetBlockByTxID" => block(lookup(&world, &arg(1)?)?.block_number),
            _ => args.first().cloned().unwrap_or_default(),
        };

        Ok(payload)
    }
}

fn lookup<'a>(world: &'a World, tx_id: &str) -> Result<&'a MockTx> {
    world
        .txs
        .get(tx_id)
        .ok_or_else(|| anyhow!("transaction {tx_id} not found"))
}

#[async_trait]
impl ChannelClient for MockChannel {
    async fn query(&self, chaincode_id: &str, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        self.record(CallKind::Query, chaincode_id, function, args)
            .await;

        #[cfg(test)]
        match self.reply(chaincode_id, function).await {
            Some(Reply::Payload(payload)) => return Ok(payload),
            Some(Reply::Failure(message)) => return Err(anyhow!(message)),
            None => {}
        }

        self.answer(function, args).await
    }

    async fn invoke(&self, chaincode_id: &str, function: &str, args: &[Vec<u8>]) -> Result<TxId> {
        self.record(CallKind::Invoke, chaincode_id, function, args)
            .await;

        #[cfg(test)]
        if let Some(Reply::Failure(message)) = self.reply(chaincode_id, function).await {
            bail!(message);
        }

        let n = self.inner.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_id = format!("{n:064x}");

        let mut world = self.inner.world.lock().await;
        let created = if function == address::zero_address_hex() {
            let contract = format!("{n:040x}");
            let code = args.first().cloned().unwrap_or_default();
            world.code.insert(contract.clone(), code);
            Some(contract)
        } else {
            None
        };
        world.txs.insert(
            tx_id.clone(),
            MockTx {
                function: function.to_owned(),
                args: args.to_vec(),
                created,
                block_number: n,
            },
        );

        Ok(tx_id)
    }

    fn close(&self) {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn channel(ledger: &MockLedger) -> Box<dyn ChannelClient> {
        ledger.open_channel("channel1", "User1").await.unwrap()
    }

    #[tokio::test]
    async fn test_creation_deploys_code() {
        let ledger = MockLedger::new();
        let client = channel(&ledger).await;

        client
            .invoke("evmscc", &address::zero_address_hex(), &[b"6060".to_vec()])
            .await
            .unwrap();

        let contract = format!("{:040x}", 1);
        let code = client
            .query("evmscc", "getCode", &[contract.into_bytes()])
            .await
            .unwrap();
        assert_eq!(code, b"6060");

        let unknown = client
            .query("evmscc", "getCode", &[b"ff".to_vec()])
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let ledger = MockLedger::new();
        let client = channel(&ledger).await;

        let res = client
            .query(
                "qscc",
                "GetTransactionByID",
                &[b"channel1".to_vec(), b"missing".to_vec()],
            )
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_account_and_echo() {
        let ledger = MockLedger::new();
        let client = channel(&ledger).await;

        let account = client.query("evmscc", "account", &[]).await.unwrap();
        assert_eq!(account, MOCK_ACCOUNT.as_bytes());

        let echoed = client
            .query("evmscc", "1f2e", &[b"abcd".to_vec()])
            .await
            .unwrap();
        assert_eq!(echoed, b"abcd");

        client.close();
        assert_eq!(ledger.open_sessions(), 0);
    }
}
