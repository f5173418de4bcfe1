use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use axum::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::backend::{ChannelClient, LedgerGateway, TxId};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_sessions() -> usize {
    16
}

fn default_timeout_secs() -> u64 {
    30
}

/// Gateway backed by a ledger REST gateway. At most `max_sessions` channel clients
/// are open at once; further requests wait for one to be closed.
pub struct RestGateway {
    client: reqwest::Client,
    url: Url,
    sessions: Arc<Semaphore>,
}

impl RestGateway {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = Url::parse(&config.url)?;
        if url.cannot_be_a_base() {
            bail!("Gateway url {url} cannot be a base url");
        }

        Ok(Self {
            client,
            url,
            sessions: Arc::new(Semaphore::new(config.max_sessions)),
        })
    }

    fn channel_url(&self, channel_id: &str) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Gateway url cannot be a base url"))?
            .pop_if_empty()
            .extend(["channels", channel_id]);

        Ok(url)
    }
}

#[async_trait]
impl LedgerGateway for RestGateway {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn open_channel(&self, channel_id: &str, user: &str) -> Result<Box<dyn ChannelClient>> {
        if channel_id.is_empty() {
            bail!("Channel id is empty");
        }

        // Waits for a free session instead of failing the request.
        let permit = self
            .sessions
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| anyhow!("Gateway session pool is closed"))?;

        Ok(Box::new(RestChannel {
            client: self.client.clone(),
            url: self.channel_url(channel_id)?,
            user: user.to_owned(),
            permit: Mutex::new(Some(permit)),
        }))
    }
}

#[derive(Serialize)]
struct ChaincodeRequest<'a> {
    chaincode: &'a str,
    function: &'a str,
    args: Vec<String>,
    user: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    payload: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeResponse {
    transaction_id: String,
}

struct RestChannel {
    client: reqwest::Client,
    url: Url,
    user: String,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
}

impl RestChannel {
    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        chaincode_id: &str,
        function: &str,
        args: &[Vec<u8>],
    ) -> Result<T> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Gateway url cannot be a base url"))?
            .push(action);

        let request = ChaincodeRequest {
            chaincode: chaincode_id,
            function,
            args: args.iter().map(|arg| STANDARD.encode(arg)).collect(),
            user: &self.user,
        };

        tracing::debug!("POST {url} {chaincode_id}.{function}");
        let res = self.client.post(url).json(&request).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|err| format!("<unreadable body: {err}>"));
            bail!("Gateway returned {status}: {body}");
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl ChannelClient for RestChannel {
    async fn query(&self, chaincode_id: &str, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>> {
        let res: QueryResponse = self.post("query", chaincode_id, function, args).await?;
        Ok(STANDARD.decode(res.payload)?)
    }

    async fn invoke(&self, chaincode_id: &str, function: &str, args: &[Vec<u8>]) -> Result<TxId> {
        let res: InvokeResponse = self.post("invoke", chaincode_id, function, args).await?;
        Ok(res.transaction_id)
    }

    fn close(&self) {
        if let Ok(mut permit) = self.permit.lock() {
            permit.take();
        }
    }
}
