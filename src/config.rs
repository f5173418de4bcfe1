use anyhow::{bail, Result};
use serde::{de::DeserializeOwned, Deserialize};

use crate::translator::LedgerContext;

#[derive(Debug, Clone)]
pub enum LedgerKind {
    Mock,
    Rest(crate::backend::rest::Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_channel_id")]
    pub channel_id: String,
    #[serde(default = "default_user")]
    pub fabric_user: String,
    #[serde(default = "default_evm_chaincode")]
    pub evm_chaincode: String,
    #[serde(default = "default_system_chaincode")]
    pub system_chaincode: String,
    /// Comma-separated list of allowed origins. Any origin is allowed when unset.
    pub cors_origins: Option<String>,
}

fn default_port() -> u16 {
    5000
}

fn default_channel_id() -> String {
    "channel1".to_owned()
}

fn default_user() -> String {
    "User1".to_owned()
}

fn default_evm_chaincode() -> String {
    "evmscc".to_owned()
}

fn default_system_chaincode() -> String {
    "qscc".to_owned()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ledger: LedgerKind,
}

impl Config {
    pub fn init() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: Vec<(String, String)>) -> Result<Self> {
        let ledger_name = vars
            .iter()
            .find(|(key, _)| key == "LEDGER")
            .map(|(_, value)| value.as_str())
            .unwrap_or("rest");

        let ledger = match ledger_name {
            "mock" => LedgerKind::Mock,
            "rest" => LedgerKind::Rest(prefixed_config("REST", vars.clone())?),
            _ => bail!("Unknown ledger gateway: {ledger_name}"),
        };

        Ok(Config {
            server: envy::from_iter(vars)?,
            ledger,
        })
    }

    pub fn ledger_context(&self) -> LedgerContext {
        LedgerContext {
            channel_id: self.server.channel_id.clone(),
            user: self.server.fabric_user.clone(),
            evm_chaincode: self.server.evm_chaincode.clone(),
            system_chaincode: self.server.system_chaincode.clone(),
        }
    }

    pub fn cors_origins(&self) -> Option<Vec<String>> {
        self.server.cors_origins.as_ref().map(|origins| {
            origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect()
        })
    }
}

fn prefixed_config<T: DeserializeOwned>(prefix: &str, vars: Vec<(String, String)>) -> Result<T> {
    Ok(envy::prefixed(format!("{prefix}_")).from_iter(vars)?)
}
