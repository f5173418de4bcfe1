use std::fmt::Display;

/// Errors returned by the translation layer. None of them are retried here.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Could not obtain a channel client: {0:#}")]
    Connection(anyhow::Error),
    #[error("Ledger query failed: {0:#}")]
    Query(anyhow::Error),
    #[error("Ledger invoke failed: {0:#}")]
    Invoke(anyhow::Error),
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
    #[error("Missing {0}")]
    MissingData(&'static str),
}

impl ProxyError {
    pub fn decode(what: &'static str, err: impl Display) -> Self {
        Self::Decode {
            what,
            reason: err.to_string(),
        }
    }

    /// JSON-RPC error code reported to the caller.
    pub fn code(&self) -> i64 {
        match self {
            Self::Connection(_) => -32000,
            Self::Query(_) => -32001,
            Self::Invoke(_) => -32002,
            Self::Decode { .. } => -32003,
            Self::MissingData(_) => -32004,
        }
    }
}
