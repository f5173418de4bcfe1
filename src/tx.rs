use serde::{Deserialize, Serialize};

/// Parameters of `eth_call` and `eth_sendTransaction`. Values are hex strings.
/// Only `to` and `data` are forwarded to the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParams {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub gas: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(alias = "input")]
    pub data: String,
    #[serde(default)]
    pub nonce: Option<String>,
}

impl CallParams {
    /// The callee, or `None` for a contract creation.
    pub fn callee(&self) -> Option<&str> {
        self.to.as_deref().filter(|to| !to.is_empty())
    }
}

/// Ethereum-shaped summary of a committed ledger transaction.
///
/// The ledger has no gas accounting, so `gas_used` and `cumulative_gas_used` are
/// always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub block_hash: String,
    pub block_number: String,
    pub contract_address: Option<String>,
    pub gas_used: u64,
    pub cumulative_gas_used: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_call_params_from_ethereum_json() {
        let params: CallParams = serde_json::from_value(json!({
            "from": "0xabc",
            "to": "0xdef",
            "gasPrice": "0x1",
            "input": "0x6060",
        }))
        .unwrap();

        assert_eq!(params.callee(), Some("0xdef"));
        assert_eq!(params.gas_price.as_deref(), Some("0x1"));
        assert_eq!(params.data, "0x6060");
    }

    #[test]
    fn test_call_params_requires_data() {
        let res = serde_json::from_value::<CallParams>(json!({ "to": "0xdef" }));
        assert!(res.is_err());
    }

    #[test]
    fn test_empty_or_null_to_is_creation() {
        let params: CallParams =
            serde_json::from_value(json!({ "to": null, "data": "00" })).unwrap();
        assert_eq!(params.callee(), None);

        let params: CallParams = serde_json::from_value(json!({ "to": "", "data": "00" })).unwrap();
        assert_eq!(params.callee(), None);
    }

    #[test]
    fn test_receipt_json_shape() {
        let receipt = TxReceipt {
            transaction_hash: "abcd".to_owned(),
            block_hash: "ef01".to_owned(),
            block_number: "7".to_owned(),
            contract_address: None,
            gas_used: 0,
            cumulative_gas_used: 0,
        };

        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            json!({
                "transactionHash": "abcd",
                "blockHash": "ef01",
                "blockNumber": "7",
                "contractAddress": null,
                "gasUsed": 0,
                "cumulativeGasUsed": 0,
            })
        );
    }
}
