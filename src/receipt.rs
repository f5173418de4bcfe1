use prost::Message;

use crate::{
    address,
    backend::ChannelClient,
    error::ProxyError,
    records::{
        Block, ChaincodeAction, ChaincodeActionPayload, ChaincodeInvocationSpec,
        ChaincodeProposalPayload, Payload, ProcessedTransaction, ProposalResponsePayload,
        Transaction, TransactionAction,
    },
    translator::LedgerContext,
    tx::TxReceipt,
};

const GET_TRANSACTION_BY_ID: &str = "GetTransactionByID";
const GET_BLOCK_BY_TX_ID: &str = "GetBlockByTxID";

/// Fetches the transaction and its block from the system chaincode and rebuilds a
/// receipt from them.
///
/// The transaction may not be committed yet right after `eth_sendTransaction`; in
/// that case the query fails and the caller is expected to poll.
pub async fn fetch_receipt(
    client: &dyn ChannelClient,
    ctx: &LedgerContext,
    tx_id: &str,
) -> Result<TxReceipt, ProxyError> {
    let args = [ctx.channel_id.as_bytes().to_vec(), tx_id.as_bytes().to_vec()];

    let processed_tx = client
        .query(&ctx.system_chaincode, GET_TRANSACTION_BY_ID, &args)
        .await
        .map_err(ProxyError::Query)?;
    let processed_tx: ProcessedTransaction = decode("processed transaction", &processed_tx)?;

    let block = client
        .query(&ctx.system_chaincode, GET_BLOCK_BY_TX_ID, &args)
        .await
        .map_err(ProxyError::Query)?;
    let block: Block = decode("block", &block)?;

    build_receipt(tx_id, &processed_tx, &block)
}

pub fn build_receipt(
    tx_id: &str,
    processed_tx: &ProcessedTransaction,
    block: &Block,
) -> Result<TxReceipt, ProxyError> {
    let header = block
        .header
        .as_ref()
        .ok_or(ProxyError::MissingData("block header"))?;

    let envelope = processed_tx
        .transaction_envelope
        .as_ref()
        .ok_or(ProxyError::MissingData("transaction envelope"))?;
    let payload: Payload = decode("payload", &envelope.payload)?;
    let transaction: Transaction = decode("transaction", &payload.data)?;
    let action = single_action(&transaction)?;

    let (proposal, chaincode_action) = chaincode_payloads(action)?;

    let invocation: ChaincodeInvocationSpec =
        decode("chaincode invocation spec", &proposal.input)?;
    let args = invocation
        .chaincode_spec
        .and_then(|spec| spec.input)
        .map(|input| input.args)
        .unwrap_or_default();
    let callee = args
        .first()
        .ok_or(ProxyError::MissingData("invocation arguments"))?;
    let callee = hex::decode(callee).map_err(|err| ProxyError::decode("callee address", err))?;

    // A creation reports whatever the chaincode answered, even nothing.
    let contract_address = if address::is_zero(&callee) {
        let created = chaincode_action
            .response
            .map(|response| response.payload)
            .unwrap_or_default();

        Some(String::from_utf8_lossy(&created).into_owned())
    } else {
        None
    };

    Ok(TxReceipt {
        transaction_hash: tx_id.to_owned(),
        block_hash: hex::encode(header.hash()),
        block_number: header.number.to_string(),
        contract_address,
        gas_used: 0,
        cumulative_gas_used: 0,
    })
}

/// Transactions submitted through the proxy carry exactly one action.
fn single_action(transaction: &Transaction) -> Result<&TransactionAction, ProxyError> {
    match transaction.actions.as_slice() {
        [] => Err(ProxyError::MissingData("transaction actions")),
        [action] => Ok(action),
        actions => Err(ProxyError::decode(
            "transaction actions",
            format!("expected exactly one action, found {}", actions.len()),
        )),
    }
}

fn chaincode_payloads(
    action: &TransactionAction,
) -> Result<(ChaincodeProposalPayload, ChaincodeAction), ProxyError> {
    let action_payload: ChaincodeActionPayload = decode("chaincode action payload", &action.payload)?;

    let endorsed = action_payload
        .action
        .as_ref()
        .filter(|endorsed| !endorsed.proposal_response_payload.is_empty())
        .ok_or(ProxyError::MissingData("proposal response payload"))?;

    let proposal: ChaincodeProposalPayload = decode(
        "chaincode proposal payload",
        &action_payload.chaincode_proposal_payload,
    )?;
    let response_payload: ProposalResponsePayload =
        decode("proposal response payload", &endorsed.proposal_response_payload)?;

    if response_payload.extension.is_empty() {
        return Err(ProxyError::MissingData("proposal response extension"));
    }

    let chaincode_action: ChaincodeAction = decode("chaincode action", &response_payload.extension)?;

    Ok((proposal, chaincode_action))
}

fn decode<M: Message + Default>(what: &'static str, bytes: &[u8]) -> Result<M, ProxyError> {
    M::decode(bytes).map_err(|err| ProxyError::decode(what, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures::*;

    fn receipt(actions: Vec<TransactionAction>, number: u64) -> Result<TxReceipt, ProxyError> {
        let processed_tx = ProcessedTransaction::decode(processed_transaction(actions).as_slice()).unwrap();
        let block = Block::decode(block(number).as_slice()).unwrap();

        build_receipt("deadbeef", &processed_tx, &block)
    }

    #[test]
    fn test_creation_receipt() {
        let receipt = receipt(vec![ActionBuilder::creation(CONTRACT).build()], 12).unwrap();

        assert_eq!(receipt.transaction_hash, "deadbeef");
        assert_eq!(receipt.contract_address.as_deref(), Some(CONTRACT));
        assert_eq!(receipt.block_number, "12");
        assert_eq!(receipt.block_hash, hex::encode(header(12).hash()));
        assert_eq!(receipt.gas_used, 0);
        assert_eq!(receipt.cumulative_gas_used, 0);
    }

    #[test]
    fn test_call_receipt() {
        let receipt = receipt(vec![ActionBuilder::call(CALLEE).build()], 3).unwrap();

        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.block_number, "3");
        assert_eq!(receipt.gas_used, 0);
        assert_eq!(receipt.cumulative_gas_used, 0);
    }

    #[test]
    fn test_call_receipt_ignores_response_payload() {
        let action = ActionBuilder {
            response_payload: b"return value".to_vec(),
            ..ActionBuilder::call(CALLEE)
        };

        let receipt = receipt(vec![action.build()], 3).unwrap();
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_no_actions() {
        let err = receipt(vec![], 1).unwrap_err();
        assert!(matches!(err, ProxyError::MissingData("transaction actions")));
    }

    #[test]
    fn test_multiple_actions() {
        let actions = vec![
            ActionBuilder::call(CALLEE).build(),
            ActionBuilder::creation(CONTRACT).build(),
        ];

        let err = receipt(actions, 1).unwrap_err();
        assert!(matches!(err, ProxyError::Decode { what: "transaction actions", .. }));
    }

    #[test]
    fn test_missing_endorsed_action() {
        let action = ActionBuilder {
            endorsed: false,
            ..ActionBuilder::call(CALLEE)
        };

        let err = receipt(vec![action.build()], 1).unwrap_err();
        assert!(matches!(err, ProxyError::MissingData("proposal response payload")));
    }

    #[test]
    fn test_missing_extension() {
        let action = ActionBuilder {
            extension: false,
            ..ActionBuilder::call(CALLEE)
        };

        let err = receipt(vec![action.build()], 1).unwrap_err();
        assert!(matches!(err, ProxyError::MissingData("proposal response extension")));
    }

    #[test]
    fn test_missing_arguments() {
        let action = ActionBuilder {
            args: vec![],
            ..ActionBuilder::call(CALLEE)
        };

        let err = receipt(vec![action.build()], 1).unwrap_err();
        assert!(matches!(err, ProxyError::MissingData("invocation arguments")));
    }

    #[test]
    fn test_invalid_callee() {
        let action = ActionBuilder::call("not hex");

        let err = receipt(vec![action.build()], 1).unwrap_err();
        assert!(matches!(err, ProxyError::Decode { what: "callee address", .. }));
    }

    #[test]
    fn test_creation_with_empty_response_payload() {
        let action = ActionBuilder::creation("");

        let receipt = receipt(vec![action.build()], 1).unwrap();
        assert_eq!(receipt.contract_address.as_deref(), Some(""));
        assert_eq!(receipt.block_number, "1");
    }

    #[test]
    fn test_non_utf8_response_message() {
        let action = ActionBuilder {
            response_message: vec![0xff, 0xfe, 0x80],
            ..ActionBuilder::creation(CONTRACT)
        };

        let receipt = receipt(vec![action.build()], 4).unwrap();
        assert_eq!(receipt.contract_address.as_deref(), Some(CONTRACT));
    }

    #[test]
    fn test_non_utf8_chaincode_id() {
        let action = ActionBuilder::call(CALLEE).build();
        let mut action_payload = ChaincodeActionPayload::decode(action.payload.as_slice()).unwrap();
        let mut proposal =
            ChaincodeProposalPayload::decode(action_payload.chaincode_proposal_payload.as_slice())
                .unwrap();
        let mut invocation = ChaincodeInvocationSpec::decode(proposal.input.as_slice()).unwrap();
        if let Some(spec) = invocation.chaincode_spec.as_mut() {
            spec.chaincode_id = Some(crate::records::ChaincodeId {
                name: vec![0xc3, 0x28],
                ..Default::default()
            });
        }
        invocation.id_generation_alg = vec![0xff];
        proposal.input = invocation.encode_to_vec();
        action_payload.chaincode_proposal_payload = proposal.encode_to_vec();

        let action = TransactionAction {
            payload: action_payload.encode_to_vec(),
            ..action
        };
        let receipt = receipt(vec![action], 4).unwrap();
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_garbage_payload() {
        let action = TransactionAction {
            header: vec![],
            payload: vec![0xff, 0xff, 0xff],
        };

        let err = receipt(vec![action], 1).unwrap_err();
        assert!(matches!(err, ProxyError::Decode { what: "chaincode action payload", .. }));
    }

    #[test]
    fn test_missing_envelope_and_header() {
        let block = Block::decode(block(1).as_slice()).unwrap();
        let err = build_receipt("tx", &ProcessedTransaction::default(), &block).unwrap_err();
        assert!(matches!(err, ProxyError::MissingData("transaction envelope")));

        let processed_tx =
            ProcessedTransaction::decode(processed_transaction(vec![]).as_slice()).unwrap();
        let err = build_receipt("tx", &processed_tx, &Block::default()).unwrap_err();
        assert!(matches!(err, ProxyError::MissingData("block header")));
    }
}
