//! Builders for synthetic ledger records, shared by the mock ledger and tests.

use prost::Message;

use super::*;
#[cfg(test)]
use crate::address::zero_address_hex;

#[cfg(test)]
pub const CALLEE: &str = "1f2e3d4c5b6a79880112233445566778899aabbc";
#[cfg(test)]
pub const CONTRACT: &str = "aabbccddeeff00112233445566778899aabbccdd";

pub struct ActionBuilder {
    pub args: Vec<Vec<u8>>,
    pub response_payload: Vec<u8>,
    pub response_message: Vec<u8>,
    pub endorsed: bool,
    pub extension: bool,
}

impl ActionBuilder {
    #[cfg(test)]
    pub fn call(callee: &str) -> Self {
        Self {
            args: vec![callee.as_bytes().to_vec(), b"6060".to_vec()],
            response_payload: vec![],
            response_message: vec![],
            endorsed: true,
            extension: true,
        }
    }

    #[cfg(test)]
    pub fn creation(contract: &str) -> Self {
        Self {
            response_payload: contract.as_bytes().to_vec(),
            ..Self::call(&zero_address_hex())
        }
    }

    pub fn build(self) -> TransactionAction {
        let spec = ChaincodeInvocationSpec {
            chaincode_spec: Some(ChaincodeSpec {
                r#type: 1,
                chaincode_id: Some(ChaincodeId {
                    name: b"evmscc".to_vec(),
                    ..Default::default()
                }),
                input: Some(ChaincodeInput { args: self.args }),
                timeout: 0,
            }),
            id_generation_alg: vec![],
        };
        let proposal = ChaincodeProposalPayload {
            input: spec.encode_to_vec(),
        };

        let extension = if self.extension {
            ChaincodeAction {
                response: Some(Response {
                    status: 200,
                    message: self.response_message,
                    payload: self.response_payload,
                }),
                ..Default::default()
            }
            .encode_to_vec()
        } else {
            vec![]
        };
        let response_payload = ProposalResponsePayload {
            proposal_hash: vec![7; 32],
            extension,
        };

        let action = self.endorsed.then(|| ChaincodeEndorsedAction {
            proposal_response_payload: response_payload.encode_to_vec(),
            endorsements: vec![Endorsement {
                endorser: b"peer0".to_vec(),
                signature: vec![1; 8],
            }],
        });

        TransactionAction {
            header: vec![3; 4],
            payload: ChaincodeActionPayload {
                chaincode_proposal_payload: proposal.encode_to_vec(),
                action,
            }
            .encode_to_vec(),
        }
    }
}

pub fn processed_transaction(actions: Vec<TransactionAction>) -> Vec<u8> {
    let payload = Payload {
        header: Some(Header {
            channel_header: vec![1; 4],
            signature_header: vec![2; 4],
        }),
        data: Transaction { actions }.encode_to_vec(),
    };

    ProcessedTransaction {
        transaction_envelope: Some(Envelope {
            payload: payload.encode_to_vec(),
            signature: vec![9; 8],
        }),
        validation_code: 0,
    }
    .encode_to_vec()
}

pub fn header(number: u64) -> BlockHeader {
    BlockHeader {
        number,
        previous_hash: vec![4; 32],
        data_hash: vec![5; 32],
    }
}

pub fn block(number: u64) -> Vec<u8> {
    Block {
        header: Some(header(number)),
        data: Some(BlockData {
            data: vec![vec![6; 16]],
        }),
        metadata: None,
    }
    .encode_to_vec()
}
