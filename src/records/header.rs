use sha2::{Digest, Sha256};

use super::BlockHeader;

const DER_INTEGER: u8 = 0x02;
const DER_OCTET_STRING: u8 = 0x04;
const DER_SEQUENCE: u8 = 0x30;

impl BlockHeader {
    /// The ledger's canonical block hash: SHA-256 of the DER-encoded
    /// `SEQUENCE { number INTEGER, previousHash OCTET STRING, dataHash OCTET STRING }`.
    pub fn hash(&self) -> Vec<u8> {
        Sha256::digest(self.to_der()).to_vec()
    }

    pub fn to_der(&self) -> Vec<u8> {
        let content = [
            der_unsigned(self.number),
            der_tlv(DER_OCTET_STRING, &self.previous_hash),
            der_tlv(DER_OCTET_STRING, &self.data_hash),
        ]
        .concat();

        der_tlv(DER_SEQUENCE, &content)
    }
}

fn der_unsigned(n: u64) -> Vec<u8> {
    let bytes = n.to_be_bytes();
    let first = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);

    let mut content = Vec::with_capacity(9);
    // Keep the integer positive.
    if bytes[first] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[first..]);

    der_tlv(DER_INTEGER, &content)
}

fn der_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];

    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let len_bytes = len.to_be_bytes();
        let first = len_bytes.iter().position(|b| *b != 0).unwrap_or(0);
        out.push(0x80 | (len_bytes.len() - first) as u8);
        out.extend_from_slice(&len_bytes[first..]);
    }

    out.extend_from_slice(content);
    out
}
