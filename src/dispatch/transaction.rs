//! Legacy (pre-EIP-2718) value transfer, signed with EIP-155 replay protection.

use crate::hd::{Address, PrivateKey};
use crate::provider::TxHash;
use crate::units::{trim_leading_zeros, Wei};
use alloy_rlp::{Encodable, Header};
use secp256k1::{Message, Secp256k1};
use sha3::{Digest, Keccak256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: Wei,
    pub gas_limit: u64,
    pub to: Address,
    pub value: Wei,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// RLP-encoded signed transaction and its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: TxHash,
}

/// RLP list of already-typed fields.
fn rlp_list(fields: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length = fields.iter().map(|f| f.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 3);
    Header { list: true, payload_length }.encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}

impl LegacyTransaction {
    /// `rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])`
    pub fn signing_payload(&self) -> Vec<u8> {
        let (gas_price, value, data) = (self.gas_price.as_u128(), self.value.as_u128(), self.data.as_slice());
        rlp_list(&[
            &self.nonce,
            &gas_price,
            &self.gas_limit,
            self.to.as_bytes(),
            &value,
            &data,
            &self.chain_id,
            &0u8,
            &0u8,
        ])
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        Keccak256::digest(self.signing_payload()).into()
    }

    pub fn sign(&self, key: &PrivateKey) -> SignedTransaction {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(self.signing_hash());
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&message, key.secret_key())
            .serialize_compact();

        let v = self.chain_id as u128 * 2 + 35 + recovery_id.to_i32() as u128;
        // r and s are integers: no leading zero bytes
        let r = trim_leading_zeros(&compact[..32]);
        let s = trim_leading_zeros(&compact[32..]);
        let (gas_price, value, data) = (self.gas_price.as_u128(), self.value.as_u128(), self.data.as_slice());
        let (r, s) = (r.as_slice(), s.as_slice());

        let raw = rlp_list(&[
            &self.nonce,
            &gas_price,
            &self.gas_limit,
            self.to.as_bytes(),
            &value,
            &data,
            &v,
            &r,
            &s,
        ]);
        let hash = TxHash(Keccak256::digest(&raw).into());
        SignedTransaction { raw, hash }
    }
}
