use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::address::{Address, strip_hex_prefix};
use crate::error::ValidationError;

const SIGNATURE_LEN: usize = 65;
const ETH_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// The hash a signer signs to prove possession for `subject`: keccak256 of
/// the 20 address bytes.
pub fn address_message_hash(subject: &Address) -> [u8; 32] {
    keccak256(subject.as_bytes())
}

/// `hash` wrapped in the `personal_sign` prefix, as wallets sign it.
pub fn eth_signed_message_hash(hash: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(ETH_MESSAGE_PREFIX.len() + hash.len());
    data.extend_from_slice(ETH_MESSAGE_PREFIX);
    data.extend_from_slice(hash);
    keccak256(&data)
}

/// The account address controlled by `key`.
pub fn address_of_key(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}

/// A recoverable ECDSA signature split into its canonical components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSignature {
    /// Recovery id, normalized to 27 or 28.
    pub v: u8,
    #[serde(with = "hex_bytes32")]
    pub r: [u8; 32],
    #[serde(with = "hex_bytes32")]
    pub s: [u8; 32],
}

impl ParsedSignature {
    /// Parse a 65-byte `r || s || v` signature from hex.
    ///
    /// A recovery id of 0 or 1 is shifted to 27 or 28. Any other recovery id,
    /// non-hex input, or wrong length is rejected as malformed.
    pub fn from_hex(input: &str) -> Result<Self, ValidationError> {
        let bytes = hex::decode(strip_hex_prefix(input.trim()))
            .map_err(|e| ValidationError::MalformedSignature(e.to_string()))?;
        if bytes.len() != SIGNATURE_LEN {
            return Err(ValidationError::MalformedSignature(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        let v = match bytes[64] {
            v @ (0 | 1) => v + 27,
            v @ (27 | 28) => v,
            other => {
                return Err(ValidationError::MalformedSignature(format!(
                    "invalid recovery id {other}"
                )));
            }
        };
        Ok(Self { v, r, s })
    }

    /// Recover the address that produced this signature over `prehash`.
    pub fn recover_signer(&self, prehash: &[u8; 32]) -> Result<Address, ValidationError> {
        let mut rs = [0u8; 64];
        rs[..32].copy_from_slice(&self.r);
        rs[32..].copy_from_slice(&self.s);
        let signature = Signature::from_slice(&rs)
            .map_err(|e| ValidationError::MalformedSignature(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.v - 27).ok_or_else(|| {
            ValidationError::MalformedSignature(format!("invalid recovery id {}", self.v))
        })?;
        let key = VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id)
            .map_err(|e| ValidationError::MalformedSignature(e.to_string()))?;
        Ok(address_of_key(&key))
    }

    /// Parse `input` and check that it is `signer`'s signature over `subject`.
    ///
    /// Both the prefixed (`personal_sign`) and the raw address hash are
    /// accepted. A signature that recovers to any other address is malformed.
    pub fn for_signer_of_address(
        subject: &Address,
        signer: &Address,
        input: &str,
    ) -> Result<Self, ValidationError> {
        let signature = Self::from_hex(input)?;
        let hash = address_message_hash(subject);
        for digest in [eth_signed_message_hash(&hash), hash] {
            if signature.recover_signer(&digest).ok().as_ref() == Some(signer) {
                return Ok(signature);
            }
        }
        Err(ValidationError::MalformedSignature(format!(
            "signature over {subject} was not produced by {signer}"
        )))
    }
}

/// Sign `subject` with `key` the way a wallet would, returning the hex form.
#[cfg(test)]
pub(crate) fn sign_address(key: &k256::ecdsa::SigningKey, subject: &Address) -> String {
    let digest = eth_signed_message_hash(&address_message_hash(subject));
    let (signature, recovery_id) = key.sign_prehash_recoverable(&digest).unwrap();
    format!(
        "0x{}{:02x}",
        hex::encode(signature.to_bytes()),
        recovery_id.to_byte() + 27
    )
}

mod hex_bytes32 {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::address::strip_hex_prefix;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(strip_hex_prefix(&s)).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
