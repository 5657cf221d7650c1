use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::address::{Address, strip_hex_prefix};
use crate::error::{AuthorizeError, DispatchError, ValidationError};

pub const BLS_PUBLIC_KEY_LEN: usize = 96;
pub const BLS_POP_LEN: usize = 48;

/// The kind of authority being delegated to a signer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vote,
    Validator,
    Attestation,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Vote => "vote",
            Role::Validator => "validator",
            Role::Attestation => "attestation",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vote" => Ok(Role::Vote),
            "validator" => Ok(Role::Validator),
            "attestation" => Ok(Role::Attestation),
            _ => Err(DispatchError::UnknownRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// BLS key material
// ---------------------------------------------------------------------------

fn decode_fixed(input: &str, field: &'static str, len: usize) -> Result<Vec<u8>, ValidationError> {
    let bytes = hex::decode(strip_hex_prefix(input.trim())).map_err(|e| {
        ValidationError::InvalidBlsMaterial {
            field,
            reason: e.to_string(),
        }
    })?;
    if bytes.len() != len {
        return Err(ValidationError::InvalidBlsMaterial {
            field,
            reason: format!("expected {len} bytes, got {}", bytes.len()),
        });
    }
    Ok(bytes)
}

/// A 96-byte BLS public key used for consensus.
#[derive(Clone, PartialEq, Eq)]
pub struct BlsPublicKey(Vec<u8>);

/// A 48-byte BLS signature over the account address.
#[derive(Clone, PartialEq, Eq)]
pub struct BlsProofOfPossession(Vec<u8>);

impl BlsPublicKey {
    pub fn from_hex(input: &str) -> Result<Self, ValidationError> {
        decode_fixed(input, "public key", BLS_PUBLIC_KEY_LEN).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl BlsProofOfPossession {
    pub fn from_hex(input: &str) -> Result<Self, ValidationError> {
        decode_fixed(input, "proof-of-possession", BLS_POP_LEN).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

macro_rules! hex_newtype_impls {
    ($ty:ident) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($ty), hex::encode(&self.0))
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&format!("0x{}", hex::encode(&self.0)))
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                $ty::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype_impls!(BlsPublicKey);
hex_newtype_impls!(BlsProofOfPossession);

/// A BLS public key together with its proof-of-possession.
///
/// Holding both in one value makes a key without a proof unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlsKeys {
    pub public_key: BlsPublicKey,
    pub proof_of_possession: BlsProofOfPossession,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Role selector plus the auxiliary key material that only validators carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Authorization {
    Vote,
    Validator { bls: Option<BlsKeys> },
    Attestation,
}

impl Authorization {
    pub fn role(&self) -> Role {
        match self {
            Authorization::Vote => Role::Vote,
            Authorization::Validator { .. } => Role::Validator,
            Authorization::Attestation => Role::Attestation,
        }
    }
}

/// A validated request to authorize a delegate signer on a release contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub contract: Address,
    pub signer: Address,
    /// Signature by `signer` over `(contract, signer)`. Parsed during processing.
    pub signature_hex: String,
    pub authorization: Authorization,
}

/// Unvalidated request fields as collected by a front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeArgs {
    pub contract: String,
    pub role: String,
    pub signer: String,
    pub signature: String,
    pub bls_key: Option<String>,
    pub bls_pop: Option<String>,
}

impl AuthorizationRequest {
    pub fn new(
        contract: Address,
        signer: Address,
        signature_hex: impl Into<String>,
        authorization: Authorization,
    ) -> Self {
        Self {
            contract,
            signer,
            signature_hex: signature_hex.into(),
            authorization,
        }
    }

    /// Build a request from raw strings.
    ///
    /// The role is checked first, so an unknown role is reported before any
    /// other field is looked at. The signer may not be the zero address. A BLS
    /// key without a proof-of-possession is rejected; a proof without a key,
    /// or BLS material on a non-validator role, is dropped.
    pub fn from_args(args: &AuthorizeArgs) -> Result<Self, AuthorizeError> {
        let role: Role = args.role.parse()?;
        let contract: Address = args.contract.parse()?;
        let signer: Address = args.signer.parse()?;
        if signer.is_zero() {
            return Err(ValidationError::InvalidAddress {
                input: args.signer.clone(),
                reason: "signer cannot be the zero address".into(),
            }
            .into());
        }

        let authorization = match role {
            Role::Vote | Role::Attestation => {
                if args.bls_key.is_some() || args.bls_pop.is_some() {
                    warn!(%role, "ignoring BLS material for non-validator role");
                }
                if role == Role::Vote {
                    Authorization::Vote
                } else {
                    Authorization::Attestation
                }
            }
            Role::Validator => Authorization::Validator {
                bls: parse_bls(args.bls_key.as_deref(), args.bls_pop.as_deref())?,
            },
        };

        Ok(Self::new(contract, signer, args.signature.clone(), authorization))
    }
}

fn parse_bls(key: Option<&str>, pop: Option<&str>) -> Result<Option<BlsKeys>, ValidationError> {
    match (key, pop) {
        (Some(key), Some(pop)) => Ok(Some(BlsKeys {
            public_key: BlsPublicKey::from_hex(key)?,
            proof_of_possession: BlsProofOfPossession::from_hex(pop)?,
        })),
        (Some(_), None) => Err(ValidationError::InconsistentBlsFields),
        (None, Some(_)) => {
            warn!("BLS proof-of-possession supplied without a BLS key; ignoring it");
            Ok(None)
        }
        (None, None) => Ok(None),
    }
}
