//! Error types for the authorization workflow.

use crate::address::Address;
use crate::oracle::OracleError;

/// A request failed a precondition or could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The release contract has not registered itself as an account yet.
    #[error("{0} is not a registered account")]
    NotAnAccount(Address),

    /// The release contract is already a registered account.
    #[error("{0} is already a registered account")]
    AlreadyAnAccount(Address),

    /// The release contract has been revoked.
    #[error("release contract {0} is revoked")]
    Revoked(Address),

    /// The signer's proof-of-possession could not be parsed.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// A BLS public key was supplied without its proof-of-possession.
    #[error("a BLS public key requires a BLS proof-of-possession")]
    InconsistentBlsFields,

    /// BLS key material had the wrong length or was not valid hex.
    #[error("invalid BLS {field}: {reason}")]
    InvalidBlsMaterial { field: &'static str, reason: String },

    /// An address argument was not a 20-byte hex string.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },
}

/// The request could not be routed to a contract operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown role {0:?} (expected vote, validator or attestation)")]
    UnknownRole(String),
}

/// Any failure produced while turning a request into a transaction intent.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Propagated verbatim from an oracle query.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}
