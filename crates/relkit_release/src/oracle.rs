//! Read-only query surfaces consumed by the authorization workflow.
//!
//! Implementations wrap whatever chain client is available. The workflow only
//! reads through these traits; signing and broadcasting stay with the caller.

use async_trait::async_trait;

use crate::address::Address;
use crate::error::ValidationError;
use crate::intent::{ContractCall, TransactionIntent};
use crate::signature::ParsedSignature;

/// Errors raised by an oracle backend. Passed through the workflow untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unknown release contract: {0}")]
    UnknownContract(Address),

    #[error("Query cancelled")]
    Cancelled,
}

/// Account registry and signature handling.
#[async_trait]
pub trait AccountStateOracle: Send + Sync {
    /// Whether `address` has registered itself as an account.
    async fn is_registered_account(&self, address: &Address) -> Result<bool, OracleError>;

    /// Parse and check `signature_hex` as `signer`'s signature over `subject`.
    ///
    /// Returns `Err(ValidationError::MalformedSignature)` when the signature
    /// cannot be parsed or does not verify.
    fn parse_signature(
        &self,
        subject: &Address,
        signer: &Address,
        signature_hex: &str,
    ) -> Result<ParsedSignature, ValidationError>;
}

/// State of a single release-contract instance.
#[async_trait]
pub trait ReleaseContractOracle: Send + Sync {
    async fn is_revoked(&self, contract: &Address) -> Result<bool, OracleError>;

    async fn get_beneficiary(&self, contract: &Address) -> Result<Address, OracleError>;

    async fn get_release_owner(&self, contract: &Address) -> Result<Address, OracleError>;

    /// Package a contract call made by `from` into a transaction intent.
    fn build_operation(
        &self,
        contract: &Address,
        from: &Address,
        call: ContractCall,
    ) -> Result<TransactionIntent, OracleError> {
        Ok(TransactionIntent::new(*contract, *from, call))
    }
}
