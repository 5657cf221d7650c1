// Release-contract signer authorization

pub mod address;
pub mod error;
pub mod intent;
pub mod oracle;
pub mod processor;
pub mod request;
pub mod signature;
pub mod snapshot;

// Re-export primary types for convenient access.
pub use address::Address;
pub use error::{AuthorizeError, DispatchError, ValidationError};
pub use intent::{ContractCall, TransactionIntent};
pub use oracle::{AccountStateOracle, OracleError, ReleaseContractOracle};
pub use processor::{AuthorizationRequestProcessor, select_call};
pub use request::{
    Authorization, AuthorizationRequest, AuthorizeArgs, BlsKeys, BlsProofOfPossession,
    BlsPublicKey, Role,
};
pub use signature::ParsedSignature;
pub use snapshot::{LedgerSnapshot, ReleaseContractState};
