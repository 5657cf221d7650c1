use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::request::{BlsProofOfPossession, BlsPublicKey};
use crate::signature::ParsedSignature;

/// A release-contract method together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContractCall {
    CreateAccount,
    AuthorizeVoteSigner {
        signer: Address,
        signature: ParsedSignature,
    },
    AuthorizeValidatorSigner {
        signer: Address,
        signature: ParsedSignature,
    },
    AuthorizeValidatorSignerAndBls {
        signer: Address,
        signature: ParsedSignature,
        bls_public_key: BlsPublicKey,
        bls_pop: BlsProofOfPossession,
    },
    AuthorizeAttestationSigner {
        signer: Address,
        signature: ParsedSignature,
    },
}

impl ContractCall {
    /// The contract method name.
    pub fn method(&self) -> &'static str {
        match self {
            ContractCall::CreateAccount => "createAccount",
            ContractCall::AuthorizeVoteSigner { .. } => "authorizeVoteSigner",
            ContractCall::AuthorizeValidatorSigner { .. } => "authorizeValidatorSigner",
            ContractCall::AuthorizeValidatorSignerAndBls { .. } => "authorizeValidatorSignerAndBls",
            ContractCall::AuthorizeAttestationSigner { .. } => "authorizeAttestationSigner",
        }
    }

    /// The signer being authorized, if this call authorizes one.
    pub fn signer(&self) -> Option<&Address> {
        match self {
            ContractCall::CreateAccount => None,
            ContractCall::AuthorizeVoteSigner { signer, .. }
            | ContractCall::AuthorizeValidatorSigner { signer, .. }
            | ContractCall::AuthorizeValidatorSignerAndBls { signer, .. }
            | ContractCall::AuthorizeAttestationSigner { signer, .. } => Some(signer),
        }
    }
}

/// A single contract call ready to be signed and broadcast by `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIntent {
    /// Display label for the transaction, e.g. `authorizeVoteSignerTx`.
    pub label: String,
    /// The release contract being called.
    pub to: Address,
    /// The resolved caller on whose behalf the call is made.
    pub from: Address,
    pub call: ContractCall,
}

impl TransactionIntent {
    pub fn new(to: Address, from: Address, call: ContractCall) -> Self {
        Self {
            label: format!("{}Tx", call.method()),
            to,
            from,
            call,
        }
    }
}
