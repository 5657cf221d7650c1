use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::address::Address;
use crate::error::ValidationError;
use crate::oracle::{AccountStateOracle, OracleError, ReleaseContractOracle};
use crate::signature::ParsedSignature;

/// Administrative state of one release-contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseContractState {
    pub beneficiary: Address,
    pub release_owner: Address,
    #[serde(default)]
    pub revoked: bool,
}

/// A point-in-time copy of the chain state the authorization workflow reads.
///
/// Lets intents be prepared offline: the snapshot answers both oracles, and
/// the resulting intents are handed to a separate signer. Signatures are
/// verified locally by recovering the signer from the address hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub accounts: BTreeSet<Address>,
    #[serde(default)]
    pub release_contracts: BTreeMap<Address, ReleaseContractState>,
}

impl LedgerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_account(&mut self, address: Address) {
        self.accounts.insert(address);
    }

    pub fn insert_release_contract(&mut self, contract: Address, state: ReleaseContractState) {
        self.release_contracts.insert(contract, state);
    }

    fn contract(&self, contract: &Address) -> Result<&ReleaseContractState, OracleError> {
        self.release_contracts
            .get(contract)
            .ok_or(OracleError::UnknownContract(*contract))
    }

    /// Persist the snapshot as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write snapshot: {}", path.display()))?;
        info!(path = %path.display(), contracts = self.release_contracts.len(), "snapshot saved");
        Ok(())
    }

    /// Load a snapshot. Unlike configuration, a missing file is an error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
        let snapshot: Self = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse snapshot: {}", path.display()))?;
        info!(
            path = %path.display(),
            accounts = snapshot.accounts.len(),
            contracts = snapshot.release_contracts.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl AccountStateOracle for LedgerSnapshot {
    async fn is_registered_account(&self, address: &Address) -> Result<bool, OracleError> {
        Ok(self.accounts.contains(address))
    }

    fn parse_signature(
        &self,
        subject: &Address,
        signer: &Address,
        signature_hex: &str,
    ) -> Result<ParsedSignature, ValidationError> {
        ParsedSignature::for_signer_of_address(subject, signer, signature_hex)
    }
}

#[async_trait]
impl ReleaseContractOracle for LedgerSnapshot {
    async fn is_revoked(&self, contract: &Address) -> Result<bool, OracleError> {
        Ok(self.contract(contract)?.revoked)
    }

    async fn get_beneficiary(&self, contract: &Address) -> Result<Address, OracleError> {
        Ok(self.contract(contract)?.beneficiary)
    }

    async fn get_release_owner(&self, contract: &Address) -> Result<Address, OracleError> {
        Ok(self.contract(contract)?.release_owner)
    }
}
