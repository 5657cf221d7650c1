use std::sync::Arc;

use tracing::{debug, info};

use crate::address::Address;
use crate::error::{AuthorizeError, ValidationError};
use crate::intent::{ContractCall, TransactionIntent};
use crate::oracle::{AccountStateOracle, OracleError, ReleaseContractOracle};
use crate::request::{Authorization, AuthorizationRequest, BlsKeys};
use crate::signature::ParsedSignature;

/// Turns authorization requests into exactly one transaction intent each.
///
/// Holds only read-only oracle handles, so one processor can serve any number
/// of concurrent requests.
#[derive(Clone)]
pub struct AuthorizationRequestProcessor {
    accounts: Arc<dyn AccountStateOracle>,
    release: Arc<dyn ReleaseContractOracle>,
}

impl AuthorizationRequestProcessor {
    pub fn new(
        accounts: Arc<dyn AccountStateOracle>,
        release: Arc<dyn ReleaseContractOracle>,
    ) -> Self {
        Self { accounts, release }
    }

    /// Validate `request`, resolve the caller and select the contract call.
    ///
    /// Order: account check, signature parse, revocation lookup, dispatch.
    /// A malformed signature therefore fails before any release-contract query.
    pub async fn process(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<TransactionIntent, AuthorizeError> {
        let contract = &request.contract;
        let role = request.authorization.role();
        debug!(%contract, %role, signer = %request.signer, "processing authorization request");

        if !self.accounts.is_registered_account(contract).await? {
            return Err(ValidationError::NotAnAccount(*contract).into());
        }

        let signature =
            self.accounts
                .parse_signature(contract, &request.signer, &request.signature_hex)?;

        let caller = self.resolve_caller(contract).await?;
        let call = select_call(&request.authorization, request.signer, signature);
        let intent = self.release.build_operation(contract, &caller, call)?;

        info!(
            %contract,
            %role,
            from = %intent.from,
            method = intent.call.method(),
            "authorization intent prepared"
        );
        Ok(intent)
    }

    /// The address allowed to administer `contract` right now: the release
    /// owner once revoked, the beneficiary otherwise.
    pub async fn resolve_caller(&self, contract: &Address) -> Result<Address, OracleError> {
        let revoked = self.release.is_revoked(contract).await?;
        let caller = if revoked {
            self.release.get_release_owner(contract).await?
        } else {
            self.release.get_beneficiary(contract).await?
        };
        debug!(%contract, revoked, %caller, "resolved caller");
        Ok(caller)
    }

    /// Prepare the `createAccount` call that registers `contract` as an account.
    ///
    /// The contract must not be registered yet and must not be revoked. The
    /// beneficiary is always the caller.
    pub async fn create_account(
        &self,
        contract: &Address,
    ) -> Result<TransactionIntent, AuthorizeError> {
        if self.accounts.is_registered_account(contract).await? {
            return Err(ValidationError::AlreadyAnAccount(*contract).into());
        }
        if self.release.is_revoked(contract).await? {
            return Err(ValidationError::Revoked(*contract).into());
        }

        let beneficiary = self.release.get_beneficiary(contract).await?;
        let intent =
            self.release
                .build_operation(contract, &beneficiary, ContractCall::CreateAccount)?;
        info!(%contract, from = %beneficiary, "create-account intent prepared");
        Ok(intent)
    }
}

/// Map a role (and any BLS keys) to the one contract call that serves it.
pub fn select_call(
    authorization: &Authorization,
    signer: Address,
    signature: ParsedSignature,
) -> ContractCall {
    match authorization {
        Authorization::Vote => ContractCall::AuthorizeVoteSigner { signer, signature },
        Authorization::Validator {
            bls: Some(BlsKeys {
                public_key,
                proof_of_possession,
            }),
        } => ContractCall::AuthorizeValidatorSignerAndBls {
            signer,
            signature,
            bls_public_key: public_key.clone(),
            bls_pop: proof_of_possession.clone(),
        },
        Authorization::Validator { bls: None } => {
            ContractCall::AuthorizeValidatorSigner { signer, signature }
        }
        Authorization::Attestation => {
            ContractCall::AuthorizeAttestationSigner { signer, signature }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::DispatchError;
    use crate::request::{AuthorizeArgs, BlsProofOfPossession, BlsPublicKey};

    const CONTRACT: Address = Address::from_bytes([0x54; 20]);
    const BENEFICIARY: Address = Address::from_bytes([0xbe; 20]);
    const OWNER: Address = Address::from_bytes([0x0e; 20]);
    const SIGNER: Address = Address::from_bytes([0xab; 20]);

    fn valid_sig() -> String {
        format!("0x{}{}1c", "11".repeat(32), "22".repeat(32))
    }

    fn parsed_sig() -> ParsedSignature {
        ParsedSignature::from_hex(&valid_sig()).unwrap()
    }

    fn bls_keys() -> BlsKeys {
        BlsKeys {
            public_key: BlsPublicKey::from_hex(&"aa".repeat(96)).unwrap(),
            proof_of_possession: BlsProofOfPossession::from_hex(&"bb".repeat(48)).unwrap(),
        }
    }

    /// Fake chain state that records every query it answers.
    struct FakeChain {
        registered: bool,
        revoked: bool,
        fail_registration: Option<OracleError>,
        fail_revocation: Option<OracleError>,
        queries: Mutex<Vec<&'static str>>,
    }

    impl FakeChain {
        fn new(registered: bool, revoked: bool) -> Arc<Self> {
            Arc::new(Self {
                registered,
                revoked,
                fail_registration: None,
                fail_revocation: None,
                queries: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, query: &'static str) {
            self.queries.lock().unwrap().push(query);
        }

        fn queries(&self) -> Vec<&'static str> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AccountStateOracle for FakeChain {
        async fn is_registered_account(&self, _address: &Address) -> Result<bool, OracleError> {
            self.record("is_registered_account");
            match &self.fail_registration {
                Some(err) => Err(err.clone()),
                None => Ok(self.registered),
            }
        }

        fn parse_signature(
            &self,
            _subject: &Address,
            _signer: &Address,
            signature_hex: &str,
        ) -> Result<ParsedSignature, ValidationError> {
            self.record("parse_signature");
            ParsedSignature::from_hex(signature_hex)
        }
    }

    #[async_trait]
    impl ReleaseContractOracle for FakeChain {
        async fn is_revoked(&self, _contract: &Address) -> Result<bool, OracleError> {
            self.record("is_revoked");
            match &self.fail_revocation {
                Some(err) => Err(err.clone()),
                None => Ok(self.revoked),
            }
        }

        async fn get_beneficiary(&self, _contract: &Address) -> Result<Address, OracleError> {
            self.record("get_beneficiary");
            Ok(BENEFICIARY)
        }

        async fn get_release_owner(&self, _contract: &Address) -> Result<Address, OracleError> {
            self.record("get_release_owner");
            Ok(OWNER)
        }
    }

    fn processor(chain: &Arc<FakeChain>) -> AuthorizationRequestProcessor {
        AuthorizationRequestProcessor::new(chain.clone(), chain.clone())
    }

    fn request(authorization: Authorization, signature: String) -> AuthorizationRequest {
        AuthorizationRequest::new(CONTRACT, SIGNER, signature, authorization)
    }

    #[tokio::test]
    async fn unregistered_contract_fails_for_every_role() {
        let chain = FakeChain::new(false, false);
        let p = processor(&chain);
        for authorization in [
            Authorization::Vote,
            Authorization::Validator { bls: None },
            Authorization::Validator {
                bls: Some(bls_keys()),
            },
            Authorization::Attestation,
        ] {
            let err = p.process(&request(authorization, valid_sig())).await.unwrap_err();
            assert!(matches!(
                err,
                AuthorizeError::Validation(ValidationError::NotAnAccount(addr)) if addr == CONTRACT
            ));
        }
        assert!(chain.queries().iter().all(|q| *q == "is_registered_account"));
    }

    #[tokio::test]
    async fn vote_on_live_contract_is_sent_by_beneficiary() {
        let chain = FakeChain::new(true, false);
        let intent = processor(&chain)
            .process(&request(Authorization::Vote, valid_sig()))
            .await
            .unwrap();

        assert_eq!(intent.from, BENEFICIARY);
        assert_eq!(intent.to, CONTRACT);
        assert_eq!(
            intent.call,
            ContractCall::AuthorizeVoteSigner {
                signer: SIGNER,
                signature: parsed_sig(),
            }
        );
        assert_eq!(intent.label, "authorizeVoteSignerTx");
    }

    #[tokio::test]
    async fn validator_with_bls_on_revoked_contract_is_sent_by_owner() {
        let chain = FakeChain::new(true, true);
        let keys = bls_keys();
        let intent = processor(&chain)
            .process(&request(
                Authorization::Validator {
                    bls: Some(keys.clone()),
                },
                valid_sig(),
            ))
            .await
            .unwrap();

        assert_eq!(intent.from, OWNER);
        assert_eq!(
            intent.call,
            ContractCall::AuthorizeValidatorSignerAndBls {
                signer: SIGNER,
                signature: parsed_sig(),
                bls_public_key: keys.public_key,
                bls_pop: keys.proof_of_possession,
            }
        );
    }

    #[tokio::test]
    async fn validator_without_bls_key_ignores_stray_pop() {
        let chain = FakeChain::new(true, false);
        let args = AuthorizeArgs {
            contract: CONTRACT.to_string(),
            role: "validator".into(),
            signer: SIGNER.to_string(),
            signature: valid_sig(),
            bls_key: None,
            bls_pop: Some("bb".repeat(48)),
        };
        let req = AuthorizationRequest::from_args(&args).unwrap();
        let intent = processor(&chain).process(&req).await.unwrap();
        assert_eq!(intent.call.method(), "authorizeValidatorSigner");
    }

    #[tokio::test]
    async fn attestation_maps_to_attestation_signer() {
        let chain = FakeChain::new(true, false);
        let intent = processor(&chain)
            .process(&request(Authorization::Attestation, valid_sig()))
            .await
            .unwrap();
        assert_eq!(
            intent.call,
            ContractCall::AuthorizeAttestationSigner {
                signer: SIGNER,
                signature: parsed_sig(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_signature_fails_before_revocation_query() {
        let chain = FakeChain::new(true, false);
        let err = processor(&chain)
            .process(&request(Authorization::Attestation, "0xnothex".into()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AuthorizeError::Validation(ValidationError::MalformedSignature(_))
        ));
        assert_eq!(chain.queries(), vec!["is_registered_account", "parse_signature"]);
    }

    #[test]
    fn unknown_role_is_rejected_before_processing() {
        let args = AuthorizeArgs {
            contract: CONTRACT.to_string(),
            role: "owner".into(),
            signer: SIGNER.to_string(),
            signature: valid_sig(),
            bls_key: None,
            bls_pop: None,
        };
        let err = AuthorizationRequest::from_args(&args).unwrap_err();
        assert!(matches!(
            err,
            AuthorizeError::Dispatch(DispatchError::UnknownRole(ref r)) if r == "owner"
        ));
    }

    #[tokio::test]
    async fn resolve_caller_follows_revocation_flag() {
        let live = FakeChain::new(true, false);
        assert_eq!(processor(&live).resolve_caller(&CONTRACT).await.unwrap(), BENEFICIARY);
        assert_eq!(live.queries(), vec!["is_revoked", "get_beneficiary"]);

        let revoked = FakeChain::new(true, true);
        assert_eq!(processor(&revoked).resolve_caller(&CONTRACT).await.unwrap(), OWNER);
        assert_eq!(revoked.queries(), vec!["is_revoked", "get_release_owner"]);
    }

    #[tokio::test]
    async fn processing_twice_yields_identical_intents() {
        let chain = FakeChain::new(true, false);
        let p = processor(&chain);
        let req = request(Authorization::Vote, valid_sig());
        let first = p.process(&req).await.unwrap();
        let second = p.process(&req).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn oracle_errors_propagate_unchanged() {
        let chain = Arc::new(FakeChain {
            registered: true,
            revoked: false,
            fail_registration: None,
            fail_revocation: Some(OracleError::Unavailable("node down".into())),
            queries: Mutex::new(Vec::new()),
        });
        let err = processor(&chain)
            .process(&request(Authorization::Vote, valid_sig()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthorizeError::Oracle(OracleError::Unavailable(ref msg)) if msg == "node down"
        ));
    }

    fn failing_registry(err: OracleError) -> Arc<FakeChain> {
        Arc::new(FakeChain {
            registered: true,
            revoked: false,
            fail_registration: Some(err),
            fail_revocation: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn cancelled_account_query_stops_processing() {
        let chain = failing_registry(OracleError::Cancelled);
        let err = processor(&chain)
            .process(&request(Authorization::Vote, valid_sig()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorizeError::Oracle(OracleError::Cancelled)));
        assert_eq!(chain.queries(), vec!["is_registered_account"]);
    }

    #[tokio::test]
    async fn failed_account_query_propagates_from_create_account() {
        let chain = failing_registry(OracleError::Query("execution reverted".into()));
        let err = processor(&chain).create_account(&CONTRACT).await.unwrap_err();
        assert!(matches!(
            err,
            AuthorizeError::Oracle(OracleError::Query(ref msg)) if msg == "execution reverted"
        ));
        assert_eq!(chain.queries(), vec!["is_registered_account"]);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_processor() {
        let chain = FakeChain::new(true, false);
        let p = processor(&chain);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = p.clone();
                tokio::spawn(async move {
                    p.process(&request(Authorization::Vote, valid_sig())).await
                })
            })
            .collect();
        for handle in handles {
            let intent = handle.await.unwrap().unwrap();
            assert_eq!(intent.from, BENEFICIARY);
        }
    }

    #[tokio::test]
    async fn create_account_requires_unregistered_live_contract() {
        let chain = FakeChain::new(false, false);
        let intent = processor(&chain).create_account(&CONTRACT).await.unwrap();
        assert_eq!(intent.call, ContractCall::CreateAccount);
        assert_eq!(intent.from, BENEFICIARY);
        assert_eq!(intent.label, "createAccountTx");

        let registered = FakeChain::new(true, false);
        let err = processor(&registered).create_account(&CONTRACT).await.unwrap_err();
        assert!(matches!(
            err,
            AuthorizeError::Validation(ValidationError::AlreadyAnAccount(_))
        ));

        let revoked = FakeChain::new(false, true);
        let err = processor(&revoked).create_account(&CONTRACT).await.unwrap_err();
        assert!(matches!(err, AuthorizeError::Validation(ValidationError::Revoked(_))));
        assert!(!revoked.queries().contains(&"get_beneficiary"));
    }

    #[test]
    fn decision_table_selects_one_call_per_role() {
        let sig = parsed_sig();
        assert_eq!(
            select_call(&Authorization::Vote, SIGNER, sig).method(),
            "authorizeVoteSigner"
        );
        assert_eq!(
            select_call(&Authorization::Validator { bls: None }, SIGNER, sig).method(),
            "authorizeValidatorSigner"
        );
        assert_eq!(
            select_call(
                &Authorization::Validator {
                    bls: Some(bls_keys())
                },
                SIGNER,
                sig
            )
            .method(),
            "authorizeValidatorSignerAndBls"
        );
        assert_eq!(
            select_call(&Authorization::Attestation, SIGNER, sig).method(),
            "authorizeAttestationSigner"
        );
    }
}
