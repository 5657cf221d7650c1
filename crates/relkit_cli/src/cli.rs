use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use relkit_core::RelkitConfig;
use relkit_release::{
    Address, AuthorizationRequest, AuthorizationRequestProcessor, AuthorizeArgs, LedgerSnapshot,
    TransactionIntent,
};

#[derive(Parser, Debug)]
#[command(
    name = "relkit",
    version,
    about = "Prepare release-contract transactions for an external signer"
)]
pub struct Cli {
    /// Ledger snapshot to read chain state from (overrides the config file)
    #[arg(long, global = true, env = "RELKIT_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Config file path (defaults to ~/.relkit/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for rolling log files (defaults to ~/.relkit/logs)
    #[arg(long, global = true, env = "RELKIT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authorize an alternative key to vote, validate or attest on behalf of a release contract
    Authorize(AuthorizeCmd),
    /// Register a release contract as an account
    CreateAccount(CreateAccountCmd),
}

#[derive(Args, Debug)]
pub struct AuthorizeCmd {
    /// Address of the release contract
    #[arg(long)]
    pub contract: String,

    /// One of: vote, validator, attestation
    #[arg(long)]
    pub role: String,

    /// The signer key being authorized
    #[arg(long)]
    pub signer: String,

    /// Signature (proof-of-possession) of the signer key over the contract address
    #[arg(long)]
    pub signature: String,

    /// BLS public key for consensus (96 bytes, validator role only)
    #[arg(long)]
    pub bls_key: Option<String>,

    /// Proof-of-possession for the BLS key (48 bytes)
    #[arg(long)]
    pub bls_pop: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateAccountCmd {
    /// Address of the release contract
    #[arg(long)]
    pub contract: String,
}

impl From<AuthorizeCmd> for AuthorizeArgs {
    fn from(cmd: AuthorizeCmd) -> Self {
        AuthorizeArgs {
            contract: cmd.contract,
            role: cmd.role,
            signer: cmd.signer,
            signature: cmd.signature,
            bls_key: cmd.bls_key,
            bls_pop: cmd.bls_pop,
        }
    }
}

/// Pick the snapshot path: command line first, then config.
pub fn snapshot_path(cli_path: Option<PathBuf>, config: &RelkitConfig) -> Result<PathBuf> {
    cli_path
        .or_else(|| config.snapshot_path.clone())
        .context("no ledger snapshot given; pass --snapshot or set snapshot_path in config")
}

/// Pick the log directory: command line first, then `~/.relkit/logs`.
pub fn log_dir(cli_path: Option<PathBuf>) -> Result<PathBuf> {
    match cli_path {
        Some(path) => Ok(path),
        None => RelkitConfig::logs_dir(),
    }
}

/// Run a subcommand against `snapshot` and return the prepared intent.
pub async fn run_command(cmd: Command, snapshot: LedgerSnapshot) -> Result<TransactionIntent> {
    let snapshot = Arc::new(snapshot);
    let processor = AuthorizationRequestProcessor::new(snapshot.clone(), snapshot);

    let intent = match cmd {
        Command::Authorize(args) => {
            let args: AuthorizeArgs = args.into();
            let request = AuthorizationRequest::from_args(&args)?;
            debug!(?request, "parsed authorization request");
            processor.process(&request).await?
        }
        Command::CreateAccount(args) => {
            let contract: Address = args.contract.parse()?;
            processor.create_account(&contract).await?
        }
    };
    Ok(intent)
}

pub fn render_intent(intent: &TransactionIntent, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(intent)?
    } else {
        serde_json::to_string(intent)?
    };
    Ok(json)
}
