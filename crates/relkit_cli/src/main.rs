mod cli;

use clap::Parser;
use tracing::info;

use relkit_core::RelkitConfig;
use relkit_core::logging;
use relkit_release::LedgerSnapshot;

use cli::Cli;

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RelkitConfig::load_from_path(path)?,
        None => RelkitConfig::load()?,
    };

    // Logging failures are not fatal.
    let logs_dir = cli::log_dir(cli.log_dir.clone())?;
    let _guard = match logging::init_logging(&logs_dir, &config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: logging disabled: {e}");
            None
        }
    };

    let path = cli::snapshot_path(cli.snapshot, &config)?;
    let snapshot = LedgerSnapshot::load_from_file(&path)?;

    let intent = cli::run_command(cli.cmd, snapshot).await?;
    info!(label = %intent.label, from = %intent.from, "intent ready for signing");

    println!("{}", cli::render_intent(&intent, config.pretty_json)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
