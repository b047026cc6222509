use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::sync::Arc;

use chain_sync_engine::app::{BootstrapInitializer, BootstrapOutcome};
use chain_sync_engine::domain::DerivedAccount;
use chain_sync_engine::infra::config::SyncConfig;
use chain_sync_engine::solana::{Ledger, RpcLedger};
use chain_sync_engine::telemetry;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--init-config-if-missing]\n\
         \n\
         Requires env vars:\n\
           SOLANA_RPC_URL, SOLANA_PROGRAM_ID\n\
         To initialize the shared config account:\n\
           SOLANA_AUTHORITY_KEY or SOLANA_AUTHORITY_KEYPAIR_PATH\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let init_config_if_missing = args.iter().any(|a| a == "--init-config-if-missing");

    let config = SyncConfig::from_env()?;
    let (rpc_url, program_id) = config.require_chain()?;
    let rpc_url = rpc_url.to_string();

    println!("> Preflight:");
    println!("  SOLANA_RPC_URL={}", rpc_url);
    println!("  SOLANA_PROGRAM_ID={}", program_id);
    println!(
        "  Bootstrap credential: {}",
        if config.bootstrap_credential.is_some() { "configured" } else { "missing" }
    );
    println!(
        "  Confirmation timeout: {:?} (poll every {:?})",
        config.confirmation_timeout, config.poll_interval
    );
    if config.allow_test_wallets {
        eprintln!(
            "  Warning: ALLOW_TEST_WALLETS is on ({} wallets skip signature recovery).",
            config.test_wallets.len()
        );
    }

    let client = RpcClient::new_with_commitment(rpc_url.clone(), CommitmentConfig::confirmed());

    // Basic RPC connectivity
    let version = client.get_version().await?;
    println!("  RPC version: {}", version.solana_core);

    // Program account existence
    let program_acct = client
        .get_account(&program_id)
        .await
        .map_err(|e| anyhow::anyhow!("Program account not found on cluster: {} ({})", program_id, e))?;
    if !program_acct.executable {
        eprintln!("  Warning: program account exists but is not marked executable.");
    } else {
        println!("  Program account is deployed + executable.");
    }

    let config_pda = DerivedAccount::Config.derive(&program_id)?;
    let treasury = DerivedAccount::SponsorTreasury.derive(&program_id)?;
    println!("  Config PDA: {} (bump {})", config_pda, config_pda.bump);
    println!("  Treasury PDA: {} (bump {})", treasury, treasury.bump);

    let ledger: Arc<dyn Ledger> = Arc::new(RpcLedger::new(rpc_url));
    let bootstrap = BootstrapInitializer::new(config.clone(), ledger);

    if bootstrap.config_exists(&config_pda.address).await? {
        println!("  Config account exists.");
    } else if init_config_if_missing {
        println!("  Config account missing -> initializing...");
        match bootstrap.ensure_initialized().await? {
            BootstrapOutcome::Initialized { signature } => {
                println!("  Config account initialized (tx {}).", signature)
            }
            BootstrapOutcome::InitializedElsewhere | BootstrapOutcome::AlreadyInitialized => {
                println!("  Config account was initialized by another process.")
            }
        }
    } else {
        return Err(anyhow::anyhow!(
            "Config account does not exist. Re-run with --init-config-if-missing"
        ));
    }

    println!("> Preflight OK.");
    Ok(())
}
