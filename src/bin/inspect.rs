//! Prints what the engine sees on-chain for one activity.

use chain_sync_engine::domain::{AccountKind, DerivedAccount};
use chain_sync_engine::infra::config::SyncConfig;
use chain_sync_engine::{telemetry, ChainSync};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin inspect -- <activity-address>\n\
         \n\
         Requires env vars:\n\
           SOLANA_RPC_URL, SOLANA_PROGRAM_ID\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(activity_address) = args.first().filter(|a| !a.starts_with('-')) else {
        usage_and_exit();
    };

    let sync = ChainSync::connect(SyncConfig::from_env()?)?;
    let program_id = sync.config().require_program_id()?;
    let activity = chain_sync_engine::domain::address::parse_address(activity_address)?;

    println!("> Activity {}", activity);
    match sync.read_activity(activity_address).await? {
        Some(account) => {
            println!("  id={} phase={:?}", account.activity_id, account.phase);
            println!("  title={:?}", account.title);
            println!("  authority={}", account.authority);
            println!("  description_hash={}", hex::encode(account.description_hash));
        }
        None => println!("  (account not found or not decodable)"),
    }

    for account in [
        DerivedAccount::CheckInRegistry { activity },
        DerivedAccount::VoteTally { activity },
    ] {
        let derived = account.derive(&program_id)?;
        println!("  {}: {} (bump {})", account.kind(), derived, derived.bump);
    }

    let attendees = sync.read_check_ins(activity_address).await?;
    println!("> {} ({} entries)", AccountKind::CheckInRegistry, attendees.len());
    for key in &attendees {
        println!("  {}", key);
    }

    let tally = sync.read_vote_tally(activity_address).await?;
    println!("> {} ({} entries)", AccountKind::VoteTally, tally.len());
    for entry in &tally {
        println!("  candidate {} -> {} votes", entry.candidate_id, entry.vote_count);
    }

    Ok(())
}
