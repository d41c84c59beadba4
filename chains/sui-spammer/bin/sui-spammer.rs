use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_logic::{
    setup_logger, Credential, EventLog, LedgerClient, Network, SpamMode, SpamRunner,
    Spammer,
};
use dotenv::dotenv;
use sui_spammer::classify::stopped_report;
use sui_spammer::config::SuiSpammerConfig as Config;
use sui_spammer::{is_low_balance, SimLedger};
use tracing::{info, warn};

const SECRET_KEY_ENV: &str = "SUI_SECRET_KEY";
const RECENT_EVENTS: usize = 20;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Errors only on the console
    #[arg(short, long)]
    quiet: bool,

    /// Show debug-level spam events on the console
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Keep spamming until stopped (Ctrl+C) or out of gas
    Spam,
    /// Register, claim and delete pending counters once, then exit
    Process,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();

    let _log_guard = if args.quiet {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::ERROR)
            .try_init();
        None
    } else {
        setup_logger(args.verbose)
    };

    // Auto-detect config path if default is not found
    let config_path = if std::path::Path::new(&args.config).exists() {
        args.config.clone()
    } else if args.config == "config/config.toml"
        && std::path::Path::new("chains/sui-spammer/config/config.toml").exists()
    {
        "chains/sui-spammer/config/config.toml".to_string()
    } else {
        args.config.clone()
    };

    let config = Config::from_path(&config_path).context("Failed to load config")?;

    let credential = match Credential::from_env(SECRET_KEY_ENV) {
        Ok(credential) => credential,
        Err(err) if config.network == Network::Localnet => {
            warn!("{} ({}). Using an ephemeral localnet key.", err, SECRET_KEY_ENV);
            Credential::ephemeral()
        }
        Err(err) => return Err(err).context("A signing key is required outside localnet"),
    };

    let mode = match args.command {
        Some(Commands::Process) => SpamMode::SinglePass,
        Some(Commands::Spam) | None => SpamMode::Loop,
    };

    if !args.quiet {
        println!(
            r#"
        ╔════════════════════════════════════════════════════════════╗
        ║                 SUI COUNTER SPAMMER                        ║
        ╚════════════════════════════════════════════════════════════╝
        "#
        );
    }
    info!("Network: {}", config.network);
    info!("RPC endpoints: {}", config.rpc_urls.len());
    info!("Mode: {:?}", mode);

    let ledger = SimLedger::new(config.simulation.clone());
    let spammer = Spammer::from_config(
        &config.to_spam_config(),
        &credential,
        |_credential, network, rpc_url| Ok(ledger.client(rpc_url, network)),
    )
    .context("Failed to build spammer")?;

    let event_log = EventLog::new(config.event_log_capacity);
    spammer.set_event_handler(event_log.handler());

    let (spammer, snapshot) = SpamRunner::run(spammer, mode).await?;
    spammer.remove_event_handler();

    let low_balance = is_low_balance(ledger.balance());
    let counters = spammer.user_counters();

    println!("\n📋 Counters (epoch {}):", counters.epoch);
    let report = stopped_report(counters, low_balance);
    if report.is_empty() {
        println!("   none");
    }
    for (counter, label) in report {
        println!(
            "   Epoch {:>4} | {} | {:>6} txs | {}",
            counter.epoch, counter.id, counter.tx_count, label
        );
    }

    println!(
        "\n💰 Balance: {} MIST{} | Claimed: {}",
        ledger.balance(),
        if low_balance { " (top up to spam)" } else { "" },
        ledger.claimed_reward()
    );
    println!("🌐 Last RPC: {}", spammer.active_client().rpc_url());

    println!("\n📜 Recent events:");
    for event in event_log.entries().into_iter().take(RECENT_EVENTS) {
        println!("   {} [{:<5}] {}", event.time, event.level.as_str(), event.message);
    }

    println!("\n📊 Metrics:");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
