//! Straddle Vault - Main Entry Point
//!
//! Runs one command against a paper deployment of the vault, strategy and
//! options market. State is kept in a JSON file between invocations.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use straddle_vault::config::{load_config, AppConfig};
use straddle_vault::paper::{PaperEnvironment, StateStore};
use straddle_vault::{Address, StraddleError, StraddlePosition, StrikeId, VaultBalances};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Path to the paper state file, overrides the config file
    #[arg(long)]
    state: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List live strikes with call and put cost per contract
    Strikes,
    /// Collateral needed for a straddle
    Quote {
        #[arg(long)]
        strike: u64,
        /// Fixed-point contract amount (18 decimals)
        #[arg(long)]
        amount: u128,
    },
    /// Open a straddle funded by the vault
    Buy {
        #[arg(long)]
        strike: u64,
        /// Fixed-point contract amount (18 decimals)
        #[arg(long)]
        amount: u128,
        /// Upper bound on collateral spent
        #[arg(long)]
        max_cost: Decimal,
    },
    /// Close both legs of a round
    Close {
        #[arg(long)]
        round: u64,
    },
    /// Show a recorded round and the owners of its legs
    Position {
        #[arg(long)]
        round: u64,
    },
    /// Show vault balances
    Balances,
    /// Register or revoke the strategy as a trusted fee counter
    Trust {
        #[arg(long, action = ArgAction::Set)]
        trusted: bool,
    },
    /// Advance market time
    FastForward {
        #[arg(long)]
        seconds: i64,
    },
    /// Discard the persisted state
    Reset,
}

/// Round as printed by `buy`, `close` and `position`
///
/// Serialized directly; u128 amounts overflow `serde_json::Value`.
#[derive(Serialize)]
struct PositionReport {
    position: StraddlePosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_owner: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    put_owner: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault: Option<VaultBalances>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = match load_config(Some(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_tracing(&log_level, args.json_logs)?;

    let state_path = args
        .state
        .clone()
        .unwrap_or_else(|| config.settings.state_path.clone());
    info!(config = %args.config, state = %state_path, "Starting straddle vault");

    let store = StateStore::new(state_path);
    match run(args.command, &config, &store).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            if e.requires_operator() {
                error!(error = %e, "Manual reconciliation required");
            } else {
                error!(error = %e, "Command failed");
            }
            eprintln!("error: {}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries command output
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn run(command: Command, config: &AppConfig, store: &StateStore) -> straddle_vault::Result<()> {
    if let Command::Reset = command {
        store.clear()?;
        return print_json(&json!({ "reset": store.path() }));
    }

    let env = match store.load()? {
        Some(snapshot) => PaperEnvironment::restore(config, snapshot).await?,
        None => PaperEnvironment::bootstrap(config).await?,
    };

    let outcome = execute(command, &env).await;
    // failed commands can still move funds through compensation
    store.save(&env.snapshot().await)?;
    outcome
}

async fn execute(command: Command, env: &PaperEnvironment) -> straddle_vault::Result<()> {
    let owner = env.owner();

    match command {
        Command::Strikes => print_json(&env.strikes().await?),
        Command::Quote { strike, amount } => {
            print_json(&env.vault.quote_cost(StrikeId(strike), amount).await?)
        }
        Command::Buy {
            strike,
            amount,
            max_cost,
        } => {
            let position = env
                .vault
                .buy_straddle(&owner, StrikeId(strike), amount, max_cost)
                .await?;
            let (call_owner, put_owner) = env.vault.position_owners(position.round_index).await?;
            print_json(&PositionReport {
                position,
                call_owner: Some(call_owner),
                put_owner: Some(put_owner),
                vault: Some(env.vault.balances().await?),
            })
        }
        Command::Close { round } => {
            let position = env.vault.close_straddle(&owner, round).await?;
            print_json(&PositionReport {
                position,
                call_owner: None,
                put_owner: None,
                vault: Some(env.vault.balances().await?),
            })
        }
        Command::Position { round } => {
            let position = env.vault.view_position(round).await?;
            let (call_owner, put_owner) = env.vault.position_owners(round).await?;
            print_json(&PositionReport {
                position,
                call_owner: Some(call_owner),
                put_owner: Some(put_owner),
                vault: None,
            })
        }
        Command::Balances => print_json(&env.vault.balances().await?),
        Command::Trust { trusted } => {
            let changed = env.set_strategy_trusted(trusted).await?;
            print_json(&json!({ "trusted": trusted, "changed": changed }))
        }
        Command::FastForward { seconds } => {
            let now = env.market.fast_forward(seconds).await?;
            print_json(&json!({ "now": now }))
        }
        Command::Reset => Err(StraddleError::Internal("reset handled before state load".into())),
    }
}

fn print_json<T: Serialize>(value: &T) -> straddle_vault::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
