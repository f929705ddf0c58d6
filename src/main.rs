// src/main.rs
//
// CLI shell for the trading core: loads config, authenticates the session
// (prompting for a verification code when the venue challenges), selects the
// balance, and runs the execution coordinator until Ctrl+C.

use bandbot::catalog::AssetCatalog;
use bandbot::config::{default_config_template, Config};
use bandbot::connection::{HttpAuth, SessionState, VenueClient, WsConnector};
use bandbot::executor::{Executor, StatusUpdate};
use bandbot::models::Credentials;
use bandbot::traits::SharedVenue;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

#[derive(Parser)]
#[command(name = "bandbot")]
#[command(about = "Bollinger-band binary options bot")]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(long, short)]
    config: Option<String>,

    /// Generate a default configuration file
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.generate_config {
        println!("{}", default_config_template());
        return;
    }

    let config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                eprintln!("Use --generate-config to create a template.");
                std::process::exit(1);
            }
        },
        None => {
            println!("No config file specified, running with defaults.");
            Config::default()
        }
    };

    let credentials = match credentials_from_env() {
        Some(c) => c,
        None => {
            eprintln!("BANDBOT_IDENTIFIER and BANDBOT_SECRET must be set.");
            std::process::exit(1);
        }
    };

    println!("Connecting ({} balance)...", config.account.balance_mode);
    let connector = Arc::new(WsConnector::new(config.connection.ws_url.clone()));
    let auth = Arc::new(HttpAuth::new(
        config.connection.login_url.clone(),
        config.connection.verify_url.clone(),
    ));
    let client = VenueClient::spawn(
        connector,
        auth,
        credentials,
        config.connection.connection_config(),
    );

    spawn_verification_prompt(client.clone());

    if let Err(e) = client.wait_connected().await {
        eprintln!("Connection failed: {}", e);
        std::process::exit(1);
    }
    println!("Connected.");

    match client.change_balance_mode(config.account.balance_mode).await {
        Ok(balance) => println!(
            "Trading {} balance: {:.2}",
            config.account.balance_mode, balance
        ),
        Err(e) => {
            eprintln!("Failed to select balance: {}", e);
            std::process::exit(1);
        }
    }

    let venue: SharedVenue = Arc::new(client.clone());
    let catalog = Arc::new(AssetCatalog::new(
        venue.clone(),
        config.strategy.min_payout_pct,
        config.strategy.candle_period_seconds,
    ));
    let (status_tx, status_rx) = mpsc::channel(64);
    tokio::spawn(render_status(status_rx));

    let executor = Executor::new(venue, catalog, config.strategy.executor_config(), status_tx);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::select! {
        result = executor.run(shutdown_rx.clone()) => {
            if let Err(e) = result {
                eprintln!("Executor stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
            let _ = shutdown_tx.send(true);
        }
    }

    client.disconnect().await;
}

fn credentials_from_env() -> Option<Credentials> {
    let identifier = std::env::var("BANDBOT_IDENTIFIER").ok()?;
    let secret = std::env::var("BANDBOT_SECRET").ok()?;
    if identifier.is_empty() || secret.is_empty() {
        return None;
    }
    Some(Credentials::new(identifier, secret))
}

/// Reads verification codes from stdin whenever the session is waiting for
/// one. A rejected code leaves the session waiting, so the prompt repeats.
fn spawn_verification_prompt(client: VenueClient) {
    tokio::spawn(async move {
        let mut state_rx = client.state_watch();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            while *state_rx.borrow() != SessionState::AwaitingVerificationCode {
                if state_rx.changed().await.is_err() {
                    return;
                }
            }
            println!("Verification code required. Enter code:");
            let code = match lines.next_line().await {
                Ok(Some(line)) => line.trim().to_string(),
                _ => return,
            };
            if code.is_empty() {
                continue;
            }
            match client.submit_verification_code(&code).await {
                Ok(()) => println!("Code accepted."),
                Err(e) => println!("Code not accepted ({}), try again.", e),
            }
        }
    });
}

async fn render_status(mut status_rx: mpsc::Receiver<StatusUpdate>) {
    while let Some(update) = status_rx.recv().await {
        match update {
            StatusUpdate::Watching { symbol } => println!("[{}] watching", symbol),
            StatusUpdate::TradePlaced {
                symbol,
                direction,
                stake,
                level,
                order_id,
            } => println!(
                "[{}] placed {} for {:.2} (level {}, order {})",
                symbol, direction, stake, level, order_id
            ),
            StatusUpdate::TradeSettled {
                symbol,
                outcome,
                profit,
                balance,
            } => match balance {
                Some(balance) => println!(
                    "[{}] {} {:+.2} (balance {:.2})",
                    symbol, outcome, profit, balance
                ),
                None => println!("[{}] {} {:+.2}", symbol, outcome, profit),
            },
            StatusUpdate::OtcSubstituted {
                requested,
                substituted,
            } => println!("[{}] closed, trading {} instead", requested, substituted),
            StatusUpdate::CapReached { symbol } => {
                println!("[{}] daily trade cap reached", symbol)
            }
        }
    }
}
