//! Top-up terminal
//!
//! Runs one top-up session against the configured services, reading screen
//! events from stdin and printing the screen effects to stdout.

mod commands;
mod config;
mod shutdown;

use clap::Parser;
use commands::{Command, HELP, parse_command};
use config::{ConfigLoader, LoadedConfig};
use shutdown::shutdown_signal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use topup_core::events::ui_effect_channel;
use topup_core::processors::{ConversionService, PaymentOrchestrator, TopUpServices, TopUpSession};
use topup_core::services::{
    DefaultWallet, InMemoryRateCache, JsonFileRateCache, RatePersistence, RemoteBonusService,
    WalletResolver,
};
use topup_sdk::client::{BrokerClient, GamificationClient, PartnerClient, PaymentClient};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Top up an APPC wallet from the terminal
#[derive(Parser, Debug)]
#[command(name = "topup")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./topup-config.toml")]
    config: PathBuf,

    /// Package name of the app the top-up is made from
    #[arg(short, long, default_value = "com.appcoins.wallet")]
    package: String,

    /// Override the wallet address from the configuration file
    #[arg(short, long, env = "TOPUP_WALLET")]
    wallet: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting topup v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::new(&args.config, args.wallet)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let return_url = config.return_url.clone();
    let top_up_config = config.top_up.clone();
    let services = build_services(config).await?;

    let (effects_tx, mut effects_rx) = ui_effect_channel();
    let session = TopUpSession::new(
        services,
        top_up_config,
        args.package,
        tokio::runtime::Handle::current(),
    );
    let handle = session.start(effects_tx);
    let events = handle.events();
    tracing::info!(session_id = %handle.id(), "Session started");
    println!("{HELP}");

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            Some(effect) = effects_rx.recv() => {
                println!("> {effect}");
            }

            line = lines.next() => {
                let line = match line {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Failed to read stdin");
                        break;
                    }
                    None => break,
                };
                match parse_command(&line, &return_url) {
                    Ok(None) => {}
                    Ok(Some(Command::Help)) => println!("{HELP}"),
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Event(event))) => {
                        if events.send(event).await.is_err() {
                            tracing::warn!("Session stopped, exiting");
                            break;
                        }
                    }
                    Err(e) => println!("! {e}"),
                }
            }
        }
    }

    drop(events);
    handle.teardown().await;
    tracing::info!("Session torn down");
    Ok(())
}

async fn build_services(config: LoadedConfig) -> anyhow::Result<TopUpServices> {
    let endpoints = config.endpoints;
    let wallet: Arc<dyn WalletResolver> = Arc::new(DefaultWallet::new(config.wallet));
    if wallet.find_default().await.is_err() {
        tracing::warn!("No wallet configured, payments will fail");
    }

    let cache: Arc<dyn RatePersistence> = match config.cache_path {
        Some(path) => {
            let cache = JsonFileRateCache::open(path).await?;
            tracing::info!("Rate cache at {:?}", cache.path());
            Arc::new(cache)
        }
        None => Arc::new(InMemoryRateCache::new()),
    };

    let payments = Arc::new(PaymentClient::new(endpoints.payment));
    let conversion =
        ConversionService::new(Arc::new(BrokerClient::new(endpoints.broker))).with_cache(cache);
    let bonus = Arc::new(RemoteBonusService::new(
        GamificationClient::new(endpoints.gamification),
        wallet.clone(),
    ));
    let orchestrator = PaymentOrchestrator::new(
        wallet,
        Arc::new(PartnerClient::new(endpoints.partner)),
        payments.clone(),
    );

    Ok(TopUpServices {
        conversion,
        payments: payments.clone(),
        limits: payments,
        bonus,
        orchestrator,
    })
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr so they do not interleave with the printed effects.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
