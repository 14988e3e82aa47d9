//! Cross-Domain Relay
//!
//! Runs a pair of in-memory messengers and relays messages between them in both
//! directions.
//!
//! ## Overview
//!
//! The relay:
//! 1. Builds the two domains described in the configuration and initializes
//!    their messengers
//! 2. Sends the configured bootstrap messages
//! 3. Watches both messengers for `SentMessage` events and delivers them to the
//!    other side, replaying failed messages when enabled

use alloy_primitives::U256;
use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use xdomain_messenger::config::{decode_hex_payload, parse_address, Config};
use xdomain_messenger::{
    CallContext, CrossDomainMessenger, Domain, MessageRelayService, MessageRelayServiceConfig,
    RecordingExecutor, SharedDomain,
};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs both relay directions.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Builds and initializes both domains
/// 4. Sends bootstrap messages
/// 5. Runs the relays until ctrl-c
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Cross-Domain Relay");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Cross-Domain Relay");
        println!();
        println!("Usage: xdomain-relay [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  XDOMAIN_RELAY_CONFIG_PATH    Path to config file (default: config/xdomain-relay.toml)");
        println!("  RUST_LOG                     Log filter (default: info)");
        return Ok(());
    }

    let mut config_path = None;
    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var("XDOMAIN_RELAY_CONFIG_PATH", &path);
        info!("Using custom config: {}", path);
    }

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let (source, destination) = build_domains(&config)?;
    send_bootstrap_messages(&config, &source, &destination).await?;

    let relay_config = MessageRelayServiceConfig::from_config(&config)?;
    let forward = MessageRelayService::new(relay_config.clone(), source.clone(), destination.clone());
    let backward = MessageRelayService::new(relay_config, destination, source);

    info!("Relays initialized successfully");

    tokio::select! {
        result = forward.run() => result,
        result = backward.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping relays");
            Ok(())
        }
    }
}

/// Builds and initializes the source and destination domains.
fn build_domains(
    config: &Config,
) -> Result<(SharedDomain<RecordingExecutor>, SharedDomain<RecordingExecutor>)> {
    let (source_settings, destination_settings) = config.messenger_settings()?;

    let mut source_messenger = CrossDomainMessenger::new(source_settings);
    source_messenger.initialize()?;
    let mut destination_messenger = CrossDomainMessenger::new(destination_settings);
    destination_messenger.initialize()?;

    let source = Domain::new(
        config.source.name.clone(),
        config.source.chain_id,
        source_messenger,
        RecordingExecutor::new(),
    );
    let destination = Domain::new(
        config.destination.name.clone(),
        config.destination.chain_id,
        destination_messenger,
        RecordingExecutor::new(),
    );

    info!(
        "Domains ready: {} (chain {}) <-> {} (chain {})",
        source.name, source.chain_id, destination.name, destination.chain_id
    );

    Ok((source.into_shared(), destination.into_shared()))
}

async fn send_bootstrap_messages(
    config: &Config,
    source: &SharedDomain<RecordingExecutor>,
    destination: &SharedDomain<RecordingExecutor>,
) -> Result<()> {
    for message in &config.bootstrap {
        let domain = if message.from == config.source.name {
            source
        } else {
            destination
        };

        let ctx = CallContext::new(parse_address(&message.sender)?, U256::from(message.value));
        let target = parse_address(&message.target)?;
        let payload = decode_hex_payload(&message.payload)?;

        match domain
            .write()
            .await
            .send(&ctx, target, payload, message.min_gas_limit)
        {
            Ok(receipt) => info!(
                "Bootstrap message from {}: hash={}, gas_limit={}",
                message.from, receipt.msg_hash, receipt.gas_limit
            ),
            Err(e) => warn!("Bootstrap message from {} rejected: {}", message.from, e),
        }
    }
    Ok(())
}
