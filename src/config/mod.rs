//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the relay binary.
//! Configuration includes the two messenger domains, messenger settings, relay
//! service tuning and optional bootstrap messages.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::messenger::{MessengerSettings, MESSAGE_VERSION};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - Settings shared by both messengers (message version, admin, blocked targets)
/// - The source and destination domains
/// - Relay service polling and retry behaviour
/// - Messages sent on startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Settings applied to both messengers
    pub messenger: MessengerConfig,
    /// First domain (e.g. L1)
    pub source: DomainConfig,
    /// Second domain (e.g. L2)
    pub destination: DomainConfig,
    /// Relay service configuration
    pub relay: RelayConfig,
    /// Messages sent once on startup
    #[serde(default)]
    pub bootstrap: Vec<BootstrapMessage>,
}

/// Settings shared by the messengers of both domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// Version stamped into sent nonces (0 = legacy, 1 = current)
    #[serde(default = "default_message_version")]
    pub message_version: u16,
    /// Admin allowed to pause and unpause the messengers
    pub admin: String,
    /// Extra addresses relayed messages may never target
    #[serde(default)]
    pub blocked_targets: Vec<String>,
}

fn default_message_version() -> u16 {
    MESSAGE_VERSION
}

/// Configuration for one execution domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Human-readable name for the domain
    pub name: String,
    /// Unique chain identifier
    pub chain_id: u64,
    /// Address of the messenger on this domain
    pub messenger_addr: String,
    /// Address the counterpart messenger delivers from on this domain.
    /// Defaults to the counterpart's messenger address.
    #[serde(default)]
    pub other_messenger_addr: Option<String>,
}

/// Relay service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Polling interval for event monitoring in milliseconds
    pub polling_interval_ms: u64,
    /// Gas added on top of baseGas for first deliveries
    #[serde(default)]
    pub gas_headroom: u64,
    /// Replay failed messages on later polls
    #[serde(default)]
    pub retry_failed: bool,
    /// Gas multiplier applied to replays
    #[serde(default = "default_retry_gas_multiplier")]
    pub retry_gas_multiplier: u64,
    /// Maximum replays per message (unset = unlimited)
    #[serde(default)]
    pub max_retry_attempts: Option<u32>,
    /// Address used to submit replays
    pub operator: String,
}

fn default_retry_gas_multiplier() -> u64 {
    2
}

/// A message sent on startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapMessage {
    /// Name of the domain the message is sent from
    pub from: String,
    /// Sender address on that domain
    pub sender: String,
    /// Target address on the other domain
    pub target: String,
    /// Payload (hex encoded, 0x prefix optional)
    #[serde(default)]
    pub payload: String,
    /// Minimum gas limit for the call on the other domain
    pub min_gas_limit: u32,
    /// Native value attached (decimal)
    #[serde(default)]
    pub value: u64,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - The two domains have distinct chain IDs and messenger addresses
    /// - All addresses parse
    /// - The message version is 0 or 1
    /// - The polling interval is non-zero
    /// - Bootstrap messages name a configured domain
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - Validation failed
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.chain_id == self.destination.chain_id {
            return Err(anyhow::anyhow!(
                "Configuration error: source and destination domains have the same chain ID {}. Each domain must have a unique chain ID.",
                self.source.chain_id
            ));
        }

        let source_addr = parse_address(&self.source.messenger_addr)?;
        let destination_addr = parse_address(&self.destination.messenger_addr)?;
        if source_addr == destination_addr {
            return Err(anyhow::anyhow!(
                "Configuration error: source and destination messengers share address {}",
                source_addr
            ));
        }

        if self.messenger.message_version > 1 {
            return Err(anyhow::anyhow!(
                "Configuration error: message_version must be 0 or 1, got {}",
                self.messenger.message_version
            ));
        }

        if self.relay.polling_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: polling_interval_ms must be greater than zero"
            ));
        }

        // Surface bad addresses at load time rather than at startup
        self.messenger_settings()?;
        parse_address(&self.relay.operator)?;

        for message in &self.bootstrap {
            if message.from != self.source.name && message.from != self.destination.name {
                return Err(anyhow::anyhow!(
                    "Configuration error: bootstrap message from unknown domain '{}'",
                    message.from
                ));
            }
            parse_address(&message.sender)?;
            parse_address(&message.target)?;
            decode_hex_payload(&message.payload)?;
        }

        Ok(())
    }

    /// Builds the messenger settings of `(source, destination)`.
    pub fn messenger_settings(&self) -> anyhow::Result<(MessengerSettings, MessengerSettings)> {
        let admin = parse_address(&self.messenger.admin)?;
        let blocked_targets = self
            .messenger
            .blocked_targets
            .iter()
            .map(|a| parse_address(a))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let source_addr = parse_address(&self.source.messenger_addr)?;
        let destination_addr = parse_address(&self.destination.messenger_addr)?;

        let build = |own: &DomainConfig, address: Address, counterpart: Address| {
            let other_messenger = match &own.other_messenger_addr {
                Some(addr) => parse_address(addr)?,
                None => counterpart,
            };
            Ok::<_, anyhow::Error>(MessengerSettings {
                address,
                other_messenger,
                admin,
                message_version: self.messenger.message_version,
                blocked_targets: blocked_targets.clone(),
            })
        };

        Ok((
            build(&self.source, source_addr, destination_addr)?,
            build(&self.destination, destination_addr, source_addr)?,
        ))
    }

    /// Loads configuration from the TOML file.
    ///
    /// This function:
    /// 1. Checks if config/xdomain-relay.toml (or XDOMAIN_RELAY_CONFIG_PATH) exists
    /// 2. If it exists, loads and parses the configuration
    /// 3. Validates the configuration
    /// 4. If it doesn't exist, returns an error asking user to copy template
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - Failed to load configuration, file doesn't exist, or validation failed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("XDOMAIN_RELAY_CONFIG_PATH")
            .unwrap_or_else(|_| "config/xdomain-relay.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/xdomain-relay.template.toml config/xdomain-relay.toml\n\
                Then edit config/xdomain-relay.toml with your actual values.",
                config_path
            ))
        }
    }
}

impl Default for Config {
    /// Local two-domain devnet with placeholder addresses.
    fn default() -> Self {
        Self {
            messenger: MessengerConfig {
                message_version: MESSAGE_VERSION,
                admin: "0x00000000000000000000000000000000000000ad".to_string(),
                blocked_targets: Vec::new(),
            },
            source: DomainConfig {
                name: "l1".to_string(),
                chain_id: 900,
                messenger_addr: "0x4200000000000000000000000000000000000001".to_string(),
                other_messenger_addr: None,
            },
            destination: DomainConfig {
                name: "l2".to_string(),
                chain_id: 901,
                messenger_addr: "0x4200000000000000000000000000000000000007".to_string(),
                other_messenger_addr: None,
            },
            relay: RelayConfig {
                polling_interval_ms: 2000,
                gas_headroom: 0,
                retry_failed: true,
                retry_gas_multiplier: default_retry_gas_multiplier(),
                max_retry_attempts: Some(5),
                operator: "0x00000000000000000000000000000000000000fe".to_string(),
            },
            bootstrap: Vec::new(),
        }
    }
}

/// Parses a 0x-prefixed 20-byte hex address.
pub fn parse_address(addr: &str) -> anyhow::Result<Address> {
    addr.parse::<Address>()
        .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", addr, e))
}

/// Decodes a hex payload, with or without 0x prefix.
pub fn decode_hex_payload(payload: &str) -> anyhow::Result<Vec<u8>> {
    let clean = payload.strip_prefix("0x").unwrap_or(payload);
    hex::decode(clean).map_err(|e| anyhow::anyhow!("Invalid hex payload '{}': {}", payload, e))
}
