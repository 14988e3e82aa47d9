//! Message Relay Service
//!
//! Watches a source domain for `SentMessage` events and delivers the envelopes
//! to the messenger of the destination domain.
//!
//! ## Architecture
//!
//! The relay:
//! 1. Polls the source messenger's event journal from the last processed position
//! 2. Delivers each new envelope as the counterpart messenger, attaching
//!    `baseGas` plus a configurable headroom
//! 3. Optionally replays envelopes whose relay was recorded as failed, through
//!    the public replay path with a larger gas budget
//!
//! Replay protection is enforced by the destination messenger. The service keeps
//! no record of delivered envelopes: a duplicate submission comes back as
//! `AlreadyRelayed` and is counted as skipped.

use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::SharedDomain;
use crate::envelope::Envelope;
use crate::error::MessengerError;
use crate::events::MessengerEvent;
use crate::executor::CallExecutor;
use crate::gas;
use crate::messenger::{RelayContext, RelayOutcome};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for one relay direction.
#[derive(Debug, Clone)]
pub struct MessageRelayServiceConfig {
    /// Polling interval in milliseconds
    pub polling_interval_ms: u64,
    /// Gas added on top of `baseGas` for first deliveries
    pub gas_headroom: u64,
    /// Whether failed envelopes are replayed on later polls
    pub retry_failed: bool,
    /// Replays attach `(baseGas + headroom) * retry_gas_multiplier`
    pub retry_gas_multiplier: u64,
    /// Maximum replays per envelope (None = unlimited)
    pub max_retry_attempts: Option<u32>,
    /// Identity used for replays on the destination domain
    pub operator: Address,
}

impl MessageRelayServiceConfig {
    /// Create relay config from main config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let operator = config
            .relay
            .operator
            .parse::<Address>()
            .context("Invalid relay operator address")?;

        Ok(Self {
            polling_interval_ms: config.relay.polling_interval_ms,
            gas_headroom: config.relay.gas_headroom,
            retry_failed: config.relay.retry_failed,
            retry_gas_multiplier: config.relay.retry_gas_multiplier.max(1),
            max_retry_attempts: config.relay.max_retry_attempts,
            operator,
        })
    }

    fn delivery_gas(&self, envelope: &Envelope) -> u64 {
        let min_gas_limit = u32::try_from(envelope.min_gas_limit).unwrap_or(u32::MAX);
        gas::base_gas(envelope.payload.len(), min_gas_limit).saturating_add(self.gas_headroom)
    }

    fn replay_gas(&self, envelope: &Envelope) -> u64 {
        self.delivery_gas(envelope)
            .saturating_mul(self.retry_gas_multiplier)
    }
}

// ============================================================================
// RELAY STATE
// ============================================================================

#[derive(Debug, Clone)]
struct PendingReplay {
    envelope: Envelope,
    attempts: u32,
}

/// Internal state for tracking processed messages.
#[derive(Debug, Default)]
struct RelayState {
    /// Position in the source event journal up to which events were processed
    event_cursor: usize,
    /// Envelopes whose last attempt failed and that still have replays left
    pending_replays: HashMap<B256, PendingReplay>,
}

/// Counters for a single poll.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub relayed: usize,
    pub failed: usize,
    pub rejected: usize,
    pub skipped: usize,
}

// ============================================================================
// MESSAGE RELAY SERVICE
// ============================================================================

/// Relays envelopes from a source domain to a destination domain.
pub struct MessageRelayService<S: CallExecutor, D: CallExecutor> {
    config: MessageRelayServiceConfig,
    source: SharedDomain<S>,
    destination: SharedDomain<D>,
    state: Arc<RwLock<RelayState>>,
}

impl<S: CallExecutor, D: CallExecutor> MessageRelayService<S, D> {
    pub fn new(
        config: MessageRelayServiceConfig,
        source: SharedDomain<S>,
        destination: SharedDomain<D>,
    ) -> Self {
        Self {
            config,
            source,
            destination,
            state: Arc::new(RwLock::new(RelayState::default())),
        }
    }

    /// Start the relay service (blocking).
    pub async fn run(&self) -> Result<()> {
        let (source_name, destination_name) = {
            let source = self.source.read().await;
            let destination = self.destination.read().await;
            (source.name.clone(), destination.name.clone())
        };
        info!(
            "Starting message relay {} -> {}: polling_interval={}ms",
            source_name, destination_name, self.config.polling_interval_ms
        );

        let interval = Duration::from_millis(self.config.polling_interval_ms);

        loop {
            match self.poll_once().await {
                Ok(summary) if summary != PollSummary::default() => {
                    info!(
                        "Relay {} -> {}: relayed={}, failed={}, rejected={}, skipped={}",
                        source_name,
                        destination_name,
                        summary.relayed,
                        summary.failed,
                        summary.rejected,
                        summary.skipped
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Error polling {}: {:#}", source_name, e),
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Processes new source events, then pending replays.
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let mut summary = PollSummary::default();

        let envelopes = self.fetch_new_envelopes().await;
        if !envelopes.is_empty() {
            debug!("Found {} new SentMessage events", envelopes.len());
        }

        for envelope in envelopes {
            let ctx = {
                let destination = self.destination.read().await;
                RelayContext::new(
                    destination.messenger.other_messenger(),
                    envelope.value,
                    self.config.delivery_gas(&envelope),
                )
            };
            self.submit(&ctx, envelope, 0, &mut summary).await;
        }

        if self.config.retry_failed {
            self.replay_failed(&mut summary).await;
        }

        Ok(summary)
    }

    /// Number of envelopes waiting for a replay.
    pub async fn pending_replays(&self) -> usize {
        self.state.read().await.pending_replays.len()
    }

    /// Whether `msg_hash` has been relayed successfully on the destination domain.
    pub async fn is_delivered(&self, msg_hash: &B256) -> bool {
        self.destination
            .read()
            .await
            .messenger
            .successful_messages(msg_hash)
    }

    async fn fetch_new_envelopes(&self) -> Vec<Envelope> {
        let source = self.source.read().await;
        let mut state = self.state.write().await;

        let envelopes = source
            .messenger
            .events_since(state.event_cursor)
            .iter()
            .filter_map(|event| match event {
                MessengerEvent::SentMessage { envelope } => Some(envelope.clone()),
                _ => None,
            })
            .collect();
        state.event_cursor = source.messenger.event_count();
        envelopes
    }

    async fn replay_failed(&self, summary: &mut PollSummary) {
        let pending: Vec<PendingReplay> = self
            .state
            .read()
            .await
            .pending_replays
            .values()
            .cloned()
            .collect();

        for replay in pending {
            let ctx = RelayContext::new(
                self.config.operator,
                U256::ZERO,
                self.config.replay_gas(&replay.envelope),
            );
            self.submit(&ctx, replay.envelope, replay.attempts, summary)
                .await;
        }
    }

    /// Submits one relay attempt and updates the bookkeeping. `attempts` is the
    /// number of earlier attempts for this envelope.
    async fn submit(
        &self,
        ctx: &RelayContext,
        envelope: Envelope,
        attempts: u32,
        summary: &mut PollSummary,
    ) {
        let result = {
            let mut destination = self.destination.write().await;
            destination.relay(ctx, &envelope)
        };

        let mut state = self.state.write().await;
        match result {
            Ok(RelayOutcome::Relayed { msg_hash }) => {
                info!("Delivered message {} (nonce={})", msg_hash, envelope.nonce);
                state.pending_replays.remove(&msg_hash);
                summary.relayed += 1;
            }
            Ok(RelayOutcome::Failed { msg_hash, reason }) => {
                warn!(
                    "Relay of message {} failed (attempt {}): {}",
                    msg_hash,
                    attempts + 1,
                    reason
                );
                summary.failed += 1;

                let attempts = attempts + 1;
                let exhausted = self
                    .config
                    .max_retry_attempts
                    .is_some_and(|max| attempts > max);
                if !self.config.retry_failed {
                    state.pending_replays.remove(&msg_hash);
                } else if exhausted {
                    warn!(
                        "Giving up on message {} after {} attempts; it stays replayable on the destination",
                        msg_hash, attempts
                    );
                    state.pending_replays.remove(&msg_hash);
                } else {
                    state
                        .pending_replays
                        .insert(msg_hash, PendingReplay { envelope, attempts });
                }
            }
            Err(MessengerError::AlreadyRelayed(msg_hash)) => {
                debug!("Message {} already relayed", msg_hash);
                state.pending_replays.remove(&msg_hash);
                summary.skipped += 1;
            }
            Err(e) => {
                error!("Relay of message nonce={} rejected: {}", envelope.nonce, e);
                state.pending_replays.remove(&envelope.hash());
                summary.rejected += 1;
            }
        }
    }
}
