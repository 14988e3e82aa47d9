//! Cross-Domain Messenger
//!
//! One messenger instance lives on each domain. It plays two roles:
//!
//! 1. **Sender**: wraps application calls into versioned envelopes, allocates
//!    nonces and emits `SentMessage` for the transport.
//! 2. **Relayer**: executes envelopes that originated on the other domain,
//!    keeping a replay-protection record keyed by the envelope hash.
//!
//! ## Relay state machine
//!
//! Per envelope hash: `Unseen -> Failed -> Succeeded`. `Failed` may repeat any
//! number of times; `Succeeded` is terminal. Failed inner calls do not abort
//! the relay: the attempt is recorded and can be replayed later.
//!
//! ## Reentrancy
//!
//! The cross-domain sender is not stored on the messenger. It travels with the
//! call as a [`RelayScope`]; a relay attempted from inside another relay must
//! carry that scope in its [`RelayContext`] and is recorded as failed.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::encoding::{encode_relay_message_call, encode_versioned_nonce};
use crate::envelope::{Envelope, MessageVersion};
use crate::error::{MessengerError, Result};
use crate::events::MessengerEvent;
use crate::executor::{CallExecutor, CallOutcome, InnerCall, RelayScope};
use crate::gas::{self, GasMeter};
use crate::store::{InMemoryRelayLedger, RelayLedger, RelayRecord, RelayState};

/// Version of envelopes produced by default.
pub const MESSAGE_VERSION: u16 = 1;

/// Version reported by the `Initialized` event.
pub const INITIALIZER_VERSION: u8 = 1;

// ============================================================================
// SETTINGS AND CALL CONTEXTS
// ============================================================================

/// Static configuration of one messenger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessengerSettings {
    /// Address of this messenger on its own domain
    pub address: Address,
    /// Address the counterpart messenger delivers from, as seen on this domain
    pub other_messenger: Address,
    /// Account allowed to pause and unpause
    pub admin: Address,
    /// Version stamped into the nonce of every sent envelope (0 or 1)
    #[serde(default = "default_message_version")]
    pub message_version: u16,
    /// Extra system addresses that relayed messages may never target
    #[serde(default)]
    pub blocked_targets: Vec<Address>,
}

fn default_message_version() -> u16 {
    MESSAGE_VERSION
}

impl MessengerSettings {
    pub fn new(address: Address, other_messenger: Address, admin: Address) -> Self {
        Self {
            address,
            other_messenger,
            admin,
            message_version: MESSAGE_VERSION,
            blocked_targets: Vec::new(),
        }
    }
}

/// Caller and attached native value of a `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub value: U256,
}

impl CallContext {
    pub fn new(caller: Address, value: U256) -> Self {
        Self { caller, value }
    }
}

/// Caller, attached value and gas of a `relay_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayContext {
    pub caller: Address,
    pub value: U256,
    pub gas_limit: u64,
    estimation: bool,
    enclosing: Option<RelayScope>,
}

impl RelayContext {
    pub fn new(caller: Address, value: U256, gas_limit: u64) -> Self {
        Self {
            caller,
            value,
            gas_limit,
            estimation: false,
            enclosing: None,
        }
    }

    /// Marks this attempt as a gas estimation: failures surface as errors and
    /// nothing is recorded.
    pub fn for_estimation(mut self) -> Self {
        self.estimation = true;
        self
    }

    /// Marks this attempt as issued from inside the inner call of another relay.
    pub fn nested_in(mut self, scope: &RelayScope) -> Self {
        self.enclosing = Some(*scope);
        self
    }

    pub fn is_estimation(&self) -> bool {
        self.estimation
    }

    /// Cross-domain sender of the relay this context is nested in.
    pub fn x_domain_message_sender(&self) -> Result<Address> {
        self.enclosing
            .map(|scope| scope.x_domain_message_sender())
            .ok_or(MessengerError::XDomainMessageSenderNotSet)
    }
}

// ============================================================================
// RECEIPTS
// ============================================================================

/// Result of a successful `send_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub envelope: Envelope,
    pub msg_hash: B256,
    /// Gas limit the transport must attach on the receiving domain
    pub gas_limit: u64,
    /// ABI-encoded `relayMessage` call for the receiving messenger
    pub calldata: Bytes,
}

/// Why a relay attempt was recorded as failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Not enough gas left to guarantee the minimum gas limit to the call.
    InsufficientGas { gas_left: u64, min_gas_limit: u64 },
    /// Attempted from inside another relay's inner call.
    Reentrant,
    /// The inner call reverted.
    Reverted { reason: String },
    /// The inner call ran out of gas.
    OutOfGas,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InsufficientGas {
                gas_left,
                min_gas_limit,
            } => write!(
                f,
                "insufficient gas: {} left, min gas limit {}",
                gas_left, min_gas_limit
            ),
            FailureReason::Reentrant => write!(f, "reentrant relay"),
            FailureReason::Reverted { reason } => write!(f, "call reverted: {}", reason),
            FailureReason::OutOfGas => write!(f, "call ran out of gas"),
        }
    }
}

/// Result of a relay attempt that did not abort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelayOutcome {
    Relayed { msg_hash: B256 },
    Failed { msg_hash: B256, reason: FailureReason },
}

impl RelayOutcome {
    pub fn msg_hash(&self) -> B256 {
        match self {
            RelayOutcome::Relayed { msg_hash } | RelayOutcome::Failed { msg_hash, .. } => {
                *msg_hash
            }
        }
    }

    pub fn is_relayed(&self) -> bool {
        matches!(self, RelayOutcome::Relayed { .. })
    }
}

// ============================================================================
// CROSS-DOMAIN MESSENGER
// ============================================================================

/// Messenger for one domain.
#[derive(Debug)]
pub struct CrossDomainMessenger<L: RelayLedger = InMemoryRelayLedger> {
    settings: MessengerSettings,
    ledger: L,
    initialized: bool,
    paused: bool,
    msg_counter: u64,
    events: Vec<MessengerEvent>,
}

impl CrossDomainMessenger<InMemoryRelayLedger> {
    pub fn new(settings: MessengerSettings) -> Self {
        Self::with_ledger(settings, InMemoryRelayLedger::new())
    }
}

impl<L: RelayLedger> CrossDomainMessenger<L> {
    pub const RELAY_CONSTANT_OVERHEAD: u64 = gas::RELAY_CONSTANT_OVERHEAD;
    pub const MIN_GAS_DYNAMIC_OVERHEAD_NUMERATOR: u64 = gas::MIN_GAS_DYNAMIC_OVERHEAD_NUMERATOR;
    pub const MIN_GAS_DYNAMIC_OVERHEAD_DENOMINATOR: u64 = gas::MIN_GAS_DYNAMIC_OVERHEAD_DENOMINATOR;
    pub const MIN_GAS_CALLDATA_OVERHEAD: u64 = gas::MIN_GAS_CALLDATA_OVERHEAD;
    pub const RELAY_CALL_OVERHEAD: u64 = gas::RELAY_CALL_OVERHEAD;
    pub const RELAY_RESERVED_GAS: u64 = gas::RELAY_RESERVED_GAS;
    pub const RELAY_GAS_CHECK_BUFFER: u64 = gas::RELAY_GAS_CHECK_BUFFER;
    pub const MESSAGE_VERSION: u16 = MESSAGE_VERSION;

    pub fn with_ledger(settings: MessengerSettings, ledger: L) -> Self {
        Self {
            settings,
            ledger,
            initialized: false,
            paused: false,
            msg_counter: 0,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------------

    /// One-time initialization. Sending and relaying are rejected until it runs.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(MessengerError::AlreadyInitialized);
        }
        // Validate the configured version before accepting any traffic
        MessageVersion::try_from(self.settings.message_version)?;

        self.initialized = true;
        self.emit(MessengerEvent::Initialized {
            version: INITIALIZER_VERSION,
        });
        info!(
            "Messenger {} initialized: other_messenger={}, message_version={}",
            self.settings.address, self.settings.other_messenger, self.settings.message_version
        );
        Ok(())
    }

    pub fn pause(&mut self, caller: Address) -> Result<()> {
        self.ensure_admin(caller)?;
        self.paused = true;
        self.emit(MessengerEvent::Paused { account: caller });
        warn!("Messenger {} paused by {}", self.settings.address, caller);
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<()> {
        self.ensure_admin(caller)?;
        self.paused = false;
        self.emit(MessengerEvent::Unpaused { account: caller });
        info!("Messenger {} unpaused by {}", self.settings.address, caller);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sender
    // ------------------------------------------------------------------------

    /// Sends a message to `target` on the other domain.
    ///
    /// Fire-and-forget: the envelope is emitted as a `SentMessage` event and
    /// delivery is left to the transport. If the call always reverts on the
    /// other side, the message stays unrelayable and any value stays locked.
    ///
    /// # Arguments
    ///
    /// * `ctx`           - Caller and attached native value
    /// * `target`        - Recipient on the other domain
    /// * `message`       - Payload passed to the target
    /// * `min_gas_limit` - Minimum gas the target must be called with
    pub fn send_message(
        &mut self,
        ctx: &CallContext,
        target: Address,
        message: impl Into<Bytes>,
        min_gas_limit: u32,
    ) -> Result<SendReceipt> {
        self.ensure_live()?;

        let version = MessageVersion::try_from(self.settings.message_version)?;
        if version == MessageVersion::Legacy && !ctx.value.is_zero() {
            return Err(MessengerError::ValueMismatch {
                expected: U256::ZERO,
                actual: ctx.value,
            });
        }

        let next_counter = self
            .msg_counter
            .checked_add(1)
            .ok_or(MessengerError::NonceOverflow)?;

        let envelope = Envelope::new(
            self.message_nonce(),
            ctx.caller,
            target,
            ctx.value,
            min_gas_limit as u64,
            message,
        );
        let msg_hash = envelope.hash();
        let gas_limit = gas::base_gas(envelope.payload.len(), min_gas_limit);
        let calldata = encode_relay_message_call(
            envelope.nonce,
            envelope.sender,
            envelope.target,
            envelope.value,
            envelope.min_gas_limit,
            &envelope.payload,
        );

        self.msg_counter = next_counter;
        self.emit(MessengerEvent::SentMessage {
            envelope: envelope.clone(),
        });

        info!(
            "Sent message: nonce={}, sender={}, target={}, version={}, gas_limit={}",
            envelope.nonce, envelope.sender, envelope.target, version, gas_limit
        );

        Ok(SendReceipt {
            envelope,
            msg_hash,
            gas_limit,
            calldata: calldata.into(),
        })
    }

    // ------------------------------------------------------------------------
    // Relayer
    // ------------------------------------------------------------------------

    /// Relays an envelope that was sent by the counterpart messenger.
    ///
    /// Structural violations abort with an error and change no state. Once the
    /// envelope passes validation, an unsuccessful inner call is recorded as a
    /// failed attempt and returned as [`RelayOutcome::Failed`]; it can be
    /// replayed by anyone later, with more gas.
    ///
    /// # Arguments
    ///
    /// * `ctx`      - Caller, attached value and gas of this attempt
    /// * `envelope` - The envelope to relay
    /// * `executor` - Runs the inner call against the local domain
    pub fn relay_message<E: CallExecutor + ?Sized>(
        &mut self,
        ctx: &RelayContext,
        envelope: &Envelope,
        executor: &mut E,
    ) -> Result<RelayOutcome> {
        self.ensure_live()?;

        let version = envelope.version()?;

        // Legacy messages may already have been relayed under their old hash
        if version == MessageVersion::Legacy {
            let legacy_hash = envelope.legacy_hash();
            if self.ledger.record(&legacy_hash).successful {
                return Err(MessengerError::AlreadyRelayed(legacy_hash));
            }
        }

        let msg_hash = envelope.hash();
        let record = self.ledger.record(&msg_hash);
        if record.successful {
            return Err(MessengerError::AlreadyRelayed(msg_hash));
        }

        // Value is not checked mid-relay; the attempt is recorded as reentrant below.
        // Unseen envelopes still need the counterpart, nested or not.
        let nested = ctx.enclosing.is_some();
        if ctx.caller == self.settings.other_messenger {
            if !nested && ctx.value != envelope.value {
                return Err(MessengerError::ValueMismatch {
                    expected: envelope.value,
                    actual: ctx.value,
                });
            }
        } else {
            if !nested && !ctx.value.is_zero() {
                return Err(MessengerError::ValueMismatch {
                    expected: U256::ZERO,
                    actual: ctx.value,
                });
            }
            if !record.failed {
                return Err(MessengerError::MessageNotReplayable(msg_hash));
            }
        }

        if self.is_blocked_target(envelope.target) {
            return Err(MessengerError::ReservedTargetAddress(envelope.target));
        }

        let mut meter = GasMeter::new(ctx.gas_limit);
        meter.charge(gas::intrinsic_relay_gas(envelope.payload.len()));

        if nested {
            return self.record_failure(ctx, msg_hash, FailureReason::Reentrant);
        }
        if !meter.has_min_gas(envelope.min_gas_limit) {
            let reason = FailureReason::InsufficientGas {
                gas_left: meter.remaining(),
                min_gas_limit: envelope.min_gas_limit,
            };
            return self.record_failure(ctx, msg_hash, reason);
        }

        let scope = RelayScope::new(self.settings.address, envelope.sender, msg_hash);
        let call = InnerCall {
            target: envelope.target,
            value: envelope.value,
            gas_limit: meter.call_budget(),
            data: envelope.payload.clone(),
        };

        debug!(
            "Relaying message {}: target={}, call_gas={}",
            msg_hash, call.target, call.gas_limit
        );

        match executor.execute(&scope, &call) {
            CallOutcome::Succeeded { .. } => {
                self.ledger.mark_successful(msg_hash);
                self.emit(MessengerEvent::RelayedMessage { msg_hash });
                info!("Relayed message {}", msg_hash);
                Ok(RelayOutcome::Relayed { msg_hash })
            }
            CallOutcome::Reverted { reason } => {
                self.record_failure(ctx, msg_hash, FailureReason::Reverted { reason })
            }
            CallOutcome::OutOfGas => self.record_failure(ctx, msg_hash, FailureReason::OutOfGas),
        }
    }

    /// Gas a transport must attach to deliver a message of `message_len` bytes.
    pub fn base_gas(message_len: usize, min_gas_limit: u32) -> u64 {
        gas::base_gas(message_len, min_gas_limit)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn successful_messages(&self, msg_hash: &B256) -> bool {
        self.ledger.record(msg_hash).successful
    }

    pub fn failed_messages(&self, msg_hash: &B256) -> bool {
        self.ledger.record(msg_hash).failed
    }

    pub fn relay_record(&self, msg_hash: &B256) -> RelayRecord {
        self.ledger.record(msg_hash)
    }

    pub fn relay_state(&self, msg_hash: &B256) -> RelayState {
        self.ledger.state(msg_hash)
    }

    /// Nonce the next sent message will carry.
    pub fn message_nonce(&self) -> U256 {
        encode_versioned_nonce(self.msg_counter, self.settings.message_version)
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn address(&self) -> Address {
        self.settings.address
    }

    pub fn other_messenger(&self) -> Address {
        self.settings.other_messenger
    }

    pub fn settings(&self) -> &MessengerSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Events emitted at or after position `cursor`.
    pub fn events_since(&self, cursor: usize) -> &[MessengerEvent] {
        &self.events[cursor.min(self.events.len())..]
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_live(&self) -> Result<()> {
        if !self.initialized {
            return Err(MessengerError::NotInitialized);
        }
        if self.paused {
            return Err(MessengerError::Paused);
        }
        Ok(())
    }

    fn ensure_admin(&self, caller: Address) -> Result<()> {
        if caller != self.settings.admin {
            return Err(MessengerError::Unauthorized(caller));
        }
        Ok(())
    }

    fn is_blocked_target(&self, target: Address) -> bool {
        target == self.settings.address
            || target == self.settings.other_messenger
            || self.settings.blocked_targets.contains(&target)
    }

    fn record_failure(
        &mut self,
        ctx: &RelayContext,
        msg_hash: B256,
        reason: FailureReason,
    ) -> Result<RelayOutcome> {
        if ctx.estimation {
            return Err(MessengerError::EstimationFailed(reason));
        }
        self.ledger.mark_failed(msg_hash);
        self.emit(MessengerEvent::FailedRelayedMessage { msg_hash });
        warn!("Failed to relay message {}: {}", msg_hash, reason);
        Ok(RelayOutcome::Failed { msg_hash, reason })
    }

    fn emit(&mut self, event: MessengerEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;

    fn other() -> Address {
        Address::repeat_byte(0x0f)
    }

    fn messenger() -> CrossDomainMessenger {
        let mut m = CrossDomainMessenger::new(MessengerSettings::new(
            Address::repeat_byte(0xee),
            other(),
            Address::repeat_byte(0xad),
        ));
        m.initialize().unwrap();
        m
    }

    #[test]
    fn test_nested_context_exposes_sender() {
        let scope = RelayScope::new(Address::ZERO, Address::repeat_byte(0x01), B256::ZERO);
        let top = RelayContext::new(other(), U256::ZERO, 0);
        assert_eq!(
            top.x_domain_message_sender(),
            Err(MessengerError::XDomainMessageSenderNotSet)
        );
        let nested = top.nested_in(&scope);
        assert_eq!(nested.x_domain_message_sender(), Ok(Address::repeat_byte(0x01)));
    }

    #[test]
    fn test_estimation_does_not_record_failure() {
        let mut m = messenger();
        let envelope = Envelope::new(
            encode_versioned_nonce(0, 1),
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            U256::ZERO,
            1_000_000,
            Bytes::new(),
        );
        let ctx = RelayContext::new(other(), U256::ZERO, 10_000).for_estimation();
        let err = m
            .relay_message(&ctx, &envelope, &mut RecordingExecutor::new())
            .unwrap_err();
        assert!(matches!(
            err,
            MessengerError::EstimationFailed(FailureReason::InsufficientGas { .. })
        ));
        assert_eq!(m.relay_state(&envelope.hash()), RelayState::Unseen);
        assert_eq!(m.event_count(), 1, "only the Initialized event");
    }

    #[test]
    fn test_failed_outcome_json_shape() {
        let outcome = RelayOutcome::Failed {
            msg_hash: B256::repeat_byte(0x01),
            reason: FailureReason::Reverted {
                reason: "nope".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"]["kind"], "reverted");
        assert_eq!(json["reason"]["reason"], "nope");

        let back: RelayOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_failure_reason_display() {
        let reason = FailureReason::Reverted {
            reason: "nope".to_string(),
        };
        assert_eq!(reason.to_string(), "call reverted: nope");
    }
}
