//! Shared test helpers for messenger integration tests
//!
//! This module provides constants and builders for a pair of initialized
//! messengers wired to each other.

#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use xdomain_messenger::config::{BootstrapMessage, Config};
use xdomain_messenger::{
    CallContext, CrossDomainMessenger, Domain, Envelope, MessengerSettings, RecordingExecutor,
    RelayContext, SendReceipt, SharedDomain,
};

// ============================================================================
// CONSTANTS
// ============================================================================

// ------------------------------ MESSENGERS ------------------------------

/// Dummy messenger address on the first domain
pub const DUMMY_MESSENGER_ADDR_L1: &str = "0x0000000000000000000000000000000000000001";

/// Dummy messenger address on the second domain
pub const DUMMY_MESSENGER_ADDR_L2: &str = "0x0000000000000000000000000000000000000002";

/// Dummy admin allowed to pause
pub const DUMMY_ADMIN_ADDR: &str = "0x0000000000000000000000000000000000000003";

/// Dummy relay operator used for replays
pub const DUMMY_OPERATOR_ADDR: &str = "0x0000000000000000000000000000000000000004";

// -------------------------------- USERS ---------------------------------

/// Dummy application sending messages
pub const DUMMY_SENDER_ADDR: &str = "0x0000000000000000000000000000000000000005";

/// Dummy application receiving messages
pub const DUMMY_TARGET_ADDR: &str = "0x0000000000000000000000000000000000000006";

/// Dummy system contract that must never be targeted
pub const DUMMY_BLOCKED_ADDR: &str = "0x0000000000000000000000000000000000000007";

// -------------------------------- CHAINS --------------------------------

pub const TEST_L1_CHAIN_ID: u64 = 900;
pub const TEST_L2_CHAIN_ID: u64 = 901;

/// Minimum gas limit used by most tests
pub const TEST_MIN_GAS_LIMIT: u32 = 100_000;

// ============================================================================
// BUILDERS
// ============================================================================

pub fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

pub fn l1_addr() -> Address {
    addr(DUMMY_MESSENGER_ADDR_L1)
}

pub fn l2_addr() -> Address {
    addr(DUMMY_MESSENGER_ADDR_L2)
}

pub fn admin() -> Address {
    addr(DUMMY_ADMIN_ADDR)
}

pub fn operator() -> Address {
    addr(DUMMY_OPERATOR_ADDR)
}

pub fn sender() -> Address {
    addr(DUMMY_SENDER_ADDR)
}

pub fn target() -> Address {
    addr(DUMMY_TARGET_ADDR)
}

/// Settings of the L1 messenger, paired with the L2 messenger.
pub fn l1_settings() -> MessengerSettings {
    let mut settings = MessengerSettings::new(l1_addr(), l2_addr(), admin());
    settings.blocked_targets.push(addr(DUMMY_BLOCKED_ADDR));
    settings
}

/// Settings of the L2 messenger, paired with the L1 messenger.
pub fn l2_settings() -> MessengerSettings {
    let mut settings = MessengerSettings::new(l2_addr(), l1_addr(), admin());
    settings.blocked_targets.push(addr(DUMMY_BLOCKED_ADDR));
    settings
}

pub fn initialized(settings: MessengerSettings) -> CrossDomainMessenger {
    let mut messenger = CrossDomainMessenger::new(settings);
    messenger.initialize().unwrap();
    messenger
}

/// Initialized (L1, L2) messenger pair.
pub fn messenger_pair() -> (CrossDomainMessenger, CrossDomainMessenger) {
    (initialized(l1_settings()), initialized(l2_settings()))
}

/// Sends `payload` from the dummy sender to the dummy target.
pub fn send(messenger: &mut CrossDomainMessenger, payload: &[u8], value: u64) -> SendReceipt {
    messenger
        .send_message(
            &CallContext::new(sender(), U256::from(value)),
            target(),
            payload.to_vec(),
            TEST_MIN_GAS_LIMIT,
        )
        .unwrap()
}

/// First-delivery context on the receiving side, carrying exactly `baseGas`.
pub fn delivery_ctx(receiving: &CrossDomainMessenger, receipt: &SendReceipt) -> RelayContext {
    RelayContext::new(
        receiving.other_messenger(),
        receipt.envelope.value,
        receipt.gas_limit,
    )
}

/// Replay context from the operator.
pub fn replay_ctx(gas_limit: u64) -> RelayContext {
    RelayContext::new(operator(), U256::ZERO, gas_limit)
}

pub fn envelope_with_nonce(nonce: U256, payload: &[u8]) -> Envelope {
    Envelope::new(
        nonce,
        sender(),
        target(),
        U256::ZERO,
        TEST_MIN_GAS_LIMIT as u64,
        payload.to_vec(),
    )
}

/// Shared (L1, L2) domains with recording executors.
pub fn shared_domains(
    l2_executor: RecordingExecutor,
) -> (SharedDomain<RecordingExecutor>, SharedDomain<RecordingExecutor>) {
    let l1 = Domain::new(
        "l1",
        TEST_L1_CHAIN_ID,
        initialized(l1_settings()),
        RecordingExecutor::new(),
    );
    let l2 = Domain::new("l2", TEST_L2_CHAIN_ID, initialized(l2_settings()), l2_executor);
    (l1.into_shared(), l2.into_shared())
}

/// A valid configuration using the dummy addresses.
pub fn build_test_config() -> Config {
    let mut config = Config::default();
    config.messenger.admin = DUMMY_ADMIN_ADDR.to_string();
    config.source.messenger_addr = DUMMY_MESSENGER_ADDR_L1.to_string();
    config.source.chain_id = TEST_L1_CHAIN_ID;
    config.destination.messenger_addr = DUMMY_MESSENGER_ADDR_L2.to_string();
    config.destination.chain_id = TEST_L2_CHAIN_ID;
    config.relay.operator = DUMMY_OPERATOR_ADDR.to_string();
    config.relay.polling_interval_ms = 10;
    config
}

pub fn build_bootstrap_message(from: &str) -> BootstrapMessage {
    BootstrapMessage {
        from: from.to_string(),
        sender: DUMMY_SENDER_ADDR.to_string(),
        target: DUMMY_TARGET_ADDR.to_string(),
        payload: "0x68656c6c6f".to_string(),
        min_gas_limit: TEST_MIN_GAS_LIMIT,
        value: 0,
    }
}
