//! Messenger events and their EVM log encoding.
//!
//! Internally a send produces a single [`MessengerEvent::SentMessage`]
//! carrying the whole envelope. On the wire, v1 envelopes are split into a
//! `SentMessage` log followed by a `SentMessageExtension1` log carrying the
//! value, which older indexers do not expect in `SentMessage`.

use alloy_primitives::{Address, LogData, B256, U256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, MessageVersion};
use crate::error::{MessengerError, Result};

/// Solidity event definitions of the messenger.
pub mod abi {
    use alloy_sol_types::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        event SentMessage(
            address indexed target,
            address sender,
            bytes message,
            uint256 messageNonce,
            uint256 gasLimit
        );

        #[derive(Debug, PartialEq, Eq)]
        event SentMessageExtension1(address indexed sender, uint256 value);

        #[derive(Debug, PartialEq, Eq)]
        event RelayedMessage(bytes32 indexed msgHash);

        #[derive(Debug, PartialEq, Eq)]
        event FailedRelayedMessage(bytes32 indexed msgHash);

        #[derive(Debug, PartialEq, Eq)]
        event Initialized(uint8 version);

        #[derive(Debug, PartialEq, Eq)]
        event Paused(address account);

        #[derive(Debug, PartialEq, Eq)]
        event Unpaused(address account);
    }
}

/// Event emitted by a messenger, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MessengerEvent {
    Initialized { version: u8 },
    SentMessage { envelope: Envelope },
    RelayedMessage { msg_hash: B256 },
    FailedRelayedMessage { msg_hash: B256 },
    Paused { account: Address },
    Unpaused { account: Address },
}

impl MessengerEvent {
    /// Encodes this event into the log records a Solidity messenger would emit.
    pub fn to_logs(&self) -> Vec<LogData> {
        match self {
            MessengerEvent::Initialized { version } => {
                vec![abi::Initialized { version: *version }.encode_log_data()]
            }
            MessengerEvent::SentMessage { envelope } => {
                let mut logs = vec![abi::SentMessage {
                    target: envelope.target,
                    sender: envelope.sender,
                    message: envelope.payload.clone(),
                    messageNonce: envelope.nonce,
                    gasLimit: U256::from(envelope.min_gas_limit),
                }
                .encode_log_data()];
                if envelope.version().ok() == Some(MessageVersion::V1) {
                    logs.push(
                        abi::SentMessageExtension1 {
                            sender: envelope.sender,
                            value: envelope.value,
                        }
                        .encode_log_data(),
                    );
                }
                logs
            }
            MessengerEvent::RelayedMessage { msg_hash } => {
                vec![abi::RelayedMessage { msgHash: *msg_hash }.encode_log_data()]
            }
            MessengerEvent::FailedRelayedMessage { msg_hash } => {
                vec![abi::FailedRelayedMessage { msgHash: *msg_hash }.encode_log_data()]
            }
            MessengerEvent::Paused { account } => {
                vec![abi::Paused { account: *account }.encode_log_data()]
            }
            MessengerEvent::Unpaused { account } => {
                vec![abi::Unpaused { account: *account }.encode_log_data()]
            }
        }
    }
}

/// Rebuilds an envelope from a `SentMessage` log and, for v1 nonces, the
/// `SentMessageExtension1` log that follows it.
pub fn decode_sent_message(logs: &[LogData]) -> Result<Envelope> {
    let first = logs
        .first()
        .ok_or_else(|| MessengerError::InvalidLog("no SentMessage log".to_string()))?;
    let sent = abi::SentMessage::decode_log_data(first, true)
        .map_err(|e| MessengerError::InvalidLog(format!("SentMessage: {}", e)))?;

    let min_gas_limit: u64 = sent
        .gasLimit
        .try_into()
        .map_err(|_| MessengerError::InvalidLog("gasLimit exceeds u64".to_string()))?;

    let mut envelope = Envelope::new(
        sent.messageNonce,
        sent.sender,
        sent.target,
        U256::ZERO,
        min_gas_limit,
        sent.message,
    );

    if envelope.version()? == MessageVersion::V1 {
        let second = logs.get(1).ok_or_else(|| {
            MessengerError::InvalidLog("v1 message without SentMessageExtension1".to_string())
        })?;
        let extension = abi::SentMessageExtension1::decode_log_data(second, true)
            .map_err(|e| MessengerError::InvalidLog(format!("SentMessageExtension1: {}", e)))?;
        if extension.sender != envelope.sender {
            return Err(MessengerError::InvalidLog(format!(
                "extension sender {} does not match message sender {}",
                extension.sender, envelope.sender
            )));
        }
        envelope.value = extension.value;
    }

    Ok(envelope)
}
