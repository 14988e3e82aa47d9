//! Error definitions for the cross-domain messenger.
//!
//! Only structural violations are errors. A relayed call that reverts or runs
//! short of gas is recorded as a failed attempt and reported through
//! [`crate::messenger::RelayOutcome`], never through this type.

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

use crate::messenger::FailureReason;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessengerError {
    #[error("Messenger not initialized")]
    NotInitialized,

    #[error("Messenger already initialized")]
    AlreadyInitialized,

    #[error("Messenger is paused")]
    Paused,

    #[error("Unauthorized: {0} is not the messenger admin")]
    Unauthorized(Address),

    #[error("Message has already been relayed: {0}")]
    AlreadyRelayed(B256),

    #[error("Value mismatch: expected {expected}, got {actual}")]
    ValueMismatch { expected: U256, actual: U256 },

    #[error("Cannot send message to blocked system address {0}")]
    ReservedTargetAddress(Address),

    #[error("Only version 0 or 1 messages are supported, got version {0}")]
    UnsupportedVersion(u16),

    #[error("Message cannot be replayed: {0} has no failed relay attempt")]
    MessageNotReplayable(B256),

    #[error("Message nonce counter overflow")]
    NonceOverflow,

    #[error("xDomainMessageSender is not set")]
    XDomainMessageSenderNotSet,

    #[error("Failed to relay message during estimation: {0}")]
    EstimationFailed(FailureReason),

    #[error("Invalid log: {0}")]
    InvalidLog(String),
}

pub type Result<T> = std::result::Result<T, MessengerError>;
