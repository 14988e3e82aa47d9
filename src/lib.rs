//! Cross-Domain Messenger Library
//!
//! This crate provides a pair of messengers that pass arbitrary calls between two
//! execution domains. Messages are wrapped in versioned envelopes, relayed with
//! replay protection and a shared gas model, and can be replayed after a failure.

pub mod config;
pub mod domain;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod events;
pub mod executor;
pub mod gas;
pub mod messenger;
pub mod relay_service;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use domain::{Domain, SharedDomain};
pub use envelope::{Envelope, MessageVersion};
pub use error::{MessengerError, Result};
pub use events::MessengerEvent;
pub use executor::{CallExecutor, CallOutcome, InnerCall, RecordingExecutor, RelayScope, TargetBehavior};
pub use messenger::{
    CallContext, CrossDomainMessenger, FailureReason, MessengerSettings, RelayContext, RelayOutcome,
    SendReceipt,
};
pub use relay_service::{MessageRelayService, MessageRelayServiceConfig, PollSummary};
pub use store::{InMemoryRelayLedger, RelayLedger, RelayRecord, RelayState};
