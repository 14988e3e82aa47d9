//! Inner-call execution seam.
//!
//! The ledger that actually runs a relayed call lives outside this crate. The
//! messenger hands it an [`InnerCall`] together with the call-scoped
//! [`RelayScope`], which is how the callee learns who sent the message on the
//! other domain.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Call-scoped relay context, alive only for the duration of one inner call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayScope {
    messenger: Address,
    x_domain_sender: Address,
    msg_hash: B256,
}

impl RelayScope {
    pub(crate) fn new(messenger: Address, x_domain_sender: Address, msg_hash: B256) -> Self {
        Self {
            messenger,
            x_domain_sender,
            msg_hash,
        }
    }

    /// Sender of the message currently being relayed, on the originating domain.
    pub fn x_domain_message_sender(&self) -> Address {
        self.x_domain_sender
    }

    /// Messenger performing the relay.
    pub fn messenger(&self) -> Address {
        self.messenger
    }

    /// Hash of the envelope being relayed.
    pub fn msg_hash(&self) -> B256 {
        self.msg_hash
    }
}

/// The wrapped call an envelope asks the receiving domain to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerCall {
    pub target: Address,
    pub value: U256,
    pub gas_limit: u64,
    pub data: Bytes,
}

/// Result of executing an [`InnerCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Succeeded { gas_used: u64 },
    Reverted { reason: String },
    OutOfGas,
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Succeeded { .. })
    }
}

/// Executes relayed calls against the local domain.
pub trait CallExecutor {
    fn execute(&mut self, scope: &RelayScope, call: &InnerCall) -> CallOutcome;
}

// ============================================================================
// IN-MEMORY EXECUTOR
// ============================================================================

/// How a target registered with [`RecordingExecutor`] responds to calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetBehavior {
    /// Always succeeds.
    Accept,
    /// Always reverts with the given reason.
    Revert { reason: String },
    /// Succeeds if the call carries at least `gas` gas, runs out of gas otherwise.
    ConsumeGas { gas: u64 },
    /// Succeeds only when relayed on behalf of `sender`.
    RequireSender { sender: Address },
}

/// A call observed by [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCall {
    pub call: InnerCall,
    pub x_domain_sender: Address,
    pub outcome: CallOutcome,
}

/// In-memory [`CallExecutor`] with per-target behaviour and a call log.
///
/// Unregistered targets accept every call.
#[derive(Debug, Default, Clone)]
pub struct RecordingExecutor {
    behaviors: HashMap<Address, TargetBehavior>,
    calls: Vec<ExecutedCall>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: Address, behavior: TargetBehavior) -> Self {
        self.set_behavior(target, behavior);
        self
    }

    pub fn set_behavior(&mut self, target: Address, behavior: TargetBehavior) {
        self.behaviors.insert(target, behavior);
    }

    pub fn calls(&self) -> &[ExecutedCall] {
        &self.calls
    }

    pub fn calls_to(&self, target: Address) -> impl Iterator<Item = &ExecutedCall> {
        self.calls.iter().filter(move |c| c.call.target == target)
    }
}

impl CallExecutor for RecordingExecutor {
    fn execute(&mut self, scope: &RelayScope, call: &InnerCall) -> CallOutcome {
        let behavior = self
            .behaviors
            .get(&call.target)
            .cloned()
            .unwrap_or(TargetBehavior::Accept);

        let outcome = match behavior {
            TargetBehavior::Accept => CallOutcome::Succeeded { gas_used: 0 },
            TargetBehavior::Revert { reason } => CallOutcome::Reverted { reason },
            TargetBehavior::ConsumeGas { gas } if call.gas_limit >= gas => {
                CallOutcome::Succeeded { gas_used: gas }
            }
            TargetBehavior::ConsumeGas { .. } => CallOutcome::OutOfGas,
            TargetBehavior::RequireSender { sender } if scope.x_domain_message_sender() == sender => {
                CallOutcome::Succeeded { gas_used: 0 }
            }
            TargetBehavior::RequireSender { sender } => CallOutcome::Reverted {
                reason: format!(
                    "unexpected xDomainMessageSender {}, want {}",
                    scope.x_domain_message_sender(),
                    sender
                ),
            },
        };

        debug!(
            "Executed call: target={}, gas_limit={}, outcome={:?}",
            call.target, call.gas_limit, outcome
        );

        self.calls.push(ExecutedCall {
            call: call.clone(),
            x_domain_sender: scope.x_domain_message_sender(),
            outcome: outcome.clone(),
        });
        outcome
    }
}
