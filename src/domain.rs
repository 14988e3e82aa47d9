//! Execution domain: a messenger bound to the executor of its local ledger.

use alloy_primitives::{Address, Bytes};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::envelope::Envelope;
use crate::error::Result;
use crate::executor::CallExecutor;
use crate::messenger::{CallContext, CrossDomainMessenger, RelayContext, RelayOutcome, SendReceipt};

/// One domain of a messenger pair.
#[derive(Debug)]
pub struct Domain<E: CallExecutor> {
    pub name: String,
    pub chain_id: u64,
    pub messenger: CrossDomainMessenger,
    pub executor: E,
}

/// Domain shared between relay services.
pub type SharedDomain<E> = Arc<RwLock<Domain<E>>>;

impl<E: CallExecutor> Domain<E> {
    pub fn new(
        name: impl Into<String>,
        chain_id: u64,
        messenger: CrossDomainMessenger,
        executor: E,
    ) -> Self {
        Self {
            name: name.into(),
            chain_id,
            messenger,
            executor,
        }
    }

    pub fn into_shared(self) -> SharedDomain<E> {
        Arc::new(RwLock::new(self))
    }

    /// Sends a message from `ctx.caller` on this domain.
    pub fn send(
        &mut self,
        ctx: &CallContext,
        target: Address,
        message: impl Into<Bytes>,
        min_gas_limit: u32,
    ) -> Result<SendReceipt> {
        self.messenger.send_message(ctx, target, message, min_gas_limit)
    }

    /// Relays `envelope` into this domain using its own executor.
    pub fn relay(&mut self, ctx: &RelayContext, envelope: &Envelope) -> Result<RelayOutcome> {
        self.messenger
            .relay_message(ctx, envelope, &mut self.executor)
    }
}
