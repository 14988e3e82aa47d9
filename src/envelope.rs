//! Envelope: the versioned unit of cross-domain communication.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::{decode_versioned_nonce, hash_message_v0, hash_message_v1};
use crate::error::{MessengerError, Result};

/// Payload-encoding scheme of an envelope, recoverable from the nonce's low 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageVersion {
    /// Legacy encoding. Carries no native value.
    Legacy,
    /// Current encoding. Commits to value and minimum gas limit.
    V1,
}

impl MessageVersion {
    pub const fn as_u16(self) -> u16 {
        match self {
            MessageVersion::Legacy => 0,
            MessageVersion::V1 => 1,
        }
    }
}

impl TryFrom<u16> for MessageVersion {
    type Error = MessengerError;

    fn try_from(version: u16) -> Result<Self> {
        match version {
            0 => Ok(MessageVersion::Legacy),
            1 => Ok(MessageVersion::V1),
            other => Err(MessengerError::UnsupportedVersion(other)),
        }
    }
}

impl fmt::Display for MessageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u16())
    }
}

/// A message in flight between two domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Versioned nonce: `(counter << 16) | version`
    pub nonce: U256,
    /// Identity of the caller on the originating domain
    pub sender: Address,
    /// Identity of the callee on the receiving domain
    pub target: Address,
    /// Native value delivered with the call
    pub value: U256,
    /// Minimum gas the receiving domain must guarantee to the inner call
    pub min_gas_limit: u64,
    /// Opaque application data passed to the target
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(
        nonce: U256,
        sender: Address,
        target: Address,
        value: U256,
        min_gas_limit: u64,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            nonce,
            sender,
            target,
            value,
            min_gas_limit,
            payload: payload.into(),
        }
    }

    /// Raw version number carried in the nonce, supported or not.
    pub fn raw_version(&self) -> u16 {
        decode_versioned_nonce(self.nonce).1
    }

    /// Message counter allocated by the originating domain.
    pub fn counter(&self) -> U256 {
        decode_versioned_nonce(self.nonce).0
    }

    /// Decoded version, failing for versions this messenger does not understand.
    pub fn version(&self) -> Result<MessageVersion> {
        MessageVersion::try_from(self.raw_version())
    }

    /// Replay-protection identity of this envelope.
    pub fn hash(&self) -> B256 {
        hash_message_v1(
            self.nonce,
            self.sender,
            self.target,
            self.value,
            self.min_gas_limit,
            &self.payload,
        )
    }

    /// Legacy identity, only meaningful for v0 envelopes.
    pub fn legacy_hash(&self) -> B256 {
        hash_message_v0(self.target, self.sender, &self.payload, self.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_versioned_nonce;

    fn sample(version: u16) -> Envelope {
        Envelope::new(
            encode_versioned_nonce(7, version),
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            U256::from(5u64),
            21_000,
            b"payload".to_vec(),
        )
    }

    #[test]
    fn test_version_from_nonce() {
        assert_eq!(sample(0).version().unwrap(), MessageVersion::Legacy);
        assert_eq!(sample(1).version().unwrap(), MessageVersion::V1);
        assert_eq!(sample(1).counter(), U256::from(7u64));
        assert_eq!(
            sample(2).version(),
            Err(MessengerError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn test_hash_commits_to_value() {
        let a = sample(1);
        let mut b = a.clone();
        b.value = U256::from(6u64);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_serde_json_shape() {
        let json = serde_json::to_value(sample(1)).unwrap();
        assert_eq!(json["min_gas_limit"], 21_000);
        assert_eq!(json["payload"], "0x7061796c6f6164");
        let back: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample(1));
    }
}
