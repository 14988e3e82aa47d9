//! Versioned nonces, message hashing and relay calldata encoding.
//!
//! Message hashes commit to the ABI encoding of the corresponding
//! `relayMessage` call so that both domains derive the same identifier.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use sha3::{Digest, Keccak256};

sol! {
    /// Current (v1) relay entry point. Commits to value and minimum gas limit.
    function relayMessage(
        uint256 _nonce,
        address _sender,
        address _target,
        uint256 _value,
        uint256 _minGasLimit,
        bytes _message
    );
}

/// Legacy (v0) relay entry point, kept only to derive legacy message hashes.
pub mod legacy {
    use alloy_sol_types::sol;

    sol! {
        function relayMessage(
            address _target,
            address _sender,
            bytes _message,
            uint256 _messageNonce
        );
    }
}

/// Number of low bits of a nonce that carry the message version.
pub const VERSION_BITS: usize = 16;

/// Packs a message counter and a version into a single nonce.
///
/// The version occupies the low 16 bits so it can be recovered with a mask:
/// `nonce = (counter << 16) | version`.
pub fn encode_versioned_nonce(counter: u64, version: u16) -> U256 {
    (U256::from(counter) << VERSION_BITS) | U256::from(version)
}

/// Splits a versioned nonce into `(counter, version)`.
pub fn decode_versioned_nonce(nonce: U256) -> (U256, u16) {
    let version = (nonce & U256::from(u16::MAX)).to::<u16>();
    (nonce >> VERSION_BITS, version)
}

/// Keccak-256 over arbitrary bytes.
pub fn keccak256(data: &[u8]) -> B256 {
    B256::from_slice(&Keccak256::digest(data))
}

/// ABI-encodes the v1 `relayMessage` call a transport submits on the receiving domain.
pub fn encode_relay_message_call(
    nonce: U256,
    sender: Address,
    target: Address,
    value: U256,
    min_gas_limit: u64,
    message: &[u8],
) -> Vec<u8> {
    relayMessageCall {
        _nonce: nonce,
        _sender: sender,
        _target: target,
        _value: value,
        _minGasLimit: U256::from(min_gas_limit),
        _message: Bytes::copy_from_slice(message),
    }
    .abi_encode()
}

/// ABI-encodes the legacy `relayMessage(address,address,bytes,uint256)` call.
pub fn encode_legacy_relay_message_call(
    target: Address,
    sender: Address,
    message: &[u8],
    nonce: U256,
) -> Vec<u8> {
    legacy::relayMessageCall {
        _target: target,
        _sender: sender,
        _message: Bytes::copy_from_slice(message),
        _messageNonce: nonce,
    }
    .abi_encode()
}

/// Versioned message hash: the replay-protection key for every envelope.
pub fn hash_message_v1(
    nonce: U256,
    sender: Address,
    target: Address,
    value: U256,
    min_gas_limit: u64,
    message: &[u8],
) -> B256 {
    keccak256(&encode_relay_message_call(
        nonce,
        sender,
        target,
        value,
        min_gas_limit,
        message,
    ))
}

/// Legacy message hash, checked in addition to the versioned hash for v0 envelopes.
pub fn hash_message_v0(target: Address, sender: Address, message: &[u8], nonce: U256) -> B256 {
    keccak256(&encode_legacy_relay_message_call(target, sender, message, nonce))
}
