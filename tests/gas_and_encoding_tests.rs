//! Property tests for gas accounting, nonce encoding and message hashing
//!
//! Inputs are drawn from a seeded RNG so failures reproduce.

use alloy_primitives::{Address, U256};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use xdomain_messenger::encoding::{decode_versioned_nonce, encode_versioned_nonce};
use xdomain_messenger::events::decode_sent_message;
use xdomain_messenger::gas::{base_gas, has_min_gas, intrinsic_relay_gas, GasMeter};
use xdomain_messenger::{Envelope, MessengerEvent};

const SEED: u64 = 0x5eed;
const ITERATIONS: usize = 500;

fn random_envelope(rng: &mut StdRng) -> Envelope {
    let len = rng.gen_range(0..64);
    let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    Envelope::new(
        encode_versioned_nonce(rng.gen_range(0..1_000_000), rng.gen_range(0..=1)),
        Address::from(rng.gen::<[u8; 20]>()),
        Address::from(rng.gen::<[u8; 20]>()),
        U256::from(rng.gen::<u64>()),
        rng.gen::<u32>() as u64,
        payload,
    )
}

// ============================================================================
// GAS TESTS
// ============================================================================

/// 1. Test: Base Gas Monotonic
/// Verifies that baseGas never decreases when the payload or the minimum gas limit grows.
/// Why: Senders rely on larger messages never being cheaper to deliver.
#[test]
fn test_base_gas_monotonic() {
    let mut rng = StdRng::seed_from_u64(SEED);

    for _ in 0..ITERATIONS {
        let len = rng.gen_range(0..100_000usize);
        let min_gas = rng.gen_range(0..u32::MAX - 1);

        let base = base_gas(len, min_gas);
        assert!(base_gas(len + 1, min_gas) >= base);
        assert!(base_gas(len, min_gas + 1) >= base);
    }
}

/// 2. Test: Base Gas Always Passes Relay Check
/// Verifies that a relay carrying exactly baseGas passes the minimum gas check
/// and forwards at least the minimum gas limit.
/// Why: A correctly funded delivery must never be recorded as failed for lack of gas.
#[test]
fn test_base_gas_satisfies_relay_check() {
    let mut rng = StdRng::seed_from_u64(SEED + 1);

    for _ in 0..ITERATIONS {
        let len = rng.gen_range(0..10_000usize);
        let min_gas = rng.gen::<u32>();

        let mut meter = GasMeter::new(base_gas(len, min_gas));
        meter.charge(intrinsic_relay_gas(len));

        assert!(meter.has_min_gas(min_gas as u64), "len={} min_gas={}", len, min_gas);
        assert!(meter.call_budget() >= min_gas as u64);
    }
}

/// 3. Test: Min Gas Check Threshold
/// Verifies that has_min_gas flips exactly at the smallest sufficient gas value.
/// Why: Off-by-one errors here decide whether a relay fails.
#[test]
fn test_has_min_gas_threshold() {
    let mut rng = StdRng::seed_from_u64(SEED + 2);

    for _ in 0..ITERATIONS {
        let min_gas = rng.gen::<u32>() as u64;
        let reserved = rng.gen_range(0..100_000u64);

        // Smallest gas with gas * 63 >= min_gas * 64 + 63 * (40_000 + reserved)
        let required = (min_gas * 64 + 63 * (40_000 + reserved)).div_ceil(63);
        assert!(has_min_gas(required, min_gas, reserved));
        assert!(!has_min_gas(required - 1, min_gas, reserved));
    }
}

// ============================================================================
// ENCODING TESTS
// ============================================================================

/// 4. Test: Versioned Nonce Split
/// Verifies that decoding recovers the counter and version of any encoded nonce.
/// Why: The receiving side dispatches on the recovered version.
#[test]
fn test_versioned_nonce_split() {
    let mut rng = StdRng::seed_from_u64(SEED + 3);

    for _ in 0..ITERATIONS {
        let counter = rng.gen::<u64>();
        let version = rng.gen::<u16>();
        let (decoded_counter, decoded_version) =
            decode_versioned_nonce(encode_versioned_nonce(counter, version));
        assert_eq!(decoded_counter, U256::from(counter));
        assert_eq!(decoded_version, version);
    }
}

/// 5. Test: Hash Distinguishes Envelopes
/// Verifies that distinct random envelopes never share a hash, and that changing
/// any single field changes the hash.
/// Why: The hash is the replay-protection key.
#[test]
fn test_hash_distinguishes_envelopes() {
    let mut rng = StdRng::seed_from_u64(SEED + 4);
    let mut seen = HashSet::new();

    for _ in 0..ITERATIONS {
        let envelope = random_envelope(&mut rng);
        let hash = envelope.hash();
        assert!(seen.insert(hash), "duplicate hash for {:?}", envelope);

        let mut changed = envelope.clone();
        changed.value += U256::from(1u64);
        assert_ne!(changed.hash(), hash, "value must be committed");

        let mut changed = envelope.clone();
        changed.min_gas_limit += 1;
        assert_ne!(changed.hash(), hash, "min gas limit must be committed");

        let mut changed = envelope.clone();
        changed.nonce += U256::from(1u64 << 16);
        assert_ne!(changed.hash(), hash, "nonce must be committed");
    }
}

/// 6. Test: SentMessage Logs Rebuild Envelope
/// Verifies that the logs emitted for a send decode back into the same envelope.
/// Why: Indexers reconstruct envelopes from logs to relay them.
#[test]
fn test_sent_message_logs_rebuild_envelope() {
    let mut rng = StdRng::seed_from_u64(SEED + 5);

    for _ in 0..50 {
        let mut envelope = random_envelope(&mut rng);
        if envelope.raw_version() == 0 {
            envelope.value = U256::ZERO;
        }
        let logs = MessengerEvent::SentMessage {
            envelope: envelope.clone(),
        }
        .to_logs();
        assert_eq!(decode_sent_message(&logs).unwrap(), envelope);
    }
}
