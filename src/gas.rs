//! Gas Accountant
//!
//! Pure, integer-only gas arithmetic shared by the sending and the receiving
//! domain. Both sides must compute identical values from identical inputs, so
//! everything here is unsigned with truncating division.

/// Constant overhead added to the base gas for a message.
pub const RELAY_CONSTANT_OVERHEAD: u64 = 200_000;

/// Numerator for dynamic overhead added to the base gas for a message.
pub const MIN_GAS_DYNAMIC_OVERHEAD_NUMERATOR: u64 = 64;

/// Denominator for dynamic overhead added to the base gas for a message.
pub const MIN_GAS_DYNAMIC_OVERHEAD_DENOMINATOR: u64 = 63;

/// Extra gas added to base gas for each byte of calldata in a message.
pub const MIN_GAS_CALLDATA_OVERHEAD: u64 = 16;

/// Gas reserved for performing the external call in `relay_message`.
pub const RELAY_CALL_OVERHEAD: u64 = 40_000;

/// Gas reserved for finalizing the execution of `relay_message` after the call.
pub const RELAY_RESERVED_GAS: u64 = 40_000;

/// Gas reserved for the execution between the min-gas check and the external call.
pub const RELAY_GAS_CHECK_BUFFER: u64 = 5_000;

/// Fixed cost of the CALL itself assumed by [`has_min_gas`].
pub const SAFE_CALL_OVERHEAD: u64 = 40_000;

/// Computes the amount of gas required to guarantee that a given message will be
/// received on the other domain without running out of gas.
///
/// Guaranteeing that a message will not run out of gas is important because this
/// ensures that a message can always be replayed if it fails to execute completely.
///
/// # Arguments
///
/// * `message_len`   - Length of the message payload in bytes
/// * `min_gas_limit` - Minimum gas the inner call must receive on the other domain
pub fn base_gas(message_len: usize, min_gas_limit: u32) -> u64 {
    let calldata_gas = (message_len as u64).saturating_mul(MIN_GAS_CALLDATA_OVERHEAD);
    // u32 * 64 always fits in u64
    let dynamic_gas = (min_gas_limit as u64 * MIN_GAS_DYNAMIC_OVERHEAD_NUMERATOR)
        / MIN_GAS_DYNAMIC_OVERHEAD_DENOMINATOR;

    RELAY_CONSTANT_OVERHEAD
        .saturating_add(calldata_gas)
        .saturating_add(dynamic_gas)
        .saturating_add(RELAY_CALL_OVERHEAD)
        .saturating_add(RELAY_RESERVED_GAS)
        .saturating_add(RELAY_GAS_CHECK_BUFFER)
}

/// Returns true if `gas_left` is enough to forward at least `min_gas` to a call
/// after EIP-150's 63/64 rule, keeping `reserved_gas` for the caller.
///
/// Equation: `gas_left * 63 >= min_gas * 64 + 63 * (SAFE_CALL_OVERHEAD + reserved_gas)`
pub fn has_min_gas(gas_left: u64, min_gas: u64, reserved_gas: u64) -> bool {
    let available = gas_left as u128 * 63;
    let required = min_gas as u128 * 64
        + 63 * (SAFE_CALL_OVERHEAD as u128 + reserved_gas as u128);
    available >= required
}

/// Gas charged against a relay attempt before the min-gas check: the per-byte
/// calldata cost of the payload.
pub fn intrinsic_relay_gas(message_len: usize) -> u64 {
    (message_len as u64).saturating_mul(MIN_GAS_CALLDATA_OVERHEAD)
}

/// Tracks the gas remaining in a single relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    remaining: u64,
}

impl GasMeter {
    pub fn new(gas_limit: u64) -> Self {
        Self {
            remaining: gas_limit,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Deducts `amount`, clamping at zero.
    pub fn charge(&mut self, amount: u64) {
        self.remaining = self.remaining.saturating_sub(amount);
    }

    /// Whether the remaining gas can guarantee `min_gas_limit` to the inner call.
    pub fn has_min_gas(&self, min_gas_limit: u64) -> bool {
        has_min_gas(
            self.remaining,
            min_gas_limit,
            RELAY_RESERVED_GAS + RELAY_GAS_CHECK_BUFFER,
        )
    }

    /// Gas forwarded to the inner call: what is left once the check buffer
    /// has been spent and the finalization reserve is held back.
    pub fn call_budget(&self) -> u64 {
        self.remaining
            .saturating_sub(RELAY_GAS_CHECK_BUFFER)
            .saturating_sub(RELAY_RESERVED_GAS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_gas_empty_message() {
        let expected = RELAY_CONSTANT_OVERHEAD
            + RELAY_CALL_OVERHEAD
            + RELAY_RESERVED_GAS
            + RELAY_GAS_CHECK_BUFFER;
        assert_eq!(base_gas(0, 0), expected);
    }

    #[test]
    fn test_base_gas_known_value() {
        // 200_000 + 2 * 16 + 100_000 * 64 / 63 + 40_000 + 40_000 + 5_000
        assert_eq!(base_gas(2, 100_000), 200_000 + 32 + 101_587 + 85_000);
    }

    #[test]
    fn test_base_gas_max_inputs_do_not_overflow() {
        let gas = base_gas(usize::MAX, u32::MAX);
        assert_eq!(gas, u64::MAX);
    }

    #[test]
    fn test_has_min_gas_boundary() {
        let reserved = RELAY_RESERVED_GAS + RELAY_GAS_CHECK_BUFFER;
        // min_gas = 63 makes the right-hand side divisible by 63
        let exact = 64 + SAFE_CALL_OVERHEAD + reserved;
        assert!(has_min_gas(exact, 63, reserved));
        assert!(!has_min_gas(exact - 1, 63, reserved));
    }

    #[test]
    fn test_meter_call_budget_saturates() {
        let meter = GasMeter::new(1_000);
        assert_eq!(meter.call_budget(), 0);
    }

    #[test]
    fn test_base_gas_satisfies_relay_check() {
        for (len, min_gas) in [(0usize, 0u32), (2, 100_000), (1024, 1), (10, u32::MAX)] {
            let mut meter = GasMeter::new(base_gas(len, min_gas));
            meter.charge(intrinsic_relay_gas(len));
            assert!(meter.has_min_gas(min_gas as u64), "len={} min_gas={}", len, min_gas);
            assert!(meter.call_budget() >= min_gas as u64);
        }
    }
}
