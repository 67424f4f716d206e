//! # Gas Schedule
//!
//! The subset of the EVM cost table the registry program touches. The
//! in-memory ledger charges with it, and configuration uses
//! [`registration_upper_bound`] to check that the embedded payload limit
//! fits inside the gas limit every transaction is sent with.

pub const TX_BASE: u64 = 21_000;
pub const TX_DATA_NON_ZERO: u64 = 16;
pub const TX_DATA_ZERO: u64 = 4;
pub const SSTORE_SET: u64 = 20_000;
pub const SSTORE_RESET: u64 = 2_900;
pub const LOG: u64 = 375;
pub const LOG_TOPIC: u64 = 375;
pub const LOG_DATA: u64 = 8;

/// Fixed storage slots written per credential besides the pointer.
pub const CREDENTIAL_SLOTS: u64 = 3;

/// Intrinsic cost of a transaction carrying `data`.
pub fn intrinsic(data: &[u8]) -> u64 {
    data.iter().fold(TX_BASE, |acc, b| {
        acc + if *b == 0 { TX_DATA_ZERO } else { TX_DATA_NON_ZERO }
    })
}

/// Cost of one log entry.
pub fn log_cost(topics: usize, data_len: usize) -> u64 {
    LOG + LOG_TOPIC * topics as u64 + LOG_DATA * data_len as u64
}

/// Storage cost of a credential whose pointer is `pointer_len` bytes.
pub fn credential_storage(pointer_len: usize) -> u64 {
    SSTORE_SET * (CREDENTIAL_SLOTS + words(pointer_len))
}

/// Worst-case total gas of `registerCredential` with a `pointer_len` byte
/// pointer: every calldata byte non-zero, plus storage and the
/// `CredentialRegistered` log.
pub fn registration_upper_bound(pointer_len: usize) -> u64 {
    let padded = words(pointer_len) * 32;
    // selector + four head words + string length word + padded body
    let calldata = 4 + 4 * 32 + 32 + padded;
    let log_data = 64 + padded;
    TX_BASE
        + TX_DATA_NON_ZERO * calldata
        + credential_storage(pointer_len)
        + log_cost(4, log_data as usize)
}

fn words(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_prices_zero_bytes_lower() {
        assert_eq!(intrinsic(&[]), TX_BASE);
        assert_eq!(intrinsic(&[0, 1]), TX_BASE + TX_DATA_ZERO + TX_DATA_NON_ZERO);
    }

    #[test]
    fn test_registration_bound_grows_per_word() {
        let one = registration_upper_bound(32);
        let two = registration_upper_bound(64);
        assert_eq!(two - one, SSTORE_SET + 32 * TX_DATA_NON_ZERO + 32 * LOG_DATA);
        assert_eq!(registration_upper_bound(1), one);
    }
}
