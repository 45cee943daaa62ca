//! Protocol constants for StealthSwap.
//!
//! Revert reasons are part of the external contract of the ledger and are kept
//! byte-for-byte identical to the deployed contracts.

use crate::types::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of an Ethereum address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Sentinel token address used in events for native-currency payments
/// (`0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE`).
pub const NATIVE_TOKEN: Address = Address::from_array([0xEE; ADDRESS_SIZE]);

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT NOTE SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of one ABI word (`bytes32`).
pub const WORD_SIZE: usize = 32;

/// Size of the AES initialization vector in an unpacked note.
pub const NOTE_IV_SIZE: usize = 16;

/// Number of 32-byte ciphertext buffers in an unpacked note.
pub const NOTE_CIPHERTEXT_WORDS: usize = 3;

/// Size of an uncompressed SEC1 public key (`0x04 || x || y`).
pub const UNCOMPRESSED_KEY_SIZE: usize = 1 + 2 * WORD_SIZE;

/// SEC1 tag byte for uncompressed points.
pub const UNCOMPRESSED_KEY_TAG: u8 = 0x04;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimals of native currency and of the fee token.
pub const ETHER_DECIMALS: u32 = 18;

/// Default protocol fee: 0.1 fee tokens.
pub const DEFAULT_PROTOCOL_FEE: u128 = 100_000_000_000_000_000;

/// Default native toll on token payments: 0.025 ether.
pub const DEFAULT_ETHER_TOLL: u128 = 25_000_000_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// REVERT REASONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Native payment value did not exceed the protocol fee.
pub const REVERT_BELOW_PROTOCOL_FEE: &str =
    "StealthSwap: Must have value higher than the protocol fee";

/// Stealth address was already funded.
pub const REVERT_ALREADY_USED: &str = "StealthSwap: stealth address cannot be reused";

/// Nothing to withdraw for the caller.
pub const REVERT_UNAVAILABLE: &str = "StealthSwap: Unavailable tokens for withdrawal";

/// Fee-token allowance below the protocol fee.
pub const REVERT_INSUFFICIENT_ALLOWANCE: &str =
    "StealthSwap: You must provide allowance to pay the protocol fee";

/// Token payment value below the native toll.
pub const REVERT_BELOW_ETHER_TOLL: &str =
    "StealthSwap: Must have value greater than or equal to ether protocol fee";

/// Fee collection attempted by someone other than the fee manager.
pub const REVERT_WRONG_FEE_MANAGER: &str = "StealthSwap: Wrong Fee Manager";

/// Owner-only call from a non-owner.
pub const REVERT_NOT_OWNER: &str = "Ownable: caller is not the owner";

/// Ownership transfer to the zero address.
pub const REVERT_ZERO_OWNER: &str = "Ownable: new owner is the zero address";

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix of every environment variable read by `LedgerConfig::from_env`.
pub const ENV_PREFIX: &str = "STEALTHSWAP_";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_sentinel_matches_checksum_literal() {
        let literal = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";
        assert_eq!(Address::from_hex(literal).unwrap(), NATIVE_TOKEN);
    }

    #[test]
    fn test_default_fees() {
        assert_eq!(crate::format_units(DEFAULT_PROTOCOL_FEE, ETHER_DECIMALS), "0.1");
        assert_eq!(crate::format_units(DEFAULT_ETHER_TOLL, ETHER_DECIMALS), "0.025");
    }

    #[test]
    fn test_uncompressed_key_size() {
        assert_eq!(UNCOMPRESSED_KEY_SIZE, 65);
    }

    #[test]
    fn test_revert_reasons_unique() {
        let reasons = [
            REVERT_BELOW_PROTOCOL_FEE,
            REVERT_ALREADY_USED,
            REVERT_UNAVAILABLE,
            REVERT_INSUFFICIENT_ALLOWANCE,
            REVERT_BELOW_ETHER_TOLL,
            REVERT_WRONG_FEE_MANAGER,
            REVERT_NOT_OWNER,
            REVERT_ZERO_OWNER,
        ];

        for (i, a) in reasons.iter().enumerate() {
            for (j, b) in reasons.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Revert reasons must be unique");
                }
            }
        }
    }
}
