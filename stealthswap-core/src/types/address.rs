//! Address and asset types.
//!
//! - [`Address`]: a 20-byte Ethereum account or contract address
//! - [`Asset`]: native currency or a specific ERC20 token

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::constants::{ADDRESS_SIZE, NATIVE_TOKEN};
use crate::error::{LedgerError, Result};

/// Quantity of an asset in its smallest unit (wei for native currency).
pub type Amount = u128;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 20-byte Ethereum address.
///
/// Serialized as a `0x`-prefixed lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address {
    bytes: [u8; ADDRESS_SIZE],
}

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address::from_array([0u8; ADDRESS_SIZE]);

    /// Creates from a fixed-size array.
    pub const fn from_array(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ADDRESS_SIZE {
            return Err(LedgerError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ADDRESS_SIZE,
                bytes.len()
            )));
        }

        let mut arr = [0u8; ADDRESS_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Parses from hex string (with or without 0x prefix, any case).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// Derives a deterministic address from a human label.
    ///
    /// The address is the last 20 bytes of `keccak256(label)`. Used to name
    /// accounts in tests and simulation scenarios.
    pub fn from_label(label: &str) -> Self {
        let digest = Keccak256::digest(label.as_bytes());
        let mut arr = [0u8; ADDRESS_SIZE];
        arr.copy_from_slice(&digest[digest.len() - ADDRESS_SIZE..]);
        Self { bytes: arr }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `keccak256` of the raw address bytes.
    pub fn keccak256(&self) -> [u8; 32] {
        Keccak256::digest(self.bytes).into()
    }

    /// Returns true if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Returns `0x`-prefixed lowercase hex.
    pub fn to_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_hex_string())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl std::str::FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET
// ═══════════════════════════════════════════════════════════════════════════════

/// What a stealth payment moved: native currency or a specific token contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "address")]
pub enum Asset {
    /// Native currency, settled directly to the stealth address.
    Native,
    /// An ERC20 token held in ledger custody.
    Token(Address),
}

impl Asset {
    /// Returns the token address reported in events, using the native sentinel
    /// for native currency.
    pub fn token_address(&self) -> Address {
        match self {
            Asset::Native => NATIVE_TOKEN,
            Asset::Token(address) => *address,
        }
    }

    /// Returns true for native currency.
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_formatting() {
        let addr = Address::from_array([0xAB; 20]);
        let s = addr.to_hex_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 42);
    }

    #[test]
    fn test_address_hex_roundtrip_any_case() {
        let addr = Address::from_hex("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE").unwrap();
        assert_eq!(addr, Address::from_array([0xEE; 20]));
        assert_eq!(Address::from_hex(&addr.to_hex_string()).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!(matches!(
            Address::from_hex("0x1234"),
            Err(LedgerError::InvalidAddress(_))
        ));
        assert!(matches!(Address::from_hex("0xzz"), Err(LedgerError::Hex(_))));
    }

    #[test]
    fn test_from_label_is_deterministic_and_distinct() {
        assert_eq!(Address::from_label("payer1"), Address::from_label("payer1"));
        assert_ne!(Address::from_label("payer1"), Address::from_label("payer2"));
        assert!(!Address::from_label("owner").is_zero());
    }

    #[test]
    fn test_keccak_of_address_bytes() {
        // keccak256 of twenty zero bytes
        let expected = "5380c7b7ae81a58eb98d9c78de4a1fd7fd9535fc953ed2be602daaa41767312a";
        assert_eq!(hex::encode(Address::ZERO.keccak256()), expected);
    }

    #[test]
    fn test_address_serde_as_hex_string() {
        let addr = Address::from_array([0x12; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex_string()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_asset_token_address() {
        let token = Address::from_label("token");
        assert_eq!(Asset::Native.token_address(), NATIVE_TOKEN);
        assert_eq!(Asset::Token(token).token_address(), token);
        assert!(Asset::Native.is_native());
        assert!(!Asset::Token(token).is_native());
    }
}
