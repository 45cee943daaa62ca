//! # StealthSwap Core
//!
//! Core types, errors, and traits for the StealthSwap stealth-address payment ledger.
//!
//! This crate provides the building blocks shared by the ledger, the in-memory host
//! and the CLI:
//!
//! - **Types**: addresses, assets, payment notes, events and call contexts
//! - **Errors**: the ledger error taxonomy with verbatim revert reasons
//! - **Constants**: sentinel addresses, note sizes, revert strings
//! - **Traits**: the ERC20 interface and the host environment a ledger runs against
//! - **Units**: decimal parsing and formatting of token amounts
//!
//! ## Example
//!
//! ```rust
//! use stealthswap_core::{parse_units, Address, Asset, NATIVE_TOKEN};
//!
//! let fee = parse_units("0.1", 18).unwrap();
//! assert_eq!(fee, 100_000_000_000_000_000);
//! assert_eq!(Asset::Native.token_address(), NATIVE_TOKEN);
//! assert!(!Address::from_label("receiver").is_zero());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod units;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{ErrorKind, LedgerError, Result, TokenError};
pub use traits::*;
pub use types::*;
pub use units::{format_units, parse_units};
