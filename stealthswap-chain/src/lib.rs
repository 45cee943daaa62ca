//! # StealthSwap Chain
//!
//! In-memory execution environment for the StealthSwap ledger.
//!
//! - [`MemoryToken`]: an ERC20 token with OpenZeppelin revert messages
//! - [`MemoryChain`]: native balances plus a set of deployed tokens, implementing
//!   [`Host`](stealthswap_core::Host)
//!
//! Used by the ledger's tests and by the CLI simulator.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

mod chain;
mod token;

pub use chain::MemoryChain;
pub use token::MemoryToken;
