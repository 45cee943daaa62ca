//! # StealthSwap Ledger
//!
//! Custodian and notary for stealth-address payments.
//!
//! This crate provides:
//!
//! - **Custody**: one record per stealth address, funded exactly once
//! - **Fees**: protocol fee in a fee token, native toll on token payments, collection
//! - **Access control**: owner and fee-manager guards, trusted-forwarder sender resolution
//! - **Orchestration**: [`StealthLedger`], whose calls fully commit or fully revert
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stealthswap_ledger::{LedgerConfig, StealthLedger};
//!
//! let config = LedgerConfig::new(owner, fee_token, fee_manager, fee_taker);
//! let mut ledger = StealthLedger::deploy(ledger_address, config)?;
//!
//! // Payer: fund a stealth address with 1.2 ether
//! let ctx = CallContext::from(payer).with_value(parse_units("1.2", 18)?);
//! let receipt = ledger.send_ether(&mut host, &ctx, stealth_address, note)?;
//!
//! // Fee manager: sweep accrued fees to the fee taker
//! ledger.collect_paid_fees(&mut host, &CallContext::from(fee_manager))?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod access;
pub mod config;
pub mod custody;
pub mod fees;
mod journal;
pub mod ledger;


pub use access::{resolve_caller, Roles};
pub use config::{LedgerConfig, TollPolicy};
pub use custody::{CustodyLedger, StealthRecord};
pub use fees::FeeAccount;
pub use ledger::StealthLedger;
