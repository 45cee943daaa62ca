//! Domain types for StealthSwap.
//!
//! - [`Address`] and [`Asset`]: principals and what a stealth address holds
//! - [`PaymentNote`] and [`ReceiverTag`]: the opaque announcement published with a payment
//! - [`LedgerEvent`] and [`Receipt`]: what a successful call emits
//! - [`CallContext`]: who is calling, with how much native value attached

mod address;
mod call;
mod event;
mod note;

pub use address::*;
pub use call::*;
pub use event::*;
pub use note::*;
