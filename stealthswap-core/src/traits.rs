//! Interfaces the ledger runs against.
//!
//! The ledger never owns balances itself. Token contracts and native currency live in
//! a [`Host`], which tests and the simulator back with an in-memory chain.

use std::result::Result as StdResult;

use crate::error::TokenError;
use crate::types::{Address, Amount};

// ═══════════════════════════════════════════════════════════════════════════════
// ERC20 TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Standard ERC20 token interface.
///
/// `spender`/`from` are explicit because there is no implicit `msg.sender`.
pub trait Erc20 {
    /// Token symbol.
    fn symbol(&self) -> &str;

    /// Token decimals.
    fn decimals(&self) -> u8 {
        18
    }

    /// Balance of `owner`.
    fn balance_of(&self, owner: &Address) -> Amount;

    /// Amount `spender` may pull from `owner`.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Moves `amount` from `from` to `to`, called by `from` itself.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> StdResult<(), TokenError>;

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> StdResult<(), TokenError>;

    /// Sets the allowance of `spender` over `owner`'s tokens.
    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> StdResult<(), TokenError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Execution environment: native balances and deployed token contracts.
pub trait Host {
    /// Native balance of `account`.
    fn native_balance(&self, account: &Address) -> Amount;

    /// Moves native currency between accounts.
    fn transfer_native(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> StdResult<(), TokenError>;

    /// Token contract deployed at `address`.
    fn token(&self, address: &Address) -> Option<&dyn Erc20>;

    /// Mutable access to the token contract deployed at `address`.
    fn token_mut(&mut self, address: &Address) -> Option<&mut (dyn Erc20 + 'static)>;
}
