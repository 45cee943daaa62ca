//! In-memory ERC20 token.

use std::collections::HashMap;

use tracing::debug;

use stealthswap_core::{Address, Amount, Erc20, TokenError};

/// ERC20 token backed by hash maps.
///
/// Follows OpenZeppelin semantics: allowance is checked before balance in
/// `transfer_from`, and an allowance of `Amount::MAX` is never decremented.
#[derive(Clone, Debug, Default)]
pub struct MemoryToken {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl MemoryToken {
    /// Creates a token with 18 decimals and no supply.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: 18,
            ..Default::default()
        }
    }

    /// Overrides the decimals.
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total minted supply.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Creates `amount` new tokens for `to`.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::Reverted("ERC20: mint to the zero address".into()));
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        *self.balances.entry(*to).or_default() += amount;

        debug!(token = %self.symbol, %to, amount, "Minted");
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::TransferToZero);
        }
        let from_balance = self.balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance);
        }
        let to_balance = if from == to {
            from_balance - amount
        } else {
            self.balances.get(to).copied().unwrap_or(0)
        };
        let new_to = to_balance.checked_add(amount).ok_or(TokenError::Overflow)?;

        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, new_to);
        Ok(())
    }
}

impl Erc20 for MemoryToken {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)?;
        debug!(token = %self.symbol, %from, %to, amount, "Transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance);
        }
        self.move_balance(from, to, amount)?;
        if allowed != Amount::MAX {
            self.allowances.insert((*from, *spender), allowed - amount);
        }

        debug!(token = %self.symbol, %spender, %from, %to, amount, "TransferFrom");
        Ok(())
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), TokenError> {
        if spender.is_zero() {
            return Err(TokenError::ApproveToZero);
        }
        self.allowances.insert((*owner, *spender), amount);

        debug!(token = %self.symbol, %owner, %spender, amount, "Approval");
        Ok(())
    }
}
