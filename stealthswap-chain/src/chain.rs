//! In-memory host chain.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, instrument};

use stealthswap_core::{Address, Amount, Erc20, Host, TokenError};

use crate::token::MemoryToken;

/// Native balances plus deployed token contracts.
///
/// Standard tokens are [`MemoryToken`]s and can be minted into through the chain.
/// Arbitrary [`Erc20`] implementations (for instance a token that always reverts)
/// can be installed with [`MemoryChain::deploy_contract`].
#[derive(Default)]
pub struct MemoryChain {
    /// Native balance per account
    native: HashMap<Address, Amount>,
    /// Standard tokens by contract address
    tokens: HashMap<Address, MemoryToken>,
    /// Custom token contracts by contract address
    contracts: HashMap<Address, Box<dyn Erc20>>,
}

impl MemoryChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds native currency to `account` out of thin air.
    pub fn credit_native(&mut self, account: &Address, amount: Amount) {
        *self.native.entry(*account).or_default() += amount;
        debug!(%account, amount, "Credited native");
    }

    /// Deploys a standard token at `address`, replacing any previous contract there.
    pub fn deploy_token(&mut self, address: Address, token: MemoryToken) -> Address {
        debug!(%address, symbol = token.symbol(), "Deployed token");
        self.contracts.remove(&address);
        self.tokens.insert(address, token);
        address
    }

    /// Deploys a custom token contract at `address`.
    pub fn deploy_contract(&mut self, address: Address, contract: Box<dyn Erc20>) -> Address {
        debug!(%address, symbol = contract.symbol(), "Deployed contract");
        self.tokens.remove(&address);
        self.contracts.insert(address, contract);
        address
    }

    /// Mints standard tokens.
    pub fn mint(&mut self, token: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.tokens
            .get_mut(token)
            .ok_or_else(|| TokenError::Reverted(format!("no token deployed at {}", token)))?
            .mint(to, amount)
    }

    /// Sets an allowance on any deployed token.
    pub fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.token_mut(token)
            .ok_or_else(|| TokenError::Reverted(format!("no token deployed at {}", token)))?
            .approve(owner, spender, amount)
    }

    /// Token balance of `account`, zero if no token is deployed at `token`.
    pub fn token_balance(&self, token: &Address, account: &Address) -> Amount {
        self.token(token).map(|t| t.balance_of(account)).unwrap_or(0)
    }

    /// Returns true if any contract is deployed at `address`.
    pub fn is_deployed(&self, address: &Address) -> bool {
        self.tokens.contains_key(address) || self.contracts.contains_key(address)
    }
}

impl fmt::Debug for MemoryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryChain")
            .field("accounts", &self.native.len())
            .field("tokens", &self.tokens.keys().collect::<Vec<_>>())
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Host for MemoryChain {
    fn native_balance(&self, account: &Address) -> Amount {
        self.native.get(account).copied().unwrap_or(0)
    }

    #[instrument(skip(self))]
    fn transfer_native(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let from_balance = self.native_balance(from);
        if from_balance < amount {
            return Err(TokenError::Reverted(format!(
                "insufficient native balance: have {}, need {}",
                from_balance, amount
            )));
        }
        if from == to {
            return Ok(());
        }
        let new_to = self
            .native_balance(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.native.insert(*from, from_balance - amount);
        self.native.insert(*to, new_to);
        Ok(())
    }

    fn token(&self, address: &Address) -> Option<&dyn Erc20> {
        if let Some(token) = self.tokens.get(address) {
            return Some(token as &dyn Erc20);
        }
        self.contracts.get(address).map(|c| &**c)
    }

    fn token_mut(&mut self, address: &Address) -> Option<&mut (dyn Erc20 + 'static)> {
        if let Some(token) = self.tokens.get_mut(address) {
            return Some(token as &mut (dyn Erc20 + 'static));
        }
        self.contracts.get_mut(address).map(|c| &mut **c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_native_transfer() {
        let mut chain = MemoryChain::new();
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        chain.credit_native(&alice, 100);

        chain.transfer_native(&alice, &bob, 40).unwrap();
        assert_eq!(chain.native_balance(&alice), 60);
        assert_eq!(chain.native_balance(&bob), 40);
    }

    #[test_case(0, 1 ; "empty account")]
    #[test_case(10, 11 ; "one over balance")]
    fn test_native_transfer_rejects_overdraft(balance: Amount, amount: Amount) {
        let mut chain = MemoryChain::new();
        let alice = Address::from_label("alice");
        chain.credit_native(&alice, balance);

        assert!(chain
            .transfer_native(&alice, &Address::from_label("bob"), amount)
            .is_err());
        assert_eq!(chain.native_balance(&alice), balance);
    }

    #[test]
    fn test_token_through_host() {
        let mut chain = MemoryChain::new();
        let owl = chain.deploy_token(Address::from_label("owl"), MemoryToken::new("Owl", "OWL"));
        let alice = Address::from_label("alice");
        let ledger = Address::from_label("ledger");

        chain.mint(&owl, &alice, 50).unwrap();
        chain.approve(&owl, &alice, &ledger, 20).unwrap();

        let token = chain.token_mut(&owl).unwrap();
        token.transfer_from(&ledger, &alice, &ledger, 20).unwrap();

        assert_eq!(chain.token_balance(&owl, &ledger), 20);
        assert_eq!(chain.token_balance(&owl, &alice), 30);
        assert!(chain.is_deployed(&owl));
        assert!(chain.token(&Address::from_label("missing")).is_none());
    }

    #[test]
    fn test_mint_requires_deployed_token() {
        let mut chain = MemoryChain::new();
        let err = chain
            .mint(&Address::from_label("missing"), &Address::from_label("alice"), 1)
            .unwrap_err();
        assert!(err.to_string().contains("no token deployed"));
    }
}
