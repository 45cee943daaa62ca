//! Custody ledger: what each stealth address was funded with.
//!
//! A stealth address moves through three states:
//!
//! ```text
//! unused ──record_payment──► funded ──clear_payment──► consumed
//! ```
//!
//! Native records settle at payment time and never become withdrawable. No state
//! leads back to `unused`, so an address is funded at most once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use stealthswap_core::units::amount_string;
use stealthswap_core::{Address, Amount, Asset, LedgerError, Result};

/// What a stealth address was funded with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthRecord {
    /// Native currency or the custodied token.
    pub asset: Asset,
    /// Amount in the asset's smallest unit.
    #[serde(with = "amount_string")]
    pub amount: Amount,
    /// Set once custodied tokens were released.
    pub consumed: bool,
}

impl StealthRecord {
    /// Returns true while tokens are held for this address.
    pub fn is_withdrawable(&self) -> bool {
        !self.consumed && !self.asset.is_native()
    }
}

/// Stealth address → funding record.
#[derive(Clone, Debug, Default)]
pub struct CustodyLedger {
    records: HashMap<Address, StealthRecord>,
}

impl CustodyLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the single funding of `stealth`.
    pub fn record_payment(&mut self, stealth: Address, asset: Asset, amount: Amount) -> Result<()> {
        if self.records.contains_key(&stealth) {
            return Err(LedgerError::AlreadyUsed);
        }
        self.records.insert(
            stealth,
            StealthRecord {
                asset,
                amount,
                consumed: false,
            },
        );

        debug!(%stealth, ?asset, amount, "Recorded payment");
        Ok(())
    }

    /// Marks the custodied tokens of `stealth` as released and returns them.
    pub fn clear_payment(&mut self, stealth: &Address) -> Result<(Address, Amount)> {
        let record = self.records.get_mut(stealth).ok_or(LedgerError::Unavailable)?;
        let token = match record.asset {
            Asset::Token(token) if !record.consumed => token,
            _ => return Err(LedgerError::Unavailable),
        };
        record.consumed = true;

        debug!(%stealth, %token, amount = record.amount, "Cleared payment");
        Ok((token, record.amount))
    }

    /// Returns true if `stealth` was ever funded.
    pub fn is_used(&self, stealth: &Address) -> bool {
        self.records.contains_key(stealth)
    }

    /// Returns the record of `stealth`.
    pub fn record(&self, stealth: &Address) -> Option<&StealthRecord> {
        self.records.get(stealth)
    }

    /// Total custodied and not yet withdrawn amount of `token`.
    pub fn outstanding(&self, token: &Address) -> Amount {
        self.records
            .values()
            .filter(|r| r.is_withdrawable() && r.asset == Asset::Token(*token))
            .map(|r| r.amount)
            .sum()
    }

    /// Number of funded addresses.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was ever funded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reverts a `record_payment` made by a call that is being unwound.
    pub(crate) fn forget(&mut self, stealth: &Address) {
        self.records.remove(stealth);
    }

    /// Reverts a `clear_payment` made by a call that is being unwound.
    pub(crate) fn reinstate(&mut self, stealth: &Address) {
        if let Some(record) = self.records.get_mut(stealth) {
            record.consumed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_reuse() {
        let mut custody = CustodyLedger::new();
        let stealth = Address::from_label("receiver1");

        custody.record_payment(stealth, Asset::Native, 10).unwrap();
        assert!(custody.is_used(&stealth));
        assert!(matches!(
            custody.record_payment(stealth, Asset::Token(Address::from_label("tt")), 5),
            Err(LedgerError::AlreadyUsed)
        ));
        assert_eq!(custody.record(&stealth).unwrap().amount, 10);
    }

    #[test]
    fn test_native_record_is_not_withdrawable() {
        let mut custody = CustodyLedger::new();
        let stealth = Address::from_label("receiver1");
        custody.record_payment(stealth, Asset::Native, 10).unwrap();

        assert!(matches!(
            custody.clear_payment(&stealth),
            Err(LedgerError::Unavailable)
        ));
    }

    #[test]
    fn test_clear_once() {
        let mut custody = CustodyLedger::new();
        let stealth = Address::from_label("receiver2");
        let token = Address::from_label("tt");
        custody.record_payment(stealth, Asset::Token(token), 100).unwrap();
        assert_eq!(custody.outstanding(&token), 100);

        assert_eq!(custody.clear_payment(&stealth).unwrap(), (token, 100));
        assert!(matches!(
            custody.clear_payment(&stealth),
            Err(LedgerError::Unavailable)
        ));
        assert_eq!(custody.outstanding(&token), 0);

        // Consumed addresses stay used.
        assert!(matches!(
            custody.record_payment(stealth, Asset::Token(token), 1),
            Err(LedgerError::AlreadyUsed)
        ));
    }

    #[test]
    fn test_clear_unknown_address() {
        let mut custody = CustodyLedger::new();
        assert!(matches!(
            custody.clear_payment(&Address::from_label("attacker")),
            Err(LedgerError::Unavailable)
        ));
        assert!(custody.is_empty());
    }

    #[test]
    fn test_forget_and_reinstate() {
        let mut custody = CustodyLedger::new();
        let stealth = Address::from_label("receiver");
        let token = Address::from_label("tt");

        custody.record_payment(stealth, Asset::Token(token), 7).unwrap();
        custody.clear_payment(&stealth).unwrap();
        custody.reinstate(&stealth);
        assert!(custody.record(&stealth).unwrap().is_withdrawable());

        custody.forget(&stealth);
        assert!(!custody.is_used(&stealth));
        assert_eq!(custody.len(), 0);
    }
}
