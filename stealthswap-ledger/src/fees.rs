//! Fee account: protocol fee, native toll, and what is owed to the fee taker.

use serde::{Deserialize, Serialize};
use tracing::debug;

use stealthswap_core::units::amount_string;
use stealthswap_core::{Address, Amount, Host, LedgerError, Result, NATIVE_TOKEN};

use crate::journal::{Journal, Undo};

/// Fee configuration and accrued escrow.
///
/// `escrow` is denominated in the fee token, `toll_escrow` in native currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccount {
    fee_token: Address,
    #[serde(with = "amount_string")]
    protocol_fee: Amount,
    #[serde(with = "amount_string")]
    ether_toll: Amount,
    #[serde(with = "amount_string")]
    escrow: Amount,
    #[serde(with = "amount_string")]
    toll_escrow: Amount,
}

impl FeeAccount {
    /// Creates an account with empty escrows.
    pub fn new(fee_token: Address, protocol_fee: Amount, ether_toll: Amount) -> Self {
        Self {
            fee_token,
            protocol_fee,
            ether_toll,
            escrow: 0,
            toll_escrow: 0,
        }
    }

    /// Token the protocol fee is paid in.
    pub fn fee_token(&self) -> Address {
        self.fee_token
    }

    /// Fee-token amount charged per payment.
    pub fn protocol_fee(&self) -> Amount {
        self.protocol_fee
    }

    /// Minimum native value on token payments.
    pub fn ether_toll(&self) -> Amount {
        self.ether_toll
    }

    /// Fee tokens owed to the fee taker.
    pub fn escrow(&self) -> Amount {
        self.escrow
    }

    /// Retained native tolls owed to the fee taker.
    pub fn toll_escrow(&self) -> Amount {
        self.toll_escrow
    }

    /// Replaces the protocol fee, returning the previous one. Applies to later payments only.
    pub fn set_fee(&mut self, fee: Amount) -> Amount {
        std::mem::replace(&mut self.protocol_fee, fee)
    }

    /// Replaces the native toll, returning the previous one.
    pub fn set_toll(&mut self, toll: Amount) -> Amount {
        std::mem::replace(&mut self.ether_toll, toll)
    }

    /// Fails with `InsufficientAllowance` unless `payer` approved `spender` for at
    /// least the protocol fee.
    pub fn ensure_allowance(&self, host: &dyn Host, payer: &Address, spender: &Address) -> Result<()> {
        let token = host.token(&self.fee_token).ok_or_else(|| {
            LedgerError::transfer_failed(self.fee_token, "no token contract at address")
        })?;
        let allowance = token.allowance(payer, spender);
        if allowance < self.protocol_fee {
            debug!(%payer, allowance, fee = self.protocol_fee, "Fee allowance too low");
            return Err(LedgerError::InsufficientAllowance);
        }
        Ok(())
    }

    /// Pulls the protocol fee from `payer` into the ledger and credits the escrow.
    pub(crate) fn charge(
        &mut self,
        host: &mut dyn Host,
        journal: &mut Journal,
        payer: &Address,
        ledger: &Address,
    ) -> Result<Amount> {
        let fee = self.protocol_fee;
        journal.transfer_token_from(host, &self.fee_token, ledger, payer, ledger, fee)?;

        self.escrow = self
            .escrow
            .checked_add(fee)
            .ok_or_else(|| LedgerError::transfer_failed(self.fee_token, "fee escrow overflow"))?;
        journal.push(Undo::FeeCharged(fee));

        debug!(%payer, fee, escrow = self.escrow, "Charged protocol fee");
        Ok(fee)
    }

    /// Credits a native toll kept by the ledger.
    pub(crate) fn retain_toll(&mut self, journal: &mut Journal, amount: Amount) -> Result<()> {
        self.toll_escrow = self
            .toll_escrow
            .checked_add(amount)
            .ok_or_else(|| LedgerError::transfer_failed(NATIVE_TOKEN, "toll escrow overflow"))?;
        journal.push(Undo::TollRetained(amount));
        Ok(())
    }

    /// Transfers both escrows to `fee_taker` and zeroes them.
    ///
    /// The fee-token transfer happens even when the escrow is zero.
    pub(crate) fn collect(
        &mut self,
        host: &mut dyn Host,
        journal: &mut Journal,
        ledger: &Address,
        fee_taker: &Address,
    ) -> Result<(Amount, Amount)> {
        let token_amount = std::mem::take(&mut self.escrow);
        let native_amount = std::mem::take(&mut self.toll_escrow);
        journal.push(Undo::FeesDrained {
            token_amount,
            native_amount,
        });

        journal.transfer_token(host, &self.fee_token, ledger, fee_taker, token_amount)?;
        if native_amount > 0 {
            journal.transfer_native(host, ledger, fee_taker, native_amount)?;
        }

        debug!(%fee_taker, token_amount, native_amount, "Collected fees");
        Ok((token_amount, native_amount))
    }

    pub(crate) fn refund_fee(&mut self, amount: Amount) {
        self.escrow = self.escrow.saturating_sub(amount);
    }

    pub(crate) fn refund_toll(&mut self, amount: Amount) {
        self.toll_escrow = self.toll_escrow.saturating_sub(amount);
    }

    pub(crate) fn restore(&mut self, token_amount: Amount, native_amount: Amount) {
        self.escrow += token_amount;
        self.toll_escrow += native_amount;
    }
}
