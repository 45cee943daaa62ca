//! Undo journal for a single ledger call.
//!
//! Effects and transfers made by a call are appended as they happen. If a later step
//! fails, the journal is replayed backwards so the call leaves no trace.

use tracing::warn;

use stealthswap_core::{Address, Amount, Host, LedgerError, Result, TokenError, NATIVE_TOKEN};

use crate::custody::CustodyLedger;
use crate::fees::FeeAccount;

/// A reversible step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Undo {
    Recorded(Address),
    Cleared(Address),
    FeeCharged(Amount),
    TollRetained(Amount),
    FeesDrained {
        token_amount: Amount,
        native_amount: Amount,
    },
    NativeMoved {
        from: Address,
        to: Address,
        amount: Amount,
    },
    TokenMoved {
        token: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },
    AllowanceSpent {
        token: Address,
        owner: Address,
        spender: Address,
        previous: Amount,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<Undo>,
}

impl Journal {
    pub(crate) fn push(&mut self, undo: Undo) {
        self.entries.push(undo);
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Undo] {
        &self.entries
    }

    /// Moves native currency and journals the move.
    pub(crate) fn transfer_native(
        &mut self,
        host: &mut dyn Host,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        host.transfer_native(from, to, amount)
            .map_err(|e| LedgerError::transfer_failed(NATIVE_TOKEN, e))?;
        self.push(Undo::NativeMoved {
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }

    /// Calls `token.transfer(from → to)` and journals the move.
    pub(crate) fn transfer_token(
        &mut self,
        host: &mut dyn Host,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        let contract = host
            .token_mut(token)
            .ok_or_else(|| LedgerError::transfer_failed(*token, "no token contract at address"))?;
        contract
            .transfer(from, to, amount)
            .map_err(|e| LedgerError::transfer_failed(*token, e))?;
        self.push(Undo::TokenMoved {
            token: *token,
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }

    /// Calls `token.transferFrom(from → to)` as `spender` and journals the move and the
    /// allowance it consumed.
    pub(crate) fn transfer_token_from(
        &mut self,
        host: &mut dyn Host,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        let contract = host
            .token_mut(token)
            .ok_or_else(|| LedgerError::transfer_failed(*token, "no token contract at address"))?;
        let previous = contract.allowance(from, spender);
        contract
            .transfer_from(spender, from, to, amount)
            .map_err(|e| LedgerError::transfer_failed(*token, e))?;
        self.push(Undo::AllowanceSpent {
            token: *token,
            owner: *from,
            spender: *spender,
            previous,
        });
        self.push(Undo::TokenMoved {
            token: *token,
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }

    /// Reverts every journaled step, newest first.
    ///
    /// Host transfers are returned first. A transfer that cannot be returned stays in
    /// place, and the ledger keeps accounting for it: fee tokens or tolls still held by
    /// the ledger stay in escrow, and amounts already paid out are not restored. The
    /// transfers left in place are reported as `Err`.
    pub(crate) fn unwind(
        self,
        ledger: &Address,
        custody: &mut CustodyLedger,
        fees: &mut FeeAccount,
        host: &mut dyn Host,
    ) -> std::result::Result<(), String> {
        let fee_token = fees.fee_token();
        let mut kept = Kept::default();
        let mut stranded: Vec<String> = Vec::new();

        for undo in self.entries.iter().rev() {
            match undo {
                Undo::NativeMoved { from, to, amount } => {
                    if let Err(e) = host.transfer_native(to, from, *amount) {
                        warn!(%from, %to, amount, error = %e, "Failed to unwind native transfer");
                        kept.note(ledger, from, to, *amount, true);
                        stranded.push(format!("{} native from {} to {}", amount, from, to));
                    }
                }
                Undo::TokenMoved {
                    token,
                    from,
                    to,
                    amount,
                } => {
                    let result = match host.token_mut(token) {
                        Some(contract) => contract.transfer(to, from, *amount),
                        None => Err(TokenError::Reverted("no token contract at address".into())),
                    };
                    if let Err(e) = result {
                        warn!(%token, %from, %to, amount, error = %e, "Failed to unwind token transfer");
                        if *token == fee_token {
                            kept.note(ledger, from, to, *amount, false);
                        }
                        kept.spent.push((*token, *from));
                        stranded.push(format!("{} of {} from {} to {}", amount, token, from, to));
                    }
                }
                Undo::AllowanceSpent {
                    token,
                    owner,
                    spender,
                    previous,
                } => {
                    // Allowance backing a transfer that stayed in place stays spent.
                    if kept.spent.contains(&(*token, *owner)) {
                        continue;
                    }
                    if let Some(contract) = host.token_mut(token) {
                        if let Err(e) = contract.approve(owner, spender, *previous) {
                            warn!(%token, %owner, error = %e, "Failed to restore allowance");
                        }
                    }
                }
                _ => {}
            }
        }

        for undo in self.entries.into_iter().rev() {
            match undo {
                Undo::Recorded(stealth) => custody.forget(&stealth),
                Undo::Cleared(stealth) => custody.reinstate(&stealth),
                Undo::FeeCharged(amount) => {
                    let held = kept.take_fee_in(amount);
                    fees.refund_fee(amount - held);
                }
                Undo::TollRetained(amount) => {
                    let held = kept.take_native_in(amount);
                    fees.refund_toll(amount - held);
                }
                Undo::FeesDrained {
                    token_amount,
                    native_amount,
                } => {
                    let paid_tokens = kept.take_fee_out(token_amount);
                    let paid_native = kept.take_native_out(native_amount);
                    fees.restore(token_amount - paid_tokens, native_amount - paid_native);
                }
                _ => {}
            }
        }

        if stranded.is_empty() {
            Ok(())
        } else {
            Err(stranded.join("; "))
        }
    }
}

/// Amounts that failed to return during an unwind, by direction relative to the ledger.
#[derive(Debug, Default)]
struct Kept {
    fee_in: Amount,
    fee_out: Amount,
    native_in: Amount,
    native_out: Amount,
    spent: Vec<(Address, Address)>,
}

impl Kept {
    fn note(&mut self, ledger: &Address, from: &Address, to: &Address, amount: Amount, native: bool) {
        let (into, out_of) = if native {
            (&mut self.native_in, &mut self.native_out)
        } else {
            (&mut self.fee_in, &mut self.fee_out)
        };
        if to == ledger {
            *into = into.saturating_add(amount);
        } else if from == ledger {
            *out_of = out_of.saturating_add(amount);
        }
    }

    fn take_fee_in(&mut self, cap: Amount) -> Amount {
        take(&mut self.fee_in, cap)
    }

    fn take_fee_out(&mut self, cap: Amount) -> Amount {
        take(&mut self.fee_out, cap)
    }

    fn take_native_in(&mut self, cap: Amount) -> Amount {
        take(&mut self.native_in, cap)
    }

    fn take_native_out(&mut self, cap: Amount) -> Amount {
        take(&mut self.native_out, cap)
    }
}

fn take(pool: &mut Amount, cap: Amount) -> Amount {
    let taken = (*pool).min(cap);
    *pool -= taken;
    taken
}
