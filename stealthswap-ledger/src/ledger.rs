//! The stealth-payment ledger.
//!
//! Every entry point follows the same shape:
//!
//! 1. resolve the principal through the trusted forwarder
//! 2. run all checks against current state
//! 3. apply ledger effects, then perform transfers, journaling each step
//! 4. on any failure replay the journal backwards
//!
//! so a call either fully commits and returns a [`Receipt`] or leaves ledger and host
//! exactly as it found them.

use tracing::{debug, info, instrument, warn};

use stealthswap_core::{
    Address, Amount, Asset, CallContext, Host, LedgerError, LedgerEvent, PaymentNote, Receipt,
    ReceiverDisclosure, ReceiverTag, Result,
};

use crate::access::Roles;
use crate::config::{LedgerConfig, TollPolicy};
use crate::custody::{CustodyLedger, StealthRecord};
use crate::fees::FeeAccount;
use crate::journal::{Journal, Undo};

/// Custodian and notary for stealth-address payments.
///
/// The ledger owns its state; balances live in the [`Host`] passed to each call.
/// `address` is the ledger's own account on that host.
#[derive(Clone, Debug)]
pub struct StealthLedger {
    address: Address,
    roles: Roles,
    fees: FeeAccount,
    custody: CustodyLedger,
    receiver_disclosure: ReceiverDisclosure,
    toll_policy: TollPolicy,
}

impl StealthLedger {
    /// Creates a ledger at `address` from a validated configuration.
    pub fn deploy(address: Address, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        if address.is_zero() {
            return Err(LedgerError::Config("ledger address must not be zero".into()));
        }

        info!(
            %address,
            owner = %config.owner,
            fee_token = %config.fee_token,
            protocol_fee = config.protocol_fee,
            ether_toll = config.ether_toll,
            "Deployed stealth ledger"
        );

        Ok(Self {
            address,
            roles: Roles {
                owner: config.owner,
                fee_manager: config.fee_manager,
                fee_taker: config.fee_taker,
                trusted_forwarder: config.trusted_forwarder.filter(|f| !f.is_zero()),
            },
            fees: FeeAccount::new(config.fee_token, config.protocol_fee, config.ether_toll),
            custody: CustodyLedger::new(),
            receiver_disclosure: config.receiver_disclosure,
            toll_policy: config.toll_policy,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PAYMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Funds `receiver` with the native value attached to the call.
    ///
    /// The full value is forwarded to `receiver`; the protocol fee is charged in the
    /// fee token.
    ///
    /// # Errors
    ///
    /// - `BelowProtocolFee` unless `ctx.value > protocol_fee`
    /// - `InsufficientAllowance` if the payer has not approved the fee
    /// - `AlreadyUsed` if `receiver` was ever funded
    /// - `TransferFailed` if the fee or the value cannot be moved
    #[instrument(skip(self, host, note), fields(sender = %ctx.sender, value = ctx.value))]
    pub fn send_ether(
        &mut self,
        host: &mut dyn Host,
        ctx: &CallContext,
        receiver: Address,
        note: PaymentNote,
    ) -> Result<Receipt> {
        let payer = self.roles.caller(ctx);
        let value = ctx.value;

        if value <= self.fees.protocol_fee() {
            return Err(self.reject(LedgerError::BelowProtocolFee));
        }
        self.fees
            .ensure_allowance(host, &payer, &self.address)
            .map_err(|e| self.reject(e))?;
        if self.custody.is_used(&receiver) {
            return Err(self.reject(LedgerError::AlreadyUsed));
        }

        let ledger = self.address;
        self.transact(host, |this, host, journal| {
            journal.transfer_native(host, &ctx.sender, &ledger, value)?;

            this.custody.record_payment(receiver, Asset::Native, value)?;
            journal.push(Undo::Recorded(receiver));
            this.fees.charge(host, journal, &payer, &ledger)?;

            journal.transfer_native(host, &ledger, &receiver, value)?;
            Ok(())
        })?;

        info!(%payer, %receiver, value, "Native stealth payment");
        let mut receipt = Receipt::new(payer);
        receipt.emit(self.payment_event(&receiver, Asset::Native, value, note));
        Ok(receipt)
    }

    /// Funds `receiver` with `amount` of `token`, held in ledger custody until
    /// withdrawn. The native value attached must cover the toll.
    ///
    /// # Errors
    ///
    /// - `AlreadyUsed` if `receiver` was ever funded
    /// - `BelowEtherToll` unless `ctx.value >= ether_toll`
    /// - `InsufficientAllowance` if the payer has not approved the fee
    /// - `TransferFailed` if the fee, the tokens or the toll cannot be moved
    #[instrument(skip(self, host, note), fields(sender = %ctx.sender, value = ctx.value))]
    pub fn send_erc20(
        &mut self,
        host: &mut dyn Host,
        ctx: &CallContext,
        receiver: Address,
        token: Address,
        amount: Amount,
        note: PaymentNote,
    ) -> Result<Receipt> {
        let payer = self.roles.caller(ctx);
        let value = ctx.value;

        if self.custody.is_used(&receiver) {
            return Err(self.reject(LedgerError::AlreadyUsed));
        }
        if value < self.fees.ether_toll() {
            return Err(self.reject(LedgerError::BelowEtherToll));
        }
        self.fees
            .ensure_allowance(host, &payer, &self.address)
            .map_err(|e| self.reject(e))?;

        let ledger = self.address;
        let policy = self.toll_policy;
        self.transact(host, |this, host, journal| {
            journal.transfer_native(host, &ctx.sender, &ledger, value)?;

            this.custody.record_payment(receiver, Asset::Token(token), amount)?;
            journal.push(Undo::Recorded(receiver));
            this.fees.charge(host, journal, &payer, &ledger)?;

            journal.transfer_token_from(host, &token, &ledger, &payer, &ledger, amount)?;
            match policy {
                TollPolicy::Retain => this.fees.retain_toll(journal, value)?,
                TollPolicy::ForwardToReceiver => {
                    journal.transfer_native(host, &ledger, &receiver, value)?
                }
            }
            Ok(())
        })?;

        info!(%payer, %receiver, %token, amount, toll = value, "Token stealth payment");
        let mut receipt = Receipt::new(payer);
        receipt.emit(self.payment_event(&receiver, Asset::Token(token), amount, note));
        Ok(receipt)
    }

    /// Releases the tokens custodied for the calling stealth address to
    /// `destination`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the caller holds nothing (never funded, native, or
    ///   already withdrawn)
    /// - `TransferFailed` if the token transfer fails
    #[instrument(skip(self, host), fields(sender = %ctx.sender))]
    pub fn withdraw(
        &mut self,
        host: &mut dyn Host,
        ctx: &CallContext,
        destination: Address,
    ) -> Result<Receipt> {
        let caller = self.roles.caller(ctx);
        let ledger = self.address;

        let (token, amount) = self.transact(host, |this, host, journal| {
            let (token, amount) = this.custody.clear_payment(&caller)?;
            journal.push(Undo::Cleared(caller));

            journal.transfer_token(host, &token, &ledger, &destination, amount)?;
            Ok((token, amount))
        })?;

        info!(receiver = %caller, %destination, %token, amount, "Withdrawal");
        let mut receipt = Receipt::new(caller);
        receipt.emit(LedgerEvent::Withdrawal {
            receiver: caller,
            interim: destination,
            amount,
            token,
        });
        Ok(receipt)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FEES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Sweeps accrued fee tokens and retained tolls to the fee taker.
    ///
    /// A zero escrow is a successful zero transfer.
    #[instrument(skip(self, host), fields(sender = %ctx.sender))]
    pub fn collect_paid_fees(&mut self, host: &mut dyn Host, ctx: &CallContext) -> Result<Receipt> {
        let caller = self.roles.caller(ctx);
        self.roles
            .ensure_fee_manager(&caller)
            .map_err(|e| self.reject(e))?;

        let ledger = self.address;
        let fee_taker = self.roles.fee_taker;
        let (token_amount, native_amount) = self.transact(host, |this, host, journal| {
            this.fees.collect(host, journal, &ledger, &fee_taker)
        })?;

        info!(%fee_taker, token_amount, native_amount, "Collected paid fees");
        let mut receipt = Receipt::new(caller);
        receipt.emit(LedgerEvent::FeesCollected {
            fee_taker,
            token_amount,
            native_amount,
        });
        Ok(receipt)
    }

    /// Sets the protocol fee for subsequent payments.
    #[instrument(skip(self), fields(sender = %ctx.sender))]
    pub fn set_protocol_fee(&mut self, ctx: &CallContext, fee: Amount) -> Result<Receipt> {
        let caller = self.owner_call(ctx)?;
        let previous = self.fees.set_fee(fee);

        debug!(previous, current = fee, "Protocol fee updated");
        Ok(Self::single(
            caller,
            LedgerEvent::ProtocolFeeUpdated {
                previous,
                current: fee,
            },
        ))
    }

    /// Sets the minimum native value for token payments.
    #[instrument(skip(self), fields(sender = %ctx.sender))]
    pub fn set_ether_toll(&mut self, ctx: &CallContext, toll: Amount) -> Result<Receipt> {
        let caller = self.owner_call(ctx)?;
        let previous = self.fees.set_toll(toll);

        debug!(previous, current = toll, "Ether toll updated");
        Ok(Self::single(
            caller,
            LedgerEvent::EtherTollUpdated {
                previous,
                current: toll,
            },
        ))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMINISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Sets the trusted forwarder. The zero address disables forwarding.
    #[instrument(skip(self), fields(sender = %ctx.sender))]
    pub fn set_forwarder(&mut self, ctx: &CallContext, forwarder: Address) -> Result<Receipt> {
        let caller = self.owner_call(ctx)?;
        self.roles.trusted_forwarder = (!forwarder.is_zero()).then_some(forwarder);

        debug!(%forwarder, "Trusted forwarder updated");
        Ok(Self::single(caller, LedgerEvent::ForwarderUpdated { forwarder }))
    }

    /// Hands ownership to `new_owner`.
    #[instrument(skip(self), fields(sender = %ctx.sender))]
    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<Receipt> {
        let caller = self.owner_call(ctx)?;
        if new_owner.is_zero() {
            return Err(self.reject(LedgerError::ZeroOwner));
        }
        Ok(self.replace_owner(caller, new_owner))
    }

    /// Gives up ownership. Owner-only operations are unavailable afterwards.
    #[instrument(skip(self), fields(sender = %ctx.sender))]
    pub fn renounce_ownership(&mut self, ctx: &CallContext) -> Result<Receipt> {
        let caller = self.owner_call(ctx)?;
        Ok(self.replace_owner(caller, Address::ZERO))
    }

    /// Sets the principal allowed to collect fees.
    #[instrument(skip(self), fields(sender = %ctx.sender))]
    pub fn set_fee_manager(&mut self, ctx: &CallContext, fee_manager: Address) -> Result<Receipt> {
        let caller = self.owner_call(ctx)?;
        if fee_manager.is_zero() {
            return Err(self.reject(LedgerError::InvalidAddress(
                "fee manager must not be the zero address".into(),
            )));
        }
        self.roles.fee_manager = fee_manager;

        debug!(%fee_manager, "Fee manager updated");
        Ok(Self::single(caller, LedgerEvent::FeeManagerUpdated { fee_manager }))
    }

    /// Sets the recipient of collected fees.
    #[instrument(skip(self), fields(sender = %ctx.sender))]
    pub fn set_fee_taker(&mut self, ctx: &CallContext, fee_taker: Address) -> Result<Receipt> {
        let caller = self.owner_call(ctx)?;
        if fee_taker.is_zero() {
            return Err(self.reject(LedgerError::InvalidAddress(
                "fee taker must not be the zero address".into(),
            )));
        }
        self.roles.fee_taker = fee_taker;

        debug!(%fee_taker, "Fee taker updated");
        Ok(Self::single(caller, LedgerEvent::FeeTakerUpdated { fee_taker }))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The ledger's own account on the host.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owner (zero once renounced).
    pub fn owner(&self) -> Address {
        self.roles.owner
    }

    /// Principal allowed to collect fees.
    pub fn fee_manager(&self) -> Address {
        self.roles.fee_manager
    }

    /// Recipient of collected fees.
    pub fn fee_taker(&self) -> Address {
        self.roles.fee_taker
    }

    /// Fee-token amount charged per payment.
    pub fn protocol_fee(&self) -> Amount {
        self.fees.protocol_fee()
    }

    /// Minimum native value on token payments.
    pub fn ether_toll(&self) -> Amount {
        self.fees.ether_toll()
    }

    /// Token the protocol fee is paid in.
    pub fn fee_token(&self) -> Address {
        self.fees.fee_token()
    }

    /// Configured trusted forwarder.
    pub fn trusted_forwarder(&self) -> Option<Address> {
        self.roles.trusted_forwarder
    }

    /// Returns true if `address` is the trusted forwarder.
    pub fn is_trusted_forwarder(&self, address: &Address) -> bool {
        self.roles.is_trusted_forwarder(address)
    }

    /// Fee tokens owed to the fee taker.
    pub fn fee_escrow(&self) -> Amount {
        self.fees.escrow()
    }

    /// Retained native tolls owed to the fee taker.
    pub fn toll_escrow(&self) -> Amount {
        self.fees.toll_escrow()
    }

    /// Returns true if `stealth` was ever funded.
    pub fn is_used(&self, stealth: &Address) -> bool {
        self.custody.is_used(stealth)
    }

    /// Funding record of `stealth`.
    pub fn record(&self, stealth: &Address) -> Option<&StealthRecord> {
        self.custody.record(stealth)
    }

    /// Tokens of `token` held for stealth addresses and not yet withdrawn.
    pub fn outstanding(&self, token: &Address) -> Amount {
        self.custody.outstanding(token)
    }

    /// How receivers appear in payment events.
    pub fn receiver_disclosure(&self) -> ReceiverDisclosure {
        self.receiver_disclosure
    }

    /// Where token-payment tolls go.
    pub fn toll_policy(&self) -> TollPolicy {
        self.toll_policy
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Runs `op` with a fresh journal, unwinding it if `op` fails.
    fn transact<T, F>(&mut self, host: &mut dyn Host, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &mut dyn Host, &mut Journal) -> Result<T>,
    {
        let mut journal = Journal::default();
        match op(&mut *self, &mut *host, &mut journal) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(error = %err, "Call reverted, unwinding");
                let ledger = self.address;
                match journal.unwind(&ledger, &mut self.custody, &mut self.fees, host) {
                    Ok(()) => Err(err),
                    Err(stranded) => Err(LedgerError::IncompleteRevert {
                        cause: Box::new(err),
                        stranded,
                    }),
                }
            }
        }
    }

    fn reject(&self, err: LedgerError) -> LedgerError {
        warn!(error = %err, "Call rejected");
        err
    }

    fn owner_call(&self, ctx: &CallContext) -> Result<Address> {
        let caller = self.roles.caller(ctx);
        self.roles.ensure_owner(&caller).map_err(|e| self.reject(e))?;
        Ok(caller)
    }

    fn replace_owner(&mut self, caller: Address, new_owner: Address) -> Receipt {
        let previous_owner = std::mem::replace(&mut self.roles.owner, new_owner);

        info!(%previous_owner, %new_owner, "Ownership transferred");
        Self::single(
            caller,
            LedgerEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        )
    }

    fn payment_event(
        &self,
        receiver: &Address,
        asset: Asset,
        amount: Amount,
        note: PaymentNote,
    ) -> LedgerEvent {
        LedgerEvent::PaymentNote {
            receiver: ReceiverTag::for_receiver(receiver, self.receiver_disclosure),
            token: asset.token_address(),
            amount,
            note,
        }
    }

    fn single(caller: Address, event: LedgerEvent) -> Receipt {
        let mut receipt = Receipt::new(caller);
        receipt.emit(event);
        receipt
    }
}
