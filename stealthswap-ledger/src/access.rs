//! Access control and sender resolution.
//!
//! Every state-changing entry point first resolves the principal it acts for. A call
//! coming from the trusted forwarder with an appended sender is attributed to that
//! sender; any other call is attributed to its immediate sender. Guards then compare
//! the principal against the stored roles.

use serde::{Deserialize, Serialize};

use stealthswap_core::{Address, CallContext, LedgerError, Result};

/// Resolves the principal a call acts for.
///
/// No signature verification happens here: the forwarder is trusted to have
/// authenticated `relayed_sender`.
pub fn resolve_caller(ctx: &CallContext, trusted_forwarder: Option<&Address>) -> Address {
    match (trusted_forwarder, ctx.relayed_sender) {
        (Some(forwarder), Some(relayed)) if *forwarder == ctx.sender => relayed,
        _ => ctx.sender,
    }
}

/// Stored principals of a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    /// Owner; zero after renouncement.
    pub owner: Address,
    /// May collect fees.
    pub fee_manager: Address,
    /// Receives collected fees.
    pub fee_taker: Address,
    /// Relay whose appended sender is honoured.
    pub trusted_forwarder: Option<Address>,
}

impl Roles {
    /// Resolves the principal of `ctx` against the configured forwarder.
    pub fn caller(&self, ctx: &CallContext) -> Address {
        resolve_caller(ctx, self.trusted_forwarder.as_ref())
    }

    /// Fails with `NotOwner` unless `caller` is the (non-renounced) owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if self.owner.is_zero() || *caller != self.owner {
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    /// Fails with `NotFeeManager` unless `caller` is the fee manager.
    pub fn ensure_fee_manager(&self, caller: &Address) -> Result<()> {
        if *caller != self.fee_manager {
            return Err(LedgerError::NotFeeManager);
        }
        Ok(())
    }

    /// Returns true if `address` is the configured forwarder.
    pub fn is_trusted_forwarder(&self, address: &Address) -> bool {
        self.trusted_forwarder.as_ref() == Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> Roles {
        Roles {
            owner: Address::from_label("owner"),
            fee_manager: Address::from_label("feeManager"),
            fee_taker: Address::from_label("feeTaker"),
            trusted_forwarder: Some(Address::from_label("forwarder")),
        }
    }

    #[test]
    fn test_direct_call_resolves_to_sender() {
        let payer = Address::from_label("payer");
        let forwarder = Address::from_label("forwarder");
        assert_eq!(resolve_caller(&CallContext::from(payer), Some(&forwarder)), payer);
        assert_eq!(resolve_caller(&CallContext::from(payer), None), payer);
    }

    #[test]
    fn test_forwarded_call_resolves_to_relayed_sender() {
        let receiver = Address::from_label("receiver");
        let forwarder = Address::from_label("forwarder");
        let ctx = CallContext::relayed(forwarder, receiver);
        assert_eq!(resolve_caller(&ctx, Some(&forwarder)), receiver);
    }

    #[test]
    fn test_untrusted_relay_is_its_own_caller() {
        let receiver = Address::from_label("receiver");
        let rogue = Address::from_label("rogue");
        let ctx = CallContext::relayed(rogue, receiver);

        assert_eq!(resolve_caller(&ctx, Some(&Address::from_label("forwarder"))), rogue);
        assert_eq!(resolve_caller(&ctx, None), rogue);
    }

    #[test]
    fn test_forwarder_without_appended_sender() {
        let forwarder = Address::from_label("forwarder");
        assert_eq!(resolve_caller(&CallContext::from(forwarder), Some(&forwarder)), forwarder);
    }

    #[test]
    fn test_guards() {
        let roles = roles();
        assert!(roles.ensure_owner(&Address::from_label("owner")).is_ok());
        assert!(matches!(
            roles.ensure_owner(&Address::from_label("attacker")),
            Err(LedgerError::NotOwner)
        ));
        assert!(roles.ensure_fee_manager(&Address::from_label("feeManager")).is_ok());
        assert!(matches!(
            roles.ensure_fee_manager(&Address::from_label("owner")),
            Err(LedgerError::NotFeeManager)
        ));
    }

    #[test]
    fn test_renounced_owner_rejects_everyone() {
        let mut roles = roles();
        roles.owner = Address::ZERO;
        assert!(roles.ensure_owner(&Address::ZERO).is_err());
    }

    #[test]
    fn test_caller_uses_configured_forwarder() {
        let roles = roles();
        let ctx = CallContext::relayed(Address::from_label("forwarder"), Address::from_label("owner"));
        assert_eq!(roles.caller(&ctx), Address::from_label("owner"));
        assert!(roles.is_trusted_forwarder(&Address::from_label("forwarder")));
        assert!(!roles.is_trusted_forwarder(&Address::from_label("owner")));
    }
}
