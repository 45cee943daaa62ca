//! Events emitted by the ledger and the receipts that carry them.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, PaymentNote, ReceiverTag};
use crate::units::amount_string;

/// An event emitted by a successful ledger call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    /// A stealth address was funded.
    PaymentNote {
        /// Stealth address, plain or hashed.
        receiver: ReceiverTag,
        /// Token contract, or the native sentinel.
        token: Address,
        /// Amount recorded for the stealth address.
        #[serde(with = "amount_string")]
        amount: Amount,
        /// Opaque note for the recipient.
        note: PaymentNote,
    },

    /// Custodied tokens were released.
    Withdrawal {
        /// Stealth address that withdrew.
        receiver: Address,
        /// Destination of the tokens.
        interim: Address,
        /// Amount released.
        #[serde(with = "amount_string")]
        amount: Amount,
        /// Token contract.
        token: Address,
    },

    /// Accrued fees were swept to the fee taker.
    FeesCollected {
        /// Recipient of the fees.
        fee_taker: Address,
        /// Fee-token amount transferred.
        #[serde(with = "amount_string")]
        token_amount: Amount,
        /// Retained native tolls transferred.
        #[serde(with = "amount_string")]
        native_amount: Amount,
    },

    /// Ownership changed hands (or was renounced to the zero address).
    OwnershipTransferred {
        /// Previous owner.
        previous_owner: Address,
        /// New owner.
        new_owner: Address,
    },

    /// Protocol fee changed.
    ProtocolFeeUpdated {
        /// Fee before the change.
        #[serde(with = "amount_string")]
        previous: Amount,
        /// Fee after the change.
        #[serde(with = "amount_string")]
        current: Amount,
    },

    /// Native toll changed.
    EtherTollUpdated {
        /// Toll before the change.
        #[serde(with = "amount_string")]
        previous: Amount,
        /// Toll after the change.
        #[serde(with = "amount_string")]
        current: Amount,
    },

    /// Trusted forwarder changed.
    ForwarderUpdated {
        /// New forwarder.
        forwarder: Address,
    },

    /// Fee manager changed.
    FeeManagerUpdated {
        /// New fee manager.
        fee_manager: Address,
    },

    /// Fee taker changed.
    FeeTakerUpdated {
        /// New fee taker.
        fee_taker: Address,
    },
}

impl LedgerEvent {
    /// Returns the event name as it appears in logs.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::PaymentNote { .. } => "PaymentNote",
            LedgerEvent::Withdrawal { .. } => "Withdrawal",
            LedgerEvent::FeesCollected { .. } => "FeesCollected",
            LedgerEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            LedgerEvent::ProtocolFeeUpdated { .. } => "ProtocolFeeUpdated",
            LedgerEvent::EtherTollUpdated { .. } => "EtherTollUpdated",
            LedgerEvent::ForwarderUpdated { .. } => "ForwarderUpdated",
            LedgerEvent::FeeManagerUpdated { .. } => "FeeManagerUpdated",
            LedgerEvent::FeeTakerUpdated { .. } => "FeeTakerUpdated",
        }
    }
}

/// Outcome of a successful ledger call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Principal the call was attributed to after sender resolution.
    pub caller: Address,
    /// Events in emission order.
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    /// Creates an empty receipt for `caller`.
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            events: Vec::new(),
        }
    }

    /// Appends an event.
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Returns the first event with the given name.
    pub fn find(&self, name: &str) -> Option<&LedgerEvent> {
        self.events.iter().find(|e| e.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_withdrawal_event_json() {
        let event = LedgerEvent::Withdrawal {
            receiver: Address::from_label("receiver"),
            interim: Address::from_label("interim"),
            amount: 100_000_000_000_000_000_000,
            token: Address::from_label("token"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "Withdrawal");
        assert_eq!(json["amount"], "100000000000000000000");

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_receipt_find() {
        let mut receipt = Receipt::new(Address::from_label("owner"));
        receipt.emit(LedgerEvent::ForwarderUpdated {
            forwarder: Address::from_label("forwarder"),
        });

        assert!(receipt.find("ForwarderUpdated").is_some());
        assert!(receipt.find("PaymentNote").is_none());
    }
}
