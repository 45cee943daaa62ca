//! Invocation context of a ledger call.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount};
use crate::units::amount_string;

/// Who is calling the ledger and with how much native value attached.
///
/// `relayed_sender` models the sender appended to calldata by a meta-transaction
/// relay. It is only honoured when `sender` is the ledger's trusted forwarder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Immediate sender of the call.
    pub sender: Address,
    /// Native value attached to the call, debited from `sender`.
    #[serde(with = "amount_string", default)]
    pub value: Amount,
    /// Sender appended by a forwarder, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relayed_sender: Option<Address>,
}

impl CallContext {
    /// A direct call without attached value.
    pub fn from(sender: Address) -> Self {
        Self {
            sender,
            value: 0,
            relayed_sender: None,
        }
    }

    /// A call relayed by `forwarder` on behalf of `principal`.
    pub fn relayed(forwarder: Address, principal: Address) -> Self {
        Self {
            sender: forwarder,
            value: 0,
            relayed_sender: Some(principal),
        }
    }

    /// Attaches native value.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builders() {
        let payer = Address::from_label("payer");
        let forwarder = Address::from_label("forwarder");

        let direct = CallContext::from(payer).with_value(5);
        assert_eq!(direct.sender, payer);
        assert_eq!(direct.value, 5);
        assert!(direct.relayed_sender.is_none());

        let relayed = CallContext::relayed(forwarder, payer);
        assert_eq!(relayed.sender, forwarder);
        assert_eq!(relayed.relayed_sender, Some(payer));
        assert_eq!(relayed.value, 0);
    }

    #[test]
    fn test_context_json_defaults() {
        let json = format!(r#"{{"sender":"{}"}}"#, Address::from_label("payer"));
        let ctx: CallContext = serde_json::from_str(&json).unwrap();
        assert_eq!(ctx.value, 0);
        assert!(ctx.relayed_sender.is_none());
    }
}
