//! Error types for StealthSwap.
//!
//! Ledger failures use the exact revert reasons of the deployed contracts as their
//! `Display` output, so a caller comparing strings sees the same text a wallet would.

use thiserror::Error;

use crate::constants::{
    REVERT_ALREADY_USED, REVERT_BELOW_ETHER_TOLL, REVERT_BELOW_PROTOCOL_FEE,
    REVERT_INSUFFICIENT_ALLOWANCE, REVERT_NOT_OWNER, REVERT_UNAVAILABLE,
    REVERT_WRONG_FEE_MANAGER, REVERT_ZERO_OWNER,
};
use crate::types::Address;

/// Result type alias using `LedgerError`.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Main error type for all ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ═══════════════════════════════════════════════════════════════════════════
    // AUTHORIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Owner-only operation called by someone else.
    #[error("{}", REVERT_NOT_OWNER)]
    NotOwner,

    /// Fee collection called by someone other than the fee manager.
    #[error("{}", REVERT_WRONG_FEE_MANAGER)]
    NotFeeManager,

    /// Ownership handed to the zero address.
    #[error("{}", REVERT_ZERO_OWNER)]
    ZeroOwner,

    // ═══════════════════════════════════════════════════════════════════════════
    // REUSE
    // ═══════════════════════════════════════════════════════════════════════════

    /// The stealth address has already been funded.
    #[error("{}", REVERT_ALREADY_USED)]
    AlreadyUsed,

    /// Nothing is custodied for the caller (never funded, native, or withdrawn).
    #[error("{}", REVERT_UNAVAILABLE)]
    Unavailable,

    // ═══════════════════════════════════════════════════════════════════════════
    // INSUFFICIENT PAYMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Native payment value not strictly above the protocol fee.
    #[error("{}", REVERT_BELOW_PROTOCOL_FEE)]
    BelowProtocolFee,

    /// Token payment value below the native toll.
    #[error("{}", REVERT_BELOW_ETHER_TOLL)]
    BelowEtherToll,

    // ═══════════════════════════════════════════════════════════════════════════
    // ALLOWANCE / TRANSFER
    // ═══════════════════════════════════════════════════════════════════════════

    /// Payer has not approved the ledger for the protocol fee.
    #[error("{}", REVERT_INSUFFICIENT_ALLOWANCE)]
    InsufficientAllowance,

    /// An underlying asset transfer failed.
    #[error("StealthSwap: transfer of {token} failed: {reason}")]
    TransferFailed {
        /// Token contract (or the native sentinel) that failed.
        token: Address,
        /// Reason reported by the token or host.
        reason: String,
    },

    /// A call failed and some of its completed transfers could not be returned.
    ///
    /// Escrow still accounts for any fee tokens or tolls the ledger kept.
    #[error("{cause} (incomplete revert: {stranded})")]
    IncompleteRevert {
        /// The failure that triggered the revert.
        cause: Box<LedgerError>,
        /// Transfers left in place.
        stranded: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT / CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Malformed payment note.
    #[error("Invalid payment note: {0}")]
    InvalidNote(String),

    /// Malformed address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed decimal amount.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid deployment configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Failure categories callers can react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong owner or fee manager.
    Authorization,
    /// Address already funded, or nothing left to withdraw.
    Reuse,
    /// Attached value below the fee or toll threshold.
    InsufficientPayment,
    /// Fee token not approved.
    InsufficientAllowance,
    /// An underlying transfer call failed.
    AssetTransfer,
    /// Malformed input or configuration.
    Invalid,
}

impl LedgerError {
    /// Builds a `TransferFailed` error from any displayable reason.
    pub fn transfer_failed(token: Address, reason: impl std::fmt::Display) -> Self {
        LedgerError::TransferFailed {
            token,
            reason: reason.to_string(),
        }
    }

    /// Returns the taxonomy category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotOwner | LedgerError::NotFeeManager | LedgerError::ZeroOwner => {
                ErrorKind::Authorization
            }
            LedgerError::AlreadyUsed | LedgerError::Unavailable => ErrorKind::Reuse,
            LedgerError::BelowProtocolFee | LedgerError::BelowEtherToll => {
                ErrorKind::InsufficientPayment
            }
            LedgerError::InsufficientAllowance => ErrorKind::InsufficientAllowance,
            LedgerError::TransferFailed { .. } | LedgerError::IncompleteRevert { .. } => {
                ErrorKind::AssetTransfer
            }
            LedgerError::InvalidNote(_)
            | LedgerError::InvalidAddress(_)
            | LedgerError::InvalidAmount(_)
            | LedgerError::Config(_)
            | LedgerError::Json(_)
            | LedgerError::Hex(_) => ErrorKind::Invalid,
        }
    }

    /// Returns true if this is an authorization error.
    pub fn is_authorization_error(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    /// Returns true if this is a reuse error.
    pub fn is_reuse_error(&self) -> bool {
        self.kind() == ErrorKind::Reuse
    }

    /// Returns true if the attached value was too low.
    pub fn is_insufficient_payment(&self) -> bool {
        self.kind() == ErrorKind::InsufficientPayment
    }

    /// Returns true if a failed call left some transfers in place.
    pub fn is_incomplete_revert(&self) -> bool {
        matches!(self, LedgerError::IncompleteRevert { .. })
    }

    /// Returns the revert reason string a wallet would display.
    pub fn revert_reason(&self) -> String {
        self.to_string()
    }
}

/// Errors reported by an ERC20 token contract.
///
/// Messages follow the OpenZeppelin ERC20 revert strings.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Sender balance too low.
    #[error("ERC20: transfer amount exceeds balance")]
    InsufficientBalance,

    /// Spender allowance too low.
    #[error("ERC20: insufficient allowance")]
    InsufficientAllowance,

    /// Transfer to the zero address.
    #[error("ERC20: transfer to the zero address")]
    TransferToZero,

    /// Approval for the zero address.
    #[error("ERC20: approve to the zero address")]
    ApproveToZero,

    /// Arithmetic overflow in a balance or supply.
    #[error("ERC20: arithmetic overflow")]
    Overflow,

    /// Any other revert raised by a token implementation.
    #[error("{0}")]
    Reverted(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_revert_reasons_verbatim() {
        assert_eq!(
            LedgerError::BelowProtocolFee.to_string(),
            "StealthSwap: Must have value higher than the protocol fee"
        );
        assert_eq!(
            LedgerError::AlreadyUsed.to_string(),
            "StealthSwap: stealth address cannot be reused"
        );
        assert_eq!(
            LedgerError::Unavailable.to_string(),
            "StealthSwap: Unavailable tokens for withdrawal"
        );
        assert_eq!(
            LedgerError::InsufficientAllowance.to_string(),
            "StealthSwap: You must provide allowance to pay the protocol fee"
        );
        assert_eq!(
            LedgerError::BelowEtherToll.to_string(),
            "StealthSwap: Must have value greater than or equal to ether protocol fee"
        );
        assert_eq!(
            LedgerError::NotFeeManager.to_string(),
            "StealthSwap: Wrong Fee Manager"
        );
        assert_eq!(
            LedgerError::NotOwner.to_string(),
            "Ownable: caller is not the owner"
        );
    }

    #[test_case(LedgerError::NotOwner, ErrorKind::Authorization)]
    #[test_case(LedgerError::NotFeeManager, ErrorKind::Authorization)]
    #[test_case(LedgerError::AlreadyUsed, ErrorKind::Reuse)]
    #[test_case(LedgerError::Unavailable, ErrorKind::Reuse)]
    #[test_case(LedgerError::BelowProtocolFee, ErrorKind::InsufficientPayment)]
    #[test_case(LedgerError::BelowEtherToll, ErrorKind::InsufficientPayment)]
    #[test_case(LedgerError::InsufficientAllowance, ErrorKind::InsufficientAllowance)]
    #[test_case(LedgerError::Config("x".into()), ErrorKind::Invalid)]
    fn test_error_classification(err: LedgerError, kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn test_incomplete_revert_keeps_cause() {
        let err = LedgerError::IncompleteRevert {
            cause: Box::new(LedgerError::Unavailable),
            stranded: "1 of 0x11".into(),
        };
        assert_eq!(err.kind(), ErrorKind::AssetTransfer);
        assert!(err.is_incomplete_revert());
        assert!(err
            .to_string()
            .starts_with("StealthSwap: Unavailable tokens for withdrawal (incomplete revert"));
    }

    #[test]
    fn test_transfer_failed_carries_token_reason() {
        let token = Address::from_array([0x11; 20]);
        let err = LedgerError::transfer_failed(token, TokenError::InsufficientBalance);
        assert_eq!(err.kind(), ErrorKind::AssetTransfer);
        assert!(err.to_string().contains("ERC20: transfer amount exceeds balance"));
        assert!(err.to_string().contains("0x1111"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let ledger_result: Result<serde_json::Value> = json_result.map_err(LedgerError::from);
        assert!(matches!(ledger_result, Err(LedgerError::Json(_))));
    }
}
